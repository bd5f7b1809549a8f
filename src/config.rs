use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, Result};

/// Pageview counts that trigger a celebration email.
pub const DEFAULT_MILESTONES: [i64; 5] = [10, 50, 100, 1000, 10000];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Public origin used to build links in outgoing emails.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Lets the summary sweep endpoint run without the cron secret.
    #[serde(default)]
    pub development: bool,

    pub cron_secret: Option<String>,
    pub claude_api_key: Option<String>,
    pub redis_rest_url: Option<String>,
    pub redis_rest_token: Option<String>,
    pub resend_api_key: Option<String>,

    #[serde(default = "default_mail_from")]
    pub mail_from: String,

    pub stack_project_id: Option<String>,
    pub stack_secret_server_key: Option<String>,
    pub blob_read_write_token: Option<String>,

    #[serde(default = "default_list_cache_ttl")]
    pub list_cache_ttl_secs: u64,

    #[serde(default = "default_milestones")]
    pub milestones: Vec<i64>,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wikimasters");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("wiki.db").to_string_lossy().to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_mail_from() -> String {
    "Wikimasters <noreply@localhost>".to_string()
}

fn default_list_cache_ttl() -> u64 {
    60
}

fn default_milestones() -> Vec<i64> {
    DEFAULT_MILESTONES.to_vec()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            base_url: default_base_url(),
            development: false,
            cron_secret: None,
            claude_api_key: None,
            redis_rest_url: None,
            redis_rest_token: None,
            resend_api_key: None,
            mail_from: default_mail_from(),
            stack_project_id: None,
            stack_secret_server_key: None,
            blob_read_write_token: None,
            list_cache_ttl_secs: default_list_cache_ttl(),
            milestones: default_milestones(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wikimasters")
            .join("config.toml")
    }

    /// Secrets can be supplied through `WIKI_*` variables instead of the file.
    fn apply_env_overrides(&mut self) {
        let secrets: [(&str, &mut Option<String>); 8] = [
            ("WIKI_CRON_SECRET", &mut self.cron_secret),
            ("WIKI_CLAUDE_API_KEY", &mut self.claude_api_key),
            ("WIKI_REDIS_REST_URL", &mut self.redis_rest_url),
            ("WIKI_REDIS_REST_TOKEN", &mut self.redis_rest_token),
            ("WIKI_RESEND_API_KEY", &mut self.resend_api_key),
            ("WIKI_STACK_PROJECT_ID", &mut self.stack_project_id),
            ("WIKI_STACK_SECRET_SERVER_KEY", &mut self.stack_secret_server_key),
            ("WIKI_BLOB_READ_WRITE_TOKEN", &mut self.blob_read_write_token),
        ];

        for (name, slot) in secrets {
            if let Ok(value) = std::env::var(name) {
                if !value.is_empty() {
                    *slot = Some(value);
                }
            }
        }

        if let Ok(path) = std::env::var("WIKI_DB_PATH") {
            self.db_path = path;
        }
        if let Ok(addr) = std::env::var("WIKI_BIND_ADDR") {
            self.bind_addr = addr;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.milestones.iter().any(|m| *m <= 0) {
            return Err(AppError::Config(
                "milestones must be positive".to_string(),
            ));
        }
        if self.list_cache_ttl_secs == 0 {
            return Err(AppError::Config(
                "list_cache_ttl_secs must be at least 1".to_string(),
            ));
        }
        if self.redis_rest_url.is_some() != self.redis_rest_token.is_some() {
            return Err(AppError::Config(
                "redis_rest_url and redis_rest_token must be set together".to_string(),
            ));
        }
        Ok(())
    }

    pub fn list_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.list_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "db_path = \"/tmp/wiki-test.db\"").unwrap();
        writeln!(file, "claude_api_key = \"sk-test\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();

        assert_eq!(config.db_path, "/tmp/wiki-test.db");
        assert_eq!(config.claude_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.milestones, vec![10, 50, 100, 1000, 10000]);
        assert_eq!(config.list_cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(!config.development);
    }

    #[test]
    fn milestones_and_ttl_are_configurable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "list_cache_ttl_secs = 5").unwrap();
        writeln!(file, "milestones = [3, 7]").unwrap();

        let config = Config::load_from(file.path()).unwrap();

        assert_eq!(config.list_cache_ttl(), Duration::from_secs(5));
        assert_eq!(config.milestones, vec![3, 7]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_milestones() {
        let config = Config {
            milestones: vec![10, 0],
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_zero_list_ttl() {
        let config = Config {
            list_cache_ttl_secs: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_half_configured_redis() {
        let config = Config {
            redis_rest_url: Some("https://cache.example".to_string()),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
