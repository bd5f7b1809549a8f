use std::sync::Arc;

use crate::ai::{Summarize, Summarizer};
use crate::articles::ArticleService;
use crate::cache::{KvCache, MemoryCache, RedisRestCache};
use crate::config::Config;
use crate::db::{seed, Repository};
use crate::error::Result;
use crate::pageviews::PageviewService;
use crate::services::{
    Anonymous, BlobStore, Celebrate, CelebrationMailer, IdentityProvider, ResendMailer,
    StackAuth, VercelBlobStore,
};
use crate::uploads::UploadService;

/// External collaborators the services are built on.
pub struct Backends {
    pub repository: Arc<Repository>,
    pub cache: Arc<dyn KvCache>,
    pub summarizer: Option<Arc<dyn Summarize>>,
    pub celebrations: Option<Arc<dyn Celebrate>>,
    pub identity: Arc<dyn IdentityProvider>,
    pub blobs: Option<Arc<dyn BlobStore>>,
}

#[derive(Clone)]
pub struct App {
    pub config: Arc<Config>,
    pub repository: Arc<Repository>,
    pub articles: Arc<ArticleService>,
    pub pageviews: Arc<PageviewService>,
    pub uploads: Arc<UploadService>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let repository = Arc::new(Repository::new(&config.db_path).await?);

        let cache: Arc<dyn KvCache> = match (&config.redis_rest_url, &config.redis_rest_token) {
            (Some(url), Some(token)) => {
                Arc::new(RedisRestCache::new(url.clone(), token.clone()))
            }
            _ => {
                tracing::warn!("No Redis configured, using in-process cache");
                Arc::new(MemoryCache::new())
            }
        };

        let summarizer = config.claude_api_key.as_ref().map(|key| {
            let summarizer = Summarizer::new(key.clone());
            tracing::info!("AI summaries enabled ({})", summarizer.model_version());
            Arc::new(summarizer) as Arc<dyn Summarize>
        });

        let celebrations = config.resend_api_key.as_ref().map(|key| {
            let mailer = Arc::new(ResendMailer::new(key.clone(), config.mail_from.clone()));
            Arc::new(CelebrationMailer::new(
                Arc::clone(&repository),
                mailer,
                config.base_url.clone(),
            )) as Arc<dyn Celebrate>
        });

        let identity: Arc<dyn IdentityProvider> =
            match (&config.stack_project_id, &config.stack_secret_server_key) {
                (Some(project), Some(secret)) => {
                    Arc::new(StackAuth::new(project.clone(), secret.clone()))
                }
                _ => {
                    tracing::warn!("No identity provider configured, all requests are anonymous");
                    Arc::new(Anonymous)
                }
            };

        let blobs = config
            .blob_read_write_token
            .as_ref()
            .map(|token| Arc::new(VercelBlobStore::new(token.clone())) as Arc<dyn BlobStore>);

        Ok(Self::with_backends(
            config,
            Backends {
                repository,
                cache,
                summarizer,
                celebrations,
                identity,
                blobs,
            },
        ))
    }

    pub fn with_backends(config: Config, backends: Backends) -> Self {
        let articles = ArticleService::new(
            Arc::clone(&backends.repository),
            Arc::clone(&backends.cache),
            backends.summarizer,
            config.list_cache_ttl(),
        );
        let pageviews = PageviewService::new(
            backends.cache,
            backends.celebrations,
            config.milestones.clone(),
        );
        let uploads = UploadService::new(backends.blobs, config.max_upload_bytes);

        Self {
            config: Arc::new(config),
            repository: backends.repository,
            articles: Arc::new(articles),
            pageviews: Arc::new(pageviews),
            uploads: Arc::new(uploads),
            identity: backends.identity,
        }
    }

    /// Resets the article table to the sample data set.
    pub async fn seed(&self) -> Result<usize> {
        let count = seed::seed_articles(&self.repository).await?;
        self.articles.invalidate_list().await;
        Ok(count)
    }
}
