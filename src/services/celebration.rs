use std::sync::Arc;

use async_trait::async_trait;
use html_escape::encode_text;
use url::Url;

use crate::db::Repository;
use crate::error::Result;
use crate::models::CelebrationTarget;

use super::mailer::{Email, Mailer};

/// Reacts to an article reaching a pageview milestone.
#[async_trait]
pub trait Celebrate: Send + Sync {
    async fn celebrate(&self, article_id: i64, pageviews: i64) -> Result<()>;
}

/// Emails the article's author when a milestone is reached.
pub struct CelebrationMailer {
    repository: Arc<Repository>,
    mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl CelebrationMailer {
    pub fn new(repository: Arc<Repository>, mailer: Arc<dyn Mailer>, base_url: String) -> Self {
        Self {
            repository,
            mailer,
            base_url,
        }
    }

    fn article_url(&self, article_id: i64) -> String {
        let path = format!("wiki/{}", article_id);
        Url::parse(&self.base_url)
            .and_then(|base| base.join(&path))
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("{}/{}", self.base_url.trim_end_matches('/'), path))
    }
}

#[async_trait]
impl Celebrate for CelebrationMailer {
    async fn celebrate(&self, article_id: i64, pageviews: i64) -> Result<()> {
        let Some(target) = self.repository.celebration_target(article_id).await? else {
            tracing::info!(
                "Skipping celebration for {} views on article {}: article not found",
                pageviews,
                article_id
            );
            return Ok(());
        };

        let Some(to) = target.email.clone() else {
            tracing::info!(
                "Skipping celebration for {} views on article {}: author has no email",
                pageviews,
                article_id
            );
            return Ok(());
        };

        let email = Email {
            to,
            subject: format!("Your article got {} views!", pageviews),
            html: render_celebration(&target, pageviews, &self.article_url(target.article_id)),
        };

        self.mailer.send(&email).await?;

        tracing::info!(
            "Sent {} a celebration for {} views on article {}",
            target.author_id.as_deref().unwrap_or("unknown author"),
            pageviews,
            article_id
        );
        Ok(())
    }
}

fn render_celebration(target: &CelebrationTarget, pageviews: i64, article_url: &str) -> String {
    let name = target.name.as_deref().unwrap_or("Friend");
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <body style="background-color:#f8fafc;margin:0;padding:20px;font-family:ui-sans-serif,system-ui,sans-serif;color:#0f172a">
    <table width="100%" cellpadding="0" cellspacing="0" role="presentation" style="max-width:600px;margin:0 auto">
      <tr><td style="padding-bottom:12px"><strong style="font-size:18px">Wikimasters</strong></td></tr>
      <tr>
        <td>
          <div style="background:#ffffff;border-radius:8px;padding:24px">
            <h1 style="margin:0 0 8px 0;font-size:20px">Nice work, {name}!</h1>
            <p style="margin:0 0 16px 0;color:#334155">Your article "{title}" just hit <strong>{pageviews}</strong> views. That's a milestone.</p>
            <a href="{url}" style="display:inline-block;text-decoration:none;background:#0ea5a4;color:white;padding:10px 14px;border-radius:6px;font-weight:600">View article</a>
            <p style="margin-top:18px;color:#94a3b8;font-size:13px">Keep writing, you're helping other people learn.</p>
          </div>
        </td>
      </tr>
      <tr><td style="padding-top:14px"><p style="margin:0;color:#94a3b8;font-size:12px">You're receiving this email because you authored content on Wikimasters.</p></td></tr>
    </table>
  </body>
</html>"#,
        name = encode_text(name),
        title = encode_text(&target.title),
        pageviews = pageviews,
        url = html_escape::encode_double_quoted_attribute(article_url),
    )
}
