use std::sync::Arc;

use crate::cache::{pageview_key, KvCache};
use crate::error::{AppError, Result};
use crate::services::Celebrate;

/// Counts article views and celebrates exact milestone hits.
pub struct PageviewService {
    cache: Arc<dyn KvCache>,
    celebrations: Option<Arc<dyn Celebrate>>,
    milestones: Vec<i64>,
}

impl PageviewService {
    pub fn new(
        cache: Arc<dyn KvCache>,
        celebrations: Option<Arc<dyn Celebrate>>,
        milestones: Vec<i64>,
    ) -> Self {
        Self {
            cache,
            celebrations,
            milestones,
        }
    }

    /// Records one view and returns the new count.
    ///
    /// The increment happens inside the cache, so concurrent callers never lose a view.
    /// A milestone fires only when the new count equals it exactly; a count that jumps past
    /// a threshold never celebrates it.
    pub async fn record_view(&self, article_id: i64) -> Result<i64> {
        if article_id <= 0 {
            return Err(AppError::NotFound);
        }

        let count = self.cache.incr(&pageview_key(article_id)).await?;

        if self.milestones.contains(&count) {
            self.dispatch_celebration(article_id, count);
        }

        Ok(count)
    }

    fn dispatch_celebration(&self, article_id: i64, count: i64) {
        let Some(celebrations) = &self.celebrations else {
            tracing::info!("Article {} reached {} views", article_id, count);
            return;
        };

        let celebrations = Arc::clone(celebrations);
        tokio::spawn(async move {
            if let Err(e) = celebrations.celebrate(article_id, count).await {
                tracing::warn!(
                    "Failed to celebrate {} views on article {}: {}",
                    count,
                    article_id,
                    e
                );
            }
        });
    }
}
