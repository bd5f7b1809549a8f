use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ai::Summarize;
use crate::cache::{KvCache, ARTICLE_LIST_GENERATION_KEY, ARTICLE_LIST_KEY};
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{
    ArticleDraft, ArticleListItem, ArticleUpdate, ArticleWithAuthor, Identity, NewArticle,
    PendingSummary, User,
};

const SWEEP_CONCURRENCY: usize = 4;

static SLUG_SEPARATORS: OnceLock<Regex> = OnceLock::new();

/// Listing as stored in the cache, tagged with the generation it was read under.
#[derive(Serialize, Deserialize)]
struct CachedListing<A> {
    generation: i64,
    articles: A,
}

/// Article CRUD with authorship checks, best-effort summaries and list cache invalidation.
pub struct ArticleService {
    repository: Arc<Repository>,
    cache: Arc<dyn KvCache>,
    summarizer: Option<Arc<dyn Summarize>>,
    list_ttl: Duration,
}

impl ArticleService {
    pub fn new(
        repository: Arc<Repository>,
        cache: Arc<dyn KvCache>,
        summarizer: Option<Arc<dyn Summarize>>,
        list_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            cache,
            summarizer,
            list_ttl,
        }
    }

    pub async fn create(&self, caller: Option<&Identity>, draft: ArticleDraft) -> Result<i64> {
        let caller = caller.ok_or(AppError::Unauthorized)?;

        self.repository.upsert_user(User::from(caller)).await?;

        tracing::info!("Creating article {:?} for {}", draft.title, caller.id);

        let summary = self.try_summarize(&draft.title, &draft.content).await;

        let id = self
            .repository
            .insert_article(NewArticle {
                slug: make_slug(&draft.title),
                title: draft.title,
                content: draft.content,
                author_id: caller.id.clone(),
                image_url: draft.image_url,
                summary,
            })
            .await?;

        self.invalidate_list().await;
        Ok(id)
    }

    pub async fn update(
        &self,
        caller: Option<&Identity>,
        id: i64,
        update: ArticleUpdate,
    ) -> Result<()> {
        let caller = caller.ok_or(AppError::Unauthorized)?;
        if !self.can_edit(&caller.id, id).await {
            return Err(AppError::Forbidden);
        }

        tracing::info!("Updating article {} for {}", id, caller.id);

        let summary = if update.touches_text() {
            match self.repository.get_article(id).await? {
                Some(current) => {
                    let title = update.title.as_deref().unwrap_or(&current.title);
                    let content = update.content.as_deref().unwrap_or(&current.content);
                    self.try_summarize(title, content).await
                }
                None => None,
            }
        } else {
            None
        };

        self.repository.update_article(id, update, summary).await?;
        self.invalidate_list().await;
        Ok(())
    }

    pub async fn delete(&self, caller: Option<&Identity>, id: i64) -> Result<()> {
        let caller = caller.ok_or(AppError::Unauthorized)?;
        if !self.can_edit(&caller.id, id).await {
            return Err(AppError::Forbidden);
        }

        tracing::info!("Deleting article {} for {}", id, caller.id);

        self.repository.delete_article(id).await?;
        self.invalidate_list().await;
        Ok(())
    }

    /// Cache-aside read of every article with its author's name.
    ///
    /// The listing generation is read before the store, so a fill that races an
    /// invalidation is stored under an old generation and never served.
    pub async fn list_all(&self) -> Result<Vec<ArticleListItem>> {
        let generation = match self.list_generation().await {
            Ok(generation) => Some(generation),
            Err(e) => {
                tracing::warn!("Failed to read article list generation: {}", e);
                None
            }
        };

        if let Some(generation) = generation {
            if let Some(articles) = self.cached_listing(generation).await {
                tracing::debug!("Article list cache hit");
                return Ok(articles);
            }
        }

        let articles = self.repository.list_articles_with_author().await?;
        tracing::debug!("Article list cache miss, loaded {} articles", articles.len());

        if let Some(generation) = generation {
            self.fill_listing(generation, &articles).await;
        }

        Ok(articles)
    }

    async fn list_generation(&self) -> Result<i64> {
        match self.cache.get(ARTICLE_LIST_GENERATION_KEY).await? {
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                AppError::Cache(format!("{} is not an integer", ARTICLE_LIST_GENERATION_KEY))
            }),
            None => Ok(0),
        }
    }

    async fn cached_listing(&self, generation: i64) -> Option<Vec<ArticleListItem>> {
        let raw = match self.cache.get(ARTICLE_LIST_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read article list cache: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<CachedListing<Vec<ArticleListItem>>>(&raw) {
            Ok(cached) if cached.generation == generation => Some(cached.articles),
            Ok(cached) => {
                tracing::debug!(
                    "Ignoring article list cached under generation {} (now {})",
                    cached.generation,
                    generation
                );
                None
            }
            Err(e) => {
                tracing::warn!("Discarding undecodable article list cache: {}", e);
                None
            }
        }
    }

    async fn fill_listing(&self, generation: i64, articles: &[ArticleListItem]) {
        let cached = CachedListing {
            generation,
            articles,
        };
        match serde_json::to_string(&cached) {
            Ok(raw) => {
                if let Err(e) = self.cache.set(ARTICLE_LIST_KEY, &raw, self.list_ttl).await {
                    tracing::warn!("Failed to set article list cache: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize article list: {}", e),
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ArticleWithAuthor>> {
        self.repository.get_article_with_author(id).await
    }

    /// Whether `caller_id` authored article `article_id`. Never fails; lookup errors count as "no".
    pub async fn can_edit(&self, caller_id: &str, article_id: i64) -> bool {
        match self.repository.get_article_author(article_id).await {
            Ok(Some(author_id)) => author_id == caller_id,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Authorization lookup for article {} failed: {}", article_id, e);
                false
            }
        }
    }

    /// Fills in summaries for every article that lacks one. Returns how many were written.
    pub async fn summarize_missing(&self) -> Result<usize> {
        let Some(summarizer) = &self.summarizer else {
            tracing::info!("No summarizer configured, skipping summary sweep");
            return Ok(0);
        };

        let pending = self.repository.articles_missing_summary().await?;
        if pending.is_empty() {
            return Ok(0);
        }

        tracing::info!("Starting summary sweep over {} articles", pending.len());

        let updated = stream::iter(pending)
            .map(|article| self.summarize_one(summarizer.as_ref(), article))
            .buffer_unordered(SWEEP_CONCURRENCY)
            .filter(|written| futures::future::ready(*written))
            .count()
            .await;

        if updated > 0 {
            self.invalidate_list().await;
        }

        tracing::info!("Summary sweep finished, updated {} articles", updated);
        Ok(updated)
    }

    async fn summarize_one(&self, summarizer: &dyn Summarize, article: PendingSummary) -> bool {
        let summary = match summarizer.summarize(&article.title, &article.content).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => {
                tracing::warn!("Empty summary for article {}", article.id);
                return false;
            }
            Err(e) => {
                tracing::warn!("Failed to summarize article {}: {}", article.id, e);
                return false;
            }
        };

        match self.repository.set_summary(article.id, summary).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to store summary for article {}: {}", article.id, e);
                false
            }
        }
    }

    async fn try_summarize(&self, title: &str, content: &str) -> Option<String> {
        let summarizer = self.summarizer.as_ref()?;
        match summarizer.summarize(title, content).await {
            Ok(summary) if !summary.trim().is_empty() => Some(summary),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Failed to generate AI summary: {}", e);
                None
            }
        }
    }

    pub async fn invalidate_list(&self) {
        if let Err(e) = self.cache.incr(ARTICLE_LIST_GENERATION_KEY).await {
            tracing::warn!("Failed to bump article list generation: {}", e);
        }
        if let Err(e) = self.cache.delete(ARTICLE_LIST_KEY).await {
            tracing::warn!("Failed to clear article list cache: {}", e);
        }
    }
}

fn make_slug(title: &str) -> String {
    let separators =
        SLUG_SEPARATORS.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid slug pattern"));
    let lowered = title.to_lowercase();
    let base = separators.replace_all(&lowered, "-");
    let base = base.trim_matches('-');
    let stamp = chrono::Utc::now().timestamp_millis();

    if base.is_empty() {
        stamp.to_string()
    } else {
        format!("{}-{}", base, stamp)
    }
}
