use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub published: bool,
    pub author_id: String,
    pub image_url: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub slug: String,
    pub author_id: String,
    pub image_url: Option<String>,
    pub summary: Option<String>,
}

/// Caller-supplied fields of a new article.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

/// Mutable fields of an article. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
}

impl ArticleUpdate {
    pub fn touches_text(&self) -> bool {
        self.title.is_some() || self.content.is_some()
    }
}

/// Row of the cached article listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleListItem {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub summary: Option<String>,
    pub content: String,
    pub author: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleWithAuthor {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub image_url: Option<String>,
    pub author: Option<String>,
}

/// An article still waiting for its summary.
#[derive(Debug, Clone)]
pub struct PendingSummary {
    pub id: i64,
    pub title: String,
    pub content: String,
}

/// Who to congratulate when an article reaches a milestone.
#[derive(Debug, Clone)]
pub struct CelebrationTarget {
    pub article_id: i64,
    pub title: String,
    pub author_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}
