use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    Article, ArticleListItem, ArticleUpdate, ArticleWithAuthor, CelebrationTarget, NewArticle,
    PendingSummary, User,
};

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    /// Opens (or creates) the database at `db_path`. `":memory:"` gives a private in-memory store.
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // User operations

    pub async fn upsert_user(&self, user: User) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO users_sync (id, name, email)
                       VALUES (?1, ?2, ?3)
                       ON CONFLICT(id) DO UPDATE SET
                           name = excluded.name,
                           email = excluded.email"#,
                    params![user.id, user.name, user.email],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    #[allow(dead_code)]
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let id = id.to_string();
        let user = self
            .conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT id, name, email FROM users_sync WHERE id = ?1",
                        params![id],
                        |row| {
                            Ok(User {
                                id: row.get(0)?,
                                name: row.get(1)?,
                                email: row.get(2)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(user)
            })
            .await?;
        Ok(user)
    }

    pub async fn list_user_ids(&self) -> Result<Vec<String>> {
        let ids = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id FROM users_sync ORDER BY id")?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    // Article operations

    pub async fn insert_article(&self, article: NewArticle) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO articles (title, content, slug, published, author_id, image_url, summary)
                       VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6)"#,
                    params![
                        article.title,
                        article.content,
                        article.slug,
                        article.author_id,
                        article.image_url,
                        article.summary,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Writes the supplied fields only. A `None` summary keeps the stored one.
    /// Returns whether a row matched.
    pub async fn update_article(
        &self,
        id: i64,
        update: ArticleUpdate,
        summary: Option<String>,
    ) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    r#"UPDATE articles SET
                           title = COALESCE(?1, title),
                           content = COALESCE(?2, content),
                           image_url = COALESCE(?3, image_url),
                           summary = COALESCE(?4, summary),
                           updated_at = datetime('now')
                       WHERE id = ?5"#,
                    params![update.title, update.content, update.image_url, summary, id],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed > 0)
    }

    pub async fn delete_article(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .call(move |conn| {
                let deleted = conn.execute("DELETE FROM articles WHERE id = ?1", params![id])?;
                Ok(deleted)
            })
            .await?;
        Ok(deleted > 0)
    }

    /// Removes every article and restarts id generation at 1.
    pub async fn reset_articles(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    r#"DELETE FROM articles;
                       DELETE FROM sqlite_sequence WHERE name = 'articles';"#,
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let article = self
            .conn
            .call(move |conn| {
                let article = conn
                    .query_row(
                        r#"SELECT id, title, content, slug, published, author_id, image_url,
                                  summary, created_at, updated_at
                           FROM articles WHERE id = ?1"#,
                        params![id],
                        article_from_row,
                    )
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    pub async fn get_article_author(&self, id: i64) -> Result<Option<String>> {
        let author_id = self
            .conn
            .call(move |conn| {
                let author_id = conn
                    .query_row(
                        "SELECT author_id FROM articles WHERE id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(author_id)
            })
            .await?;
        Ok(author_id)
    }

    pub async fn list_articles_with_author(&self) -> Result<Vec<ArticleListItem>> {
        let articles = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT a.id, a.title, a.created_at, a.summary, a.content,
                              u.name AS author, a.image_url
                       FROM articles a
                       LEFT JOIN users_sync u ON a.author_id = u.id
                       ORDER BY a.created_at DESC, a.id DESC"#,
                )?;
                let articles = stmt
                    .query_map([], list_item_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    pub async fn get_article_with_author(&self, id: i64) -> Result<Option<ArticleWithAuthor>> {
        let article = self
            .conn
            .call(move |conn| {
                let article = conn
                    .query_row(
                        r#"SELECT a.id, a.title, a.content, a.created_at, a.image_url,
                                  u.name AS author
                           FROM articles a
                           LEFT JOIN users_sync u ON a.author_id = u.id
                           WHERE a.id = ?1"#,
                        params![id],
                        |row| {
                            Ok(ArticleWithAuthor {
                                id: row.get(0)?,
                                title: row.get(1)?,
                                content: row.get(2)?,
                                created_at: timestamp(row, 3)?,
                                image_url: row.get(4)?,
                                author: row.get(5)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    // Summary operations

    pub async fn articles_missing_summary(&self) -> Result<Vec<PendingSummary>> {
        let pending = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, content FROM articles WHERE summary IS NULL ORDER BY id",
                )?;
                let pending = stmt
                    .query_map([], |row| {
                        Ok(PendingSummary {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            content: row.get(2)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(pending)
            })
            .await?;
        Ok(pending)
    }

    pub async fn set_summary(&self, id: i64, summary: String) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE articles SET summary = ?1, updated_at = datetime('now') WHERE id = ?2",
                    params![summary, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Celebration lookup

    pub async fn celebration_target(&self, article_id: i64) -> Result<Option<CelebrationTarget>> {
        let target = self
            .conn
            .call(move |conn| {
                let target = conn
                    .query_row(
                        r#"SELECT a.id, a.title, u.id, u.name, u.email
                           FROM articles a
                           LEFT JOIN users_sync u ON a.author_id = u.id
                           WHERE a.id = ?1"#,
                        params![article_id],
                        |row| {
                            Ok(CelebrationTarget {
                                article_id: row.get(0)?,
                                title: row.get(1)?,
                                author_id: row.get(2)?,
                                name: row.get(3)?,
                                email: row.get(4)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(target)
            })
            .await?;
        Ok(target)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    Ok(parse_datetime(&raw).unwrap_or_else(Utc::now))
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        slug: row.get(3)?,
        published: row.get::<_, i64>(4)? != 0,
        author_id: row.get(5)?,
        image_url: row.get(6)?,
        summary: row.get(7)?,
        created_at: timestamp(row, 8)?,
        updated_at: timestamp(row, 9)?,
    })
}

fn list_item_from_row(row: &Row) -> rusqlite::Result<ArticleListItem> {
    Ok(ArticleListItem {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: timestamp(row, 2)?,
        summary: row.get(3)?,
        content: row.get(4)?,
        author: row.get(5)?,
        image_url: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo_with_author() -> Repository {
        let repo = Repository::new(":memory:").await.unwrap();
        repo.upsert_user(User {
            id: "user-a".to_string(),
            name: Some("Ada".to_string()),
            email: Some("ada@example.com".to_string()),
        })
        .await
        .unwrap();
        repo
    }

    fn draft(title: &str) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            content: "Some *markdown*".to_string(),
            slug: format!("{}-1", title.to_lowercase()),
            author_id: "user-a".to_string(),
            image_url: None,
            summary: None,
        }
    }

    #[tokio::test]
    async fn upsert_user_updates_on_conflict() {
        let repo = repo_with_author().await;
        repo.upsert_user(User {
            id: "user-a".to_string(),
            name: Some("Ada L.".to_string()),
            email: None,
        })
        .await
        .unwrap();

        let user = repo.get_user("user-a").await.unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("Ada L."));
        assert_eq!(user.email, None);
        assert_eq!(repo.list_user_ids().await.unwrap(), vec!["user-a".to_string()]);
    }

    #[tokio::test]
    async fn insert_requires_existing_author() {
        let repo = Repository::new(":memory:").await.unwrap();
        assert!(repo.insert_article(draft("Orphan")).await.is_err());
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let repo = repo_with_author().await;
        let id = repo.insert_article(draft("Rust")).await.unwrap();

        let article = repo.get_article(id).await.unwrap().unwrap();
        assert_eq!(article.title, "Rust");
        assert!(article.published);
        assert_eq!(article.author_id, "user-a");
        assert_eq!(article.summary, None);

        let joined = repo.get_article_with_author(id).await.unwrap().unwrap();
        assert_eq!(joined.author.as_deref(), Some("Ada"));

        assert!(repo.get_article_with_author(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_only_touches_supplied_fields() {
        let repo = repo_with_author().await;
        let mut new = draft("Before");
        new.summary = Some("kept".to_string());
        new.image_url = Some("https://img.example/a.png".to_string());
        let id = repo.insert_article(new).await.unwrap();

        let update = ArticleUpdate {
            title: Some("After".to_string()),
            ..ArticleUpdate::default()
        };
        assert!(repo.update_article(id, update, None).await.unwrap());

        let article = repo.get_article(id).await.unwrap().unwrap();
        assert_eq!(article.title, "After");
        assert_eq!(article.content, "Some *markdown*");
        assert_eq!(article.image_url.as_deref(), Some("https://img.example/a.png"));
        assert_eq!(article.summary.as_deref(), Some("kept"));
        assert_eq!(article.author_id, "user-a");

        assert!(!repo
            .update_article(id + 10, ArticleUpdate::default(), None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn list_joins_author_names() {
        let repo = repo_with_author().await;
        repo.insert_article(draft("One")).await.unwrap();
        repo.insert_article(draft("Two")).await.unwrap();

        let list = repo.list_articles_with_author().await.unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|a| a.author.as_deref() == Some("Ada")));
        // Same second, so id breaks the tie.
        assert_eq!(list[0].title, "Two");
    }

    #[tokio::test]
    async fn missing_summaries_and_set_summary() {
        let repo = repo_with_author().await;
        let first = repo.insert_article(draft("First")).await.unwrap();
        let mut second = draft("Second");
        second.summary = Some("done".to_string());
        repo.insert_article(second).await.unwrap();

        let pending = repo.articles_missing_summary().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, first);

        repo.set_summary(first, "now done".to_string()).await.unwrap();
        assert!(repo.articles_missing_summary().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_and_reset() {
        let repo = repo_with_author().await;
        let id = repo.insert_article(draft("Gone")).await.unwrap();
        assert!(repo.delete_article(id).await.unwrap());
        assert!(!repo.delete_article(id).await.unwrap());
        assert_eq!(repo.get_article_author(id).await.unwrap(), None);

        repo.insert_article(draft("Again")).await.unwrap();
        repo.reset_articles().await.unwrap();
        let id = repo.insert_article(draft("Fresh")).await.unwrap();
        assert_eq!(id, 1);
    }

    #[tokio::test]
    async fn celebration_target_carries_author_contact() {
        let repo = repo_with_author().await;
        let id = repo.insert_article(draft("Famous")).await.unwrap();

        let target = repo.celebration_target(id).await.unwrap().unwrap();
        assert_eq!(target.title, "Famous");
        assert_eq!(target.email.as_deref(), Some("ada@example.com"));
        assert_eq!(target.author_id.as_deref(), Some("user-a"));

        assert!(repo.celebration_target(id + 1).await.unwrap().is_none());
    }
}
