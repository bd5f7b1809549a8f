use crate::error::Result;
use crate::models::{NewArticle, User};

use super::Repository;

pub const SEED_COUNT: usize = 25;
pub const SEED_USER_ID: &str = "seed-user-001";

const TITLES: [&str; 8] = [
    "Notes on debugging with print statements",
    "Why the build was slow on Tuesday",
    "A field guide to flaky tests",
    "Naming things, revisited",
    "Living with legacy configuration",
    "The quiet art of the code review",
    "When to reach for a cache",
    "Reading error messages slowly",
];

const CONTENTS: [&str; 6] = [
    "*Print debugging is underrated.*\nA well placed `println!` tells you what the program did, not what you hoped it did.\nDelete them before you commit.",
    "**Slow builds are a tax on every change.**\nMeasure first: most of the time went into one crate that nobody remembered adding.\nRemoving it saved four minutes.",
    "A flaky test is a test that has found a bug you have not found yet.\nUsually the bug is in the test, sometimes it is a race in the code.\nEither way, retrying is not a fix.",
    "Good names make comments unnecessary.\nIf you need a paragraph to explain a variable, rename the variable.\n`data2` is not a name.",
    "Configuration files outlive the people who wrote them.\nDocument every key and its default, and fail loudly on unknown ones.\nFuture you will be grateful.",
    "Review the change, not the author.\nAsk questions instead of issuing verdicts, and approve when it is better than before.\nPerfect is a moving target.",
];

/// Replaces every article with a deterministic set of sample articles spread across existing users.
pub async fn seed_articles(repository: &Repository) -> Result<usize> {
    tracing::info!("Truncating articles and restarting ids");
    repository.reset_articles().await?;

    let mut authors = repository.list_user_ids().await?;
    if authors.is_empty() {
        tracing::info!("No users found, inserting default seed user");
        repository
            .upsert_user(User {
                id: SEED_USER_ID.to_string(),
                name: Some("Seed User".to_string()),
                email: Some("seed@example.com".to_string()),
            })
            .await?;
        authors.push(SEED_USER_ID.to_string());
    }
    tracing::info!("Seeding {} articles across {} user(s)", SEED_COUNT, authors.len());

    for i in 0..SEED_COUNT {
        let title = TITLES[i % TITLES.len()];
        let title = if i < TITLES.len() {
            title.to_string()
        } else {
            format!("{} ({})", title, i / TITLES.len() + 1)
        };

        repository
            .insert_article(NewArticle {
                title,
                content: CONTENTS[i % CONTENTS.len()].to_string(),
                slug: format!("seed-{}", i + 1),
                author_id: authors[i % authors.len()].clone(),
                image_url: None,
                summary: None,
            })
            .await?;
    }

    Ok(SEED_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_default_user_when_none_exist() {
        let repo = Repository::new(":memory:").await.unwrap();

        assert_eq!(seed_articles(&repo).await.unwrap(), SEED_COUNT);

        assert_eq!(repo.list_user_ids().await.unwrap(), vec![SEED_USER_ID.to_string()]);
        let articles = repo.list_articles_with_author().await.unwrap();
        assert_eq!(articles.len(), SEED_COUNT);
        assert!(articles.iter().all(|a| a.author.as_deref() == Some("Seed User")));
    }

    #[tokio::test]
    async fn reseeding_replaces_articles_and_spreads_authors() {
        let repo = Repository::new(":memory:").await.unwrap();
        for id in ["u1", "u2"] {
            repo.upsert_user(User {
                id: id.to_string(),
                name: None,
                email: None,
            })
            .await
            .unwrap();
        }

        seed_articles(&repo).await.unwrap();
        seed_articles(&repo).await.unwrap();

        let first = repo.get_article(1).await.unwrap().unwrap();
        let second = repo.get_article(2).await.unwrap().unwrap();
        assert_eq!(first.author_id, "u1");
        assert_eq!(second.author_id, "u2");
        assert!(repo.get_article(SEED_COUNT as i64 + 1).await.unwrap().is_none());
        assert_eq!(repo.articles_missing_summary().await.unwrap().len(), SEED_COUNT);
    }
}
