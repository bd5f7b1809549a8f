pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- users_sync table (local mirror of identity provider users)
CREATE TABLE IF NOT EXISTS users_sync (
    id TEXT PRIMARY KEY,
    name TEXT,
    email TEXT
);

-- articles table
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    slug TEXT NOT NULL,
    published INTEGER NOT NULL DEFAULT 0,
    author_id TEXT NOT NULL REFERENCES users_sync(id),
    image_url TEXT,
    summary TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_articles_author_id ON articles(author_id);
CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles(created_at DESC);
"#;
