use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Page table: one row per canonical URL.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT UNIQUE NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            markdown TEXT NOT NULL,
            word_count INTEGER NOT NULL,
            section TEXT NOT NULL DEFAULT '',
            subsection TEXT,
            scraped_at INTEGER NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            content_hash TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Crawl cache: one row per processed URL, written per-URL (never
    // batched) so an interrupted run resumes without re-fetching.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS visits (
            url TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            depth INTEGER NOT NULL,
            visited_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Full-text index mirroring the searchable page fields. Rowids are kept
    // aligned with pages.id; both halves are maintained in the same
    // transaction by the storage engine.
    // FTS5 CREATE is not idempotent natively, so we check first.
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='pages_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE pages_fts USING fts5(
                title, markdown, url, section
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pages_url ON pages(url)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pages_section ON pages(section)")
        .execute(pool)
        .await?;

    Ok(())
}
