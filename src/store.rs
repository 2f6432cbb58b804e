//! Storage engine and crawl cache.
//!
//! One SQLite file holds the page table, its full-text mirror, and the
//! visits table. Two rules are load-bearing:
//!
//! 1. A page row and its `pages_fts` entry are written in the same
//!    transaction — a reader never sees one without the other.
//! 2. A URL is marked visited only after its page commit completes
//!    (store-then-mark), so a crash mid-write leaves the URL eligible for
//!    retry, never falsely skipped. [`StorageEngine::record_page`] packages
//!    that ordering as a single operation.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

use crate::error::IngestError;
use crate::models::{Page, PageSummary, SectionSummary, StoreStats};

/// Terminal states a URL can reach in the crawl cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitStatus {
    /// Page fetched, normalized, and durably stored.
    Ok,
    /// Page yielded no usable content; not retried within this cache.
    Failed,
}

impl VisitStatus {
    fn as_str(self) -> &'static str {
        match self {
            VisitStatus::Ok => "ok",
            VisitStatus::Failed => "failed",
        }
    }
}

/// What `record_page` did with the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Stored,
    /// Content hash matched the stored row; nothing rewritten.
    Unchanged,
}

/// A previously completed visit, used to reseed the frontier on resume.
#[derive(Debug, Clone)]
pub struct CompletedVisit {
    pub url: String,
    pub depth: u32,
    /// Raw HTML of the stored page, for link re-extraction.
    pub content: String,
}

#[derive(Clone)]
pub struct StorageEngine {
    pool: SqlitePool,
}

impl StorageEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ── Page table ───────────────────────────────────────────────────────

    /// Write or overwrite the page row keyed by URL and its full-text entry
    /// in one atomic commit. A re-crawl whose normalized content is
    /// unchanged skips the write entirely.
    pub async fn upsert_page(&self, page: &Page) -> Result<RecordOutcome, IngestError> {
        let content_hash = hash_markdown(&page.markdown);

        let existing: Option<String> =
            sqlx::query_scalar("SELECT content_hash FROM pages WHERE url = ?")
                .bind(&page.url)
                .fetch_optional(&self.pool)
                .await?;
        if existing.as_deref() == Some(content_hash.as_str()) {
            return Ok(RecordOutcome::Unchanged);
        }

        let metadata = page.metadata.to_string();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO pages (url, title, content, markdown, word_count, section, subsection, scraped_at, metadata, content_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                markdown = excluded.markdown,
                word_count = excluded.word_count,
                section = excluded.section,
                subsection = excluded.subsection,
                scraped_at = excluded.scraped_at,
                metadata = excluded.metadata,
                content_hash = excluded.content_hash
            "#,
        )
        .bind(&page.url)
        .bind(&page.title)
        .bind(&page.content)
        .bind(&page.markdown)
        .bind(page.word_count)
        .bind(&page.section)
        .bind(&page.subsection)
        .bind(page.scraped_at)
        .bind(&metadata)
        .bind(&content_hash)
        .execute(&mut *tx)
        .await?;

        let page_id: i64 = sqlx::query_scalar("SELECT id FROM pages WHERE url = ?")
            .bind(&page.url)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM pages_fts WHERE rowid = ?")
            .bind(page_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO pages_fts (rowid, title, markdown, url, section) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(page_id)
        .bind(&page.title)
        .bind(&page.markdown)
        .bind(&page.url)
        .bind(&page.section)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RecordOutcome::Stored)
    }

    pub async fn get_by_url(&self, url: &str) -> Result<Option<Page>, IngestError> {
        let row = sqlx::query(
            "SELECT url, title, content, markdown, word_count, section, subsection, scraped_at, metadata FROM pages WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let metadata_json: String = row.get("metadata");
            Page {
                url: row.get("url"),
                title: row.get("title"),
                content: row.get("content"),
                markdown: row.get("markdown"),
                word_count: row.get("word_count"),
                section: row.get("section"),
                subsection: row.get("subsection"),
                scraped_at: row.get("scraped_at"),
                metadata: serde_json::from_str(&metadata_json)
                    .unwrap_or(serde_json::Value::Object(Default::default())),
            }
        }))
    }

    /// Pages in a section, ordered word count descending, URL ascending.
    pub async fn list_by_section(
        &self,
        section: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PageSummary>, IngestError> {
        let rows = sqlx::query(
            r#"
            SELECT title, url, word_count
            FROM pages
            WHERE section = ?
            ORDER BY word_count DESC, url ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(section)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PageSummary {
                title: row.get("title"),
                url: row.get("url"),
                word_count: row.get("word_count"),
            })
            .collect())
    }

    pub async fn aggregate_stats(&self) -> Result<StoreStats, IngestError> {
        let totals = sqlx::query(
            "SELECT COUNT(*) AS total_pages, COALESCE(SUM(word_count), 0) AS total_words FROM pages",
        )
        .fetch_one(&self.pool)
        .await?;

        let section_rows = sqlx::query(
            r#"
            SELECT section,
                   COUNT(*) AS page_count,
                   COALESCE(SUM(word_count), 0) AS total_words,
                   COALESCE(AVG(word_count), 0.0) AS avg_words
            FROM pages
            WHERE section != ''
            GROUP BY section
            ORDER BY page_count DESC, section ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let sections = section_rows
            .iter()
            .map(|row| SectionSummary {
                section: row.get("section"),
                page_count: row.get("page_count"),
                total_words: row.get("total_words"),
                avg_words: row.get("avg_words"),
            })
            .collect();

        Ok(StoreStats {
            total_pages: totals.get("total_pages"),
            total_words: totals.get("total_words"),
            sections,
        })
    }

    pub async fn count_pages(&self) -> Result<i64, IngestError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM pages")
            .fetch_one(&self.pool)
            .await?)
    }

    // ── Crawl cache ──────────────────────────────────────────────────────

    /// Durably record a URL as processed. One INSERT per URL, flushed
    /// immediately; batching would reintroduce re-fetch-on-crash.
    pub async fn mark_visited(
        &self,
        url: &str,
        status: VisitStatus,
        depth: u32,
    ) -> Result<(), IngestError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO visits (url, status, depth, visited_at) VALUES (?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                status = excluded.status,
                depth = excluded.depth,
                visited_at = excluded.visited_at
            "#,
        )
        .bind(url)
        .bind(status.as_str())
        .bind(depth as i64)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn is_visited(&self, url: &str) -> Result<bool, IngestError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visits WHERE url = ?")
            .bind(url)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn visited_urls(&self) -> Result<HashSet<String>, IngestError> {
        let rows = sqlx::query("SELECT url FROM visits")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("url")).collect())
    }

    pub async fn count_visited_ok(&self) -> Result<i64, IngestError> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM visits WHERE status = 'ok'")
                .fetch_one(&self.pool)
                .await?,
        )
    }

    /// Successfully stored visits joined with their page content, for
    /// frontier reseeding on resume.
    pub async fn completed_visits(&self) -> Result<Vec<CompletedVisit>, IngestError> {
        let rows = sqlx::query(
            r#"
            SELECT v.url, v.depth, p.content
            FROM visits v
            JOIN pages p ON p.url = v.url
            WHERE v.status = 'ok'
            ORDER BY v.visited_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CompletedVisit {
                url: row.get("url"),
                depth: row.get::<i64, _>("depth") as u32,
                content: row.get("content"),
            })
            .collect())
    }

    /// Store-then-mark as one operation: the visit row is written strictly
    /// after the page commit.
    pub async fn record_page(
        &self,
        page: &Page,
        depth: u32,
    ) -> Result<RecordOutcome, IngestError> {
        let outcome = self.upsert_page(page).await?;
        self.mark_visited(&page.url, VisitStatus::Ok, depth).await?;
        Ok(outcome)
    }

    /// Out-of-band full reset: drops all pages, index entries, and cache
    /// rows. The only cache-invalidation mechanism.
    pub async fn reset(&self) -> Result<(), IngestError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM pages_fts").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM pages").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM visits").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

fn hash_markdown(markdown: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(markdown.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_content_sensitive() {
        assert_eq!(hash_markdown("alpha"), hash_markdown("alpha"));
        assert_ne!(hash_markdown("alpha"), hash_markdown("beta"));
    }
}
