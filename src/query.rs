//! Query engine: search, browse, single-page retrieval, statistics.
//!
//! All operations are read-only and safe to run while a crawl is in
//! progress — the storage engine commits a page row and its index entry
//! atomically, so a reader always sees a consistent pair.

use anyhow::Result;
use sqlx::Row;
use tracing::warn;

use crate::canonical;
use crate::config::Config;
use crate::models::{PageContent, PageSummary, SearchHit, SectionSummary};
use crate::store::StorageEngine;

/// Stats payload: store aggregates merged with the run configuration that
/// shaped them.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatsReport {
    pub total_pages: i64,
    pub total_words: i64,
    pub sections: Vec<SectionSummary>,
    pub config: StatsConfig,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatsConfig {
    pub display_name: String,
    pub base_url: String,
    pub max_depth: u32,
    pub max_pages: usize,
    pub default_search_limit: i64,
    pub max_search_limit: i64,
    pub default_section_limit: i64,
    pub max_section_limit: i64,
    pub has_fts: bool,
}

#[derive(Clone)]
pub struct QueryEngine {
    store: StorageEngine,
    config: Config,
}

impl QueryEngine {
    pub fn new(store: StorageEngine, config: Config) -> Self {
        Self { store, config }
    }

    /// Tokenized full-text search over title, text, URL, and section,
    /// ranked by index relevance. Falls back to a case-insensitive
    /// substring scan (insertion order, no ranking) when the index can't
    /// serve the query and the fallback is enabled.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<i64>,
        section: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let q = &self.config.query;
        let limit = limit
            .unwrap_or(q.default_search_limit)
            .clamp(1, q.max_search_limit);

        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        match self.search_fts(&tokens, limit, section).await {
            Ok(hits) => Ok(hits),
            Err(e) if q.enable_fts_fallback => {
                warn!(error = %e, "full-text search unavailable, using substring scan");
                self.search_scan(query, limit, section).await
            }
            Err(e) => Err(e),
        }
    }

    async fn search_fts(
        &self,
        tokens: &[String],
        limit: i64,
        section: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        // Quote each token so user input can't inject MATCH syntax.
        let match_expr = tokens
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(" ");

        let mut sql = String::from(
            r#"
            SELECT p.title, p.url, p.section, p.subsection, p.word_count, p.markdown
            FROM pages_fts
            JOIN pages p ON p.id = pages_fts.rowid
            WHERE pages_fts MATCH ?
            "#,
        );
        if section.is_some() {
            sql.push_str(" AND p.section = ?");
        }
        sql.push_str(" ORDER BY rank LIMIT ?");

        let mut query = sqlx::query(&sql).bind(&match_expr);
        if let Some(s) = section {
            query = query.bind(s);
        }
        query = query.bind(limit);

        let rows = query.fetch_all(self.store.pool()).await?;
        Ok(self.rows_to_hits(rows, tokens))
    }

    async fn search_scan(
        &self,
        raw_query: &str,
        limit: i64,
        section: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let needle = format!("%{}%", raw_query.to_lowercase());

        let mut sql = String::from(
            r#"
            SELECT title, url, section, subsection, word_count, markdown
            FROM pages
            WHERE (LOWER(title) LIKE ? OR LOWER(markdown) LIKE ?)
            "#,
        );
        if section.is_some() {
            sql.push_str(" AND section = ?");
        }
        sql.push_str(" ORDER BY id ASC LIMIT ?");

        let mut query = sqlx::query(&sql).bind(&needle).bind(&needle);
        if let Some(s) = section {
            query = query.bind(s);
        }
        query = query.bind(limit);

        let rows = query.fetch_all(self.store.pool()).await?;
        let tokens = tokenize(raw_query);
        Ok(self.rows_to_hits(rows, &tokens))
    }

    fn rows_to_hits(
        &self,
        rows: Vec<sqlx::sqlite::SqliteRow>,
        tokens: &[String],
    ) -> Vec<SearchHit> {
        rows.iter()
            .map(|row| {
                let markdown: String = row.get("markdown");
                SearchHit {
                    title: row.get("title"),
                    url: row.get("url"),
                    section: row.get("section"),
                    subsection: row.get("subsection"),
                    word_count: row.get("word_count"),
                    snippet: make_snippet(&markdown, tokens, self.config.query.snippet_length),
                }
            })
            .collect()
    }

    /// All distinct sections with page count and total words, page count
    /// descending.
    pub async fn list_sections(&self) -> Result<Vec<SectionSummary>> {
        Ok(self.store.aggregate_stats().await?.sections)
    }

    /// Exact page fetch; `None` is a defined empty result, not an error.
    /// A non-canonical spelling of a stored URL is retried in canonical
    /// form.
    pub async fn get_page(&self, url: &str) -> Result<Option<PageContent>> {
        let mut page = self.store.get_by_url(url).await?;
        if page.is_none() {
            if let Some(canon) = canonical::canonicalize_absolute(url) {
                if canon != url {
                    page = self.store.get_by_url(&canon).await?;
                }
            }
        }

        Ok(page.map(|p| PageContent {
            title: p.title,
            url: p.url,
            section: p.section,
            subsection: p.subsection,
            markdown: p.markdown,
            word_count: p.word_count,
            scraped_at: format_ts_iso(p.scraped_at),
            metadata: p.metadata,
        }))
    }

    /// Pages within one section, word count descending.
    pub async fn browse_section(
        &self,
        section: &str,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<PageSummary>> {
        let q = &self.config.query;
        let limit = limit
            .unwrap_or(q.default_section_limit)
            .clamp(1, q.max_section_limit);
        Ok(self
            .store
            .list_by_section(section, limit, offset.max(0))
            .await?)
    }

    /// Store aggregates merged with static run configuration.
    pub async fn stats(&self) -> Result<StatsReport> {
        let stats = self.store.aggregate_stats().await?;
        let has_fts: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='pages_fts'",
        )
        .fetch_one(self.store.pool())
        .await?;

        Ok(StatsReport {
            total_pages: stats.total_pages,
            total_words: stats.total_words,
            sections: stats.sections,
            config: StatsConfig {
                display_name: self.config.display_name(),
                base_url: self.config.crawl.base_url.clone(),
                max_depth: self.config.crawl.max_depth,
                max_pages: self.config.crawl.max_pages,
                default_search_limit: self.config.query.default_search_limit,
                max_search_limit: self.config.query.max_search_limit,
                default_section_limit: self.config.query.default_section_limit,
                max_section_limit: self.config.query.max_section_limit,
                has_fts,
            },
        })
    }
}

/// Lowercased alphanumeric query tokens.
fn tokenize(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Fixed-length character window around the first case-insensitive
/// occurrence of any query token, with the matched span wrapped in
/// `<mark>` tags. With no occurrence, the leading window of the text.
fn make_snippet(text: &str, tokens: &[String], snippet_length: usize) -> String {
    let window = snippet_length.max(1);

    let matched = first_token_match(text, tokens);

    let (match_start, match_end) = match matched {
        Some(range) => range,
        None => {
            let end = ceil_boundary(text, window.min(text.len()));
            let mut out = text[..end].to_string();
            if end < text.len() {
                out.push_str("...");
            }
            return out;
        }
    };

    let center = (match_start + match_end) / 2;
    let mut start = floor_boundary(text, center.saturating_sub(window / 2));
    let mut end = ceil_boundary(text, (start + window).min(text.len()));
    // The window always contains the whole match.
    start = start.min(match_start);
    end = end.max(match_end);

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(&text[start..match_start]);
    out.push_str("<mark>");
    out.push_str(&text[match_start..match_end]);
    out.push_str("</mark>");
    out.push_str(&text[match_end..end]);
    if end < text.len() {
        out.push_str("...");
    }
    out
}

/// Byte range of the earliest case-insensitive occurrence of any token.
fn first_token_match(text: &str, tokens: &[String]) -> Option<(usize, usize)> {
    if tokens.is_empty() {
        return None;
    }
    let pattern = tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    let re = regex::RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()?;
    re.find(text).map(|m| (m.start(), m.end()))
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
