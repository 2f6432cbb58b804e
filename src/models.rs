//! Core data types flowing through the ingestion and retrieval pipeline.

use serde::Serialize;

/// A single crawled document, keyed by its canonical URL.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub title: String,
    /// Raw fetched HTML.
    pub content: String,
    /// Normalized text body.
    pub markdown: String,
    pub word_count: i64,
    pub section: String,
    pub subsection: Option<String>,
    /// Unix seconds of the capture.
    pub scraped_at: i64,
    /// Open key-value bag.
    pub metadata: serde_json::Value,
}

/// Full page payload returned by `get_page_content`.
#[derive(Debug, Clone, Serialize)]
pub struct PageContent {
    pub title: String,
    pub url: String,
    pub section: String,
    pub subsection: Option<String>,
    pub markdown: String,
    pub word_count: i64,
    pub scraped_at: String, // ISO8601
    pub metadata: serde_json::Value,
}

/// Row shape for section browsing.
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub title: String,
    pub url: String,
    pub word_count: i64,
}

/// Per-section rollup, computed on demand from page rows.
#[derive(Debug, Clone, Serialize)]
pub struct SectionSummary {
    pub section: String,
    pub page_count: i64,
    pub total_words: i64,
    pub avg_words: f64,
}

/// One ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub section: String,
    pub subsection: Option<String>,
    pub word_count: i64,
    pub snippet: String,
}

/// Store-wide aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_pages: i64,
    pub total_words: i64,
    pub sections: Vec<SectionSummary>,
}

/// Counters reported at the end of a crawl run.
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    pub pages_stored: u64,
    pub pages_skipped_unchanged: u64,
    pub fetch_failures: u64,
    pub parse_failures: u64,
    pub storage_failures: u64,
}
