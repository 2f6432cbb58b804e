//! Crawl run orchestration.
//!
//! Drives one single-writer crawl: seed → frontier → fetch → normalize →
//! classify → commit (store-then-mark) → enqueue discovered links. The run
//! is resumable at any interruption point: the visited set lives in the
//! crawl cache, and the frontier is reconstructed from the seed URL plus
//! links re-extracted from already-stored page content.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::canonical;
use crate::config::Config;
use crate::error::IngestError;
use crate::fetch::Fetcher;
use crate::frontier::{Frontier, UrlFilter};
use crate::models::{CrawlOutcome, Page};
use crate::normalize::{extract_links, Normalizer};
use crate::sections::SectionClassifier;
use crate::store::{RecordOutcome, StorageEngine, VisitStatus};

pub struct Crawler {
    config: Config,
    store: StorageEngine,
    fetcher: Arc<dyn Fetcher>,
    normalizer: Normalizer,
    classifier: SectionClassifier,
}

impl Crawler {
    pub fn new(config: Config, store: StorageEngine, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let normalizer = Normalizer::from_config(&config.content)?;
        let classifier = SectionClassifier::from_config(&config.sections);
        Ok(Self {
            config,
            store,
            fetcher,
            normalizer,
            classifier,
        })
    }

    /// Run the crawl until the frontier is empty or the page budget is
    /// reached, whichever comes first.
    pub async fn run(&self) -> Result<CrawlOutcome> {
        let crawl = &self.config.crawl;
        let seed = canonical::canonicalize_absolute(&crawl.base_url)
            .ok_or_else(|| anyhow::anyhow!("base_url is not a crawlable URL: {}", crawl.base_url))?;

        info!(
            seed = %seed,
            max_depth = crawl.max_depth,
            max_pages = crawl.max_pages,
            "starting crawl"
        );

        let mut frontier = self.build_frontier(&seed).await?;

        // The pages-stored counter continues a resumed run.
        let mut pages_stored = self.store.count_visited_ok().await? as usize;
        let mut outcome = CrawlOutcome::default();
        let delay = Duration::from_secs_f64(crawl.delay_between_requests.max(0.0));
        let mut fetched_any = false;
        let started = std::time::Instant::now();

        while pages_stored < crawl.max_pages {
            let (page_url, depth) = match frontier.dequeue() {
                Some(next) => next,
                None => break,
            };

            // Consulted before any fetch is issued, so a resumed run never
            // re-fetches completed work.
            if self.store.is_visited(&page_url).await? {
                debug!(url = %page_url, "already visited, skipping");
                continue;
            }

            if fetched_any && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            fetched_any = true;

            match self.ingest_one(&page_url, depth).await {
                Ok((record, links)) => {
                    pages_stored += 1;
                    match record {
                        RecordOutcome::Stored => outcome.pages_stored += 1,
                        RecordOutcome::Unchanged => outcome.pages_skipped_unchanged += 1,
                    }
                    info!(url = %page_url, depth, total = pages_stored, "page stored");

                    if let Ok(base) = Url::parse(&page_url) {
                        for href in links {
                            if let Some(link) = canonical::canonicalize(&base, &href) {
                                frontier.enqueue(link, depth + 1);
                            }
                        }
                    }
                }
                Err(e) if e.is_fatal() => {
                    error!(url = %page_url, error = %e, "store unusable, halting run");
                    return Err(e.into());
                }
                Err(IngestError::Fetch { url, reason }) => {
                    warn!(url = %url, reason = %reason, "fetch failed, skipping");
                    outcome.fetch_failures += 1;
                }
                Err(IngestError::Parse { url, reason }) => {
                    warn!(url = %url, reason = %reason, "no usable content, skipping");
                    self.store
                        .mark_visited(&url, VisitStatus::Failed, depth)
                        .await?;
                    outcome.parse_failures += 1;
                }
                Err(e @ IngestError::Storage(_)) => {
                    // Page-local storage failure: the URL stays unvisited
                    // and is retried on the next run.
                    error!(url = %page_url, error = %e, "page commit failed");
                    outcome.storage_failures += 1;
                }
            }
        }

        info!(
            stored = outcome.pages_stored,
            unchanged = outcome.pages_skipped_unchanged,
            fetch_failures = outcome.fetch_failures,
            parse_failures = outcome.parse_failures,
            storage_failures = outcome.storage_failures,
            pending = frontier.pending(),
            elapsed_secs = started.elapsed().as_secs(),
            "crawl finished"
        );

        Ok(outcome)
    }

    /// Seed the frontier for a fresh or resumed run: the configured seed URL
    /// at depth 0, plus links re-discovered from every stored page. The
    /// seen-set starts as the cache's visited set.
    async fn build_frontier(&self, seed: &str) -> Result<Frontier> {
        let filter = UrlFilter::from_config(&self.config.crawl)?;
        let mut frontier = Frontier::new(filter, self.config.crawl.max_depth);

        let visited = self.store.visited_urls().await?;
        let resuming = !visited.is_empty();
        frontier.seed_seen(visited);

        frontier.enqueue(seed.to_string(), 0);

        if resuming {
            for visit in self.store.completed_visits().await? {
                let base = match Url::parse(&visit.url) {
                    Ok(u) => u,
                    Err(_) => continue,
                };
                for href in extract_links(&visit.content) {
                    if let Some(link) = canonical::canonicalize(&base, &href) {
                        frontier.enqueue(link, visit.depth + 1);
                    }
                }
            }
            info!(pending = frontier.pending(), "resumed from crawl cache");
        }

        Ok(frontier)
    }

    /// Fetch, normalize, classify, and commit one page. Returns the commit
    /// outcome and the raw hrefs discovered on the page.
    async fn ingest_one(
        &self,
        page_url: &str,
        depth: u32,
    ) -> Result<(RecordOutcome, Vec<String>), IngestError> {
        let fetched = self.fetcher.fetch(page_url).await?;
        let content = self.normalizer.normalize(page_url, &fetched.html)?;
        let labels = self.classifier.classify(page_url);

        let metadata = serde_json::json!({
            "fetched_url": fetched.url,
            "depth": depth,
        });

        let page = Page {
            url: page_url.to_string(),
            title: content.title,
            content: fetched.html.clone(),
            markdown: content.markdown,
            word_count: content.word_count as i64,
            section: labels.section,
            subsection: labels.subsection,
            scraped_at: chrono::Utc::now().timestamp(),
            metadata,
        };

        let record = self.store.record_page(&page, depth).await?;
        let links = extract_links(&fetched.html);
        Ok((record, links))
    }
}
