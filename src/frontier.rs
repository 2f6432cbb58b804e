//! Breadth-first crawl frontier.
//!
//! Holds the ordered queue of (url, depth) candidates for one run. A URL is
//! accepted at most once per run: candidates are deduplicated on their
//! canonical form at enqueue time, the queue is FIFO, and depth-ordered
//! discovery makes the overall order breadth-first (every depth-d candidate
//! dequeues before any depth-(d+1) one, ties broken by enqueue order).
//!
//! On resume the seen-set is seeded from the crawl cache's visited set, so
//! previously completed URLs are never re-enqueued.

use std::collections::{HashSet, VecDeque};

use anyhow::{Context, Result};
use regex::RegexBuilder;
use url::Url;

use crate::config::CrawlConfig;

/// Allow/deny rules applied before a URL may enter the frontier.
pub struct UrlFilter {
    allowed_domains: Vec<String>,
    skip_patterns: Vec<regex::Regex>,
}

impl UrlFilter {
    /// Build the filter from run configuration. With no explicit allowlist,
    /// crawling is confined to the seed URL's host.
    pub fn from_config(config: &CrawlConfig) -> Result<Self> {
        let mut allowed_domains = config.allowed_domains.clone();
        if allowed_domains.is_empty() {
            let seed = Url::parse(&config.base_url)
                .with_context(|| format!("invalid base_url: {}", config.base_url))?;
            if let Some(host) = seed.host_str() {
                allowed_domains.push(host.to_string());
            }
        }

        let skip_patterns = config
            .skip_patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("invalid skip pattern: {}", p))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            allowed_domains,
            skip_patterns,
        })
    }

    /// Whether a canonical URL may be crawled at all.
    pub fn allows(&self, url: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(_) => return false,
        };

        match parsed.host_str() {
            Some(host) => {
                if !self.allowed_domains.iter().any(|d| d == host) {
                    return false;
                }
            }
            None => return false,
        }

        !self.skip_patterns.iter().any(|re| re.is_match(url))
    }
}

/// Ordered work queue of pending (canonical url, depth) pairs.
pub struct Frontier {
    queue: VecDeque<(String, u32)>,
    seen: HashSet<String>,
    filter: UrlFilter,
    max_depth: u32,
}

impl Frontier {
    pub fn new(filter: UrlFilter, max_depth: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            filter,
            max_depth,
        }
    }

    /// Seed the seen-set with URLs already completed in an earlier run.
    /// Seeded URLs are never enqueued again.
    pub fn seed_seen<I: IntoIterator<Item = String>>(&mut self, urls: I) {
        self.seen.extend(urls);
    }

    /// Offer a canonical URL at the given depth. Returns `true` if it was
    /// accepted into the queue; duplicates, over-depth candidates, and
    /// filtered URLs are silently refused.
    pub fn enqueue(&mut self, url: String, depth: u32) -> bool {
        if depth > self.max_depth {
            return false;
        }
        if self.seen.contains(&url) {
            return false;
        }
        if !self.filter.allows(&url) {
            return false;
        }

        self.seen.insert(url.clone());
        self.queue.push_back((url, depth));
        true
    }

    /// Next candidate in breadth-first order, or `None` when the run's work
    /// is exhausted.
    pub fn dequeue(&mut self) -> Option<(String, u32)> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
