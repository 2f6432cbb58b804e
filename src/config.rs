use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub sections: SectionsConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlConfig {
    /// Seed URL the crawl starts from.
    pub base_url: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Politeness interval between consecutive fetches, in seconds.
    #[serde(default = "default_delay")]
    pub delay_between_requests: f64,
    /// Hosts the frontier may enqueue. Empty means "the seed's host only".
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    /// URLs matching any of these patterns are never enqueued.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_depth() -> u32 {
    3
}
fn default_max_pages() -> usize {
    200
}
fn default_delay() -> f64 {
    0.5
}
fn default_user_agent() -> String {
    format!("docdex/{}", env!("CARGO_PKG_VERSION"))
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ContentConfig {
    /// Boilerplate removal patterns, applied in declaration order.
    #[serde(default)]
    pub remove_patterns: Vec<String>,
    #[serde(default = "default_max_newlines")]
    pub max_consecutive_newlines: usize,
}

fn default_max_newlines() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SectionsConfig {
    /// Path-prefix overrides checked before the segment-derived labels.
    #[serde(default)]
    pub overrides: Vec<SectionOverride>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SectionOverride {
    /// URL path prefix, e.g. `/reference/api`.
    pub prefix: String,
    pub section: String,
    #[serde(default)]
    pub subsection: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_search_limit")]
    pub default_search_limit: i64,
    #[serde(default = "default_max_search_limit")]
    pub max_search_limit: i64,
    #[serde(default = "default_section_limit")]
    pub default_section_limit: i64,
    #[serde(default = "default_max_section_limit")]
    pub max_section_limit: i64,
    /// Snippet window size in characters.
    #[serde(default = "default_snippet_length")]
    pub snippet_length: usize,
    /// Fall back to a substring scan when the FTS index can't serve a query.
    #[serde(default = "default_true")]
    pub enable_fts_fallback: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_search_limit: default_search_limit(),
            max_search_limit: default_max_search_limit(),
            default_section_limit: default_section_limit(),
            max_section_limit: default_max_section_limit(),
            snippet_length: default_snippet_length(),
            enable_fts_fallback: true,
        }
    }
}

fn default_search_limit() -> i64 {
    10
}
fn default_max_search_limit() -> i64 {
    50
}
fn default_section_limit() -> i64 {
    20
}
fn default_max_section_limit() -> i64 {
    100
}
fn default_snippet_length() -> usize {
    160
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Display name for the documentation set; derived from the seed host
    /// when unset.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            display_name: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7331".to_string()
}

impl Config {
    /// Resolved display name: configured value, else the seed URL's host.
    pub fn display_name(&self) -> String {
        if let Some(ref name) = self.server.display_name {
            return name.clone();
        }
        url::Url::parse(&self.crawl.base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| "Documentation".to_string())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let base = url::Url::parse(&config.crawl.base_url)
        .with_context(|| format!("crawl.base_url is not a valid URL: {}", config.crawl.base_url))?;
    if !matches!(base.scheme(), "http" | "https") {
        anyhow::bail!("crawl.base_url must be http or https");
    }

    if config.crawl.max_pages == 0 {
        anyhow::bail!("crawl.max_pages must be >= 1");
    }
    if config.crawl.delay_between_requests < 0.0 {
        anyhow::bail!("crawl.delay_between_requests must be >= 0");
    }

    for pattern in &config.crawl.skip_patterns {
        regex::Regex::new(pattern)
            .with_context(|| format!("crawl.skip_patterns entry does not compile: {}", pattern))?;
    }
    for pattern in &config.content.remove_patterns {
        regex::Regex::new(pattern).with_context(|| {
            format!("content.remove_patterns entry does not compile: {}", pattern)
        })?;
    }

    let q = &config.query;
    if q.default_search_limit < 1 || q.default_section_limit < 1 {
        anyhow::bail!("query default limits must be >= 1");
    }
    if q.default_search_limit > q.max_search_limit {
        anyhow::bail!("query.default_search_limit must be <= query.max_search_limit");
    }
    if q.default_section_limit > q.max_section_limit {
        anyhow::bail!("query.default_section_limit must be <= query.max_section_limit");
    }
    if q.snippet_length == 0 {
        anyhow::bail!("query.snippet_length must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    const MINIMAL: &str = r#"
[crawl]
base_url = "https://docs.example.com/"

[db]
path = "/tmp/docdex.sqlite"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.crawl.max_depth, 3);
        assert_eq!(config.crawl.max_pages, 200);
        assert_eq!(config.query.default_search_limit, 10);
        assert_eq!(config.query.max_search_limit, 50);
        assert!(config.query.enable_fts_fallback);
        assert_eq!(config.server.bind, "127.0.0.1:7331");
    }

    #[test]
    fn test_display_name_derived_from_host() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.display_name(), "docs.example.com");
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let src = MINIMAL.replace("https://docs.example.com/", "not a url");
        assert!(parse(&src).is_err());
    }

    #[test]
    fn test_rejects_invalid_skip_pattern() {
        let src = r#"
[crawl]
base_url = "https://docs.example.com/"
skip_patterns = ["[unclosed"]

[db]
path = "/tmp/docdex.sqlite"
"#;
        assert!(parse(src).is_err());
    }

    #[test]
    fn test_rejects_default_limit_above_max() {
        let src = r#"
[crawl]
base_url = "https://docs.example.com/"

[db]
path = "/tmp/docdex.sqlite"

[query]
default_search_limit = 60
max_search_limit = 50
"#;
        assert!(parse(src).is_err());
    }
}
