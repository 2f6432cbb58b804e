//! Content normalization.
//!
//! Turns raw fetched HTML into the clean text stored for search: markdown
//! conversion, boilerplate removal (an ordered list of configured rewrite
//! patterns, applied in declaration order), whitespace collapse, title
//! extraction, and the whitespace-token word count. Also extracts outbound
//! links for the frontier, in document order.

use anyhow::{Context, Result};
use regex::RegexBuilder;
use scraper::{Html, Selector};

use crate::config::ContentConfig;
use crate::error::IngestError;

/// Clean content produced from one fetched page.
#[derive(Debug, Clone)]
pub struct NormalizedContent {
    pub title: String,
    pub markdown: String,
    pub word_count: usize,
}

pub struct Normalizer {
    converter: htmd::HtmlToMarkdown,
    remove_patterns: Vec<regex::Regex>,
    newline_collapse: regex::Regex,
    max_newlines: usize,
    title_heading: regex::Regex,
}

impl Normalizer {
    pub fn from_config(config: &ContentConfig) -> Result<Self> {
        let converter = htmd::HtmlToMarkdown::builder()
            .skip_tags(vec!["script", "style", "nav", "footer", "header", "aside"])
            .build();

        let remove_patterns = config
            .remove_patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .dot_matches_new_line(true)
                    .build()
                    .with_context(|| format!("invalid remove pattern: {}", p))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_newlines = config.max_consecutive_newlines.max(1);
        let newline_collapse = regex::Regex::new(&format!(r"(?:\n[ \t]*){{{},}}", max_newlines + 1))
            .expect("static collapse pattern");

        let title_heading = regex::Regex::new(r"(?m)^#\s+(.+)$").expect("static heading pattern");

        Ok(Self {
            converter,
            remove_patterns,
            newline_collapse,
            max_newlines,
            title_heading,
        })
    }

    /// Normalize one page. `ParseError` when the cleaned body is empty.
    pub fn normalize(&self, url: &str, html: &str) -> Result<NormalizedContent, IngestError> {
        let parse_err = |reason: &str| IngestError::Parse {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let raw_markdown = self
            .converter
            .convert(html)
            .map_err(|e| parse_err(&format!("markdown conversion failed: {}", e)))?;

        let markdown = self.clean(&raw_markdown);
        if markdown.is_empty() {
            return Err(parse_err("empty body after cleaning"));
        }

        let title = self
            .extract_title(&markdown, html)
            .unwrap_or_else(|| "Untitled".to_string());

        let word_count = markdown.split_whitespace().count();

        Ok(NormalizedContent {
            title,
            markdown,
            word_count,
        })
    }

    /// Apply the configured removal patterns in declaration order, then
    /// collapse excess blank lines.
    fn clean(&self, markdown: &str) -> String {
        let mut text = markdown.to_string();
        for re in &self.remove_patterns {
            text = re.replace_all(&text, "").into_owned();
        }

        let replacement = "\n".repeat(self.max_newlines);
        text = self
            .newline_collapse
            .replace_all(&text, replacement.as_str())
            .into_owned();

        text.trim().to_string()
    }

    /// First ATX heading in the markdown, else the HTML `<title>`.
    fn extract_title(&self, markdown: &str, html: &str) -> Option<String> {
        if let Some(caps) = self.title_heading.captures(markdown) {
            let heading = caps[1].trim();
            if !heading.is_empty() {
                return Some(heading.to_string());
            }
        }

        let document = Html::parse_document(html);
        let selector = Selector::parse("title").expect("static selector");
        document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// All `<a href>` values in the document, in appearance order. Duplicate
/// hrefs are kept; the frontier's dedup handles them.
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector");
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| href.to_string())
        .collect()
}
