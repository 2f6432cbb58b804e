//! Tool dispatcher for the agent boundary.
//!
//! Exactly five operations are exposed, modeled as a closed request enum:
//! every call is parsed into a [`ToolRequest`] variant up front (rejecting
//! unknown names and missing fields with a descriptive validation error),
//! then dispatched through one exhaustive match into the query engine.
//! Internal errors never cross the boundary in their raw shape.

use serde_json::{json, Value};

use crate::query::QueryEngine;

/// The five agent-facing operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    SearchDocumentation {
        query: String,
        limit: Option<i64>,
        section: Option<String>,
    },
    GetDocumentationSections,
    GetPageContent {
        url: String,
    },
    BrowseSection {
        section: String,
        limit: Option<i64>,
    },
    GetDocumentationStats,
}

/// Boundary-visible failure classes.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Caller input outside the accepted shapes or bounds.
    #[error("{0}")]
    Validation(String),
    /// Anything internal; rendered as an opaque boundary error.
    #[error("tool execution failed: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ToolRequest {
    /// Parse a named tool call with JSON arguments into a request variant.
    pub fn parse(name: &str, args: &Value) -> Result<Self, ToolError> {
        match name {
            "search_documentation" => Ok(ToolRequest::SearchDocumentation {
                query: required_str(args, "query")?,
                limit: optional_int(args, "limit")?,
                section: optional_str(args, "section")?,
            }),
            "get_documentation_sections" => Ok(ToolRequest::GetDocumentationSections),
            "get_page_content" => Ok(ToolRequest::GetPageContent {
                url: required_str(args, "url")?,
            }),
            "browse_section" => Ok(ToolRequest::BrowseSection {
                section: required_str(args, "section")?,
                limit: optional_int(args, "limit")?,
            }),
            "get_documentation_stats" => Ok(ToolRequest::GetDocumentationStats),
            other => Err(ToolError::Validation(format!(
                "unknown tool: {}. Available: search_documentation, \
                 get_documentation_sections, get_page_content, browse_section, \
                 get_documentation_stats",
                other
            ))),
        }
    }
}

/// Execute one request against the query engine.
pub async fn dispatch(engine: &QueryEngine, request: ToolRequest) -> Result<Value, ToolError> {
    match request {
        ToolRequest::SearchDocumentation {
            query,
            limit,
            section,
        } => {
            let hits = engine.search(&query, limit, section.as_deref()).await?;
            Ok(serde_json::to_value(hits).map_err(anyhow::Error::from)?)
        }
        ToolRequest::GetDocumentationSections => {
            let sections = engine.list_sections().await?;
            Ok(serde_json::to_value(sections).map_err(anyhow::Error::from)?)
        }
        ToolRequest::GetPageContent { url } => match engine.get_page(&url).await? {
            Some(page) => {
                let mut value = serde_json::to_value(page).map_err(anyhow::Error::from)?;
                if let Value::Object(ref mut map) = value {
                    map.insert("found".to_string(), Value::Bool(true));
                }
                Ok(value)
            }
            None => Ok(json!({ "found": false, "url": url })),
        },
        ToolRequest::BrowseSection { section, limit } => {
            let pages = engine.browse_section(&section, limit, 0).await?;
            Ok(serde_json::to_value(pages).map_err(anyhow::Error::from)?)
        }
        ToolRequest::GetDocumentationStats => {
            let report = engine.stats().await?;
            Ok(serde_json::to_value(report).map_err(anyhow::Error::from)?)
        }
    }
}

/// Static descriptor for the tool listing.
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: Value,
}

/// The five tools with their parameter schemas, in listing order.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "search_documentation",
            description: "Search the documentation via full-text search; returns matching pages with highlighted snippets",
            schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query text" },
                    "limit": { "type": "integer", "description": "Maximum number of results" },
                    "section": { "type": "string", "description": "Restrict matches to one section" }
                },
                "required": ["query"]
            }),
        },
        ToolSpec {
            name: "get_documentation_sections",
            description: "List all documentation sections with page and word counts",
            schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolSpec {
            name: "get_page_content",
            description: "Fetch the full content of one documentation page by URL",
            schema: json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "Canonical URL of the page" }
                },
                "required": ["url"]
            }),
        },
        ToolSpec {
            name: "browse_section",
            description: "List the pages of one section, largest first",
            schema: json!({
                "type": "object",
                "properties": {
                    "section": { "type": "string", "description": "Section name" },
                    "limit": { "type": "integer", "description": "Maximum number of pages" }
                },
                "required": ["section"]
            }),
        },
        ToolSpec {
            name: "get_documentation_stats",
            description: "Overall statistics for the documentation store",
            schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

fn required_str(args: &Value, field: &str) -> Result<String, ToolError> {
    match args.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(ToolError::Validation(format!(
            "{} must not be empty",
            field
        ))),
        Some(_) => Err(ToolError::Validation(format!("{} must be a string", field))),
        None => Err(ToolError::Validation(format!(
            "missing required field: {}",
            field
        ))),
    }
}

fn optional_str(args: &Value, field: &str) -> Result<Option<String>, ToolError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ToolError::Validation(format!("{} must be a string", field))),
    }
}

fn optional_int(args: &Value, field: &str) -> Result<Option<i64>, ToolError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
            ToolError::Validation(format!("{} must be an integer", field))
        }),
        Some(_) => Err(ToolError::Validation(format!(
            "{} must be an integer",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_with_all_fields() {
        let req = ToolRequest::parse(
            "search_documentation",
            &json!({ "query": "auth", "limit": 5, "section": "guides" }),
        )
        .unwrap();
        assert_eq!(
            req,
            ToolRequest::SearchDocumentation {
                query: "auth".to_string(),
                limit: Some(5),
                section: Some("guides".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_tool() {
        let err = ToolRequest::parse("delete_everything", &json!({})).unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
        assert!(err.to_string().contains("unknown tool"));
    }

    #[test]
    fn test_parse_rejects_missing_query() {
        let err = ToolRequest::parse("search_documentation", &json!({})).unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn test_parse_rejects_empty_url() {
        let err = ToolRequest::parse("get_page_content", &json!({ "url": "  " })).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_parse_rejects_wrong_limit_type() {
        let err = ToolRequest::parse(
            "browse_section",
            &json!({ "section": "guides", "limit": "ten" }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn test_parse_niladic_tools_ignore_args() {
        let req = ToolRequest::parse("get_documentation_stats", &json!({})).unwrap();
        assert_eq!(req, ToolRequest::GetDocumentationStats);
        let req = ToolRequest::parse("get_documentation_sections", &json!({})).unwrap();
        assert_eq!(req, ToolRequest::GetDocumentationSections);
    }

    #[test]
    fn test_specs_cover_exactly_the_five_tools() {
        let names: Vec<_> = tool_specs().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "search_documentation",
                "get_documentation_sections",
                "get_page_content",
                "browse_section",
                "get_documentation_stats",
            ]
        );
    }
}
