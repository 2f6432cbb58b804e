//! MCP JSON-RPC protocol bridge.
//!
//! Adapts the tool dispatcher to a proper MCP endpoint that Cursor, Claude,
//! and other MCP clients can connect to. The five documentation tools are
//! exposed via `list_tools` / `call_tool`; every call is parsed into the
//! dispatcher's closed request enum before execution.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler};
use tracing::error;

use crate::query::QueryEngine;
use crate::tools::{dispatch, tool_specs, ToolError, ToolRequest, ToolSpec};

/// Serves the documentation store to MCP clients.
///
/// Each MCP session receives a clone of this struct; all sessions share the
/// same store and configuration.
#[derive(Clone)]
pub struct DocsMcp {
    engine: QueryEngine,
    display_name: String,
}

impl DocsMcp {
    pub fn new(engine: QueryEngine, display_name: String) -> Self {
        Self {
            engine,
            display_name,
        }
    }

    /// Convert a dispatcher tool spec into an rmcp `Tool` descriptor.
    fn to_mcp_tool(spec: &ToolSpec) -> Tool {
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> =
            match spec.schema.clone() {
                serde_json::Value::Object(map) => Arc::new(map),
                _ => Arc::new(serde_json::Map::new()),
            };

        Tool {
            name: Cow::Borrowed(spec.name),
            title: None,
            description: Some(Cow::Borrowed(spec.description)),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }
}

impl ServerHandler for DocsMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "docdex".to_string(),
                title: Some(self.display_name.clone()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Searchable knowledge store for {}. Use search_documentation to find \
                 relevant pages, get_page_content to read one page in full, \
                 get_documentation_sections and browse_section to explore the \
                 structure, and get_documentation_stats for an overview.",
                self.display_name
            )),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = tool_specs().iter().map(Self::to_mcp_tool).collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        tool_specs()
            .iter()
            .find(|spec| spec.name == name)
            .map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        if !tool_specs().iter().any(|spec| spec.name == request.name) {
            return Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            ));
        }

        let args = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let parsed = match ToolRequest::parse(&request.name, &args) {
            Ok(parsed) => parsed,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        };

        match dispatch(&self.engine, parsed).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(ToolError::Validation(msg)) => {
                Ok(CallToolResult::error(vec![Content::text(msg)]))
            }
            Err(ToolError::Internal(e)) => {
                // Internal detail stays in the log; the caller gets an
                // opaque failure.
                error!(tool = %request.name, error = %e, "tool execution failed");
                Ok(CallToolResult::error(vec![Content::text(format!(
                    "{} failed, see server logs",
                    request.name
                ))]))
            }
        }
    }
}
