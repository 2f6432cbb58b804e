//! MCP HTTP server plumbing.
//!
//! Binds the address from `[server].bind` and serves the documentation
//! tools over MCP streamable HTTP at `/mcp`, plus a `GET /health` check.
//! All origins are permitted so browser-based clients and cross-origin MCP
//! tool calls work.
//!
//! Cursor/Claude configuration:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "docdex": { "url": "http://127.0.0.1:7331/mcp" }
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::mcp::DocsMcp;
use crate::query::QueryEngine;
use crate::store::StorageEngine;

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Start the MCP server. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;

    // The server is query-only; refuse to serve an uninitialized store.
    let has_pages: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='pages'",
    )
    .fetch_one(&pool)
    .await?;
    if !has_pages {
        anyhow::bail!(
            "store at {} has no page table — run `docdex init` and `docdex crawl` first",
            config.db.path.display()
        );
    }

    let store = StorageEngine::new(pool);
    let engine = QueryEngine::new(store, config.clone());
    let handler = DocsMcp::new(engine, config.display_name());

    let mcp_service = StreamableHttpService::new(
        move || Ok(handler.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .nest_service("/mcp", mcp_service)
        .layer(cors);

    let bind_addr = &config.server.bind;
    info!(bind = %bind_addr, "MCP server listening");
    println!("MCP server listening on http://{}/mcp", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
