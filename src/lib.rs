//! # docdex
//!
//! Turns a documentation website into a structured, searchable SQLite
//! knowledge store and serves narrow, well-typed lookups against it to AI
//! agents over MCP.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌───────────┐
//! │ Frontier │──▶│  Fetch +      │──▶│  SQLite    │
//! │ BFS/dedup│   │  Normalize    │   │ pages+FTS5 │
//! └──────────┘   └───────────────┘   └─────┬─────┘
//!       ▲              crawl cache         │
//!       └──────────── (resume) ────────────┤
//!                          ┌───────────────┤
//!                          ▼               ▼
//!                     ┌──────────┐   ┌──────────┐
//!                     │   CLI    │   │   MCP    │
//!                     │ (docdex) │   │  (HTTP)  │
//!                     └──────────┘   └──────────┘
//! ```
//!
//! ## Quick start
//!
//! ```bash
//! docdex init                    # create the store
//! docdex crawl                   # crawl the configured site
//! docdex search "authentication"
//! docdex serve mcp               # expose the five agent tools
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`canonical`] | URL canonicalization (identity keys) |
//! | [`frontier`] | BFS crawl frontier with filters and budgets |
//! | [`fetch`] | Page fetching seam |
//! | [`normalize`] | Content normalization and link extraction |
//! | [`sections`] | Section classification from URL paths |
//! | [`store`] | Storage engine and crawl cache |
//! | [`crawl`] | Crawl run orchestration |
//! | [`query`] | Search, browse, retrieval, statistics |
//! | [`tools`] | The five agent-facing tool operations |
//! | [`mcp`] | MCP protocol bridge |
//! | [`server`] | MCP HTTP server |

pub mod canonical;
pub mod config;
pub mod crawl;
pub mod db;
pub mod error;
pub mod fetch;
pub mod frontier;
pub mod mcp;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod query;
pub mod sections;
pub mod server;
pub mod store;
pub mod tools;
