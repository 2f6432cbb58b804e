//! # docdex CLI
//!
//! The `docdex` binary crawls a documentation website into a searchable
//! SQLite knowledge store and serves it to AI agents over MCP.
//!
//! ## Usage
//!
//! ```bash
//! docdex --config ./docdex.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docdex init` | Create the SQLite store and run schema migrations |
//! | `docdex crawl` | Crawl the configured site (resumes automatically) |
//! | `docdex search "<query>"` | Full-text search over stored pages |
//! | `docdex sections` | List sections with page and word counts |
//! | `docdex browse <section>` | List the pages of one section |
//! | `docdex get <url>` | Print one stored page in full |
//! | `docdex stats` | Store statistics |
//! | `docdex reset --yes` | Drop all pages and the crawl cache |
//! | `docdex serve mcp` | Start the MCP server |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use docdex::config::{self, Config};
use docdex::crawl::Crawler;
use docdex::db;
use docdex::fetch::HttpFetcher;
use docdex::migrate;
use docdex::query::QueryEngine;
use docdex::server;
use docdex::store::StorageEngine;

/// docdex — crawl documentation websites into a searchable knowledge store
/// for AI agents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; see `docdex.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docdex",
    about = "Crawl a documentation website into a searchable SQLite knowledge store and serve it to AI agents over MCP",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./docdex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the store schema.
    ///
    /// Creates the SQLite file with the page table, full-text index, and
    /// crawl cache. Idempotent — running it multiple times is safe.
    Init,

    /// Crawl the configured documentation site.
    ///
    /// Resumes automatically: URLs recorded in the crawl cache are never
    /// re-fetched. Use `--fresh` to reset the store first.
    Crawl {
        /// Reset the store and crawl cache before crawling.
        #[arg(long)]
        fresh: bool,

        /// Override the configured page budget for this run.
        #[arg(long)]
        max_pages: Option<usize>,

        /// Override the configured depth cutoff for this run.
        #[arg(long)]
        max_depth: Option<u32>,
    },

    /// Search stored pages.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results (clamped to the configured maximum).
        #[arg(long)]
        limit: Option<i64>,

        /// Restrict matches to one section.
        #[arg(long)]
        section: Option<String>,
    },

    /// List all sections with page and word counts.
    Sections,

    /// List the pages of one section, largest first.
    Browse {
        /// Section name (as shown by `docdex sections`).
        section: String,

        /// Maximum number of pages (clamped to the configured maximum).
        #[arg(long)]
        limit: Option<i64>,

        /// Number of pages to skip.
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Print one stored page in full.
    Get {
        /// Canonical URL of the page.
        url: String,
    },

    /// Print store statistics.
    Stats,

    /// Drop all pages, index entries, and crawl-cache rows.
    ///
    /// The only way to invalidate the crawl cache; the next crawl starts
    /// from scratch.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },

    /// Start a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the MCP server on `[server].bind`.
    Mcp,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docdex=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Store initialized at {}", cfg.db.path.display());
        }
        Commands::Crawl {
            fresh,
            max_pages,
            max_depth,
        } => {
            let mut cfg = cfg;
            if let Some(pages) = max_pages {
                cfg.crawl.max_pages = pages;
            }
            if let Some(depth) = max_depth {
                cfg.crawl.max_depth = depth;
            }
            run_crawl(cfg, fresh).await?;
        }
        Commands::Search {
            query,
            limit,
            section,
        } => {
            let engine = open_engine(&cfg).await?;
            let hits = engine.search(&query, limit, section.as_deref()).await?;
            print_search_results(&hits);
        }
        Commands::Sections => {
            let engine = open_engine(&cfg).await?;
            let sections = engine.list_sections().await?;
            print_sections(&sections);
        }
        Commands::Browse {
            section,
            limit,
            offset,
        } => {
            let engine = open_engine(&cfg).await?;
            let pages = engine.browse_section(&section, limit, offset).await?;
            if pages.is_empty() {
                println!("No pages in section '{}'.", section);
            }
            for page in &pages {
                println!("{:>7}  {}  {}", page.word_count, page.title, page.url);
            }
        }
        Commands::Get { url } => {
            let engine = open_engine(&cfg).await?;
            match engine.get_page(&url).await? {
                Some(page) => print_page(&page),
                None => println!("Not found: {}", url),
            }
        }
        Commands::Stats => {
            let engine = open_engine(&cfg).await?;
            let report = engine.stats().await?;
            print_stats(&report, &cfg);
        }
        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!("reset drops every stored page; re-run with --yes to confirm");
            }
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            let store = StorageEngine::new(pool);
            store.reset().await?;
            println!("Store reset; the next crawl starts from scratch.");
        }
        Commands::Serve { service } => match service {
            ServeService::Mcp => {
                server::run_server(&cfg).await?;
            }
        },
    }

    Ok(())
}

async fn open_engine(cfg: &Config) -> Result<QueryEngine> {
    let pool = db::connect(&cfg.db.path).await?;
    migrate::run_migrations(&pool).await?;
    Ok(QueryEngine::new(StorageEngine::new(pool), cfg.clone()))
}

async fn run_crawl(cfg: Config, fresh: bool) -> Result<()> {
    let pool = db::connect(&cfg.db.path).await?;
    migrate::run_migrations(&pool).await?;
    let store = StorageEngine::new(pool);

    if fresh {
        store.reset().await?;
        println!("Store reset for a fresh crawl.");
    }

    let fetcher = Arc::new(HttpFetcher::new(&cfg.crawl)?);
    let crawler = Crawler::new(cfg, store.clone(), fetcher)?;
    let outcome = crawler.run().await?;

    println!("crawl complete");
    println!("  pages stored:     {}", outcome.pages_stored);
    println!("  unchanged:        {}", outcome.pages_skipped_unchanged);
    println!("  fetch failures:   {}", outcome.fetch_failures);
    println!("  parse failures:   {}", outcome.parse_failures);
    println!("  storage failures: {}", outcome.storage_failures);
    println!("  total in store:   {}", store.count_pages().await?);

    Ok(())
}

fn print_search_results(hits: &[docdex::models::SearchHit]) {
    if hits.is_empty() {
        println!("No results.");
        return;
    }
    for (i, hit) in hits.iter().enumerate() {
        println!("{}. {} [{}]", i + 1, hit.title, hit.section);
        println!("    url: {}", hit.url);
        println!(
            "    excerpt: \"{}\"",
            hit.snippet.replace('\n', " ").trim()
        );
        println!();
    }
}

fn print_sections(sections: &[docdex::models::SectionSummary]) {
    if sections.is_empty() {
        println!("No sections.");
        return;
    }
    println!("{:<24} {:>6} {:>10} {:>10}", "SECTION", "PAGES", "WORDS", "AVG");
    println!("{}", "-".repeat(54));
    for s in sections {
        println!(
            "{:<24} {:>6} {:>10} {:>10.1}",
            s.section, s.page_count, s.total_words, s.avg_words
        );
    }
}

fn print_page(page: &docdex::models::PageContent) {
    println!("--- Page ---");
    println!("title:      {}", page.title);
    println!("url:        {}", page.url);
    println!("section:    {}", page.section);
    if let Some(ref sub) = page.subsection {
        println!("subsection: {}", sub);
    }
    println!("words:      {}", page.word_count);
    println!("scraped_at: {}", page.scraped_at);
    println!("metadata:   {}", page.metadata);
    println!();
    println!("{}", page.markdown);
}

fn print_stats(report: &docdex::query::StatsReport, cfg: &Config) {
    println!("docdex — Store Stats");
    println!("====================");
    println!();
    println!("  Store:       {}", cfg.db.path.display());
    println!("  Name:        {}", report.config.display_name);
    println!("  Pages:       {}", report.total_pages);
    println!("  Words:       {}", report.total_words);
    println!(
        "  Full-text:   {}",
        if report.config.has_fts { "yes" } else { "no" }
    );
    if !report.sections.is_empty() {
        println!();
        print_sections(&report.sections);
    }
}
