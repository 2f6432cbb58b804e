//! Storage engine, query engine, and tool dispatcher tests against a real
//! SQLite store in a temp directory.

use std::path::Path;

use serde_json::json;
use tempfile::TempDir;

use docdex::config::Config;
use docdex::db;
use docdex::migrate;
use docdex::models::Page;
use docdex::query::QueryEngine;
use docdex::store::{RecordOutcome, StorageEngine, VisitStatus};
use docdex::tools::{dispatch, ToolRequest};

fn test_config(db_path: &Path) -> Config {
    let toml_src = format!(
        r#"
[crawl]
base_url = "https://docs.example.com/"
max_depth = 3
max_pages = 200
delay_between_requests = 0.0

[db]
path = "{}"

[query]
default_search_limit = 10
max_search_limit = 50
default_section_limit = 20
max_section_limit = 100
snippet_length = 160
enable_fts_fallback = true
"#,
        db_path.display()
    );
    toml::from_str(&toml_src).unwrap()
}

fn page(url: &str, title: &str, markdown: &str, section: &str, subsection: Option<&str>) -> Page {
    Page {
        url: url.to_string(),
        title: title.to_string(),
        content: format!("<html><body>{}</body></html>", markdown),
        markdown: markdown.to_string(),
        word_count: markdown.split_whitespace().count() as i64,
        section: section.to_string(),
        subsection: subsection.map(String::from),
        scraped_at: 1_700_000_000,
        metadata: json!({ "depth": 1 }),
    }
}

async fn setup() -> (TempDir, StorageEngine, QueryEngine) {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("docdex.sqlite");
    let config = test_config(&db_path);

    let pool = db::connect(&db_path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    let store = StorageEngine::new(pool);
    let engine = QueryEngine::new(store.clone(), config);
    (tmp, store, engine)
}

async fn seed_auth_pages(store: &StorageEngine, n: usize) {
    for i in 0..n {
        let url = format!("https://docs.example.com/guides/auth-{}", i);
        let markdown = format!(
            "# Auth guide {}\n\nConfiguring auth tokens takes {} steps.",
            i,
            i + 1
        );
        let p = page(&url, &format!("Auth guide {}", i), &markdown, "guides", None);
        store.record_page(&p, 1).await.unwrap();
    }
}

#[tokio::test]
async fn test_upsert_and_fts_stay_in_lockstep() {
    let (_tmp, store, engine) = setup().await;

    let p = page(
        "https://docs.example.com/guides/install",
        "Install",
        "# Install\n\nRun the installer binary.",
        "guides",
        None,
    );
    assert_eq!(store.upsert_page(&p).await.unwrap(), RecordOutcome::Stored);

    let hits = engine.search("installer", None, None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, "https://docs.example.com/guides/install");

    // Overwrite by URL: the index follows the row in the same commit.
    let mut updated = p.clone();
    updated.markdown = "# Install\n\nUse the bootstrap script instead.".to_string();
    assert_eq!(
        store.upsert_page(&updated).await.unwrap(),
        RecordOutcome::Stored
    );

    assert!(engine.search("installer", None, None).await.unwrap().is_empty());
    let hits = engine.search("bootstrap", None, None).await.unwrap();
    assert_eq!(hits.len(), 1);

    // Still one row for the URL.
    assert_eq!(store.count_pages().await.unwrap(), 1);
}

#[tokio::test]
async fn test_unchanged_content_skips_rewrite() {
    let (_tmp, store, _engine) = setup().await;

    let p = page(
        "https://docs.example.com/guides/install",
        "Install",
        "# Install\n\nRun the installer binary.",
        "guides",
        None,
    );
    assert_eq!(store.upsert_page(&p).await.unwrap(), RecordOutcome::Stored);
    assert_eq!(
        store.upsert_page(&p).await.unwrap(),
        RecordOutcome::Unchanged
    );
}

#[tokio::test]
async fn test_search_token_present_in_one_page() {
    let (_tmp, store, engine) = setup().await;

    store
        .record_page(
            &page(
                "https://docs.example.com/guides/deploy",
                "Deploy",
                "# Deploy\n\nShip with the kubernetes operator.",
                "guides",
                None,
            ),
            1,
        )
        .await
        .unwrap();
    store
        .record_page(
            &page(
                "https://docs.example.com/guides/build",
                "Build",
                "# Build\n\nCompile the project locally.",
                "guides",
                None,
            ),
            1,
        )
        .await
        .unwrap();

    let hits = engine.search("kubernetes", None, None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, "https://docs.example.com/guides/deploy");

    let hits = engine.search("nonexistentterm", None, None).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_search_limit_and_snippet_highlight() {
    let (_tmp, store, engine) = setup().await;
    seed_auth_pages(&store, 5).await;

    let hits = engine.search("auth", Some(2), None).await.unwrap();
    assert_eq!(hits.len(), 2);
    for hit in &hits {
        assert!(
            hit.snippet.to_lowercase().contains("<mark>auth"),
            "snippet missing highlight: {}",
            hit.snippet
        );
    }
}

#[tokio::test]
async fn test_search_section_filter() {
    let (_tmp, store, engine) = setup().await;
    seed_auth_pages(&store, 2).await;
    store
        .record_page(
            &page(
                "https://docs.example.com/reference/auth-api",
                "Auth API",
                "# Auth API\n\nEvery auth endpoint documented.",
                "reference",
                Some("auth-api"),
            ),
            1,
        )
        .await
        .unwrap();

    let hits = engine.search("auth", None, Some("reference")).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].section, "reference");
}

#[tokio::test]
async fn test_fallback_scan_when_fts_missing() {
    let (_tmp, store, engine) = setup().await;
    seed_auth_pages(&store, 3).await;

    sqlx::query("DROP TABLE pages_fts")
        .execute(store.pool())
        .await
        .unwrap();

    // Same result shape, insertion order, still highlighted.
    let hits = engine.search("auth", None, None).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].url, "https://docs.example.com/guides/auth-0");
    assert!(hits[0].snippet.to_lowercase().contains("<mark>auth"));
}

#[tokio::test]
async fn test_sections_counts_match_stored_pages() {
    let (_tmp, store, engine) = setup().await;
    seed_auth_pages(&store, 3).await;
    store
        .record_page(
            &page(
                "https://docs.example.com/reference/errors",
                "Errors",
                "# Errors\n\nCodes and meanings.",
                "reference",
                None,
            ),
            1,
        )
        .await
        .unwrap();

    let sections = engine.list_sections().await.unwrap();
    assert_eq!(sections.len(), 2);
    // Page count descending.
    assert_eq!(sections[0].section, "guides");
    assert_eq!(sections[0].page_count, 3);

    let guides_words: i64 = {
        let mut total = 0;
        for i in 0..3 {
            let url = format!("https://docs.example.com/guides/auth-{}", i);
            total += store.get_by_url(&url).await.unwrap().unwrap().word_count;
        }
        total
    };
    assert_eq!(sections[0].total_words, guides_words);
}

#[tokio::test]
async fn test_browse_section_ordering() {
    let (_tmp, store, engine) = setup().await;

    store
        .record_page(
            &page(
                "https://docs.example.com/guides/b",
                "B",
                "# B\n\nshort",
                "guides",
                None,
            ),
            1,
        )
        .await
        .unwrap();
    store
        .record_page(
            &page(
                "https://docs.example.com/guides/a",
                "A",
                "# A\n\nquite a bit longer than the other one",
                "guides",
                None,
            ),
            1,
        )
        .await
        .unwrap();

    let pages = engine.browse_section("guides", None, 0).await.unwrap();
    assert_eq!(pages.len(), 2);
    // Word count descending.
    assert_eq!(pages[0].url, "https://docs.example.com/guides/a");
    assert_eq!(pages[1].url, "https://docs.example.com/guides/b");
}

#[tokio::test]
async fn test_get_page_and_canonical_fallback() {
    let (_tmp, store, engine) = setup().await;
    seed_auth_pages(&store, 1).await;

    let exact = engine
        .get_page("https://docs.example.com/guides/auth-0")
        .await
        .unwrap();
    assert!(exact.is_some());

    // Trailing slash and fragment resolve to the same page.
    let sloppy = engine
        .get_page("https://docs.example.com/guides/auth-0/#setup")
        .await
        .unwrap();
    assert!(sloppy.is_some());

    let missing = engine
        .get_page("https://docs.example.com/guides/missing")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_visits_round_trip() {
    let (_tmp, store, _engine) = setup().await;

    assert!(!store.is_visited("https://docs.example.com/a").await.unwrap());
    store
        .mark_visited("https://docs.example.com/a", VisitStatus::Failed, 2)
        .await
        .unwrap();
    assert!(store.is_visited("https://docs.example.com/a").await.unwrap());
    assert_eq!(store.count_visited_ok().await.unwrap(), 0);

    seed_auth_pages(&store, 1).await;
    assert_eq!(store.count_visited_ok().await.unwrap(), 1);
    let visited = store.visited_urls().await.unwrap();
    assert_eq!(visited.len(), 2);
}

#[tokio::test]
async fn test_reset_clears_everything() {
    let (_tmp, store, engine) = setup().await;
    seed_auth_pages(&store, 2).await;

    store.reset().await.unwrap();
    assert_eq!(store.count_pages().await.unwrap(), 0);
    assert!(store.visited_urls().await.unwrap().is_empty());
    assert!(engine.search("auth", None, None).await.unwrap().is_empty());
}

// ── Tool dispatcher shapes ──────────────────────────────────────────────

#[tokio::test]
async fn test_dispatch_search_shape() {
    let (_tmp, store, engine) = setup().await;
    seed_auth_pages(&store, 5).await;

    let req = ToolRequest::parse(
        "search_documentation",
        &json!({ "query": "auth", "limit": 2 }),
    )
    .unwrap();
    let value = dispatch(&engine, req).await.unwrap();

    let results = value.as_array().unwrap();
    assert_eq!(results.len(), 2);
    for r in results {
        assert!(r.get("title").is_some());
        assert!(r.get("url").is_some());
        assert!(r.get("section").is_some());
        assert!(r.get("word_count").is_some());
        assert!(r["snippet"].as_str().unwrap().contains("<mark>"));
    }
}

#[tokio::test]
async fn test_dispatch_limit_clamped_to_max() {
    let (_tmp, store, engine) = setup().await;
    seed_auth_pages(&store, 5).await;

    // max_search_limit is 50; an absurd limit comes back clamped.
    let req = ToolRequest::parse(
        "search_documentation",
        &json!({ "query": "auth", "limit": 100000 }),
    )
    .unwrap();
    let value = dispatch(&engine, req).await.unwrap();
    assert!(value.as_array().unwrap().len() <= 50);
}

#[tokio::test]
async fn test_dispatch_get_page_not_found_is_defined_result() {
    let (_tmp, _store, engine) = setup().await;

    let req = ToolRequest::parse(
        "get_page_content",
        &json!({ "url": "https://docs.example.com/missing" }),
    )
    .unwrap();
    let value = dispatch(&engine, req).await.unwrap();
    assert_eq!(value["found"], json!(false));
    assert_eq!(value["url"], json!("https://docs.example.com/missing"));
}

#[tokio::test]
async fn test_dispatch_get_page_found() {
    let (_tmp, store, engine) = setup().await;
    seed_auth_pages(&store, 1).await;

    let req = ToolRequest::parse(
        "get_page_content",
        &json!({ "url": "https://docs.example.com/guides/auth-0" }),
    )
    .unwrap();
    let value = dispatch(&engine, req).await.unwrap();
    assert_eq!(value["found"], json!(true));
    assert_eq!(value["section"], json!("guides"));
    assert!(value["markdown"].as_str().unwrap().contains("auth tokens"));
    assert!(value.get("metadata").is_some());
}

#[tokio::test]
async fn test_dispatch_sections_and_stats_shapes() {
    let (_tmp, store, engine) = setup().await;
    seed_auth_pages(&store, 2).await;

    let sections = dispatch(&engine, ToolRequest::GetDocumentationSections)
        .await
        .unwrap();
    let first = &sections.as_array().unwrap()[0];
    assert_eq!(first["section"], json!("guides"));
    assert_eq!(first["page_count"], json!(2));
    assert!(first.get("total_words").is_some());

    let stats = dispatch(&engine, ToolRequest::GetDocumentationStats)
        .await
        .unwrap();
    assert_eq!(stats["total_pages"], json!(2));
    assert!(stats["total_words"].as_i64().unwrap() > 0);
    assert_eq!(stats["config"]["max_search_limit"], json!(50));
    assert_eq!(stats["config"]["display_name"], json!("docs.example.com"));
    assert_eq!(stats["config"]["has_fts"], json!(true));
}

#[tokio::test]
async fn test_dispatch_browse_shape() {
    let (_tmp, store, engine) = setup().await;
    seed_auth_pages(&store, 3).await;

    let req =
        ToolRequest::parse("browse_section", &json!({ "section": "guides", "limit": 2 })).unwrap();
    let value = dispatch(&engine, req).await.unwrap();
    let pages = value.as_array().unwrap();
    assert_eq!(pages.len(), 2);
    for p in pages {
        assert!(p.get("title").is_some());
        assert!(p.get("url").is_some());
        assert!(p.get("word_count").is_some());
    }
}
