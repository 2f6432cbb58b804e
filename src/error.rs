//! Error types for the ingestion pipeline.
//!
//! Each variant carries its own crawl policy: fetch failures leave the URL
//! unvisited (retried next run), parse failures are recorded as
//! visited-with-failure (not retried within the same cache), and storage
//! failures abort the current page's write. Only a storage error that means
//! the store itself is unusable halts the run.

use thiserror::Error;

/// Errors raised while ingesting a single page.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Network or protocol failure reaching a URL.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Fetched content yields no usable title or body.
    #[error("no extractable content at {url}: {reason}")]
    Parse { url: String, reason: String },

    /// A commit against the page store failed.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl IngestError {
    /// Whether this error means the store itself is unusable and the run
    /// must halt rather than proceed blind.
    pub fn is_fatal(&self) -> bool {
        match self {
            IngestError::Storage(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::Configuration(_)
                    | sqlx::Error::Protocol(_)
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_and_parse_are_not_fatal() {
        let fetch = IngestError::Fetch {
            url: "https://docs.example.com/a".to_string(),
            reason: "connection refused".to_string(),
        };
        let parse = IngestError::Parse {
            url: "https://docs.example.com/b".to_string(),
            reason: "empty body".to_string(),
        };
        assert!(!fetch.is_fatal());
        assert!(!parse.is_fatal());
    }

    #[test]
    fn test_pool_closed_is_fatal() {
        let err = IngestError::Storage(sqlx::Error::PoolClosed);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_row_level_storage_error_is_not_fatal() {
        let err = IngestError::Storage(sqlx::Error::RowNotFound);
        assert!(!err.is_fatal());
    }
}
