//! Error types for cartoon2rss.

use thiserror::Error;

/// Everything that can go wrong during a run.
///
/// Fetch, decode and extraction failures are recoverable: the pipeline
/// swaps in the fallback dataset. The rest terminate the process.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The retry budget ran out; `source` is the last attempt's error.
    #[error("giving up on {url} after {attempts} attempts: {source}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<FeedError>,
    },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid selector `{0}`")]
    Selector(String),

    /// The page parsed but nothing on it looked like a content image.
    #[error("no content images found on {0}")]
    NoCandidates(String),

    #[error("no items to publish")]
    NoItems,

    #[error("render error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    /// Whether the scraping stage may absorb this error by falling back.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FeedError::Http(_)
                | FeedError::Status { .. }
                | FeedError::FetchExhausted { .. }
                | FeedError::Url(_)
                | FeedError::Selector(_)
                | FeedError::NoCandidates(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_fetch_keeps_last_error() {
        let err = FeedError::FetchExhausted {
            url: "https://example.org/".to_string(),
            attempts: 3,
            source: Box::new(FeedError::Status {
                url: "https://example.org/".to_string(),
                status: 503,
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("after 3 attempts"));
        assert!(msg.contains("HTTP 503"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn io_errors_are_fatal() {
        let err = FeedError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert!(!err.is_recoverable());
        assert!(!FeedError::NoItems.is_recoverable());
    }
}
