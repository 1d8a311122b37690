#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Feed request to `{url}` returned status {status}.")]
    HttpStatus { url: String, status: u16 },

    #[error("Feed request to `{url}` timed out after {secs}s.")]
    Timeout { url: String, secs: u64 },

    #[error("Failed to parse feed document: {message}")]
    ParseFailed { message: String },
}

impl From<wreq::Error> for FeedError {
    fn from(e: wreq::Error) -> Self {
        FeedError::RequestFailed(Box::new(e))
    }
}

impl From<rss::Error> for FeedError {
    fn from(e: rss::Error) -> Self {
        FeedError::ParseFailed {
            message: e.to_string(),
        }
    }
}

/// Failure to turn one feed item into an entry.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExtractError {
    #[error("Invalid item: missing field `{field}`.")]
    MissingField { field: String },
}
