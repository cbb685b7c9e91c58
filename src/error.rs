//! Custom error types for ragline

use thiserror::Error;

/// Main error type for ragline operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding request timed out after {0:?}")]
    EmbeddingTimeout(std::time::Duration),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Search request timed out after {0:?}")]
    SearchTimeout(std::time::Duration),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Generation request timed out after {0:?}")]
    GenerationTimeout(std::time::Duration),

    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Whether a bounded retry may help. Caller mistakes and dimension
    /// mismatches are permanent; only upstream timeouts, rate limits and
    /// transport failures qualify.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::EmbeddingTimeout(_)
            | Error::SearchTimeout(_)
            | Error::GenerationTimeout(_)
            | Error::RateLimited(_) => true,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Result type alias for ragline
pub type Result<T> = std::result::Result<T, Error>;

/// Convert qdrant errors
impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::Search(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transient_classification() {
        assert!(Error::EmbeddingTimeout(Duration::from_secs(5)).is_transient());
        assert!(Error::SearchTimeout(Duration::from_secs(5)).is_transient());
        assert!(Error::RateLimited("429".to_string()).is_transient());
        assert!(!Error::InvalidArgument("limit must be > 0".to_string()).is_transient());
        assert!(!Error::DimensionMismatch {
            expected: 384,
            got: 768
        }
        .is_transient());
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = Error::DimensionMismatch {
            expected: 384,
            got: 3,
        };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 384, got 3"
        );
    }
}
