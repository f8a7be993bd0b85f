//! Error types for notekey.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using notekey's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for notekey operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Page id does not resolve to a note
    #[error("Page not found: {0}")]
    PageNotFound(i64),

    /// Trend service unreachable, rate limited, or returned an unusable payload
    #[error("External service error: {0}")]
    ExternalService(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Keyword absent from the embedding vocabulary
    #[error("Keyword not in vocabulary: {0}")]
    ModelLookup(String),

    /// Embedding model artifact could not be loaded
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Every raw candidate was already used by the note
    #[error("No candidates left after excluding {excluded} existing keywords")]
    EmptyCandidateSet { excluded: usize },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure categories reported to the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ExternalService,
    ModelLookup,
    EmptyCandidateSet,
    UpstreamData,
    InvalidInput,
    Internal,
}

impl Error {
    /// Classify this error into the recommendation failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Database(_) | Error::PageNotFound(_) => ErrorKind::UpstreamData,
            Error::ExternalService(_) | Error::Request(_) | Error::Serialization(_) => {
                ErrorKind::ExternalService
            }
            Error::ModelLookup(_) => ErrorKind::ModelLookup,
            Error::EmptyCandidateSet { .. } => ErrorKind::EmptyCandidateSet,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::ModelLoad(_) | Error::Config(_) | Error::Internal(_) | Error::Io(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::ExternalService(format!("Request timed out: {}", e))
        } else {
            Error::Request(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_page_not_found() {
        let err = Error::PageNotFound(42);
        assert_eq!(err.to_string(), "Page not found: 42");
    }

    #[test]
    fn test_error_display_model_lookup() {
        let err = Error::ModelLookup("파이썬".to_string());
        assert_eq!(err.to_string(), "Keyword not in vocabulary: 파이썬");
    }

    #[test]
    fn test_error_display_empty_candidate_set() {
        let err = Error::EmptyCandidateSet { excluded: 3 };
        assert_eq!(
            err.to_string(),
            "No candidates left after excluding 3 existing keywords"
        );
    }

    #[test]
    fn test_error_display_external_service() {
        let err = Error::ExternalService("rate limited".to_string());
        assert_eq!(err.to_string(), "External service error: rate limited");
    }

    #[test]
    fn test_kind_upstream_data() {
        assert_eq!(Error::PageNotFound(1).kind(), ErrorKind::UpstreamData);
        let db_err = Error::Database(sqlx::Error::RowNotFound);
        assert_eq!(db_err.kind(), ErrorKind::UpstreamData);
    }

    #[test]
    fn test_kind_external_service() {
        assert_eq!(
            Error::ExternalService("x".into()).kind(),
            ErrorKind::ExternalService
        );
        assert_eq!(Error::Request("x".into()).kind(), ErrorKind::ExternalService);
    }

    #[test]
    fn test_kind_model_errors() {
        assert_eq!(Error::ModelLookup("x".into()).kind(), ErrorKind::ModelLookup);
        assert_eq!(Error::ModelLoad("x".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::EmptyCandidateSet).unwrap();
        assert_eq!(json, "\"empty_candidate_set\"");
        let json = serde_json::to_string(&ErrorKind::UpstreamData).unwrap();
        assert_eq!(json, "\"upstream_data\"");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing model");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
