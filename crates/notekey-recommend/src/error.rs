//! The single failure signal returned across the recommendation boundary.

use serde::Serialize;
use thiserror::Error;

use notekey_core::{Error, ErrorKind};

/// Opaque recommendation failure.
///
/// Wraps whatever went wrong inside the pipeline. Callers branch on
/// [`kind`](Self::kind) and never receive partial results.
#[derive(Debug, Error)]
#[error("Recommendation failed: {source}")]
pub struct RecommendationError {
    kind: ErrorKind,
    #[source]
    source: Error,
}

impl RecommendationError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The underlying pipeline error.
    pub fn inner(&self) -> &Error {
        &self.source
    }

    pub fn into_inner(self) -> Error {
        self.source
    }

    /// Tagged body for the request layer.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            state: "fail",
            kind: self.kind,
            message: self.source.to_string(),
        }
    }
}

impl From<Error> for RecommendationError {
    fn from(source: Error) -> Self {
        Self {
            kind: source.kind(),
            source,
        }
    }
}

/// JSON error body: `{"state":"fail","kind":"...","message":"..."}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub state: &'static str,
    pub kind: ErrorKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_source() {
        let err = RecommendationError::from(Error::ModelLookup("고양이".into()));
        assert_eq!(err.kind(), ErrorKind::ModelLookup);
        assert!(matches!(err.inner(), Error::ModelLookup(_)));
    }

    #[test]
    fn test_display_includes_source() {
        let err = RecommendationError::from(Error::PageNotFound(9));
        assert_eq!(err.to_string(), "Recommendation failed: Page not found: 9");
    }

    #[test]
    fn test_response_body() {
        let err = RecommendationError::from(Error::ExternalService("rate limited".into()));
        let json = serde_json::to_value(err.to_response()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "state": "fail",
                "kind": "external_service",
                "message": "External service error: rate limited"
            })
        );
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error as _;
        let err = RecommendationError::from(Error::InvalidInput("empty keyword".into()));
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "Invalid input: empty keyword");
    }
}
