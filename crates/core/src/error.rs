//! Error types for the ragport workspace.
//!
//! A single unified error enum covers configuration, I/O, and the retrieval
//! error taxonomy. Whole-operation failures (`Access`, `AllCollectionsFailed`)
//! propagate to the caller; per-collection failures are folded into the
//! response's bookkeeping instead of aborting the query.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Record of one collection whose retrieval call failed during a fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFailure {
    /// Identifier of the failed collection
    pub collection_id: String,

    /// Failure reason (timeout, HTTP status, malformed body)
    pub reason: String,
}

impl CollectionFailure {
    pub fn new(collection_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            reason: reason.into(),
        }
    }
}

/// Unified error type for the ragport workspace.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Discovery call rejected (bad/missing credential, no permission).
    /// Fatal to the whole operation; surfaced immediately, no retry.
    #[error("Access error: {0}")]
    Access(String),

    /// One collection's retrieval call failed. Recovered locally by the
    /// fan-out coordinator: recorded, excluded from the merge, and never
    /// surfaced to the caller on its own.
    #[error("Retrieval failed for collection '{collection_id}': {reason}")]
    CollectionRetrieval {
        collection_id: String,
        reason: String,
    },

    /// Every attempted collection failed. Fatal; carries all per-collection
    /// failure reasons.
    #[error("All {} attempted collections failed", .0.len())]
    AllCollectionsFailed(Vec<CollectionFailure>),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_collections_failed_display_includes_count() {
        let err = AppError::AllCollectionsFailed(vec![
            CollectionFailure::new("col-1", "timeout"),
            CollectionFailure::new("col-2", "HTTP 500"),
        ]);
        assert_eq!(err.to_string(), "All 2 attempted collections failed");
    }

    #[test]
    fn test_collection_retrieval_display() {
        let err = AppError::CollectionRetrieval {
            collection_id: "col-1".to_string(),
            reason: "HTTP 404".to_string(),
        };
        assert!(err.to_string().contains("col-1"));
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[test]
    fn test_collection_failure_serializes() {
        let failure = CollectionFailure::new("col-1", "timeout");
        let json = serde_json::to_string(&failure).unwrap();
        let back: CollectionFailure = serde_json::from_str(&json).unwrap();
        assert_eq!(back, failure);
    }
}
