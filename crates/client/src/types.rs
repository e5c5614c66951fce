//! Data model for RAG queries and responses.

use ragport_core::CollectionFailure;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection parameters for the retrieval service.
///
/// Passed explicitly at construction time; the client never reads ambient
/// environment state.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the service (e.g., "http://localhost:3000")
    pub base_url: String,

    /// Bearer credential. Opaque string; session tokens and long-lived API
    /// keys are both accepted.
    pub api_key: String,
}

impl ClientConfig {
    /// Create a new client configuration. Trailing slashes on the base URL
    /// are stripped so endpoint paths can be joined uniformly.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

/// Query parameters, fixed at client construction and never mutated afterward.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Number of final results to return after merging
    pub top_k: usize,

    /// Results to fetch per collection before ranking
    pub top_k_per_collection: usize,

    /// Minimum relevance score (0-1) to include; 0 disables the filter
    pub relevance_threshold: f32,

    /// Use hybrid search (vector + lexical) instead of pure vector search
    pub enable_hybrid_search: bool,

    /// Overall budget for the whole fan-out. Calls still pending when this
    /// elapses are treated as failed collections, not fatal errors.
    pub timeout: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            top_k_per_collection: 10,
            relevance_threshold: 0.0,
            enable_hybrid_search: true,
            timeout: Duration::from_secs(60),
        }
    }
}

impl QueryOptions {
    /// Set the number of final results to return.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the per-collection result cap.
    pub fn with_top_k_per_collection(mut self, top_k_per_collection: usize) -> Self {
        self.top_k_per_collection = top_k_per_collection;
        self
    }

    /// Set the minimum relevance score.
    pub fn with_relevance_threshold(mut self, relevance_threshold: f32) -> Self {
        self.relevance_threshold = relevance_threshold;
        self
    }

    /// Enable or disable hybrid search.
    pub fn with_hybrid_search(mut self, enable: bool) -> Self {
        self.enable_hybrid_search = enable;
        self
    }

    /// Set the overall fan-out timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A named, independently searchable document grouping owned by the service.
///
/// Snapshot taken at query time; collection identity is never cached across
/// calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Opaque identifier (UUID on the wire)
    pub id: String,

    /// Display name
    pub name: String,

    /// Optional description from the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Collection {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }
}

/// One retrieved passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Passage text
    pub text: String,

    /// Arbitrary key/value metadata; includes a "source" identifying the
    /// origin document
    pub metadata: serde_json::Value,

    /// Raw distance score (lower is more similar, engine-dependent unit)
    pub distance: f32,

    /// Normalized relevance in [0, 1] (higher is better)
    pub relevance_score: f32,

    /// Origin document, from metadata "source" with "file_name" as fallback
    pub source: Option<String>,

    /// Identifier of the collection this passage came from
    pub collection_id: String,

    /// Display name of that collection
    pub collection_name: String,
}

/// Convert a raw distance to a normalized relevance score.
///
/// Cosine distance is typically in [0, 2]; the transform is monotonic and
/// clamped so equal distances always produce equal relevance scores.
pub fn relevance_from_distance(distance: f32) -> f32 {
    (1.0 - distance / 2.0).clamp(0.0, 1.0)
}

/// Aggregate result of one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagQueryResponse {
    /// Original query text
    pub query: String,

    /// Number of results returned; always equals `results.len()`
    pub total_results: usize,

    /// Retrieved passages, ranked best-first
    pub results: Vec<DocumentResult>,

    /// Collections that were searched successfully
    pub collections_searched: Vec<Collection>,

    /// Collections whose retrieval calls failed, with reasons. Available for
    /// logging; does not block the response.
    pub failed_collections: Vec<CollectionFailure>,

    /// End-to-end execution time in milliseconds
    pub execution_time_ms: f64,
}

impl RagQueryResponse {
    /// Build a response from merged results, keeping the count invariant.
    pub fn new(
        query: impl Into<String>,
        results: Vec<DocumentResult>,
        collections_searched: Vec<Collection>,
        failed_collections: Vec<CollectionFailure>,
        execution_time_ms: f64,
    ) -> Self {
        Self {
            query: query.into(),
            total_results: results.len(),
            results,
            collections_searched,
            failed_collections,
            execution_time_ms,
        }
    }

    /// Empty response for the zero-collections short-circuit. Valid, not an
    /// error: "no relevant context found".
    pub fn empty(query: impl Into<String>, execution_time_ms: f64) -> Self {
        Self::new(query, Vec::new(), Vec::new(), Vec::new(), execution_time_ms)
    }
}
