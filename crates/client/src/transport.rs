//! Transport layer for the retrieval service.
//!
//! Defines the `RetrievalTransport` trait and its HTTP implementation. The
//! trait is the seam between the fan-out coordinator and the network, so
//! tests can substitute an in-memory transport.
//!
//! Wire contract (Open WebUI-compatible):
//! - `GET  <base>/api/v1/knowledge`          -> collection records (read scope)
//! - `GET  <base>/api/v1/knowledge/list`     -> collection records (write scope)
//! - `POST <base>/api/v1/retrieval/query/doc` -> parallel result arrays
//!
//! Every call carries `Authorization: Bearer <token>`.

use crate::types::{ClientConfig, Collection};
use async_trait::async_trait;
use ragport_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which discovery endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryScope {
    /// Collections the caller may read
    #[default]
    Readable,

    /// Write-scoped listing (`/knowledge/list`)
    Writable,
}

/// One retrieval request against exactly one collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionQuery {
    /// Collection identifier. The endpoint names this field `collection_name`
    /// but expects the UUID, not the display name.
    pub collection_name: String,

    /// Query text
    pub query: String,

    /// Per-collection result cap
    pub k: usize,

    /// Hybrid (vector + lexical) vs. pure vector search
    pub hybrid: bool,

    /// Result cap fed to the service-side reranker, when reranking is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k_reranker: Option<usize>,

    /// Service-side relevance threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<f32>,
}

/// Raw retrieval result: one parallel array per field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQueryResult {
    #[serde(default)]
    pub documents: Vec<String>,

    #[serde(default)]
    pub metadatas: Vec<serde_json::Value>,

    #[serde(default)]
    pub distances: Vec<f32>,
}

/// Collection record as returned by the discovery endpoints.
#[derive(Debug, Deserialize)]
struct KnowledgeRecord {
    id: String,

    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    description: Option<String>,
}

impl From<KnowledgeRecord> for Collection {
    fn from(record: KnowledgeRecord) -> Self {
        Collection {
            id: record.id,
            name: record.name.unwrap_or_else(|| "Unknown".to_string()),
            description: record.description,
        }
    }
}

/// Trait for retrieval service transports.
///
/// Implementations must be safe to share across the concurrent fan-out; each
/// logical request is independent and nothing is mutated per call.
#[async_trait]
pub trait RetrievalTransport: Send + Sync {
    /// List the collections visible to the caller.
    ///
    /// # Errors
    /// `AppError::Access` if the discovery call is rejected or its body
    /// cannot be parsed. An empty list is not an error.
    async fn list_collections(&self, scope: DiscoveryScope) -> AppResult<Vec<Collection>>;

    /// Run one retrieval call against one collection.
    ///
    /// # Errors
    /// `AppError::CollectionRetrieval` for any failure: network error,
    /// non-2xx status, or a 2xx body that is not valid JSON (e.g., an HTML
    /// error page from a misrouted path).
    async fn query_collection(&self, request: &CollectionQuery) -> AppResult<RawQueryResult>;
}

/// HTTP transport backed by a pooled `reqwest::Client`.
///
/// The client is reused across all fan-out calls for connection pooling;
/// reqwest handles concurrent use internally.
pub struct HttpTransport {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new HTTP transport. The per-request timeout doubles as a
    /// backstop so a hung connect cannot outlive the fan-out budget.
    pub fn new(config: ClientConfig, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.api_key)
    }

    fn discovery_url(&self, scope: DiscoveryScope) -> String {
        match scope {
            DiscoveryScope::Readable => format!("{}/api/v1/knowledge", self.config.base_url),
            DiscoveryScope::Writable => format!("{}/api/v1/knowledge/list", self.config.base_url),
        }
    }
}

#[async_trait]
impl RetrievalTransport for HttpTransport {
    async fn list_collections(&self, scope: DiscoveryScope) -> AppResult<Vec<Collection>> {
        let url = self.discovery_url(scope);
        tracing::debug!("Discovering collections via {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| AppError::Access(format!("Discovery request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Access(format!(
                "Discovery rejected ({}): {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Access(format!("Failed to read discovery response: {}", e)))?;

        let records: Vec<KnowledgeRecord> = serde_json::from_str(&body)
            .map_err(|e| AppError::Access(format!("Malformed discovery response: {}", e)))?;

        let collections: Vec<Collection> = records.into_iter().map(Collection::from).collect();

        tracing::info!("Discovered {} collections", collections.len());
        Ok(collections)
    }

    async fn query_collection(&self, request: &CollectionQuery) -> AppResult<RawQueryResult> {
        let url = format!("{}/api/v1/retrieval/query/doc", self.config.base_url);
        tracing::debug!(
            "Querying collection '{}' (k={}, hybrid={})",
            request.collection_name,
            request.k,
            request.hybrid
        );

        let retrieval_error = |reason: String| AppError::CollectionRetrieval {
            collection_id: request.collection_name.clone(),
            reason,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(request)
            .send()
            .await
            .map_err(|e| retrieval_error(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(retrieval_error(format!("HTTP {}: {}", status, error_text)));
        }

        // A 2xx body that is not JSON (misrouted path returning an HTML page)
        // is still a retrieval failure for this collection.
        let body = response
            .text()
            .await
            .map_err(|e| retrieval_error(format!("Failed to read response body: {}", e)))?;

        let raw: RawQueryResult = serde_json::from_str(&body)
            .map_err(|e| retrieval_error(format!("Malformed response body: {}", e)))?;

        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_url_per_scope() {
        let transport = HttpTransport::new(
            ClientConfig::new("http://localhost:3000", "sk-key"),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            transport.discovery_url(DiscoveryScope::Readable),
            "http://localhost:3000/api/v1/knowledge"
        );
        assert_eq!(
            transport.discovery_url(DiscoveryScope::Writable),
            "http://localhost:3000/api/v1/knowledge/list"
        );
    }

    #[test]
    fn test_collection_query_serialization() {
        let request = CollectionQuery {
            collection_name: "col-uuid".to_string(),
            query: "test".to_string(),
            k: 10,
            hybrid: true,
            k_reranker: None,
            r: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["collection_name"], "col-uuid");
        assert_eq!(json["k"], 10);
        assert_eq!(json["hybrid"], true);
        // Optional knobs stay off the wire when unset
        assert!(json.get("k_reranker").is_none());
        assert!(json.get("r").is_none());
    }

    #[test]
    fn test_raw_result_missing_arrays_default_empty() {
        let raw: RawQueryResult = serde_json::from_str("{}").unwrap();
        assert!(raw.documents.is_empty());
        assert!(raw.metadatas.is_empty());
        assert!(raw.distances.is_empty());
    }

    #[test]
    fn test_knowledge_record_defaults_name() {
        let record: KnowledgeRecord = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        let collection = Collection::from(record);
        assert_eq!(collection.name, "Unknown");
        assert!(collection.description.is_none());
    }
}
