//! Per-collection retrieval.
//!
//! Runs one retrieval call against exactly one collection and converts the
//! raw parallel arrays into `DocumentResult`s. Failures are isolated here:
//! a timeout or error in one collection becomes a `CollectionFailure` record
//! and never aborts sibling calls.

use crate::transport::{CollectionQuery, RetrievalTransport};
use crate::types::{relevance_from_distance, Collection, DocumentResult, QueryOptions};
use ragport_core::{AppError, CollectionFailure};

/// Query one collection, bounding the call with the overall fan-out budget.
///
/// Returns the collection's results sorted by ascending distance, or a
/// failure record for the coordinator's bookkeeping.
pub(crate) async fn retrieve_collection(
    transport: &dyn RetrievalTransport,
    options: &QueryOptions,
    collection: &Collection,
    query: &str,
) -> Result<Vec<DocumentResult>, CollectionFailure> {
    let request = CollectionQuery {
        collection_name: collection.id.clone(),
        query: query.to_string(),
        k: options.top_k_per_collection,
        hybrid: options.enable_hybrid_search,
        k_reranker: None,
        r: if options.relevance_threshold > 0.0 {
            Some(options.relevance_threshold)
        } else {
            None
        },
    };

    let outcome = tokio::time::timeout(options.timeout, transport.query_collection(&request)).await;

    match outcome {
        Err(_) => Err(CollectionFailure::new(
            collection.id.clone(),
            format!("Timed out after {:?}", options.timeout),
        )),
        Ok(Err(err)) => {
            let reason = match err {
                AppError::CollectionRetrieval { reason, .. } => reason,
                other => other.to_string(),
            };
            Err(CollectionFailure::new(collection.id.clone(), reason))
        }
        Ok(Ok(raw)) => {
            let mut results = Vec::with_capacity(raw.documents.len());

            for ((text, metadata), distance) in raw
                .documents
                .into_iter()
                .zip(raw.metadatas)
                .zip(raw.distances)
            {
                let source = extract_source(&metadata);
                results.push(DocumentResult {
                    text,
                    relevance_score: relevance_from_distance(distance),
                    distance,
                    source,
                    metadata,
                    collection_id: collection.id.clone(),
                    collection_name: collection.name.clone(),
                });
            }

            // Ascending distance, i.e. descending relevance
            results.sort_by(|a, b| a.distance.total_cmp(&b.distance));

            tracing::debug!(
                "Collection '{}' returned {} results",
                collection.name,
                results.len()
            );
            Ok(results)
        }
    }
}

/// Pull the origin document out of result metadata. "source" is the
/// canonical key; "file_name" is the fallback older servers populate.
fn extract_source(metadata: &serde_json::Value) -> Option<String> {
    metadata
        .get("source")
        .and_then(|v| v.as_str())
        .or_else(|| metadata.get("file_name").and_then(|v| v.as_str()))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{DiscoveryScope, RawQueryResult};
    use async_trait::async_trait;
    use ragport_core::AppResult;
    use serde_json::json;
    use std::time::Duration;

    struct FixedTransport {
        raw: RawQueryResult,
    }

    #[async_trait]
    impl RetrievalTransport for FixedTransport {
        async fn list_collections(&self, _scope: DiscoveryScope) -> AppResult<Vec<Collection>> {
            Ok(Vec::new())
        }

        async fn query_collection(&self, _request: &CollectionQuery) -> AppResult<RawQueryResult> {
            Ok(self.raw.clone())
        }
    }

    fn raw_result() -> RawQueryResult {
        RawQueryResult {
            documents: vec!["far chunk".to_string(), "near chunk".to_string()],
            metadatas: vec![
                json!({"source": "manual.pdf"}),
                json!({"file_name": "notes.md"}),
            ],
            distances: vec![0.8, 0.2],
        }
    }

    #[tokio::test]
    async fn test_results_sorted_by_distance_and_tagged() {
        let transport = FixedTransport { raw: raw_result() };
        let collection = Collection::new("col-1", "Docs");
        let options = QueryOptions::default();

        let results = retrieve_collection(&transport, &options, &collection, "q")
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "near chunk");
        assert_eq!(results[0].distance, 0.2);
        assert_eq!(results[0].source.as_deref(), Some("notes.md"));
        assert_eq!(results[1].source.as_deref(), Some("manual.pdf"));
        assert!(results[0].relevance_score > results[1].relevance_score);
        assert!(results
            .iter()
            .all(|r| r.collection_id == "col-1" && r.collection_name == "Docs"));
    }

    #[tokio::test]
    async fn test_failure_becomes_record() {
        struct FailingTransport;

        #[async_trait]
        impl RetrievalTransport for FailingTransport {
            async fn list_collections(&self, _scope: DiscoveryScope) -> AppResult<Vec<Collection>> {
                Ok(Vec::new())
            }

            async fn query_collection(
                &self,
                request: &CollectionQuery,
            ) -> AppResult<RawQueryResult> {
                Err(ragport_core::AppError::CollectionRetrieval {
                    collection_id: request.collection_name.clone(),
                    reason: "HTTP 500: boom".to_string(),
                })
            }
        }

        let collection = Collection::new("col-1", "Docs");
        let options = QueryOptions::default();

        let failure = retrieve_collection(&FailingTransport, &options, &collection, "q")
            .await
            .unwrap_err();

        assert_eq!(failure.collection_id, "col-1");
        assert_eq!(failure.reason, "HTTP 500: boom");
    }

    #[tokio::test]
    async fn test_timeout_becomes_record() {
        struct SlowTransport;

        #[async_trait]
        impl RetrievalTransport for SlowTransport {
            async fn list_collections(&self, _scope: DiscoveryScope) -> AppResult<Vec<Collection>> {
                Ok(Vec::new())
            }

            async fn query_collection(
                &self,
                _request: &CollectionQuery,
            ) -> AppResult<RawQueryResult> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(RawQueryResult::default())
            }
        }

        let collection = Collection::new("col-slow", "Slow");
        let options = QueryOptions::default().with_timeout(Duration::from_millis(20));

        let failure = retrieve_collection(&SlowTransport, &options, &collection, "q")
            .await
            .unwrap_err();

        assert_eq!(failure.collection_id, "col-slow");
        assert!(failure.reason.contains("Timed out"));
    }

    #[test]
    fn test_extract_source_prefers_source_key() {
        let metadata = json!({"source": "a.pdf", "file_name": "b.pdf"});
        assert_eq!(extract_source(&metadata).as_deref(), Some("a.pdf"));

        let metadata = json!({"file_name": "b.pdf"});
        assert_eq!(extract_source(&metadata).as_deref(), Some("b.pdf"));

        let metadata = json!({"page": 3});
        assert!(extract_source(&metadata).is_none());
    }
}
