//! Fan-out query coordinator.
//!
//! `RagClient` resolves the caller's collections, issues one retrieval call
//! per collection concurrently, merges the results deterministically, and
//! returns a ranked `RagQueryResponse`.
//!
//! Ordering is fully deterministic: relevance descending, distance ascending,
//! then first-attempted collection order, then query order. Network
//! completion order never leaks into result order because per-collection
//! result lists are only combined after every call has settled or timed out.

use crate::retriever::retrieve_collection;
use crate::transport::{DiscoveryScope, HttpTransport, RetrievalTransport};
use crate::types::{ClientConfig, Collection, DocumentResult, QueryOptions, RagQueryResponse};
use ragport_core::{AppError, AppResult, CollectionFailure};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of a caller-side query expansion step.
///
/// Query generation failures are surfaced as an explicit `Fallback` state
/// rather than being silently substituted inside the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Pre-expanded query set from a caller-side generation step. Every
    /// query is fanned out and results are merged under one scoring rule.
    Expanded(Vec<String>),

    /// Expansion failed or was skipped; the raw user message is used as-is.
    Fallback(String),
}

impl QueryPlan {
    /// The queries to run, in priority order.
    fn queries(&self) -> AppResult<Vec<&str>> {
        match self {
            QueryPlan::Expanded(queries) => {
                if queries.is_empty() {
                    return Err(AppError::Config(
                        "Expanded query plan contains no queries".to_string(),
                    ));
                }
                Ok(queries.iter().map(String::as_str).collect())
            }
            QueryPlan::Fallback(query) => Ok(vec![query.as_str()]),
        }
    }

    /// The primary query, used as the response's canonical query text.
    pub fn primary(&self) -> Option<&str> {
        match self {
            QueryPlan::Expanded(queries) => queries.first().map(String::as_str),
            QueryPlan::Fallback(query) => Some(query.as_str()),
        }
    }
}

/// RAG query client.
///
/// Holds an immutable set of query options and a shared transport; safe to
/// use from multiple tasks.
pub struct RagClient {
    transport: Arc<dyn RetrievalTransport>,
    options: QueryOptions,
    scope: DiscoveryScope,
}

impl RagClient {
    /// Create a client backed by the HTTP transport.
    pub fn new(config: ClientConfig, options: QueryOptions) -> AppResult<Self> {
        let transport = HttpTransport::new(config, options.timeout)?;
        Ok(Self::with_transport(Arc::new(transport), options))
    }

    /// Create a client with a custom transport (used by tests and embedders).
    pub fn with_transport(transport: Arc<dyn RetrievalTransport>, options: QueryOptions) -> Self {
        Self {
            transport,
            options,
            scope: DiscoveryScope::default(),
        }
    }

    /// Select which discovery endpoint to use.
    pub fn with_discovery_scope(mut self, scope: DiscoveryScope) -> Self {
        self.scope = scope;
        self
    }

    /// List the collections visible to the caller.
    pub async fn list_collections(&self) -> AppResult<Vec<Collection>> {
        self.transport.list_collections(self.scope).await
    }

    /// Query every collection the caller may read and return ranked results.
    pub async fn query(&self, query: &str) -> AppResult<RagQueryResponse> {
        self.query_plan(&QueryPlan::Fallback(query.to_string())).await
    }

    /// Run a full query plan: discovery, fan-out per query, merge.
    ///
    /// Zero accessible collections short-circuits with an empty response and
    /// no retrieval calls. Discovery failure surfaces as `AppError::Access`.
    pub async fn query_plan(&self, plan: &QueryPlan) -> AppResult<RagQueryResponse> {
        let start = Instant::now();
        let queries = plan.queries()?;
        let primary = queries[0].to_string();

        tracing::info!("RAG query: {}", primary);

        let collections = self.transport.list_collections(self.scope).await?;

        if collections.is_empty() {
            tracing::info!("No collections accessible; returning empty response");
            return Ok(RagQueryResponse::empty(primary, elapsed_ms(start)));
        }

        self.fan_out(&primary, &queries, &collections, start).await
    }

    /// Query an explicit set of collections by id, skipping discovery.
    pub async fn query_collections(
        &self,
        collection_ids: &[String],
        query: &str,
    ) -> AppResult<RagQueryResponse> {
        let start = Instant::now();

        if collection_ids.is_empty() {
            return Ok(RagQueryResponse::empty(query, elapsed_ms(start)));
        }

        let collections: Vec<Collection> = collection_ids
            .iter()
            .map(|id| Collection::new(id.clone(), short_collection_name(id)))
            .collect();

        self.fan_out(query, &[query], &collections, start).await
    }

    /// Issue all per-collection retrievals concurrently and merge.
    async fn fan_out(
        &self,
        primary: &str,
        queries: &[&str],
        collections: &[Collection],
        start: Instant,
    ) -> AppResult<RagQueryResponse> {
        let mut futures = Vec::with_capacity(queries.len() * collections.len());

        for (query_index, query) in queries.iter().enumerate() {
            for (collection_index, collection) in collections.iter().enumerate() {
                futures.push(async move {
                    let outcome = retrieve_collection(
                        self.transport.as_ref(),
                        &self.options,
                        collection,
                        query,
                    )
                    .await;
                    (collection_index, query_index, outcome)
                });
            }
        }

        // Wait for every call to finish or time out before merging, so
        // completion order cannot influence the result.
        let settled = futures::future::join_all(futures).await;

        let mut tagged: Vec<(usize, usize, DocumentResult)> = Vec::new();
        let mut succeeded = vec![false; collections.len()];
        let mut first_failure: Vec<Option<CollectionFailure>> = vec![None; collections.len()];

        for (collection_index, query_index, outcome) in settled {
            match outcome {
                Ok(results) => {
                    succeeded[collection_index] = true;
                    for result in results {
                        tagged.push((collection_index, query_index, result));
                    }
                }
                Err(failure) => {
                    tracing::warn!(
                        "Collection '{}' failed: {}",
                        failure.collection_id,
                        failure.reason
                    );
                    if first_failure[collection_index].is_none() {
                        first_failure[collection_index] = Some(failure);
                    }
                }
            }
        }

        // A collection counts as searched if at least one query against it
        // succeeded; it counts as failed only if none did.
        let collections_searched: Vec<Collection> = collections
            .iter()
            .enumerate()
            .filter(|(i, _)| succeeded[*i])
            .map(|(_, c)| c.clone())
            .collect();

        let failed_collections: Vec<CollectionFailure> = first_failure
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !succeeded[*i])
            .filter_map(|(_, f)| f)
            .collect();

        if collections_searched.is_empty() {
            return Err(AppError::AllCollectionsFailed(failed_collections));
        }

        let results = self.merge(tagged);

        tracing::info!(
            "Merged {} results from {} collections ({} failed)",
            results.len(),
            collections_searched.len(),
            failed_collections.len()
        );

        Ok(RagQueryResponse::new(
            primary,
            results,
            collections_searched,
            failed_collections,
            elapsed_ms(start),
        ))
    }

    /// Deterministic merge: relevance descending, distance ascending, then
    /// first-attempted collection order, then query order; threshold filter;
    /// truncate to `top_k`.
    fn merge(&self, mut tagged: Vec<(usize, usize, DocumentResult)>) -> Vec<DocumentResult> {
        tagged.sort_by(|(a_col, a_query, a), (b_col, b_query, b)| {
            b.relevance_score
                .total_cmp(&a.relevance_score)
                .then(a.distance.total_cmp(&b.distance))
                .then(a_col.cmp(b_col))
                .then(a_query.cmp(b_query))
        });

        let threshold = self.options.relevance_threshold;
        let mut results: Vec<DocumentResult> = tagged
            .into_iter()
            .map(|(_, _, result)| result)
            .filter(|r| threshold <= 0.0 || r.relevance_score >= threshold)
            .collect();

        results.truncate(self.options.top_k);
        results
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Short display name for a collection addressed only by id.
fn short_collection_name(id: &str) -> String {
    let prefix: String = id.chars().take(8).collect();
    format!("Collection-{}", prefix)
}
