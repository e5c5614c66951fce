//! RAG query client for external retrieval services.
//!
//! This crate talks to a REST-style retrieval service (an Open WebUI-compatible
//! API): it discovers which document collections the caller may read, queries
//! each collection concurrently, merges and re-ranks the combined hits, and
//! returns an LLM-ready result set with citation metadata.
//!
//! The service owns the vector index, embeddings, chunking, and access
//! control; this client only consumes them over HTTP.
//!
//! # Example
//! ```no_run
//! use ragport_client::{ClientConfig, QueryOptions, RagClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("http://localhost:3000", "sk-your-api-key");
//! let client = RagClient::new(config, QueryOptions::default())?;
//!
//! let response = client.query("What is machine learning?").await?;
//! for result in &response.results {
//!     println!("[{:.2}] {}", result.relevance_score, result.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod format;
pub mod query;
mod retriever;
pub mod transport;
pub mod types;

// Re-export main types
pub use format::{
    build_rag_prompt, format_results_for_llm, format_sources_for_llm, get_unique_sources,
    parse_citation_markers, CitationMap, DEFAULT_RAG_TEMPLATE,
};
pub use query::{QueryPlan, RagClient};
pub use transport::{CollectionQuery, DiscoveryScope, HttpTransport, RetrievalTransport};
pub use types::{ClientConfig, Collection, DocumentResult, QueryOptions, RagQueryResponse};
