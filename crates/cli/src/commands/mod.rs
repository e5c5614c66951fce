//! Command handlers for the ragport CLI.

pub mod collections;
pub mod context;
pub mod query;

pub use collections::CollectionsCommand;
pub use context::ContextCommand;
pub use query::QueryCommand;

use clap::Args;
use ragport_client::{ClientConfig, QueryOptions, QueryPlan, RagClient, RagQueryResponse};
use ragport_core::{config::AppConfig, AppError, AppResult};
use std::time::Duration;

/// Query knobs shared by `query` and `context`.
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Number of final results after merging
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Results fetched per collection before ranking
    #[arg(long)]
    pub top_k_per_collection: Option<usize>,

    /// Minimum relevance score (0-1); 0 disables the filter
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Disable hybrid search (pure vector similarity)
    #[arg(long)]
    pub no_hybrid: bool,

    /// Overall timeout for the query fan-out, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Restrict the search to specific collection ids (skips discovery)
    #[arg(long = "collection")]
    pub collections: Vec<String>,

    /// Additional pre-expanded queries fanned out alongside the main one
    #[arg(long = "expand")]
    pub expansions: Vec<String>,
}

/// Build query options from config-file defaults plus flag overrides.
pub(crate) fn resolve_options(config: &AppConfig, args: &QueryArgs) -> QueryOptions {
    let mut options = QueryOptions::default();

    if let Some(defaults) = &config.query {
        if let Some(top_k) = defaults.top_k {
            options = options.with_top_k(top_k);
        }
        if let Some(per_collection) = defaults.top_k_per_collection {
            options = options.with_top_k_per_collection(per_collection);
        }
        if let Some(threshold) = defaults.relevance_threshold {
            options = options.with_relevance_threshold(threshold);
        }
        if let Some(hybrid) = defaults.hybrid_search {
            options = options.with_hybrid_search(hybrid);
        }
        if let Some(secs) = defaults.timeout_secs {
            options = options.with_timeout(Duration::from_secs(secs));
        }
    }

    if let Some(top_k) = args.top_k {
        options = options.with_top_k(top_k);
    }
    if let Some(per_collection) = args.top_k_per_collection {
        options = options.with_top_k_per_collection(per_collection);
    }
    if let Some(threshold) = args.threshold {
        options = options.with_relevance_threshold(threshold);
    }
    if args.no_hybrid {
        options = options.with_hybrid_search(false);
    }
    if let Some(secs) = args.timeout_secs {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    options
}

/// Construct a client from the resolved configuration.
pub(crate) fn build_client(config: &AppConfig, options: QueryOptions) -> AppResult<RagClient> {
    config.validate()?;
    let api_key = config.resolve_api_key()?;
    let client_config = ClientConfig::new(config.base_url.clone(), api_key);
    RagClient::new(client_config, options)
}

/// Run one query according to the shared arguments.
pub(crate) async fn run_query(
    client: &RagClient,
    args: &QueryArgs,
    query: &str,
) -> AppResult<RagQueryResponse> {
    if !args.collections.is_empty() {
        if !args.expansions.is_empty() {
            return Err(AppError::Config(
                "--collection and --expand cannot be combined".to_string(),
            ));
        }
        return client.query_collections(&args.collections, query).await;
    }

    if args.expansions.is_empty() {
        return client.query(query).await;
    }

    let mut queries = vec![query.to_string()];
    queries.extend(args.expansions.iter().cloned());
    client.query_plan(&QueryPlan::Expanded(queries)).await
}
