//! Context command handler.
//!
//! Runs a query and emits the LLM-facing rendering instead of raw results:
//! tagged source blocks with a citation map, a plain numbered context, or a
//! fully assembled prompt.

use crate::commands::{build_client, resolve_options, run_query, QueryArgs};
use clap::Args;
use ragport_client::{
    build_rag_prompt, format_results_for_llm, format_sources_for_llm, get_unique_sources,
    DEFAULT_RAG_TEMPLATE,
};
use ragport_core::{config::AppConfig, AppResult};

/// Query collections and emit LLM-ready context with citations
#[derive(Args, Debug)]
pub struct ContextCommand {
    /// Query text
    pub query: String,

    #[command(flatten)]
    pub args: QueryArgs,

    /// Print the plain numbered context instead of tagged source blocks
    #[arg(long)]
    pub plain: bool,

    /// Assemble the full prompt using the built-in template
    #[arg(long, conflicts_with = "plain")]
    pub prompt: bool,

    /// Output as JSON (context, citations, unique sources)
    #[arg(long)]
    pub json: bool,
}

impl ContextCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let options = resolve_options(config, &self.args);
        let client = build_client(config, options)?;

        let response = run_query(&client, &self.args, &self.query).await?;

        if self.plain {
            let context = format_results_for_llm(&response);
            if self.json {
                let output = serde_json::json!({
                    "query": response.query,
                    "context": context,
                    "sources": get_unique_sources(&response),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", context);
            }
            return Ok(());
        }

        let (context, citations) = format_sources_for_llm(&response);
        let rendered = if self.prompt {
            build_rag_prompt(DEFAULT_RAG_TEMPLATE, &context, &response.query)
        } else {
            context
        };

        if self.json {
            let citation_entries: Vec<serde_json::Value> = citations
                .entries()
                .map(|(id, source)| serde_json::json!({"id": id, "source": source}))
                .collect();
            let output = serde_json::json!({
                "query": response.query,
                "context": rendered,
                "citations": citation_entries,
                "sources": get_unique_sources(&response),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", rendered);
        }

        for failure in &response.failed_collections {
            eprintln!(
                "warning: collection '{}' failed: {}",
                failure.collection_id, failure.reason
            );
        }

        Ok(())
    }
}
