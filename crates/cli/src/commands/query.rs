//! Query command handler.

use crate::commands::{build_client, resolve_options, run_query, QueryArgs};
use clap::Args;
use ragport_core::{config::AppConfig, AppResult};

/// Query collections and print ranked results
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Query text
    pub query: String,

    #[command(flatten)]
    pub args: QueryArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let options = resolve_options(config, &self.args);
        let client = build_client(config, options)?;

        let response = run_query(&client, &self.args, &self.query).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
            return Ok(());
        }

        if response.results.is_empty() {
            println!("No relevant results for '{}'.", response.query);
        } else {
            println!(
                "{} results for '{}' ({:.0} ms):",
                response.total_results, response.query, response.execution_time_ms
            );
            for (index, result) in response.results.iter().enumerate() {
                let source = result.source.as_deref().unwrap_or("unknown source");
                println!(
                    "\n[{}] {:.2}  {} ({})",
                    index + 1,
                    result.relevance_score,
                    source,
                    result.collection_name
                );
                println!("{}", result.text);
            }
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
