//! Collections command handler.

use crate::commands::build_client;
use clap::Args;
use ragport_client::{DiscoveryScope, QueryOptions};
use ragport_core::{config::AppConfig, AppResult};

/// List the collections the caller may access
#[derive(Args, Debug)]
pub struct CollectionsCommand {
    /// Use the write-scoped listing endpoint instead of the read-scoped one
    #[arg(long)]
    pub writable: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CollectionsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let scope = if self.writable {
            DiscoveryScope::Writable
        } else {
            DiscoveryScope::Readable
        };

        let client =
            build_client(config, QueryOptions::default())?.with_discovery_scope(scope);
        let collections = client.list_collections().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&collections)?);
            return Ok(());
        }

        if collections.is_empty() {
            println!("No collections accessible.");
            return Ok(());
        }

        println!("Found {} collections:", collections.len());
        for collection in &collections {
            match &collection.description {
                Some(description) => {
                    println!("  {}  {} - {}", collection.id, collection.name, description)
                }
                None => println!("  {}  {}", collection.id, collection.name),
            }
        }

        Ok(())
    }
}
