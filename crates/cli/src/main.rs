//! ragport CLI
//!
//! Command-line client for Open WebUI-compatible retrieval services:
//! discover collections, run fan-out RAG queries, and emit LLM-ready
//! context with citation metadata.

mod commands;

use clap::{Parser, Subcommand};
use commands::{CollectionsCommand, ContextCommand, QueryCommand};
use ragport_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// ragport - RAG query client for external retrieval services
#[derive(Parser, Debug)]
#[command(name = "ragport")]
#[command(about = "Query Open WebUI knowledge collections from the command line", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the retrieval service
    #[arg(short, long, global = true, env = "RAGPORT_URL")]
    url: Option<String>,

    /// API key (bearer token)
    #[arg(short, long, global = true, env = "RAGPORT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RAGPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the collections the caller may access
    Collections(CollectionsCommand),

    /// Query collections and print ranked results
    Query(QueryCommand),

    /// Query collections and emit LLM-ready context with citations
    Context(ContextCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.url,
        cli.api_key,
        cli.config,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("ragport starting");
    tracing::debug!("Service URL: {}", config.base_url);

    // Emit command span
    let command_name = match &cli.command {
        Commands::Collections(_) => "collections",
        Commands::Query(_) => "query",
        Commands::Context(_) => "context",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Collections(cmd) => cmd.execute(&config).await,
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Context(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
