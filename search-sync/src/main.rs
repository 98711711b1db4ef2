//! Search Sync administration binary.
//!
//! Runs index lifecycle commands against the configured engine.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde_json::Value;
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use search_sync::{Dependencies, SearchSyncError};
use search_sync_shared::IndexDescriptor;

/// Default document type when `SEARCH_TYPE` is not set.
const DEFAULT_DOC_TYPE: &str = "doc";

#[derive(Parser)]
#[command(name = "search-sync-admin")]
#[command(about = "Index administration for search sync", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Index (or alias) name
    #[arg(long, env = "SEARCH_DEFAULT_INDEX", global = true)]
    index: Option<String>,

    /// Document type
    #[arg(long = "type", env = "SEARCH_TYPE", default_value = DEFAULT_DOC_TYPE, global = true)]
    doc_type: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index with its settings and mapping
    CreateIndex,
    /// Delete the index
    DeleteIndex,
    /// Refresh the index
    RefreshIndex,
    /// Apply the mapping to the index
    UpdateMapping,
    /// Delete every document of the type
    CleanIndex,
    /// List the timestamped versions of the index
    ListVersions,
    /// Delete versions older than the one the alias points at
    PruneVersions,
    /// Ping the engine
    Health,
}

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("search_sync=info,search_sync_repository=info"));

    let json_logs = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();
    }

    info!(
        service_name = "search-sync-admin",
        service_version = env!("CARGO_PKG_VERSION"),
        json = json_logs,
        "Tracing initialized"
    );
}

/// Read an optional JSON document from the environment.
fn json_from_env(key: &str) -> Result<Option<Value>, SearchSyncError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| SearchSyncError::config(format!("{} is not valid JSON: {}", key, e))),
        _ => Ok(None),
    }
}

fn descriptor(index: String, doc_type: String) -> Result<IndexDescriptor, SearchSyncError> {
    let mut descriptor = IndexDescriptor::new(index, doc_type);
    if let Some(settings) = json_from_env("SEARCH_INDEX_SETTINGS")? {
        descriptor = descriptor.with_settings(settings);
    }
    if let Some(mapping) = json_from_env("SEARCH_INDEX_MAPPING")? {
        descriptor = descriptor.with_mapping(mapping);
    }
    Ok(descriptor)
}

async fn run(cli: Cli) -> Result<(), SearchSyncError> {
    let deps = Dependencies::new().await?;
    let index = cli
        .index
        .unwrap_or_else(|| deps.config.default_index.clone());
    let descriptor = descriptor(index, cli.doc_type)?;
    let manager = &deps.manager;

    match cli.command {
        Commands::CreateIndex => {
            manager.create_index(&descriptor).await?;
            info!(index = %descriptor.index, "Index ready");
        }
        Commands::DeleteIndex => {
            manager.delete_index(&descriptor.index).await?;
            info!(index = %descriptor.index, "Index deleted");
        }
        Commands::RefreshIndex => {
            manager.refresh_index(&descriptor.index).await?;
            info!(index = %descriptor.index, "Index refreshed");
        }
        Commands::UpdateMapping => {
            if descriptor.mapping.is_none() {
                warn!("SEARCH_INDEX_MAPPING is not set, nothing to apply");
            }
            manager.update_mapping(&descriptor).await?;
        }
        Commands::CleanIndex => {
            let deleted = manager.clean_index(&descriptor).await?;
            info!(index = %descriptor.index, doc_type = %descriptor.doc_type, deleted, "Index cleaned");
        }
        Commands::ListVersions => {
            let current = manager.current_version(&descriptor.index).await?;
            for version in manager.versions(&descriptor.index).await? {
                let marker = if current.as_ref() == Some(&version) { "*" } else { " " };
                println!("{} {} {}", marker, version.name, version.created_at.to_rfc3339());
            }
        }
        Commands::PruneVersions => {
            let pruned = manager.prune_versions(&descriptor.index).await?;
            info!(alias = %descriptor.index, pruned = pruned.len(), "Versions pruned");
        }
        Commands::Health => {
            let healthy = manager.health_check().await?;
            println!("{}", if healthy { "healthy" } else { "unhealthy" });
            if !healthy {
                return Err(SearchSyncError::config("search engine is unhealthy"));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), SearchSyncError> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "Command failed");
            Err(e)
        }
    }
}
