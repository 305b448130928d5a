//! etherquery - Query Etherscan from the command line
//!
//! Looks up transaction inputs and runs raw Etherscan queries. Successful
//! responses are cached on disk and reused; rate-limit style rejections are
//! retried with backoff.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use etherquery::cache::{DiskStore, KeyValueStore, MemoryStore};
use etherquery::cli::{CacheAction, Cli, Command, StoreConfig};
use etherquery::etherscan::{QueryClient, QueryParams};
use etherquery::logging::{self, log_status};
use etherquery::normalize_address;

/// Builds a query client backed by the configured store
fn build_client(store_config: &StoreConfig) -> QueryClient {
    let store: Arc<dyn KeyValueStore> = match store_config {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::Disk(dir) => Arc::new(DiskStore::with_dir(dir.clone())),
    };
    QueryClient::new(store)
}

/// Lists or clears the disk store
fn run_cache(action: CacheAction, store_config: &StoreConfig) -> std::io::Result<()> {
    let store = match store_config {
        StoreConfig::Disk(dir) => DiskStore::with_dir(dir.clone()),
        StoreConfig::Memory => {
            println!("Cache is disabled (--no-cache)");
            return Ok(());
        }
    };

    match action {
        CacheAction::List => {
            let entries = store.entries();
            for entry in &entries {
                println!("{}  {}", entry.stored_at.to_rfc3339(), entry.key);
            }
            info!(count = entries.len(), path = %store.path().display(), "listed cache");
        }
        CacheAction::Clear => {
            store.clear()?;
            info!(path = %store.path().display(), "cleared cache");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level)?;
    // A missing cache directory is an error only for commands that use the store
    let store_config = StoreConfig::from_cli(&cli);

    let Cli {
        network, command, ..
    } = cli;

    match command {
        Command::Address { address } => {
            println!("{}", normalize_address(&address));
        }
        Command::Cache { action } => {
            run_cache(action, &store_config?)?;
        }
        Command::Tx { hashes } => {
            let client = build_client(&store_config?);
            let lookups = hashes
                .iter()
                .map(|hash| client.transaction_input(&network, hash, &log_status));
            let inputs = futures::future::try_join_all(lookups).await?;
            for input in inputs {
                println!("{}", input);
            }
        }
        Command::Query { params } => {
            let client = build_client(&store_config?);
            let params: QueryParams = params.into_iter().collect();
            let response = client.query(&network, &params, &log_status).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
