//! Command-line interface parsing for etherquery
//!
//! This module handles parsing of CLI arguments using clap and derives the
//! cache store to use from them.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::DiskStore;
use crate::etherscan::MAINNET;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A query parameter was not of the form KEY=VALUE
    #[error("Invalid parameter: '{0}'. Expected KEY=VALUE")]
    InvalidParam(String),

    /// Neither --cache-dir nor a home directory is available
    #[error("No cache directory available; pass --cache-dir or --no-cache")]
    NoCacheDir,
}

/// etherquery - Query Etherscan with a persistent response cache
#[derive(Parser, Debug)]
#[command(name = "etherquery")]
#[command(about = "Query Etherscan with a persistent response cache")]
#[command(version)]
pub struct Cli {
    /// Network to query (mainnet, goerli, sepolia, ...)
    #[arg(long, short, global = true, env = "ETHERQUERY_NETWORK", default_value = MAINNET)]
    pub network: String,

    /// Directory holding the response cache
    #[arg(long, global = true, env = "ETHERQUERY_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Keep responses in memory only for this run
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info", value_name = "LEVEL")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the raw input of one or more transactions
    ///
    /// Hashes may be given with or without the 0x prefix. Lookups run
    /// concurrently; inputs are printed in argument order.
    Tx {
        #[arg(required = true, value_name = "HASH")]
        hashes: Vec<String>,
    },

    /// Run a raw query and print the JSON response
    ///
    /// Example:
    ///   etherquery query module=proxy action=eth_blockNumber
    Query {
        #[arg(required = true, value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Print an address or hash with the 0x prefix
    Address { address: String },

    /// Inspect or clear the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// List cached queries with the time they were stored
    List,
    /// Remove every cached response
    Clear,
}

/// Where responses are cached for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Process-local, discarded on exit
    Memory,
    /// Persistent store in the given directory
    Disk(PathBuf),
}

/// Parses a `KEY=VALUE` query parameter, splitting on the first `=`
///
/// # Returns
/// * `Ok((key, value))` - The value may be empty or contain further `=`
/// * `Err(CliError::InvalidParam)` - If there is no `=` or the key is empty
pub fn parse_param(s: &str) -> Result<(String, String), CliError> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(CliError::InvalidParam(s.to_string())),
    }
}

impl StoreConfig {
    /// Creates a StoreConfig from parsed CLI arguments.
    ///
    /// `--no-cache` wins over `--cache-dir`; without either the XDG cache
    /// directory is used.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.no_cache {
            return Ok(StoreConfig::Memory);
        }
        match &cli.cache_dir {
            Some(dir) => Ok(StoreConfig::Disk(dir.clone())),
            None => DiskStore::default_dir()
                .map(StoreConfig::Disk)
                .ok_or(CliError::NoCacheDir),
        }
    }
}
