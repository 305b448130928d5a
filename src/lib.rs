//! etherquery library
//!
//! Exposes the Etherscan client, its cache stores, and the CLI types for
//! use in integration tests.

pub mod address;
pub mod cache;
pub mod cli;
pub mod etherscan;
pub mod logging;

pub use address::normalize_address;
pub use etherscan::{resolve_transaction_input, ClientError, QueryClient, QueryParams};
