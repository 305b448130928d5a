//! Etherscan API client
//!
//! This module contains the query client with its caching and retry
//! behavior, the transport it sends requests through, and the typed
//! lookups built on top of it.

mod client;
mod params;
mod transaction;
mod transport;

pub use client::{
    api_url, ClientConfig, ClientError, QueryClient, RetryPolicy, StatusLogger, MAINNET,
    STATUS_QUERYING,
};
pub use params::QueryParams;
pub use transaction::{resolve_transaction_input, transaction_query};
pub use transport::{HttpTransport, Transport};
