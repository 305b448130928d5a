//! Cache module for storing Etherscan responses
//!
//! This module provides the key-value stores the query client caches
//! responses in, and the key format entries are stored under. Entries have
//! no TTL: once a query succeeds, its response is reused until the store is
//! cleared.

mod key;
mod store;

pub use key::QueryKey;
pub use store::{DiskStore, KeyValueStore, MemoryStore, StoreError, StoredEntry};
