//! Etherscan query client
//!
//! Resolves a network name and a parameter set into the parsed JSON response,
//! reusing cached responses and retrying upstream rejections with backoff.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use super::transport::{HttpTransport, Transport};
use super::QueryParams;
use crate::cache::{KeyValueStore, QueryKey, StoreError};

/// Network served by the unsuffixed API host
pub const MAINNET: &str = "mainnet";

/// Status reported to the logger before every request
pub const STATUS_QUERYING: &str = "Querying Etherscan";

/// Callback receiving human-readable status lines
pub type StatusLogger<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Errors that can occur when querying Etherscan
#[derive(Debug, Error)]
pub enum ClientError {
    /// Etherscan kept answering with a non-OK message until attempts ran out
    #[error("Failed to query etherscan: {message} - {result}")]
    Rejected { message: String, result: String },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Body (or cached value) was not valid JSON
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A successful response did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Writing the response to the cache failed
    #[error("Cache error: {0}")]
    Store(#[from] StoreError),
}

/// Bounded retry with exponential backoff
///
/// The delay after attempt `n` (0-based) is `base_delay + 2^n` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of requests made before giving up
    pub max_attempts: u32,
    /// Constant floor added to every delay
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_secs(2u64.saturating_pow(attempt)).saturating_add(self.base_delay)
    }
}

/// Configuration for a QueryClient
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub retry: RetryPolicy,
    /// Whether concurrent queries for the same key share one request loop
    pub coalesce_in_flight: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            coalesce_in_flight: true,
        }
    }
}

/// Returns the API endpoint for a network
///
/// `mainnet` uses `api.etherscan.io`; any other network `n` uses
/// `api-n.etherscan.io`.
pub fn api_url(network: &str) -> String {
    if network == MAINNET {
        "https://api.etherscan.io/api".to_string()
    } else {
        format!("https://api-{}.etherscan.io/api", network)
    }
}

/// Client for querying the Etherscan API
///
/// Successful responses are written to the store and served from it on
/// every later query with the same key. Entries are never invalidated.
pub struct QueryClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn KeyValueStore>,
    config: ClientConfig,
    /// One slot per key with a query in progress
    in_flight: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl QueryClient {
    /// Creates a client that sends requests over HTTP
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_transport(Arc::new(HttpTransport::new()), store)
    }

    /// Creates a client with a custom transport
    pub fn with_transport(transport: Arc<dyn Transport>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            transport,
            store,
            config: ClientConfig::default(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the client configuration
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Queries Etherscan on `network` with the given parameters
    ///
    /// # Behavior
    /// - A cached response is returned without any request or logger call
    /// - Otherwise up to `max_attempts` requests are made; a response counts
    ///   as successful when it has no `message` field or the message starts
    ///   with `OK`
    /// - Rejections before the last attempt are reported to `logger` and
    ///   followed by a backoff sleep
    ///
    /// # Returns
    /// * `Ok(Value)` - The parsed response
    /// * `Err(ClientError::Rejected)` - If the final attempt was rejected
    /// * `Err(ClientError)` - Transport, parse, and cache errors, unretried
    pub async fn query(
        &self,
        network: &str,
        params: &QueryParams,
        logger: StatusLogger<'_>,
    ) -> Result<Value, ClientError> {
        let key = QueryKey::new(network, params).to_string();

        if let Some(value) = self.cached(&key)? {
            return Ok(value);
        }

        if !self.config.coalesce_in_flight {
            return self.fetch_with_retry(network, params, &key, logger).await;
        }

        let slot = self.acquire_slot(&key);
        let result = {
            let _turn = slot.lock().await;
            // An earlier caller for this key may have filled the cache while we waited
            match self.cached(&key) {
                Ok(Some(value)) => Ok(value),
                Ok(None) => self.fetch_with_retry(network, params, &key, logger).await,
                Err(e) => Err(e),
            }
        };
        self.release_slot(&key, slot);
        result
    }

    /// Reads and parses the cached response for `key`
    fn cached(&self, key: &str) -> Result<Option<Value>, ClientError> {
        match self.store.get(key) {
            Some(text) => {
                debug!(key, "cache hit");
                Ok(Some(serde_json::from_str(&text)?))
            }
            None => Ok(None),
        }
    }

    async fn fetch_with_retry(
        &self,
        network: &str,
        params: &QueryParams,
        key: &str,
        logger: StatusLogger<'_>,
    ) -> Result<Value, ClientError> {
        let url = api_url(network);
        let policy = self.config.retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            logger(STATUS_QUERYING);
            debug!(%url, attempt, "sending request");
            let response = self.transport.get_json(&url, params).await?;

            let rejection = match upstream_rejection(&response) {
                None => {
                    self.store.set(key, &response.to_string())?;
                    debug!(key, "cached response");
                    return Ok(response);
                }
                Some(rejection) => rejection,
            };

            if attempt + 1 >= max_attempts {
                warn!(network, attempts = max_attempts, error = %rejection, "giving up");
                return Err(rejection);
            }

            let delay = policy.delay_for(attempt);
            let attempts_left = max_attempts - attempt - 1;
            warn!(network, attempt, delay_secs = delay.as_secs(), error = %rejection, "request rejected");
            logger(&format!(
                "{}; will try again in {} seconds; attempts left: {}",
                rejection,
                delay.as_secs(),
                attempts_left
            ));
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn acquire_slot(&self, key: &str) -> Arc<AsyncMutex<()>> {
        self.in_flight_guard()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    fn release_slot(&self, key: &str, slot: Arc<AsyncMutex<()>>) {
        let mut in_flight = self.in_flight_guard();
        // Registry plus this caller: nobody else is waiting on the key
        if Arc::strong_count(&slot) <= 2 {
            in_flight.remove(key);
        }
    }

    fn in_flight_guard(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Returns the rejection carried by a response, if it has one
fn upstream_rejection(response: &Value) -> Option<ClientError> {
    let message = response.get("message")?;
    let message = describe(Some(message));
    if message.starts_with("OK") {
        return None;
    }
    Some(ClientError::Rejected {
        message,
        result: describe(response.get("result")),
    })
}

/// Renders a response field for error messages
fn describe(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "null".to_string(),
    }
}
