//! HTTP transport for Etherscan requests
//!
//! The query client talks to the network only through [`Transport`], so the
//! retry and caching logic can be driven by a scripted transport in tests.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{ClientError, QueryParams};

/// Issues a GET request and parses the body as JSON
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `params` as the query string of a GET to `url`
    ///
    /// Transport and JSON parse failures are returned as-is; they are never
    /// retried by the caller.
    async fn get_json(&self, url: &str, params: &QueryParams) -> Result<Value, ClientError>;
}

/// Transport backed by a `reqwest` client
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new HttpTransport with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new HttpTransport with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str, params: &QueryParams) -> Result<Value, ClientError> {
        let response = self.client.get(url).query(params.pairs()).send().await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
