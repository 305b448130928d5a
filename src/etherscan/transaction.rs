//! Transaction input lookup
//!
//! Resolves a transaction hash to the raw calldata (`input`) of the
//! transaction through Etherscan's `eth_getTransactionByHash` proxy.

use serde::Deserialize;
use serde_json::Value;

use super::{ClientError, QueryClient, QueryParams, StatusLogger};
use crate::address::normalize_address;

/// Response of `eth_getTransactionByHash`, reduced to the fields we read
#[derive(Debug, Deserialize)]
struct TransactionResponse {
    /// `null` when the transaction is unknown
    result: Option<TransactionResult>,
}

#[derive(Debug, Deserialize)]
struct TransactionResult {
    input: String,
}

/// Parameters for looking up a transaction by hash
///
/// The hash is normalized to carry a `0x` prefix.
pub fn transaction_query(tx_hash: &str) -> QueryParams {
    QueryParams::new()
        .with("module", "proxy")
        .with("action", "eth_getTransactionByHash")
        .with("txhash", normalize_address(tx_hash))
}

/// Fetches the raw input of a transaction
///
/// # Returns
/// * `Ok(String)` - The `result.input` field of the response
/// * `Err(ClientError::MalformedResponse)` - If the response has no usable
///   `result.input`
/// * `Err(ClientError)` - Any error from the underlying query, unchanged
pub async fn resolve_transaction_input(
    client: &QueryClient,
    network: &str,
    tx_hash: &str,
    logger: StatusLogger<'_>,
) -> Result<String, ClientError> {
    let response = client
        .query(network, &transaction_query(tx_hash), logger)
        .await?;
    extract_input(response)
}

impl QueryClient {
    /// Fetches the raw input of a transaction, see [`resolve_transaction_input`]
    pub async fn transaction_input(
        &self,
        network: &str,
        tx_hash: &str,
        logger: StatusLogger<'_>,
    ) -> Result<String, ClientError> {
        resolve_transaction_input(self, network, tx_hash, logger).await
    }
}

fn extract_input(response: Value) -> Result<String, ClientError> {
    let response: TransactionResponse = serde_json::from_value(response)
        .map_err(|e| ClientError::MalformedResponse(format!("transaction lookup: {}", e)))?;

    response
        .result
        .map(|tx| tx.input)
        .ok_or_else(|| ClientError::MalformedResponse("transaction result is missing".to_string()))
}
