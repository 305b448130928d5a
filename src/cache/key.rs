//! Cache key derivation for Etherscan queries

use serde_json::json;
use std::fmt;

use crate::etherscan::QueryParams;

/// Identifies a cached response by network and parameter set
///
/// Renders as `{"network":"<network>","params":"<query string>"}`. The
/// query string is the canonical form of the parameters, so the same pairs
/// given in a different order map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    network: String,
    params: String,
}

impl QueryKey {
    /// Creates the key for a query against `network`
    pub fn new(network: &str, params: &QueryParams) -> Self {
        Self {
            network: network.to_string(),
            params: params.canonical(),
        }
    }

    /// The network the query targets
    pub fn network(&self) -> &str {
        &self.network
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = json!({
            "network": self.network,
            "params": self.params,
        });
        write!(f, "{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_renders_as_json_object() {
        let params = QueryParams::new()
            .with("module", "proxy")
            .with("action", "eth_blockNumber");
        let key = QueryKey::new("mainnet", &params);

        assert_eq!(
            key.to_string(),
            r#"{"network":"mainnet","params":"action=eth_blockNumber&module=proxy"}"#
        );
    }

    #[test]
    fn test_key_ignores_parameter_order() {
        let a = QueryParams::new().with("module", "proxy").with("txhash", "0x1");
        let b = QueryParams::new().with("txhash", "0x1").with("module", "proxy");

        assert_eq!(QueryKey::new("goerli", &a), QueryKey::new("goerli", &b));
        assert_eq!(
            QueryKey::new("goerli", &a).to_string(),
            QueryKey::new("goerli", &b).to_string()
        );
    }

    #[test]
    fn test_key_differs_by_network() {
        let params = QueryParams::new().with("module", "proxy");
        let mainnet = QueryKey::new("mainnet", &params);
        let sepolia = QueryKey::new("sepolia", &params);

        assert_ne!(mainnet.to_string(), sepolia.to_string());
        assert_eq!(sepolia.network(), "sepolia");
    }

    #[test]
    fn test_key_escapes_quotes_in_network() {
        let key = QueryKey::new("we\"ird", &QueryParams::new());
        let parsed: serde_json::Value =
            serde_json::from_str(&key.to_string()).expect("Key should be valid JSON");
        assert_eq!(parsed["network"], "we\"ird");
        assert_eq!(parsed["params"], "");
    }
}
