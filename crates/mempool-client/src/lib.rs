//! mempool-client: REST client for mempool-style block explorers
//!
//! One client per network. The session replaces the whole client when the
//! network changes; nothing in here is mutated after construction.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use scalar_core::{FeeRates, NetworkConfig, UpstreamError, Utxo};
use serde::de::DeserializeOwned;

pub use types::{
    AddressBalance, AddressInfo, AddressValidation, RecommendedFees, TransactionInfo, TxStatus,
};

/// Default timeout for explorer API calls (30 seconds)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type for mempool client operations
pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Operations the bridge needs from a block explorer
#[async_trait]
pub trait MempoolApi: Send + Sync {
    fn network(&self) -> &NetworkConfig;

    async fn address_balance(&self, address: &str) -> Result<AddressBalance>;

    async fn utxos(&self, address: &str) -> Result<Vec<Utxo>>;

    /// Recommended fee rates. Never fails: falls back to 1 sat/vB.
    async fn fee_rates(&self) -> FeeRates;

    async fn validate_address(&self, address: &str) -> Result<AddressValidation>;

    async fn transaction(&self, txid: &str) -> Result<TransactionInfo>;

    /// Broadcast a raw transaction, returning its txid
    async fn push_tx(&self, tx_hex: &str) -> Result<String>;
}

/// HTTP client for one network's explorer
#[derive(Clone)]
pub struct MempoolClient {
    http: reqwest::Client,
    network: NetworkConfig,
    timeout: Duration,
}

impl MempoolClient {
    pub fn new(network: NetworkConfig) -> Result<Self> {
        Self::with_timeout(network, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(network: NetworkConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("scalar-bridge")
            .build()
            .map_err(|e| UpstreamError::Unreachable {
                url: network.mempool_api_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            network,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.network.mempool_api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = timed_request(&url, self.timeout, self.http.get(&url).send()).await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::Parse(format!("{}: {}", url, e)))
    }

    async fn fetch_fee_rates(&self) -> Result<FeeRates> {
        let fees: RecommendedFees = self.get_json("v1/fees/recommended").await?;
        Ok(fees.into())
    }
}

#[async_trait]
impl MempoolApi for MempoolClient {
    fn network(&self) -> &NetworkConfig {
        &self.network
    }

    async fn address_balance(&self, address: &str) -> Result<AddressBalance> {
        let info: AddressInfo = self.get_json(&format!("address/{}", address)).await?;
        Ok(AddressBalance::from(&info))
    }

    async fn utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        let script = btc_tx::script_pubkey_for(address, self.network.network)
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;

        let raw: Vec<types::RawUtxo> = self.get_json(&format!("address/{}/utxo", address)).await?;
        tracing::debug!(address, count = raw.len(), "Fetched UTXOs");

        Ok(raw.into_iter().map(|u| u.into_utxo(&script)).collect())
    }

    async fn fee_rates(&self) -> FeeRates {
        match self.fetch_fee_rates().await {
            Ok(rates) => rates,
            Err(e) => {
                tracing::warn!(error = %e, "Fee estimate unavailable, using fallback rate");
                FeeRates::default()
            }
        }
    }

    async fn validate_address(&self, address: &str) -> Result<AddressValidation> {
        self.get_json(&format!("v1/validate-address/{}", address))
            .await
    }

    async fn transaction(&self, txid: &str) -> Result<TransactionInfo> {
        self.get_json(&format!("tx/{}", txid)).await
    }

    async fn push_tx(&self, tx_hex: &str) -> Result<String> {
        let url = self.url("tx");
        let response = timed_request(
            &url,
            self.timeout,
            self.http
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(tx_hex.to_string())
                .send(),
        )
        .await?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Parse(format!("Failed to read broadcast response: {}", e)))?;

        let result = broadcast_result(status, &body);
        match &result {
            Ok(txid) => tracing::info!(txid = %txid, "Transaction broadcast"),
            Err(e) => tracing::warn!(status, error = %e, "Broadcast rejected"),
        }
        result
    }
}

/// Interpret a `POST /tx` response.
///
/// Success bodies are the bare txid. Error bodies carry the node's reason inside a
/// `"message":"..."` fragment, e.g.
/// `sendrawtransaction RPC error: {"code":-25,"message":"bad-txns-inputs-missingorspent"}`.
pub fn broadcast_result(status: u16, body: &str) -> Result<String> {
    if (200..300).contains(&status) {
        return Ok(body.trim().to_string());
    }
    Err(UpstreamError::BroadcastRejected {
        message: parse_broadcast_error(body),
    })
}

/// Pull the `"message":"..."` value out of an error body, or return the body as-is
pub fn parse_broadcast_error(body: &str) -> String {
    body.split("\"message\":\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .map(|m| m.to_string())
        .unwrap_or_else(|| body.trim().to_string())
}

/// Wrap an HTTP call with a timeout. Converts both timeout and transport errors.
async fn timed_request<T>(
    url: &str,
    timeout: Duration,
    fut: impl std::future::Future<Output = std::result::Result<T, reqwest::Error>>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| UpstreamError::Unreachable {
            url: url.to_string(),
            message: format!("request timed out after {}s", timeout.as_secs()),
        })?
        .map_err(|e| UpstreamError::Unreachable {
            url: url.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalar_core::BitcoinNetwork;

    #[test]
    fn test_parse_broadcast_error_embedded_json() {
        let body = r#"sendrawtransaction RPC error: {"code":-25,"message":"bad-txns-inputs-missingorspent"}"#;
        assert_eq!(parse_broadcast_error(body), "bad-txns-inputs-missingorspent");
    }

    #[test]
    fn test_parse_broadcast_error_plain_json() {
        let body = r#"{"message":"bad-txns-inputs-missingorspent"}"#;
        assert_eq!(parse_broadcast_error(body), "bad-txns-inputs-missingorspent");
    }

    #[test]
    fn test_parse_broadcast_error_plain_text() {
        assert_eq!(
            parse_broadcast_error("Transaction already in block chain\n"),
            "Transaction already in block chain"
        );
    }

    #[test]
    fn test_broadcast_result() {
        assert_eq!(broadcast_result(200, "abcd\n").unwrap(), "abcd");

        match broadcast_result(400, r#"{"message":"min relay fee not met"}"#) {
            Err(UpstreamError::BroadcastRejected { message }) => {
                assert_eq!(message, "min relay fee not met")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_url_join() {
        let network = NetworkConfig::for_network(BitcoinNetwork::Testnet4)
            .with_mempool_url("https://mempool.space/testnet4/api/");
        let client = MempoolClient::new(network).unwrap();
        assert_eq!(
            client.url("/v1/fees/recommended"),
            "https://mempool.space/testnet4/api/v1/fees/recommended"
        );
    }

    #[tokio::test]
    async fn test_fee_rates_fall_back_when_unreachable() {
        // Nothing listens on the discard port; the request fails fast
        let network = NetworkConfig::for_network(BitcoinNetwork::Regtest)
            .with_mempool_url("http://127.0.0.1:9/api");
        let client = MempoolClient::with_timeout(network, Duration::from_secs(2)).unwrap();

        assert_eq!(client.fee_rates().await, FeeRates::default());
    }

    #[tokio::test]
    async fn test_utxos_rejects_foreign_address() {
        let network = NetworkConfig::for_network(BitcoinNetwork::Regtest)
            .with_mempool_url("http://127.0.0.1:9/api");
        let client = MempoolClient::new(network).unwrap();

        let result = client
            .utxos("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4")
            .await;
        assert!(matches!(result, Err(UpstreamError::Parse(_))));
    }
}
