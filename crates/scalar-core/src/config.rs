//! Configuration types for the bridge

use serde::{Deserialize, Serialize};

use crate::{BitcoinNetwork, Error, EvmChain, NetworkConfig};

/// Environment variable names read by [`AppConfig::from_env`]
pub mod env {
    pub const SCALAR_API_URL: &str = "SCALAR_API_URL";
    pub const SCALAR_SCAN_URL: &str = "SCALAR_SCAN_URL";
    pub const MEMPOOL_API_URL: &str = "MEMPOOL_API_URL";
    pub const BITCOIN_NETWORK: &str = "BITCOIN_NETWORK";
    pub const EVM_CHAINS: &str = "EVM_CHAINS";
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bitcoin network for the session
    pub network: BitcoinNetwork,

    /// Base URL of the Scalar REST API (protocols, statistics, command results)
    pub scalar_api_url: String,

    /// Base URL of the Scalar scan UI (used for deep links)
    pub scan_url: String,

    /// Override for the network's default mempool API URL
    #[serde(default)]
    pub mempool_url: Option<String>,

    /// EVM chains reachable through a gateway contract
    #[serde(default)]
    pub evm_chains: Vec<EvmChain>,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: BitcoinNetwork::Testnet4,
            scalar_api_url: "http://127.0.0.1:8080".to_string(),
            scan_url: "http://127.0.0.1:3000".to_string(),
            mempool_url: None,
            evm_chains: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Build the config from process environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(url) = lookup(env::SCALAR_API_URL) {
            config.scalar_api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup(env::SCALAR_SCAN_URL) {
            config.scan_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup(env::MEMPOOL_API_URL) {
            if !url.is_empty() {
                config.mempool_url = Some(url);
            }
        }
        if let Some(network) = lookup(env::BITCOIN_NETWORK) {
            config.network = network.parse().map_err(Error::Config)?;
        }
        if let Some(chains) = lookup(env::EVM_CHAINS) {
            config.evm_chains = serde_json::from_str(&chains)
                .map_err(|e| Error::Config(format!("Invalid {}: {}", env::EVM_CHAINS, e)))?;
        }

        Ok(config)
    }

    /// Network settings for the configured network, with the mempool override applied
    pub fn network_config(&self) -> NetworkConfig {
        let preset = NetworkConfig::for_network(self.network);
        match &self.mempool_url {
            Some(url) => preset.with_mempool_url(url.as_str()),
            None => preset,
        }
    }

    /// Look up an EVM chain by chain id
    pub fn evm_chain(&self, chain_id: u64) -> Option<&EvmChain> {
        self.evm_chains.iter().find(|c| c.chain_id == chain_id)
    }
}
