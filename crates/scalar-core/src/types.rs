//! Core type definitions for the bridge

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transaction ID (32 bytes, hex-encoded). Used for both Bitcoin txids and EVM hashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub String);

impl TxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened `first8...last8` form shown in notifications
    pub fn short(&self) -> String {
        short_tx_id(&self.0)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shorten a transaction id to `first8...last8`.
///
/// Ids of 16 characters or fewer are returned unchanged.
pub fn short_tx_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 16 {
        return id.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Bitcoin network the session is connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinNetwork {
    Mainnet,
    Testnet,
    Testnet4,
    Regtest,
}

impl BitcoinNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Testnet4 => "testnet4",
            Self::Regtest => "regtest",
        }
    }
}

impl fmt::Display for BitcoinNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BitcoinNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "bitcoin" => Ok(Self::Mainnet),
            "testnet" | "testnet3" => Ok(Self::Testnet),
            "testnet4" => Ok(Self::Testnet4),
            "regtest" => Ok(Self::Regtest),
            other => Err(format!("Unknown bitcoin network: {}", other)),
        }
    }
}

/// Per-network settings. Immutable once selected; a network switch replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub coin_name: String,
    pub coin_symbol: String,
    pub network_name: String,
    /// Base URL of the mempool-style REST API (e.g. "https://mempool.space/api")
    pub mempool_api_url: String,
    pub network: BitcoinNetwork,
}

impl NetworkConfig {
    /// Preset configuration for a network
    pub fn for_network(network: BitcoinNetwork) -> Self {
        let (coin_name, coin_symbol, network_name, url) = match network {
            BitcoinNetwork::Mainnet => ("Bitcoin", "BTC", "Bitcoin", "https://mempool.space/api"),
            BitcoinNetwork::Testnet => (
                "Testnet Bitcoin",
                "tBTC",
                "Bitcoin Testnet",
                "https://mempool.space/testnet/api",
            ),
            BitcoinNetwork::Testnet4 => (
                "Testnet4 Bitcoin",
                "tBTC",
                "Bitcoin Testnet4",
                "https://mempool.space/testnet4/api",
            ),
            BitcoinNetwork::Regtest => (
                "Regtest Bitcoin",
                "rBTC",
                "Bitcoin Regtest",
                "http://127.0.0.1:8080/api",
            ),
        };

        Self {
            coin_name: coin_name.to_string(),
            coin_symbol: coin_symbol.to_string(),
            network_name: network_name.to_string(),
            mempool_api_url: url.to_string(),
            network,
        }
    }

    /// Same preset with a different mempool base URL
    pub fn with_mempool_url(mut self, url: impl Into<String>) -> Self {
        self.mempool_api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Block-explorer deep link for a transaction.
    ///
    /// The explorer lives at the API base with the trailing `/api` removed.
    pub fn explorer_tx_url(&self, txid: &str) -> String {
        let base = self.mempool_api_url.trim_end_matches('/');
        let base = base.strip_suffix("/api").unwrap_or(base);
        format!("{}/tx/{}", base, txid)
    }
}

/// EVM chain metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmChain {
    pub chain_id: u64,
    /// Chain identifier used in cross-chain messages (e.g. "evm|11155111")
    pub name: String,
    pub rpc_url: String,
    pub gateway_address: String,
    pub explorer_url: String,
}

impl EvmChain {
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }
}

/// Unspent transaction output as reported by the mempool API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
    /// Locking script of the owning address
    #[serde(with = "hex_bytes")]
    pub script_pubkey: Vec<u8>,
    pub confirmed: bool,
}

/// Recommended fee rates in sat/vB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRates {
    pub fastest: u64,
    pub hourly: u64,
    pub minimum: u64,
}

impl Default for FeeRates {
    fn default() -> Self {
        Self {
            fastest: constants::FALLBACK_FEE_RATE,
            hourly: constants::FALLBACK_FEE_RATE,
            minimum: constants::FALLBACK_FEE_RATE,
        }
    }
}

/// Satoshi amount
pub type Sats = u64;

/// Parse a decimal amount string ("0.001") into base units with `decimals` places.
///
/// Rejects negatives, exponents and more fractional digits than `decimals`.
pub fn parse_units(amount: &str, decimals: u8) -> Result<u128, String> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err("Amount is empty".to_string());
    }

    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(format!("Invalid amount: {}", amount));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("Invalid amount: {}", amount));
    }
    if frac.len() > decimals as usize {
        return Err(format!(
            "Amount {} has more than {} decimal places",
            amount, decimals
        ));
    }

    let scale = 10u128
        .checked_pow(decimals as u32)
        .ok_or_else(|| format!("Unsupported decimals: {}", decimals))?;
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|e| format!("Invalid amount {}: {}", amount, e))?
    };

    let mut frac_padded = frac.to_string();
    while frac_padded.len() < decimals as usize {
        frac_padded.push('0');
    }
    let frac_units = if frac_padded.is_empty() {
        0
    } else {
        frac_padded
            .parse::<u128>()
            .map_err(|e| format!("Invalid amount {}: {}", amount, e))?
    };

    whole_units
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(|| format!("Amount overflow: {}", amount))
}

/// Parse a BTC-denominated decimal string into satoshis
pub fn parse_btc(amount: &str) -> Result<Sats, String> {
    let units = parse_units(amount, constants::BTC_DECIMALS)?;
    u64::try_from(units).map_err(|_| format!("Amount overflow: {}", amount))
}

/// Constants
pub mod constants {
    use super::Sats;

    /// 1 BTC in satoshis
    pub const SATS_PER_BTC: Sats = 100_000_000;

    pub const BTC_DECIMALS: u8 = 8;

    /// Fee rate used whenever the fee estimate cannot be fetched (sat/vB)
    pub const FALLBACK_FEE_RATE: u64 = 1;
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_tx_id() {
        let id = "a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90";
        assert_eq!(short_tx_id(id), "a1b2c3d4...6d7e8f90");
        assert_eq!(short_tx_id("abc"), "abc");
        assert_eq!(TxId::new(id).short(), "a1b2c3d4...6d7e8f90");
    }

    #[test]
    fn test_parse_btc() {
        assert_eq!(parse_btc("0.001").unwrap(), 100_000);
        assert_eq!(parse_btc("1").unwrap(), constants::SATS_PER_BTC);
        assert_eq!(parse_btc(".5").unwrap(), 50_000_000);
        assert_eq!(parse_btc("0.00000001").unwrap(), 1);
        assert!(parse_btc("0.000000001").is_err());
        assert!(parse_btc("-1").is_err());
        assert!(parse_btc("1e3").is_err());
        assert!(parse_btc("").is_err());
        assert!(parse_btc(".").is_err());
    }

    #[test]
    fn test_parse_units_token_decimals() {
        assert_eq!(parse_units("1.5", 18).unwrap(), 1_500_000_000_000_000_000);
        assert_eq!(parse_units("42", 0).unwrap(), 42);
        assert!(parse_units("1.5", 0).is_err());
    }

    #[test]
    fn test_explorer_links() {
        let mainnet = NetworkConfig::for_network(BitcoinNetwork::Mainnet);
        assert_eq!(
            mainnet.explorer_tx_url("abcd"),
            "https://mempool.space/tx/abcd"
        );

        let testnet4 = NetworkConfig::for_network(BitcoinNetwork::Testnet4);
        assert_eq!(
            testnet4.explorer_tx_url("abcd"),
            "https://mempool.space/testnet4/tx/abcd"
        );

        let custom = NetworkConfig::for_network(BitcoinNetwork::Regtest)
            .with_mempool_url("http://localhost:3000/");
        assert_eq!(custom.explorer_tx_url("ff"), "http://localhost:3000/tx/ff");
    }

    #[test]
    fn test_network_parse() {
        assert_eq!(
            "Testnet4".parse::<BitcoinNetwork>().unwrap(),
            BitcoinNetwork::Testnet4
        );
        assert_eq!(
            "bitcoin".parse::<BitcoinNetwork>().unwrap(),
            BitcoinNetwork::Mainnet
        );
        assert!("signet".parse::<BitcoinNetwork>().is_err());
    }

    #[test]
    fn test_fee_rates_default() {
        let rates = FeeRates::default();
        assert_eq!(
            rates,
            FeeRates {
                fastest: 1,
                hourly: 1,
                minimum: 1
            }
        );
    }

    #[test]
    fn test_utxo_script_hex_serde() {
        let utxo = Utxo {
            txid: "aa".repeat(32),
            vout: 1,
            value: 5_000,
            script_pubkey: vec![0x00, 0x14],
            confirmed: true,
        };
        let json = serde_json::to_value(&utxo).unwrap();
        assert_eq!(json["scriptPubkey"], "0014");
        let parsed: Utxo = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, utxo);
    }
}
