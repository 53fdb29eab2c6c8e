//! Response shapes of the mempool REST API

use serde::{Deserialize, Serialize};

use scalar_core::{FeeRates, Utxo};

/// `GET /address/{addr}`
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInfo {
    pub address: String,
    pub chain_stats: AddressStats,
    pub mempool_stats: AddressStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressStats {
    #[serde(default)]
    pub funded_txo_sum: u64,
    #[serde(default)]
    pub spent_txo_sum: u64,
    #[serde(default)]
    pub tx_count: u64,
}

impl AddressStats {
    /// Funded minus spent, saturating at the `i64` bounds
    pub fn net(&self) -> i64 {
        let net = i128::from(self.funded_txo_sum) - i128::from(self.spent_txo_sum);
        net.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }
}

/// Confirmed and pending balance of an address, in satoshis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBalance {
    pub confirmed: u64,
    /// Net mempool delta; negative while spends are pending
    pub unconfirmed: i64,
}

impl AddressBalance {
    /// Spendable estimate: confirmed plus pending delta, floored at zero
    pub fn total(&self) -> u64 {
        let total = i128::from(self.confirmed) + i128::from(self.unconfirmed);
        u64::try_from(total.max(0)).unwrap_or(u64::MAX)
    }
}

impl From<&AddressInfo> for AddressBalance {
    fn from(info: &AddressInfo) -> Self {
        Self {
            confirmed: info.chain_stats.net().max(0) as u64,
            unconfirmed: info.mempool_stats.net(),
        }
    }
}

/// Confirmation status shared by UTXO and transaction responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub block_time: Option<u64>,
}

/// `GET /address/{addr}/utxo` entry
#[derive(Debug, Clone, Deserialize)]
pub struct RawUtxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
    #[serde(default)]
    pub status: TxStatus,
}

impl RawUtxo {
    /// Attach the owner's locking script (the endpoint does not return it)
    pub fn into_utxo(self, script_pubkey: &[u8]) -> Utxo {
        Utxo {
            txid: self.txid,
            vout: self.vout,
            value: self.value,
            script_pubkey: script_pubkey.to_vec(),
            confirmed: self.status.confirmed,
        }
    }
}

/// `GET /v1/fees/recommended`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedFees {
    pub fastest_fee: u64,
    #[serde(default)]
    pub half_hour_fee: u64,
    pub hour_fee: u64,
    #[serde(default)]
    pub economy_fee: u64,
    pub minimum_fee: u64,
}

impl From<RecommendedFees> for FeeRates {
    fn from(fees: RecommendedFees) -> Self {
        Self {
            fastest: fees.fastest_fee,
            hourly: fees.hour_fee,
            minimum: fees.minimum_fee,
        }
    }
}

/// `GET /v1/validate-address/{addr}`
#[derive(Debug, Clone, Deserialize)]
pub struct AddressValidation {
    pub isvalid: bool,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "scriptPubKey")]
    pub script_pubkey: Option<String>,
    #[serde(default)]
    pub iswitness: bool,
    #[serde(default)]
    pub witness_version: Option<u8>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /tx/{id}` (only the fields the bridge reads)
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionInfo {
    pub txid: String,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub status: TxStatus,
}
