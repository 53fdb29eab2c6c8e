//! Custodian public key preparation for vault scripts

use scalar_core::{Custodian, CustodianStatus, TxError};

/// Custodian keys in the order the vault script expects them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodianKeys {
    pub keys: Vec<Vec<u8>>,
}

impl CustodianKeys {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// All keys concatenated, as passed to the vault library
    pub fn concatenated(&self) -> Vec<u8> {
        self.keys.concat()
    }
}

/// Keep activated custodians that have a key, preserving their relative order.
///
/// A key listed twice is only kept once.
pub fn prepare_custodian_pubkeys(custodians: &[Custodian]) -> Result<CustodianKeys, TxError> {
    let mut keys: Vec<Vec<u8>> = Vec::new();

    for custodian in custodians {
        if custodian.status != CustodianStatus::Activated {
            continue;
        }
        let pubkey = custodian.btc_pubkey.trim();
        if pubkey.is_empty() {
            tracing::debug!(custodian = %custodian.name, "Skipping custodian without key");
            continue;
        }

        let bytes = hex::decode(pubkey).map_err(|e| TxError::BuildFailed {
            message: format!("Custodian {} has an invalid key: {}", custodian.name, e),
        })?;
        if !keys.contains(&bytes) {
            keys.push(bytes);
        }
    }

    Ok(CustodianKeys { keys })
}
