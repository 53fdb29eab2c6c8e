//! PSBT signing metadata and extraction
//!
//! The option shapes mirror what injected Bitcoin wallets accept for
//! `signPsbt` (`autoFinalized`, `toSignInputs`).

use bitcoin::consensus::encode::serialize_hex;
use bitcoin::Psbt;
use serde::{Deserialize, Serialize};

use scalar_core::TxError;

/// Options passed to the wallet alongside a PSBT
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignPsbtOptions {
    /// Ask the wallet to finalize inputs after signing
    pub auto_finalized: bool,
    /// Restrict signing to these inputs (all of the wallet's inputs when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_sign_inputs: Option<Vec<ToSignInput>>,
}

/// Per-input signing constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToSignInput {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Sign with the untweaked key (script-path spends)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_tweak_signer: Option<bool>,
}

impl SignPsbtOptions {
    pub fn finalized(inputs: Vec<ToSignInput>) -> Self {
        Self {
            auto_finalized: true,
            to_sign_inputs: Some(inputs),
        }
    }
}

/// Decode a hex-encoded PSBT
pub fn decode_psbt(psbt_hex: &str) -> Result<Psbt, TxError> {
    let bytes = hex::decode(psbt_hex.trim()).map_err(|e| TxError::BuildFailed {
        message: format!("PSBT is not valid hex: {}", e),
    })?;
    Psbt::deserialize(&bytes).map_err(|e| TxError::BuildFailed {
        message: format!("Failed to decode PSBT: {}", e),
    })
}

/// One signing constraint per input, all owned by `address`
pub fn signing_inputs(psbt_hex: &str, address: &str) -> Result<Vec<ToSignInput>, TxError> {
    let psbt = decode_psbt(psbt_hex)?;
    Ok((0..psbt.inputs.len())
        .map(|index| ToSignInput {
            index,
            address: Some(address.to_string()),
            public_key: None,
            disable_tweak_signer: None,
        })
        .collect())
}

/// Extract the raw transaction hex from a finalized PSBT
pub fn extract_signed_tx_hex(signed_psbt_hex: &str) -> Result<String, TxError> {
    let psbt = decode_psbt(signed_psbt_hex)?;

    if let Some(index) = psbt
        .inputs
        .iter()
        .position(|i| i.final_script_witness.is_none() && i.final_script_sig.is_none())
    {
        return Err(TxError::BuildFailed {
            message: format!("PSBT input {} is not finalized", index),
        });
    }

    let tx = psbt.extract_tx_unchecked_fee_rate();
    Ok(serialize_hex(&tx))
}
