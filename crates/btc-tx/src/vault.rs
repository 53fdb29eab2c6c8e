//! Interface to the vault library
//!
//! The vault library owns script construction and PSBT assembly for the
//! custodian vault. This crate only prepares its inputs and consumes its output.

use serde::{Deserialize, Serialize};

use scalar_core::{BitcoinNetwork, Sats, TxError, Utxo};

/// Inputs for a staking (BTC -> destination chain) PSBT
#[derive(Debug, Clone)]
pub struct StakingParams {
    pub network: BitcoinNetwork,
    /// Protocol tag embedded in the vault output
    pub tag: String,
    pub utxos: Vec<Utxo>,
    pub staker_address: String,
    pub staker_pubkey: Vec<u8>,
    pub protocol_pubkey: Vec<u8>,
    /// Concatenated custodian keys in vault order
    pub custodian_pubkeys: Vec<u8>,
    pub custodian_quorum: u8,
    pub destination_chain: String,
    pub destination_token_address: String,
    pub destination_recipient: String,
    pub amount: Sats,
    /// sat/vB
    pub fee_rate: u64,
    pub rbf: bool,
}

/// Unsigned PSBT produced by the vault library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedPsbt {
    pub psbt_hex: String,
    pub fee: Sats,
}

/// Inputs for the payload of a redeem (`callContractWithToken`) call
#[derive(Debug, Clone)]
pub struct RedeemPayloadParams {
    /// Locking script of the Bitcoin address receiving the redeemed funds
    pub locking_script: Vec<u8>,
    pub amount: u128,
    pub custodian_group_uid: String,
}

/// Opaque vault library
pub trait VaultBuilder: Send + Sync {
    /// Build an unsigned staking PSBT spending `params.utxos`
    fn build_staking_psbt(&self, params: &StakingParams) -> Result<UnsignedPsbt, TxError>;

    /// Locking script for a Bitcoin address, in the form the vault expects
    fn locking_script(&self, address: &str, network: BitcoinNetwork) -> Result<Vec<u8>, TxError>;

    /// ABI payload for a redeem call
    fn encode_redeem_payload(&self, params: &RedeemPayloadParams) -> Result<Vec<u8>, TxError>;
}
