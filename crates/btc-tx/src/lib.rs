//! btc-tx: Transaction building utilities for Bitcoin
//!
//! UTXO selection, custodian key preparation, PSBT signing metadata, and the
//! interface to the external vault library that assembles staking PSBTs.

pub mod address;
pub mod custodians;
pub mod psbt;
pub mod utxo_selector;
pub mod vault;

pub use address::{
    is_evm_address, is_vault_compatible, parse_address, script_pubkey_for, to_bitcoin_network,
};
pub use custodians::{prepare_custodian_pubkeys, CustodianKeys};
pub use psbt::{
    decode_psbt, extract_signed_tx_hex, signing_inputs, SignPsbtOptions, ToSignInput,
};
pub use utxo_selector::{require_utxos, select_utxos, staking_target, Selection};
pub use vault::{RedeemPayloadParams, StakingParams, UnsignedPsbt, VaultBuilder};
