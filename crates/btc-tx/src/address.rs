//! Address helpers

use std::str::FromStr;

use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, AddressType, Network};
use scalar_core::{BitcoinNetwork, TxError};

/// Map the session network onto rust-bitcoin's network.
///
/// Testnet4 shares the `tb` address prefix with testnet3.
pub fn to_bitcoin_network(network: BitcoinNetwork) -> Network {
    match network {
        BitcoinNetwork::Mainnet => Network::Bitcoin,
        BitcoinNetwork::Testnet | BitcoinNetwork::Testnet4 => Network::Testnet,
        BitcoinNetwork::Regtest => Network::Regtest,
    }
}

/// Parse an address and check it belongs to `network`
pub fn parse_address(address: &str, network: BitcoinNetwork) -> Result<Address, TxError> {
    let unchecked = Address::<NetworkUnchecked>::from_str(address.trim())
        .map_err(|e| TxError::invalid("address", format!("{}: {}", address, e)))?;

    unchecked
        .require_network(to_bitcoin_network(network))
        .map_err(|_| TxError::invalid("address", format!("{} is not a {} address", address, network)))
}

/// Locking script bytes for an address
pub fn script_pubkey_for(address: &str, network: BitcoinNetwork) -> Result<Vec<u8>, TxError> {
    Ok(parse_address(address, network)?.script_pubkey().to_bytes())
}

/// Whether the address can fund vault transactions (native segwit v0 or taproot)
pub fn is_vault_compatible(address: &Address) -> bool {
    matches!(
        address.address_type(),
        Some(AddressType::P2wpkh) | Some(AddressType::P2tr)
    )
}

/// Check for a `0x`-prefixed 20-byte hex address
pub fn is_evm_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}
