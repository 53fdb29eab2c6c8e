//! Form input and local validation
//!
//! Validation here never touches the network: it checks presence and shape of
//! the fields and, where the wallet balance is already known, the amount.

use btc_tx::is_evm_address;
use scalar_core::{parse_btc, parse_units, Protocol, ProtocolChain, Sats, TxError};

/// BTC amount as typed by the user or already in satoshis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BtcAmount {
    /// Decimal BTC string, e.g. "0.001"
    Btc(String),
    Sats(Sats),
}

impl BtcAmount {
    pub fn to_sats(&self) -> Result<Sats, TxError> {
        match self {
            BtcAmount::Btc(text) => parse_btc(text).map_err(|m| TxError::invalid("amount", m)),
            BtcAmount::Sats(sats) => Ok(*sats),
        }
    }
}

/// BTC -> EVM bridge through the protocol's vault
#[derive(Debug, Clone)]
pub struct BridgeForm {
    pub protocol: Protocol,
    /// Destination chain identifier, e.g. "evm|11155111"
    pub destination_chain: String,
    pub destination_address: String,
    pub amount: BtcAmount,
    /// sat/vB; the explorer's fastest rate when absent
    pub fee_rate: Option<u64>,
    pub rbf: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ValidBridge<'a> {
    pub amount: Sats,
    pub destination: &'a ProtocolChain,
}

impl BridgeForm {
    pub(crate) fn validate(&self) -> Result<ValidBridge<'_>, TxError> {
        let destination = self.protocol.chain(&self.destination_chain).ok_or_else(|| {
            TxError::invalid(
                "destination_chain",
                format!(
                    "{} is not supported by {}",
                    self.destination_chain, self.protocol.name
                ),
            )
        })?;

        require_evm_address("destination_address", &self.destination_address)?;

        let amount = self.amount.to_sats()?;
        if amount == 0 {
            return Err(TxError::invalid("amount", "Amount must be greater than zero"));
        }
        if self.fee_rate == Some(0) {
            return Err(TxError::invalid("fee_rate", "Fee rate must be at least 1 sat/vB"));
        }

        Ok(ValidBridge {
            amount,
            destination,
        })
    }
}

/// Token transfer through the gateway's `sendToken`
#[derive(Debug, Clone)]
pub struct TransferForm {
    /// Chain the tokens are sent from
    pub source_chain_id: u64,
    /// Sending account; selects the cached gateway session
    pub sender: String,
    pub destination_chain: String,
    pub destination_address: String,
    pub symbol: String,
    /// Decimal token amount, scaled by the token's decimals
    pub amount: String,
}

impl TransferForm {
    pub(crate) fn validate(&self) -> Result<(), TxError> {
        require_evm_address("sender", &self.sender)?;
        require_present("destination_chain", &self.destination_chain)?;
        require_present("destination_address", &self.destination_address)?;
        require_present("symbol", &self.symbol)?;
        require_positive_decimal(&self.amount)
    }
}

/// Redeem tokens back to BTC through `callContractWithToken`
#[derive(Debug, Clone)]
pub struct RedeemForm {
    pub source_chain_id: u64,
    pub sender: String,
    pub protocol: Protocol,
    /// Bitcoin chain identifier of the protocol, e.g. "bitcoin|4"
    pub destination_chain: String,
    /// Bitcoin address receiving the redeemed funds
    pub destination_address: String,
    pub amount: String,
}

impl RedeemForm {
    pub(crate) fn validate(&self) -> Result<&ProtocolChain, TxError> {
        require_evm_address("sender", &self.sender)?;
        let destination = self.protocol.chain(&self.destination_chain).ok_or_else(|| {
            TxError::invalid(
                "destination_chain",
                format!("{} has no deployment on {}", self.protocol.name, self.destination_chain),
            )
        })?;
        require_present("destination_address", &self.destination_address)?;
        require_positive_decimal(&self.amount)?;
        Ok(destination)
    }
}

/// Reject an amount above the cached wallet balance
pub(crate) fn check_balance(amount: u128, balance: u128) -> Result<(), TxError> {
    if amount > balance {
        return Err(TxError::InsufficientFunds {
            required: amount,
            available: balance,
        });
    }
    Ok(())
}

fn require_present(field: &str, value: &str) -> Result<(), TxError> {
    if value.trim().is_empty() {
        return Err(TxError::invalid(field, format!("{} is required", field)));
    }
    Ok(())
}

fn require_evm_address(field: &str, value: &str) -> Result<(), TxError> {
    require_present(field, value)?;
    if !is_evm_address(value) {
        return Err(TxError::invalid(
            field,
            "Address must be 0x followed by 40 hex characters",
        ));
    }
    Ok(())
}

/// Decimals are unknown until the token is resolved; 18 is the widest scale
fn require_positive_decimal(amount: &str) -> Result<(), TxError> {
    let units = parse_units(amount, 18).map_err(|m| TxError::invalid("amount", m))?;
    if units == 0 {
        return Err(TxError::invalid("amount", "Amount must be greater than zero"));
    }
    Ok(())
}
