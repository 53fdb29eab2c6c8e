//! Error types for the bridge

use thiserror::Error;

/// Core errors that can occur while orchestrating a bridge action
#[derive(Debug, Error)]
pub enum Error {
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TxError),

    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Wallet extension and session errors
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Wallet extension not found: {wallet}")]
    ExtensionNotFound { wallet: String },

    #[error("Connection rejected: {reason}")]
    ConnectionRejected { reason: String },

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Network {network} is not supported by the wallet")]
    UnsupportedNetwork { network: String },

    #[error("Address {address} is not a supported address type on {network}")]
    InvalidAddressType { address: String, network: String },

    #[error("Signing rejected: {reason}")]
    SigningRejected { reason: String },

    #[error("Signing failed: {message}")]
    SigningFailed { message: String },
}

/// Errors from external HTTP/RPC services
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Service unreachable at {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Broadcast rejected: {message}")]
    BroadcastRejected { message: String },

    #[error("RPC error: {0}")]
    Rpc(String),
}

/// Transaction building errors
#[derive(Debug, Error)]
pub enum TxError {
    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: u128, available: u128 },

    #[error("Failed to build transaction: {message}")]
    BuildFailed { message: String },

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },
}

impl TxError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Flat error taxonomy shared by all layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ExtensionNotFound,
    ConnectionRejected,
    NotConnected,
    UnsupportedNetwork,
    InvalidAddressType,
    SigningRejected,
    SigningFailed,
    BroadcastRejected,
    InsufficientFunds,
    InvalidInput,
    Timeout,
    UpstreamError,
    /// Misconfiguration or a broken internal invariant
    Internal,
}

/// Where an error is shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Inline field message next to the form input
    Inline,
    /// Transient toast notification
    Toast,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Wallet(e) => match e {
                WalletError::ExtensionNotFound { .. } => ErrorKind::ExtensionNotFound,
                WalletError::ConnectionRejected { .. } => ErrorKind::ConnectionRejected,
                WalletError::NotConnected => ErrorKind::NotConnected,
                WalletError::UnsupportedNetwork { .. } => ErrorKind::UnsupportedNetwork,
                WalletError::InvalidAddressType { .. } => ErrorKind::InvalidAddressType,
                WalletError::SigningRejected { .. } => ErrorKind::SigningRejected,
                WalletError::SigningFailed { .. } => ErrorKind::SigningFailed,
            },
            Self::Upstream(UpstreamError::BroadcastRejected { .. }) => ErrorKind::BroadcastRejected,
            Self::Upstream(_) => ErrorKind::UpstreamError,
            Self::Transaction(e) => match e {
                TxError::InvalidInput { .. } => ErrorKind::InvalidInput,
                TxError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
                TxError::BuildFailed { .. } | TxError::Reverted { .. } => ErrorKind::UpstreamError,
            },
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Config(_) => ErrorKind::Internal,
        }
    }

    /// Get a machine-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::ExtensionNotFound => "extension_not_found",
            ErrorKind::ConnectionRejected => "connection_rejected",
            ErrorKind::NotConnected => "not_connected",
            ErrorKind::UnsupportedNetwork => "unsupported_network",
            ErrorKind::InvalidAddressType => "invalid_address_type",
            ErrorKind::SigningRejected => "signing_rejected",
            ErrorKind::SigningFailed => "signing_failed",
            ErrorKind::BroadcastRejected => "broadcast_rejected",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Timeout => "timeout",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// Validation errors are shown inline, everything else as a toast
    pub fn surface(&self) -> Surface {
        match self.kind() {
            ErrorKind::InvalidInput | ErrorKind::InsufficientFunds => Surface::Inline,
            _ => Surface::Toast,
        }
    }

    /// Text shown to the user. Upstream messages are passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Upstream(UpstreamError::BroadcastRejected { message })
            | Self::Upstream(UpstreamError::Http { message, .. })
            | Self::Wallet(WalletError::SigningFailed { message }) => message.clone(),
            Self::Wallet(WalletError::SigningRejected { reason })
            | Self::Wallet(WalletError::ConnectionRejected { reason }) => reason.clone(),
            Self::Transaction(TxError::InvalidInput { message, .. }) => message.clone(),
            other => other.to_string(),
        }
    }
}
