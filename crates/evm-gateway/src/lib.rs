//! evm-gateway: Scalar gateway contract and ERC-20 calls
//!
//! [`GatewayClient`] is the seam the bridge flows use; [`AlloyGateway`] implements
//! it over JSON-RPC with a local signer.

pub mod abi;
pub mod client;
pub mod gateway;

pub use alloy::primitives::{Address, Bytes, TxHash, U256};
pub use client::AlloyGateway;
pub use gateway::{wait_for_receipt, GatewayClient, RECEIPT_POLL_INTERVAL};
