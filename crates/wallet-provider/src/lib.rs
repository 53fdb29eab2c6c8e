//! wallet-provider: Capability interface over browser wallet extensions
//!
//! A [`WalletProvider`] owns one wallet session: the connected network, the cached
//! [`WalletInfo`], and the mempool client used for broadcasting. Concrete providers
//! are created through a [`WalletRegistry`] so callers never match on wallet names.

pub mod events;
pub mod provider;
pub mod registry;
pub mod unisat;

pub use events::{AccountEvent, AccountEvents};
pub use provider::{http_mempool_factory, MempoolFactory, WalletInfo, WalletProvider};
pub use registry::{WalletFactory, WalletRegistry};
pub use unisat::{
    unisat_chain, ExtensionBalance, ExtensionError, UnisatExtension, UnisatProvider, UNISAT_ID,
};
