//! The wallet provider capability interface

use std::sync::Arc;

use async_trait::async_trait;
use btc_tx::SignPsbtOptions;
use mempool_client::{MempoolApi, MempoolClient};
use scalar_core::{NetworkConfig, Result, WalletError};
use serde::Serialize;

use crate::events::AccountEvents;

/// Snapshot of a connected wallet. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub address: String,
    pub public_key_hex: String,
    pub balance_sats: u64,
}

/// Builds the explorer client a provider broadcasts through
pub type MempoolFactory =
    Arc<dyn Fn(&NetworkConfig) -> Result<Arc<dyn MempoolApi>> + Send + Sync>;

/// Default factory: a real HTTP client for the network's explorer
pub fn http_mempool_factory() -> MempoolFactory {
    Arc::new(|network: &NetworkConfig| -> Result<Arc<dyn MempoolApi>> {
        let client = MempoolClient::new(network.clone())?;
        Ok(Arc::new(client) as Arc<dyn MempoolApi>)
    })
}

/// Operations every supported wallet extension offers.
///
/// Every call may open an approval dialog in the extension and can only be
/// cancelled by the user there.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Registry identifier (e.g. "unisat")
    fn id(&self) -> &'static str;

    /// Connect on `network`, replacing any previous session
    async fn connect_wallet(&self, network: &NetworkConfig) -> Result<WalletInfo>;

    /// Cached session info, if connected
    async fn wallet_info(&self) -> Option<WalletInfo>;

    /// Network of the current session
    async fn network(&self) -> Result<NetworkConfig>;

    async fn address(&self) -> Result<String> {
        Ok(self.require_info().await?.address)
    }

    async fn public_key_hex(&self) -> Result<String> {
        Ok(self.require_info().await?.public_key_hex)
    }

    async fn balance(&self) -> Result<u64> {
        Ok(self.require_info().await?.balance_sats)
    }

    async fn sign_psbt(&self, psbt_hex: &str, options: &SignPsbtOptions) -> Result<String>;

    async fn sign_psbts(
        &self,
        psbt_hexes: &[String],
        options: &SignPsbtOptions,
    ) -> Result<Vec<String>>;

    /// BIP-322-simple message signature
    async fn sign_message(&self, message: &str) -> Result<String>;

    /// Broadcast through the session network's explorer
    async fn push_tx(&self, tx_hex: &str) -> Result<String>;

    /// Drop the session. Safe to call when not connected.
    async fn disconnect(&self);

    fn subscribe(&self) -> AccountEvents;

    /// Apply an `accountsChanged` notification from the extension.
    ///
    /// An empty list means the user locked or disconnected the wallet.
    async fn handle_accounts_changed(&self, accounts: Vec<String>) -> Result<()>;

    async fn require_info(&self) -> Result<WalletInfo> {
        self.wallet_info()
            .await
            .ok_or_else(|| WalletError::NotConnected.into())
    }
}
