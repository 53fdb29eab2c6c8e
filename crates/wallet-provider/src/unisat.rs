//! Unisat wallet provider
//!
//! The injected `window.unisat` object is reached through [`UnisatExtension`];
//! the browser binding lives outside this crate.

use std::sync::Arc;

use async_trait::async_trait;
use btc_tx::{is_vault_compatible, parse_address, SignPsbtOptions};
use mempool_client::MempoolApi;
use scalar_core::{BitcoinNetwork, Error, NetworkConfig, Result, WalletError};
use serde::Deserialize;
use thiserror::Error as ThisError;
use tokio::sync::RwLock;

use crate::events::{AccountEvent, AccountEventHub, AccountEvents};
use crate::provider::{http_mempool_factory, MempoolFactory, WalletInfo, WalletProvider};

pub const UNISAT_ID: &str = "unisat";

/// Error object thrown by the extension
#[derive(Debug, Clone, ThisError)]
#[error("{message} (code {code})")]
pub struct ExtensionError {
    pub code: i64,
    pub message: String,
}

impl ExtensionError {
    /// EIP-1193 style "user rejected the request"
    pub const USER_REJECTED: i64 = 4001;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == Self::USER_REJECTED
    }
}

/// `unisat.getBalance()` result
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ExtensionBalance {
    pub confirmed: u64,
    pub unconfirmed: u64,
    pub total: u64,
}

/// Method surface of the injected Unisat object
#[async_trait]
pub trait UnisatExtension: Send + Sync {
    async fn request_accounts(&self) -> std::result::Result<Vec<String>, ExtensionError>;

    async fn get_accounts(&self) -> std::result::Result<Vec<String>, ExtensionError>;

    async fn get_public_key(&self) -> std::result::Result<String, ExtensionError>;

    async fn get_balance(&self) -> std::result::Result<ExtensionBalance, ExtensionError>;

    /// Current chain enum, e.g. "BITCOIN_TESTNET4"
    async fn get_chain(&self) -> std::result::Result<String, ExtensionError>;

    async fn switch_chain(&self, chain: &str) -> std::result::Result<String, ExtensionError>;

    async fn sign_psbt(
        &self,
        psbt_hex: &str,
        options: &SignPsbtOptions,
    ) -> std::result::Result<String, ExtensionError>;

    async fn sign_psbts(
        &self,
        psbt_hexes: &[String],
        options: &[SignPsbtOptions],
    ) -> std::result::Result<Vec<String>, ExtensionError>;

    /// `kind` is "ecdsa" or "bip322-simple"
    async fn sign_message(
        &self,
        message: &str,
        kind: &str,
    ) -> std::result::Result<String, ExtensionError>;
}

/// Unisat chain enum for a network. Unisat has no regtest support.
pub fn unisat_chain(network: BitcoinNetwork) -> Option<&'static str> {
    match network {
        BitcoinNetwork::Mainnet => Some("BITCOIN_MAINNET"),
        BitcoinNetwork::Testnet => Some("BITCOIN_TESTNET"),
        BitcoinNetwork::Testnet4 => Some("BITCOIN_TESTNET4"),
        BitcoinNetwork::Regtest => None,
    }
}

struct Session {
    network: NetworkConfig,
    info: WalletInfo,
    mempool: Arc<dyn MempoolApi>,
}

/// [`WalletProvider`] backed by the Unisat browser extension
pub struct UnisatProvider {
    extension: Option<Arc<dyn UnisatExtension>>,
    mempool_factory: MempoolFactory,
    session: RwLock<Option<Arc<Session>>>,
    events: AccountEventHub,
}

impl UnisatProvider {
    /// `extension` is `None` when the extension is not installed
    pub fn new(extension: Option<Arc<dyn UnisatExtension>>) -> Self {
        Self::with_mempool_factory(extension, http_mempool_factory())
    }

    pub fn with_mempool_factory(
        extension: Option<Arc<dyn UnisatExtension>>,
        mempool_factory: MempoolFactory,
    ) -> Self {
        Self {
            extension,
            mempool_factory,
            session: RwLock::new(None),
            events: AccountEventHub::new(),
        }
    }

    fn extension(&self) -> Result<&Arc<dyn UnisatExtension>> {
        self.extension.as_ref().ok_or_else(|| {
            WalletError::ExtensionNotFound {
                wallet: UNISAT_ID.to_string(),
            }
            .into()
        })
    }

    async fn session(&self) -> Result<Arc<Session>> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| WalletError::NotConnected.into())
    }

    /// Read pubkey and balance for `address` and check the address can fund the vault
    async fn load_info(
        &self,
        extension: &Arc<dyn UnisatExtension>,
        address: String,
        network: &NetworkConfig,
    ) -> Result<WalletInfo> {
        let invalid_type = || WalletError::InvalidAddressType {
            address: address.clone(),
            network: network.network.to_string(),
        };
        let parsed = parse_address(&address, network.network).map_err(|_| invalid_type())?;
        if !is_vault_compatible(&parsed) {
            return Err(invalid_type().into());
        }

        let public_key_hex = extension
            .get_public_key()
            .await
            .map_err(connection_error)?;
        let balance = extension.get_balance().await.map_err(connection_error)?;

        Ok(WalletInfo {
            address,
            public_key_hex,
            balance_sats: balance.confirmed,
        })
    }
}

/// First account the site is already authorized for. Reading it opens no dialog.
async fn authorized_account(extension: &dyn UnisatExtension) -> Option<String> {
    match extension.get_accounts().await {
        Ok(accounts) => accounts.into_iter().next(),
        Err(e) => {
            tracing::debug!(error = %e, "Authorized accounts unavailable");
            None
        }
    }
}

fn connection_error(e: ExtensionError) -> Error {
    WalletError::ConnectionRejected { reason: e.message }.into()
}

fn signing_error(e: ExtensionError) -> Error {
    if e.is_user_rejection() {
        WalletError::SigningRejected { reason: e.message }.into()
    } else {
        WalletError::SigningFailed { message: e.message }.into()
    }
}

#[async_trait]
impl WalletProvider for UnisatProvider {
    fn id(&self) -> &'static str {
        UNISAT_ID
    }

    async fn connect_wallet(&self, network: &NetworkConfig) -> Result<WalletInfo> {
        let extension = self.extension()?;

        let chain = unisat_chain(network.network).ok_or_else(|| WalletError::UnsupportedNetwork {
            network: network.network.to_string(),
        })?;

        let current_chain = extension.get_chain().await.map_err(connection_error)?;
        if current_chain != chain {
            tracing::debug!(from = %current_chain, to = chain, "Switching Unisat chain");
            extension.switch_chain(chain).await.map_err(|e| {
                if e.is_user_rejection() {
                    connection_error(e)
                } else {
                    WalletError::UnsupportedNetwork {
                        network: network.network.to_string(),
                    }
                    .into()
                }
            })?;
        }

        let address = match authorized_account(&**extension).await {
            Some(address) => address,
            None => extension
                .request_accounts()
                .await
                .map_err(connection_error)?
                .into_iter()
                .next()
                .ok_or_else(|| WalletError::ConnectionRejected {
                    reason: "Wallet returned no accounts".to_string(),
                })?,
        };

        let info = self.load_info(extension, address, network).await?;
        let mempool = (self.mempool_factory)(network)?;

        *self.session.write().await = Some(Arc::new(Session {
            network: network.clone(),
            info: info.clone(),
            mempool,
        }));

        tracing::info!(
            address = %info.address,
            network = %network.network,
            "Unisat wallet connected"
        );
        self.events.emit(AccountEvent::AccountChanged {
            address: info.address.clone(),
        });

        Ok(info)
    }

    async fn wallet_info(&self) -> Option<WalletInfo> {
        self.session.read().await.as_ref().map(|s| s.info.clone())
    }

    async fn network(&self) -> Result<NetworkConfig> {
        Ok(self.session().await?.network.clone())
    }

    async fn sign_psbt(&self, psbt_hex: &str, options: &SignPsbtOptions) -> Result<String> {
        self.session().await?;
        let extension = self.extension()?;
        extension
            .sign_psbt(psbt_hex, options)
            .await
            .map_err(signing_error)
    }

    async fn sign_psbts(
        &self,
        psbt_hexes: &[String],
        options: &SignPsbtOptions,
    ) -> Result<Vec<String>> {
        self.session().await?;
        let extension = self.extension()?;
        let per_psbt = vec![options.clone(); psbt_hexes.len()];
        extension
            .sign_psbts(psbt_hexes, &per_psbt)
            .await
            .map_err(signing_error)
    }

    async fn sign_message(&self, message: &str) -> Result<String> {
        self.session().await?;
        let extension = self.extension()?;
        extension
            .sign_message(message, "bip322-simple")
            .await
            .map_err(signing_error)
    }

    async fn push_tx(&self, tx_hex: &str) -> Result<String> {
        let session = self.session().await?;
        Ok(session.mempool.push_tx(tx_hex).await?)
    }

    async fn disconnect(&self) {
        let previous = self.session.write().await.take();
        if let Some(session) = previous {
            tracing::info!(address = %session.info.address, "Unisat wallet disconnected");
            self.events.emit(AccountEvent::Disconnected);
        }
    }

    fn subscribe(&self) -> AccountEvents {
        self.events.subscribe()
    }

    async fn handle_accounts_changed(&self, accounts: Vec<String>) -> Result<()> {
        let Some(address) = accounts.into_iter().next() else {
            self.disconnect().await;
            return Ok(());
        };

        let current = self.session().await?;
        if current.info.address == address {
            return Ok(());
        }

        let extension = self.extension()?;
        let info = self.load_info(extension, address, &current.network).await?;
        tracing::info!(address = %info.address, "Unisat account changed");

        let replacement = Arc::new(Session {
            network: current.network.clone(),
            info: info.clone(),
            mempool: current.mempool.clone(),
        });
        *self.session.write().await = Some(replacement);

        self.events.emit(AccountEvent::AccountChanged {
            address: info.address,
        });
        Ok(())
    }
}
