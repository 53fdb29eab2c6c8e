//! Session context shared by every submission
//!
//! Each slot holds a complete value that is replaced wholesale. Switching the
//! Bitcoin network rebuilds the mempool client and closes the wallet session.
//! The provider instance lives until a different wallet is selected, so
//! account-event subscribers survive reconnects.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::EthereumWallet;
use evm_gateway::{AlloyGateway, GatewayClient};
use mempool_client::MempoolApi;
use scalar_api::ScalarClient;
use scalar_core::{AppConfig, BitcoinNetwork, Error, NetworkConfig, Result, WalletError};
use tokio::sync::RwLock;
use wallet_provider::{
    AccountEvents, MempoolFactory, WalletInfo, WalletProvider, WalletRegistry, UNISAT_ID,
};

/// Gateway cache key: lowercase signer address and chain id
type GatewayKey = (String, u64);

#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: AppConfig,
    registry: WalletRegistry,
    mempool_factory: MempoolFactory,
    scalar: ScalarClient,
    network: RwLock<NetworkConfig>,
    wallet_id: RwLock<String>,
    wallet: RwLock<Option<Arc<dyn WalletProvider>>>,
    mempool: RwLock<Option<Arc<dyn MempoolApi>>>,
    gateways: RwLock<HashMap<GatewayKey, Arc<dyn GatewayClient>>>,
}

impl SessionContext {
    pub fn new(
        config: AppConfig,
        registry: WalletRegistry,
        mempool_factory: MempoolFactory,
    ) -> Result<Self> {
        let scalar = ScalarClient::with_timeout(
            config.scalar_api_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        let network = config.network_config();

        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                registry,
                mempool_factory,
                scalar,
                network: RwLock::new(network),
                wallet_id: RwLock::new(UNISAT_ID.to_string()),
                wallet: RwLock::new(None),
                mempool: RwLock::new(None),
                gateways: RwLock::new(HashMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn scalar(&self) -> &ScalarClient {
        &self.inner.scalar
    }

    pub async fn network(&self) -> NetworkConfig {
        self.inner.network.read().await.clone()
    }

    /// Switch the Bitcoin network. The wallet must reconnect afterwards.
    pub async fn switch_network(&self, network: BitcoinNetwork) {
        let config = if network == self.inner.config.network {
            self.inner.config.network_config()
        } else {
            NetworkConfig::for_network(network)
        };
        tracing::info!(network = %network, mempool = %config.mempool_api_url, "Switching network");

        *self.inner.network.write().await = config;
        *self.inner.mempool.write().await = None;
        self.disconnect_wallet().await;
    }

    /// Mempool client for the current network, built on first use
    pub async fn mempool(&self) -> Result<Arc<dyn MempoolApi>> {
        if let Some(client) = self.inner.mempool.read().await.clone() {
            return Ok(client);
        }

        let network = self.network().await;
        let client = (self.inner.mempool_factory)(&network)?;
        tracing::debug!(url = %network.mempool_api_url, "Created mempool client");

        let mut slot = self.inner.mempool.write().await;
        // Another task may have filled the slot meanwhile
        Ok(slot.get_or_insert(client).clone())
    }

    /// Choose which registered wallet the next connect uses
    pub async fn select_wallet(&self, id: &str) -> Result<()> {
        if !self.inner.registry.contains(id) {
            return Err(WalletError::ExtensionNotFound {
                wallet: id.to_string(),
            }
            .into());
        }

        let mut selected = self.inner.wallet_id.write().await;
        if *selected == id {
            return Ok(());
        }
        *selected = id.to_string();
        drop(selected);

        let previous = self.inner.wallet.write().await.take();
        if let Some(provider) = previous {
            provider.disconnect().await;
        }
        Ok(())
    }

    /// Connect the selected wallet on the current network
    pub async fn connect_wallet(&self) -> Result<WalletInfo> {
        let (_, info) = self.connect_provider().await?;
        Ok(info)
    }

    /// Provider for the selected wallet, created on first use
    async fn provider(&self) -> Result<Arc<dyn WalletProvider>> {
        if let Some(provider) = self.inner.wallet.read().await.clone() {
            return Ok(provider);
        }

        let id = self.inner.wallet_id.read().await.clone();
        let provider = self.inner.registry.create(&id)?;
        let mut slot = self.inner.wallet.write().await;
        Ok(slot.get_or_insert(provider).clone())
    }

    async fn connect_provider(&self) -> Result<(Arc<dyn WalletProvider>, WalletInfo)> {
        let provider = self.provider().await?;
        let network = self.network().await;
        let info = provider.connect_wallet(&network).await?;
        Ok((provider, info))
    }

    /// The connected wallet, connecting first when there is no live session
    pub async fn connected_wallet(&self) -> Result<(Arc<dyn WalletProvider>, WalletInfo)> {
        let current = self.inner.wallet.read().await.clone();
        if let Some(provider) = current {
            if let Some(info) = provider.wallet_info().await {
                return Ok((provider, info));
            }
        }
        self.connect_provider().await
    }

    /// Provider for the selected wallet, connected or not
    pub async fn wallet(&self) -> Option<Arc<dyn WalletProvider>> {
        self.inner.wallet.read().await.clone()
    }

    /// Account details while a wallet session is live
    pub async fn wallet_info(&self) -> Option<WalletInfo> {
        let provider = self.wallet().await?;
        provider.wallet_info().await
    }

    /// Account events of the selected wallet. The stream survives reconnects
    /// and network switches until another wallet is selected.
    pub async fn subscribe_account_events(&self) -> Result<AccountEvents> {
        Ok(self.provider().await?.subscribe())
    }

    /// Forward an `accountsChanged` notification to the selected wallet
    pub async fn handle_accounts_changed(&self, accounts: Vec<String>) -> Result<()> {
        match self.wallet().await {
            Some(provider) => provider.handle_accounts_changed(accounts).await,
            None => Err(WalletError::NotConnected.into()),
        }
    }

    /// Close the wallet session. The provider stays selected.
    pub async fn disconnect_wallet(&self) {
        if let Some(provider) = self.wallet().await {
            provider.disconnect().await;
        }
    }

    /// Cache a gateway session under its signer and chain
    pub async fn register_gateway(&self, gateway: Arc<dyn GatewayClient>) {
        let key = gateway_key(&gateway.signer_address().to_string(), gateway.chain().chain_id);
        tracing::debug!(signer = %key.0, chain_id = key.1, "Registered gateway session");
        self.inner.gateways.write().await.insert(key, gateway);
    }

    pub async fn gateway(&self, address: &str, chain_id: u64) -> Option<Arc<dyn GatewayClient>> {
        self.inner
            .gateways
            .read()
            .await
            .get(&gateway_key(address, chain_id))
            .cloned()
    }

    /// Connect a JSON-RPC gateway for a configured chain and cache it
    pub async fn connect_gateway(
        &self,
        chain_id: u64,
        wallet: EthereumWallet,
    ) -> Result<Arc<dyn GatewayClient>> {
        let chain = self
            .inner
            .config
            .evm_chain(chain_id)
            .cloned()
            .ok_or_else(|| Error::Config(format!("EVM chain {} is not configured", chain_id)))?;

        let gateway: Arc<dyn GatewayClient> = Arc::new(AlloyGateway::connect(chain, wallet).await?);
        self.register_gateway(gateway.clone()).await;
        Ok(gateway)
    }
}

fn gateway_key(address: &str, chain_id: u64) -> GatewayKey {
    (address.to_lowercase(), chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::tests::{FakeGateway, Fixture};
    use scalar_core::ErrorKind;
    use std::sync::atomic::Ordering;
    use wallet_provider::AccountEvent;

    const TAPROOT: &str = "tb1pqqqqp399et2xygdj5xreqhjjvcmzhxw4aywxecjdzew6hylgvsesf3hn0c";

    #[tokio::test]
    async fn test_mempool_is_cached_until_network_switch() {
        let fx = Fixture::new();
        let first = fx.session.mempool().await.unwrap();
        let _ = fx.session.mempool().await.unwrap();
        assert_eq!(fx.factory_calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.network().network, BitcoinNetwork::Testnet4);

        fx.session.switch_network(BitcoinNetwork::Testnet).await;
        let second = fx.session.mempool().await.unwrap();
        assert_eq!(fx.factory_calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.network().network, BitcoinNetwork::Testnet);
    }

    #[tokio::test]
    async fn test_network_switch_drops_wallet() {
        let fx = Fixture::new();
        fx.session.connect_wallet().await.unwrap();
        assert!(fx.session.wallet_info().await.is_some());

        fx.session.switch_network(BitcoinNetwork::Mainnet).await;
        assert!(fx.session.wallet_info().await.is_none());
        assert_eq!(fx.session.network().await.network, BitcoinNetwork::Mainnet);
    }

    #[tokio::test]
    async fn test_account_events_survive_reconnect() {
        let fx = Fixture::new();
        let mut events = fx.session.subscribe_account_events().await.unwrap();
        let (first, _) = fx.session.connected_wallet().await.unwrap();

        fx.session.switch_network(BitcoinNetwork::Testnet).await;
        let (second, _) = fx.session.connected_wallet().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        fx.session
            .handle_accounts_changed(vec![TAPROOT.to_string()])
            .await
            .unwrap();
        assert_eq!(fx.session.wallet_info().await.unwrap().address, TAPROOT);

        let mut received = Vec::new();
        while let Some(event) = events.try_next() {
            received.push(event);
        }
        assert_eq!(
            received.last(),
            Some(&AccountEvent::AccountChanged {
                address: TAPROOT.to_string()
            })
        );
        assert!(received.contains(&AccountEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_accounts_changed_without_wallet() {
        let fx = Fixture::new();
        let err = fx
            .session
            .handle_accounts_changed(vec![TAPROOT.to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
    }

    #[tokio::test]
    async fn test_connected_wallet_reuses_session() {
        let fx = Fixture::new();
        let (first, _) = fx.session.connected_wallet().await.unwrap();
        let (second, _) = fx.session.connected_wallet().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_select_unknown_wallet() {
        let fx = Fixture::new();
        let err = fx.session.select_wallet("leather").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExtensionNotFound);
    }

    #[tokio::test]
    async fn test_gateway_cache_keyed_by_address_and_chain() {
        let fx = Fixture::new();
        let gateway = Arc::new(FakeGateway::new());
        let signer = gateway.signer_address().to_string();
        fx.session.register_gateway(gateway).await;

        assert!(fx
            .session
            .gateway(&signer.to_lowercase(), 11155111)
            .await
            .is_some());
        assert!(fx.session.gateway(&signer, 1).await.is_none());
        assert!(fx
            .session
            .gateway("0x9999999999999999999999999999999999999999", 11155111)
            .await
            .is_none());
    }
}
