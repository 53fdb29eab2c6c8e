//! Wallet registry
//!
//! Maps a wallet identifier to a factory so new extensions plug in without the
//! bridge flows knowing about them.

use std::collections::BTreeMap;
use std::sync::Arc;

use scalar_core::{Result, WalletError};

use crate::provider::{MempoolFactory, WalletProvider};
use crate::unisat::{UnisatExtension, UnisatProvider, UNISAT_ID};

/// Builds a fresh provider instance
pub type WalletFactory = Box<dyn Fn() -> Arc<dyn WalletProvider> + Send + Sync>;

#[derive(Default)]
pub struct WalletRegistry {
    factories: BTreeMap<String, WalletFactory>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in wallets ("unisat").
    ///
    /// `extension` is `None` when Unisat is not installed; creating the provider
    /// still succeeds and connecting fails with `ExtensionNotFound`.
    pub fn with_defaults(
        extension: Option<Arc<dyn UnisatExtension>>,
        mempool_factory: MempoolFactory,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(UNISAT_ID, move || {
            Arc::new(UnisatProvider::with_mempool_factory(
                extension.clone(),
                mempool_factory.clone(),
            )) as Arc<dyn WalletProvider>
        });
        registry
    }

    /// Register or replace the factory for `id`
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn WalletProvider> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.factories.insert(id.clone(), Box::new(factory)).is_some() {
            tracing::debug!(wallet = %id, "Replaced wallet factory");
        }
    }

    pub fn create(&self, id: &str) -> Result<Arc<dyn WalletProvider>> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| WalletError::ExtensionNotFound {
                wallet: id.to_string(),
            })?;
        Ok(factory())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
