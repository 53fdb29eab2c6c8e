//! Scalar bridge application library

use std::sync::Arc;

use anyhow::Context;
use bridge::{Orchestrator, SessionContext};
use btc_tx::VaultBuilder;
use scalar_core::AppConfig;
use wallet_provider::{http_mempool_factory, UnisatExtension, WalletRegistry};

pub use bridge;
pub use scalar_core;

/// Workspace crates logged at debug level unless `RUST_LOG` says otherwise
const DEBUG_TARGETS: &[&str] = &[
    "scalar_bridge_lib",
    "scalar_core",
    "scalar_api",
    "mempool_client",
    "btc_tx",
    "wallet_provider",
    "evm_gateway",
    "bridge",
];

fn default_filter() -> anyhow::Result<tracing_subscriber::EnvFilter> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for target in DEBUG_TARGETS {
        filter = filter.add_directive(format!("{}=debug", target).parse()?);
    }
    Ok(filter.add_directive("info".parse()?))
}

/// Install the global tracing subscriber. Later calls are no-ops.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter = default_filter()?;

    // A subscriber installed by the host wins
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    Ok(())
}

/// Wire the orchestrator from environment configuration
pub fn bootstrap(
    extension: Option<Arc<dyn UnisatExtension>>,
    vault: Arc<dyn VaultBuilder>,
) -> anyhow::Result<Orchestrator> {
    let config = AppConfig::from_env().context("Failed to read configuration")?;
    bootstrap_with_config(config, extension, vault)
}

pub fn bootstrap_with_config(
    config: AppConfig,
    extension: Option<Arc<dyn UnisatExtension>>,
    vault: Arc<dyn VaultBuilder>,
) -> anyhow::Result<Orchestrator> {
    tracing::info!(
        network = %config.network,
        scalar_api = %config.scalar_api_url,
        evm_chains = config.evm_chains.len(),
        "Starting Scalar bridge"
    );

    let mempool_factory = http_mempool_factory();
    let registry = WalletRegistry::with_defaults(extension, mempool_factory.clone());
    let session = SessionContext::new(config, registry, mempool_factory)
        .context("Failed to create session")?;

    Ok(Orchestrator::new(session, vault))
}
