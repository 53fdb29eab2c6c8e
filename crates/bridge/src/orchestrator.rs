//! Submission orchestration shared by the BTC and EVM flows

use std::sync::Arc;
use std::time::Duration;

use btc_tx::VaultBuilder;
use evm_gateway::{wait_for_receipt, GatewayClient, TxHash, RECEIPT_POLL_INTERVAL};
use scalar_api::{poll_json, CrossChainTx, PollConfig, ResourceFetcher};
use scalar_core::{Error, Result, Surface, TxId};
use tokio::sync::broadcast;

use crate::notify::{Notifier, TxNotification};
use crate::session::SessionContext;
use crate::state::{Submission, SubmissionReport, SubmissionState};

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// How long an EVM submission waits for its receipt
    pub confirmation_timeout: Duration,
    pub receipt_interval: Duration,
    /// Polling of asynchronously processed cross-chain commands
    pub poll: PollConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(60),
            receipt_interval: RECEIPT_POLL_INTERVAL,
            poll: PollConfig::default(),
        }
    }
}

/// Successful end of a flow
pub(crate) struct Confirmation {
    pub tx_id: TxId,
    pub explorer_url: String,
}

pub struct Orchestrator {
    pub(crate) session: SessionContext,
    pub(crate) vault: Arc<dyn VaultBuilder>,
    pub(crate) config: OrchestratorConfig,
    notifier: Notifier,
}

impl Orchestrator {
    pub fn new(session: SessionContext, vault: Arc<dyn VaultBuilder>) -> Self {
        Self {
            session,
            vault,
            config: OrchestratorConfig::default(),
            notifier: Notifier::new(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TxNotification> {
        self.notifier.subscribe()
    }

    /// Wait until the Scalar API reports a final status for command `id`
    pub async fn await_command(&self, id: &str) -> Result<CrossChainTx> {
        let commands = self.session.scalar().resource("command");
        self.await_command_with(&commands, id).await
    }

    pub async fn await_command_with<F>(&self, fetcher: &F, id: &str) -> Result<CrossChainTx>
    where
        F: ResourceFetcher + ?Sized,
    {
        poll_json(
            fetcher,
            id,
            |tx: &CrossChainTx| tx.status.is_final(),
            &self.config.poll,
        )
        .await
    }

    /// Race the receipt against the confirmation timeout.
    ///
    /// A timeout only stops waiting; the transaction may still be mined later.
    pub(crate) async fn await_receipt(&self, gateway: &dyn GatewayClient, tx_hash: TxHash) -> Result<()> {
        let wait = wait_for_receipt(gateway, tx_hash, self.config.receipt_interval);
        match tokio::time::timeout(self.config.confirmation_timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(tx_hash = %tx_hash, "Gave up waiting for confirmation");
                Err(Error::Timeout {
                    operation: format!("Confirmation of {}", tx_hash),
                    after_ms: self.config.confirmation_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Move a submission to its terminal state and notify
    pub(crate) fn finish(
        &self,
        mut sub: Submission,
        outcome: Result<Confirmation>,
    ) -> SubmissionReport {
        let id = sub.id.to_string();

        let (notification, error) = match outcome {
            Ok(confirmation) => {
                sub.advance(SubmissionState::Confirmed);
                if let Some(pending) = sub.pending.as_mut() {
                    pending.mark_confirmed();
                }
                let notification = TxNotification::confirmed(
                    id,
                    sub.flow,
                    &confirmation.tx_id,
                    confirmation.explorer_url,
                );
                (Some(notification), None)
            }
            Err(e) => {
                tracing::warn!(
                    submission = %sub.id,
                    flow = sub.flow.as_str(),
                    at = ?sub.state,
                    error_code = e.error_code(),
                    error = %e,
                    "Submission failed"
                );
                sub.advance(SubmissionState::Failed(e.kind()));
                if let Some(pending) = sub.pending.as_mut() {
                    pending.mark_failed();
                }
                // Inline errors belong to the form, not a toast
                let notification = (e.surface() == Surface::Toast).then(|| {
                    TxNotification::failed(
                        id,
                        sub.flow,
                        &e,
                        sub.tx_id().as_ref(),
                        sub.explorer_url.clone(),
                    )
                });
                (notification, Some(e))
            }
        };

        if let Some(notification) = &notification {
            self.notifier.emit(notification);
        }

        SubmissionReport {
            id: sub.id,
            flow: sub.flow,
            state: sub.state,
            tx_id: sub.tx_id(),
            history: sub.history,
            notification,
            pending: sub.pending,
            error,
        }
    }
}
