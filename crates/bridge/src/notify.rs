//! User-facing transaction notifications

use std::time::{SystemTime, UNIX_EPOCH};

use scalar_core::{short_tx_id, Error, TxId};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::state::FlowKind;

const NOTIFICATION_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxNotification {
    /// Submission id
    pub id: String,
    pub kind: NotificationKind,
    pub flow: FlowKind,
    /// `first8...last8`
    pub short_tx_id: Option<String>,
    pub explorer_url: Option<String>,
    pub message: String,
    pub timestamp: u64,
}

impl TxNotification {
    pub(crate) fn confirmed(id: String, flow: FlowKind, tx_id: &TxId, explorer_url: String) -> Self {
        Self {
            id,
            kind: NotificationKind::Confirmed,
            flow,
            short_tx_id: Some(tx_id.short()),
            explorer_url: Some(explorer_url),
            message: format!("Transaction {} submitted", tx_id.short()),
            timestamp: now_secs(),
        }
    }

    /// `tx_id` is set when the failure happened after broadcast
    pub(crate) fn failed(
        id: String,
        flow: FlowKind,
        error: &Error,
        tx_id: Option<&TxId>,
        explorer_url: Option<String>,
    ) -> Self {
        Self {
            id,
            kind: NotificationKind::Failed,
            flow,
            short_tx_id: tx_id.map(|t| short_tx_id(t.as_str())),
            explorer_url,
            message: error.user_message(),
            timestamp: now_secs(),
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Fan-out of notifications to any number of listeners
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<TxNotification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TxNotification> {
        self.sender.subscribe()
    }

    pub(crate) fn emit(&self, notification: &TxNotification) {
        tracing::info!(
            submission = %notification.id,
            kind = ?notification.kind,
            tx = notification.short_tx_id.as_deref().unwrap_or("-"),
            "{}",
            notification.message
        );
        let _ = self.sender.send(notification.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalar_core::UpstreamError;

    #[test]
    fn test_confirmed_notification() {
        let txid = TxId::new("4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b");
        let n = TxNotification::confirmed(
            "sub-1".into(),
            FlowKind::Bridge,
            &txid,
            "https://mempool.space/testnet4/tx/4a5e".into(),
        );
        assert_eq!(n.short_tx_id.as_deref(), Some("4a5e1e4b...fdeda33b"));
        assert_eq!(n.kind, NotificationKind::Confirmed);
    }

    #[test]
    fn test_failed_carries_upstream_text() {
        let err: Error = UpstreamError::BroadcastRejected {
            message: "min relay fee not met".into(),
        }
        .into();
        let n = TxNotification::failed("sub-2".into(), FlowKind::Bridge, &err, None, None);
        assert_eq!(n.message, "min relay fee not met");
        assert!(n.short_tx_id.is_none());
    }

    #[tokio::test]
    async fn test_subscribers_receive() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        let err = Error::Config("x".into());
        notifier.emit(&TxNotification::failed(
            "sub-3".into(),
            FlowKind::Transfer,
            &err,
            None,
            None,
        ));
        assert_eq!(rx.recv().await.unwrap().id, "sub-3");
    }
}
