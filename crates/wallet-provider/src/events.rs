//! Account-change event stream
//!
//! Subscribers receive every event emitted after they subscribed. Dropping the
//! [`AccountEvents`] handle unsubscribes.

use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    /// The wallet switched to a different account
    AccountChanged { address: String },
    /// The session was closed, by the user or by a network switch
    Disconnected,
}

/// Sender side, owned by a provider
#[derive(Debug, Clone)]
pub(crate) struct AccountEventHub {
    sender: broadcast::Sender<AccountEvent>,
}

impl AccountEventHub {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn emit(&self, event: AccountEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub(crate) fn subscribe(&self) -> AccountEvents {
        AccountEvents {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receiver side handed to subscribers
#[derive(Debug)]
pub struct AccountEvents {
    receiver: broadcast::Receiver<AccountEvent>,
}

impl AccountEvents {
    /// Wait for the next event. Returns `None` once the provider is gone.
    ///
    /// Lagged subscribers skip the events they missed.
    pub async fn next(&mut self) -> Option<AccountEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Account event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll
    pub fn try_next(&mut self) -> Option<AccountEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
