//! bridge: Transaction orchestration for bridge, transfer and redeem
//!
//! Each submission walks the [`SubmissionState`] machine and ends in a
//! [`SubmissionReport`]. Session-wide handles (wallet provider, mempool client,
//! EVM gateways) live in the [`SessionContext`].

mod btc;
mod evm;
pub mod form;
pub mod notify;
pub mod orchestrator;
pub mod session;
pub mod state;

pub use form::{BridgeForm, BtcAmount, RedeemForm, TransferForm};
pub use notify::{NotificationKind, Notifier, TxNotification};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use session::SessionContext;
pub use state::{FlowKind, PendingStatus, PendingTransaction, SubmissionReport, SubmissionState};
