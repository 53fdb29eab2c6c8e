//! Submission state machine and pending transaction record

use btc_tx::ToSignInput;
use scalar_core::{Error, ErrorKind, TxId};
use serde::Serialize;
use uuid::Uuid;

use crate::notify::TxNotification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Bridge,
    Transfer,
    Redeem,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Bridge => "bridge",
            FlowKind::Transfer => "transfer",
            FlowKind::Redeem => "redeem",
        }
    }
}

/// Where a submission is. `Confirmed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    BuildingUnsigned,
    AwaitingSignature,
    Broadcasting,
    AwaitingConfirmation,
    Confirmed,
    Failed(ErrorKind),
}

impl SubmissionState {
    fn step(&self) -> u8 {
        match self {
            SubmissionState::Idle => 0,
            SubmissionState::Validating => 1,
            SubmissionState::BuildingUnsigned => 2,
            SubmissionState::AwaitingSignature => 3,
            SubmissionState::Broadcasting => 4,
            SubmissionState::AwaitingConfirmation => 5,
            SubmissionState::Confirmed | SubmissionState::Failed(_) => 6,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Confirmed | SubmissionState::Failed(_))
    }

    /// Forward by exactly one step, or to `Failed` from any non-terminal state
    pub fn can_advance_to(&self, next: SubmissionState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            SubmissionState::Failed(_) => true,
            SubmissionState::Confirmed => *self == SubmissionState::AwaitingConfirmation,
            _ => next.step() == self.step() + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    Built,
    Signed,
    Broadcast,
    Confirmed,
    Failed,
}

/// In-memory record of the transaction a submission produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    /// Unsigned PSBT hex (BTC) or gateway calldata hex (EVM)
    pub unsigned_payload: String,
    pub signing_inputs: Vec<ToSignInput>,
    pub status: PendingStatus,
    pub tx_id: Option<TxId>,
}

impl PendingTransaction {
    pub fn built(unsigned_payload: String, signing_inputs: Vec<ToSignInput>) -> Self {
        Self {
            unsigned_payload,
            signing_inputs,
            status: PendingStatus::Built,
            tx_id: None,
        }
    }

    pub fn mark_signed(&mut self) {
        self.status = PendingStatus::Signed;
    }

    pub fn mark_broadcast(&mut self, tx_id: TxId) {
        self.status = PendingStatus::Broadcast;
        self.tx_id = Some(tx_id);
    }

    pub fn mark_confirmed(&mut self) {
        self.status = PendingStatus::Confirmed;
    }

    pub fn mark_failed(&mut self) {
        self.status = PendingStatus::Failed;
    }
}

/// Outcome of one submission
#[derive(Debug)]
pub struct SubmissionReport {
    pub id: Uuid,
    pub flow: FlowKind,
    pub state: SubmissionState,
    /// Every state entered, starting with `Idle`
    pub history: Vec<SubmissionState>,
    pub tx_id: Option<TxId>,
    pub notification: Option<TxNotification>,
    pub pending: Option<PendingTransaction>,
    pub error: Option<Error>,
}

impl SubmissionReport {
    pub fn is_confirmed(&self) -> bool {
        self.state == SubmissionState::Confirmed
    }

    /// Error kind of a failed submission
    pub fn failure(&self) -> Option<ErrorKind> {
        match self.state {
            SubmissionState::Failed(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<TxId, Error> {
        match (self.error, self.tx_id) {
            (Some(e), _) => Err(e),
            (None, Some(tx_id)) => Ok(tx_id),
            (None, None) => Err(Error::Config(format!(
                "Submission {} finished without a transaction",
                self.id
            ))),
        }
    }
}

/// Mutable progress of a running submission
#[derive(Debug)]
pub(crate) struct Submission {
    pub id: Uuid,
    pub flow: FlowKind,
    pub state: SubmissionState,
    pub history: Vec<SubmissionState>,
    pub pending: Option<PendingTransaction>,
    /// Explorer link, known once a transaction was broadcast
    pub explorer_url: Option<String>,
}

impl Submission {
    pub fn start(flow: FlowKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            flow,
            state: SubmissionState::Idle,
            history: vec![SubmissionState::Idle],
            pending: None,
            explorer_url: None,
        }
    }

    pub fn advance(&mut self, next: SubmissionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "{:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(
            submission = %self.id,
            flow = self.flow.as_str(),
            from = ?self.state,
            to = ?next,
            "Submission state"
        );
        self.state = next;
        self.history.push(next);
    }

    pub fn record_built(&mut self, pending: PendingTransaction) {
        self.pending = Some(pending);
    }

    pub fn record_signed(&mut self) {
        if let Some(pending) = self.pending.as_mut() {
            pending.mark_signed();
        }
    }

    pub fn record_broadcast(&mut self, tx_id: TxId, explorer_url: String) {
        if let Some(pending) = self.pending.as_mut() {
            pending.mark_broadcast(tx_id);
        }
        self.explorer_url = Some(explorer_url);
    }

    pub fn tx_id(&self) -> Option<TxId> {
        self.pending.as_ref().and_then(|p| p.tx_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only() {
        use SubmissionState::*;

        assert!(Idle.can_advance_to(Validating));
        assert!(Validating.can_advance_to(BuildingUnsigned));
        assert!(AwaitingConfirmation.can_advance_to(Confirmed));
        assert!(!Validating.can_advance_to(Broadcasting));
        assert!(!Broadcasting.can_advance_to(Confirmed));
        assert!(!AwaitingSignature.can_advance_to(Validating));
    }

    #[test]
    fn test_failure_from_any_live_state() {
        use SubmissionState::*;

        for state in [Idle, Validating, BuildingUnsigned, AwaitingSignature, Broadcasting] {
            assert!(state.can_advance_to(Failed(ErrorKind::Timeout)));
        }
        assert!(!Confirmed.can_advance_to(Failed(ErrorKind::Timeout)));
        assert!(!Failed(ErrorKind::Timeout).can_advance_to(Validating));
    }

    #[test]
    fn test_pending_lifecycle() {
        let mut sub = Submission::start(FlowKind::Bridge);
        sub.record_built(PendingTransaction::built("70736274ff".into(), Vec::new()));
        sub.record_signed();
        assert_eq!(sub.pending.as_ref().unwrap().status, PendingStatus::Signed);

        sub.record_broadcast(TxId::new("ab"), "https://mempool.space/tx/ab".into());
        assert_eq!(sub.tx_id(), Some(TxId::new("ab")));
        assert_eq!(sub.pending.as_ref().unwrap().status, PendingStatus::Broadcast);
    }

    #[test]
    fn test_report_without_transaction_is_internal() {
        let report = SubmissionReport {
            id: Uuid::new_v4(),
            flow: FlowKind::Transfer,
            state: SubmissionState::Confirmed,
            history: vec![SubmissionState::Idle, SubmissionState::Confirmed],
            tx_id: None,
            notification: None,
            pending: None,
            error: None,
        };

        let err = report.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.surface(), scalar_core::Surface::Toast);
    }
}
