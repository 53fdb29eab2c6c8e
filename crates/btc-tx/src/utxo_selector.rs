//! UTXO selection
//!
//! Largest-first greedy selection over confirmed outputs. Fewer inputs keep the
//! transaction small; no consolidation is attempted.

use scalar_core::{Sats, TxError, Utxo};

/// Rough virtual size of a staking transaction, used to reserve fee headroom
/// before the vault library computes the exact fee.
pub const STAKING_VSIZE_ESTIMATE: u64 = 250;

/// Result of UTXO selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub utxos: Vec<Utxo>,
    pub total: Sats,
}

impl Selection {
    /// Value left over after paying `target`
    pub fn change(&self, target: Sats) -> Sats {
        self.total.saturating_sub(target)
    }
}

/// Confirmed UTXOs ordered by value descending, then txid descending
pub fn sort_spendable(utxos: &[Utxo]) -> Vec<Utxo> {
    let mut spendable: Vec<Utxo> = utxos.iter().filter(|u| u.confirmed).cloned().collect();
    spendable.sort_by(|a, b| {
        b.value
            .cmp(&a.value)
            .then_with(|| b.txid.cmp(&a.txid))
            .then_with(|| b.vout.cmp(&a.vout))
    });
    spendable
}

/// Select the shortest largest-first prefix whose total strictly exceeds `target`.
///
/// Returns `None` when even the full confirmed set does not exceed the target;
/// an under-funded subset is never returned.
pub fn select_utxos(utxos: &[Utxo], target: Sats) -> Option<Selection> {
    let mut selected = Vec::new();
    let mut total: Sats = 0;

    for utxo in sort_spendable(utxos) {
        if total > target {
            break;
        }
        total = total.saturating_add(utxo.value);
        selected.push(utxo);
    }

    if total > target {
        Some(Selection {
            utxos: selected,
            total,
        })
    } else {
        None
    }
}

/// Like [`select_utxos`] but reports the shortfall as `InsufficientFunds`
pub fn require_utxos(utxos: &[Utxo], target: Sats) -> Result<Selection, TxError> {
    select_utxos(utxos, target).ok_or_else(|| {
        let available: Sats = utxos
            .iter()
            .filter(|u| u.confirmed)
            .map(|u| u.value)
            .fold(0, Sats::saturating_add);
        tracing::debug!(target, available, "UTXO selection failed");
        TxError::InsufficientFunds {
            required: target as u128,
            available: available as u128,
        }
    })
}

/// Amount the selection must exceed for a staking transfer at `fee_rate` sat/vB
pub fn staking_target(amount: Sats, fee_rate: u64) -> Sats {
    amount.saturating_add(fee_rate.saturating_mul(STAKING_VSIZE_ESTIMATE))
}
