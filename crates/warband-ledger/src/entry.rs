//! Ledger entry records.

use serde::{Deserialize, Serialize};

/// A player-wide resource tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// Spendable currency used at the marketplace.
    Currency,
    /// Warband morale, bounded by a configurable maximum.
    Morale,
}

/// Whether an entry added to or removed from a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryDirection {
    /// The balance increased.
    Credit,
    /// The balance decreased.
    Debit,
}

/// One movement of a resource, stamped with the turn it happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Turn number at the time of the movement.
    pub turn: u64,
    /// The resource that moved.
    pub resource: Resource,
    /// Credit or debit.
    pub direction: EntryDirection,
    /// Absolute amount moved.
    pub amount: u64,
    /// Balance after the movement.
    pub balance_after: u64,
    /// Human-readable reason ("purchase: healing draught", "morale decay").
    pub reason: String,
}

impl LedgerEntry {
    /// Signed amount: positive for credits, negative for debits.
    pub fn signed_amount(&self) -> i128 {
        let amount = i128::from(self.amount);
        match self.direction {
            EntryDirection::Credit => amount,
            EntryDirection::Debit => amount.saturating_neg(),
        }
    }
}
