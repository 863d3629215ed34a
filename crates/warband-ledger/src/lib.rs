//! Currency and morale bookkeeping for the Warband turn simulation.
//!
//! The marketplace and task effects never touch balances directly; they go
//! through the [`Ledger`], which checks funds before every debit and appends
//! a turn-stamped [`LedgerEntry`] for every movement. Morale lives here too
//! because it is the other player-wide resource that decays at turn end.
//!
//! # Modules
//!
//! - [`ledger`] -- The [`Ledger`] struct: balances plus an append-only log.
//! - [`entry`] -- [`LedgerEntry`] records and the [`Resource`] they move.
//!
//! # Usage
//!
//! ```
//! use warband_ledger::{Ledger, ResourceSettings};
//!
//! let mut ledger = Ledger::new(&ResourceSettings::default());
//! ledger.credit(1, 50, "tribute").ok();
//! assert!(ledger.debit(1, 80, "bribe").is_err());
//! assert_eq!(ledger.currency(), 50);
//! ```

pub mod entry;
pub mod ledger;

// Re-export primary types at crate root.
pub use entry::{EntryDirection, LedgerEntry, Resource};
pub use ledger::{Ledger, MoraleDecay, ResourceSettings, ResourceSnapshot};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when moving resources through the ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The balance does not cover the requested debit.
    #[error("insufficient currency: need {required}, have {available}")]
    InsufficientFunds {
        /// Amount the caller tried to debit.
        required: u64,
        /// Balance at the time of the request.
        available: u64,
    },

    /// Amount must be strictly positive.
    #[error("ledger amount must be non-zero")]
    ZeroAmount,

    /// Crediting would overflow the balance.
    #[error("currency balance overflow")]
    Overflow,
}

impl LedgerError {
    /// The failure class this error belongs to.
    pub const fn kind(&self) -> warband_types::FailureKind {
        match self {
            Self::InsufficientFunds { .. } | Self::Overflow => {
                warband_types::FailureKind::InsufficientResource
            }
            Self::ZeroAmount => warband_types::FailureKind::PreconditionFailed,
        }
    }
}
