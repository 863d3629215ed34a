//! The resource ledger: currency, morale, and an append-only movement log.
//!
//! # Design
//!
//! - **Checked debits**: a debit that would overdraw is rejected before the
//!   balance is touched, and the error carries both the required amount and
//!   the balance at the time.
//! - **Bounded morale**: morale never exceeds its maximum; lowering the
//!   maximum caps the current value.
//! - **Append-only**: every movement appends a [`LedgerEntry`]; entries are
//!   never modified.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::{EntryDirection, LedgerEntry, Resource};
use crate::LedgerError;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Starting balances and decay rule for the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSettings {
    /// Currency at game start.
    #[serde(default)]
    pub starting_currency: u64,
    /// Morale at game start.
    #[serde(default = "default_starting_morale")]
    pub starting_morale: u32,
    /// Upper bound for morale.
    #[serde(default = "default_max_morale")]
    pub max_morale: u32,
    /// Morale lost per turn is `morale / decay_divisor`, floored.
    #[serde(default = "default_decay_divisor")]
    pub morale_decay_divisor: u32,
    /// Upper bound on morale lost in a single turn.
    #[serde(default = "default_decay_cap")]
    pub morale_decay_cap: u32,
}

const fn default_starting_morale() -> u32 {
    50
}

const fn default_max_morale() -> u32 {
    100
}

const fn default_decay_divisor() -> u32 {
    8
}

const fn default_decay_cap() -> u32 {
    10
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            starting_currency: 0,
            starting_morale: default_starting_morale(),
            max_morale: default_max_morale(),
            morale_decay_divisor: default_decay_divisor(),
            morale_decay_cap: default_decay_cap(),
        }
    }
}

// ---------------------------------------------------------------------------
// Result records
// ---------------------------------------------------------------------------

/// Outcome of the end-of-turn morale decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoraleDecay {
    /// Morale before decay.
    pub before: u32,
    /// Morale lost this turn.
    pub lost: u32,
    /// Morale after decay.
    pub after: u32,
}

/// Point-in-time view of every balance the ledger holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Current currency.
    pub currency: u64,
    /// Current morale.
    pub morale: u32,
    /// Morale ceiling.
    pub max_morale: u32,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Player-wide currency and morale plus the log of every movement.
#[derive(Debug, Clone)]
pub struct Ledger {
    currency: u64,
    morale: u32,
    max_morale: u32,
    decay_divisor: u32,
    decay_cap: u32,
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Create a ledger with the given starting balances.
    pub fn new(settings: &ResourceSettings) -> Self {
        Self {
            currency: settings.starting_currency,
            morale: settings.starting_morale.min(settings.max_morale),
            max_morale: settings.max_morale,
            decay_divisor: settings.morale_decay_divisor,
            decay_cap: settings.morale_decay_cap,
            entries: Vec::new(),
        }
    }

    // -- currency ----------------------------------------------------------

    /// Current currency balance.
    pub const fn currency(&self) -> u64 {
        self.currency
    }

    /// Whether the balance covers `amount`.
    pub const fn can_afford(&self, amount: u64) -> bool {
        self.currency >= amount
    }

    /// Add currency. Returns the new balance.
    pub fn credit(&mut self, turn: u64, amount: u64, reason: &str) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let balance = self
            .currency
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.currency = balance;
        self.push(turn, Resource::Currency, EntryDirection::Credit, amount, balance, reason);
        Ok(balance)
    }

    /// Remove currency. Rejects without mutation if the balance is short.
    ///
    /// A zero amount is accepted as a no-op so free items need no special
    /// casing at the call site.
    pub fn debit(&mut self, turn: u64, amount: u64, reason: &str) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Ok(self.currency);
        }
        let balance = self
            .currency
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                required: amount,
                available: self.currency,
            })?;
        self.currency = balance;
        self.push(turn, Resource::Currency, EntryDirection::Debit, amount, balance, reason);
        Ok(balance)
    }

    /// Overwrite the balance, logging the difference. Used by restore paths.
    pub fn set_currency(&mut self, turn: u64, value: u64, reason: &str) {
        let (direction, amount) = if value >= self.currency {
            (EntryDirection::Credit, value.saturating_sub(self.currency))
        } else {
            (EntryDirection::Debit, self.currency.saturating_sub(value))
        };
        self.currency = value;
        if amount > 0 {
            self.push(turn, Resource::Currency, direction, amount, value, reason);
        }
    }

    // -- morale ------------------------------------------------------------

    /// Current morale.
    pub const fn morale(&self) -> u32 {
        self.morale
    }

    /// Morale ceiling.
    pub const fn max_morale(&self) -> u32 {
        self.max_morale
    }

    /// Morale as a percentage of its maximum (0 when the maximum is 0).
    pub fn morale_percent(&self) -> f64 {
        if self.max_morale == 0 {
            return 0.0;
        }
        f64::from(self.morale) / f64::from(self.max_morale) * 100.0
    }

    /// Shift morale by `delta`, clamped to `[0, max]`. Returns the new value.
    pub fn adjust_morale(&mut self, turn: u64, delta: i64, reason: &str) -> u32 {
        let target = i64::from(self.morale)
            .saturating_add(delta)
            .clamp(0, i64::from(self.max_morale));
        let value = u32::try_from(target).unwrap_or(self.max_morale);
        self.set_morale(turn, value, reason)
    }

    /// Set morale, clamped to the maximum. Returns the stored value.
    pub fn set_morale(&mut self, turn: u64, value: u32, reason: &str) -> u32 {
        let value = value.min(self.max_morale);
        let before = self.morale;
        self.morale = value;
        if value != before {
            let (direction, amount) = if value > before {
                (EntryDirection::Credit, value.saturating_sub(before))
            } else {
                (EntryDirection::Debit, before.saturating_sub(value))
            };
            self.push(
                turn,
                Resource::Morale,
                direction,
                u64::from(amount),
                u64::from(value),
                reason,
            );
        }
        value
    }

    /// Change the morale ceiling; the current value is capped to it.
    pub fn set_max_morale(&mut self, turn: u64, max: u32) {
        self.max_morale = max;
        if self.morale > max {
            self.set_morale(turn, max, "morale ceiling lowered");
        }
    }

    /// Apply the end-of-turn decay: `min(morale / divisor, cap)` is lost.
    pub fn apply_morale_decay(&mut self, turn: u64) -> MoraleDecay {
        let before = self.morale;
        let lost = before
            .checked_div(self.decay_divisor)
            .unwrap_or(0)
            .min(self.decay_cap);
        let after = self.set_morale(turn, before.saturating_sub(lost), "morale decay");
        debug!(turn, before, lost, after, "morale decayed");
        MoraleDecay {
            before,
            lost,
            after,
        }
    }

    // -- queries -----------------------------------------------------------

    /// Snapshot of every balance.
    pub const fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            currency: self.currency,
            morale: self.morale,
            max_morale: self.max_morale,
        }
    }

    /// Every entry, oldest first.
    pub fn all_entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Entries stamped with the given turn.
    pub fn entries_for_turn(&self, turn: u64) -> Vec<&LedgerEntry> {
        self.entries.iter().filter(|e| e.turn == turn).collect()
    }

    /// Net signed movement of a resource during one turn.
    pub fn net_flow_for_turn(&self, turn: u64, resource: Resource) -> i128 {
        self.entries
            .iter()
            .filter(|e| e.turn == turn && e.resource == resource)
            .fold(0_i128, |acc, e| acc.saturating_add(e.signed_amount()))
    }

    fn push(
        &mut self,
        turn: u64,
        resource: Resource,
        direction: EntryDirection,
        amount: u64,
        balance_after: u64,
        reason: &str,
    ) {
        self.entries.push(LedgerEntry {
            turn,
            resource,
            direction,
            amount,
            balance_after,
            reason: reason.to_owned(),
        });
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(&ResourceSettings::default())
    }
}
