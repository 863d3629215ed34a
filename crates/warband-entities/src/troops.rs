//! Troop pools: per-tier tallies of rank-and-file troops.
//!
//! A pool is either owned by a champion (and commanded by them) or the
//! shared common pool. The pool only knows its commander by id; stats it
//! needs for capacity and combat power are passed in as [`CommandStats`].
//!
//! Capacity is advisory here. [`TroopPool::add_troops`] never rejects; the
//! registry's allocator is what keeps a champion's pool within capacity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use warband_types::{ArmamentTier, ChampionId, EntityRef, PoolId};

use crate::attributes::EntityCore;

/// The commanding champion's stats as seen by their pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStats {
    /// Command capacity (the champion's might).
    pub capacity: u32,
    /// Agility, adds a flat bonus to combat power.
    pub agility: u32,
    /// Intellect, scales troop power.
    pub intellect: u32,
}

/// How many troops a pool may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolCapacity {
    /// At most this many troops.
    Limited(u32),
    /// No limit (the common pool).
    Unbounded,
}

impl PoolCapacity {
    /// Free room given the current total, or `None` when unbounded.
    pub fn free(self, total: u64) -> Option<u64> {
        match self {
            Self::Limited(cap) => Some(u64::from(cap).saturating_sub(total)),
            Self::Unbounded => None,
        }
    }
}

/// Result of a removal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopRemoval {
    /// Troops actually removed; never more than were present.
    pub removed: u32,
    /// Troops left in the tier.
    pub remaining: u32,
}

/// A tally of troops per armament tier.
#[derive(Debug)]
pub struct TroopPool {
    id: PoolId,
    core: EntityCore,
    groups: BTreeMap<ArmamentTier, u32>,
    commander: Option<ChampionId>,
}

impl TroopPool {
    /// An empty, commander-less pool.
    pub fn new() -> Self {
        let id = PoolId::new();
        Self {
            id,
            core: EntityCore::new(EntityRef::TroopPool(id)),
            groups: ArmamentTier::ALL.iter().map(|&t| (t, 0)).collect(),
            commander: None,
        }
    }

    /// An empty pool commanded by `champion`.
    pub fn commanded_by(champion: ChampionId) -> Self {
        let mut pool = Self::new();
        pool.commander = Some(champion);
        pool
    }

    /// Pool identifier.
    pub const fn id(&self) -> PoolId {
        self.id
    }

    /// Shared entity core.
    pub const fn core(&self) -> &EntityCore {
        &self.core
    }

    /// Shared entity core, mutably.
    pub const fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    /// The commanding champion, if any.
    pub const fn commander(&self) -> Option<ChampionId> {
        self.commander
    }

    /// Set the commanding champion.
    pub const fn assign_commander(&mut self, champion: ChampionId) {
        self.commander = Some(champion);
    }

    /// Detach the commander; the pool keeps its troops.
    pub const fn clear_commander(&mut self) -> Option<ChampionId> {
        self.commander.take()
    }

    /// Add troops to a tier. Returns the tier's new count.
    pub fn add_troops(&mut self, count: u32, tier: ArmamentTier) -> u32 {
        let slot = self.groups.entry(tier).or_insert(0);
        let old = *slot;
        let new = old.saturating_add(count);
        *slot = new;
        if new != old {
            self.core
                .emit_number(tier.name(), i64::from(old), i64::from(new));
        }
        new
    }

    /// Add troops by tier name. Unknown names land in the lowest tier.
    pub fn add_troops_by_name(&mut self, count: u32, tier: &str) -> u32 {
        let tier = tier.parse::<ArmamentTier>().unwrap_or_else(|err| {
            warn!(pool = %self.id, error = %err, fallback = %ArmamentTier::LOWEST,
                "unknown armament tier, using lowest");
            ArmamentTier::LOWEST
        });
        self.add_troops(count, tier)
    }

    /// Remove up to `count` troops from a tier.
    pub fn remove_troops(&mut self, count: u32, tier: ArmamentTier) -> TroopRemoval {
        let slot = self.groups.entry(tier).or_insert(0);
        let old = *slot;
        let removed = count.min(old);
        let remaining = old.saturating_sub(removed);
        *slot = remaining;
        if removed > 0 {
            self.core
                .emit_number(tier.name(), i64::from(old), i64::from(remaining));
        }
        TroopRemoval { removed, remaining }
    }

    /// Remove every troop. Returns what was held per tier.
    pub fn clear(&mut self) -> BTreeMap<ArmamentTier, u32> {
        let held = self.group_detail();
        for (&tier, &count) in &held {
            if count > 0 {
                self.remove_troops(count, tier);
            }
        }
        held
    }

    /// Troops in one tier.
    pub fn count(&self, tier: ArmamentTier) -> u32 {
        self.groups.get(&tier).copied().unwrap_or(0)
    }

    /// Snapshot of every tier, including empty ones.
    pub fn group_detail(&self) -> BTreeMap<ArmamentTier, u32> {
        self.groups.clone()
    }

    /// Troops across all tiers.
    pub fn total_count(&self) -> u64 {
        self.groups.values().map(|&c| u64::from(c)).sum()
    }

    /// Whether the pool holds no troops.
    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    /// Capacity: the commander's command capacity, or unbounded.
    pub const fn capacity(&self, commander: Option<CommandStats>) -> PoolCapacity {
        match (self.commander, commander) {
            (Some(_), Some(stats)) => PoolCapacity::Limited(stats.capacity),
            _ => PoolCapacity::Unbounded,
        }
    }

    /// Sum of `count x tier multiplier` across tiers.
    pub fn raw_power(&self) -> f64 {
        self.groups
            .iter()
            .map(|(tier, &count)| f64::from(count) * tier.power_multiplier())
            .sum()
    }

    /// Effective combat power.
    ///
    /// Commanded: `raw x (intellect + 150) / 150 + agility x 10`.
    /// Without a commander the raw sum is used.
    pub fn combat_power(&self, commander: Option<CommandStats>) -> f64 {
        let raw = self.raw_power();
        match (self.commander, commander) {
            (Some(_), Some(stats)) => {
                raw * (f64::from(stats.intellect) + 150.0) / 150.0
                    + f64::from(stats.agility) * 10.0
            }
            _ => raw,
        }
    }

    /// Remove `fraction` of every tier, floored to whole troops.
    ///
    /// Returns the losses per tier (tiers with no losses omitted).
    pub fn apply_casualties(&mut self, fraction: f64) -> BTreeMap<ArmamentTier, u32> {
        let fraction = fraction.clamp(0.0, 1.0);
        let mut losses = BTreeMap::new();
        for (tier, count) in self.group_detail() {
            // fraction is in [0, 1], so the product never exceeds `count`.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let lost = (f64::from(count) * fraction).floor() as u32;
            if lost > 0 {
                let removal = self.remove_troops(lost, tier);
                losses.insert(tier, removal.removed);
            }
        }
        losses
    }
}

impl Default for TroopPool {
    fn default() -> Self {
        Self::new()
    }
}
