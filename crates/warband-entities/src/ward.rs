//! Wards: capturable NPCs with a submission/depravity/breeding economy.
//!
//! The remaining breeding value is linked to the total: it is always
//! within `[0, total]`, and lowering the total caps it retroactively.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use warband_types::{EntityRef, LocationId, WardId};

use crate::attributes::{
    check_linked_range, relink_max, AttributeKey, Attributed, Bounded, EntityCore,
};
use crate::error::EntityError;

/// Numeric attributes of a ward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WardAttr {
    /// Age in years.
    Age,
    /// Appeal, `[0, 100]`.
    Appeal,
    /// Submission, `[0, 100]`.
    Submission,
    /// Depravity, `[0, 100]`.
    Depravity,
    /// Total breeding value.
    TotalBreeding,
    /// Breeding value left, `[0, total]`.
    RemainingBreeding,
    /// Offspring sired by champions.
    ChampionOffspring,
    /// Offspring sired by troops.
    TroopOffspring,
}

impl AttributeKey for WardAttr {
    const ALL: &'static [Self] = &[
        Self::Age,
        Self::Appeal,
        Self::Submission,
        Self::Depravity,
        Self::TotalBreeding,
        Self::RemainingBreeding,
        Self::ChampionOffspring,
        Self::TroopOffspring,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Appeal => "appeal",
            Self::Submission => "submission",
            Self::Depravity => "depravity",
            Self::TotalBreeding => "total_breeding",
            Self::RemainingBreeding => "remaining_breeding",
            Self::ChampionOffspring => "champion_offspring",
            Self::TroopOffspring => "troop_offspring",
        }
    }
}

/// Who sires a ward's offspring; decides the breeding cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sire {
    /// A champion.
    Champion,
    /// Rank-and-file troops.
    Troops,
}

impl Sire {
    /// Breeding value consumed by one pairing.
    pub const fn breeding_cost(self) -> i64 {
        match self {
            Self::Champion | Self::Troops => 100,
        }
    }
}

/// Construction parameters for a ward. Unset fields take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardProfile {
    /// Display name.
    pub name: String,
    /// Race tag.
    pub race: String,
    /// Age.
    pub age: i64,
    /// Appeal.
    pub appeal: i64,
    /// Total breeding value; remaining starts equal to it.
    pub total_breeding: i64,
    /// Trait tags.
    pub traits: Vec<String>,
}

impl Default for WardProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            race: String::from("human"),
            age: 20,
            appeal: 10,
            total_breeding: 100,
            traits: Vec::new(),
        }
    }
}

/// A capturable NPC.
#[derive(Debug)]
pub struct Ward {
    id: WardId,
    core: EntityCore,
    name: String,
    race: String,
    origin: String,
    origin_location: Option<LocationId>,
    age: Bounded,
    appeal: Bounded,
    submission: Bounded,
    depravity: Bounded,
    total_breeding: Bounded,
    remaining_breeding: Bounded,
    champion_offspring: Bounded,
    troop_offspring: Bounded,
    traits: BTreeSet<String>,
}

impl Ward {
    /// Build a ward from a profile.
    pub fn new(profile: WardProfile) -> Self {
        let id = WardId::new();
        let total = Bounded::at_least(profile.total_breeding, 0);
        Self {
            id,
            core: EntityCore::new(EntityRef::Ward(id)),
            name: profile.name,
            race: profile.race,
            origin: String::new(),
            origin_location: None,
            age: Bounded::at_least(profile.age, 0),
            appeal: Bounded::new(profile.appeal, 0, 100),
            submission: Bounded::new(0, 0, 100),
            depravity: Bounded::new(0, 0, 100),
            remaining_breeding: Bounded::new(total.get(), 0, total.get()),
            total_breeding: total,
            champion_offspring: Bounded::at_least(0, 0),
            troop_offspring: Bounded::at_least(0, 0),
            traits: profile.traits.into_iter().collect(),
        }
    }

    /// Ward identifier.
    pub const fn id(&self) -> WardId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Race tag.
    pub fn race(&self) -> &str {
        &self.race
    }

    /// Origin label, e.g. the location the ward was found at.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The location the ward came from, if any.
    pub const fn origin_location(&self) -> Option<LocationId> {
        self.origin_location
    }

    /// Record where the ward came from.
    pub fn set_origin(&mut self, origin: impl Into<String>, location: Option<LocationId>) {
        let old = core::mem::replace(&mut self.origin, origin.into());
        self.origin_location = location;
        let new = self.origin.clone();
        self.core.emit_text("origin", old, new);
    }

    /// Remaining breeding value.
    pub const fn remaining_breeding(&self) -> i64 {
        self.remaining_breeding.get()
    }

    /// Total breeding value.
    pub const fn total_breeding(&self) -> i64 {
        self.total_breeding.get()
    }

    // -- traits ------------------------------------------------------------

    /// Add a trait tag. Returns `false` if already present.
    pub fn add_trait(&mut self, tag: impl Into<String>) -> bool {
        self.traits.insert(tag.into())
    }

    /// Remove a trait tag. Returns `false` if absent.
    pub fn remove_trait(&mut self, tag: &str) -> bool {
        self.traits.remove(tag)
    }

    /// Whether the ward carries a trait.
    pub fn has_trait(&self, tag: &str) -> bool {
        self.traits.contains(tag)
    }

    /// All trait tags, sorted.
    pub const fn traits(&self) -> &BTreeSet<String> {
        &self.traits
    }

    // -- breeding ----------------------------------------------------------

    /// Deduct the breeding cost for one pairing with `sire`.
    pub fn consume_breeding(&mut self, sire: Sire) -> Result<i64, EntityError> {
        let required = sire.breeding_cost();
        let current = self.remaining_breeding();
        if current < required {
            return Err(EntityError::InsufficientBreeding { current, required });
        }
        let remaining =
            self.set_attribute(WardAttr::RemainingBreeding, current.saturating_sub(required));
        debug!(ward = %self.id, ?sire, remaining, "breeding value consumed");
        Ok(remaining)
    }

    /// Count one champion-sired offspring.
    pub fn record_champion_offspring(&mut self) -> i64 {
        self.adjust_attribute(WardAttr::ChampionOffspring, 1)
    }

    /// Count `n` troop-sired offspring. Non-positive `n` is ignored.
    pub fn record_troop_offspring(&mut self, n: i64) -> i64 {
        if n <= 0 {
            return self.get_attribute(WardAttr::TroopOffspring);
        }
        self.adjust_attribute(WardAttr::TroopOffspring, n)
    }

    // -- derived -----------------------------------------------------------

    /// Efficiency derived from one stat: `stat^2 / 4000`.
    #[allow(clippy::cast_precision_loss)]
    pub fn efficiency(&self, stat: WardAttr) -> f64 {
        let value = self.get_attribute(stat) as f64;
        value * value / 4000.0
    }

    /// `max((125 - depravity) / 100, 0)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn depravity_penalty(&self) -> f64 {
        // depravity is clamped to [0, 100].
        let depravity = self.get_attribute(WardAttr::Depravity) as f64;
        ((125.0 - depravity) / 100.0).max(0.0)
    }
}

impl Attributed for Ward {
    type Key = WardAttr;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn field(&self, key: WardAttr) -> Bounded {
        match key {
            WardAttr::Age => self.age,
            WardAttr::Appeal => self.appeal,
            WardAttr::Submission => self.submission,
            WardAttr::Depravity => self.depravity,
            WardAttr::TotalBreeding => self.total_breeding,
            WardAttr::RemainingBreeding => self.remaining_breeding,
            WardAttr::ChampionOffspring => self.champion_offspring,
            WardAttr::TroopOffspring => self.troop_offspring,
        }
    }

    fn field_mut(&mut self, key: WardAttr) -> &mut Bounded {
        match key {
            WardAttr::Age => &mut self.age,
            WardAttr::Appeal => &mut self.appeal,
            WardAttr::Submission => &mut self.submission,
            WardAttr::Depravity => &mut self.depravity,
            WardAttr::TotalBreeding => &mut self.total_breeding,
            WardAttr::RemainingBreeding => &mut self.remaining_breeding,
            WardAttr::ChampionOffspring => &mut self.champion_offspring,
            WardAttr::TroopOffspring => &mut self.troop_offspring,
        }
    }

    fn after_write(&mut self, key: WardAttr) {
        let total = self.total_breeding.get();
        let max = match key {
            WardAttr::TotalBreeding => total,
            WardAttr::RemainingBreeding => self.remaining_breeding.max().min(total),
            _ => return,
        };
        relink_max(
            &mut self.core,
            &mut self.remaining_breeding,
            WardAttr::RemainingBreeding.name(),
            max,
        );
    }

    fn check_constraint(&self, key: WardAttr, min: i64, max: i64) -> Result<(), EntityError> {
        let parent = (WardAttr::TotalBreeding.name(), self.total_breeding);
        let child = (WardAttr::RemainingBreeding.name(), self.remaining_breeding);
        match key {
            WardAttr::TotalBreeding => check_linked_range(parent, child, false, min, max),
            WardAttr::RemainingBreeding => check_linked_range(parent, child, true, min, max),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ward() -> Ward {
        Ward::new(WardProfile {
            name: String::from("Mira"),
            ..WardProfile::default()
        })
    }

    #[test]
    fn defaults_apply() {
        let ward = ward();
        assert_eq!(ward.get_attribute(WardAttr::Age), 20);
        assert_eq!(ward.get_attribute(WardAttr::Appeal), 10);
        assert_eq!(ward.total_breeding(), 100);
        assert_eq!(ward.remaining_breeding(), 100);
        assert_eq!(ward.get_attribute(WardAttr::Depravity), 0);
    }

    #[test]
    fn lowering_total_caps_remaining() {
        let mut ward = ward();
        ward.set_attribute(WardAttr::TotalBreeding, 40);
        assert_eq!(ward.remaining_breeding(), 40);
        assert_eq!(ward.set_attribute(WardAttr::RemainingBreeding, 90), 40);
        ward.set_attribute(WardAttr::TotalBreeding, 300);
        assert_eq!(ward.remaining_breeding(), 40);
        assert_eq!(ward.set_attribute(WardAttr::RemainingBreeding, 250), 250);
    }

    #[test]
    fn remaining_never_exceeds_total_under_any_sequence() {
        let mut ward = ward();
        let steps: [(WardAttr, i64); 6] = [
            (WardAttr::RemainingBreeding, 500),
            (WardAttr::TotalBreeding, -50),
            (WardAttr::RemainingBreeding, 20),
            (WardAttr::TotalBreeding, 70),
            (WardAttr::RemainingBreeding, 1_000),
            (WardAttr::TotalBreeding, 10),
        ];
        for (key, delta) in steps {
            ward.adjust_attribute(key, delta);
            assert!(ward.remaining_breeding() <= ward.total_breeding());
            assert!(ward.remaining_breeding() >= 0);
        }
    }

    #[test]
    fn breeding_consumption_and_offspring() {
        let mut ward = ward();
        assert_eq!(ward.consume_breeding(Sire::Champion).unwrap(), 0);
        assert!(matches!(
            ward.consume_breeding(Sire::Troops),
            Err(EntityError::InsufficientBreeding {
                current: 0,
                required: 100
            })
        ));
        assert_eq!(ward.record_champion_offspring(), 1);
        assert_eq!(ward.record_troop_offspring(0), 0);
        assert_eq!(ward.record_troop_offspring(3), 3);
    }

    #[test]
    fn traits_are_a_set() {
        let mut ward = ward();
        assert!(ward.add_trait("stubborn"));
        assert!(!ward.add_trait("stubborn"));
        assert!(ward.has_trait("stubborn"));
        assert!(ward.remove_trait("stubborn"));
        assert!(ward.traits().is_empty());
    }

    #[test]
    fn depravity_penalty_floors_at_zero() {
        let mut ward = ward();
        assert!((ward.depravity_penalty() - 1.25).abs() < 1e-9);
        ward.set_attribute(WardAttr::Depravity, 100);
        assert!((ward.depravity_penalty() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn widening_remaining_cannot_escape_total() {
        let mut ward = ward();
        assert!(matches!(
            ward.set_constraint(WardAttr::RemainingBreeding, 0, 1_000),
            Err(EntityError::LinkedConstraint {
                linked: "total_breeding",
                limit: 100,
                ..
            })
        ));
        assert_eq!(ward.set_attribute(WardAttr::RemainingBreeding, 500), 100);

        ward.set_constraint(WardAttr::RemainingBreeding, 0, 60).unwrap();
        assert_eq!(ward.remaining_breeding(), 60);
        assert_eq!(ward.set_attribute(WardAttr::RemainingBreeding, 90), 60);
        assert!(ward.remaining_breeding() <= ward.total_breeding());
    }

    #[test]
    fn total_minimum_stays_above_remaining_minimum() {
        let mut ward = ward();
        assert!(matches!(
            ward.set_constraint(WardAttr::TotalBreeding, -100, 100),
            Err(EntityError::LinkedConstraint {
                linked: "remaining_breeding",
                limit: 0,
                ..
            })
        ));
        assert_eq!(ward.set_attribute(WardAttr::TotalBreeding, -50), 0);
        assert_eq!(ward.remaining_breeding(), 0);

        ward.set_constraint(WardAttr::TotalBreeding, 0, 30).unwrap();
        ward.set_attribute(WardAttr::TotalBreeding, 30);
        assert_eq!(ward.total_breeding(), 30);
        assert!(ward.remaining_breeding() <= 30);
    }
}
