//! Raidable locations with reconnaissance and a noisy power estimate.
//!
//! A location holds two disjoint ward collections: undiscovered
//! ("potential") wards and discovered ones. Scouting promotes wards from the
//! first to the second; a victorious raid captures from the second. Each
//! move is a single remove-then-push on owned values, so a ward is never in
//! both collections.
//!
//! Every reconnaissance step redraws the estimate
//! `power x e^(U(-1, 1) x (1 - progress / max))`, whose spread shrinks to
//! zero as scouting completes. Before the first step the estimate is
//! unknown.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use warband_types::{EntityRef, LocationId, WardId};

use crate::attributes::{
    check_linked_range, relink_max, AttributeKey, Attributed, Bounded, EntityCore,
};
use crate::error::EntityError;
use crate::ward::Ward;

/// Numeric attributes of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationAttr {
    /// True defending power, never negative.
    CombatPower,
    /// Reconnaissance progress, `[0, recon_max]`.
    Reconnaissance,
    /// Reconnaissance needed to fully scout the location.
    ReconnaissanceMax,
}

impl AttributeKey for LocationAttr {
    const ALL: &'static [Self] = &[
        Self::CombatPower,
        Self::Reconnaissance,
        Self::ReconnaissanceMax,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::CombatPower => "combat_power",
            Self::Reconnaissance => "reconnaissance",
            Self::ReconnaissanceMax => "reconnaissance_max",
        }
    }
}

/// A raidable location.
#[derive(Debug)]
pub struct Location {
    id: LocationId,
    core: EntityCore,
    name: String,
    kind: String,
    combat_power: Bounded,
    recon: Bounded,
    recon_max: Bounded,
    estimate: Option<f64>,
    potential: Vec<Ward>,
    discovered: Vec<Ward>,
}

impl Location {
    /// Default defending power.
    pub const DEFAULT_COMBAT_POWER: i64 = 100;
    /// Default reconnaissance needed for a full scout.
    pub const DEFAULT_RECON_MAX: i64 = 100;

    /// A location with default power and reconnaissance.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::with_power(name, kind, Self::DEFAULT_COMBAT_POWER, Self::DEFAULT_RECON_MAX)
    }

    /// A location with explicit power and reconnaissance requirement.
    pub fn with_power(
        name: impl Into<String>,
        kind: impl Into<String>,
        combat_power: i64,
        recon_max: i64,
    ) -> Self {
        let id = LocationId::new();
        let recon_max = Bounded::at_least(recon_max, 0);
        Self {
            id,
            core: EntityCore::new(EntityRef::Location(id)),
            name: name.into(),
            kind: kind.into(),
            combat_power: Bounded::at_least(combat_power, 0),
            recon: Bounded::new(0, 0, recon_max.get()),
            recon_max,
            estimate: None,
            potential: Vec::new(),
            discovered: Vec::new(),
        }
    }

    /// Location identifier.
    pub const fn id(&self) -> LocationId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location type, e.g. "village".
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// True defending power.
    #[allow(clippy::cast_precision_loss)]
    pub const fn combat_power(&self) -> f64 {
        self.combat_power.get() as f64
    }

    // -- reconnaissance ----------------------------------------------------

    /// Current reconnaissance progress.
    pub const fn reconnaissance(&self) -> i64 {
        self.recon.get()
    }

    /// Reconnaissance needed for a full scout.
    pub const fn reconnaissance_max(&self) -> i64 {
        self.recon_max.get()
    }

    /// `progress / max(recon_max, 1)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn reconnaissance_ratio(&self) -> f64 {
        let max = self.reconnaissance_max().max(1);
        self.reconnaissance() as f64 / max as f64
    }

    /// Whether reconnaissance has reached its maximum.
    pub const fn is_fully_scouted(&self) -> bool {
        self.recon.get() >= self.recon_max.get()
    }

    /// The noisy power estimate; `None` until the location is scouted once.
    pub const fn estimated_power(&self) -> Option<f64> {
        self.estimate
    }

    /// Advance reconnaissance by `delta`, clamped to the maximum, and redraw
    /// the estimate. Returns the new progress.
    pub fn advance_reconnaissance<R: Rng + ?Sized>(&mut self, delta: i64, rng: &mut R) -> i64 {
        let progress = self.adjust_attribute(LocationAttr::Reconnaissance, delta);
        let noise: f64 = rng.random_range(-1.0..=1.0);
        let spread = 1.0 - self.reconnaissance_ratio();
        let estimate = self.combat_power() * (noise * spread).exp();
        self.estimate = Some(estimate);
        debug!(location = %self.id, progress, estimate, "reconnaissance advanced");
        progress
    }

    // -- wards -------------------------------------------------------------

    /// Hide a ward here, stamping its origin with this location.
    pub fn add_potential_ward(&mut self, mut ward: Ward) {
        ward.set_origin(self.name.clone(), Some(self.id));
        self.potential.push(ward);
    }

    /// Move a ward from undiscovered to discovered.
    ///
    /// Returns `None` when the ward is not undiscovered here.
    pub fn promote_to_discovered(&mut self, ward: WardId) -> Option<&Ward> {
        let index = self.potential.iter().position(|w| w.id() == ward)?;
        let moved = self.potential.remove(index);
        debug!(location = %self.id, ward = %ward, "ward discovered");
        self.discovered.push(moved);
        self.discovered.last()
    }

    /// Pick a random undiscovered ward.
    pub fn random_potential_ward<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<WardId> {
        if self.potential.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.potential.len());
        self.potential.get(index).map(Ward::id)
    }

    /// Take a discovered ward off the location.
    pub fn remove_captured_ward(&mut self, ward: WardId) -> Option<Ward> {
        let index = self.discovered.iter().position(|w| w.id() == ward)?;
        Some(self.discovered.remove(index))
    }

    /// Take every discovered ward off the location.
    pub fn capture_all_discovered(&mut self) -> Vec<Ward> {
        core::mem::take(&mut self.discovered)
    }

    /// Whether any ward is still undiscovered.
    pub fn has_undiscovered_wards(&self) -> bool {
        !self.potential.is_empty()
    }

    /// Undiscovered wards.
    pub fn potential_wards(&self) -> &[Ward] {
        &self.potential
    }

    /// Discovered wards.
    pub fn discovered_wards(&self) -> &[Ward] {
        &self.discovered
    }

    /// Find a ward in either collection.
    pub fn find_ward(&self, ward: WardId) -> Option<&Ward> {
        self.potential
            .iter()
            .chain(&self.discovered)
            .find(|w| w.id() == ward)
    }

    /// Find a ward in either collection, mutably.
    pub fn find_ward_mut(&mut self, ward: WardId) -> Option<&mut Ward> {
        self.potential
            .iter_mut()
            .chain(&mut self.discovered)
            .find(|w| w.id() == ward)
    }

    /// `(undiscovered, discovered)` ward counts.
    pub fn ward_counts(&self) -> (usize, usize) {
        (self.potential.len(), self.discovered.len())
    }
}

impl Attributed for Location {
    type Key = LocationAttr;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn field(&self, key: LocationAttr) -> Bounded {
        match key {
            LocationAttr::CombatPower => self.combat_power,
            LocationAttr::Reconnaissance => self.recon,
            LocationAttr::ReconnaissanceMax => self.recon_max,
        }
    }

    fn field_mut(&mut self, key: LocationAttr) -> &mut Bounded {
        match key {
            LocationAttr::CombatPower => &mut self.combat_power,
            LocationAttr::Reconnaissance => &mut self.recon,
            LocationAttr::ReconnaissanceMax => &mut self.recon_max,
        }
    }

    fn after_write(&mut self, key: LocationAttr) {
        let cap = self.recon_max.get();
        let max = match key {
            LocationAttr::ReconnaissanceMax => cap,
            LocationAttr::Reconnaissance => self.recon.max().min(cap),
            LocationAttr::CombatPower => return,
        };
        relink_max(
            &mut self.core,
            &mut self.recon,
            LocationAttr::Reconnaissance.name(),
            max,
        );
    }

    fn check_constraint(&self, key: LocationAttr, min: i64, max: i64) -> Result<(), EntityError> {
        let parent = (LocationAttr::ReconnaissanceMax.name(), self.recon_max);
        let child = (LocationAttr::Reconnaissance.name(), self.recon);
        match key {
            LocationAttr::ReconnaissanceMax => check_linked_range(parent, child, false, min, max),
            LocationAttr::Reconnaissance => check_linked_range(parent, child, true, min, max),
            LocationAttr::CombatPower => Ok(()),
        }
    }
}
