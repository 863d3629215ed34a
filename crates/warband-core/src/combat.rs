//! Raid planning and battle settlement.
//!
//! A battle is planned over the turn: select a target location, deploy
//! champions, preview, then confirm. Planning stays mutable until
//! confirmation; while confirmed, target and roster are frozen until
//! [`Combat::cancel_confirmation`]. The turn controller executes a confirmed
//! battle during settlement, which leaves the plan `Settled` until the
//! turn reset returns it to `Idle`.
//!
//! Deployed champions are claimed in the scheduler, so a champion can be
//! either tasked or deployed in a turn, never both. Each deployment
//! snapshots the champion's power at the time, discounted in raid mode.
//!
//! # Win probability
//!
//! With `ratio = friendly / (enemy + 1)` and scouting progress `s` in
//! `[0, 1]`:
//!
//! ```text
//! p = clamp((0.5 + ln(ratio)) x min(1, ln(e - 1 + s)), 0, 1)
//! ```
//!
//! Preview uses the location's noisy estimate; execution uses its true
//! power.

use std::collections::BTreeMap;
use std::f64::consts::E;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use warband_types::{
    ActorRef, ArmamentTier, ChampionId, EntityRef, FailureKind, LocationId, WardId,
};

use crate::config::CombatConfig;
use crate::scheduler::Scheduler;
use crate::world::World;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by combat planning and execution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CombatError {
    /// The target location does not exist.
    #[error("location not found: {0}")]
    LocationNotFound(LocationId),

    /// The champion does not exist.
    #[error("champion not found: {0}")]
    ChampionNotFound(ChampionId),

    /// The champion is already on the roster.
    #[error("champion already deployed: {0}")]
    AlreadyDeployed(ChampionId),

    /// The champion is claimed by a task or another reservation.
    #[error("champion is occupied: {0}")]
    ChampionOccupied(ChampionId),

    /// The champion is not on the roster.
    #[error("champion not deployed: {0}")]
    NotDeployed(ChampionId),

    /// Planning is frozen by a confirmation.
    #[error("combat is confirmed; cancel the confirmation first")]
    AlreadyConfirmed,

    /// This turn's battle has already been fought.
    #[error("combat already settled this turn")]
    AlreadySettled,

    /// The preview does not allow confirming.
    #[error("combat is not executable: {reason}")]
    NotExecutable {
        /// Why the preview rejected it.
        reason: String,
    },

    /// Execution was requested without a confirmation.
    #[error("combat has not been confirmed")]
    NotConfirmed,
}

impl CombatError {
    /// The failure class this error belongs to.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::LocationNotFound(_) | Self::ChampionNotFound(_) | Self::NotDeployed(_) => {
                FailureKind::NotFound
            }
            Self::ChampionOccupied(_) => FailureKind::Occupied,
            Self::AlreadyDeployed(_)
            | Self::AlreadyConfirmed
            | Self::AlreadySettled
            | Self::NotExecutable { .. }
            | Self::NotConfirmed => FailureKind::InvalidState,
        }
    }
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// `friendly / (enemy + 1)`.
pub fn power_ratio(friendly: f64, enemy: f64) -> f64 {
    friendly / (enemy.max(0.0) + 1.0)
}

/// Win probability for the given powers and scouting ratio.
pub fn win_probability(friendly: f64, enemy: f64, scout_ratio: f64) -> f64 {
    let ratio = power_ratio(friendly, enemy);
    let correction = (E - 1.0 + scout_ratio.clamp(0.0, 1.0)).ln().min(1.0);
    let p = (0.5 + ratio.ln()) * correction;
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

/// Fraction of every deployed tier lost in the battle.
///
/// Victory: `min(victory_cap, max(0, (2 - ratio) x slope))`.
/// Defeat: `min(defeat_cap, slope / ratio)`.
pub fn casualty_fraction(settings: &CombatConfig, ratio: f64, victory: bool) -> f64 {
    if victory {
        ((2.0 - ratio) * settings.casualty_slope)
            .max(0.0)
            .min(settings.victory_casualty_cap)
    } else if ratio > 0.0 {
        (settings.casualty_slope / ratio).min(settings.defeat_casualty_cap)
    } else {
        settings.defeat_casualty_cap
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Planning state, derived from the current target, roster, and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatPhase {
    /// No target, no roster.
    Idle,
    /// A target is selected, nobody is deployed.
    TargetSelected,
    /// At least one champion is deployed.
    Deploying,
    /// An executable preview was taken after the last change.
    Previewed,
    /// The battle will be fought at settlement.
    Confirmed,
    /// The battle was fought; planning reopens after the turn reset.
    Settled,
}

/// A champion on the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    /// The champion.
    pub champion: ChampionId,
    /// Champion name, for reports.
    pub name: String,
    /// Power snapshot taken at deployment.
    pub power: f64,
}

/// What the player sees before confirming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatPreview {
    /// Whether the battle may be confirmed.
    pub executable: bool,
    /// Why not, when it may not.
    pub reason: Option<String>,
    /// Selected target.
    pub target: Option<LocationId>,
    /// The target's noisy power estimate; `None` before any scouting.
    pub enemy_estimate: Option<f64>,
    /// Sum of deployment snapshots.
    pub friendly_power: f64,
    /// Champions deployed.
    pub champions: usize,
    /// Action points the battle costs.
    pub action_points: u32,
    /// Whether raid mode is on.
    pub raid_mode: bool,
    /// Estimated win probability; `None` when the estimate is unknown.
    pub win_probability: Option<f64>,
}

/// Outcome of an executed battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    /// The attacked location.
    pub location: LocationId,
    /// Its name.
    pub location_name: String,
    /// Whether the attack won.
    pub victory: bool,
    /// Probability used for the roll.
    pub win_probability: f64,
    /// The uniform draw in `[0, 1)`.
    pub roll: f64,
    /// Attacking power.
    pub friendly_power: f64,
    /// True defending power.
    pub enemy_power: f64,
    /// Fraction of each tier lost.
    pub casualty_fraction: f64,
    /// Losses per champion and tier.
    pub losses: BTreeMap<ChampionId, BTreeMap<ArmamentTier, u32>>,
    /// Total troops lost.
    pub troops_lost: u64,
    /// Wards captured, now on the player's roster.
    pub captured: Vec<CapturedWard>,
    /// Action points the battle cost.
    pub action_points: u32,
    /// Whether it was a raid.
    pub raid_mode: bool,
}

/// A ward taken in battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedWard {
    /// Ward id.
    pub id: WardId,
    /// Ward name.
    pub name: String,
}

impl BattleReport {
    /// One-line description for the turn log.
    pub fn summary(&self) -> String {
        if self.victory {
            let names: Vec<&str> = self.captured.iter().map(|w| w.name.as_str()).collect();
            let captured = if names.is_empty() {
                String::new()
            } else {
                format!(", captured {}", names.join(", "))
            };
            format!(
                "battle against {} won{captured}, lost {} troops",
                self.location_name, self.troops_lost
            )
        } else {
            format!(
                "battle against {} lost, lost {} troops",
                self.location_name, self.troops_lost
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

/// This turn's battle plan.
#[derive(Debug, Clone)]
pub struct Combat {
    settings: CombatConfig,
    target: Option<LocationId>,
    roster: BTreeMap<ChampionId, Deployment>,
    raid_mode: bool,
    previewed: bool,
    confirmed: bool,
    settled: bool,
}

impl Combat {
    /// An idle plan.
    pub const fn new(settings: CombatConfig) -> Self {
        Self {
            settings,
            target: None,
            roster: BTreeMap::new(),
            raid_mode: false,
            previewed: false,
            confirmed: false,
            settled: false,
        }
    }

    /// Current planning phase.
    pub fn phase(&self) -> CombatPhase {
        if self.settled {
            CombatPhase::Settled
        } else if self.confirmed {
            CombatPhase::Confirmed
        } else if self.previewed {
            CombatPhase::Previewed
        } else if !self.roster.is_empty() {
            CombatPhase::Deploying
        } else if self.target.is_some() {
            CombatPhase::TargetSelected
        } else {
            CombatPhase::Idle
        }
    }

    /// Selected target.
    pub const fn target(&self) -> Option<LocationId> {
        self.target
    }

    /// Deployed champions.
    pub fn roster(&self) -> impl Iterator<Item = &Deployment> {
        self.roster.values()
    }

    /// Whether raid mode is on.
    pub const fn raid_mode(&self) -> bool {
        self.raid_mode
    }

    /// Whether the battle will be fought at settlement.
    pub const fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    const fn ensure_open(&self) -> Result<(), CombatError> {
        if self.settled {
            Err(CombatError::AlreadySettled)
        } else if self.confirmed {
            Err(CombatError::AlreadyConfirmed)
        } else {
            Ok(())
        }
    }

    const fn power_coefficient(&self) -> f64 {
        if self.raid_mode {
            self.settings.raid_power_coefficient
        } else {
            1.0
        }
    }

    fn action_points(&self) -> u32 {
        if self.roster.is_empty() {
            0
        } else if self.raid_mode {
            self.settings.raid_action_points
        } else {
            self.settings.normal_action_points
        }
    }

    fn friendly_power(&self) -> f64 {
        self.roster.values().map(|d| d.power).sum()
    }

    // -- planning ----------------------------------------------------------

    /// Select the location to attack.
    pub fn select_target(
        &mut self,
        world: &World,
        location: LocationId,
    ) -> Result<(), CombatError> {
        self.ensure_open()?;
        if world.registry.location(location).is_none() {
            return Err(CombatError::LocationNotFound(location));
        }
        self.target = Some(location);
        self.previewed = false;
        debug!(location = %location, "combat target selected");
        Ok(())
    }

    /// Drop the selected target.
    pub fn clear_target(&mut self) -> Result<Option<LocationId>, CombatError> {
        self.ensure_open()?;
        self.previewed = false;
        Ok(self.target.take())
    }

    /// Switch raid mode, re-snapshotting every deployment's power.
    pub fn set_raid_mode(&mut self, world: &World, raid: bool) -> Result<(), CombatError> {
        self.ensure_open()?;
        self.raid_mode = raid;
        self.previewed = false;
        let coefficient = self.power_coefficient();
        for deployment in self.roster.values_mut() {
            if let Some(champion) = world.registry.champion(deployment.champion) {
                deployment.power = champion.combat_power() * coefficient;
            }
        }
        Ok(())
    }

    /// Put a champion on the roster and claim them in the scheduler.
    pub fn add_deployed_champion(
        &mut self,
        world: &World,
        scheduler: &mut Scheduler,
        champion: ChampionId,
    ) -> Result<&Deployment, CombatError> {
        self.ensure_open()?;
        let found = world
            .registry
            .champion(champion)
            .ok_or(CombatError::ChampionNotFound(champion))?;
        if self.roster.contains_key(&champion) {
            return Err(CombatError::AlreadyDeployed(champion));
        }
        if !scheduler.reserve(ActorRef::Champion(champion).into()) {
            return Err(CombatError::ChampionOccupied(champion));
        }
        let power = found.combat_power() * self.power_coefficient();
        self.previewed = false;
        info!(champion = %champion, power, raid = self.raid_mode, "champion deployed");
        Ok(self.roster.entry(champion).or_insert(Deployment {
            champion,
            name: found.name().to_owned(),
            power,
        }))
    }

    /// Take a champion off the roster and release their claim.
    pub fn remove_deployed_champion(
        &mut self,
        scheduler: &mut Scheduler,
        champion: ChampionId,
    ) -> Result<Deployment, CombatError> {
        self.ensure_open()?;
        let deployment = self
            .roster
            .remove(&champion)
            .ok_or(CombatError::NotDeployed(champion))?;
        scheduler.release(EntityRef::Champion(champion));
        self.previewed = false;
        debug!(champion = %champion, "champion withdrawn");
        Ok(deployment)
    }

    // -- preview and confirmation -----------------------------------------

    /// Evaluate the current plan.
    ///
    /// An unscouted target does not block the battle: the preview stays
    /// executable and reports no estimate or probability.
    pub fn preview(&mut self, world: &World) -> CombatPreview {
        let preview = self.evaluate(world);
        self.previewed = preview.executable;
        preview
    }

    fn evaluate(&self, world: &World) -> CombatPreview {
        let friendly_power = self.friendly_power();
        let location = self.target.and_then(|id| world.registry.location(id));
        let reason = match (self.target, location) {
            (None, _) => Some("no target selected"),
            (Some(_), None) => Some("target no longer exists"),
            _ if self.roster.is_empty() => Some("no champion deployed"),
            _ => None,
        };
        let enemy_estimate = location.and_then(warband_entities::Location::estimated_power);
        let win_probability = location.and_then(|l| {
            l.estimated_power()
                .map(|enemy| win_probability(friendly_power, enemy, l.reconnaissance_ratio()))
        });
        CombatPreview {
            executable: reason.is_none(),
            reason: reason.map(str::to_owned),
            target: self.target,
            enemy_estimate,
            friendly_power,
            champions: self.roster.len(),
            action_points: self.action_points(),
            raid_mode: self.raid_mode,
            win_probability,
        }
    }

    /// Commit to fighting at settlement. Requires an executable plan.
    pub fn confirm(&mut self, world: &World) -> Result<(), CombatError> {
        if self.confirmed {
            return Ok(());
        }
        let preview = self.evaluate(world);
        if let Some(reason) = preview.reason {
            return Err(CombatError::NotExecutable { reason });
        }
        self.confirmed = true;
        info!(
            champions = preview.champions,
            friendly_power = preview.friendly_power,
            "combat confirmed"
        );
        Ok(())
    }

    /// Withdraw the confirmation and re-open planning.
    pub const fn cancel_confirmation(&mut self) {
        self.confirmed = false;
        self.previewed = false;
    }

    // -- settlement --------------------------------------------------------

    /// Fight the confirmed battle against the target's true power.
    ///
    /// Casualties are applied to every deployed pool; on victory every
    /// discovered ward at the target joins the player's roster. The roster
    /// and target are cleared whatever the outcome.
    pub fn execute(
        &mut self,
        world: &mut World,
        scheduler: &mut Scheduler,
        rng: &mut dyn RngCore,
    ) -> Result<BattleReport, CombatError> {
        if !self.confirmed {
            return Err(CombatError::NotConfirmed);
        }
        let action_points = self.action_points();
        let raid_mode = self.raid_mode;
        let friendly_power = self.friendly_power();
        let roster = core::mem::take(&mut self.roster);
        let target = self.target.take();
        self.confirmed = false;
        self.previewed = false;
        self.settled = true;
        for champion in roster.keys() {
            scheduler.release(EntityRef::Champion(*champion));
        }

        let Some(location_id) = target else {
            return Err(CombatError::NotExecutable {
                reason: String::from("no target selected"),
            });
        };
        let location = world
            .registry
            .location_mut(location_id)
            .ok_or(CombatError::LocationNotFound(location_id))?;
        let location_name = location.name().to_owned();
        let enemy_power = location.combat_power();
        let probability =
            win_probability(friendly_power, enemy_power, location.reconnaissance_ratio());
        let roll: f64 = rng.random();
        let victory = roll < probability;
        let captured_wards = if victory {
            location.capture_all_discovered()
        } else {
            Vec::new()
        };

        let ratio = power_ratio(friendly_power, enemy_power);
        let fraction = casualty_fraction(&self.settings, ratio, victory);
        let mut losses = BTreeMap::new();
        let mut troops_lost = 0_u64;
        for champion in roster.keys() {
            let Some(found) = world.registry.champion_mut(*champion) else {
                warn!(champion = %champion, "deployed champion vanished before battle");
                continue;
            };
            let lost = found.pool_mut().apply_casualties(fraction);
            troops_lost = lost
                .values()
                .fold(troops_lost, |acc, n| acc.saturating_add(u64::from(*n)));
            losses.insert(*champion, lost);
        }

        let captured = captured_wards
            .into_iter()
            .map(|ward| {
                let name = ward.name().to_owned();
                let id = world.registry.add_ward(ward);
                CapturedWard { id, name }
            })
            .collect();

        let report = BattleReport {
            location: location_id,
            location_name,
            victory,
            win_probability: probability,
            roll,
            friendly_power,
            enemy_power,
            casualty_fraction: fraction,
            losses,
            troops_lost,
            captured,
            action_points,
            raid_mode,
        };
        info!(
            location = %location_id,
            victory,
            probability,
            roll,
            troops_lost,
            captured = report.captured.len(),
            "battle settled"
        );
        Ok(report)
    }

    /// Clear roster, target, raid mode, and confirmation, releasing claims.
    pub fn reset_turn(&mut self, scheduler: &mut Scheduler) {
        for champion in self.roster.keys() {
            scheduler.release(EntityRef::Champion(*champion));
        }
        self.roster.clear();
        self.target = None;
        self.raid_mode = false;
        self.previewed = false;
        self.confirmed = false;
        self.settled = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use warband_entities::{Champion, ChampionStats, Location, Ward, WardProfile};

    use super::*;
    use crate::config::GameConfig;
    use crate::scheduler::{TaskKind, TaskOutcome};

    struct Fixture {
        world: World,
        scheduler: Scheduler,
        combat: Combat,
        champion: ChampionId,
        location: LocationId,
    }

    /// A champion whose power equals their troop count (no intellect or
    /// agility bonus).
    fn plain_champion(troops: u32) -> Champion {
        let mut champion = Champion::new(
            "Brakka",
            "north",
            ChampionStats {
                might: 100,
                agility: 0,
                intellect: 0,
            },
        );
        champion.pool_mut().add_troops(troops, ArmamentTier::Unarmed);
        champion
    }

    fn fixture(troops: u32, location_power: i64) -> Fixture {
        let mut world = World::from_config(&GameConfig::default());
        let champion = world.registry.add_champion(plain_champion(troops));
        let location = world
            .registry
            .add_location(Location::with_power("Millbrook", "village", location_power, 100));
        let mut scheduler = Scheduler::new(3);
        scheduler
            .register(TaskKind::new("drill", |_, _, _| TaskOutcome::completed("drilled")))
            .unwrap();
        Fixture {
            world,
            scheduler,
            combat: Combat::new(CombatConfig::default()),
            champion,
            location,
        }
    }

    #[test]
    fn full_scouting_gives_the_reference_probability() {
        let p = win_probability(150.0, 100.0, 1.0);
        let expected = 0.5 + (150.0_f64 / 101.0).ln();
        assert!((p - expected).abs() < 1e-12);
        assert!((p - 0.9).abs() < 0.01);
    }

    #[test]
    fn probability_is_clamped() {
        assert!((win_probability(10_000.0, 1.0, 1.0) - 1.0).abs() < f64::EPSILON);
        assert!(win_probability(0.0, 100.0, 1.0).abs() < f64::EPSILON);
        // less scouting shrinks the bonus
        assert!(win_probability(150.0, 100.0, 0.0) < win_probability(150.0, 100.0, 1.0));
    }

    #[test]
    fn casualty_fractions_respect_caps() {
        let settings = CombatConfig::default();
        assert!((casualty_fraction(&settings, 0.1, true) - 0.6).abs() < 1e-12);
        assert!(casualty_fraction(&settings, 3.0, true).abs() < f64::EPSILON);
        assert!((casualty_fraction(&settings, 1.5, true) - 0.2).abs() < 1e-12);
        assert!((casualty_fraction(&settings, 0.1, false) - 0.8).abs() < 1e-12);
        assert!((casualty_fraction(&settings, 2.0, false) - 0.2).abs() < 1e-12);
        assert!((casualty_fraction(&settings, 0.0, false) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn phases_follow_planning() {
        let mut f = fixture(150, 100);
        assert_eq!(f.combat.phase(), CombatPhase::Idle);
        f.combat.select_target(&f.world, f.location).unwrap();
        assert_eq!(f.combat.phase(), CombatPhase::TargetSelected);
        f.combat
            .add_deployed_champion(&f.world, &mut f.scheduler, f.champion)
            .unwrap();
        assert_eq!(f.combat.phase(), CombatPhase::Deploying);
        assert!(f.combat.preview(&f.world).executable);
        assert_eq!(f.combat.phase(), CombatPhase::Previewed);
        f.combat.confirm(&f.world).unwrap();
        assert_eq!(f.combat.phase(), CombatPhase::Confirmed);
    }

    #[test]
    fn unscouted_target_previews_without_probability() {
        let mut f = fixture(150, 100);
        f.combat.select_target(&f.world, f.location).unwrap();
        f.combat
            .add_deployed_champion(&f.world, &mut f.scheduler, f.champion)
            .unwrap();
        let preview = f.combat.preview(&f.world);
        assert!(preview.executable);
        assert!(preview.enemy_estimate.is_none());
        assert!(preview.win_probability.is_none());
        assert_eq!(preview.action_points, 3);
        assert!((preview.friendly_power - 150.0).abs() < 1e-9);
    }

    #[test]
    fn preview_explains_what_is_missing() {
        let mut f = fixture(150, 100);
        let preview = f.combat.preview(&f.world);
        assert_eq!(preview.reason.as_deref(), Some("no target selected"));
        assert_eq!(preview.action_points, 0);
        f.combat.select_target(&f.world, f.location).unwrap();
        let preview = f.combat.preview(&f.world);
        assert_eq!(preview.reason.as_deref(), Some("no champion deployed"));
        let err = f.combat.confirm(&f.world).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidState);
    }

    #[test]
    fn deployment_and_tasking_are_exclusive() {
        let mut f = fixture(10, 100);
        let actor = ActorRef::Champion(f.champion);
        f.scheduler.publish(&f.world, "drill", actor, None).unwrap();
        let err = f
            .combat
            .add_deployed_champion(&f.world, &mut f.scheduler, f.champion)
            .unwrap_err();
        assert_eq!(err, CombatError::ChampionOccupied(f.champion));

        let mut g = fixture(10, 100);
        g.combat
            .add_deployed_champion(&g.world, &mut g.scheduler, g.champion)
            .unwrap();
        assert!(g
            .scheduler
            .publish(&g.world, "drill", ActorRef::Champion(g.champion), None)
            .is_err());
        let err = g
            .combat
            .add_deployed_champion(&g.world, &mut g.scheduler, g.champion)
            .unwrap_err();
        assert_eq!(err, CombatError::AlreadyDeployed(g.champion));

        g.combat
            .remove_deployed_champion(&mut g.scheduler, g.champion)
            .unwrap();
        assert!(g
            .scheduler
            .publish(&g.world, "drill", ActorRef::Champion(g.champion), None)
            .is_ok());
    }

    #[test]
    fn raid_mode_discounts_power_and_costs_less() {
        let mut f = fixture(100, 100);
        f.combat.select_target(&f.world, f.location).unwrap();
        f.combat
            .add_deployed_champion(&f.world, &mut f.scheduler, f.champion)
            .unwrap();
        f.combat.set_raid_mode(&f.world, true).unwrap();
        let preview = f.combat.preview(&f.world);
        assert!((preview.friendly_power - 80.0).abs() < 1e-9);
        assert_eq!(preview.action_points, 2);
    }

    #[test]
    fn confirmation_freezes_planning() {
        let mut f = fixture(100, 100);
        f.combat.select_target(&f.world, f.location).unwrap();
        f.combat
            .add_deployed_champion(&f.world, &mut f.scheduler, f.champion)
            .unwrap();
        f.combat.confirm(&f.world).unwrap();
        assert_eq!(f.combat.clear_target(), Err(CombatError::AlreadyConfirmed));
        assert_eq!(
            f.combat
                .remove_deployed_champion(&mut f.scheduler, f.champion)
                .unwrap_err(),
            CombatError::AlreadyConfirmed
        );
        f.combat.cancel_confirmation();
        assert!(f.combat.clear_target().unwrap().is_some());
    }

    #[test]
    fn overwhelming_victory_captures_discovered_wards() {
        let mut f = fixture(5000, 10);
        let location = f.world.registry.location_mut(f.location).unwrap();
        let hidden = Ward::new(WardProfile {
            name: String::from("Hidden"),
            ..WardProfile::default()
        });
        let found = Ward::new(WardProfile {
            name: String::from("Ysolde"),
            ..WardProfile::default()
        });
        let found_id = found.id();
        location.add_potential_ward(hidden);
        location.add_potential_ward(found);
        location.promote_to_discovered(found_id).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        location.advance_reconnaissance(100, &mut rng);

        f.combat.select_target(&f.world, f.location).unwrap();
        f.combat
            .add_deployed_champion(&f.world, &mut f.scheduler, f.champion)
            .unwrap();
        f.combat.confirm(&f.world).unwrap();
        let report = f
            .combat
            .execute(&mut f.world, &mut f.scheduler, &mut rng)
            .unwrap();

        assert!(report.victory);
        assert!(report.casualty_fraction.abs() < f64::EPSILON);
        assert_eq!(report.captured.len(), 1);
        assert!(f.world.registry.ward(found_id).is_some());
        assert_eq!(
            f.world.registry.location(f.location).unwrap().ward_counts(),
            (1, 0)
        );
        assert_eq!(
            report.summary(),
            "battle against Millbrook won, captured Ysolde, lost 0 troops"
        );
        assert_eq!(f.combat.phase(), CombatPhase::Settled);
        assert_eq!(
            f.combat.select_target(&f.world, f.location).unwrap_err(),
            CombatError::AlreadySettled
        );
        assert!(!f.scheduler.is_claimed(ActorRef::Champion(f.champion).into()));
        f.combat.reset_turn(&mut f.scheduler);
        assert_eq!(f.combat.phase(), CombatPhase::Idle);
    }

    #[test]
    fn hopeless_attack_loses_and_takes_casualties() {
        let mut f = fixture(10, 10_000);
        f.combat.select_target(&f.world, f.location).unwrap();
        f.combat
            .add_deployed_champion(&f.world, &mut f.scheduler, f.champion)
            .unwrap();
        f.combat.confirm(&f.world).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let report = f
            .combat
            .execute(&mut f.world, &mut f.scheduler, &mut rng)
            .unwrap();
        assert!(!report.victory);
        assert!((report.casualty_fraction - 0.8).abs() < 1e-12);
        assert_eq!(report.troops_lost, 8);
        assert_eq!(
            f.world
                .registry
                .champion(f.champion)
                .unwrap()
                .pool()
                .total_count(),
            2
        );
        assert_eq!(report.summary(), "battle against Millbrook lost, lost 8 troops");
    }

    #[test]
    fn execute_requires_confirmation() {
        let mut f = fixture(10, 10);
        let mut rng = SmallRng::seed_from_u64(42);
        assert_eq!(
            f.combat
                .execute(&mut f.world, &mut f.scheduler, &mut rng)
                .unwrap_err(),
            CombatError::NotConfirmed
        );
    }

    #[test]
    fn reset_turn_releases_everyone() {
        let mut f = fixture(10, 10);
        f.combat.select_target(&f.world, f.location).unwrap();
        f.combat
            .add_deployed_champion(&f.world, &mut f.scheduler, f.champion)
            .unwrap();
        f.combat.set_raid_mode(&f.world, true).unwrap();
        f.combat.reset_turn(&mut f.scheduler);
        assert_eq!(f.combat.phase(), CombatPhase::Idle);
        assert!(!f.combat.raid_mode());
        assert!(!f.scheduler.is_claimed(ActorRef::Champion(f.champion).into()));
    }
}
