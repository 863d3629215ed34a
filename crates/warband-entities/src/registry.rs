//! The entity registry: every live entity the player can reference.
//!
//! Holds the singleton lord, the champion and ward rosters, the raidable
//! locations (which in turn hold their own wards), and the common troop
//! pool. Task and combat settlement resolve ids through
//! [`Registry::get_entity`] and the typed accessors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use warband_types::{
    ActorRef, ChampionId, EntityKind, EntityRef, LocationId, PoolId, TargetRef, WardId,
};

use crate::attributes::{Attributed, EntityCore};
use crate::champion::Champion;
use crate::error::EntityError;
use crate::location::Location;
use crate::lord::Lord;
use crate::troops::TroopPool;
use crate::ward::Ward;

/// A borrowed view of any registered entity.
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    /// The lord.
    Lord(&'a Lord),
    /// A champion.
    Champion(&'a Champion),
    /// A ward, on the roster or at a location.
    Ward(&'a Ward),
    /// A raidable location.
    Location(&'a Location),
    /// A troop pool, champion-owned or common.
    TroopPool(&'a TroopPool),
}

impl Entity<'_> {
    /// The entity's shared core.
    pub fn core(&self) -> &EntityCore {
        match self {
            Self::Lord(e) => e.core(),
            Self::Champion(e) => e.core(),
            Self::Ward(e) => e.core(),
            Self::Location(e) => e.core(),
            Self::TroopPool(e) => e.core(),
        }
    }

    /// Tagged id of the entity.
    pub fn id(&self) -> EntityRef {
        self.core().id()
    }

    /// Kind of the entity.
    pub fn kind(&self) -> EntityKind {
        self.id().kind()
    }

    /// Display name; pools are named after their id.
    pub fn name(&self) -> String {
        match self {
            Self::Lord(e) => e.name().to_owned(),
            Self::Champion(e) => e.name().to_owned(),
            Self::Ward(e) => e.name().to_owned(),
            Self::Location(e) => e.name().to_owned(),
            Self::TroopPool(e) => e.id().to_string(),
        }
    }
}

/// Counts of registered entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Champions on the roster.
    pub champions: usize,
    /// Wards on the roster.
    pub wards: usize,
    /// Raidable locations.
    pub locations: usize,
    /// Wards held at locations, discovered or not.
    pub wards_at_locations: usize,
    /// Troops across the common pool and every champion pool.
    pub troops: u64,
}

/// All live entities of one game.
#[derive(Debug)]
pub struct Registry {
    lord: Lord,
    champions: BTreeMap<ChampionId, Champion>,
    wards: BTreeMap<WardId, Ward>,
    locations: BTreeMap<LocationId, Location>,
    common_pool: TroopPool,
}

impl Registry {
    /// A registry with the given lord and nothing else.
    pub fn new(lord: Lord) -> Self {
        Self {
            lord,
            champions: BTreeMap::new(),
            wards: BTreeMap::new(),
            locations: BTreeMap::new(),
            common_pool: TroopPool::new(),
        }
    }

    // -- lookup ------------------------------------------------------------

    /// Resolve any reference to a live entity.
    pub fn get_entity(&self, id: EntityRef) -> Option<Entity<'_>> {
        match id {
            EntityRef::Lord(lord) => (self.lord.id() == lord).then_some(Entity::Lord(&self.lord)),
            EntityRef::Champion(champion) => self.champion(champion).map(Entity::Champion),
            EntityRef::Ward(ward) => self.find_ward(ward).map(Entity::Ward),
            EntityRef::Location(location) => self.location(location).map(Entity::Location),
            EntityRef::TroopPool(pool) => self.pool(pool).map(Entity::TroopPool),
        }
    }

    /// Whether an actor reference resolves.
    pub fn has_actor(&self, actor: ActorRef) -> bool {
        self.get_entity(actor.into()).is_some()
    }

    /// Whether a target reference resolves.
    pub fn has_target(&self, target: TargetRef) -> bool {
        self.get_entity(target.into()).is_some()
    }

    /// The lord.
    pub const fn lord(&self) -> &Lord {
        &self.lord
    }

    /// The lord, mutably.
    pub const fn lord_mut(&mut self) -> &mut Lord {
        &mut self.lord
    }

    /// A roster champion.
    pub fn champion(&self, id: ChampionId) -> Option<&Champion> {
        self.champions.get(&id)
    }

    /// A roster champion, mutably.
    pub fn champion_mut(&mut self, id: ChampionId) -> Option<&mut Champion> {
        self.champions.get_mut(&id)
    }

    /// Every roster champion, oldest first.
    pub fn champions(&self) -> impl Iterator<Item = &Champion> {
        self.champions.values()
    }

    /// A roster ward.
    pub fn ward(&self, id: WardId) -> Option<&Ward> {
        self.wards.get(&id)
    }

    /// A roster ward, mutably.
    pub fn ward_mut(&mut self, id: WardId) -> Option<&mut Ward> {
        self.wards.get_mut(&id)
    }

    /// Every roster ward, oldest first.
    pub fn wards(&self) -> impl Iterator<Item = &Ward> {
        self.wards.values()
    }

    /// A ward on the roster or held at any location.
    pub fn find_ward(&self, id: WardId) -> Option<&Ward> {
        self.wards
            .get(&id)
            .or_else(|| self.locations.values().find_map(|l| l.find_ward(id)))
    }

    /// A ward on the roster or held at any location, mutably.
    pub fn find_ward_mut(&mut self, id: WardId) -> Option<&mut Ward> {
        if self.wards.contains_key(&id) {
            return self.wards.get_mut(&id);
        }
        self.locations
            .values_mut()
            .find_map(|l| l.find_ward_mut(id))
    }

    /// A location.
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    /// A location, mutably.
    pub fn location_mut(&mut self, id: LocationId) -> Option<&mut Location> {
        self.locations.get_mut(&id)
    }

    /// Every location.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// The shared reserve of unassigned troops.
    pub const fn common_pool(&self) -> &TroopPool {
        &self.common_pool
    }

    /// The shared reserve, mutably.
    pub const fn common_pool_mut(&mut self) -> &mut TroopPool {
        &mut self.common_pool
    }

    /// Any pool: the common pool or a champion's.
    pub fn pool(&self, id: PoolId) -> Option<&TroopPool> {
        if self.common_pool.id() == id {
            return Some(&self.common_pool);
        }
        self.champions
            .values()
            .map(Champion::pool)
            .find(|p| p.id() == id)
    }

    /// Any pool, mutably.
    pub fn pool_mut(&mut self, id: PoolId) -> Option<&mut TroopPool> {
        if self.common_pool.id() == id {
            return Some(&mut self.common_pool);
        }
        self.champions
            .values_mut()
            .map(Champion::pool_mut)
            .find(|p| p.id() == id)
    }

    // -- registration ------------------------------------------------------

    /// Add a champion to the roster.
    pub fn add_champion(&mut self, champion: Champion) -> ChampionId {
        let id = champion.id();
        info!(champion = %id, name = champion.name(), "champion joined");
        self.champions.insert(id, champion);
        id
    }

    /// Add a ward to the roster.
    pub fn add_ward(&mut self, ward: Ward) -> WardId {
        let id = ward.id();
        info!(ward = %id, name = ward.name(), origin = ward.origin(), "ward joined roster");
        self.wards.insert(id, ward);
        id
    }

    /// Register a raidable location.
    pub fn add_location(&mut self, location: Location) -> LocationId {
        let id = location.id();
        info!(location = %id, name = location.name(), "location registered");
        self.locations.insert(id, location);
        id
    }

    /// Remove and destroy a champion. Their troops return to the common pool.
    pub fn remove_champion(&mut self, id: ChampionId) -> Result<Champion, EntityError> {
        let mut champion = self
            .champions
            .remove(&id)
            .ok_or(EntityError::NotFound(EntityRef::Champion(id)))?;
        for (tier, count) in champion.pool_mut().clear() {
            if count > 0 {
                self.common_pool.add_troops(count, tier);
            }
        }
        champion.pool_mut().core_mut().destroy();
        champion.destroy();
        info!(champion = %id, "champion removed");
        Ok(champion)
    }

    /// Remove and destroy a roster ward.
    pub fn remove_ward(&mut self, id: WardId) -> Result<Ward, EntityError> {
        let mut ward = self
            .wards
            .remove(&id)
            .ok_or(EntityError::NotFound(EntityRef::Ward(id)))?;
        ward.destroy();
        info!(ward = %id, "ward removed");
        Ok(ward)
    }

    /// Remove and destroy a location along with the wards it still holds.
    pub fn remove_location(&mut self, id: LocationId) -> Result<Location, EntityError> {
        let mut location = self
            .locations
            .remove(&id)
            .ok_or(EntityError::NotFound(EntityRef::Location(id)))?;
        let held: Vec<WardId> = location
            .potential_wards()
            .iter()
            .chain(location.discovered_wards())
            .map(Ward::id)
            .collect();
        for ward in held {
            if let Some(w) = location.find_ward_mut(ward) {
                w.destroy();
            }
        }
        location.destroy();
        info!(location = %id, "location removed");
        Ok(location)
    }

    // -- summaries ---------------------------------------------------------

    /// Troops across the common pool and every champion pool.
    pub fn total_troops(&self) -> u64 {
        self.champions
            .values()
            .map(|c| c.pool().total_count())
            .fold(self.common_pool.total_count(), u64::saturating_add)
    }

    /// Entity counts.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            champions: self.champions.len(),
            wards: self.wards.len(),
            locations: self.locations.len(),
            wards_at_locations: self
                .locations
                .values()
                .map(|l| {
                    let (potential, discovered) = l.ward_counts();
                    potential.saturating_add(discovered)
                })
                .sum(),
            troops: self.total_troops(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use warband_types::ArmamentTier;

    use super::*;
    use crate::attributes::EntityEvent;
    use crate::champion::ChampionStats;
    use crate::ward::WardProfile;

    fn registry() -> Registry {
        Registry::new(Lord::new("Aldric", 50, 100))
    }

    #[test]
    fn get_entity_resolves_every_kind() {
        let mut reg = registry();
        let champion = reg.add_champion(Champion::new("Brakka", "north", ChampionStats::default()));
        let ward = reg.add_ward(Ward::new(WardProfile::default()));
        let mut location = Location::new("Millbrook", "village");
        let hidden = Ward::new(WardProfile::default());
        let hidden_id = hidden.id();
        location.add_potential_ward(hidden);
        let location = reg.add_location(location);
        let pool = reg.champion(champion).unwrap().pool().id();
        let common = reg.common_pool().id();

        let lord = reg.lord().id();
        for id in [
            EntityRef::Lord(lord),
            EntityRef::Champion(champion),
            EntityRef::Ward(ward),
            EntityRef::Ward(hidden_id),
            EntityRef::Location(location),
            EntityRef::TroopPool(pool),
            EntityRef::TroopPool(common),
        ] {
            let entity = reg.get_entity(id).unwrap();
            assert_eq!(entity.id(), id);
        }
        assert!(reg.get_entity(EntityRef::Ward(WardId::new())).is_none());
    }

    #[test]
    fn removing_destroys_and_returns_troops() {
        let mut reg = registry();
        let mut champion = Champion::new("Brakka", "north", ChampionStats::default());
        champion.pool_mut().add_troops(6, ArmamentTier::Heavy);
        let destroyed = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&destroyed);
        champion.subscribe(Box::new(move |event| {
            if matches!(event, EntityEvent::Destroyed { .. }) {
                *flag.borrow_mut() = true;
            }
            Ok(())
        }));
        let id = reg.add_champion(champion);

        let removed = reg.remove_champion(id).unwrap();
        assert!(removed.core().is_destroyed());
        assert!(*destroyed.borrow());
        assert_eq!(reg.common_pool().count(ArmamentTier::Heavy), 6);
        assert!(matches!(
            reg.remove_champion(id),
            Err(EntityError::NotFound(EntityRef::Champion(_)))
        ));
    }

    #[test]
    fn stats_count_everything() {
        let mut reg = registry();
        reg.common_pool_mut().add_troops(40, ArmamentTier::Unarmed);
        let mut champion = Champion::new("Brakka", "north", ChampionStats::default());
        champion.pool_mut().add_troops(5, ArmamentTier::Light);
        reg.add_champion(champion);
        let mut location = Location::new("Millbrook", "village");
        location.add_potential_ward(Ward::new(WardProfile::default()));
        reg.add_location(location);

        let stats = reg.stats();
        assert_eq!(stats.champions, 1);
        assert_eq!(stats.locations, 1);
        assert_eq!(stats.wards_at_locations, 1);
        assert_eq!(stats.troops, 45);
    }
}
