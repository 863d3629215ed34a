//! Champions: commanders with three bounded stats and an owned troop pool.

use serde::{Deserialize, Serialize};

use warband_types::{ChampionId, EntityRef};

use crate::attributes::{AttributeKey, Attributed, Bounded, EntityCore};
use crate::troops::{CommandStats, PoolCapacity, TroopPool};

/// Numeric attributes of a champion. All are clamped to `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChampionAttr {
    /// Strength; doubles as command capacity.
    Might,
    /// Speed; adds a flat bonus to combat power.
    Agility,
    /// Cunning; scales the power of commanded troops.
    Intellect,
}

impl AttributeKey for ChampionAttr {
    const ALL: &'static [Self] = &[Self::Might, Self::Agility, Self::Intellect];

    fn name(self) -> &'static str {
        match self {
            Self::Might => "might",
            Self::Agility => "agility",
            Self::Intellect => "intellect",
        }
    }
}

/// Initial stats for a new champion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChampionStats {
    /// Might.
    pub might: i64,
    /// Agility.
    pub agility: i64,
    /// Intellect.
    pub intellect: i64,
}

impl Default for ChampionStats {
    fn default() -> Self {
        Self {
            might: Champion::DEFAULT_STAT,
            agility: Champion::DEFAULT_STAT,
            intellect: Champion::DEFAULT_STAT,
        }
    }
}

/// A commander unit.
///
/// The champion owns its pool outright; the pool refers back only by id.
#[derive(Debug)]
pub struct Champion {
    id: ChampionId,
    core: EntityCore,
    name: String,
    origin: String,
    might: Bounded,
    agility: Bounded,
    intellect: Bounded,
    pool: TroopPool,
}

impl Champion {
    /// Stat value used when none is given.
    pub const DEFAULT_STAT: i64 = 10;
    /// Upper bound for every stat.
    pub const MAX_STAT: i64 = 100;

    /// A champion with the given stats and an empty pool under their command.
    pub fn new(name: impl Into<String>, origin: impl Into<String>, stats: ChampionStats) -> Self {
        let id = ChampionId::new();
        Self {
            id,
            core: EntityCore::new(EntityRef::Champion(id)),
            name: name.into(),
            origin: origin.into(),
            might: Self::stat(stats.might),
            agility: Self::stat(stats.agility),
            intellect: Self::stat(stats.intellect),
            pool: TroopPool::commanded_by(id),
        }
    }

    fn stat(value: i64) -> Bounded {
        Bounded::new(value, 0, Self::MAX_STAT)
    }

    /// Champion identifier.
    pub const fn id(&self) -> ChampionId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the champion came from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Current might.
    pub const fn might(&self) -> i64 {
        self.might.get()
    }

    /// Current agility.
    pub const fn agility(&self) -> i64 {
        self.agility.get()
    }

    /// Current intellect.
    pub const fn intellect(&self) -> i64 {
        self.intellect.get()
    }

    /// Sum of all three stats.
    pub const fn total_stats(&self) -> i64 {
        self.might().saturating_add(self.agility()).saturating_add(self.intellect())
    }

    /// How many troops the champion can command: their might.
    pub fn command_capacity(&self) -> u32 {
        u32::try_from(self.might()).unwrap_or(0)
    }

    /// Stats the owned pool needs for capacity and power.
    pub fn command_stats(&self) -> CommandStats {
        CommandStats {
            capacity: self.command_capacity(),
            agility: u32::try_from(self.agility()).unwrap_or(0),
            intellect: u32::try_from(self.intellect()).unwrap_or(0),
        }
    }

    /// Efficiency derived from one stat: `stat^2 / 4000`.
    #[allow(clippy::cast_precision_loss)]
    pub fn efficiency(&self, stat: ChampionAttr) -> f64 {
        // Stats are clamped to [0, 100].
        let value = self.get_attribute(stat) as f64;
        value * value / 4000.0
    }

    /// The owned pool.
    pub const fn pool(&self) -> &TroopPool {
        &self.pool
    }

    /// The owned pool, mutably.
    pub const fn pool_mut(&mut self) -> &mut TroopPool {
        &mut self.pool
    }

    /// The owned pool's capacity under this champion's command.
    pub fn pool_capacity(&self) -> PoolCapacity {
        self.pool.capacity(Some(self.command_stats()))
    }

    /// Room left in the owned pool.
    pub fn free_capacity(&self) -> u64 {
        self.pool_capacity()
            .free(self.pool.total_count())
            .unwrap_or(u64::MAX)
    }

    /// Combat power of the owned pool under this champion.
    pub fn combat_power(&self) -> f64 {
        self.pool.combat_power(Some(self.command_stats()))
    }
}

impl Attributed for Champion {
    type Key = ChampionAttr;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn field(&self, key: ChampionAttr) -> Bounded {
        match key {
            ChampionAttr::Might => self.might,
            ChampionAttr::Agility => self.agility,
            ChampionAttr::Intellect => self.intellect,
        }
    }

    fn field_mut(&mut self, key: ChampionAttr) -> &mut Bounded {
        match key {
            ChampionAttr::Might => &mut self.might,
            ChampionAttr::Agility => &mut self.agility,
            ChampionAttr::Intellect => &mut self.intellect,
        }
    }
}
