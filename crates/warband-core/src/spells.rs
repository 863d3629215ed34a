//! Once-per-turn spell casting paid for with the lord's mana.
//!
//! Only one spell may be cast per turn across the whole spell book. The
//! requested multiplier is clamped to `[1, max_multiplier]` and the cost is
//! `base_price x multiplier`. The cast is recorded before `cast` returns and
//! the record survives until [`SpellBook::reset_turn`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use warband_entities::EntityError;
use warband_types::{FailureKind, TargetRef};

use crate::world::World;

/// Errors returned by spell casting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpellError {
    /// A spell was already cast this turn.
    #[error("a spell was already cast this turn: {spell}")]
    AlreadyCast {
        /// The spell cast earlier.
        spell: String,
    },

    /// No spell is registered under this name.
    #[error("unknown spell: {0}")]
    UnknownSpell(String),

    /// A spell with this name is already registered.
    #[error("spell already registered: {0}")]
    DuplicateSpell(String),

    /// The lord cannot pay the cost.
    #[error("insufficient mana: needs {required}, has {current}")]
    InsufficientMana {
        /// Cost of the cast.
        required: i64,
        /// Mana on hand.
        current: i64,
    },

    /// The lord rejected the mana deduction.
    #[error(transparent)]
    Entity(#[from] EntityError),
}

impl SpellError {
    /// The failure class this error belongs to.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::AlreadyCast { .. } | Self::DuplicateSpell(_) => FailureKind::InvalidState,
            Self::UnknownSpell(_) => FailureKind::NotFound,
            Self::InsufficientMana { .. } => FailureKind::InsufficientResource,
            Self::Entity(e) => e.kind(),
        }
    }
}

/// What a spell effect is told about the cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpellInvocation {
    /// Clamped multiplier.
    pub multiplier: u32,
    /// Optional target.
    pub target: Option<TargetRef>,
    /// Turn of the cast.
    pub turn: u64,
}

/// Applies a spell and describes what happened.
pub type SpellEffect = Box<dyn Fn(&mut World, &SpellInvocation) -> String>;

/// A castable spell.
pub struct Spell {
    name: String,
    base_price: u32,
    max_multiplier: u32,
    effect: SpellEffect,
}

impl Spell {
    /// A spell costing `base_price` mana per multiplier step, up to
    /// `max_multiplier` steps. A cap of zero is treated as one.
    pub fn new(
        name: impl Into<String>,
        base_price: u32,
        max_multiplier: u32,
        effect: impl Fn(&mut World, &SpellInvocation) -> String + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            base_price,
            max_multiplier: max_multiplier.max(1),
            effect: Box::new(effect),
        }
    }

    /// Spell name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mana per multiplier step.
    pub const fn base_price(&self) -> u32 {
        self.base_price
    }

    /// Highest multiplier accepted.
    pub const fn max_multiplier(&self) -> u32 {
        self.max_multiplier
    }

    /// Clamp a requested multiplier into `[1, max_multiplier]`.
    pub fn clamp_multiplier(&self, requested: u32) -> u32 {
        requested.clamp(1, self.max_multiplier)
    }

    /// Cost of casting at `requested` (after clamping).
    pub fn cost(&self, requested: u32) -> i64 {
        i64::from(self.base_price).saturating_mul(i64::from(self.clamp_multiplier(requested)))
    }
}

impl fmt::Debug for Spell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spell")
            .field("name", &self.name)
            .field("base_price", &self.base_price)
            .field("max_multiplier", &self.max_multiplier)
            .finish_non_exhaustive()
    }
}

/// Record of this turn's cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellCast {
    /// Spell name.
    pub spell: String,
    /// Clamped multiplier.
    pub multiplier: u32,
    /// Mana paid.
    pub cost: i64,
    /// Optional target.
    pub target: Option<TargetRef>,
    /// Turn of the cast.
    pub turn: u64,
    /// What the effect reported.
    pub message: String,
}

impl SpellCast {
    /// One-line description for the turn log.
    pub fn log_line(&self) -> String {
        format!(
            "cast {} x{} for {} mana: {}",
            self.spell, self.multiplier, self.cost, self.message
        )
    }
}

/// The registered spells and this turn's cast.
#[derive(Debug, Default)]
pub struct SpellBook {
    spells: BTreeMap<String, Spell>,
    cast_this_turn: Option<SpellCast>,
}

impl SpellBook {
    /// An empty spell book.
    pub const fn new() -> Self {
        Self {
            spells: BTreeMap::new(),
            cast_this_turn: None,
        }
    }

    /// Register a spell.
    pub fn register(&mut self, spell: Spell) -> Result<(), SpellError> {
        if self.spells.contains_key(spell.name()) {
            return Err(SpellError::DuplicateSpell(spell.name.clone()));
        }
        self.spells.insert(spell.name.clone(), spell);
        Ok(())
    }

    /// Registered spell names, sorted.
    pub fn spell_names(&self) -> impl Iterator<Item = &str> {
        self.spells.keys().map(String::as_str)
    }

    /// A registered spell.
    pub fn spell(&self, name: &str) -> Option<&Spell> {
        self.spells.get(name)
    }

    /// Cost of casting `name` at `multiplier`, without casting.
    pub fn estimate_cost(&self, name: &str, multiplier: u32) -> Option<i64> {
        self.spells.get(name).map(|s| s.cost(multiplier))
    }

    /// Whether a cast of `name` at `multiplier` would currently succeed.
    pub fn can_cast(&self, world: &World, name: &str, multiplier: u32) -> bool {
        self.cast_this_turn.is_none()
            && self
                .estimate_cost(name, multiplier)
                .is_some_and(|cost| world.registry.lord().has_mana(cost))
    }

    /// This turn's cast, if any.
    pub const fn cast_record(&self) -> Option<&SpellCast> {
        self.cast_this_turn.as_ref()
    }

    /// Cast a spell.
    ///
    /// Checks, in order: already cast this turn, unknown spell, mana. On
    /// success mana is deducted, the effect runs, and the cast is recorded.
    pub fn cast(
        &mut self,
        world: &mut World,
        name: &str,
        multiplier: u32,
        target: Option<TargetRef>,
    ) -> Result<&SpellCast, SpellError> {
        if let Some(previous) = &self.cast_this_turn {
            return Err(SpellError::AlreadyCast {
                spell: previous.spell.clone(),
            });
        }
        let spell = self
            .spells
            .get(name)
            .ok_or_else(|| SpellError::UnknownSpell(name.to_owned()))?;
        let multiplier = spell.clamp_multiplier(multiplier);
        let cost = spell.cost(multiplier);
        let current = world.registry.lord().mana();
        if current < cost {
            return Err(SpellError::InsufficientMana {
                required: cost,
                current,
            });
        }
        world.registry.lord_mut().spend_mana(cost)?;

        let invocation = SpellInvocation {
            multiplier,
            target,
            turn: world.turn(),
        };
        let message = (spell.effect)(world, &invocation);
        info!(spell = name, multiplier, cost, "spell cast");
        Ok(self.cast_this_turn.insert(SpellCast {
            spell: name.to_owned(),
            multiplier,
            cost,
            target,
            turn: invocation.turn,
            message,
        }))
    }

    /// Clear the once-per-turn flag and the cast record.
    pub fn reset_turn(&mut self) -> Option<SpellCast> {
        self.cast_this_turn.take()
    }
}
