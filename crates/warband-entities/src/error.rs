//! Error types for the warband-entities crate.
//!
//! Entity operations never panic. Each error maps onto one
//! [`FailureKind`] so callers can classify it without matching variants.

use warband_types::{ArmamentTier, ChampionId, EntityRef, FailureKind};

/// Errors raised by entity and registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityError {
    /// A constraint was declared with `min > max`.
    #[error("invalid constraint: min {min} exceeds max {max}")]
    InvalidConstraint {
        /// Requested lower bound.
        min: i64,
        /// Requested upper bound.
        max: i64,
    },

    /// A constraint would let a linked attribute escape its partner.
    #[error("constraint [{min}, {max}] conflicts with linked attribute {linked} (limit {limit})")]
    LinkedConstraint {
        /// Requested lower bound.
        min: i64,
        /// Requested upper bound.
        max: i64,
        /// The partner attribute.
        linked: &'static str,
        /// The partner's bound the request crossed.
        limit: i64,
    },

    /// Amounts passed to resource operations must not be negative.
    #[error("amount must not be negative, got {amount}")]
    NegativeAmount {
        /// The rejected amount.
        amount: i64,
    },

    /// The lord cannot cover a mana cost.
    #[error("insufficient mana: needs {required}, has {current}")]
    InsufficientMana {
        /// Mana held.
        current: i64,
        /// Mana needed.
        required: i64,
    },

    /// A ward has too little breeding value left.
    #[error("insufficient breeding value: needs {required}, has {current}")]
    InsufficientBreeding {
        /// Remaining breeding value.
        current: i64,
        /// Breeding value needed.
        required: i64,
    },

    /// The referenced entity is not registered.
    #[error("entity not found: {0}")]
    NotFound(EntityRef),
}

impl EntityError {
    /// The failure class this error belongs to.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidConstraint { .. }
            | Self::LinkedConstraint { .. }
            | Self::NegativeAmount { .. } => FailureKind::PreconditionFailed,
            Self::InsufficientMana { .. } | Self::InsufficientBreeding { .. } => {
                FailureKind::InsufficientResource
            }
            Self::NotFound(_) => FailureKind::NotFound,
        }
    }
}

/// Errors raised by the troop allocator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// The champion is not on the roster.
    #[error("champion not found: {0}")]
    ChampionNotFound(ChampionId),

    /// The champion's pool already holds as many troops as it can command.
    #[error("champion pool full: capacity {capacity}")]
    PoolFull {
        /// The champion's command capacity.
        capacity: u32,
    },

    /// The source pool had none of the requested troops.
    #[error("no troops available to move")]
    NothingAvailable,

    /// The champion's pool is already empty.
    #[error("champion pool is empty")]
    PoolEmpty,

    /// Upgrades need a tier below the requested one.
    #[error("{tier} troops cannot be upgraded into: no lower tier")]
    NoLowerTier {
        /// The requested destination tier.
        tier: ArmamentTier,
    },
}

impl AllocationError {
    /// The failure class this error belongs to.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::ChampionNotFound(_) => FailureKind::NotFound,
            Self::PoolFull { .. } | Self::NothingAvailable | Self::PoolEmpty => {
                FailureKind::InsufficientResource
            }
            Self::NoLowerTier { .. } => FailureKind::PreconditionFailed,
        }
    }
}
