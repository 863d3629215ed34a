//! The lord: the player's avatar and keeper of the mana pool.

use serde::{Deserialize, Serialize};
use tracing::debug;

use warband_types::{EntityRef, LordId};

use crate::attributes::{
    check_linked_range, relink_max, AttributeKey, Attributed, Bounded, EntityCore,
};
use crate::error::EntityError;

/// Numeric attributes of the lord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LordAttr {
    /// Current mana, within `[0, max_mana]`.
    Mana,
    /// Mana ceiling, never negative.
    MaxMana,
}

impl AttributeKey for LordAttr {
    const ALL: &'static [Self] = &[Self::Mana, Self::MaxMana];

    fn name(self) -> &'static str {
        match self {
            Self::Mana => "mana",
            Self::MaxMana => "max_mana",
        }
    }
}

/// Outcome of [`Lord::gain_mana`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaGain {
    /// Mana actually added.
    pub gained: i64,
    /// Mana after the gain.
    pub current: i64,
    /// Mana that did not fit under the ceiling.
    pub overflow: i64,
}

/// The player's avatar.
#[derive(Debug)]
pub struct Lord {
    id: LordId,
    core: EntityCore,
    name: String,
    mana: Bounded,
    max_mana: Bounded,
}

impl Lord {
    /// Default mana ceiling.
    pub const DEFAULT_MAX_MANA: i64 = 100;

    /// A lord with `mana` out of `max_mana`.
    pub fn new(name: impl Into<String>, mana: i64, max_mana: i64) -> Self {
        let id = LordId::new();
        let max_mana = Bounded::at_least(max_mana, 0);
        Self {
            id,
            core: EntityCore::new(EntityRef::Lord(id)),
            name: name.into(),
            mana: Bounded::new(mana, 0, max_mana.get()),
            max_mana,
        }
    }

    /// Lord identifier.
    pub const fn id(&self) -> LordId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the lord.
    pub fn set_name(&mut self, name: impl Into<String>) {
        let old = core::mem::replace(&mut self.name, name.into());
        self.core.emit_text("name", old, self.name.clone());
    }

    /// Current mana.
    pub const fn mana(&self) -> i64 {
        self.mana.get()
    }

    /// Mana ceiling.
    pub const fn max_mana(&self) -> i64 {
        self.max_mana.get()
    }

    /// Whether `amount` mana is available.
    pub const fn has_mana(&self, amount: i64) -> bool {
        self.mana.get() >= amount
    }

    /// Current mana as a percentage of the ceiling.
    #[allow(clippy::cast_precision_loss)]
    pub fn mana_percent(&self) -> f64 {
        let max = self.max_mana();
        if max <= 0 {
            return 0.0;
        }
        // Both values are bounded game quantities, far inside f64 precision.
        self.mana() as f64 / max as f64 * 100.0
    }

    /// Deduct mana. Fails without mutation when short.
    pub fn spend_mana(&mut self, amount: i64) -> Result<i64, EntityError> {
        if amount < 0 {
            return Err(EntityError::NegativeAmount { amount });
        }
        let current = self.mana();
        if current < amount {
            return Err(EntityError::InsufficientMana {
                current,
                required: amount,
            });
        }
        let remaining = self.set_attribute(LordAttr::Mana, current.saturating_sub(amount));
        debug!(lord = %self.id, spent = amount, remaining, "mana spent");
        Ok(remaining)
    }

    /// Add mana up to the ceiling; the excess is reported as overflow.
    pub fn gain_mana(&mut self, amount: i64) -> Result<ManaGain, EntityError> {
        if amount < 0 {
            return Err(EntityError::NegativeAmount { amount });
        }
        let before = self.mana();
        let current = self.set_attribute(LordAttr::Mana, before.saturating_add(amount));
        let gained = current.saturating_sub(before);
        Ok(ManaGain {
            gained,
            current,
            overflow: amount.saturating_sub(gained),
        })
    }
}

impl Attributed for Lord {
    type Key = LordAttr;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn field(&self, key: LordAttr) -> Bounded {
        match key {
            LordAttr::Mana => self.mana,
            LordAttr::MaxMana => self.max_mana,
        }
    }

    fn field_mut(&mut self, key: LordAttr) -> &mut Bounded {
        match key {
            LordAttr::Mana => &mut self.mana,
            LordAttr::MaxMana => &mut self.max_mana,
        }
    }

    fn after_write(&mut self, key: LordAttr) {
        let cap = self.max_mana.get();
        let max = match key {
            LordAttr::MaxMana => cap,
            LordAttr::Mana => self.mana.max().min(cap),
        };
        relink_max(&mut self.core, &mut self.mana, LordAttr::Mana.name(), max);
    }

    fn check_constraint(&self, key: LordAttr, min: i64, max: i64) -> Result<(), EntityError> {
        let parent = (LordAttr::MaxMana.name(), self.max_mana);
        let child = (LordAttr::Mana.name(), self.mana);
        check_linked_range(parent, child, key == LordAttr::Mana, min, max)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn spend_reports_current_and_required() {
        let mut lord = Lord::new("Aldric", 30, 100);
        let err = lord.spend_mana(50).unwrap_err();
        assert_eq!(
            err,
            EntityError::InsufficientMana {
                current: 30,
                required: 50
            }
        );
        assert_eq!(lord.mana(), 30);
        assert_eq!(lord.spend_mana(30).unwrap(), 0);
    }

    #[test]
    fn gain_caps_at_max_and_reports_overflow() {
        let mut lord = Lord::new("Aldric", 90, 100);
        let gain = lord.gain_mana(25).unwrap();
        assert_eq!(
            gain,
            ManaGain {
                gained: 10,
                current: 100,
                overflow: 15
            }
        );
        assert!((lord.mana_percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lowering_max_mana_caps_mana() {
        let mut lord = Lord::new("Aldric", 80, 100);
        lord.set_attribute(LordAttr::MaxMana, 40);
        assert_eq!(lord.mana(), 40);
        assert_eq!(lord.set_attribute(LordAttr::MaxMana, -10), 0);
        assert_eq!(lord.mana(), 0);
    }

    #[test]
    fn negative_amounts_rejected() {
        let mut lord = Lord::new("Aldric", 10, 100);
        assert!(matches!(
            lord.spend_mana(-1),
            Err(EntityError::NegativeAmount { amount: -1 })
        ));
        assert_eq!(lord.attribute_by_name("mana", -1), 10);
        assert_eq!(lord.attribute_by_name("gold", -1), -1);
    }

    #[test]
    fn mana_constraints_respect_max_mana() {
        let mut lord = Lord::new("Aldric", 80, 100);
        assert!(matches!(
            lord.set_constraint(LordAttr::Mana, 0, 500),
            Err(EntityError::LinkedConstraint {
                linked: "max_mana",
                limit: 100,
                ..
            })
        ));
        assert!(lord.set_constraint(LordAttr::MaxMana, -20, 200).is_err());

        lord.set_constraint(LordAttr::Mana, 0, 50).unwrap();
        assert_eq!(lord.mana(), 50);
        assert_eq!(lord.gain_mana(40).unwrap().current, 50);
        assert!(lord.mana() <= lord.max_mana());
    }
}
