//! Bounded numeric attributes and change notification.
//!
//! Each entity kind stores its numeric attributes as plain [`Bounded`]
//! fields and exposes them through a closed key enum (see [`AttributeKey`]).
//! The [`Attributed`] trait turns those fields into the uniform
//! read/write/adjust/constrain contract, and routes every write through the
//! entity's [`EntityCore`] so listeners observe `(name, old, new)`.
//!
//! Listener failures are logged and swallowed: one bad listener must never
//! break an attribute write.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use warband_types::EntityRef;

use crate::error::EntityError;

// ---------------------------------------------------------------------------
// Bounded values
// ---------------------------------------------------------------------------

/// A numeric value held inside an inclusive `[min, max]` range.
///
/// Every write clamps, so the value is in range at all times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounded {
    value: i64,
    min: i64,
    max: i64,
}

impl Bounded {
    /// A value constrained to `[min, max]`. An inverted range collapses to `min`.
    pub fn new(value: i64, min: i64, max: i64) -> Self {
        let max = max.max(min);
        Self {
            value: value.clamp(min, max),
            min,
            max,
        }
    }

    /// A value with a lower bound only.
    pub fn at_least(value: i64, min: i64) -> Self {
        Self::new(value, min, i64::MAX)
    }

    /// A value with no declared constraint.
    pub const fn unbounded(value: i64) -> Self {
        Self {
            value,
            min: i64::MIN,
            max: i64::MAX,
        }
    }

    /// Current value.
    pub const fn get(self) -> i64 {
        self.value
    }

    /// Lower bound.
    pub const fn min(self) -> i64 {
        self.min
    }

    /// Upper bound.
    pub const fn max(self) -> i64 {
        self.max
    }

    /// Write a new value, clamped. Returns the stored value.
    pub fn set(&mut self, value: i64) -> i64 {
        self.value = value.clamp(self.min, self.max);
        self.value
    }

    /// Add `delta`, saturating then clamping. Returns the stored value.
    pub fn adjust(&mut self, delta: i64) -> i64 {
        self.set(self.value.saturating_add(delta))
    }

    /// Replace the range and re-clamp the current value.
    pub fn set_range(&mut self, min: i64, max: i64) -> Result<i64, EntityError> {
        if min > max {
            return Err(EntityError::InvalidConstraint { min, max });
        }
        self.min = min;
        self.max = max;
        Ok(self.set(self.value))
    }

    /// Move only the upper bound. A bound below `min` is raised to `min`.
    pub fn set_max(&mut self, max: i64) -> i64 {
        self.max = max.max(self.min);
        self.set(self.value)
    }
}

// ---------------------------------------------------------------------------
// Events and listeners
// ---------------------------------------------------------------------------

/// The value carried by a change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    /// A numeric attribute.
    Number(i64),
    /// A text attribute such as a name.
    Text(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

/// What happened to an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityEvent {
    /// An attribute was written.
    Changed {
        /// The entity written to.
        entity: EntityRef,
        /// Attribute name.
        attribute: &'static str,
        /// Value before the write.
        old: AttrValue,
        /// Value after the write (post-clamp).
        new: AttrValue,
    },
    /// The entity was destroyed. Fired once, before listeners are cleared.
    Destroyed {
        /// The entity destroyed.
        entity: EntityRef,
    },
}

/// Error type a listener may return. It is logged, never propagated.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// A change-notification callback.
pub type Listener = Box<dyn FnMut(&EntityEvent) -> Result<(), ListenerError>>;

/// Handle returned by [`EntityCore::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListenerId(u64);

// ---------------------------------------------------------------------------
// Entity core
// ---------------------------------------------------------------------------

/// Identity, creation time, listeners, and lifecycle state shared by every
/// entity kind.
pub struct EntityCore {
    id: EntityRef,
    created_at: DateTime<Utc>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    destroyed: bool,
}

impl EntityCore {
    /// Fresh core for the entity `id`, stamped with the current time.
    pub fn new(id: EntityRef) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            listeners: Vec::new(),
            next_listener: 0,
            destroyed: false,
        }
    }

    /// The entity this core belongs to.
    pub const fn id(&self) -> EntityRef {
        self.id
    }

    /// When the entity was created.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether [`destroy`](Self::destroy) has run.
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Register a listener. The returned id unsubscribes it.
    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener = self.next_listener.saturating_add(1);
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Deliver `event` to every listener, logging individual failures.
    pub fn emit(&mut self, event: &EntityEvent) {
        for (listener_id, listener) in &mut self.listeners {
            if let Err(error) = listener(event) {
                warn!(
                    entity = %self.id,
                    listener = listener_id.0,
                    error = %error,
                    "entity listener failed"
                );
            }
        }
    }

    /// Emit a change event for a numeric attribute.
    pub fn emit_number(&mut self, attribute: &'static str, old: i64, new: i64) {
        let event = EntityEvent::Changed {
            entity: self.id,
            attribute,
            old: AttrValue::Number(old),
            new: AttrValue::Number(new),
        };
        self.emit(&event);
    }

    /// Emit a change event for a text attribute.
    pub fn emit_text(&mut self, attribute: &'static str, old: String, new: String) {
        let event = EntityEvent::Changed {
            entity: self.id,
            attribute,
            old: AttrValue::Text(old),
            new: AttrValue::Text(new),
        };
        self.emit(&event);
    }

    /// Fire the destruction event and drop every listener.
    ///
    /// Returns `false` (and does nothing) when already destroyed.
    pub fn destroy(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        let event = EntityEvent::Destroyed { entity: self.id };
        self.emit(&event);
        self.listeners.clear();
        self.destroyed = true;
        true
    }
}

impl fmt::Debug for EntityCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCore")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("listeners", &self.listeners.len())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Attribute access
// ---------------------------------------------------------------------------

/// A closed set of numeric attribute names for one entity kind.
pub trait AttributeKey: Copy + Eq + fmt::Debug + 'static {
    /// Every key, in display order.
    const ALL: &'static [Self];

    /// The attribute's name as used in events and name lookups.
    fn name(self) -> &'static str;

    /// Look a key up by name.
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

/// Uniform attribute contract over an entity's bounded fields.
///
/// Implementors provide field access; reads, writes, adjustments,
/// constraints, and event emission come for free.
pub trait Attributed {
    /// The key enum naming this entity's numeric attributes.
    type Key: AttributeKey;

    /// Shared core.
    fn core(&self) -> &EntityCore;

    /// Shared core, mutably.
    fn core_mut(&mut self) -> &mut EntityCore;

    /// The bounded field behind `key`.
    fn field(&self, key: Self::Key) -> Bounded;

    /// The bounded field behind `key`, mutably.
    fn field_mut(&mut self, key: Self::Key) -> &mut Bounded;

    /// Hook run after `key` was written or constrained. Linked constraints
    /// live here.
    fn after_write(&mut self, _key: Self::Key) {}

    /// Veto a range for `key` before it is applied.
    fn check_constraint(&self, _key: Self::Key, _min: i64, _max: i64) -> Result<(), EntityError> {
        Ok(())
    }

    /// Current value of `key`.
    fn get_attribute(&self, key: Self::Key) -> i64 {
        self.field(key).get()
    }

    /// Name-keyed read. Unknown names yield `default`.
    fn attribute_by_name(&self, name: &str, default: i64) -> i64 {
        Self::Key::from_name(name).map_or(default, |key| self.get_attribute(key))
    }

    /// Write `value`, clamped to the attribute's range, and notify listeners.
    fn set_attribute(&mut self, key: Self::Key, value: i64) -> i64 {
        let old = self.field(key).get();
        let new = self.field_mut(key).set(value);
        self.core_mut().emit_number(key.name(), old, new);
        self.after_write(key);
        new
    }

    /// Read-modify-write by `delta`.
    fn adjust_attribute(&mut self, key: Self::Key, delta: i64) -> i64 {
        let target = self.get_attribute(key).saturating_add(delta);
        self.set_attribute(key, target)
    }

    /// Write several attributes in order.
    fn set_attributes(&mut self, values: &[(Self::Key, i64)]) {
        for &(key, value) in values {
            self.set_attribute(key, value);
        }
    }

    /// Replace the range of `key`, re-clamping the current value.
    ///
    /// Linked attributes are re-applied afterwards even when the value did
    /// not move, since the range itself may feed a partner's bound.
    fn set_constraint(&mut self, key: Self::Key, min: i64, max: i64) -> Result<i64, EntityError> {
        if min > max {
            return Err(EntityError::InvalidConstraint { min, max });
        }
        self.check_constraint(key, min, max)?;
        let old = self.field(key).get();
        let new = self.field_mut(key).set_range(min, max)?;
        if new != old {
            self.core_mut().emit_number(key.name(), old, new);
        }
        self.after_write(key);
        Ok(new)
    }

    /// Snapshot of every numeric attribute.
    fn attributes(&self) -> Vec<(Self::Key, i64)> {
        Self::Key::ALL
            .iter()
            .map(|&key| (key, self.get_attribute(key)))
            .collect()
    }

    /// Register a change listener.
    fn subscribe(&mut self, listener: Listener) -> ListenerId {
        self.core_mut().subscribe(listener)
    }

    /// Remove a change listener.
    fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.core_mut().unsubscribe(id)
    }

    /// Fire the destruction event and clear listeners. Idempotent.
    fn destroy(&mut self) -> bool {
        self.core_mut().destroy()
    }
}

/// Validate a range for either side of a pair where `child <= parent`.
///
/// The parent may not drop its minimum below the child's, and the child may
/// neither raise its minimum above the parent's nor its maximum above the
/// parent's current value. Together with [`relink_max`] this keeps the child
/// at or below the parent after any sequence of writes.
pub fn check_linked_range(
    parent: (&'static str, Bounded),
    child: (&'static str, Bounded),
    constraining_child: bool,
    min: i64,
    max: i64,
) -> Result<(), EntityError> {
    let (parent_name, parent) = parent;
    let (child_name, child) = child;
    let conflict = |linked, limit| EntityError::LinkedConstraint {
        min,
        max,
        linked,
        limit,
    };
    if constraining_child {
        if min > parent.min() {
            return Err(conflict(parent_name, parent.min()));
        }
        if max > parent.get() {
            return Err(conflict(parent_name, parent.get()));
        }
    } else if min < child.min() {
        return Err(conflict(child_name, child.min()));
    }
    Ok(())
}

/// Move the upper bound of a linked field and report the clamp, if any.
///
/// Used by entities whose attributes constrain each other (for example a
/// ward's remaining breeding value is capped by its total).
pub fn relink_max(core: &mut EntityCore, field: &mut Bounded, name: &'static str, max: i64) {
    let old = field.get();
    let new = field.set_max(max);
    if new != old {
        core.emit_number(name, old, new);
    }
}
