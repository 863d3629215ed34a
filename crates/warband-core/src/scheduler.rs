//! Turn-scoped task scheduling with exclusive actor and target claims.
//!
//! A task binds an actor (champion or ward) to an optional target for the
//! rest of the turn. While a task is pending, its actor and any exclusive
//! target are *claimed*: no second task and no combat deployment may use
//! them. Raidable locations are shared targets and are never claimed.
//!
//! Task kinds are rules data registered from outside: each supplies named
//! preconditions (checked in registration order, first failure reported),
//! an action-point cost function, and an effect run at settlement.
//!
//! Settlement orders tasks first-come-first-served by publish time, with a
//! publish sequence number breaking ties, runs each effect in isolation,
//! and then clears every task and claim.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use warband_types::{ActorRef, EntityRef, FailureKind, TargetRef, TaskId};

use crate::world::World;

/// Action points a task costs when its kind declares no cost function.
pub const DEFAULT_ACTION_POINTS: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// No task kind is registered under this name.
    #[error("unknown task kind: {0}")]
    UnknownKind(String),

    /// A task kind with this name is already registered.
    #[error("task kind already registered: {0}")]
    DuplicateKind(String),

    /// The actor does not resolve to a live entity.
    #[error("actor does not exist: {0}")]
    ActorNotFound(EntityRef),

    /// The target does not resolve to a live entity.
    #[error("target does not exist: {0}")]
    TargetNotFound(EntityRef),

    /// The actor is already claimed this turn.
    #[error("actor is occupied: {0}")]
    ActorOccupied(EntityRef),

    /// The target is already claimed this turn.
    #[error("target is occupied: {0}")]
    TargetOccupied(EntityRef),

    /// A precondition of the task kind rejected the request.
    #[error("precondition failed: {check}")]
    PreconditionFailed {
        /// Name of the failing check.
        check: String,
    },

    /// No pending task has this id.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
}

impl TaskError {
    /// The failure class this error belongs to.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::UnknownKind(_)
            | Self::ActorNotFound(_)
            | Self::TargetNotFound(_)
            | Self::TaskNotFound(_) => FailureKind::NotFound,
            Self::ActorOccupied(_) | Self::TargetOccupied(_) => FailureKind::Occupied,
            Self::PreconditionFailed { .. } => FailureKind::PreconditionFailed,
            Self::DuplicateKind(_) => FailureKind::InvalidState,
        }
    }
}

// ---------------------------------------------------------------------------
// Task kinds
// ---------------------------------------------------------------------------

/// The actor and target a task is being checked or priced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRequest {
    /// Who performs the task.
    pub actor: ActorRef,
    /// What the task is aimed at, if anything.
    pub target: Option<TargetRef>,
}

/// Everything an effect knows about the task it is settling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    /// The task being settled.
    pub task: TaskId,
    /// Its kind.
    pub kind: String,
    /// The resolved actor.
    pub actor: ActorRef,
    /// The resolved target.
    pub target: Option<TargetRef>,
    /// Turn being settled.
    pub turn: u64,
    /// Action points the task cost.
    pub action_points: u32,
}

/// What a task effect reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// The effect ran.
    Completed {
        /// Line for the settlement log, if the effect has something to say.
        message: Option<String>,
    },
    /// The effect could not be applied.
    Failed {
        /// Why.
        reason: String,
    },
}

impl TaskOutcome {
    /// A completed outcome with a log line.
    pub fn completed(message: impl Into<String>) -> Self {
        Self::Completed {
            message: Some(message.into()),
        }
    }

    /// A failed outcome.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether the effect ran.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// The log line, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Completed { message } => message.as_deref(),
            Self::Failed { reason } => Some(reason),
        }
    }
}

/// A named precondition check.
pub type Precondition = Box<dyn Fn(&World, &TaskRequest) -> bool>;
/// Computes a task's action-point cost.
pub type CostFn = Box<dyn Fn(&World, &TaskRequest) -> u32>;
/// Applies a task at settlement.
pub type TaskEffect = Box<dyn Fn(&mut World, &TaskContext, &mut dyn RngCore) -> TaskOutcome>;

/// A registered kind of task.
pub struct TaskKind {
    name: String,
    preconditions: Vec<(String, Precondition)>,
    cost: Option<CostFn>,
    effect: TaskEffect,
}

impl TaskKind {
    /// A task kind with no preconditions and the default cost.
    pub fn new(
        name: impl Into<String>,
        effect: impl Fn(&mut World, &TaskContext, &mut dyn RngCore) -> TaskOutcome + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            preconditions: Vec::new(),
            cost: None,
            effect: Box::new(effect),
        }
    }

    /// Append a named precondition. Checks run in the order added.
    #[must_use]
    pub fn precondition(
        mut self,
        check: impl Into<String>,
        predicate: impl Fn(&World, &TaskRequest) -> bool + 'static,
    ) -> Self {
        self.preconditions.push((check.into(), Box::new(predicate)));
        self
    }

    /// Set the cost function.
    #[must_use]
    pub fn cost(mut self, cost: impl Fn(&World, &TaskRequest) -> u32 + 'static) -> Self {
        self.cost = Some(Box::new(cost));
        self
    }

    /// Set a constant cost.
    #[must_use]
    pub fn fixed_cost(self, points: u32) -> Self {
        self.cost(move |_, _| points)
    }

    /// Kind name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the preconditions, in check order.
    pub fn precondition_names(&self) -> impl Iterator<Item = &str> {
        self.preconditions.iter().map(|(name, _)| name.as_str())
    }

    /// Action points this request would cost.
    pub fn action_points(&self, world: &World, request: &TaskRequest) -> u32 {
        self.cost
            .as_ref()
            .map_or(DEFAULT_ACTION_POINTS, |cost| cost(world, request))
    }

    fn check(&self, world: &World, request: &TaskRequest) -> Result<(), TaskError> {
        match self
            .preconditions
            .iter()
            .find(|(_, predicate)| !predicate(world, request))
        {
            Some((check, _)) => Err(TaskError::PreconditionFailed {
                check: check.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskKind")
            .field("name", &self.name)
            .field(
                "preconditions",
                &self.precondition_names().collect::<Vec<_>>(),
            )
            .field("custom_cost", &self.cost.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// A published, pending task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier.
    pub id: TaskId,
    /// Kind name.
    pub kind: String,
    /// Who performs it.
    pub actor: ActorRef,
    /// What it is aimed at.
    pub target: Option<TargetRef>,
    /// Action points it costs.
    pub action_points: u32,
    /// When it was published.
    pub published_at: DateTime<Utc>,
    /// Publish order, breaks timestamp ties.
    pub sequence: u64,
}

/// One task's settlement result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// The settled task.
    pub task: TaskId,
    /// Its kind.
    pub kind: String,
    /// Its actor.
    pub actor: ActorRef,
    /// Its target.
    pub target: Option<TargetRef>,
    /// What happened.
    pub outcome: TaskOutcome,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Registry of task kinds plus this turn's pending tasks and claims.
#[derive(Debug)]
pub struct Scheduler {
    kinds: BTreeMap<String, TaskKind>,
    busy_actors: BTreeSet<EntityRef>,
    busy_targets: BTreeSet<EntityRef>,
    tasks: BTreeMap<TaskId, Task>,
    next_sequence: u64,
    action_points_per_turn: u32,
}

impl Scheduler {
    /// An empty scheduler with the given per-turn action-point budget.
    pub const fn new(action_points_per_turn: u32) -> Self {
        Self {
            kinds: BTreeMap::new(),
            busy_actors: BTreeSet::new(),
            busy_targets: BTreeSet::new(),
            tasks: BTreeMap::new(),
            next_sequence: 0,
            action_points_per_turn,
        }
    }

    // -- kinds -------------------------------------------------------------

    /// Register a task kind.
    pub fn register(&mut self, kind: TaskKind) -> Result<(), TaskError> {
        if self.kinds.contains_key(kind.name()) {
            return Err(TaskError::DuplicateKind(kind.name.clone()));
        }
        debug!(kind = kind.name(), "task kind registered");
        self.kinds.insert(kind.name.clone(), kind);
        Ok(())
    }

    /// Registered kind names, sorted.
    pub fn task_kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// A registered kind.
    pub fn task_kind(&self, name: &str) -> Option<&TaskKind> {
        self.kinds.get(name)
    }

    // -- publish / cancel / reassign --------------------------------------

    /// Publish a task, claiming its actor and (exclusive) target.
    ///
    /// Fails without touching any claim if the kind is unknown, an entity
    /// does not resolve, the actor or target is already claimed, or a
    /// precondition rejects the request. A task may target its own actor.
    pub fn publish(
        &mut self,
        world: &World,
        kind: &str,
        actor: ActorRef,
        target: Option<TargetRef>,
    ) -> Result<TaskId, TaskError> {
        let task_kind = self
            .kinds
            .get(kind)
            .ok_or_else(|| TaskError::UnknownKind(kind.to_owned()))?;
        if !world.registry.has_actor(actor) {
            return Err(TaskError::ActorNotFound(actor.into()));
        }
        if self.is_claimed(actor.into()) {
            return Err(TaskError::ActorOccupied(actor.into()));
        }
        if let Some(target) = target {
            if !world.registry.has_target(target) {
                return Err(TaskError::TargetNotFound(target.into()));
            }
            if target.is_exclusive() && self.is_claimed(target.into()) {
                return Err(TaskError::TargetOccupied(target.into()));
            }
        }
        let request = TaskRequest { actor, target };
        task_kind.check(world, &request)?;
        let action_points = task_kind.action_points(world, &request);

        let task = Task {
            id: TaskId::new(),
            kind: kind.to_owned(),
            actor,
            target,
            action_points,
            published_at: Utc::now(),
            sequence: self.next_sequence,
        };
        self.next_sequence = self.next_sequence.saturating_add(1);
        self.claim(actor, target);
        let id = task.id;
        info!(task = %id, kind, actor = %actor, action_points, "task published");
        self.tasks.insert(id, task);
        Ok(id)
    }

    /// Withdraw a pending task and release its claims.
    pub fn cancel(&mut self, task: TaskId) -> Result<Task, TaskError> {
        let removed = self
            .tasks
            .remove(&task)
            .ok_or(TaskError::TaskNotFound(task))?;
        self.unclaim(removed.actor, removed.target);
        info!(task = %task, kind = %removed.kind, "task cancelled");
        Ok(removed)
    }

    /// Move a pending task to a new actor and/or target.
    ///
    /// The actor swap re-checks existence, claims, and every precondition,
    /// and recomputes the cost. The target swap checks existence and claims
    /// only. Each swap is applied on its own: if the actor swap succeeds
    /// and the target swap fails, the new actor is kept.
    ///
    /// Claims held by the task itself never block its own swap, so moving
    /// the target onto the task's actor (or the actor onto its target) is
    /// allowed, as it is at publish.
    pub fn reassign(
        &mut self,
        world: &World,
        task: TaskId,
        new_actor: Option<ActorRef>,
        new_target: Option<TargetRef>,
    ) -> Result<(), TaskError> {
        let current = self
            .tasks
            .get(&task)
            .ok_or(TaskError::TaskNotFound(task))?
            .clone();

        if let Some(actor) = new_actor.filter(|a| *a != current.actor) {
            if !world.registry.has_actor(actor) {
                return Err(TaskError::ActorNotFound(actor.into()));
            }
            if self.claimed_elsewhere(actor.into(), &current) {
                return Err(TaskError::ActorOccupied(actor.into()));
            }
            let kind = self
                .kinds
                .get(&current.kind)
                .ok_or_else(|| TaskError::UnknownKind(current.kind.clone()))?;
            let request = TaskRequest {
                actor,
                target: current.target,
            };
            kind.check(world, &request)?;
            let action_points = kind.action_points(world, &request);

            self.busy_actors.remove(&current.actor.into());
            self.busy_actors.insert(actor.into());
            if let Some(pending) = self.tasks.get_mut(&task) {
                pending.actor = actor;
                pending.action_points = action_points;
            }
            info!(task = %task, from = %current.actor, to = %actor, "task actor reassigned");
        }

        if let Some(target) = new_target.filter(|t| Some(*t) != current.target) {
            if !world.registry.has_target(target) {
                return Err(TaskError::TargetNotFound(target.into()));
            }
            let owner = self.tasks.get(&task).unwrap_or(&current);
            if target.is_exclusive() && self.claimed_elsewhere(target.into(), owner) {
                return Err(TaskError::TargetOccupied(target.into()));
            }
            if let Some(old) = current.target.filter(|t| t.is_exclusive()) {
                self.busy_targets.remove(&old.into());
            }
            if target.is_exclusive() {
                self.busy_targets.insert(target.into());
            }
            if let Some(pending) = self.tasks.get_mut(&task) {
                pending.target = Some(target);
            }
            info!(task = %task, to = %target, "task target reassigned");
        }
        Ok(())
    }

    // -- settlement --------------------------------------------------------

    /// Settle every pending task in publish order, then clear all tasks and
    /// claims.
    ///
    /// A task whose actor or target vanished, or whose effect fails, yields
    /// a failed result; the remaining tasks still settle.
    pub fn settle_all(&mut self, world: &mut World, rng: &mut dyn RngCore) -> Vec<TaskResult> {
        let mut pending: Vec<Task> = core::mem::take(&mut self.tasks).into_values().collect();
        pending.sort_by_key(|t| (t.published_at, t.sequence));

        let mut results = Vec::with_capacity(pending.len());
        for task in pending {
            let outcome = self.settle_one(world, &task, rng);
            if let TaskOutcome::Failed { reason } = &outcome {
                warn!(task = %task.id, kind = %task.kind, reason, "task failed at settlement");
            } else {
                debug!(task = %task.id, kind = %task.kind, "task settled");
            }
            results.push(TaskResult {
                task: task.id,
                kind: task.kind,
                actor: task.actor,
                target: task.target,
                outcome,
            });
        }

        self.busy_actors.clear();
        self.busy_targets.clear();
        info!(turn = world.turn(), settled = results.len(), "tasks settled");
        results
    }

    fn settle_one(&self, world: &mut World, task: &Task, rng: &mut dyn RngCore) -> TaskOutcome {
        if !world.registry.has_actor(task.actor) {
            return TaskOutcome::failed(TaskError::ActorNotFound(task.actor.into()).to_string());
        }
        if let Some(target) = task.target.filter(|t| !world.registry.has_target(*t)) {
            return TaskOutcome::failed(TaskError::TargetNotFound(target.into()).to_string());
        }
        let Some(kind) = self.kinds.get(&task.kind) else {
            return TaskOutcome::failed(TaskError::UnknownKind(task.kind.clone()).to_string());
        };
        let context = TaskContext {
            task: task.id,
            kind: task.kind.clone(),
            actor: task.actor,
            target: task.target,
            turn: world.turn(),
            action_points: task.action_points,
        };
        (kind.effect)(world, &context, rng)
    }

    // -- claims ------------------------------------------------------------

    /// Claim an entity outside of any task (used by combat deployment).
    ///
    /// Returns `false` if it is already claimed.
    pub fn reserve(&mut self, entity: EntityRef) -> bool {
        if self.is_claimed(entity) {
            return false;
        }
        self.busy_targets.insert(entity)
    }

    /// Release a claim made with [`reserve`](Self::reserve).
    pub fn release(&mut self, entity: EntityRef) -> bool {
        self.busy_targets.remove(&entity)
    }

    /// Whether the entity is claimed as an actor or a target.
    pub fn is_claimed(&self, entity: EntityRef) -> bool {
        self.busy_actors.contains(&entity) || self.busy_targets.contains(&entity)
    }

    /// Whether the actor is performing a pending task.
    pub fn is_actor_busy(&self, actor: ActorRef) -> bool {
        self.busy_actors.contains(&actor.into())
    }

    /// Whether the target is claimed by a task or a deployment.
    pub fn is_target_busy(&self, target: TargetRef) -> bool {
        self.busy_targets.contains(&target.into())
    }

    /// Whether `entity` is claimed by anything other than `task` itself.
    fn claimed_elsewhere(&self, entity: EntityRef, task: &Task) -> bool {
        let own = entity == task.actor.into()
            || task
                .target
                .is_some_and(|t| t.is_exclusive() && entity == t.into());
        self.is_claimed(entity) && !own
    }

    fn claim(&mut self, actor: ActorRef, target: Option<TargetRef>) {
        self.busy_actors.insert(actor.into());
        if let Some(target) = target.filter(|t| t.is_exclusive()) {
            self.busy_targets.insert(target.into());
        }
    }

    fn unclaim(&mut self, actor: ActorRef, target: Option<TargetRef>) {
        self.busy_actors.remove(&actor.into());
        if let Some(target) = target.filter(|t| t.is_exclusive()) {
            self.busy_targets.remove(&target.into());
        }
    }

    // -- queries -----------------------------------------------------------

    /// A pending task.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Pending tasks in publish order.
    pub fn tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.values().collect();
        tasks.sort_by_key(|t| (t.published_at, t.sequence));
        tasks
    }

    /// Number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// The pending task this actor performs.
    pub fn current_task_of(&self, actor: ActorRef) -> Option<&Task> {
        self.tasks.values().find(|t| t.actor == actor)
    }

    /// Per-turn action-point budget.
    pub const fn action_points_per_turn(&self) -> u32 {
        self.action_points_per_turn
    }

    /// Action points committed by pending tasks.
    pub fn action_points_used(&self) -> u32 {
        self.tasks
            .values()
            .fold(0_u32, |acc, t| acc.saturating_add(t.action_points))
    }

    /// Budget left after pending tasks.
    pub fn remaining_action_points(&self) -> u32 {
        self.action_points_per_turn
            .saturating_sub(self.action_points_used())
    }

    /// Champions and roster wards not currently claimed.
    pub fn available_actors(&self, world: &World) -> Vec<ActorRef> {
        let champions = world
            .registry
            .champions()
            .map(|c| ActorRef::Champion(c.id()));
        let wards = world.registry.wards().map(|w| ActorRef::Ward(w.id()));
        champions
            .chain(wards)
            .filter(|a| !self.is_claimed((*a).into()))
            .collect()
    }

    /// Targets a new task could claim: unclaimed roster wards, champions,
    /// and pools, plus every location.
    pub fn available_targets(&self, world: &World) -> Vec<TargetRef> {
        let registry = &world.registry;
        let wards = registry.wards().map(|w| TargetRef::Ward(w.id()));
        let champions = registry.champions().map(|c| TargetRef::Champion(c.id()));
        let pools = registry
            .champions()
            .map(|c| TargetRef::TroopPool(c.pool().id()))
            .chain(core::iter::once(TargetRef::TroopPool(
                registry.common_pool().id(),
            )));
        let locations = registry.locations().map(|l| TargetRef::Location(l.id()));
        wards
            .chain(champions)
            .chain(pools)
            .chain(locations)
            .filter(|t| !t.is_exclusive() || !self.is_claimed((*t).into()))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use warband_entities::{Champion, ChampionStats, Location, Ward, WardProfile};
    use warband_types::{ChampionId, LocationId, WardId};

    use super::*;
    use crate::config::GameConfig;

    struct Fixture {
        world: World,
        scheduler: Scheduler,
        champion: ActorRef,
        other: ActorRef,
        champion_id: ChampionId,
        other_id: ChampionId,
        ward: TargetRef,
        ward_id: WardId,
        location: TargetRef,
    }

    fn fixture() -> Fixture {
        let mut world = World::from_config(&GameConfig::default());
        let champion = world.registry.add_champion(Champion::new(
            "Brakka",
            "north",
            ChampionStats::default(),
        ));
        let other = world.registry.add_champion(Champion::new(
            "Sela",
            "south",
            ChampionStats::default(),
        ));
        let ward = world.registry.add_ward(Ward::new(WardProfile::default()));
        let location = world
            .registry
            .add_location(Location::new("Millbrook", "village"));

        let mut scheduler = Scheduler::new(3);
        scheduler
            .register(TaskKind::new("drill", |_, _, _| TaskOutcome::completed("drilled")))
            .unwrap();
        scheduler
            .register(
                TaskKind::new("scout", |world, ctx, rng| {
                    let Some(TargetRef::Location(id)) = ctx.target else {
                        return TaskOutcome::failed("no location");
                    };
                    match world.registry.location_mut(id) {
                        Some(location) => {
                            let progress = location.advance_reconnaissance(20, rng);
                            TaskOutcome::completed(format!("scouted to {progress}"))
                        }
                        None => TaskOutcome::failed("location vanished"),
                    }
                })
                .precondition("champions only", |_, req| {
                    matches!(req.actor, ActorRef::Champion(_))
                })
                .precondition("needs a location", |_, req| {
                    matches!(req.target, Some(TargetRef::Location(_)))
                })
                .fixed_cost(2),
            )
            .unwrap();

        Fixture {
            world,
            scheduler,
            champion: ActorRef::Champion(champion),
            other: ActorRef::Champion(other),
            champion_id: champion,
            other_id: other,
            ward: TargetRef::Ward(ward),
            ward_id: ward,
            location: TargetRef::Location(location),
        }
    }

    #[test]
    fn publish_claims_actor_and_target() {
        let mut f = fixture();
        let id = f
            .scheduler
            .publish(&f.world, "drill", f.champion, Some(f.ward))
            .unwrap();
        assert!(f.scheduler.is_actor_busy(f.champion));
        assert!(f.scheduler.is_target_busy(f.ward));
        assert_eq!(f.scheduler.task(id).unwrap().action_points, DEFAULT_ACTION_POINTS);
        assert_eq!(f.scheduler.current_task_of(f.champion).unwrap().id, id);
        assert_eq!(f.scheduler.remaining_action_points(), 2);
    }

    #[test]
    fn occupied_actor_or_target_rejected_without_mutation() {
        let mut f = fixture();
        f.scheduler
            .publish(&f.world, "drill", f.champion, Some(f.ward))
            .unwrap();

        let err = f
            .scheduler
            .publish(&f.world, "drill", f.champion, None)
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Occupied);

        let err = f
            .scheduler
            .publish(&f.world, "drill", f.other, Some(f.ward))
            .unwrap_err();
        assert!(matches!(err, TaskError::TargetOccupied(_)));
        assert!(!f.scheduler.is_actor_busy(f.other));
        assert_eq!(f.scheduler.pending_count(), 1);
    }

    #[test]
    fn busy_target_cannot_act() {
        let mut f = fixture();
        let champion_target = TargetRef::Champion(f.other_id);
        f.scheduler
            .publish(&f.world, "drill", f.champion, Some(champion_target))
            .unwrap();
        let err = f.scheduler.publish(&f.world, "drill", f.other, None).unwrap_err();
        assert!(matches!(err, TaskError::ActorOccupied(_)));
    }

    #[test]
    fn locations_are_shared_targets() {
        let mut f = fixture();
        f.scheduler
            .publish(&f.world, "scout", f.champion, Some(f.location))
            .unwrap();
        f.scheduler
            .publish(&f.world, "scout", f.other, Some(f.location))
            .unwrap();
        assert!(!f.scheduler.is_target_busy(f.location));
        assert_eq!(f.scheduler.action_points_used(), 4);
        assert_eq!(f.scheduler.remaining_action_points(), 0);
    }

    #[test]
    fn first_failing_precondition_is_reported() {
        let mut f = fixture();
        let ward_actor = ActorRef::Ward(f.ward_id);
        let err = f
            .scheduler
            .publish(&f.world, "scout", ward_actor, None)
            .unwrap_err();
        assert_eq!(
            err,
            TaskError::PreconditionFailed {
                check: String::from("champions only")
            }
        );
        assert_eq!(err.to_string(), "precondition failed: champions only");
        assert!(!f.scheduler.is_actor_busy(ward_actor));
    }

    #[test]
    fn unknown_kind_and_missing_entities_are_not_found() {
        let mut f = fixture();
        let err = f
            .scheduler
            .publish(&f.world, "dance", f.champion, None)
            .unwrap_err();
        assert_eq!(err, TaskError::UnknownKind(String::from("dance")));

        let ghost = TargetRef::Location(LocationId::new());
        let err = f
            .scheduler
            .publish(&f.world, "drill", f.champion, Some(ghost))
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[test]
    fn cancel_releases_claims() {
        let mut f = fixture();
        let id = f
            .scheduler
            .publish(&f.world, "drill", f.champion, Some(f.ward))
            .unwrap();
        f.scheduler.cancel(id).unwrap();
        assert!(!f.scheduler.is_actor_busy(f.champion));
        assert!(!f.scheduler.is_target_busy(f.ward));
        assert_eq!(f.scheduler.cancel(id), Err(TaskError::TaskNotFound(id)));
    }

    #[test]
    fn reassign_swaps_actor_and_recomputes_cost() {
        let mut f = fixture();
        let id = f
            .scheduler
            .publish(&f.world, "scout", f.champion, Some(f.location))
            .unwrap();
        f.scheduler
            .reassign(&f.world, id, Some(f.other), None)
            .unwrap();
        assert!(!f.scheduler.is_actor_busy(f.champion));
        assert!(f.scheduler.is_actor_busy(f.other));
        assert_eq!(f.scheduler.task(id).unwrap().actor, f.other);
        assert_eq!(f.scheduler.task(id).unwrap().action_points, 2);
    }

    #[test]
    fn reassign_keeps_actor_swap_when_target_swap_fails() {
        let mut f = fixture();
        let first = f
            .scheduler
            .publish(&f.world, "drill", f.champion, None)
            .unwrap();
        let third = ActorRef::Champion(
            f.world
                .registry
                .add_champion(Champion::new("Oren", "east", ChampionStats::default())),
        );
        f.scheduler
            .publish(&f.world, "drill", third, Some(f.ward))
            .unwrap();

        let err = f
            .scheduler
            .reassign(&f.world, first, Some(f.other), Some(f.ward))
            .unwrap_err();
        assert!(matches!(err, TaskError::TargetOccupied(_)));
        assert_eq!(f.scheduler.task(first).unwrap().actor, f.other);
        assert_eq!(f.scheduler.task(first).unwrap().target, None);
    }

    #[test]
    fn a_task_may_target_its_own_actor() {
        let mut f = fixture();
        let own = TargetRef::Champion(f.champion_id);
        let id = f
            .scheduler
            .publish(&f.world, "drill", f.champion, Some(own))
            .unwrap();

        f.scheduler
            .reassign(&f.world, id, None, Some(f.ward))
            .unwrap();
        assert!(!f.scheduler.is_target_busy(own));
        assert!(f.scheduler.is_actor_busy(f.champion));

        f.scheduler.reassign(&f.world, id, None, Some(own)).unwrap();
        assert_eq!(f.scheduler.task(id).unwrap().target, Some(own));
        assert!(!f.scheduler.is_target_busy(f.ward));
        assert!(f.scheduler.is_target_busy(own));
    }

    #[test]
    fn reassign_may_move_the_actor_onto_its_own_target() {
        let mut f = fixture();
        let other_target = TargetRef::Champion(f.other_id);
        let id = f
            .scheduler
            .publish(&f.world, "drill", f.champion, Some(other_target))
            .unwrap();
        f.scheduler
            .reassign(&f.world, id, Some(f.other), None)
            .unwrap();
        assert_eq!(f.scheduler.task(id).unwrap().actor, f.other);
        assert!(!f.scheduler.is_actor_busy(f.champion));

        f.scheduler
            .reassign(&f.world, id, Some(f.champion), Some(f.location))
            .unwrap();
        assert!(!f.scheduler.is_target_busy(other_target));
        let err = f
            .scheduler
            .publish(&f.world, "drill", f.champion, None)
            .unwrap_err();
        assert!(matches!(err, TaskError::ActorOccupied(_)));
    }

    #[test]
    fn settlement_runs_in_publish_order_and_clears_everything() {
        let mut f = fixture();
        let order = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&order);
        f.scheduler
            .register(TaskKind::new("record", move |_, ctx, _| {
                sink.borrow_mut().push(ctx.task);
                TaskOutcome::Completed { message: None }
            }))
            .unwrap();
        let first = f
            .scheduler
            .publish(&f.world, "record", f.champion, None)
            .unwrap();
        let second = f
            .scheduler
            .publish(&f.world, "record", f.other, Some(f.ward))
            .unwrap();

        let mut rng = SmallRng::seed_from_u64(42);
        let results = f.scheduler.settle_all(&mut f.world, &mut rng);
        assert_eq!(results.len(), 2);
        assert_eq!(*order.borrow(), vec![first, second]);
        assert_eq!(f.scheduler.pending_count(), 0);
        assert!(!f.scheduler.is_actor_busy(f.champion));
        assert!(!f.scheduler.is_target_busy(f.ward));
    }

    #[test]
    fn vanished_actor_fails_without_blocking_others() {
        let mut f = fixture();
        f.scheduler
            .publish(&f.world, "drill", f.champion, None)
            .unwrap();
        f.scheduler.publish(&f.world, "drill", f.other, None).unwrap();
        f.world.registry.remove_champion(f.champion_id).unwrap();

        let mut rng = SmallRng::seed_from_u64(42);
        let results = f.scheduler.settle_all(&mut f.world, &mut rng);
        let [vanished, survivor] = results.as_slice() else {
            panic!("expected two results, got {}", results.len());
        };
        assert!(!vanished.outcome.is_success());
        assert!(vanished
            .outcome
            .message()
            .unwrap()
            .starts_with("actor does not exist"));
        assert_eq!(survivor.outcome.message(), Some("drilled"));
    }

    #[test]
    fn reserve_blocks_publish_until_released() {
        let mut f = fixture();
        assert!(f.scheduler.reserve(f.champion.into()));
        assert!(!f.scheduler.reserve(f.champion.into()));
        assert!(f.scheduler.publish(&f.world, "drill", f.champion, None).is_err());
        assert!(!f.scheduler.available_actors(&f.world).contains(&f.champion));
        assert!(f.scheduler.release(f.champion.into()));
        assert!(f.scheduler.publish(&f.world, "drill", f.champion, None).is_ok());
    }

    #[test]
    fn available_targets_always_include_locations() {
        let mut f = fixture();
        f.scheduler
            .publish(&f.world, "scout", f.champion, Some(f.location))
            .unwrap();
        f.scheduler
            .publish(&f.world, "drill", f.other, Some(f.ward))
            .unwrap();
        let targets = f.scheduler.available_targets(&f.world);
        assert!(targets.contains(&f.location));
        assert!(!targets.contains(&f.ward));
    }
}
