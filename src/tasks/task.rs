//! Task record and its status state machine

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{Result, SchedulerError};
use crate::core::types::{EntityId, Millis, ResourceKind, TaskId, Vec2, ZoneId};

/// What an agent intends to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    SatisfyNeed,
    Rest,
    Gather,
    Deposit,
    Craft,
    Build,
    Hunt,
    Trade,
    Attack,
    Flee,
    Socialize,
    Assist,
    Explore,
    Idle,
}

impl TaskKind {
    pub const ALL: [TaskKind; 14] = [
        TaskKind::SatisfyNeed,
        TaskKind::Rest,
        TaskKind::Gather,
        TaskKind::Deposit,
        TaskKind::Craft,
        TaskKind::Build,
        TaskKind::Hunt,
        TaskKind::Trade,
        TaskKind::Attack,
        TaskKind::Flee,
        TaskKind::Socialize,
        TaskKind::Assist,
        TaskKind::Explore,
        TaskKind::Idle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::SatisfyNeed => "satisfy_need",
            TaskKind::Rest => "rest",
            TaskKind::Gather => "gather",
            TaskKind::Deposit => "deposit",
            TaskKind::Craft => "craft",
            TaskKind::Build => "build",
            TaskKind::Hunt => "hunt",
            TaskKind::Trade => "trade",
            TaskKind::Attack => "attack",
            TaskKind::Flee => "flee",
            TaskKind::Socialize => "socialize",
            TaskKind::Assist => "assist",
            TaskKind::Explore => "explore",
            TaskKind::Idle => "idle",
        }
    }

    /// Lifetime given to detector proposals of this kind (ms)
    ///
    /// Threat responses go stale fast; chores stay valid longer.
    pub fn default_ttl(&self) -> Millis {
        match self {
            TaskKind::Flee => 3_000,
            TaskKind::Attack | TaskKind::Assist => 5_000,
            TaskKind::SatisfyNeed | TaskKind::Rest => 15_000,
            _ => 30_000,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named priority bands
///
/// Priorities are plain floats in [0, 1]; the bands are the conventional
/// starting points detectors bias from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityBand {
    Critical,
    Urgent,
    High,
    Normal,
    Low,
    Lowest,
}

impl PriorityBand {
    pub const CRITICAL: f32 = 0.95;
    pub const URGENT: f32 = 0.8;
    pub const HIGH: f32 = 0.6;
    pub const NORMAL: f32 = 0.4;
    pub const LOW: f32 = 0.2;
    pub const LOWEST: f32 = 0.1;

    pub fn value(&self) -> f32 {
        match self {
            PriorityBand::Critical => Self::CRITICAL,
            PriorityBand::Urgent => Self::URGENT,
            PriorityBand::High => Self::HIGH,
            PriorityBand::Normal => Self::NORMAL,
            PriorityBand::Low => Self::LOW,
            PriorityBand::Lowest => Self::LOWEST,
        }
    }

    /// Highest band whose value does not exceed `priority`
    pub fn of(priority: f32) -> Self {
        [
            PriorityBand::Critical,
            PriorityBand::Urgent,
            PriorityBand::High,
            PriorityBand::Normal,
            PriorityBand::Low,
        ]
        .into_iter()
        .find(|band| priority >= band.value())
        .unwrap_or(PriorityBand::Lowest)
    }
}

/// Clamp a computed priority into [0, 1]
pub fn clamp_priority(priority: f32) -> f32 {
    if priority.is_nan() {
        return 0.0;
    }
    priority.clamp(0.0, 1.0)
}

/// Task status state machine
///
/// PENDING -> ACTIVE -> {COMPLETED, FAILED, CANCELLED}. Pending tasks may
/// also be dropped by expiry without any transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Active,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Active)
                | (TaskStatus::Pending, TaskStatus::Cancelled)
                | (TaskStatus::Active, TaskStatus::Completed)
                | (TaskStatus::Active, TaskStatus::Failed)
                | (TaskStatus::Active, TaskStatus::Cancelled)
        )
    }
}

/// What a task is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskTarget {
    Entity(EntityId),
    Position(Vec2),
    Zone(ZoneId),
}

impl TaskTarget {
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            TaskTarget::Entity(id) => Some(*id),
            _ => None,
        }
    }

    pub fn zone(&self) -> Option<ZoneId> {
        match self {
            TaskTarget::Zone(id) => Some(*id),
            _ => None,
        }
    }
}

/// Category of the detector that proposed a task
///
/// Declaration order is the fixed run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorCategory {
    Combat,
    Needs,
    Inventory,
    Work,
    Craft,
    Build,
    Social,
    Trade,
    Explore,
}

/// Who produced a task, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    Detector(DetectorCategory),
    External(String),
}

impl TaskSource {
    pub fn external(name: impl Into<String>) -> Self {
        TaskSource::External(name.into())
    }
}

/// Kind-specific parameters, opaque to the scheduler
///
/// Sorted so that iteration and serialization are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskParams(BTreeMap<String, Value>);

impl TaskParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn get_entity(&self, key: &str) -> Option<EntityId> {
        self.get_str(key)
            .and_then(|raw| uuid::Uuid::parse_str(raw).ok())
            .map(EntityId)
    }

    pub fn get_resource(&self, key: &str) -> Option<ResourceKind> {
        self.get_str(key).and_then(ResourceKind::parse)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A proposed or emitted intent, before the scheduler stamps it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub kind: TaskKind,
    pub priority: f32,
    pub target: Option<TaskTarget>,
    pub params: TaskParams,
    pub source: TaskSource,
    /// Lifetime from creation; `None` never expires
    pub ttl: Option<Millis>,
}

impl TaskSpec {
    pub fn new(kind: TaskKind, priority: f32, source: TaskSource) -> Self {
        Self {
            kind,
            priority: clamp_priority(priority),
            target: None,
            params: TaskParams::new(),
            source,
            ttl: None,
        }
    }

    /// Detector proposal with the kind's default lifetime
    pub fn proposal(kind: TaskKind, priority: f32, category: DetectorCategory) -> Self {
        Self::new(kind, priority, TaskSource::Detector(category)).with_ttl(kind.default_ttl())
    }

    pub fn with_target(mut self, target: TaskTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_entity(self, entity: EntityId) -> Self {
        self.with_target(TaskTarget::Entity(entity))
    }

    pub fn with_position(self, pos: Vec2) -> Self {
        self.with_target(TaskTarget::Position(pos))
    }

    pub fn with_zone(self, zone: ZoneId) -> Self {
        self.with_target(TaskTarget::Zone(zone))
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key, value);
        self
    }

    pub fn with_ttl(mut self, ttl: Millis) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// A queued or active intent of one agent
///
/// Only the scheduler creates tasks. After creation only `status` changes,
/// plus the priority raise applied by accumulation while pending. The
/// priority the task was proposed at is kept as `proposed_priority`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    agent: EntityId,
    kind: TaskKind,
    priority: f32,
    proposed_priority: f32,
    status: TaskStatus,
    target: Option<TaskTarget>,
    params: TaskParams,
    source: TaskSource,
    created_at: Millis,
    expires_at: Option<Millis>,
}

impl Task {
    pub(crate) fn create(id: TaskId, agent: EntityId, spec: TaskSpec, now: Millis) -> Self {
        let priority = clamp_priority(spec.priority);
        Self {
            id,
            agent,
            kind: spec.kind,
            priority,
            proposed_priority: priority,
            status: TaskStatus::Pending,
            target: spec.target,
            params: spec.params,
            source: spec.source,
            created_at: now,
            expires_at: spec.ttl.map(|ttl| now.saturating_add(ttl)),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn agent(&self) -> EntityId {
        self.agent
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn priority(&self) -> f32 {
        self.priority
    }

    /// Priority at creation, untouched by accumulation
    pub fn proposed_priority(&self) -> f32 {
        self.proposed_priority
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn target(&self) -> Option<&TaskTarget> {
        self.target.as_ref()
    }

    pub fn params(&self) -> &TaskParams {
        &self.params
    }

    pub fn source(&self) -> &TaskSource {
        &self.source
    }

    pub fn created_at(&self) -> Millis {
        self.created_at
    }

    pub fn expires_at(&self) -> Option<Millis> {
        self.expires_at
    }

    pub fn is_expired(&self, now: Millis) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Raise priority by `amount`, clamped to 1.0; returns the new priority
    pub(crate) fn boost(&mut self, amount: f32) -> f32 {
        self.priority = clamp_priority(self.priority + amount.max(0.0));
        self.priority
    }

    pub(crate) fn transition(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(SchedulerError::InvalidTransition {
                task: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Stamps monotonic task ids and creation times
#[derive(Debug, Clone, Default)]
pub struct TaskIdGenerator {
    next: u64,
    last_stamp: Millis,
}

impl TaskIdGenerator {
    pub fn new() -> Self {
        Self {
            next: 1,
            last_stamp: 0,
        }
    }

    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next.max(1));
        self.next = id.0 + 1;
        id
    }

    /// Build a task from a spec, stamping id and creation time
    ///
    /// A `now` older than the previous stamp is raised to it, so creation
    /// times never run backwards.
    pub fn stamp(&mut self, agent: EntityId, spec: TaskSpec, now: Millis) -> Task {
        let id = self.next_id();
        let created_at = now.max(self.last_stamp);
        self.last_stamp = created_at;
        Task::create(id, agent, spec, created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> EntityId {
        EntityId::from_raw(1)
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut ids = TaskIdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(b > a);

        let mut defaulted = TaskIdGenerator::default();
        assert_eq!(defaulted.next_id(), TaskId(1));
    }

    #[test]
    fn test_stamp_sets_pending_and_expiry() {
        let mut ids = TaskIdGenerator::new();
        let spec = TaskSpec::new(TaskKind::Gather, 0.4, TaskSource::external("test")).with_ttl(100);
        let task = ids.stamp(agent(), spec, 1_000);

        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.created_at(), 1_000);
        assert_eq!(task.expires_at(), Some(1_100));
        assert!(!task.is_expired(1_099));
        assert!(task.is_expired(1_100));
    }

    #[test]
    fn test_priority_clamped_on_creation_and_boost() {
        let mut ids = TaskIdGenerator::new();
        let spec = TaskSpec::new(TaskKind::Flee, 1.7, TaskSource::external("test"));
        let mut task = ids.stamp(agent(), spec, 0);
        assert_eq!(task.priority(), 1.0);

        let spec = TaskSpec::new(TaskKind::Rest, 0.95, TaskSource::external("test"));
        let mut other = ids.stamp(agent(), spec, 0);
        assert_eq!(other.boost(0.1), 1.0);
        assert_eq!(task.boost(0.5), 1.0);
    }

    #[test]
    fn test_boost_keeps_proposed_priority() {
        let mut ids = TaskIdGenerator::new();
        let spec = TaskSpec::new(TaskKind::Rest, 0.4, TaskSource::external("test"));
        let mut task = ids.stamp(agent(), spec, 0);
        for _ in 0..7 {
            task.boost(0.1);
        }

        assert_eq!(task.priority(), 1.0);
        assert!((task.proposed_priority() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_stamp_never_runs_backwards() {
        let mut ids = TaskIdGenerator::new();
        let spec = || TaskSpec::new(TaskKind::Gather, 0.4, TaskSource::external("test"));

        let first = ids.stamp(agent(), spec(), 500);
        let stale = ids.stamp(agent(), spec().with_ttl(100), 200);
        let later = ids.stamp(agent(), spec(), 800);

        assert_eq!(first.created_at(), 500);
        assert_eq!(stale.created_at(), 500);
        assert_eq!(stale.expires_at(), Some(600));
        assert_eq!(later.created_at(), 800);
    }

    #[test]
    fn test_terminal_states_do_not_reenter() {
        let mut ids = TaskIdGenerator::new();
        let spec = TaskSpec::new(TaskKind::Idle, 0.1, TaskSource::external("test"));
        let mut task = ids.stamp(agent(), spec, 0);

        task.transition(TaskStatus::Active).unwrap();
        task.transition(TaskStatus::Completed).unwrap();

        for next in [TaskStatus::Pending, TaskStatus::Active, TaskStatus::Failed] {
            assert!(matches!(
                task.transition(next),
                Err(SchedulerError::InvalidTransition { .. })
            ));
        }
        assert_eq!(task.status(), TaskStatus::Completed);
    }

    #[test]
    fn test_pending_cannot_complete_directly() {
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Failed));
        assert!(TaskStatus::Active.can_transition_to(TaskStatus::Cancelled));
    }

    #[test]
    fn test_priority_band_lookup() {
        assert_eq!(PriorityBand::of(0.97), PriorityBand::Critical);
        assert_eq!(PriorityBand::of(0.8), PriorityBand::Urgent);
        assert_eq!(PriorityBand::of(0.5), PriorityBand::Normal);
        assert_eq!(PriorityBand::of(0.05), PriorityBand::Lowest);
    }

    #[test]
    fn test_params_typed_access() {
        let target = EntityId::from_raw(9);
        let spec = TaskSpec::new(TaskKind::Gather, 0.4, TaskSource::external("test"))
            .with_param("resource", "wood")
            .with_param("amount", 3)
            .with_param("from", target.to_string());

        assert_eq!(spec.params.get_resource("resource"), Some(ResourceKind::Wood));
        assert_eq!(spec.params.get_u64("amount"), Some(3));
        assert_eq!(spec.params.get_entity("from"), Some(target));
        assert_eq!(spec.params.get_str("missing"), None);
    }
}
