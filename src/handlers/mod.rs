//! Handlers - validate an active task and delegate it to a domain system
//!
//! A handler never changes task status itself. It answers with a
//! [`HandlerOutcome`] (or a [`HandlerError`] for a missing precondition) and
//! the orchestrator applies the resulting transition.

pub mod building;
pub mod combat;
pub mod crafting;
pub mod explore;
pub mod inventory;
pub mod needs;
pub mod social;
pub mod trade;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::types::{EntityId, Millis, TaskId, Vec2, ZoneId};
use crate::entity::AgentMemory;
use crate::systems::{DomainResult, DomainStatus, DomainSystems, SystemKind};
use crate::tasks::{Task, TaskKind, TaskStatus, TaskTarget};

pub use building::BuildHandler;
pub use combat::{CombatHandler, FleeHandler};
pub use crafting::CraftHandler;
pub use explore::{ExploreHandler, IdleHandler};
pub use inventory::{DepositHandler, GatherHandler};
pub use needs::{RestHandler, SatisfyNeedHandler};
pub use social::{AssistHandler, SocializeHandler};
pub use trade::TradeHandler;

/// Missing preconditions; the task fails and is not retried
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    #[error("{handler} handler cannot run a {task} task")]
    KindMismatch { handler: TaskKind, task: TaskKind },

    #[error("no handler registered for {0}")]
    NoHandler(TaskKind),

    #[error("{0} system is not bound")]
    SystemUnavailable(SystemKind),

    #[error("{0} task has no usable target")]
    MissingTarget(TaskKind),

    #[error("missing parameter '{0}'")]
    MissingParam(&'static str),

    #[error("need '{0}' cannot be satisfied")]
    UnusableNeed(String),

    #[error("target of {0} cannot be located")]
    TargetUnresolved(TaskId),
}

/// Uniform answer of a handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerOutcome {
    pub success: bool,
    pub completed: bool,
    pub message: Option<String>,
    /// System still working on the task
    pub system: Option<SystemKind>,
    pub data: Option<Value>,
}

impl HandlerOutcome {
    pub fn completed() -> Self {
        Self {
            success: true,
            completed: true,
            message: None,
            system: None,
            data: None,
        }
    }

    pub fn in_progress(system: Option<SystemKind>) -> Self {
        Self {
            success: true,
            completed: false,
            message: None,
            system,
            data: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            completed: false,
            message: Some(message.into()),
            system: None,
            data: None,
        }
    }

    /// Translate a domain answer from `system`
    pub fn from_domain(system: SystemKind, result: DomainResult) -> Self {
        let mut outcome = match result.status {
            DomainStatus::Completed => Self::completed(),
            DomainStatus::Failed => Self::failed(format!("{} request failed", system)),
            DomainStatus::InProgress => Self::in_progress(Some(system)),
            DomainStatus::Delegated(other) => Self::in_progress(Some(other)),
        };
        if result.message.is_some() {
            outcome.message = result.message;
        }
        outcome.data = result.data;
        outcome
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Terminal status this outcome resolves to; `None` keeps the task active
    pub fn resolution(&self) -> Option<TaskStatus> {
        if !self.success {
            Some(TaskStatus::Failed)
        } else if self.completed {
            Some(TaskStatus::Completed)
        } else {
            None
        }
    }
}

/// Everything a handler may use for one call
///
/// Positions are resolved from the world registry before the domain
/// systems are borrowed mutably.
pub struct HandlerContext<'a> {
    pub agent: EntityId,
    pub now: Millis,
    pub agent_position: Vec2,
    pub target_position: Option<Vec2>,
    /// Zone containing the target position, if any
    pub target_zone: Option<ZoneId>,
    pub interaction_range: f32,
    pub systems: DomainSystems<'a>,
    pub memory: &'a mut AgentMemory,
}

pub trait TaskHandler {
    fn kind(&self) -> TaskKind;

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError>;
}

/// Handlers indexed by the kind they run
pub struct HandlerSet {
    handlers: AHashMap<TaskKind, Box<dyn TaskHandler>>,
}

impl HandlerSet {
    pub fn empty() -> Self {
        Self {
            handlers: AHashMap::new(),
        }
    }

    /// A handler for every task kind
    pub fn standard() -> Self {
        let mut set = Self::empty();
        set.register(Box::new(SatisfyNeedHandler));
        set.register(Box::new(RestHandler));
        set.register(Box::new(GatherHandler));
        set.register(Box::new(DepositHandler));
        set.register(Box::new(CraftHandler));
        set.register(Box::new(BuildHandler));
        set.register(Box::new(CombatHandler::hunt()));
        set.register(Box::new(CombatHandler::attack()));
        set.register(Box::new(FleeHandler));
        set.register(Box::new(SocializeHandler));
        set.register(Box::new(AssistHandler));
        set.register(Box::new(TradeHandler));
        set.register(Box::new(ExploreHandler));
        set.register(Box::new(IdleHandler));
        set
    }

    /// Register a handler, replacing any previous one for its kind
    pub fn register(&mut self, handler: Box<dyn TaskHandler>) -> Option<Box<dyn TaskHandler>> {
        self.handlers.insert(handler.kind(), handler)
    }

    pub fn handles(&self, kind: TaskKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn dispatch(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        let handler = self
            .handlers
            .get(&task.kind())
            .ok_or(HandlerError::NoHandler(task.kind()))?;
        handler.execute(task, ctx)
    }
}

impl Default for HandlerSet {
    fn default() -> Self {
        Self::standard()
    }
}

pub(crate) fn ensure_kind(handler: TaskKind, task: &Task) -> Result<(), HandlerError> {
    if task.kind() != handler {
        return Err(HandlerError::KindMismatch {
            handler,
            task: task.kind(),
        });
    }
    Ok(())
}

pub(crate) fn ensure_bound(bound: bool, system: SystemKind) -> Result<(), HandlerError> {
    if bound {
        Ok(())
    } else {
        Err(HandlerError::SystemUnavailable(system))
    }
}

pub(crate) fn bound<T: ?Sized>(system: Option<&mut T>, kind: SystemKind) -> Result<&mut T, HandlerError> {
    system.ok_or(HandlerError::SystemUnavailable(kind))
}

pub(crate) fn entity_target(task: &Task) -> Result<EntityId, HandlerError> {
    task.target()
        .and_then(TaskTarget::entity)
        .ok_or(HandlerError::MissingTarget(task.kind()))
}

pub(crate) fn destination(task: &Task, ctx: &HandlerContext<'_>) -> Result<Vec2, HandlerError> {
    ctx.target_position
        .ok_or(HandlerError::TargetUnresolved(task.id()))
}

/// First half of move-then-act
///
/// Within interaction range returns `None` and the caller acts. Otherwise a
/// move request is issued and its outcome returned; the task stays active
/// unless the movement system refuses.
pub(crate) fn approach(
    ctx: &mut HandlerContext<'_>,
    destination: Vec2,
) -> Result<Option<HandlerOutcome>, HandlerError> {
    if ctx.agent_position.distance(&destination) <= ctx.interaction_range {
        return Ok(None);
    }

    let agent = ctx.agent;
    let movement = bound(ctx.systems.movement.as_deref_mut(), SystemKind::Movement)?;
    let result = movement.request_move(agent, destination);
    let outcome = match result.status {
        DomainStatus::Failed => HandlerOutcome::from_domain(SystemKind::Movement, result),
        _ => HandlerOutcome::in_progress(Some(SystemKind::Movement)).with_message("moving to target"),
    };
    Ok(Some(outcome))
}
