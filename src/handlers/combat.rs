//! Attacking, hunting and running away

use crate::handlers::{
    approach, bound, destination, entity_target, ensure_bound, ensure_kind, HandlerContext,
    HandlerError, HandlerOutcome, TaskHandler,
};
use crate::systems::SystemKind;
use crate::tasks::{Task, TaskKind};

/// Closes to melee range, then attacks
///
/// Serves both hunting and attacking; the two differ only in who proposed them.
pub struct CombatHandler {
    kind: TaskKind,
}

impl CombatHandler {
    pub fn hunt() -> Self {
        Self {
            kind: TaskKind::Hunt,
        }
    }

    pub fn attack() -> Self {
        Self {
            kind: TaskKind::Attack,
        }
    }
}

impl TaskHandler for CombatHandler {
    fn kind(&self) -> TaskKind {
        self.kind
    }

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        ensure_kind(self.kind, task)?;
        ensure_bound(ctx.systems.combat.is_some(), SystemKind::Combat)?;

        let target = entity_target(task)?;
        let at = destination(task, ctx)?;
        if let Some(moving) = approach(ctx, at)? {
            return Ok(moving);
        }

        let agent = ctx.agent;
        let combat = bound(ctx.systems.combat.as_deref_mut(), SystemKind::Combat)?;
        Ok(HandlerOutcome::from_domain(
            SystemKind::Combat,
            combat.request_attack(agent, target),
        ))
    }
}

pub struct FleeHandler;

impl TaskHandler for FleeHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Flee
    }

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        ensure_kind(self.kind(), task)?;
        ensure_bound(ctx.systems.movement.is_some(), SystemKind::Movement)?;

        if task.target().is_none() {
            return Err(HandlerError::MissingTarget(task.kind()));
        }
        let to = destination(task, ctx)?;

        let agent = ctx.agent;
        let movement = bound(ctx.systems.movement.as_deref_mut(), SystemKind::Movement)?;
        Ok(HandlerOutcome::from_domain(
            SystemKind::Movement,
            movement.request_flee(agent, to),
        ))
    }
}
