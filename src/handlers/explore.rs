//! Exploring and idling
//!
//! Neither has a domain system of its own: exploring is plain movement that
//! ends by recording the visit, idling just waits out its duration.

use crate::handlers::{
    bound, destination, ensure_bound, ensure_kind, HandlerContext, HandlerError, HandlerOutcome, TaskHandler,
};
use crate::systems::{DomainStatus, SystemKind};
use crate::tasks::{Task, TaskKind};

pub struct ExploreHandler;

impl TaskHandler for ExploreHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Explore
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
        let result = movement.request_move(agent, to);
        if result.status == DomainStatus::Completed {
            ctx.memory.record_visit(to, ctx.target_zone, ctx.now);
        }
        Ok(HandlerOutcome::from_domain(SystemKind::Movement, result))
    }
}

/// Waits `duration_ms` (default 0) from task creation
pub struct IdleHandler;

impl TaskHandler for IdleHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Idle
    }

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        ensure_kind(self.kind(), task)?;
        let duration = task.params().get_u64("duration_ms").unwrap_or(0);

        if ctx.now >= task.created_at().saturating_add(duration) {
            Ok(HandlerOutcome::completed())
        } else {
            Ok(HandlerOutcome::in_progress(None).with_message("idling"))
        }
    }
}
