//! Socializing with and assisting other agents

use crate::handlers::{
    approach, bound, destination, entity_target, ensure_bound, ensure_kind, HandlerContext,
    HandlerError, HandlerOutcome, TaskHandler,
};
use crate::systems::SystemKind;
use crate::tasks::{Task, TaskKind};

pub struct SocializeHandler;

impl TaskHandler for SocializeHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Socialize
    }

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        ensure_kind(self.kind(), task)?;
        ensure_bound(ctx.systems.social.is_some(), SystemKind::Social)?;

        let other = entity_target(task)?;
        let at = destination(task, ctx)?;
        if let Some(moving) = approach(ctx, at)? {
            return Ok(moving);
        }

        let agent = ctx.agent;
        let social = bound(ctx.systems.social.as_deref_mut(), SystemKind::Social)?;
        Ok(HandlerOutcome::from_domain(
            SystemKind::Social,
            social.request_interaction(agent, other),
        ))
    }
}

pub struct AssistHandler;

impl TaskHandler for AssistHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Assist
    }

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        ensure_kind(self.kind(), task)?;
        ensure_bound(ctx.systems.social.is_some(), SystemKind::Social)?;

        let other = entity_target(task)?;
        let at = destination(task, ctx)?;
        if let Some(moving) = approach(ctx, at)? {
            return Ok(moving);
        }

        let agent = ctx.agent;
        let social = bound(ctx.systems.social.as_deref_mut(), SystemKind::Social)?;
        Ok(HandlerOutcome::from_domain(
            SystemKind::Social,
            social.request_assist(agent, other),
        ))
    }
}
