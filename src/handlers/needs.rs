//! Eating, drinking and resting

use crate::entity::{KnownResource, NeedKind};
use crate::handlers::{
    approach, bound, destination, ensure_bound, ensure_kind, HandlerContext, HandlerError,
    HandlerOutcome, TaskHandler,
};
use crate::systems::{DomainStatus, SystemKind};
use crate::tasks::{Task, TaskKind, TaskTarget};

pub struct SatisfyNeedHandler;

impl TaskHandler for SatisfyNeedHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::SatisfyNeed
    }

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        ensure_kind(self.kind(), task)?;
        ensure_bound(ctx.systems.needs.is_some(), SystemKind::Needs)?;

        let raw = task
            .params()
            .get_str("need")
            .ok_or(HandlerError::MissingParam("need"))?;
        let need = NeedKind::parse(raw).ok_or_else(|| HandlerError::UnusableNeed(raw.to_string()))?;
        let resource = need
            .consumable()
            .ok_or_else(|| HandlerError::UnusableNeed(raw.to_string()))?;

        let source = task.target().and_then(TaskTarget::entity);
        if source.is_none() && task.params().get_str("source") != Some("inventory") {
            return Err(HandlerError::MissingTarget(task.kind()));
        }

        let at = match source {
            Some(_) => {
                let at = destination(task, ctx)?;
                if let Some(moving) = approach(ctx, at)? {
                    return Ok(moving);
                }
                Some(at)
            }
            None => None,
        };

        let agent = ctx.agent;
        let needs = bound(ctx.systems.needs.as_deref_mut(), SystemKind::Needs)?;
        let result = needs.request_consume(agent, need, source);

        if let (Some(id), Some(position)) = (source, at) {
            match result.status {
                DomainStatus::Failed => ctx.memory.forget_resource(resource, id),
                _ => ctx.memory.remember_resource(
                    resource,
                    KnownResource {
                        id,
                        position,
                        seen_at: ctx.now,
                    },
                ),
            }
        }

        Ok(HandlerOutcome::from_domain(SystemKind::Needs, result))
    }
}

pub struct RestHandler;

impl TaskHandler for RestHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Rest
    }

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        ensure_kind(self.kind(), task)?;
        let agent = ctx.agent;
        let needs = bound(ctx.systems.needs.as_deref_mut(), SystemKind::Needs)?;
        Ok(HandlerOutcome::from_domain(
            SystemKind::Needs,
            needs.request_rest(agent),
        ))
    }
}
