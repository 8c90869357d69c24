//! Gathering from resource nodes and depositing at storage

use crate::entity::KnownResource;
use crate::handlers::{
    approach, bound, entity_target, ensure_bound, ensure_kind, HandlerContext, HandlerError,
    HandlerOutcome, TaskHandler,
};
use crate::systems::{DomainStatus, SystemKind};
use crate::tasks::{Task, TaskKind, TaskTarget};

pub struct GatherHandler;

impl TaskHandler for GatherHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Gather
    }

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        ensure_kind(self.kind(), task)?;
        ensure_bound(ctx.systems.inventory.is_some(), SystemKind::Inventory)?;

        let source = entity_target(task)?;
        let resource = task
            .params()
            .get_resource("resource")
            .ok_or(HandlerError::MissingParam("resource"))?;

        // A remembered node that can no longer be located is gone
        let Some(at) = ctx.target_position else {
            ctx.memory.forget_resource(resource, source);
            return Err(HandlerError::TargetUnresolved(task.id()));
        };
        if let Some(moving) = approach(ctx, at)? {
            return Ok(moving);
        }

        let agent = ctx.agent;
        let inventory = bound(ctx.systems.inventory.as_deref_mut(), SystemKind::Inventory)?;
        let result = inventory.request_gather(agent, source, resource);

        match result.status {
            DomainStatus::Failed => ctx.memory.forget_resource(resource, source),
            DomainStatus::Completed => ctx.memory.remember_resource(
                resource,
                KnownResource {
                    id: source,
                    position: at,
                    seen_at: ctx.now,
                },
            ),
            _ => {}
        }

        Ok(HandlerOutcome::from_domain(SystemKind::Inventory, result))
    }
}

pub struct DepositHandler;

impl TaskHandler for DepositHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Deposit
    }

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        ensure_kind(self.kind(), task)?;
        ensure_bound(ctx.systems.inventory.is_some(), SystemKind::Inventory)?;

        let zone = task
            .target()
            .and_then(TaskTarget::zone)
            .ok_or(HandlerError::MissingTarget(task.kind()))?;
        let at = ctx
            .target_position
            .ok_or(HandlerError::TargetUnresolved(task.id()))?;
        if let Some(moving) = approach(ctx, at)? {
            return Ok(moving);
        }

        let agent = ctx.agent;
        let inventory = bound(ctx.systems.inventory.as_deref_mut(), SystemKind::Inventory)?;
        Ok(HandlerOutcome::from_domain(
            SystemKind::Inventory,
            inventory.request_deposit(agent, zone),
        ))
    }
}
