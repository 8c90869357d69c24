use crate::handlers::{
    approach, bound, destination, entity_target, ensure_bound, ensure_kind, HandlerContext,
    HandlerError, HandlerOutcome, TaskHandler,
};
use crate::systems::SystemKind;
use crate::tasks::{Task, TaskKind};

pub struct BuildHandler;

impl TaskHandler for BuildHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Build
    }

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        ensure_kind(self.kind(), task)?;
        ensure_bound(ctx.systems.building.is_some(), SystemKind::Building)?;

        let site = entity_target(task)?;
        let at = destination(task, ctx)?;
        if let Some(moving) = approach(ctx, at)? {
            return Ok(moving);
        }

        let agent = ctx.agent;
        let building = bound(ctx.systems.building.as_deref_mut(), SystemKind::Building)?;
        Ok(HandlerOutcome::from_domain(
            SystemKind::Building,
            building.request_contribute(agent, site),
        ))
    }
}
