//! Crafting, at a craft zone when one was given

use crate::handlers::{
    approach, bound, ensure_bound, ensure_kind, HandlerContext, HandlerError, HandlerOutcome,
    TaskHandler,
};
use crate::systems::SystemKind;
use crate::tasks::{Task, TaskKind};

pub struct CraftHandler;

impl TaskHandler for CraftHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Craft
    }

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        ensure_kind(self.kind(), task)?;
        ensure_bound(ctx.systems.crafting.is_some(), SystemKind::Crafting)?;

        let recipe = task
            .params()
            .get_str("recipe")
            .ok_or(HandlerError::MissingParam("recipe"))?;

        if task.target().is_some() {
            let at = ctx
                .target_position
                .ok_or(HandlerError::TargetUnresolved(task.id()))?;
            if let Some(moving) = approach(ctx, at)? {
                return Ok(moving);
            }
        }

        let agent = ctx.agent;
        let crafting = bound(ctx.systems.crafting.as_deref_mut(), SystemKind::Crafting)?;
        Ok(HandlerOutcome::from_domain(
            SystemKind::Crafting,
            crafting.request_craft(agent, recipe),
        ))
    }
}
