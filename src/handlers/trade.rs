use crate::handlers::{
    approach, bound, destination, entity_target, ensure_bound, ensure_kind, HandlerContext,
    HandlerError, HandlerOutcome, TaskHandler,
};
use crate::systems::SystemKind;
use crate::tasks::{Task, TaskKind};

pub struct TradeHandler;

impl TaskHandler for TradeHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Trade
    }

    fn execute(
        &self,
        task: &Task,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, HandlerError> {
        ensure_kind(self.kind(), task)?;
        ensure_bound(ctx.systems.trade.is_some(), SystemKind::Trade)?;

        let partner = entity_target(task)?;
        let offer = task.params().get_resource("offer");
        let at = destination(task, ctx)?;
        if let Some(moving) = approach(ctx, at)? {
            return Ok(moving);
        }

        let agent = ctx.agent;
        let trade = bound(ctx.systems.trade.as_deref_mut(), SystemKind::Trade)?;
        Ok(HandlerOutcome::from_domain(
            SystemKind::Trade,
            trade.request_trade(agent, partner, offer),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{EntityId, Vec2};
    use crate::entity::AgentMemory;
    use crate::handlers::fakes::{context, spec, task, Fake};
    use crate::systems::DomainResult;
    use crate::tasks::TaskStatus;

    #[test]
    fn test_offers_surplus() {
        let mut trade = Fake::new();
        let mut memory = AgentMemory::default();
        let mut ctx = context(&mut memory, Some(Vec2::new(1.0, 1.0)));
        ctx.systems.trade = Some(&mut trade);

        let partner = EntityId::from_raw(3);
        let deal = task(
            spec(TaskKind::Trade)
                .with_entity(partner)
                .with_param("offer", "stone"),
        );
        TradeHandler.execute(&deal, &mut ctx).unwrap();

        let open = task(spec(TaskKind::Trade).with_entity(partner));
        TradeHandler.execute(&open, &mut ctx).unwrap();
        drop(ctx);

        assert_eq!(
            trade.calls,
            vec![
                format!("trade {} stone", partner),
                format!("trade {} nothing", partner)
            ]
        );
    }

    #[test]
    fn test_rejected_trade_fails() {
        let mut trade = Fake::replying(DomainResult::failed("no interest"));
        let mut memory = AgentMemory::default();
        let mut ctx = context(&mut memory, Some(Vec2::new(1.0, 1.0)));
        ctx.systems.trade = Some(&mut trade);

        let deal = task(spec(TaskKind::Trade).with_entity(EntityId::from_raw(3)));
        let outcome = TradeHandler.execute(&deal, &mut ctx).unwrap();
        assert_eq!(outcome.resolution(), Some(TaskStatus::Failed));
        assert_eq!(outcome.message.as_deref(), Some("no interest"));
    }
}
