//! Role-driven gathering

use crate::core::types::{EntityId, ResourceKind};
use crate::core::SchedulerConfig;
use crate::detectors::Detector;
use crate::entity::Personality;
use crate::simulation::context::DetectorContext;
use crate::tasks::{DetectorCategory, PriorityBand, TaskKind, TaskSpec};

pub struct WorkDetector {
    deposit_load_ratio: f32,
    scarcity_per_capita: f32,
}

impl WorkDetector {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            deposit_load_ratio: config.deposit_load_ratio,
            scarcity_per_capita: config.scarcity_per_capita,
        }
    }

    /// Visible node first, remembered node otherwise
    fn source(ctx: &DetectorContext, kind: ResourceKind) -> Option<EntityId> {
        ctx.nearest_resource(kind)
            .map(|seen| seen.id)
            .or_else(|| ctx.memory.nearest_known(kind, ctx.position).map(|known| known.id))
    }
}

impl Detector for WorkDetector {
    fn category(&self) -> DetectorCategory {
        DetectorCategory::Work
    }

    fn detect(&self, ctx: &DetectorContext) -> Vec<TaskSpec> {
        let gathers = ctx.profile.role.gathers();
        if gathers.is_empty() || ctx.load_ratio() >= self.deposit_load_ratio {
            return Vec::new();
        }

        let stats = &ctx.surroundings.stats;
        // Scarcest reachable kind; role order breaks ties
        let mut best: Option<(ResourceKind, EntityId, f32)> = None;
        for &kind in gathers {
            let Some(source) = Self::source(ctx, kind) else {
                continue;
            };
            let stock = stats.get(kind);
            if best.map_or(true, |(_, _, best_stock)| stock < best_stock) {
                best = Some((kind, source, stock));
            }
        }
        let Some((kind, source, stock)) = best else {
            return Vec::new();
        };

        let base = if stock < self.scarcity_per_capita {
            PriorityBand::HIGH
        } else {
            PriorityBand::NORMAL
        };
        let priority = base + Personality::bias(ctx.profile.personality.diligence, 0.1);

        vec![
            TaskSpec::proposal(TaskKind::Gather, priority, DetectorCategory::Work)
                .with_entity(source)
                .with_param("resource", kind.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec2;
    use crate::detectors::fixtures::{context, sighting};
    use crate::entity::{KnownResource, Role};
    use crate::tasks::TaskTarget;
    use crate::world::InventoryLoad;
    use std::rc::Rc;

    fn detect(ctx: &DetectorContext) -> Vec<TaskSpec> {
        WorkDetector::from_config(&SchedulerConfig::default()).detect(ctx)
    }

    #[test]
    fn test_unassigned_agents_do_not_gather() {
        let mut ctx = context();
        Rc::make_mut(&mut ctx.surroundings)
            .resources
            .insert(ResourceKind::Wood, sighting(3, 2.0, 2.0));
        assert!(detect(&ctx).is_empty());
    }

    #[test]
    fn test_scarcest_visible_kind_is_chosen() {
        let mut ctx = context();
        ctx.profile.role = Role::Gatherer;
        let surroundings = Rc::make_mut(&mut ctx.surroundings);
        surroundings.resources.insert(ResourceKind::Food, sighting(3, 2.0, 2.0));
        surroundings.resources.insert(ResourceKind::Wood, sighting(4, 9.0, 2.0));
        surroundings.stats.per_capita.insert(ResourceKind::Food, 12.0);
        surroundings.stats.per_capita.insert(ResourceKind::Wood, 2.0);
        // Stone is scarcer but nowhere to be found
        surroundings.stats.per_capita.insert(ResourceKind::Stone, 0.0);
        surroundings.stats.per_capita.insert(ResourceKind::Water, 50.0);

        let specs = detect(&ctx);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].kind, TaskKind::Gather);
        assert_eq!(specs[0].params.get_resource("resource"), Some(ResourceKind::Wood));
        assert_eq!(specs[0].target, Some(TaskTarget::Entity(EntityId::from_raw(4))));
        assert_eq!(specs[0].priority, PriorityBand::HIGH);
    }

    #[test]
    fn test_plentiful_stock_and_diligence() {
        let mut ctx = context();
        ctx.profile.role = Role::Woodcutter;
        ctx.profile.personality.diligence = 1.0;
        let surroundings = Rc::make_mut(&mut ctx.surroundings);
        surroundings.resources.insert(ResourceKind::Wood, sighting(4, 9.0, 2.0));
        surroundings.stats.per_capita.insert(ResourceKind::Wood, 40.0);

        let specs = detect(&ctx);
        assert!((specs[0].priority - (PriorityBand::NORMAL + 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_remembered_node_and_full_pack() {
        let mut ctx = context();
        ctx.profile.role = Role::Miner;
        ctx.memory.remember_resource(
            ResourceKind::Ore,
            KnownResource {
                id: EntityId::from_raw(77),
                position: Vec2::new(200.0, 0.0),
                seen_at: 0,
            },
        );

        let specs = detect(&ctx);
        assert_eq!(specs[0].target, Some(TaskTarget::Entity(EntityId::from_raw(77))));

        let mut inventory = InventoryLoad::with_capacity(10);
        inventory.items.insert(ResourceKind::Ore, 9);
        ctx.inventory = Some(inventory);
        assert!(detect(&ctx).is_empty());
    }
}
