//! Hunger, thirst and energy

use crate::core::SchedulerConfig;
use crate::detectors::{Detector, NeedBands};
use crate::entity::NeedKind;
use crate::simulation::context::DetectorContext;
use crate::tasks::{DetectorCategory, TaskKind, TaskSpec};

pub struct NeedsDetector {
    bands: NeedBands,
}

impl NeedsDetector {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            bands: NeedBands::from_config(config),
        }
    }

    /// Consume task for a need, aimed at the best source the agent knows of
    ///
    /// Visible sources beat remembered ones, which beat carried supplies.
    fn consume(&self, ctx: &DetectorContext, need: NeedKind, priority: f32) -> Option<TaskSpec> {
        let resource = need.consumable()?;
        let spec = TaskSpec::proposal(TaskKind::SatisfyNeed, priority, DetectorCategory::Needs)
            .with_param("need", need.as_str())
            .with_param("resource", resource.as_str());

        if let Some(seen) = ctx.nearest_resource(resource) {
            return Some(spec.with_entity(seen.id));
        }
        if let Some(known) = ctx.memory.nearest_known(resource, ctx.position) {
            return Some(spec.with_entity(known.id));
        }
        if ctx.carried(resource) > 0 {
            return Some(spec.with_param("source", "inventory"));
        }
        None
    }
}

impl Detector for NeedsDetector {
    fn category(&self) -> DetectorCategory {
        DetectorCategory::Needs
    }

    fn detect(&self, ctx: &DetectorContext) -> Vec<TaskSpec> {
        let Some(needs) = ctx.needs else {
            return Vec::new();
        };
        let mut specs = Vec::new();

        // Hunger and thirst share a kind, so only the most pressing usable
        // one is proposed; a second proposal would just boost the first.
        let mut consumables: Vec<(NeedKind, f32)> = [NeedKind::Hunger, NeedKind::Thirst]
            .into_iter()
            .map(|need| (need, needs.get(need)))
            .collect();
        consumables.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let consume = consumables.into_iter().find_map(|(need, value)| {
            let priority = self.bands.priority(value)?;
            self.consume(ctx, need, priority)
        });
        specs.extend(consume);

        if let Some(priority) = self.bands.priority(needs.energy) {
            specs.push(
                TaskSpec::proposal(TaskKind::Rest, priority, DetectorCategory::Needs)
                    .with_param("need", NeedKind::Energy.as_str()),
            );
        }

        specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{EntityId, ResourceKind, Vec2};
    use crate::detectors::fixtures::{context, sighting};
    use crate::entity::{KnownResource, NeedsSnapshot};
    use crate::tasks::{PriorityBand, TaskTarget};
    use crate::world::InventoryLoad;
    use std::rc::Rc;

    fn detector() -> NeedsDetector {
        NeedsDetector::from_config(&SchedulerConfig::default())
    }

    fn needs(hunger: f32, thirst: f32, energy: f32) -> NeedsSnapshot {
        NeedsSnapshot {
            hunger,
            thirst,
            energy,
            ..Default::default()
        }
    }

    #[test]
    fn test_critical_hunger_targets_visible_food() {
        let mut ctx = context();
        ctx.needs = Some(needs(10.0, 100.0, 100.0));
        Rc::make_mut(&mut ctx.surroundings)
            .resources
            .insert(ResourceKind::Food, sighting(5, 4.0, 3.0));

        let specs = detector().detect(&ctx);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].kind, TaskKind::SatisfyNeed);
        assert_eq!(specs[0].priority, PriorityBand::CRITICAL);
        assert_eq!(specs[0].target, Some(TaskTarget::Entity(EntityId::from_raw(5))));
        assert_eq!(specs[0].params.get_str("need"), Some("hunger"));
    }

    #[test]
    fn test_satisfied_thirst_produces_nothing() {
        let mut ctx = context();
        ctx.needs = Some(needs(100.0, 40.0, 100.0));
        Rc::make_mut(&mut ctx.surroundings)
            .resources
            .insert(ResourceKind::Water, sighting(6, 1.0, 1.0));

        assert!(detector().detect(&ctx).is_empty());
    }

    #[test]
    fn test_bands_map_to_priorities() {
        let mut ctx = context();
        Rc::make_mut(&mut ctx.surroundings)
            .resources
            .insert(ResourceKind::Water, sighting(6, 1.0, 1.0));

        ctx.needs = Some(needs(100.0, 20.0, 100.0));
        assert_eq!(detector().detect(&ctx)[0].priority, PriorityBand::URGENT);

        ctx.needs = Some(needs(100.0, 25.0, 100.0));
        assert_eq!(detector().detect(&ctx)[0].priority, PriorityBand::NORMAL);
    }

    #[test]
    fn test_falls_back_to_memory_then_inventory() {
        let mut ctx = context();
        ctx.needs = Some(needs(12.0, 100.0, 100.0));
        ctx.memory.remember_resource(
            ResourceKind::Food,
            KnownResource {
                id: EntityId::from_raw(40),
                position: Vec2::new(50.0, 0.0),
                seen_at: 1_000,
            },
        );

        let specs = detector().detect(&ctx);
        assert_eq!(specs[0].target, Some(TaskTarget::Entity(EntityId::from_raw(40))));

        ctx.memory = Default::default();
        let mut inventory = InventoryLoad::with_capacity(10);
        inventory.items.insert(ResourceKind::Food, 2);
        ctx.inventory = Some(inventory);

        let specs = detector().detect(&ctx);
        assert_eq!(specs[0].target, None);
        assert_eq!(specs[0].params.get_str("source"), Some("inventory"));
    }

    #[test]
    fn test_nothing_to_eat_no_task() {
        let mut ctx = context();
        ctx.needs = Some(needs(5.0, 100.0, 100.0));
        assert!(detector().detect(&ctx).is_empty());
    }

    #[test]
    fn test_most_pressing_consumable_wins() {
        let mut ctx = context();
        ctx.needs = Some(needs(25.0, 10.0, 100.0));
        let surroundings = Rc::make_mut(&mut ctx.surroundings);
        surroundings.resources.insert(ResourceKind::Food, sighting(5, 1.0, 0.0));
        surroundings.resources.insert(ResourceKind::Water, sighting(6, 2.0, 0.0));

        let specs = detector().detect(&ctx);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].params.get_str("need"), Some("thirst"));
        assert_eq!(specs[0].priority, PriorityBand::CRITICAL);
    }

    #[test]
    fn test_tired_agent_rests() {
        let mut ctx = context();
        ctx.needs = Some(needs(100.0, 100.0, 18.0));

        let specs = detector().detect(&ctx);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].kind, TaskKind::Rest);
        assert_eq!(specs[0].priority, PriorityBand::URGENT);
    }

    #[test]
    fn test_repeated_detection_is_identical() {
        let mut ctx = context();
        ctx.needs = Some(needs(10.0, 20.0, 5.0));
        Rc::make_mut(&mut ctx.surroundings)
            .resources
            .insert(ResourceKind::Food, sighting(5, 4.0, 3.0));

        assert_eq!(detector().detect(&ctx), detector().detect(&ctx));
    }
}
