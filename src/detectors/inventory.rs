//! Deposit carried goods at storage

use crate::core::SchedulerConfig;
use crate::detectors::Detector;
use crate::simulation::context::DetectorContext;
use crate::tasks::{DetectorCategory, PriorityBand, TaskKind, TaskSpec};

const FULL_LOAD: f32 = 0.95;
const TOP_UP_LOAD: f32 = 0.5;

pub struct InventoryDetector {
    deposit_load_ratio: f32,
    /// Distance under which a half-full agent drops off anyway
    near_storage: f32,
}

impl InventoryDetector {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            deposit_load_ratio: config.deposit_load_ratio,
            near_storage: config.interaction_range * 2.0,
        }
    }
}

impl Detector for InventoryDetector {
    fn category(&self) -> DetectorCategory {
        DetectorCategory::Inventory
    }

    fn detect(&self, ctx: &DetectorContext) -> Vec<TaskSpec> {
        let (Some(inventory), Some(storage)) = (&ctx.inventory, ctx.surroundings.storage) else {
            return Vec::new();
        };
        if inventory.total() == 0 {
            return Vec::new();
        }

        let load = inventory.load_ratio();
        let priority = if load >= FULL_LOAD {
            PriorityBand::URGENT
        } else if load >= self.deposit_load_ratio {
            PriorityBand::HIGH
        } else if load >= TOP_UP_LOAD && storage.distance <= self.near_storage {
            PriorityBand::NORMAL
        } else {
            return Vec::new();
        };

        vec![
            TaskSpec::proposal(TaskKind::Deposit, priority, DetectorCategory::Inventory)
                .with_zone(storage.zone)
                .with_param("load", f64::from(load)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ResourceKind, Vec2, ZoneId};
    use crate::detectors::fixtures::context;
    use crate::simulation::context::ZoneProximity;
    use crate::tasks::TaskTarget;
    use crate::world::InventoryLoad;
    use std::rc::Rc;

    fn carrying(wood: u32) -> InventoryLoad {
        let mut inventory = InventoryLoad::with_capacity(20);
        inventory.items.insert(ResourceKind::Wood, wood);
        inventory
    }

    fn with_storage(distance: f32) -> crate::simulation::context::DetectorContext {
        let mut ctx = context();
        Rc::make_mut(&mut ctx.surroundings).storage = Some(ZoneProximity {
            zone: ZoneId(3),
            center: Vec2::new(distance, 0.0),
            distance,
        });
        ctx
    }

    fn detect(ctx: &crate::simulation::context::DetectorContext) -> Vec<TaskSpec> {
        InventoryDetector::from_config(&SchedulerConfig::default()).detect(ctx)
    }

    #[test]
    fn test_load_thresholds() {
        let mut ctx = with_storage(30.0);

        ctx.inventory = Some(carrying(19));
        let specs = detect(&ctx);
        assert_eq!(specs[0].priority, PriorityBand::URGENT);
        assert_eq!(specs[0].target, Some(TaskTarget::Zone(ZoneId(3))));

        ctx.inventory = Some(carrying(16));
        assert_eq!(detect(&ctx)[0].priority, PriorityBand::HIGH);

        // Half full but storage is far away
        ctx.inventory = Some(carrying(10));
        assert!(detect(&ctx).is_empty());
    }

    #[test]
    fn test_half_load_near_storage() {
        let mut ctx = with_storage(3.0);
        ctx.inventory = Some(carrying(10));

        let specs = detect(&ctx);
        assert_eq!(specs[0].kind, TaskKind::Deposit);
        assert_eq!(specs[0].priority, PriorityBand::NORMAL);
    }

    #[test]
    fn test_requires_storage_and_goods() {
        let mut ctx = context();
        ctx.inventory = Some(carrying(20));
        assert!(detect(&ctx).is_empty());

        let mut ctx = with_storage(1.0);
        ctx.inventory = Some(InventoryLoad::with_capacity(0));
        assert!(detect(&ctx).is_empty());
    }
}
