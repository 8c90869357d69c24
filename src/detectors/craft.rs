//! Crafting: arm the armed roles first, then keep crafters busy

use crate::detectors::Detector;
use crate::entity::{CraftOption, Role};
use crate::simulation::context::DetectorContext;
use crate::tasks::{DetectorCategory, PriorityBand, TaskKind, TaskSpec};

pub struct CraftDetector;

impl CraftDetector {
    fn choose<'a>(ctx: &'a DetectorContext) -> Option<(&'a CraftOption, f32)> {
        let profile = &ctx.profile;

        if profile.role.is_armed_role() && !profile.has_weapon {
            if let Some(weapon) = profile.craftable.iter().find(|option| option.weapon) {
                return Some((weapon, PriorityBand::HIGH));
            }
        }

        if profile.role == Role::Crafter {
            return profile
                .craftable
                .first()
                .map(|option| (option, PriorityBand::NORMAL));
        }

        None
    }
}

impl Detector for CraftDetector {
    fn category(&self) -> DetectorCategory {
        DetectorCategory::Craft
    }

    fn detect(&self, ctx: &DetectorContext) -> Vec<TaskSpec> {
        let Some((option, priority)) = Self::choose(ctx) else {
            return Vec::new();
        };

        let spec = TaskSpec::proposal(TaskKind::Craft, priority, DetectorCategory::Craft)
            .with_param("recipe", option.recipe.as_str());
        let spec = match ctx.surroundings.craft {
            Some(craft) => spec.with_zone(craft.zone),
            None => spec,
        };
        vec![spec]
    }
}
