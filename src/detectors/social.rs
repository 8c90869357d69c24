//! Helping allies and seeking company

use crate::core::SchedulerConfig;
use crate::detectors::{Detector, NeedBands};
use crate::entity::{NeedKind, Personality};
use crate::simulation::context::{DetectorContext, NearbyAgent};
use crate::tasks::{DetectorCategory, PriorityBand, TaskKind, TaskSpec};

/// Health ratio under which an ally counts as in trouble
const ALLY_HURT_RATIO: f32 = 0.3;

/// Own health ratio needed before stepping in for someone else
const HELPER_HEALTH_RATIO: f32 = 0.5;

pub struct SocialDetector {
    bands: NeedBands,
}

impl SocialDetector {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            bands: NeedBands::from_config(config),
        }
    }

    fn in_trouble(ally: &NearbyAgent) -> bool {
        ally.under_attack || ally.health_ratio.is_some_and(|ratio| ratio < ALLY_HURT_RATIO)
    }
}

impl Detector for SocialDetector {
    fn category(&self) -> DetectorCategory {
        DetectorCategory::Social
    }

    fn detect(&self, ctx: &DetectorContext) -> Vec<TaskSpec> {
        let sociability = ctx.profile.personality.sociability;
        let mut specs = Vec::new();

        if ctx.health_ratio() > HELPER_HEALTH_RATIO {
            if let Some(ally) = ctx.surroundings.agents.iter().find(|a| Self::in_trouble(a)) {
                specs.push(
                    TaskSpec::proposal(
                        TaskKind::Assist,
                        PriorityBand::HIGH + Personality::bias(sociability, 0.1),
                        DetectorCategory::Social,
                    )
                    .with_entity(ally.sighting.id),
                );
            }
        }

        if let (Some(needs), Some(other)) = (ctx.needs, ctx.nearest_agent()) {
            let (need, value) = if needs.fun < needs.social {
                (NeedKind::Fun, needs.fun)
            } else {
                (NeedKind::Social, needs.social)
            };
            if let Some(priority) = self.bands.priority(value) {
                specs.push(
                    TaskSpec::proposal(
                        TaskKind::Socialize,
                        priority + Personality::bias(sociability, 0.1),
                        DetectorCategory::Social,
                    )
                    .with_entity(other.sighting.id)
                    .with_param("need", need.as_str()),
                );
            }
        }

        specs
    }
}
