//! Curiosity-driven exploration

use crate::core::types::{Millis, Vec2};
use crate::core::SchedulerConfig;
use crate::detectors::Detector;
use crate::simulation::context::DetectorContext;
use crate::tasks::{DetectorCategory, PriorityBand, TaskKind, TaskSpec};

/// Spreads successive targets evenly around the agent
const GOLDEN_ANGLE: f32 = 2.399_963;

const MAX_CURIOSITY_BONUS: f32 = 0.2;

pub struct ExploreDetector {
    cooldown: Millis,
    reach: f32,
}

impl ExploreDetector {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            cooldown: config.explore_cooldown_ms,
            reach: config.search_radius * 0.75,
        }
    }

    fn due(&self, ctx: &DetectorContext) -> bool {
        ctx.memory
            .last_exploration
            .map_or(true, |last| ctx.now.saturating_sub(last) >= self.cooldown)
    }

    /// Point to explore, fixed for a given agent and number of past visits
    pub fn target(&self, ctx: &DetectorContext) -> Vec2 {
        let seed = (ctx.agent.fold() % 1024) as f32 / 1024.0 * std::f32::consts::TAU;
        let angle = seed + ctx.memory.visit_count() as f32 * GOLDEN_ANGLE;
        ctx.position + Vec2::new(angle.cos(), angle.sin()) * self.reach
    }
}

impl Detector for ExploreDetector {
    fn category(&self) -> DetectorCategory {
        DetectorCategory::Explore
    }

    fn detect(&self, ctx: &DetectorContext) -> Vec<TaskSpec> {
        if !self.due(ctx) {
            return Vec::new();
        }

        let curiosity = ctx.profile.personality.curiosity.clamp(0.0, 1.0);
        vec![TaskSpec::proposal(
            TaskKind::Explore,
            PriorityBand::LOWEST + curiosity * MAX_CURIOSITY_BONUS,
            DetectorCategory::Explore,
        )
        .with_position(self.target(ctx))]
    }
}
