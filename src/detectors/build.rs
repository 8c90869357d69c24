//! Contribute to pending construction

use crate::core::SchedulerConfig;
use crate::detectors::Detector;
use crate::entity::{Personality, Role};
use crate::simulation::context::{DetectorContext, NearbySite};
use crate::tasks::{DetectorCategory, PriorityBand, TaskKind, TaskSpec};

/// Near-finished work is worth more than a short walk
const PROGRESS_WEIGHT: f32 = 0.5;
const DISTANCE_WEIGHT: f32 = 0.3;

const MAX_PROGRESS_BONUS: f32 = 0.2;
const BUILDER_BONUS: f32 = 0.1;

pub struct BuildDetector {
    radius: f32,
}

impl BuildDetector {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            radius: config.search_radius,
        }
    }

    fn score(&self, nearby: &NearbySite) -> f32 {
        nearby.site.progress * PROGRESS_WEIGHT - nearby.distance / self.radius * DISTANCE_WEIGHT
    }
}

impl Detector for BuildDetector {
    fn category(&self) -> DetectorCategory {
        DetectorCategory::Build
    }

    fn detect(&self, ctx: &DetectorContext) -> Vec<TaskSpec> {
        // Sites arrive nearest first; keep the first of equal scores
        let mut best: Option<(&NearbySite, f32)> = None;
        for nearby in &ctx.surroundings.constructions {
            let score = self.score(nearby);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((nearby, score));
            }
        }
        let Some((nearby, _)) = best else {
            return Vec::new();
        };

        let progress = nearby.site.progress.clamp(0.0, 1.0);
        let mut priority = PriorityBand::NORMAL + progress * MAX_PROGRESS_BONUS;
        if ctx.profile.role == Role::Builder {
            priority += BUILDER_BONUS;
        }
        priority += Personality::bias(ctx.profile.personality.diligence, 0.05);

        vec![
            TaskSpec::proposal(TaskKind::Build, priority, DetectorCategory::Build)
                .with_entity(nearby.site.id)
                .with_param("progress", f64::from(progress)),
        ]
    }
}
