//! Threat responses: flee, fight back, defend against predators, hunt

use crate::core::types::{EntityId, Vec2};
use crate::core::SchedulerConfig;
use crate::detectors::Detector;
use crate::entity::Role;
use crate::simulation::context::DetectorContext;
use crate::tasks::{DetectorCategory, PriorityBand, TaskKind, TaskSpec};

/// Aggression under which an unarmed agent runs instead of fighting back
const TIMID_AGGRESSION: f32 = 0.3;

/// Health ratio needed to take on a predator
const FIGHT_HEALTH_RATIO: f32 = 0.5;

pub struct CombatDetector {
    flee_health_ratio: f32,
    hungry_below: f32,
    flee_distance: f32,
}

impl CombatDetector {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            flee_health_ratio: config.flee_health_ratio,
            hungry_below: config.need_low,
            flee_distance: config.search_radius * 0.5,
        }
    }

    fn flee(&self, ctx: &DetectorContext, threat: Option<(EntityId, Vec2)>, priority: f32) -> TaskSpec {
        let direction = match threat {
            Some((_, at)) if at.distance(&ctx.position) > 0.001 => (ctx.position - at).normalize(),
            // No usable threat vector, pick a direction stable for this agent
            _ => {
                let angle = (ctx.agent.fold() % 360) as f32 * std::f32::consts::PI / 180.0;
                Vec2::new(angle.cos(), angle.sin())
            }
        };
        let destination = ctx.position + direction * self.flee_distance;

        let spec = TaskSpec::proposal(TaskKind::Flee, priority, DetectorCategory::Combat)
            .with_position(destination);
        match threat {
            Some((id, _)) => spec.with_param("threat", id.to_string()),
            None => spec,
        }
    }

    /// Attacker first, then the nearest predator
    fn threat(&self, ctx: &DetectorContext) -> Option<(EntityId, Vec2)> {
        if let Some(attacker) = ctx.attacker() {
            if let Some(at) = ctx.sighted_position(attacker) {
                return Some((attacker, at));
            }
        }
        ctx.nearest_predator().map(|p| (p.id, p.position))
    }
}

impl Detector for CombatDetector {
    fn category(&self) -> DetectorCategory {
        DetectorCategory::Combat
    }

    fn detect(&self, ctx: &DetectorContext) -> Vec<TaskSpec> {
        let health = ctx.health_ratio();
        let attacker = ctx.attacker();
        let predator = ctx.nearest_predator();
        let profile = &ctx.profile;

        if health < self.flee_health_ratio && (attacker.is_some() || predator.is_some()) {
            return vec![self.flee(ctx, self.threat(ctx), PriorityBand::CRITICAL)];
        }

        if let Some(attacker) = attacker {
            let timid = !profile.has_weapon && profile.personality.aggression < TIMID_AGGRESSION;
            if timid {
                return vec![self.flee(ctx, self.threat(ctx), PriorityBand::URGENT)];
            }
            return vec![
                TaskSpec::proposal(TaskKind::Attack, PriorityBand::URGENT, DetectorCategory::Combat)
                    .with_entity(attacker),
            ];
        }

        if let Some(predator) = predator {
            if profile.has_weapon && health > FIGHT_HEALTH_RATIO {
                return vec![
                    TaskSpec::proposal(TaskKind::Attack, PriorityBand::HIGH, DetectorCategory::Combat)
                        .with_entity(predator.id),
                ];
            }
            return vec![self.flee(
                ctx,
                Some((predator.id, predator.position)),
                PriorityBand::URGENT,
            )];
        }

        let hungry = ctx.needs.is_some_and(|n| n.hunger < self.hungry_below);
        if profile.has_weapon && (profile.role == Role::Hunter || hungry) {
            if let Some(prey) = ctx.surroundings.prey.first() {
                return vec![
                    TaskSpec::proposal(TaskKind::Hunt, PriorityBand::NORMAL, DetectorCategory::Combat)
                        .with_entity(prey.id),
                ];
            }
        }

        Vec::new()
    }
}
