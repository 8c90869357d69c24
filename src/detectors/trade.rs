//! Trading away surplus

use crate::detectors::Detector;
use crate::entity::{Personality, Role};
use crate::simulation::context::{DetectorContext, NearbyAgent};
use crate::tasks::{DetectorCategory, PriorityBand, TaskKind, TaskSpec};

/// Units of one kind that count as surplus
const SURPLUS: u32 = 20;

pub struct TradeDetector;

impl TradeDetector {
    /// A trader if one is around, otherwise whoever is nearest
    fn partner(ctx: &DetectorContext) -> Option<&NearbyAgent> {
        let agents = &ctx.surroundings.agents;
        if ctx.profile.role != Role::Trader {
            if let Some(trader) = agents.iter().find(|a| a.role == Some(Role::Trader)) {
                return Some(trader);
            }
        }
        agents.first()
    }
}

impl Detector for TradeDetector {
    fn category(&self) -> DetectorCategory {
        DetectorCategory::Trade
    }

    fn detect(&self, ctx: &DetectorContext) -> Vec<TaskSpec> {
        let surplus = ctx
            .inventory
            .as_ref()
            .and_then(|inventory| inventory.largest_stack())
            .filter(|(_, count)| *count >= SURPLUS);
        if ctx.profile.role != Role::Trader && surplus.is_none() {
            return Vec::new();
        }
        let Some(partner) = Self::partner(ctx) else {
            return Vec::new();
        };

        let priority = PriorityBand::LOW + Personality::bias(ctx.profile.personality.greed, 0.1);
        let spec = TaskSpec::proposal(TaskKind::Trade, priority, DetectorCategory::Trade)
            .with_entity(partner.sighting.id);
        let spec = match surplus {
            Some((kind, count)) => spec
                .with_param("offer", kind.as_str())
                .with_param("amount", count),
            None => spec,
        };
        vec![spec]
    }
}
