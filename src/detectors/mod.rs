//! Detectors - pure functions from a context snapshot to candidate tasks
//!
//! Each detector covers one behavior category and may propose zero or more
//! tasks. Detectors never touch the queue; the orchestrator stamps and
//! enqueues what they return. Calling a detector twice on the same context
//! yields the same proposals.

pub mod build;
pub mod combat;
pub mod craft;
pub mod explore;
pub mod inventory;
pub mod needs;
pub mod social;
pub mod trade;
pub mod work;

use crate::core::SchedulerConfig;
use crate::simulation::context::DetectorContext;
use crate::tasks::{DetectorCategory, PriorityBand, TaskSpec};

pub use build::BuildDetector;
pub use combat::CombatDetector;
pub use craft::CraftDetector;
pub use explore::ExploreDetector;
pub use inventory::InventoryDetector;
pub use needs::NeedsDetector;
pub use social::SocialDetector;
pub use trade::TradeDetector;
pub use work::WorkDetector;

pub trait Detector {
    fn category(&self) -> DetectorCategory;

    fn detect(&self, ctx: &DetectorContext) -> Vec<TaskSpec>;
}

/// Need thresholds shared by the needs and social detectors
///
/// Needs run 0-100 with 100 satisfied, so lower values are more pressing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeedBands {
    pub critical: f32,
    pub urgent: f32,
    pub low: f32,
}

impl NeedBands {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            critical: config.need_critical,
            urgent: config.need_urgent,
            low: config.need_low,
        }
    }

    /// Priority for a need value, `None` when the need is not low
    pub fn priority(&self, value: f32) -> Option<f32> {
        if value < self.critical {
            Some(PriorityBand::CRITICAL)
        } else if value < self.urgent {
            Some(PriorityBand::URGENT)
        } else if value < self.low {
            Some(PriorityBand::NORMAL)
        } else {
            None
        }
    }
}

/// Detectors kept in category run order
pub struct DetectorSet {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorSet {
    pub fn empty() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// One detector per category, configured from `config`
    pub fn standard(config: &SchedulerConfig) -> Self {
        let mut set = Self::empty();
        set.register(Box::new(CombatDetector::from_config(config)));
        set.register(Box::new(NeedsDetector::from_config(config)));
        set.register(Box::new(InventoryDetector::from_config(config)));
        set.register(Box::new(WorkDetector::from_config(config)));
        set.register(Box::new(CraftDetector));
        set.register(Box::new(BuildDetector::from_config(config)));
        set.register(Box::new(SocialDetector::from_config(config)));
        set.register(Box::new(TradeDetector));
        set.register(Box::new(ExploreDetector::from_config(config)));
        set
    }

    /// Add a detector after every registered detector of the same or an
    /// earlier category
    pub fn register(&mut self, detector: Box<dyn Detector>) {
        let category = detector.category();
        let at = self
            .detectors
            .iter()
            .position(|d| d.category() > category)
            .unwrap_or(self.detectors.len());
        self.detectors.insert(at, detector);
    }

    /// Run every detector in order and concatenate their proposals
    pub fn run(&self, ctx: &DetectorContext) -> Vec<TaskSpec> {
        self.detectors
            .iter()
            .flat_map(|detector| detector.detect(ctx))
            .collect()
    }

    pub fn categories(&self) -> Vec<DetectorCategory> {
        self.detectors.iter().map(|d| d.category()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl Default for DetectorSet {
    fn default() -> Self {
        Self::standard(&SchedulerConfig::default())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::core::types::{EntityId, Vec2};
    use crate::simulation::context::DetectorContext;
    use crate::world::Sighting;

    pub fn agent() -> EntityId {
        EntityId::from_raw(1)
    }

    pub fn context() -> DetectorContext {
        DetectorContext::bare(agent(), 100_000, Vec2::new(0.0, 0.0))
    }

    pub fn sighting(raw: u128, x: f32, y: f32) -> Sighting {
        Sighting::new(EntityId::from_raw(raw), Vec2::new(x, y), Vec2::new(0.0, 0.0))
    }
}
