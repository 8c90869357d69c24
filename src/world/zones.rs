//! Zone and settlement metadata

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, ResourceKind, Vec2, ZoneId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Storage,
    Work,
    Craft,
    Rest,
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub kind: ZoneKind,
    pub center: Vec2,
    pub radius: f32,
}

impl Zone {
    pub fn contains(&self, pos: Vec2) -> bool {
        self.center.distance(&pos) <= self.radius
    }
}

/// A structure waiting for construction work
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstructionSite {
    pub id: EntityId,
    pub position: Vec2,
    /// 0.0 = just placed, 1.0 = finished
    pub progress: f32,
}

/// Settlement-wide stock per living agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub per_capita: BTreeMap<ResourceKind, f32>,
}

impl ResourceStats {
    pub fn get(&self, kind: ResourceKind) -> f32 {
        self.per_capita.get(&kind).copied().unwrap_or(0.0)
    }
}

/// World metadata shared by all agents
pub trait WorldMetadata {
    fn zones(&self) -> &[Zone];

    fn pending_constructions(&self) -> Vec<ConstructionSite>;

    fn resource_stats(&self) -> ResourceStats;

    fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones().iter().find(|zone| zone.id == id)
    }

    /// Zone of a kind closest to `from`, with its distance
    fn nearest_zone(&self, kind: ZoneKind, from: Vec2) -> Option<(Zone, f32)> {
        self.zones()
            .iter()
            .filter(|zone| zone.kind == kind)
            .map(|zone| (*zone, zone.center.distance(&from)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Zone containing a position, if any
    fn zone_at(&self, pos: Vec2) -> Option<ZoneId> {
        self.zones().iter().find(|zone| zone.contains(pos)).map(|zone| zone.id)
    }
}
