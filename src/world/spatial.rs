//! Spatial query surface consumed by context assembly

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, ResourceKind, Vec2};

/// Something found by a spatial query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub id: EntityId,
    pub position: Vec2,
    pub distance: f32,
}

impl Sighting {
    pub fn new(id: EntityId, position: Vec2, from: Vec2) -> Self {
        Self {
            id,
            position,
            distance: from.distance(&position),
        }
    }
}

/// An animal found by a spatial query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimalSighting {
    pub sighting: Sighting,
    pub predator: bool,
}

/// Radius queries over the world's spatial index
///
/// Results are sorted nearest first.
pub trait SpatialQuery {
    fn nearest_resource(&self, kind: ResourceKind, from: Vec2, radius: f32) -> Option<Sighting>;

    fn agents_in_radius(&self, center: Vec2, radius: f32) -> Vec<Sighting>;

    fn animals_in_radius(&self, center: Vec2, radius: f32) -> Vec<AnimalSighting>;

    /// Position of any indexed entity (agents, animals, resource nodes, sites)
    fn locate(&self, entity: EntityId) -> Option<Vec2>;
}
