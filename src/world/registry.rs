//! Borrowed view over system-owned agent state
//!
//! The registry holds non-owning references into the storage of each system.
//! Nothing is cloned until a detector context is assembled, and only the
//! fields that context needs.

use crate::core::types::{EntityId, Vec2};
use crate::tasks::TaskTarget;
use crate::world::sources::{
    InventorySource, NeedsSource, PositionSource, ProfileSource, VitalsSource,
};
use crate::world::spatial::SpatialQuery;
use crate::world::zones::WorldMetadata;

/// Typed handles into the simulation's systems for one read phase
///
/// Only positions are required; every other source is optional and
/// detectors simply see less when a system is not bound.
#[derive(Clone, Copy)]
pub struct WorldRegistry<'a> {
    pub positions: &'a dyn PositionSource,
    pub needs: Option<&'a dyn NeedsSource>,
    pub vitals: Option<&'a dyn VitalsSource>,
    pub inventory: Option<&'a dyn InventorySource>,
    pub profiles: Option<&'a dyn ProfileSource>,
    pub spatial: Option<&'a dyn SpatialQuery>,
    pub metadata: Option<&'a dyn WorldMetadata>,
}

impl<'a> WorldRegistry<'a> {
    pub fn new(positions: &'a dyn PositionSource) -> Self {
        Self {
            positions,
            needs: None,
            vitals: None,
            inventory: None,
            profiles: None,
            spatial: None,
            metadata: None,
        }
    }

    pub fn with_needs(mut self, needs: &'a dyn NeedsSource) -> Self {
        self.needs = Some(needs);
        self
    }

    pub fn with_vitals(mut self, vitals: &'a dyn VitalsSource) -> Self {
        self.vitals = Some(vitals);
        self
    }

    pub fn with_inventory(mut self, inventory: &'a dyn InventorySource) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_profiles(mut self, profiles: &'a dyn ProfileSource) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn with_spatial(mut self, spatial: &'a dyn SpatialQuery) -> Self {
        self.spatial = Some(spatial);
        self
    }

    pub fn with_metadata(mut self, metadata: &'a dyn WorldMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Position of an entity: positions first, then the spatial index
    pub fn locate(&self, entity: EntityId) -> Option<Vec2> {
        self.positions
            .position(entity)
            .or_else(|| self.spatial.and_then(|spatial| spatial.locate(entity)))
    }

    /// World position a task target refers to
    pub fn resolve_target(&self, target: &TaskTarget) -> Option<Vec2> {
        match target {
            TaskTarget::Position(pos) => Some(*pos),
            TaskTarget::Entity(entity) => self.locate(*entity),
            TaskTarget::Zone(zone) => self
                .metadata
                .and_then(|meta| meta.zone(*zone))
                .map(|zone| zone.center),
        }
    }
}
