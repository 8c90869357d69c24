//! Interfaces the decision core consumes from the surrounding simulation

pub mod registry;
pub mod sources;
pub mod spatial;
pub mod zones;

pub use registry::WorldRegistry;
pub use sources::{
    InventoryLoad, InventorySource, NeedsSource, PositionSource, ProfileSource, Vitals,
    VitalsSource,
};
pub use spatial::{AnimalSighting, Sighting, SpatialQuery};
pub use zones::{ConstructionSite, ResourceStats, WorldMetadata, Zone, ZoneKind};
