//! The surrounding simulation as seen by the orchestrator

use crate::core::types::Millis;
use crate::systems::DomainSystems;
use crate::world::WorldRegistry;

/// Clock, read-only world view and domain systems of the host simulation
///
/// Each agent cycle first reads through [`registry`](Self::registry), then
/// borrows the domain systems mutably for the single handler call. The two
/// borrows never overlap.
pub trait SimulationHost {
    /// Monotonic clock in milliseconds
    fn now(&self) -> Millis;

    fn registry(&self) -> WorldRegistry<'_>;

    fn systems(&mut self) -> DomainSystems<'_>;
}
