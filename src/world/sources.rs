//! Per-agent state owned by the surrounding simulation systems
//!
//! Each trait is implemented by the system that owns the data. The decision
//! core only ever borrows these through a [`WorldRegistry`](super::WorldRegistry).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Millis, ResourceKind, Vec2};
use crate::entity::{AgentProfile, NeedsSnapshot};

/// Position lookup for agents and any other located entity
pub trait PositionSource {
    fn position(&self, entity: EntityId) -> Option<Vec2>;
}

pub trait NeedsSource {
    fn needs(&self, agent: EntityId) -> Option<NeedsSnapshot>;
}

pub trait VitalsSource {
    fn vitals(&self, agent: EntityId) -> Option<Vitals>;
}

pub trait InventorySource {
    fn inventory(&self, agent: EntityId) -> Option<InventoryLoad>;
}

pub trait ProfileSource {
    fn profile(&self, agent: EntityId) -> Option<AgentProfile>;
}

/// Health and combat signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: f32,
    pub max_health: f32,
    /// Whoever last attacked this agent, while the attack is still relevant
    pub attacker: Option<EntityId>,
    pub in_combat: bool,
    pub last_damaged_at: Option<Millis>,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            health: 100.0,
            max_health: 100.0,
            attacker: None,
            in_combat: false,
            last_damaged_at: None,
        }
    }
}

impl Vitals {
    pub fn health_ratio(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    pub fn is_under_attack(&self) -> bool {
        self.attacker.is_some() || self.in_combat
    }
}

/// What an agent carries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryLoad {
    pub items: BTreeMap<ResourceKind, u32>,
    pub capacity: u32,
}

impl InventoryLoad {
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            items: BTreeMap::new(),
            capacity,
        }
    }

    pub fn count(&self, kind: ResourceKind) -> u32 {
        self.items.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.items.values().sum()
    }

    /// Fraction of capacity in use; a zero-capacity inventory counts as full
    pub fn load_ratio(&self) -> f32 {
        if self.capacity == 0 {
            return 1.0;
        }
        (self.total() as f32 / self.capacity as f32).min(1.0)
    }

    /// Kind with the most units carried, ties broken by kind order
    pub fn largest_stack(&self) -> Option<(ResourceKind, u32)> {
        self.items
            .iter()
            .filter(|(_, count)| **count > 0)
            .fold(None, |best: Option<(ResourceKind, u32)>, (kind, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((*kind, *count)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_ratio() {
        let vitals = Vitals {
            health: 15.0,
            ..Vitals::default()
        };
        assert!((vitals.health_ratio() - 0.15).abs() < 1e-6);

        let broken = Vitals {
            max_health: 0.0,
            ..Vitals::default()
        };
        assert_eq!(broken.health_ratio(), 0.0);
    }

    #[test]
    fn test_load_ratio_and_stack() {
        let mut inventory = InventoryLoad::with_capacity(20);
        inventory.items.insert(ResourceKind::Wood, 6);
        inventory.items.insert(ResourceKind::Stone, 10);

        assert!((inventory.load_ratio() - 0.8).abs() < 1e-6);
        assert_eq!(inventory.largest_stack(), Some((ResourceKind::Stone, 10)));
        assert_eq!(InventoryLoad::default().load_ratio(), 1.0);
        assert_eq!(InventoryLoad::with_capacity(5).largest_stack(), None);
    }
}
