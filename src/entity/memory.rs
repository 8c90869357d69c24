//! Long-lived per-agent memory: where it has been, what it has found

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Millis, ResourceKind, Vec2, ZoneId};

/// A resource node the agent has seen or used
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnownResource {
    pub id: EntityId,
    pub position: Vec2,
    pub seen_at: Millis,
}

/// Memory of a single agent
///
/// Mutated only by handlers, read by detectors through their context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMemory {
    pub visited_zones: BTreeSet<ZoneId>,
    /// Most recent first
    pub visited_positions: VecDeque<Vec2>,
    /// Most recent first, per kind
    pub known_resources: BTreeMap<ResourceKind, Vec<KnownResource>>,
    pub last_exploration: Option<Millis>,
}

impl AgentMemory {
    const MAX_POSITIONS: usize = 16;
    const MAX_RESOURCES_PER_KIND: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resource node, keeping the most recent few per kind
    pub fn remember_resource(&mut self, kind: ResourceKind, resource: KnownResource) {
        let known = self.known_resources.entry(kind).or_default();
        known.retain(|r| r.id != resource.id);
        known.insert(0, resource);
        known.truncate(Self::MAX_RESOURCES_PER_KIND);
    }

    /// Drop a node that turned out to be gone
    pub fn forget_resource(&mut self, kind: ResourceKind, id: EntityId) {
        if let Some(known) = self.known_resources.get_mut(&kind) {
            known.retain(|r| r.id != id);
            if known.is_empty() {
                self.known_resources.remove(&kind);
            }
        }
    }

    /// Most recently seen node of a kind
    pub fn known_resource(&self, kind: ResourceKind) -> Option<&KnownResource> {
        self.known_resources.get(&kind).and_then(|known| known.first())
    }

    /// Closest remembered node of a kind
    pub fn nearest_known(&self, kind: ResourceKind, from: Vec2) -> Option<&KnownResource> {
        self.known_resources.get(&kind)?.iter().min_by(|a, b| {
            from.distance(&a.position)
                .partial_cmp(&from.distance(&b.position))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    pub fn record_visit(&mut self, position: Vec2, zone: Option<ZoneId>, now: Millis) {
        self.visited_positions.push_front(position);
        self.visited_positions.truncate(Self::MAX_POSITIONS);
        if let Some(zone) = zone {
            self.visited_zones.insert(zone);
        }
        self.last_exploration = Some(now);
    }

    /// Number of explorations remembered, used to vary exploration targets
    pub fn visit_count(&self) -> usize {
        self.visited_positions.len() + self.visited_zones.len()
    }
}

/// Memories of every tracked agent, created on first access
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    memories: AHashMap<EntityId, AgentMemory>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, agent: EntityId) -> Option<&AgentMemory> {
        self.memories.get(&agent)
    }

    pub fn get_or_create(&mut self, agent: EntityId) -> &mut AgentMemory {
        self.memories.entry(agent).or_default()
    }

    pub fn remove(&mut self, agent: EntityId) -> Option<AgentMemory> {
        self.memories.remove(&agent)
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(raw: u128, x: f32, seen_at: Millis) -> KnownResource {
        KnownResource {
            id: EntityId::from_raw(raw),
            position: Vec2::new(x, 0.0),
            seen_at,
        }
    }

    #[test]
    fn test_remember_keeps_recent_unique() {
        let mut memory = AgentMemory::new();
        for i in 0..6 {
            memory.remember_resource(ResourceKind::Wood, node(i, i as f32, i as u64));
        }
        // Re-seeing a node moves it to the front instead of duplicating it
        memory.remember_resource(ResourceKind::Wood, node(4, 4.0, 10));

        let known = &memory.known_resources[&ResourceKind::Wood];
        assert_eq!(known.len(), 4);
        assert_eq!(known[0].id, EntityId::from_raw(4));
        assert_eq!(known[0].seen_at, 10);
        assert_eq!(known.iter().filter(|r| r.id == EntityId::from_raw(4)).count(), 1);
    }

    #[test]
    fn test_nearest_known_and_forget() {
        let mut memory = AgentMemory::new();
        memory.remember_resource(ResourceKind::Food, node(1, 50.0, 0));
        memory.remember_resource(ResourceKind::Food, node(2, 5.0, 1));

        let nearest = memory.nearest_known(ResourceKind::Food, Vec2::new(0.0, 0.0)).unwrap();
        assert_eq!(nearest.id, EntityId::from_raw(2));

        memory.forget_resource(ResourceKind::Food, EntityId::from_raw(2));
        memory.forget_resource(ResourceKind::Food, EntityId::from_raw(1));
        assert!(memory.known_resource(ResourceKind::Food).is_none());
        assert!(!memory.known_resources.contains_key(&ResourceKind::Food));
    }

    #[test]
    fn test_record_visit() {
        let mut memory = AgentMemory::new();
        memory.record_visit(Vec2::new(1.0, 1.0), Some(ZoneId(3)), 500);
        memory.record_visit(Vec2::new(2.0, 2.0), None, 900);

        assert!(memory.visited_zones.contains(&ZoneId(3)));
        assert_eq!(memory.visited_positions.front(), Some(&Vec2::new(2.0, 2.0)));
        assert_eq!(memory.last_exploration, Some(900));
        assert_eq!(memory.visit_count(), 3);
    }

    #[test]
    fn test_store_lifecycle() {
        let mut store = MemoryStore::new();
        let agent = EntityId::from_raw(1);
        assert!(store.get(agent).is_none());

        store.get_or_create(agent).last_exploration = Some(5);
        assert_eq!(store.get(agent).unwrap().last_exploration, Some(5));

        assert!(store.remove(agent).is_some());
        assert!(store.is_empty());
    }
}
