//! Detector context - what an agent knows about itself and its surroundings
//!
//! A context has two halves. The agent's own state (needs, vitals,
//! inventory, profile, memory) is read fresh every time. The surroundings
//! (spatial lookups, zone proximity, settlement stats) are expensive and
//! come from a short-lived per-agent cache.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::core::types::{EntityId, Millis, ResourceKind, Vec2, ZoneId};
use crate::entity::{AgentMemory, AgentProfile, NeedsSnapshot, Role};
use crate::world::{
    ConstructionSite, InventoryLoad, ResourceStats, Sighting, Vitals, WorldRegistry, ZoneKind,
};

/// Another agent within the search radius
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyAgent {
    pub sighting: Sighting,
    pub health_ratio: Option<f32>,
    pub under_attack: bool,
    pub role: Option<Role>,
}

/// Distance to the nearest zone of a kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneProximity {
    pub zone: ZoneId,
    pub center: Vec2,
    pub distance: f32,
}

/// A construction site within the search radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbySite {
    pub site: ConstructionSite,
    pub distance: f32,
}

/// The cached, expensive half of a context
#[derive(Debug, Clone, PartialEq)]
pub struct Surroundings {
    pub built_at: Millis,
    pub origin: Vec2,
    /// Nearest node per resource kind within radius
    pub resources: BTreeMap<ResourceKind, Sighting>,
    /// Nearest first, excluding the observer
    pub agents: Vec<NearbyAgent>,
    pub predators: Vec<Sighting>,
    pub prey: Vec<Sighting>,
    pub storage: Option<ZoneProximity>,
    pub work: Option<ZoneProximity>,
    pub craft: Option<ZoneProximity>,
    /// Nearest first
    pub constructions: Vec<NearbySite>,
    pub stats: ResourceStats,
}

impl Surroundings {
    pub fn empty(built_at: Millis, origin: Vec2) -> Self {
        Self {
            built_at,
            origin,
            resources: BTreeMap::new(),
            agents: Vec::new(),
            predators: Vec::new(),
            prey: Vec::new(),
            storage: None,
            work: None,
            craft: None,
            constructions: Vec::new(),
            stats: ResourceStats::default(),
        }
    }

    /// Run every spatial and metadata query for one agent
    pub fn survey(
        agent: EntityId,
        position: Vec2,
        now: Millis,
        radius: f32,
        registry: &WorldRegistry<'_>,
    ) -> Self {
        let mut surroundings = Self::empty(now, position);

        if let Some(spatial) = registry.spatial {
            for kind in ResourceKind::ALL {
                if let Some(found) = spatial.nearest_resource(kind, position, radius) {
                    surroundings.resources.insert(kind, found);
                }
            }

            surroundings.agents = spatial
                .agents_in_radius(position, radius)
                .into_iter()
                .filter(|sighting| sighting.id != agent)
                .map(|sighting| {
                    let vitals = registry.vitals.and_then(|v| v.vitals(sighting.id));
                    NearbyAgent {
                        sighting,
                        health_ratio: vitals.map(|v| v.health_ratio()),
                        under_attack: vitals.is_some_and(|v| v.is_under_attack()),
                        role: registry
                            .profiles
                            .and_then(|p| p.profile(sighting.id))
                            .map(|p| p.role),
                    }
                })
                .collect();
            surroundings
                .agents
                .sort_by(|a, b| by_distance_then_id(&a.sighting, &b.sighting));

            for animal in spatial.animals_in_radius(position, radius) {
                if animal.predator {
                    surroundings.predators.push(animal.sighting);
                } else {
                    surroundings.prey.push(animal.sighting);
                }
            }
            surroundings.predators.sort_by(by_distance_then_id);
            surroundings.prey.sort_by(by_distance_then_id);
        }

        if let Some(meta) = registry.metadata {
            let proximity = |kind: ZoneKind| {
                meta.nearest_zone(kind, position).map(|(zone, distance)| ZoneProximity {
                    zone: zone.id,
                    center: zone.center,
                    distance,
                })
            };
            surroundings.storage = proximity(ZoneKind::Storage);
            surroundings.work = proximity(ZoneKind::Work);
            surroundings.craft = proximity(ZoneKind::Craft);

            surroundings.constructions = meta
                .pending_constructions()
                .into_iter()
                .map(|site| NearbySite {
                    site,
                    distance: position.distance(&site.position),
                })
                .filter(|nearby| nearby.distance <= radius && nearby.site.progress < 1.0)
                .collect();
            surroundings.constructions.sort_by(|a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.site.id.cmp(&b.site.id))
            });

            surroundings.stats = meta.resource_stats();
        }

        surroundings
    }
}

fn by_distance_then_id(a: &Sighting, b: &Sighting) -> std::cmp::Ordering {
    a.distance
        .partial_cmp(&b.distance)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}

/// Read-only snapshot handed to every detector
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorContext {
    pub agent: EntityId,
    pub now: Millis,
    pub position: Vec2,
    pub needs: Option<NeedsSnapshot>,
    pub vitals: Option<Vitals>,
    pub inventory: Option<InventoryLoad>,
    pub profile: AgentProfile,
    pub memory: AgentMemory,
    pub surroundings: Rc<Surroundings>,
}

impl DetectorContext {
    /// Context with nothing known beyond position
    pub fn bare(agent: EntityId, now: Millis, position: Vec2) -> Self {
        Self {
            agent,
            now,
            position,
            needs: None,
            vitals: None,
            inventory: None,
            profile: AgentProfile::default(),
            memory: AgentMemory::default(),
            surroundings: Rc::new(Surroundings::empty(now, position)),
        }
    }

    pub fn health_ratio(&self) -> f32 {
        self.vitals.map(|v| v.health_ratio()).unwrap_or(1.0)
    }

    pub fn attacker(&self) -> Option<EntityId> {
        self.vitals.and_then(|v| v.attacker)
    }

    pub fn load_ratio(&self) -> f32 {
        self.inventory.as_ref().map(InventoryLoad::load_ratio).unwrap_or(0.0)
    }

    pub fn carried(&self, kind: ResourceKind) -> u32 {
        self.inventory.as_ref().map(|inv| inv.count(kind)).unwrap_or(0)
    }

    pub fn nearest_resource(&self, kind: ResourceKind) -> Option<&Sighting> {
        self.surroundings.resources.get(&kind)
    }

    /// Position of a nearby agent or animal, if it was seen
    pub fn sighted_position(&self, entity: EntityId) -> Option<Vec2> {
        self.surroundings
            .agents
            .iter()
            .map(|a| &a.sighting)
            .chain(self.surroundings.predators.iter())
            .chain(self.surroundings.prey.iter())
            .find(|s| s.id == entity)
            .map(|s| s.position)
    }

    pub fn nearest_predator(&self) -> Option<&Sighting> {
        self.surroundings.predators.first()
    }

    pub fn nearest_agent(&self) -> Option<&NearbyAgent> {
        self.surroundings.agents.first()
    }
}
