//! In-process reference world
//!
//! A small deterministic settlement implementing every interface the
//! scheduler consumes. Used by the integration tests and the demo binary.

pub mod systems;

use std::collections::BTreeMap;

use ahash::AHashMap;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::core::types::{EntityId, Millis, ResourceKind, Vec2, ZoneId};
use crate::entity::{AgentProfile, CraftOption, NeedKind, NeedsSnapshot, Personality, Role};
use crate::simulation::SimulationHost;
use crate::spatial::SparseHashGrid;
use crate::systems::DomainSystems;
use crate::world::{
    AnimalSighting, ConstructionSite, InventoryLoad, InventorySource, NeedsSource, PositionSource,
    ProfileSource, ResourceStats, Sighting, SpatialQuery, Vitals, VitalsSource, WorldMetadata,
    WorldRegistry, Zone, ZoneKind,
};

pub use systems::{
    Request, RequestLog, ResourceNode, SandboxBuilding, SandboxCombat, SandboxCrafting,
    SandboxInventory, SandboxMovement, SandboxNeeds, SandboxSocial, SandboxTrade, REQUEST_LOG_LEN,
};

/// Need points restored by one consumption
const MEAL: f32 = 40.0;
const CHAT: f32 = 25.0;
const FIRST_AID: f32 = 15.0;
const TRADE_UNITS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occupant {
    Agent,
    Animal { predator: bool },
    Resource,
    Site,
}

pub struct Sandbox {
    now: Millis,
    next_id: u128,
    next_zone: u32,
    /// Agents in spawn order
    agents: Vec<EntityId>,
    profiles: AHashMap<EntityId, AgentProfile>,
    occupants: AHashMap<EntityId, Occupant>,
    zones: Vec<Zone>,
    grid: SparseHashGrid,

    pub movement: SandboxMovement,
    pub combat: SandboxCombat,
    pub needs: SandboxNeeds,
    pub inventory: SandboxInventory,
    pub social: SandboxSocial,
    pub crafting: SandboxCrafting,
    pub building: SandboxBuilding,
    pub trade: SandboxTrade,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_id: 1,
            next_zone: 1,
            agents: Vec::new(),
            profiles: AHashMap::new(),
            occupants: AHashMap::new(),
            zones: Vec::new(),
            grid: SparseHashGrid::new(16.0),
            movement: SandboxMovement::new(4.0),
            combat: SandboxCombat::new(25.0),
            needs: SandboxNeeds::new(0.5),
            inventory: SandboxInventory::new(5),
            social: SandboxSocial::default(),
            crafting: SandboxCrafting::with_standard_recipes(),
            building: SandboxBuilding::new(0.25),
            trade: SandboxTrade::default(),
        }
    }

    /// Settlement with zones, resource nodes and `agents` randomized agents
    pub fn generate(agents: usize, rng: &mut ChaCha8Rng) -> Self {
        let mut world = Self::new();
        world.add_zone(ZoneKind::Storage, Vec2::new(0.0, 0.0), 6.0);
        world.add_zone(ZoneKind::Craft, Vec2::new(12.0, 0.0), 4.0);
        world.add_zone(ZoneKind::Work, Vec2::new(-12.0, 0.0), 4.0);
        world.add_zone(ZoneKind::Rest, Vec2::new(0.0, 12.0), 4.0);

        for kind in ResourceKind::ALL {
            for _ in 0..3 {
                let pos = Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
                world.spawn_resource(kind, pos, rng.gen_range(20..60));
            }
        }
        for _ in 0..2 {
            let pos = Vec2::new(rng.gen_range(-40.0..40.0), rng.gen_range(-40.0..40.0));
            world.spawn_site(pos, rng.gen_range(0.0..0.6));
        }
        for i in 0..4 {
            let pos = Vec2::new(rng.gen_range(-70.0..70.0), rng.gen_range(-70.0..70.0));
            world.spawn_animal(pos, i == 0);
        }

        const ROLES: [Role; 9] = [
            Role::Gatherer,
            Role::Farmer,
            Role::Woodcutter,
            Role::Miner,
            Role::Builder,
            Role::Crafter,
            Role::Hunter,
            Role::Guard,
            Role::Trader,
        ];
        for _ in 0..agents {
            let pos = Vec2::new(rng.gen_range(-20.0..20.0), rng.gen_range(-20.0..20.0));
            let profile = AgentProfile {
                role: ROLES[rng.gen_range(0..ROLES.len())],
                personality: Personality {
                    diligence: rng.gen(),
                    sociability: rng.gen(),
                    curiosity: rng.gen(),
                    aggression: rng.gen(),
                    greed: rng.gen(),
                },
                ..Default::default()
            };
            let agent = world.spawn_agent(pos, profile);
            world.set_needs(
                agent,
                NeedsSnapshot {
                    hunger: rng.gen_range(10.0..100.0),
                    thirst: rng.gen_range(10.0..100.0),
                    energy: rng.gen_range(20.0..100.0),
                    social: rng.gen_range(20.0..100.0),
                    fun: rng.gen_range(20.0..100.0),
                },
            );
        }
        world
    }

    fn next_entity(&mut self) -> EntityId {
        let id = EntityId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn agents(&self) -> &[EntityId] {
        &self.agents
    }

    /// Spawn an agent with full needs, full health and an empty pack
    pub fn spawn_agent(&mut self, pos: Vec2, profile: AgentProfile) -> EntityId {
        let id = self.next_entity();
        self.agents.push(id);
        self.profiles.insert(id, profile);
        self.occupants.insert(id, Occupant::Agent);
        self.grid.insert(id, pos);
        self.movement.place(id, pos);
        self.combat.insert(id, Vitals::default());
        self.needs.insert(id, NeedsSnapshot::default());
        self.inventory.insert_load(id, InventoryLoad::with_capacity(20));
        id
    }

    pub fn spawn_animal(&mut self, pos: Vec2, predator: bool) -> EntityId {
        let id = self.next_entity();
        self.occupants.insert(id, Occupant::Animal { predator });
        self.grid.insert(id, pos);
        self.combat.insert(
            id,
            Vitals {
                health: 40.0,
                max_health: 40.0,
                ..Default::default()
            },
        );
        id
    }

    pub fn spawn_resource(&mut self, kind: ResourceKind, pos: Vec2, amount: u32) -> EntityId {
        let id = self.next_entity();
        self.occupants.insert(id, Occupant::Resource);
        self.grid.insert(id, pos);
        self.inventory.insert_node(
            id,
            ResourceNode {
                kind,
                position: pos,
                amount,
            },
        );
        id
    }

    pub fn spawn_site(&mut self, pos: Vec2, progress: f32) -> EntityId {
        let id = self.next_entity();
        self.occupants.insert(id, Occupant::Site);
        self.grid.insert(id, pos);
        self.building.sites.push(ConstructionSite {
            id,
            position: pos,
            progress: progress.clamp(0.0, 1.0),
        });
        id
    }

    pub fn add_zone(&mut self, kind: ZoneKind, center: Vec2, radius: f32) -> ZoneId {
        let id = ZoneId(self.next_zone);
        self.next_zone += 1;
        self.zones.push(Zone {
            id,
            kind,
            center,
            radius,
        });
        id
    }

    pub fn set_needs(&mut self, agent: EntityId, needs: NeedsSnapshot) {
        self.needs.insert(agent, needs);
    }

    pub fn set_need(&mut self, agent: EntityId, need: NeedKind, value: f32) {
        if let Some(needs) = self.needs.get_mut(agent) {
            needs.set(need, value);
        }
    }

    pub fn profile_mut(&mut self, agent: EntityId) -> Option<&mut AgentProfile> {
        self.profiles.get_mut(&agent)
    }

    pub fn give(&mut self, agent: EntityId, kind: ResourceKind, amount: u32) -> u32 {
        self.inventory.add_to_load(agent, kind, amount)
    }

    /// Apply damage from outside the combat system (traps, falls, scripted hits)
    pub fn wound(&mut self, agent: EntityId, damage: f32, attacker: Option<EntityId>) {
        let now = self.now;
        if let Some(vitals) = self.combat.vitals_mut(agent) {
            vitals.health = (vitals.health - damage).max(0.0);
            vitals.last_damaged_at = Some(now);
            if attacker.is_some() {
                vitals.attacker = attacker;
                vitals.in_combat = true;
            }
        }
    }

    /// Remove any entity from every system
    pub fn despawn(&mut self, entity: EntityId) {
        self.agents.retain(|a| *a != entity);
        self.profiles.remove(&entity);
        self.occupants.remove(&entity);
        self.grid.remove(entity);
        self.movement.remove(entity);
        self.combat.remove(entity);
        self.needs.remove(entity);
        self.inventory.remove_load(entity);
        self.building.sites.retain(|s| s.id != entity);
    }

    /// Recent requests, grouped by system; each system keeps its last
    /// [`REQUEST_LOG_LEN`] entries
    pub fn requests(&self) -> impl Iterator<Item = &Request> {
        self.movement
            .log
            .entries()
            .chain(self.combat.log.entries())
            .chain(self.needs.log.entries())
            .chain(self.inventory.log.entries())
            .chain(self.social.log.entries())
            .chain(self.crafting.log.entries())
            .chain(self.building.log.entries())
            .chain(self.trade.log.entries())
    }

    pub fn requests_by(&self, agent: EntityId) -> Vec<&Request> {
        self.requests().filter(|r| r.agent == agent).collect()
    }

    /// Advance the world clock and apply queued effects
    ///
    /// Returns the agents that fell this step.
    pub fn advance(&mut self, dt: Millis) -> Vec<EntityId> {
        self.now += dt;
        let dt_secs = dt as f32 / 1000.0;

        for (agent, pos) in self.movement.step(dt_secs) {
            self.grid.insert(agent, pos);
        }
        self.needs.tick(dt_secs);
        self.apply_consumptions();
        self.apply_social();
        self.apply_crafting();
        self.apply_trades();

        for node in self.inventory.drain_depleted() {
            self.occupants.remove(&node);
            self.grid.remove(node);
        }

        let fallen = self.combat.fallen();
        let mut fallen_agents = Vec::new();
        for entity in fallen {
            if self.occupants.get(&entity) == Some(&Occupant::Agent) {
                fallen_agents.push(entity);
            }
            tracing::debug!("{} fell", entity);
            self.despawn(entity);
        }
        self.combat.settle();
        fallen_agents
    }

    fn apply_consumptions(&mut self) {
        for consumption in std::mem::take(&mut self.needs.consumptions) {
            let Some(kind) = consumption.need.consumable() else {
                continue;
            };
            let taken = match consumption.source {
                Some(node) if self.inventory.node(node).is_some_and(|n| n.kind == kind) => {
                    self.inventory.take_from_node(node, 1)
                }
                Some(_) => 0,
                None => self.inventory.take_from_load(consumption.agent, kind, 1),
            };
            if taken > 0 {
                self.needs.restore(consumption.agent, consumption.need, MEAL);
            } else {
                tracing::trace!("{} found nothing to consume", consumption.agent);
            }
        }
    }

    fn apply_social(&mut self) {
        for (agent, other) in std::mem::take(&mut self.social.interactions) {
            for who in [agent, other] {
                self.needs.restore(who, NeedKind::Social, CHAT);
                self.needs.restore(who, NeedKind::Fun, CHAT);
            }
        }
        for (_, other) in std::mem::take(&mut self.social.assists) {
            if let Some(vitals) = self.combat.vitals_mut(other) {
                vitals.health = (vitals.health + FIRST_AID).min(vitals.max_health);
            }
        }
    }

    fn apply_crafting(&mut self) {
        for (agent, name) in std::mem::take(&mut self.crafting.orders) {
            let Some(recipe) = self.crafting.recipes.get(&name) else {
                continue;
            };
            let affordable = recipe.inputs.iter().all(|(kind, count)| {
                self.inventory
                    .load(agent)
                    .is_some_and(|load| load.count(*kind) >= *count)
            });
            if !affordable {
                tracing::trace!("{} lacks inputs for {}", agent, name);
                continue;
            }
            for (kind, count) in &recipe.inputs {
                self.inventory.take_from_load(agent, *kind, *count);
            }
            if recipe.weapon {
                if let Some(profile) = self.profiles.get_mut(&agent) {
                    profile.has_weapon = true;
                }
            }
        }
    }

    fn apply_trades(&mut self) {
        for (agent, partner, kind) in std::mem::take(&mut self.trade.offers) {
            let moved = self.inventory.take_from_load(agent, kind, TRADE_UNITS);
            let accepted = self.inventory.add_to_load(partner, kind, moved);
            // Whatever the partner cannot carry goes back
            self.inventory.add_to_load(agent, kind, moved - accepted);
        }
    }

    fn of_occupant(&self, center: Vec2, radius: f32, wanted: impl Fn(Occupant) -> bool) -> Vec<Sighting> {
        self.grid
            .query_radius(center, radius)
            .into_iter()
            .filter(|(id, _, _)| self.occupants.get(id).is_some_and(|o| wanted(*o)))
            .map(|(id, position, distance)| Sighting {
                id,
                position,
                distance,
            })
            .collect()
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSource for Sandbox {
    fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.movement.position(entity)
    }
}

impl NeedsSource for Sandbox {
    fn needs(&self, agent: EntityId) -> Option<NeedsSnapshot> {
        self.needs.get(agent)
    }
}

impl VitalsSource for Sandbox {
    fn vitals(&self, agent: EntityId) -> Option<Vitals> {
        self.combat.vitals(agent)
    }
}

impl InventorySource for Sandbox {
    fn inventory(&self, agent: EntityId) -> Option<InventoryLoad> {
        self.inventory.load(agent).cloned()
    }
}

impl ProfileSource for Sandbox {
    /// Profile with the recipes the agent can afford right now
    fn profile(&self, agent: EntityId) -> Option<AgentProfile> {
        let mut profile = self.profiles.get(&agent)?.clone();
        if let Some(load) = self.inventory.load(agent) {
            profile.craftable = self
                .crafting
                .recipes
                .iter()
                .filter(|(_, recipe)| {
                    recipe
                        .inputs
                        .iter()
                        .all(|(kind, count)| load.count(*kind) >= *count)
                })
                .map(|(name, recipe)| CraftOption::new(name.as_str(), recipe.weapon))
                .collect();
        }
        Some(profile)
    }
}

impl SpatialQuery for Sandbox {
    fn nearest_resource(&self, kind: ResourceKind, from: Vec2, radius: f32) -> Option<Sighting> {
        self.of_occupant(from, radius, |o| o == Occupant::Resource)
            .into_iter()
            .find(|s| {
                self.inventory
                    .node(s.id)
                    .is_some_and(|node| node.kind == kind && node.amount > 0)
            })
    }

    fn agents_in_radius(&self, center: Vec2, radius: f32) -> Vec<Sighting> {
        self.of_occupant(center, radius, |o| o == Occupant::Agent)
    }

    fn animals_in_radius(&self, center: Vec2, radius: f32) -> Vec<AnimalSighting> {
        self.grid
            .query_radius(center, radius)
            .into_iter()
            .filter_map(|(id, position, distance)| match self.occupants.get(&id) {
                Some(Occupant::Animal { predator }) => Some(AnimalSighting {
                    sighting: Sighting {
                        id,
                        position,
                        distance,
                    },
                    predator: *predator,
                }),
                _ => None,
            })
            .collect()
    }

    fn locate(&self, entity: EntityId) -> Option<Vec2> {
        self.grid.position(entity)
    }
}

impl WorldMetadata for Sandbox {
    fn zones(&self) -> &[Zone] {
        &self.zones
    }

    fn pending_constructions(&self) -> Vec<ConstructionSite> {
        self.building
            .sites
            .iter()
            .filter(|site| site.progress < 1.0)
            .copied()
            .collect()
    }

    fn resource_stats(&self) -> ResourceStats {
        let population = self.agents.len().max(1) as f32;
        let per_capita: BTreeMap<ResourceKind, f32> = self
            .inventory
            .totals()
            .into_iter()
            .map(|(kind, count)| (kind, count as f32 / population))
            .collect();
        ResourceStats { per_capita }
    }
}

impl SimulationHost for Sandbox {
    fn now(&self) -> Millis {
        self.now
    }

    fn registry(&self) -> WorldRegistry<'_> {
        WorldRegistry::new(self)
            .with_needs(self)
            .with_vitals(self)
            .with_inventory(self)
            .with_profiles(self)
            .with_spatial(self)
            .with_metadata(self)
    }

    fn systems(&mut self) -> DomainSystems<'_> {
        DomainSystems {
            movement: Some(&mut self.movement),
            combat: Some(&mut self.combat),
            needs: Some(&mut self.needs),
            inventory: Some(&mut self.inventory),
            social: Some(&mut self.social),
            crafting: Some(&mut self.crafting),
            building: Some(&mut self.building),
            trade: Some(&mut self.trade),
        }
    }
}
