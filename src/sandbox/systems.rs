//! Sandbox domain systems
//!
//! Each system owns its slice of world state and answers requests from it.
//! Effects that span systems (eating from a node, crafting from carried
//! goods) are queued and applied by [`Sandbox::advance`](super::Sandbox::advance).

use std::collections::{BTreeMap, VecDeque};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, ResourceKind, Vec2, ZoneId};
use crate::entity::{NeedKind, NeedsSnapshot};
use crate::systems::{
    BuildingSystem, CombatSystem, CraftingSystem, DomainResult, InventorySystem, MovementSystem,
    NeedsSystem, SocialSystem, SystemKind, TradeSystem,
};
use crate::world::{ConstructionSite, InventoryLoad, Vitals};

/// Within this distance a mover has arrived
pub const ARRIVAL_DISTANCE: f32 = 0.5;

/// Requests each system remembers before dropping the oldest
pub const REQUEST_LOG_LEN: usize = 256;

/// One request received by a sandbox system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub system: SystemKind,
    pub agent: EntityId,
    pub action: String,
}

/// Most recent requests of one system, bounded by `limit`
#[derive(Debug, Clone)]
pub struct RequestLog {
    entries: VecDeque<Request>,
    limit: usize,
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::with_limit(REQUEST_LOG_LEN)
    }
}

impl RequestLog {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    fn push(&mut self, system: SystemKind, agent: EntityId, action: impl Into<String>) {
        if self.limit == 0 {
            return;
        }
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(Request {
            system,
            agent,
            action: action.into(),
        });
    }

    pub fn entries(&self) -> std::collections::vec_deque::Iter<'_, Request> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Goal {
    destination: Vec2,
    fleeing: bool,
}

/// Straight-line movement at a fixed speed
#[derive(Debug, Clone)]
pub struct SandboxMovement {
    positions: AHashMap<EntityId, Vec2>,
    goals: AHashMap<EntityId, Goal>,
    /// Units per second
    pub speed: f32,
    pub flee_multiplier: f32,
    pub log: RequestLog,
}

impl SandboxMovement {
    pub fn new(speed: f32) -> Self {
        Self {
            positions: AHashMap::new(),
            goals: AHashMap::new(),
            speed,
            flee_multiplier: 1.5,
            log: RequestLog::default(),
        }
    }

    pub fn position(&self, agent: EntityId) -> Option<Vec2> {
        self.positions.get(&agent).copied()
    }

    pub fn place(&mut self, agent: EntityId, pos: Vec2) {
        self.positions.insert(agent, pos);
        self.goals.remove(&agent);
    }

    pub fn remove(&mut self, agent: EntityId) -> Option<Vec2> {
        self.goals.remove(&agent);
        self.positions.remove(&agent)
    }

    pub fn is_moving(&self, agent: EntityId) -> bool {
        self.goals.contains_key(&agent)
    }

    fn request(&mut self, agent: EntityId, destination: Vec2, fleeing: bool) -> DomainResult {
        let Some(pos) = self.position(agent) else {
            return DomainResult::failed("agent is not placed");
        };
        if pos.distance(&destination) <= ARRIVAL_DISTANCE {
            self.goals.remove(&agent);
            return DomainResult::completed();
        }
        self.goals.insert(
            agent,
            Goal {
                destination,
                fleeing,
            },
        );
        DomainResult::in_progress()
    }

    /// Move every agent with a goal; returns the agents that moved
    pub fn step(&mut self, dt_secs: f32) -> Vec<(EntityId, Vec2)> {
        let mut moved = Vec::new();
        let mut arrived = Vec::new();

        for (agent, goal) in &self.goals {
            let Some(pos) = self.positions.get_mut(agent) else {
                continue;
            };
            let speed = if goal.fleeing {
                self.speed * self.flee_multiplier
            } else {
                self.speed
            };
            *pos = pos.step_toward(goal.destination, speed * dt_secs);
            moved.push((*agent, *pos));
            if pos.distance(&goal.destination) <= ARRIVAL_DISTANCE {
                arrived.push(*agent);
            }
        }
        // Goals stay until the next request reports arrival; arrival only
        // stops fleeing early.
        for agent in arrived {
            if self.goals.get(&agent).is_some_and(|g| g.fleeing) {
                self.goals.remove(&agent);
            }
        }

        moved.sort_by(|a, b| a.0.cmp(&b.0));
        moved
    }
}

impl MovementSystem for SandboxMovement {
    fn request_move(&mut self, agent: EntityId, destination: Vec2) -> DomainResult {
        self.log.push(
            SystemKind::Movement,
            agent,
            format!("move {:.1} {:.1}", destination.x, destination.y),
        );
        self.request(agent, destination, false)
    }

    fn request_flee(&mut self, agent: EntityId, destination: Vec2) -> DomainResult {
        self.log.push(
            SystemKind::Movement,
            agent,
            format!("flee {:.1} {:.1}", destination.x, destination.y),
        );
        self.request(agent, destination, true)
    }
}

/// Health of agents and animals; attacks resolve immediately
#[derive(Debug, Clone)]
pub struct SandboxCombat {
    vitals: AHashMap<EntityId, Vitals>,
    pub damage: f32,
    pub log: RequestLog,
}

impl SandboxCombat {
    pub fn new(damage: f32) -> Self {
        Self {
            vitals: AHashMap::new(),
            damage,
            log: RequestLog::default(),
        }
    }

    pub fn vitals(&self, entity: EntityId) -> Option<Vitals> {
        self.vitals.get(&entity).copied()
    }

    pub fn vitals_mut(&mut self, entity: EntityId) -> Option<&mut Vitals> {
        self.vitals.get_mut(&entity)
    }

    pub fn insert(&mut self, entity: EntityId, vitals: Vitals) {
        self.vitals.insert(entity, vitals);
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<Vitals> {
        self.vitals.remove(&entity)
    }

    /// Entities at zero health, in id order
    pub fn fallen(&self) -> Vec<EntityId> {
        let mut fallen: Vec<EntityId> = self
            .vitals
            .iter()
            .filter(|(_, v)| v.health <= 0.0)
            .map(|(id, _)| *id)
            .collect();
        fallen.sort();
        fallen
    }

    /// Forget attackers that no longer exist
    pub fn settle(&mut self) {
        let alive: Vec<EntityId> = self
            .vitals
            .iter()
            .filter(|(_, v)| v.health > 0.0)
            .map(|(id, _)| *id)
            .collect();
        for vitals in self.vitals.values_mut() {
            if vitals.attacker.is_some_and(|a| !alive.contains(&a)) {
                vitals.attacker = None;
                vitals.in_combat = false;
            }
        }
    }
}

impl CombatSystem for SandboxCombat {
    fn request_attack(&mut self, attacker: EntityId, target: EntityId) -> DomainResult {
        self.log
            .push(SystemKind::Combat, attacker, format!("attack {}", target));
        let damage = self.damage;
        let Some(vitals) = self.vitals.get_mut(&target) else {
            return DomainResult::failed("no such target");
        };
        if vitals.health <= 0.0 {
            return DomainResult::completed().with_message("target already down");
        }

        vitals.health = (vitals.health - damage).max(0.0);
        vitals.attacker = Some(attacker);
        vitals.in_combat = true;
        if vitals.health <= 0.0 {
            DomainResult::completed().with_message("target down")
        } else {
            DomainResult::in_progress()
        }
    }
}

/// Consumption request waiting for the next advance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Consumption {
    pub agent: EntityId,
    pub need: NeedKind,
    pub source: Option<EntityId>,
}

/// Need values with linear decay
#[derive(Debug, Clone)]
pub struct SandboxNeeds {
    values: AHashMap<EntityId, NeedsSnapshot>,
    /// Points lost per second for every need
    pub decay: f32,
    pub resting: Vec<EntityId>,
    pub consumptions: Vec<Consumption>,
    pub log: RequestLog,
}

impl SandboxNeeds {
    pub fn new(decay: f32) -> Self {
        Self {
            values: AHashMap::new(),
            decay,
            resting: Vec::new(),
            consumptions: Vec::new(),
            log: RequestLog::default(),
        }
    }

    pub fn get(&self, agent: EntityId) -> Option<NeedsSnapshot> {
        self.values.get(&agent).copied()
    }

    pub fn get_mut(&mut self, agent: EntityId) -> Option<&mut NeedsSnapshot> {
        self.values.get_mut(&agent)
    }

    pub fn insert(&mut self, agent: EntityId, needs: NeedsSnapshot) {
        self.values.insert(agent, needs);
    }

    pub fn remove(&mut self, agent: EntityId) -> Option<NeedsSnapshot> {
        self.resting.retain(|a| *a != agent);
        self.consumptions.retain(|c| c.agent != agent);
        self.values.remove(&agent)
    }

    pub fn restore(&mut self, agent: EntityId, need: NeedKind, amount: f32) {
        if let Some(needs) = self.values.get_mut(&agent) {
            needs.set(need, needs.get(need) + amount);
        }
    }

    /// Decay every need; resting agents regain energy instead
    pub fn tick(&mut self, dt_secs: f32) {
        let loss = self.decay * dt_secs;
        for (agent, needs) in self.values.iter_mut() {
            for need in [NeedKind::Hunger, NeedKind::Thirst, NeedKind::Social, NeedKind::Fun] {
                needs.set(need, needs.get(need) - loss);
            }
            if self.resting.contains(agent) {
                needs.set(NeedKind::Energy, needs.energy + loss * 4.0);
            } else {
                needs.set(NeedKind::Energy, needs.energy - loss);
            }
        }
    }
}

impl NeedsSystem for SandboxNeeds {
    fn request_consume(
        &mut self,
        agent: EntityId,
        need: NeedKind,
        source: Option<EntityId>,
    ) -> DomainResult {
        let from = source.map(|s| s.to_string()).unwrap_or_else(|| "inventory".into());
        self.log.push(
            SystemKind::Needs,
            agent,
            format!("consume {} {}", need.as_str(), from),
        );
        if !self.values.contains_key(&agent) {
            return DomainResult::failed("agent has no needs");
        }
        if need.consumable().is_none() {
            return DomainResult::failed(format!("{} cannot be consumed", need.as_str()));
        }
        self.consumptions.push(Consumption {
            agent,
            need,
            source,
        });
        DomainResult::completed()
    }

    fn request_rest(&mut self, agent: EntityId) -> DomainResult {
        self.log.push(SystemKind::Needs, agent, "rest");
        let Some(needs) = self.values.get(&agent) else {
            return DomainResult::failed("agent has no needs");
        };
        if needs.energy >= 95.0 {
            self.resting.retain(|a| *a != agent);
            return DomainResult::completed();
        }
        if !self.resting.contains(&agent) {
            self.resting.push(agent);
        }
        DomainResult::in_progress()
    }
}

/// A gatherable node in the world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub kind: ResourceKind,
    pub position: Vec2,
    pub amount: u32,
}

/// Carried goods, resource nodes and the settlement stockpile
#[derive(Debug, Clone)]
pub struct SandboxInventory {
    loads: AHashMap<EntityId, InventoryLoad>,
    nodes: AHashMap<EntityId, ResourceNode>,
    pub stockpile: BTreeMap<ResourceKind, u32>,
    /// Units taken per gather request
    pub yield_per_gather: u32,
    pub log: RequestLog,
}

impl SandboxInventory {
    pub fn new(yield_per_gather: u32) -> Self {
        Self {
            loads: AHashMap::new(),
            nodes: AHashMap::new(),
            stockpile: BTreeMap::new(),
            yield_per_gather,
            log: RequestLog::default(),
        }
    }

    pub fn load(&self, agent: EntityId) -> Option<&InventoryLoad> {
        self.loads.get(&agent)
    }

    pub fn load_mut(&mut self, agent: EntityId) -> Option<&mut InventoryLoad> {
        self.loads.get_mut(&agent)
    }

    pub fn insert_load(&mut self, agent: EntityId, load: InventoryLoad) {
        self.loads.insert(agent, load);
    }

    pub fn remove_load(&mut self, agent: EntityId) -> Option<InventoryLoad> {
        self.loads.remove(&agent)
    }

    pub fn node(&self, id: EntityId) -> Option<&ResourceNode> {
        self.nodes.get(&id)
    }

    pub fn insert_node(&mut self, id: EntityId, node: ResourceNode) {
        self.nodes.insert(id, node);
    }

    /// Take up to `amount` units from a node
    pub fn take_from_node(&mut self, id: EntityId, amount: u32) -> u32 {
        let Some(node) = self.nodes.get_mut(&id) else {
            return 0;
        };
        let taken = amount.min(node.amount);
        node.amount -= taken;
        taken
    }

    /// Take up to `amount` units of a kind from an agent's load
    pub fn take_from_load(&mut self, agent: EntityId, kind: ResourceKind, amount: u32) -> u32 {
        let Some(load) = self.loads.get_mut(&agent) else {
            return 0;
        };
        let held = load.count(kind);
        let taken = amount.min(held);
        if held == taken {
            load.items.remove(&kind);
        } else {
            load.items.insert(kind, held - taken);
        }
        taken
    }

    /// Add to an agent's load up to its capacity; returns units added
    pub fn add_to_load(&mut self, agent: EntityId, kind: ResourceKind, amount: u32) -> u32 {
        let Some(load) = self.loads.get_mut(&agent) else {
            return 0;
        };
        let added = amount.min(load.capacity.saturating_sub(load.total()));
        if added > 0 {
            *load.items.entry(kind).or_insert(0) += added;
        }
        added
    }

    /// Remove and return nodes that ran dry
    pub fn drain_depleted(&mut self) -> Vec<EntityId> {
        let mut depleted: Vec<EntityId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.amount == 0)
            .map(|(id, _)| *id)
            .collect();
        depleted.sort();
        for id in &depleted {
            self.nodes.remove(id);
        }
        depleted
    }

    /// Stockpiled plus carried units of each kind
    pub fn totals(&self) -> BTreeMap<ResourceKind, u32> {
        let mut totals = self.stockpile.clone();
        for load in self.loads.values() {
            for (kind, count) in &load.items {
                *totals.entry(*kind).or_insert(0) += count;
            }
        }
        totals
    }
}

impl InventorySystem for SandboxInventory {
    fn request_gather(
        &mut self,
        agent: EntityId,
        source: EntityId,
        resource: ResourceKind,
    ) -> DomainResult {
        self.log.push(
            SystemKind::Inventory,
            agent,
            format!("gather {} {}", resource.as_str(), source),
        );
        match self.nodes.get(&source) {
            Some(node) if node.kind == resource && node.amount > 0 => {}
            Some(_) => return DomainResult::failed("nothing of that kind left"),
            None => return DomainResult::failed("no such resource node"),
        }
        let space = match self.loads.get(&agent) {
            Some(load) => load.capacity.saturating_sub(load.total()),
            None => return DomainResult::failed("agent carries nothing"),
        };
        if space == 0 {
            return DomainResult::failed("inventory full");
        }

        let taken = self.take_from_node(source, self.yield_per_gather.min(space));
        let added = self.add_to_load(agent, resource, taken);
        DomainResult::completed().with_data(serde_json::json!({ "gathered": added }))
    }

    fn request_deposit(&mut self, agent: EntityId, zone: ZoneId) -> DomainResult {
        self.log
            .push(SystemKind::Inventory, agent, format!("deposit {}", zone.0));
        let Some(load) = self.loads.get_mut(&agent) else {
            return DomainResult::failed("agent carries nothing");
        };
        if load.total() == 0 {
            return DomainResult::failed("nothing to deposit");
        }
        let items = std::mem::take(&mut load.items);
        let deposited: u32 = items.values().sum();
        for (kind, count) in items {
            *self.stockpile.entry(kind).or_insert(0) += count;
        }
        DomainResult::completed().with_data(serde_json::json!({ "deposited": deposited }))
    }
}

/// Conversations and help, applied on the next advance
#[derive(Debug, Clone, Default)]
pub struct SandboxSocial {
    pub interactions: Vec<(EntityId, EntityId)>,
    pub assists: Vec<(EntityId, EntityId)>,
    pub log: RequestLog,
}

impl SocialSystem for SandboxSocial {
    fn request_interaction(&mut self, agent: EntityId, other: EntityId) -> DomainResult {
        self.log
            .push(SystemKind::Social, agent, format!("interact {}", other));
        if agent == other {
            return DomainResult::failed("cannot talk to oneself");
        }
        self.interactions.push((agent, other));
        DomainResult::completed()
    }

    fn request_assist(&mut self, agent: EntityId, other: EntityId) -> DomainResult {
        self.log
            .push(SystemKind::Social, agent, format!("assist {}", other));
        self.assists.push((agent, other));
        DomainResult::completed()
    }
}

/// Inputs and product of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub inputs: Vec<(ResourceKind, u32)>,
    pub weapon: bool,
}

/// Recipe book; crafting takes one request and lands on the next advance
#[derive(Debug, Clone, Default)]
pub struct SandboxCrafting {
    pub recipes: BTreeMap<String, Recipe>,
    pub orders: Vec<(EntityId, String)>,
    pub log: RequestLog,
}

impl SandboxCrafting {
    pub fn with_standard_recipes() -> Self {
        let mut crafting = Self::default();
        crafting.recipes.insert(
            "spear".into(),
            Recipe {
                inputs: vec![(ResourceKind::Wood, 2), (ResourceKind::Stone, 1)],
                weapon: true,
            },
        );
        crafting.recipes.insert(
            "basket".into(),
            Recipe {
                inputs: vec![(ResourceKind::Wood, 3)],
                weapon: false,
            },
        );
        crafting
    }
}

impl CraftingSystem for SandboxCrafting {
    fn request_craft(&mut self, agent: EntityId, recipe: &str) -> DomainResult {
        self.log
            .push(SystemKind::Crafting, agent, format!("craft {}", recipe));
        if !self.recipes.contains_key(recipe) {
            return DomainResult::failed(format!("unknown recipe '{}'", recipe));
        }
        self.orders.push((agent, recipe.to_string()));
        DomainResult::completed()
    }
}

/// Construction sites advanced by contributions
#[derive(Debug, Clone)]
pub struct SandboxBuilding {
    pub sites: Vec<ConstructionSite>,
    /// Progress added per contribution
    pub step: f32,
    pub log: RequestLog,
}

impl SandboxBuilding {
    pub fn new(step: f32) -> Self {
        Self {
            sites: Vec::new(),
            step,
            log: RequestLog::default(),
        }
    }
}

impl BuildingSystem for SandboxBuilding {
    fn request_contribute(&mut self, agent: EntityId, site: EntityId) -> DomainResult {
        self.log
            .push(SystemKind::Building, agent, format!("build {}", site));
        let step = self.step;
        let Some(found) = self.sites.iter_mut().find(|s| s.id == site) else {
            return DomainResult::failed("no such site");
        };
        if found.progress < 1.0 {
            found.progress = (found.progress + step).min(1.0);
        }
        if found.progress >= 1.0 {
            DomainResult::completed().with_message("site finished")
        } else {
            DomainResult::in_progress()
        }
    }
}

/// Barter offers, applied on the next advance
#[derive(Debug, Clone, Default)]
pub struct SandboxTrade {
    pub offers: Vec<(EntityId, EntityId, ResourceKind)>,
    pub log: RequestLog,
}

impl TradeSystem for SandboxTrade {
    fn request_trade(
        &mut self,
        agent: EntityId,
        partner: EntityId,
        offer: Option<ResourceKind>,
    ) -> DomainResult {
        let offered = offer.map(|k| k.as_str()).unwrap_or("nothing");
        self.log.push(
            SystemKind::Trade,
            agent,
            format!("trade {} {}", partner, offered),
        );
        match offer {
            Some(kind) => {
                self.offers.push((agent, partner, kind));
                DomainResult::completed()
            }
            None => DomainResult::failed("nothing to offer"),
        }
    }
}
