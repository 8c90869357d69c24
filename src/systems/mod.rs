//! Domain systems the handlers delegate to
//!
//! Movement, combat, needs, inventory, social, crafting, building and trade
//! live outside the decision core. Each answers a request with a
//! [`DomainResult`]; the core never inspects their internals.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::types::{EntityId, ResourceKind, Vec2, ZoneId};
use crate::entity::NeedKind;

/// Which domain system a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemKind {
    Movement,
    Combat,
    Needs,
    Inventory,
    Social,
    Crafting,
    Building,
    Trade,
}

impl SystemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemKind::Movement => "movement",
            SystemKind::Combat => "combat",
            SystemKind::Needs => "needs",
            SystemKind::Inventory => "inventory",
            SystemKind::Social => "social",
            SystemKind::Crafting => "crafting",
            SystemKind::Building => "building",
            SystemKind::Trade => "trade",
        }
    }
}

impl std::fmt::Display for SystemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a domain request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    Completed,
    Failed,
    InProgress,
    /// Work handed on to another system; the task stays active
    Delegated(SystemKind),
}

/// Answer of a domain system to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainResult {
    pub status: DomainStatus,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl DomainResult {
    pub fn completed() -> Self {
        Self::with_status(DomainStatus::Completed)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::with_status(DomainStatus::Failed).with_message(message)
    }

    pub fn in_progress() -> Self {
        Self::with_status(DomainStatus::InProgress)
    }

    pub fn delegated(system: SystemKind) -> Self {
        Self::with_status(DomainStatus::Delegated(system))
    }

    fn with_status(status: DomainStatus) -> Self {
        Self {
            status,
            message: None,
            data: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

pub trait MovementSystem {
    /// Start or continue moving toward `destination`
    ///
    /// `Completed` once the agent has arrived.
    fn request_move(&mut self, agent: EntityId, destination: Vec2) -> DomainResult;

    /// Run for `destination`, ignoring work in progress
    fn request_flee(&mut self, agent: EntityId, destination: Vec2) -> DomainResult;
}

pub trait CombatSystem {
    fn request_attack(&mut self, attacker: EntityId, target: EntityId) -> DomainResult;
}

pub trait NeedsSystem {
    /// Consume from `source` (a world entity) or, when `None`, from the
    /// agent's own inventory
    fn request_consume(
        &mut self,
        agent: EntityId,
        need: NeedKind,
        source: Option<EntityId>,
    ) -> DomainResult;

    fn request_rest(&mut self, agent: EntityId) -> DomainResult;
}

pub trait InventorySystem {
    fn request_gather(
        &mut self,
        agent: EntityId,
        source: EntityId,
        resource: ResourceKind,
    ) -> DomainResult;

    fn request_deposit(&mut self, agent: EntityId, zone: ZoneId) -> DomainResult;
}

pub trait SocialSystem {
    fn request_interaction(&mut self, agent: EntityId, other: EntityId) -> DomainResult;

    fn request_assist(&mut self, agent: EntityId, other: EntityId) -> DomainResult;
}

pub trait CraftingSystem {
    fn request_craft(&mut self, agent: EntityId, recipe: &str) -> DomainResult;
}

pub trait BuildingSystem {
    fn request_contribute(&mut self, agent: EntityId, site: EntityId) -> DomainResult;
}

pub trait TradeSystem {
    fn request_trade(
        &mut self,
        agent: EntityId,
        partner: EntityId,
        offer: Option<ResourceKind>,
    ) -> DomainResult;
}

/// Mutable bindings to the domain systems for one handler call
///
/// Unbound systems stay `None`; handlers needing them fail the task.
#[derive(Default)]
pub struct DomainSystems<'a> {
    pub movement: Option<&'a mut dyn MovementSystem>,
    pub combat: Option<&'a mut dyn CombatSystem>,
    pub needs: Option<&'a mut dyn NeedsSystem>,
    pub inventory: Option<&'a mut dyn InventorySystem>,
    pub social: Option<&'a mut dyn SocialSystem>,
    pub crafting: Option<&'a mut dyn CraftingSystem>,
    pub building: Option<&'a mut dyn BuildingSystem>,
    pub trade: Option<&'a mut dyn TradeSystem>,
}

impl<'a> DomainSystems<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn bound(&self) -> Vec<SystemKind> {
        [
            (self.movement.is_some(), SystemKind::Movement),
            (self.combat.is_some(), SystemKind::Combat),
            (self.needs.is_some(), SystemKind::Needs),
            (self.inventory.is_some(), SystemKind::Inventory),
            (self.social.is_some(), SystemKind::Social),
            (self.crafting.is_some(), SystemKind::Crafting),
            (self.building.is_some(), SystemKind::Building),
            (self.trade.is_some(), SystemKind::Trade),
        ]
        .into_iter()
        .filter_map(|(bound, kind)| bound.then_some(kind))
        .collect()
    }
}
