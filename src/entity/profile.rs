//! Roles and personality weights

use serde::{Deserialize, Serialize};

use crate::core::types::ResourceKind;

/// Work role assigned to an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Unassigned,
    Gatherer,
    Farmer,
    Woodcutter,
    Miner,
    Builder,
    Crafter,
    Hunter,
    Guard,
    Trader,
}

impl Role {
    /// Resources this role is expected to gather
    pub fn gathers(&self) -> &'static [ResourceKind] {
        match self {
            Role::Gatherer => &[
                ResourceKind::Food,
                ResourceKind::Water,
                ResourceKind::Wood,
                ResourceKind::Stone,
            ],
            Role::Farmer => &[ResourceKind::Food],
            Role::Woodcutter => &[ResourceKind::Wood],
            Role::Miner => &[ResourceKind::Stone, ResourceKind::Ore],
            _ => &[],
        }
    }

    /// Roles expected to carry a weapon
    pub fn is_armed_role(&self) -> bool {
        matches!(self, Role::Hunter | Role::Guard)
    }
}

/// Personality traits in [0, 1]; 0.5 is neutral
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    pub diligence: f32,
    pub sociability: f32,
    pub curiosity: f32,
    pub aggression: f32,
    pub greed: f32,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            diligence: 0.5,
            sociability: 0.5,
            curiosity: 0.5,
            aggression: 0.5,
            greed: 0.5,
        }
    }
}

impl Personality {
    /// Signed priority bias for a trait, `weight` at the extremes
    pub fn bias(trait_value: f32, weight: f32) -> f32 {
        (trait_value.clamp(0.0, 1.0) - 0.5) * 2.0 * weight
    }
}

/// A recipe the agent could craft right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftOption {
    pub recipe: String,
    pub weapon: bool,
}

impl CraftOption {
    pub fn new(recipe: impl Into<String>, weapon: bool) -> Self {
        Self {
            recipe: recipe.into(),
            weapon,
        }
    }
}

/// Role, personality and capabilities of an agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub role: Role,
    pub personality: Personality,
    pub has_weapon: bool,
    /// Recipes craftable with what the agent carries
    pub craftable: Vec<CraftOption>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_is_centered() {
        assert_eq!(Personality::bias(0.5, 0.2), 0.0);
        assert!((Personality::bias(1.0, 0.2) - 0.2).abs() < 1e-6);
        assert!((Personality::bias(0.0, 0.2) + 0.2).abs() < 1e-6);
        assert!((Personality::bias(3.0, 0.2) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_role_gathering() {
        assert!(Role::Farmer.gathers().contains(&ResourceKind::Food));
        assert!(Role::Builder.gathers().is_empty());
        assert!(Role::Guard.is_armed_role());
        assert!(!Role::Trader.is_armed_role());
    }
}
