//! Agent needs as seen by the decision core

use serde::{Deserialize, Serialize};

use crate::core::types::ResourceKind;

/// Needs tracked by the needs system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedKind {
    Hunger,
    Thirst,
    Energy,
    Social,
    Fun,
}

impl NeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NeedKind::Hunger => "hunger",
            NeedKind::Thirst => "thirst",
            NeedKind::Energy => "energy",
            NeedKind::Social => "social",
            NeedKind::Fun => "fun",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "hunger" => Some(NeedKind::Hunger),
            "thirst" => Some(NeedKind::Thirst),
            "energy" => Some(NeedKind::Energy),
            "social" => Some(NeedKind::Social),
            "fun" => Some(NeedKind::Fun),
            _ => None,
        }
    }

    /// Resource that satisfies this need by consumption
    pub fn consumable(&self) -> Option<ResourceKind> {
        match self {
            NeedKind::Hunger => Some(ResourceKind::Food),
            NeedKind::Thirst => Some(ResourceKind::Water),
            _ => None,
        }
    }
}

/// Snapshot of need values: 0 = desperate, 100 = fully satisfied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeedsSnapshot {
    pub hunger: f32,
    pub thirst: f32,
    pub energy: f32,
    pub social: f32,
    pub fun: f32,
}

impl Default for NeedsSnapshot {
    fn default() -> Self {
        Self {
            hunger: 100.0,
            thirst: 100.0,
            energy: 100.0,
            social: 100.0,
            fun: 100.0,
        }
    }
}

impl NeedsSnapshot {
    pub fn get(&self, need: NeedKind) -> f32 {
        match need {
            NeedKind::Hunger => self.hunger,
            NeedKind::Thirst => self.thirst,
            NeedKind::Energy => self.energy,
            NeedKind::Social => self.social,
            NeedKind::Fun => self.fun,
        }
    }

    pub fn set(&mut self, need: NeedKind, value: f32) {
        let value = value.clamp(0.0, 100.0);
        match need {
            NeedKind::Hunger => self.hunger = value,
            NeedKind::Thirst => self.thirst = value,
            NeedKind::Energy => self.energy = value,
            NeedKind::Social => self.social = value,
            NeedKind::Fun => self.fun = value,
        }
    }

    /// Raise a need toward satisfaction
    pub fn satisfy(&mut self, need: NeedKind, amount: f32) {
        self.set(need, self.get(need) + amount);
    }

    /// Least satisfied need
    pub fn most_pressing(&self) -> (NeedKind, f32) {
        [
            NeedKind::Hunger,
            NeedKind::Thirst,
            NeedKind::Energy,
            NeedKind::Social,
            NeedKind::Fun,
        ]
        .into_iter()
        .map(|need| (need, self.get(need)))
        .fold((NeedKind::Hunger, f32::INFINITY), |best, current| {
            if current.1 < best.1 {
                current
            } else {
                best
            }
        })
    }
}
