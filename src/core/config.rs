//! Scheduler configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SchedulerError};
use crate::core::types::Millis;
use crate::tasks::TaskKind;

/// Configuration for the decision core
///
/// Built once by the composition root and passed down by value.
/// Every field has a default, so a TOML file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    // === CYCLE ===
    /// Minimum time between two pipeline runs for the same agent (ms)
    ///
    /// Calls to `update_agent` inside this window are skipped cheaply.
    pub update_interval_ms: Millis,

    /// Agents processed per batch before control returns to the caller
    ///
    /// Bounds the work done between two cooperative yield points.
    pub batch_size: usize,

    // === QUEUE ===
    /// Maximum pending tasks per agent
    pub max_queue_len: usize,

    /// Priority added to an existing pending task when the same kind is
    /// proposed again
    ///
    /// At 0.1, a NORMAL (0.4) task proposed six more times reaches 1.0.
    pub accumulation_boost: f32,

    /// Pending tasks at or above this priority supersede a lower-priority
    /// active task
    ///
    /// Set above 1.0 to disable preemption entirely.
    pub preempt_priority: f32,

    /// Kinds allowed to supersede an active task
    ///
    /// Accumulation pushes any repeatedly proposed chore toward 1.0, so
    /// preemption is limited to threat responses.
    pub preempt_kinds: Vec<TaskKind>,

    /// Finished tasks kept for introspection
    pub history_len: usize,

    // === CONTEXT ===
    /// Lifetime of the cached spatial part of a detector context (ms)
    pub context_ttl_ms: Millis,

    /// Radius of the nearby-entity queries (world units)
    pub search_radius: f32,

    /// Distance at which an agent can act on its target (world units)
    ///
    /// Handlers issue a move request instead of acting when farther away.
    pub interaction_range: f32,

    // === NEED BANDS (needs are 0-100, 100 = satisfied) ===
    /// Below this a need is critical and produces CRITICAL tasks
    pub need_critical: f32,

    /// Below this a need is urgent and produces URGENT tasks
    pub need_urgent: f32,

    /// Below this a need is low and produces NORMAL tasks
    ///
    /// At or above it the need produces nothing.
    pub need_low: f32,

    // === DETECTOR THRESHOLDS ===
    /// Health ratio under which a threatened agent flees instead of fighting
    pub flee_health_ratio: f32,

    /// Inventory load ratio at which depositing becomes a HIGH priority
    pub deposit_load_ratio: f32,

    /// Time without exploring before curiosity proposes an exploration (ms)
    pub explore_cooldown_ms: Millis,

    /// Per-capita stock under which a resource counts as scarce
    ///
    /// Gathering a scarce resource is proposed at HIGH instead of NORMAL.
    pub scarcity_per_capita: f32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 250,
            batch_size: 32,

            max_queue_len: 8,
            accumulation_boost: 0.1,
            preempt_priority: 0.95,
            preempt_kinds: vec![TaskKind::Flee],
            history_len: 64,

            context_ttl_ms: 500,
            search_radius: 60.0,
            interaction_range: 2.0,

            // critical < urgent < low
            need_critical: 15.0,
            need_urgent: 22.0,
            need_low: 30.0,

            flee_health_ratio: 0.2,
            deposit_load_ratio: 0.8,
            explore_cooldown_ms: 30_000,
            scarcity_per_capita: 5.0,
        }
    }
}

impl SchedulerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text, filling missing keys with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SchedulerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SchedulerError::InvalidConfig("batch_size must be > 0".into()));
        }

        if self.max_queue_len == 0 {
            return Err(SchedulerError::InvalidConfig("max_queue_len must be > 0".into()));
        }

        if !(self.accumulation_boost > 0.0 && self.accumulation_boost <= 1.0) {
            return Err(SchedulerError::InvalidConfig(format!(
                "accumulation_boost ({}) must be in (0, 1]",
                self.accumulation_boost
            )));
        }

        // Bands should be ordered
        if !(self.need_critical < self.need_urgent && self.need_urgent < self.need_low) {
            return Err(SchedulerError::InvalidConfig(format!(
                "need bands must satisfy critical ({}) < urgent ({}) < low ({})",
                self.need_critical, self.need_urgent, self.need_low
            )));
        }

        if self.interaction_range <= 0.0 || self.search_radius <= self.interaction_range {
            return Err(SchedulerError::InvalidConfig(format!(
                "search_radius ({}) must exceed interaction_range ({}) > 0",
                self.search_radius, self.interaction_range
            )));
        }

        if !(0.0..=1.0).contains(&self.flee_health_ratio)
            || !(0.0..=1.0).contains(&self.deposit_load_ratio)
        {
            return Err(SchedulerError::InvalidConfig(
                "flee_health_ratio and deposit_load_ratio must be in [0, 1]".into(),
            ));
        }

        Ok(())
    }
}
