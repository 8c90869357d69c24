//! Context assembly with a short-lived per-agent cache
//!
//! Detectors run more often than it is worth repeating spatial lookups, so
//! the surroundings half of a context is reused for `ttl` milliseconds.
//! Invalidation is purely by age.

use std::rc::Rc;

use ahash::AHashMap;

use crate::core::types::{EntityId, Millis};
use crate::entity::AgentMemory;
use crate::simulation::context::{DetectorContext, Surroundings};
use crate::world::WorldRegistry;

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    ttl: Millis,
    radius: f32,
    cache: AHashMap<EntityId, Rc<Surroundings>>,
    hits: u64,
    misses: u64,
}

impl ContextAssembler {
    pub fn new(ttl: Millis, radius: f32) -> Self {
        Self {
            ttl,
            radius,
            cache: AHashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Build the context for one agent
    ///
    /// Returns `None` when the agent has no known position; the caller
    /// skips the agent's cycle.
    pub fn build(
        &mut self,
        agent: EntityId,
        now: Millis,
        registry: &WorldRegistry<'_>,
        memory: Option<&AgentMemory>,
    ) -> Option<DetectorContext> {
        let position = registry.positions.position(agent)?;
        let surroundings = self.surroundings(agent, position, now, registry);

        Some(DetectorContext {
            agent,
            now,
            position,
            needs: registry.needs.and_then(|n| n.needs(agent)),
            vitals: registry.vitals.and_then(|v| v.vitals(agent)),
            inventory: registry.inventory.and_then(|i| i.inventory(agent)),
            profile: registry
                .profiles
                .and_then(|p| p.profile(agent))
                .unwrap_or_default(),
            memory: memory.cloned().unwrap_or_default(),
            surroundings,
        })
    }

    fn surroundings(
        &mut self,
        agent: EntityId,
        position: crate::core::types::Vec2,
        now: Millis,
        registry: &WorldRegistry<'_>,
    ) -> Rc<Surroundings> {
        if let Some(cached) = self.cache.get(&agent) {
            if self.is_fresh(cached, now) {
                self.hits += 1;
                return Rc::clone(cached);
            }
        }

        self.misses += 1;
        tracing::trace!("Context cache miss for {}", agent);
        let fresh = Rc::new(Surroundings::survey(agent, position, now, self.radius, registry));
        self.cache.insert(agent, Rc::clone(&fresh));
        fresh
    }

    fn is_fresh(&self, cached: &Surroundings, now: Millis) -> bool {
        now.saturating_sub(cached.built_at) < self.ttl
    }

    pub fn invalidate(&mut self, agent: EntityId) -> bool {
        self.cache.remove(&agent).is_some()
    }

    /// Drop entries past their lifetime; returns how many
    pub fn prune(&mut self, now: Millis) -> usize {
        let ttl = self.ttl;
        let before = self.cache.len();
        self.cache
            .retain(|_, cached| now.saturating_sub(cached.built_at) < ttl);
        before - self.cache.len()
    }

    pub fn contains(&self, agent: EntityId) -> bool {
        self.cache.contains_key(&agent)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
