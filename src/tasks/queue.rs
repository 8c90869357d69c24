//! Per-agent pending task store with priority accumulation
//!
//! At most one pending task exists per (agent, kind). Proposing a kind that
//! is already pending raises the existing entry's priority instead of adding
//! a second one, so repeated stimuli escalate urgency rather than flooding
//! the queue.

use std::cmp::Reverse;

use ahash::AHashMap;
use ordered_float::OrderedFloat;

use crate::core::types::{EntityId, Millis, TaskId};
use crate::tasks::task::{Task, TaskKind};

/// What happened to a task handed to [`TaskQueue::enqueue`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnqueueOutcome {
    /// New entry added
    Inserted(TaskId),
    /// Merged into the pending task of the same kind; the new task was dropped
    Accumulated { task: TaskId, priority: f32 },
    /// Queue was full; the lowest entry made room for the new one
    Evicted { inserted: TaskId, evicted: TaskId },
    /// Queue was full and the new task did not outrank the lowest entry
    Rejected,
}

impl EnqueueOutcome {
    /// True when the queue length for the agent grew
    pub fn inserted(&self) -> bool {
        matches!(self, EnqueueOutcome::Inserted(_))
    }
}

/// Bounded, priority-accumulating pending tasks for every agent
#[derive(Debug, Clone)]
pub struct TaskQueue {
    pending: AHashMap<EntityId, Vec<Task>>,
    max_len: usize,
    expired_total: u64,
}

/// Dequeue order: highest priority, then earliest creation, then lowest id
fn dequeue_key(task: &Task) -> (OrderedFloat<f32>, Reverse<Millis>, Reverse<TaskId>) {
    (
        OrderedFloat(task.priority()),
        Reverse(task.created_at()),
        Reverse(task.id()),
    )
}

/// Eviction order: lowest priority, then newest creation
fn eviction_key(task: &Task) -> (OrderedFloat<f32>, Reverse<Millis>, Reverse<TaskId>) {
    dequeue_key(task)
}

impl TaskQueue {
    pub fn new(max_len: usize) -> Self {
        Self {
            pending: AHashMap::new(),
            max_len: max_len.max(1),
            expired_total: 0,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Add a task, or accumulate it into the pending task of the same kind
    ///
    /// The task's creation time stands in for "now" when checking whether
    /// the existing same-kind entry has already expired; an expired entry is
    /// replaced rather than boosted.
    pub fn enqueue(&mut self, agent: EntityId, task: Task, boost: f32) -> EnqueueOutcome {
        let now = task.created_at();
        let entries = self.pending.entry(agent).or_default();

        if let Some(pos) = entries.iter().position(|t| t.kind() == task.kind()) {
            if !entries[pos].is_expired(now) {
                let existing = &mut entries[pos];
                let priority = existing.boost(boost);
                return EnqueueOutcome::Accumulated {
                    task: existing.id(),
                    priority,
                };
            }
            entries.remove(pos);
            self.expired_total += 1;
        }

        if entries.len() < self.max_len {
            let id = task.id();
            entries.push(task);
            return EnqueueOutcome::Inserted(id);
        }

        let Some((lowest_idx, lowest)) = entries
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| eviction_key(t))
        else {
            return EnqueueOutcome::Rejected;
        };

        if task.priority() <= lowest.priority() {
            tracing::debug!(
                "Queue full for {}: rejected {} ({} at {:.2})",
                agent,
                task.id(),
                task.kind(),
                task.priority()
            );
            return EnqueueOutcome::Rejected;
        }

        let evicted = entries.remove(lowest_idx);
        tracing::debug!(
            "Queue full for {}: evicted {} ({} at {:.2}) for {} ({} at {:.2})",
            agent,
            evicted.id(),
            evicted.kind(),
            evicted.priority(),
            task.id(),
            task.kind(),
            task.priority()
        );
        let inserted = task.id();
        entries.push(task);
        EnqueueOutcome::Evicted {
            inserted,
            evicted: evicted.id(),
        }
    }

    /// Remove and return the best non-expired pending task
    pub fn dequeue(&mut self, agent: EntityId, now: Millis) -> Option<Task> {
        self.clean_expired(agent, now);
        let entries = self.pending.get_mut(&agent)?;
        let (idx, _) = entries
            .iter()
            .enumerate()
            .max_by_key(|(_, t)| dequeue_key(t))?;
        let task = entries.remove(idx);
        if entries.is_empty() {
            self.pending.remove(&agent);
        }
        Some(task)
    }

    /// Best non-expired pending task, without removing it
    pub fn peek(&self, agent: EntityId, now: Millis) -> Option<&Task> {
        self.pending
            .get(&agent)?
            .iter()
            .filter(|t| !t.is_expired(now))
            .max_by_key(|t| dequeue_key(t))
    }

    /// Drop every pending task with `expires_at <= now`; returns how many
    pub fn clean_expired(&mut self, agent: EntityId, now: Millis) -> usize {
        let Some(entries) = self.pending.get_mut(&agent) else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|t| !t.is_expired(now));
        let removed = before - entries.len();
        if entries.is_empty() {
            self.pending.remove(&agent);
        }
        self.expired_total += removed as u64;
        removed
    }

    /// Drop all pending tasks of an agent; returns how many
    pub fn clear(&mut self, agent: EntityId) -> usize {
        self.pending.remove(&agent).map(|entries| entries.len()).unwrap_or(0)
    }

    /// Remove a specific pending task, regardless of its rank
    pub fn take(&mut self, agent: EntityId, task: TaskId) -> Option<Task> {
        let entries = self.pending.get_mut(&agent)?;
        let idx = entries.iter().position(|t| t.id() == task)?;
        let task = entries.remove(idx);
        if entries.is_empty() {
            self.pending.remove(&agent);
        }
        Some(task)
    }

    pub fn pending(&self, agent: EntityId) -> &[Task] {
        self.pending.get(&agent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pending tasks of an agent in dequeue order, expired ones included
    pub fn ordered(&self, agent: EntityId) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.pending(agent).iter().collect();
        tasks.sort_by_key(|t| Reverse(dequeue_key(t)));
        tasks
    }

    pub fn pending_of_kind(&self, agent: EntityId, kind: TaskKind) -> Option<&Task> {
        self.pending(agent).iter().find(|t| t.kind() == kind)
    }

    pub fn len(&self, agent: EntityId) -> usize {
        self.pending.get(&agent).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self, agent: EntityId) -> bool {
        self.len(agent) == 0
    }

    pub fn total_len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Pending tasks discarded by expiry since creation of the queue
    pub fn expired_total(&self) -> u64 {
        self.expired_total
    }
}
