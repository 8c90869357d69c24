//! Cycle reports and scheduler statistics

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Millis, TaskId};
use crate::tasks::{Task, TaskStatus};

/// Result of one `update_agent` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCycle {
    /// Too soon after the previous run
    RateLimited,
    /// The agent has no known position
    NoContext,
    Ran(AgentReport),
}

impl AgentCycle {
    pub fn ran(&self) -> Option<&AgentReport> {
        match self {
            AgentCycle::Ran(report) => Some(report),
            _ => None,
        }
    }
}

/// What happened during one agent's pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent: Option<EntityId>,
    pub dt: Millis,
    /// Proposals returned by the detectors
    pub proposed: usize,
    /// Proposals that added a new queue entry
    pub inserted: usize,
    /// Pending tasks dropped by the expiry sweep
    pub expired: usize,
    /// Active task cancelled in favor of an urgent pending one
    pub preempted: Option<TaskId>,
    /// Task promoted from the queue this cycle
    pub promoted: Option<TaskId>,
    /// Task handed to its handler this cycle
    pub dispatched: Option<TaskId>,
    /// Terminal status reached this cycle
    pub resolved: Option<(TaskId, TaskStatus)>,
}

/// Progress of a batched pass over the roster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Agents visited by this batch
    pub processed: usize,
    /// Of those, agents whose pipeline ran
    pub ran: usize,
    /// Agents left in the current pass
    pub remaining: usize,
    pub pass_complete: bool,
}

/// Summary of a full `update` pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub batches: usize,
    pub processed: usize,
    pub ran: usize,
    pub rate_limited: usize,
    pub no_context: usize,
    pub promoted: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl CycleReport {
    pub(crate) fn record(&mut self, cycle: &AgentCycle) {
        self.processed += 1;
        match cycle {
            AgentCycle::RateLimited => self.rate_limited += 1,
            AgentCycle::NoContext => self.no_context += 1,
            AgentCycle::Ran(report) => {
                self.ran += 1;
                if report.promoted.is_some() {
                    self.promoted += 1;
                }
                if report.preempted.is_some() {
                    self.cancelled += 1;
                }
                match report.resolved {
                    Some((_, TaskStatus::Completed)) => self.completed += 1,
                    Some((_, TaskStatus::Failed)) => self.failed += 1,
                    Some((_, TaskStatus::Cancelled)) => self.cancelled += 1,
                    _ => {}
                }
            }
        }
    }
}

/// A task that reached a terminal status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedTask {
    pub task: Task,
    pub finished_at: Millis,
    pub reason: Option<String>,
}

/// Counters over the scheduler's lifetime plus current sizes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub agents: usize,
    pub pending: usize,
    pub active: usize,

    pub created: u64,
    pub accumulated: u64,
    pub rejected: u64,
    pub evicted: u64,
    pub expired: u64,

    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub preempted: u64,

    pub handler_invocations: u64,
    pub handler_errors: u64,

    pub cycles: u64,
    pub rate_limited: u64,
    pub no_context: u64,
    pub elapsed_ms: Millis,

    pub cache_hits: u64,
    pub cache_misses: u64,
}
