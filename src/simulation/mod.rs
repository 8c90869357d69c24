//! Per-agent task scheduling over a host simulation

pub mod context;
pub mod context_cache;
pub mod host;
pub mod orchestrator;
pub mod report;

pub use context::{DetectorContext, NearbyAgent, NearbySite, Surroundings, ZoneProximity};
pub use context_cache::ContextAssembler;
pub use host::SimulationHost;
pub use orchestrator::TaskOrchestrator;
pub use report::{AgentCycle, AgentReport, BatchProgress, CycleReport, FinishedTask, SchedulerStats};
