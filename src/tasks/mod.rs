//! Task model and the per-agent pending queue

pub mod queue;
pub mod task;

pub use queue::{EnqueueOutcome, TaskQueue};
pub use task::{
    clamp_priority, DetectorCategory, PriorityBand, Task, TaskIdGenerator, TaskKind, TaskParams,
    TaskSource, TaskSpec, TaskStatus, TaskTarget,
};
