use thiserror::Error;

use crate::core::types::{EntityId, TaskId};
use crate::tasks::TaskStatus;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Agent not tracked: {0}")]
    UnknownAgent(EntityId),

    #[error("Invalid transition for {task}: {from:?} -> {to:?}")]
    InvalidTransition {
        task: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
