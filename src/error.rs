//! Error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("memory tracking is already active")]
    AlreadyTracking,

    #[error("memory tracking is not active")]
    NotTracking,

    #[error("failed to read memory counters: {0}")]
    Collector(#[from] std::io::Error),

    #[error("failed to spawn workload: {0}")]
    Spawn(String),

    #[error("workload error: {0}")]
    Workload(String),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}
