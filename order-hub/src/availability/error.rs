//! Availability sync errors

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Snapshot request failed (network, status, body)
    #[error("Availability fetch failed: {0}")]
    Fetch(String),

    #[error("Availability fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Push channel could not be opened
    #[error("Push subscription failed: {0}")]
    Subscribe(String),

    #[error("Availability synchronizer is already running")]
    AlreadyRunning,

    #[error("Invalid availability source config: {0}")]
    InvalidConfig(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
