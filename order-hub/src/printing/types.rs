//! Print job types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticket purpose
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PrintJobKind {
    /// 厨房单 (never shows money)
    Kitchen,
    /// 外送单
    Courier,
}

impl PrintJobKind {
    /// Label printed in the ticket header
    pub fn ticket_label(&self) -> &'static str {
        match self {
            Self::Kitchen => "KITCHEN",
            Self::Courier => "DELIVERY",
        }
    }
}

impl fmt::Display for PrintJobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kitchen => f.write_str("kitchen"),
            Self::Courier => f.write_str("courier"),
        }
    }
}

/// 打印任务状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PrintJobStatus {
    Pending,
    Printing,
    Completed,
    Failed,
}

impl PrintJobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Pre-rendered receipt text plus the order it was rendered from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrintPayload {
    pub order_id: String,
    pub text: String,
}

impl PrintPayload {
    pub fn new(order_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            text: text.into(),
        }
    }
}

/// 打印任务 (owned by the dispatch queue; callers only see clones)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: String,
    pub kind: PrintJobKind,
    pub payload: PrintPayload,
    /// Failed attempts so far
    pub attempts: u32,
    pub max_attempts: u32,
    pub status: PrintJobStatus,
    pub created_at: i64,
    /// Reason of the most recent failed attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
}

impl PrintJob {
    pub(crate) fn new(kind: PrintJobKind, payload: PrintPayload, max_attempts: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            payload,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            status: PrintJobStatus::Pending,
            created_at: shared::util::now_millis(),
            last_error: None,
            finished_at: None,
        }
    }

    pub fn retries_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Read-only queue snapshot for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Jobs still in the queue (head included)
    pub queue_length: usize,
    /// Whether the processing loop is running
    pub is_processing: bool,
    pub transport_ready: bool,
    /// Queued jobs, head first
    pub jobs: Vec<PrintJob>,
    /// Recently finished jobs, newest last
    pub recent: Vec<PrintJob>,
    pub completed_total: u64,
    pub failed_total: u64,
}

impl QueueStatus {
    pub fn find(&self, job_id: &str) -> Option<&PrintJob> {
        self.jobs
            .iter()
            .chain(self.recent.iter())
            .find(|job| job.id == job_id)
    }
}
