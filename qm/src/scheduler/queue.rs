//! Queue types for the scheduler

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::domain::Priority;

/// Scheduler-assigned task identifier, increasing in enqueue order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of an enqueue attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueResult {
    /// Foreground task waiting for selection
    Queued(TaskId),

    /// Background task armed
    Started(TaskId),

    /// A task with the same name is already queued or running
    Rejected { reason: String },
}

impl EnqueueResult {
    pub fn id(&self) -> Option<TaskId> {
        match self {
            Self::Queued(id) | Self::Started(id) => Some(*id),
            Self::Rejected { .. } => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

/// What one tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A foreground task is still running
    Busy,

    Paused,

    /// A foreground task ran to completion
    Completed { id: TaskId, name: String, ok: bool },

    /// Nothing queued; the default task was started
    DefaultStarted,

    /// Nothing queued; the default task is already running
    DefaultRunning,

    /// Nothing queued and no default task
    Idle,
}

/// Where a named task currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Running,
    Background,
}

/// Statistics for the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub total_enqueued: u64,
    pub total_rejected: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub total_cancelled: u64,
    pub default_starts: u64,
    pub peak_queue_depth: usize,
}

/// Snapshot of the scheduler for display
#[derive(Debug, Clone, Serialize)]
pub struct QueueState {
    pub running: Option<String>,
    pub queued: usize,
    pub background: usize,
    pub default_running: bool,
    pub paused: bool,
    pub stats: SchedulerStats,
}

/// One row of the queue listing
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    pub id: TaskId,
    pub name: String,
    pub priority: Priority,
    pub status: TaskState,
    pub wait_time: Option<Duration>,
}

/// Errors from scheduler configuration calls
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Default task {name} must be cancellable")]
    DefaultNotCancellable { name: String },

    #[error("Default task {name} must be a foreground task")]
    DefaultIsBackground { name: String },
}
