//! Priority scheduler for a single actor
//!
//! The scheduler provides:
//! - One foreground task at a time, selected by effective priority
//! - Background tasks on fixed intervals
//! - A cancellable default task for idle time
//! - Duplicate rejection by task name

mod clock;
mod config;
mod core;
mod handle;
mod queue;
mod task;

pub use clock::{Clock, TokioClock};
pub use config::SchedulerConfig;
pub use core::TaskScheduler;
pub use handle::SchedulerHandle;
pub use queue::{EnqueueResult, QueueEntry, QueueState, SchedulerError, SchedulerStats, TaskId, TaskState, TickOutcome};
pub use task::{CancelToken, Task, TaskContext, TaskKind};
