//! Task trait and cooperative cancellation

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::SchedulerHandle;
use super::queue::TaskId;
use crate::domain::Priority;

/// How the scheduler runs a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Queued and selected by priority, one at a time
    Foreground,

    /// Started on enqueue and re-run every `interval` until cancelled
    Background { interval: Duration },
}

/// A unit of work for the scheduler
///
/// Background tasks must not mutate the ledger; they inspect state and
/// enqueue foreground work.
#[async_trait]
pub trait Task: Send + Sync {
    /// Unique key used for duplicate detection
    fn name(&self) -> &str;

    fn display_name(&self) -> &str {
        self.name()
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Foreground
    }

    /// Only cancellable tasks ever see their token set
    fn cancellable(&self) -> bool;

    /// Effective priority, recomputed each time the scheduler selects
    fn priority(&self, base: Priority) -> Priority {
        base
    }

    async fn run(&self, ctx: &TaskContext) -> eyre::Result<()>;
}

#[derive(Debug, Default)]
struct CancelInner {
    flag: AtomicBool,
    notify: Notify,
}

/// Shared cancellation flag with an awaitable signal
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// What a running task can see of the scheduler
#[derive(Clone)]
pub struct TaskContext {
    id: TaskId,
    token: CancelToken,
    scheduler: SchedulerHandle,
}

impl TaskContext {
    pub(crate) fn new(id: TaskId, token: CancelToken, scheduler: SchedulerHandle) -> Self {
        Self { id, token, scheduler }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Handle for enqueueing follow-up work
    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
