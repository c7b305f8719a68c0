//! Clonable handle for enqueueing and inspecting tasks

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::core::{BackgroundSlot, QueuedTask, Shared, background_loop};
use super::queue::{EnqueueResult, QueueEntry, QueueState, SchedulerStats, TaskId, TaskState};
use super::task::{CancelToken, Task, TaskContext, TaskKind};
use crate::domain::Priority;

/// Shared access to a [`TaskScheduler`](super::TaskScheduler)
///
/// Tasks receive one through their context so they can enqueue follow-up
/// work; the application keeps one for inspection.
#[derive(Clone)]
pub struct SchedulerHandle {
    pub(super) shared: Arc<Shared>,
}

impl SchedulerHandle {
    pub(super) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Name of the actor this scheduler drives
    pub fn actor(&self) -> &str {
        &self.shared.actor
    }

    /// Add a task unless one with the same name is queued, running, or armed
    ///
    /// Background tasks start their interval loop immediately.
    pub async fn enqueue(&self, task: Arc<dyn Task>, base: Priority) -> EnqueueResult {
        let name = task.name().to_string();
        debug!(%name, %base, "SchedulerHandle::enqueue: called");
        let mut inner = self.shared.inner.lock().await;

        if inner.contains(&name) {
            debug!(%name, "SchedulerHandle::enqueue: duplicate, rejecting");
            inner.stats.total_rejected += 1;
            return EnqueueResult::Rejected {
                reason: format!("{} is already enqueued", name),
            };
        }

        let id = inner.next_id();
        inner.stats.total_enqueued += 1;
        match task.kind() {
            TaskKind::Background { interval } => {
                let token = CancelToken::new();
                let ctx = TaskContext::new(id, token.clone(), self.clone());
                let (trigger, triggers) = mpsc::unbounded_channel();
                let handle = tokio::spawn(background_loop(
                    task,
                    ctx,
                    self.shared.clock.clone(),
                    interval,
                    triggers,
                ));
                inner.background.insert(
                    id,
                    BackgroundSlot {
                        name,
                        token,
                        trigger,
                        handle,
                    },
                );
                EnqueueResult::Started(id)
            }
            TaskKind::Foreground => {
                let enqueued_at = self.shared.clock.now();
                inner.queued.insert(id, QueuedTask { task, base, enqueued_at });
                inner.stats.peak_queue_depth = inner.stats.peak_queue_depth.max(inner.queued.len());
                debug!(%name, %id, "SchedulerHandle::enqueue: queued");
                EnqueueResult::Queued(id)
            }
        }
    }

    /// Whether a task with this name is queued, running, or armed
    pub async fn is_enqueued(&self, name: &str) -> bool {
        self.shared.inner.lock().await.contains(name)
    }

    pub async fn state_of(&self, name: &str) -> Option<TaskState> {
        let inner = self.shared.inner.lock().await;
        if inner.running.as_ref().is_some_and(|r| r.name == name) {
            Some(TaskState::Running)
        } else if inner.queued.values().any(|q| q.task.name() == name) {
            Some(TaskState::Queued)
        } else if inner.background.values().any(|b| b.name == name) {
            Some(TaskState::Background)
        } else {
            None
        }
    }

    /// Cancel a task by name
    ///
    /// Queued tasks are dropped and background loops stopped. A running task
    /// only gets its token set, and only if it is cancellable; `false` means
    /// nothing was cancelled.
    pub async fn cancel(&self, name: &str) -> bool {
        debug!(%name, "SchedulerHandle::cancel: called");
        let mut inner = self.shared.inner.lock().await;

        let queued = inner
            .queued
            .iter()
            .find(|(_, q)| q.task.name() == name)
            .map(|(id, _)| *id);
        if let Some(id) = queued {
            inner.queued.remove(&id);
            inner.stats.total_cancelled += 1;
            debug!(%name, %id, "SchedulerHandle::cancel: removed from queue");
            return true;
        }

        if let Some(running) = &inner.running
            && running.name == name
        {
            if !running.cancellable {
                debug!(%name, "SchedulerHandle::cancel: running and not cancellable");
                return false;
            }
            running.token.cancel();
            inner.stats.total_cancelled += 1;
            return true;
        }

        let background = inner
            .background
            .iter()
            .find(|(_, b)| b.name == name)
            .map(|(id, _)| *id);
        if let Some(id) = background
            && let Some(slot) = inner.background.remove(&id)
        {
            slot.token.cancel();
            inner.stats.total_cancelled += 1;
            debug!(%name, %id, "SchedulerHandle::cancel: stopped background task");
            return true;
        }

        debug!(%name, "SchedulerHandle::cancel: not found");
        false
    }

    /// Run every background task now instead of at its next interval
    ///
    /// Returns once each triggered run has finished. A task that is mid-run
    /// goes again as soon as it finishes. Returns the number of background
    /// tasks triggered.
    pub async fn trigger_background(&self) -> usize {
        debug!("SchedulerHandle::trigger_background: called");
        let pending: Vec<oneshot::Receiver<()>> = {
            let inner = self.shared.inner.lock().await;
            inner
                .background
                .values()
                .filter_map(|slot| {
                    let (done, finished) = oneshot::channel();
                    slot.trigger.send(done).ok().map(|()| finished)
                })
                .collect()
        };
        let count = pending.len();
        // A loop cancelled before replying drops its sender; that still counts as settled.
        join_all(pending).await;
        debug!(%count, "SchedulerHandle::trigger_background: runs finished");
        count
    }

    /// Stop selecting foreground tasks; background loops keep running
    pub async fn pause(&self) {
        debug!("SchedulerHandle::pause: called");
        self.shared.inner.lock().await.paused = true;
    }

    pub async fn unpause(&self) {
        debug!("SchedulerHandle::unpause: called");
        self.shared.inner.lock().await.paused = false;
    }

    pub async fn queue_state(&self) -> QueueState {
        let inner = self.shared.inner.lock().await;
        QueueState {
            running: inner.running.as_ref().map(|r| r.name.clone()),
            queued: inner.queued.len(),
            background: inner.background.len(),
            default_running: inner.default_running(),
            paused: inner.paused,
            stats: inner.stats.clone(),
        }
    }

    /// Running, queued, and background tasks, highest priority first
    pub async fn queue_details(&self) -> Vec<QueueEntry> {
        let inner = self.shared.inner.lock().await;
        let now = self.shared.clock.now();

        let mut entries: Vec<_> = inner
            .running
            .iter()
            .map(|r| QueueEntry {
                id: r.id,
                name: r.name.clone(),
                priority: r.priority,
                status: TaskState::Running,
                wait_time: Some(now - r.started_at),
            })
            .chain(inner.queued.iter().map(|(id, q)| QueueEntry {
                id: *id,
                name: q.task.name().to_string(),
                priority: q.task.priority(q.base),
                status: TaskState::Queued,
                wait_time: Some(now - q.enqueued_at),
            }))
            .chain(inner.background.iter().map(|(id, b)| QueueEntry {
                id: *id,
                name: b.name.clone(),
                priority: Priority::BACKGROUND,
                status: TaskState::Background,
                wait_time: None,
            }))
            .collect();

        entries.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    pub async fn stats(&self) -> SchedulerStats {
        self.shared.inner.lock().await.stats.clone()
    }

    pub(super) async fn allocate_id(&self) -> TaskId {
        self.shared.inner.lock().await.next_id()
    }
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("actor", &self.shared.actor)
            .finish()
    }
}
