//! Scheduler implementation

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use tokio::sync::{Mutex, MutexGuard, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::clock::{Clock, TokioClock};
use super::config::SchedulerConfig;
use super::handle::SchedulerHandle;
use super::queue::{EnqueueResult, QueueEntry, QueueState, SchedulerError, SchedulerStats, TaskId, TickOutcome};
use super::task::{CancelToken, Task, TaskContext, TaskKind};
use crate::domain::Priority;

pub(super) struct QueuedTask {
    pub(super) task: Arc<dyn Task>,
    pub(super) base: Priority,
    pub(super) enqueued_at: Instant,
}

pub(super) struct RunningTask {
    pub(super) id: TaskId,
    pub(super) name: String,
    pub(super) priority: Priority,
    pub(super) token: CancelToken,
    pub(super) cancellable: bool,
    pub(super) started_at: Instant,
}

pub(super) struct BackgroundSlot {
    pub(super) name: String,
    pub(super) token: CancelToken,
    pub(super) trigger: mpsc::UnboundedSender<oneshot::Sender<()>>,
    pub(super) handle: JoinHandle<()>,
}

struct DefaultSlot {
    id: TaskId,
    task: Arc<dyn Task>,
    active: Option<(CancelToken, JoinHandle<()>)>,
}

/// Internal state protected by mutex
pub(super) struct SchedulerInner {
    pub(super) queued: BTreeMap<TaskId, QueuedTask>,
    pub(super) running: Option<RunningTask>,
    pub(super) background: BTreeMap<TaskId, BackgroundSlot>,
    default_task: Option<DefaultSlot>,
    next_id: u64,
    pub(super) paused: bool,
    pub(super) stats: SchedulerStats,
}

impl SchedulerInner {
    pub(super) fn next_id(&mut self) -> TaskId {
        self.next_id += 1;
        TaskId(self.next_id)
    }

    pub(super) fn contains(&self, name: &str) -> bool {
        self.running.as_ref().is_some_and(|r| r.name == name)
            || self.queued.values().any(|q| q.task.name() == name)
            || self.background.values().any(|b| b.name == name)
    }

    pub(super) fn default_running(&self) -> bool {
        self.default_task
            .as_ref()
            .and_then(|d| d.active.as_ref())
            .is_some_and(|(_, handle)| !handle.is_finished())
    }
}

pub(super) struct Shared {
    pub(super) actor: String,
    pub(super) inner: Mutex<SchedulerInner>,
    pub(super) clock: Arc<dyn Clock>,
}

/// Priority scheduler for one actor
///
/// Foreground tasks run one at a time in priority order, each to completion.
/// Background tasks run on their own intervals. When nothing is queued the
/// default task runs, and it is cancelled before any foreground task starts.
pub struct TaskScheduler {
    config: SchedulerConfig,
    handle: SchedulerHandle,
}

impl TaskScheduler {
    pub fn new(actor: impl Into<String>, config: SchedulerConfig) -> Self {
        Self::with_clock(actor, config, Arc::new(TokioClock))
    }

    pub fn with_clock(actor: impl Into<String>, config: SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        let actor = actor.into();
        debug!(%actor, ?config, "TaskScheduler::new: called");
        let shared = Shared {
            actor,
            inner: Mutex::new(SchedulerInner {
                queued: BTreeMap::new(),
                running: None,
                background: BTreeMap::new(),
                default_task: None,
                next_id: 0,
                paused: false,
                stats: SchedulerStats::default(),
            }),
            clock,
        };
        Self {
            config,
            handle: SchedulerHandle::new(Arc::new(shared)),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub async fn enqueue(&self, task: Arc<dyn Task>, base: Priority) -> EnqueueResult {
        self.handle.enqueue(task, base).await
    }

    pub async fn cancel(&self, name: &str) -> bool {
        self.handle.cancel(name).await
    }

    pub async fn is_enqueued(&self, name: &str) -> bool {
        self.handle.is_enqueued(name).await
    }

    pub async fn pause(&self) {
        self.handle.pause().await
    }

    pub async fn unpause(&self) {
        self.handle.unpause().await
    }

    pub async fn queue_state(&self) -> QueueState {
        self.handle.queue_state().await
    }

    pub async fn queue_details(&self) -> Vec<QueueEntry> {
        self.handle.queue_details().await
    }

    pub async fn trigger_background(&self) -> usize {
        self.handle.trigger_background().await
    }

    pub async fn stats(&self) -> SchedulerStats {
        self.handle.stats().await
    }

    /// Install the task that runs whenever nothing is queued
    ///
    /// Replaces (and stops) any previous default task.
    pub async fn set_default_task(&self, task: Arc<dyn Task>) -> Result<(), SchedulerError> {
        let name = task.name().to_string();
        debug!(%name, "TaskScheduler::set_default_task: called");
        if !task.cancellable() {
            return Err(SchedulerError::DefaultNotCancellable { name });
        }
        if matches!(task.kind(), TaskKind::Background { .. }) {
            return Err(SchedulerError::DefaultIsBackground { name });
        }

        let id = self.handle.allocate_id().await;
        let previous = {
            let mut inner = self.handle.shared.inner.lock().await;
            inner
                .default_task
                .replace(DefaultSlot { id, task, active: None })
                .and_then(|slot| slot.active)
        };
        if let Some((token, handle)) = previous {
            stop_default(token, handle).await;
        }
        info!(%name, "Default task installed");
        Ok(())
    }

    /// One scheduling step
    ///
    /// Picks the queued task with the highest effective priority (earliest
    /// enqueued on ties), suspends the default task, and runs the selected
    /// task to completion. Failed tasks are logged and dropped.
    pub async fn tick(&self) -> TickOutcome {
        let mut inner = self.handle.shared.inner.lock().await;
        if inner.running.is_some() {
            return TickOutcome::Busy;
        }
        if inner.paused {
            return TickOutcome::Paused;
        }

        let selected = inner
            .queued
            .iter()
            .map(|(id, q)| (*id, q.task.priority(q.base)))
            .max_by(|(id_a, pa), (id_b, pb)| pa.cmp(pb).then_with(|| id_b.cmp(id_a)));
        let Some((id, priority)) = selected else {
            return self.start_default(inner);
        };
        let Some(entry) = inner.queued.remove(&id) else {
            return TickOutcome::Idle;
        };

        let name = entry.task.name().to_string();
        let token = CancelToken::new();
        inner.running = Some(RunningTask {
            id,
            name: name.clone(),
            priority,
            token: token.clone(),
            cancellable: entry.task.cancellable(),
            started_at: self.handle.shared.clock.now(),
        });
        let default_run = inner.default_task.as_mut().and_then(|d| d.active.take());
        drop(inner);

        if let Some((default_token, handle)) = default_run {
            debug!(%name, "TaskScheduler::tick: suspending default task");
            stop_default(default_token, handle).await;
        }

        info!(actor = %self.handle.actor(), task = %entry.task.display_name(), %id, %priority, "Running task");
        let ctx = TaskContext::new(id, token, self.handle.clone());
        let result = entry.task.run(&ctx).await;

        let mut inner = self.handle.shared.inner.lock().await;
        inner.running = None;
        match &result {
            Ok(()) => {
                inner.stats.total_completed += 1;
                info!(task = %name, %id, "Task finished");
            }
            Err(e) => {
                inner.stats.total_failed += 1;
                warn!(task = %name, %id, error = %e, "Task failed");
            }
        }
        TickOutcome::Completed {
            id,
            name,
            ok: result.is_ok(),
        }
    }

    fn start_default(&self, mut inner: MutexGuard<'_, SchedulerInner>) -> TickOutcome {
        let Some(default) = inner.default_task.as_mut() else {
            return TickOutcome::Idle;
        };
        if let Some((_, handle)) = &default.active
            && !handle.is_finished()
        {
            return TickOutcome::DefaultRunning;
        }

        let token = CancelToken::new();
        let ctx = TaskContext::new(default.id, token.clone(), self.handle.clone());
        let task = default.task.clone();
        let handle = tokio::spawn(async move {
            debug!(task = %task.name(), "default task: started");
            if let Err(e) = task.run(&ctx).await {
                warn!(task = %task.name(), error = %e, "Default task failed");
            }
        });
        default.active = Some((token, handle));
        inner.stats.default_starts += 1;
        TickOutcome::DefaultStarted
    }

    /// Tick every `tick_interval` until a shutdown signal arrives
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        info!(actor = %self.handle.actor(), interval = ?self.config.tick_interval(), "TaskScheduler starting");
        let interval = self.config.tick_interval();
        let clock = self.handle.shared.clock.clone();

        loop {
            tokio::select! {
                _ = clock.sleep(interval) => {
                    let outcome = self.tick().await;
                    debug!(?outcome, "TaskScheduler::run: tick");
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Stop the default task and every background loop
    pub async fn shutdown(&self) {
        debug!("TaskScheduler::shutdown: called");
        let (default_run, background) = {
            let mut inner = self.handle.shared.inner.lock().await;
            let default_run = inner.default_task.as_mut().and_then(|d| d.active.take());
            let background: Vec<_> = std::mem::take(&mut inner.background).into_values().collect();
            (default_run, background)
        };

        if let Some((token, handle)) = default_run {
            stop_default(token, handle).await;
        }
        for slot in background {
            slot.token.cancel();
            if let Err(e) = slot.handle.await {
                warn!(task = %slot.name, error = %e, "Background task ended abnormally");
            }
        }
        info!(actor = %self.handle.actor(), "TaskScheduler stopped");
    }
}

async fn stop_default(token: CancelToken, handle: JoinHandle<()>) {
    token.cancel();
    if let Err(e) = handle.await {
        warn!(error = %e, "Default task ended abnormally");
    }
}

pub(super) async fn background_loop(
    task: Arc<dyn Task>,
    ctx: TaskContext,
    clock: Arc<dyn Clock>,
    interval: Duration,
    mut triggers: mpsc::UnboundedReceiver<oneshot::Sender<()>>,
) {
    debug!(task = %task.name(), ?interval, "background_loop: armed");
    loop {
        let mut done = None;
        tokio::select! {
            _ = clock.sleep(interval) => {}
            Some(reply) = triggers.recv() => {
                debug!(task = %task.name(), "background_loop: triggered early");
                done = Some(reply);
            }
            _ = ctx.cancelled() => break,
        }
        debug!(task = %task.name(), "background_loop: running");
        if let Err(e) = task.run(&ctx).await {
            warn!(task = %task.name(), error = %e, "Background task failed");
        }
        if let Some(reply) = done {
            // The trigger may have stopped waiting.
            let _ = reply.send(());
        }
        if ctx.is_cancelled() {
            break;
        }
    }
    debug!(task = %task.name(), "background_loop: stopped");
}
