use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::counters::PoolCounters;
use super::lane::{ExecutionLane, LaneCursor};
use crate::config::PoolSettings;
use crate::error::{FacadeError, ShutdownError};

/// Logged (never returned) when the runtime cannot be stopped synchronously.
pub const ERR_UNCLEAN_SHUTDOWN: &str = "resource pool failed to terminate cleanly";

enum PoolState {
    Uninitialized,
    Running(Runtime),
    Draining(Runtime),
    Closed,
}

impl PoolState {
    fn name(&self) -> &'static str {
        match self {
            PoolState::Uninitialized => "uninitialized",
            PoolState::Running(_) => "running",
            PoolState::Draining(_) => "draining",
            PoolState::Closed => "closed",
        }
    }
}

/// A fixed-size worker runtime plus its execution lanes.
///
/// Every task admitted through [`ResourcePool::spawn`] is tracked, so shutdown
/// can stop admission and wait for in-flight work before the runtime is
/// stopped. Once closed a pool cannot be restarted.
pub struct ResourcePool {
    settings: PoolSettings,
    state: Mutex<PoolState>,
    tracker: TaskTracker,
    lanes: LaneCursor,
    counters: PoolCounters,
}

impl ResourcePool {
    pub fn new(settings: PoolSettings) -> Self {
        let lanes = LaneCursor::new(settings.threads);
        Self {
            settings,
            state: Mutex::new(PoolState::Uninitialized),
            tracker: TaskTracker::new(),
            lanes,
            counters: PoolCounters::default(),
        }
    }

    /// Build and start the worker runtime.
    pub fn start(&self) -> Result<(), FacadeError> {
        let mut state = self.state.lock();
        match &*state {
            PoolState::Uninitialized => {}
            PoolState::Running(_) => return Err(FacadeError::AlreadyStarted),
            PoolState::Draining(_) | PoolState::Closed => return Err(FacadeError::PoolClosed),
        }

        self.settings.validate()?;
        let threads = self.settings.threads;
        let prefix = self.settings.thread_name_prefix.clone();
        let worker_seq = Arc::new(AtomicUsize::new(0));

        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .max_blocking_threads(threads)
            .thread_name_fn(move || {
                let id = worker_seq.fetch_add(1, Ordering::Relaxed);
                format!("{prefix}-worker-{id}")
            })
            .enable_all()
            .build()
            .map_err(|source| FacadeError::PoolStart { source })?;

        *state = PoolState::Running(runtime);
        info!(
            pool = "start",
            threads = threads,
            lanes = self.lanes.lanes(),
            prefix = %self.settings.thread_name_prefix,
            "resource pool started"
        );
        Ok(())
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.lanes()
    }

    pub fn counters(&self) -> &PoolCounters {
        &self.counters
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.state.lock(), PoolState::Running(_))
    }

    pub fn state_name(&self) -> &'static str {
        self.state.lock().name()
    }

    /// Next lane in round-robin order.
    pub fn next_lane(&self) -> Result<ExecutionLane, FacadeError> {
        if self.is_running() {
            Ok(self.lanes.next())
        } else {
            Err(FacadeError::PoolClosed)
        }
    }

    /// Handle to the worker runtime while it is still alive (running or draining).
    pub(crate) fn runtime_handle(&self) -> Option<Handle> {
        match &*self.state.lock() {
            PoolState::Running(rt) | PoolState::Draining(rt) => Some(rt.handle().clone()),
            _ => None,
        }
    }

    /// Admit a task onto the worker runtime.
    ///
    /// Dropping the returned handle detaches the task; it is not aborted.
    pub fn spawn<F>(&self, fut: F) -> Result<JoinHandle<F::Output>, FacadeError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let state = self.state.lock();
        match &*state {
            PoolState::Running(rt) => {
                self.counters.admitted();
                Ok(self.tracker.spawn_on(fut, rt.handle()))
            }
            other => {
                self.counters.rejected();
                debug!(pool = "reject", state = other.name(), "task rejected");
                Err(FacadeError::PoolClosed)
            }
        }
    }

    /// Admit a task and wait for its output.
    ///
    /// A panic inside the task is resumed in the caller. A task cancelled by a
    /// runtime shutdown surfaces as [`FacadeError::PoolClosed`].
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, FacadeError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = self.spawn(fut)?;
        match handle.await {
            Ok(out) => Ok(out),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(FacadeError::PoolClosed),
        }
    }

    /// Stop admitting and wait up to the grace period for in-flight tasks.
    pub async fn drain(&self) -> Result<(), ShutdownError> {
        let handle = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, PoolState::Closed) {
                PoolState::Running(rt) | PoolState::Draining(rt) => {
                    let handle = rt.handle().clone();
                    *state = PoolState::Draining(rt);
                    handle
                }
                other => {
                    *state = other;
                    return Ok(());
                }
            }
        };
        self.tracker.close();

        let grace = self.settings.shutdown_grace;
        let tracker = self.tracker.clone();
        debug!(pool = "drain", in_flight = tracker.len(), "draining resource pool");

        // The wait runs on the worker runtime so the caller's runtime needs no timer.
        let waiter = handle.spawn(async move {
            tokio::time::timeout(grace, tracker.wait()).await.is_ok()
        });
        match waiter.await {
            Ok(true) => Ok(()),
            _ => Err(ShutdownError::DrainTimeout(grace)),
        }
    }

    /// Drain, then stop the worker runtime. Idempotent.
    pub async fn close(&self) {
        if let Err(reason) = self.drain().await {
            warn!(pool = "close", reason = %reason, "closing with tasks still in flight");
        }

        let Some(runtime) = self.take_runtime() else {
            return;
        };
        let grace = self.settings.shutdown_grace;

        if Handle::try_current().is_ok() {
            if let Err(e) =
                tokio::task::spawn_blocking(move || runtime.shutdown_timeout(grace)).await
            {
                warn!(pool = "close", error = %e, "runtime shutdown task failed");
            }
        } else {
            runtime.shutdown_timeout(grace);
        }
        info!(pool = "closed", "resource pool closed");
    }

    /// Synchronous best-effort shutdown used from `Drop`.
    ///
    /// Blocks while draining and stopping when the calling thread allows it.
    /// Inside an async context, or when draining times out, the runtime is
    /// handed to a detached thread instead. Never panics.
    pub fn shutdown_graceful(&self) {
        let Some(runtime) = self.take_runtime() else {
            return;
        };
        self.tracker.close();

        if Handle::try_current().is_ok() {
            self.stop_detached(runtime, ShutdownError::BlockingContext);
            return;
        }

        let grace = self.settings.shutdown_grace;
        let tracker = self.tracker.clone();
        let drained =
            runtime.block_on(async move { tokio::time::timeout(grace, tracker.wait()).await.is_ok() });
        if !drained {
            self.stop_detached(runtime, ShutdownError::DrainTimeout(grace));
            return;
        }

        runtime.shutdown_timeout(grace);
        info!(pool = "closed", "resource pool closed");
    }

    fn take_runtime(&self) -> Option<Runtime> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, PoolState::Closed) {
            PoolState::Running(rt) | PoolState::Draining(rt) => Some(rt),
            PoolState::Uninitialized | PoolState::Closed => None,
        }
    }

    fn stop_detached(&self, runtime: Runtime, reason: ShutdownError) {
        self.counters.shutdown_fallback();
        error!(reason = %reason, "{ERR_UNCLEAN_SHUTDOWN}");

        let grace = self.settings.shutdown_grace;
        let slot = Arc::new(Mutex::new(Some(runtime)));
        let thread_slot = Arc::clone(&slot);

        let spawned = std::thread::Builder::new()
            .name(format!("{}-shutdown", self.settings.thread_name_prefix))
            .spawn(move || {
                if let Some(rt) = thread_slot.lock().take() {
                    rt.shutdown_timeout(grace);
                }
            });

        if let Err(e) = spawned {
            error!(reason = %ShutdownError::ThreadSpawn(e), "{ERR_UNCLEAN_SHUTDOWN}");
            if let Some(rt) = slot.lock().take() {
                rt.shutdown_background();
            }
        }
    }
}

impl Drop for ResourcePool {
    fn drop(&mut self) {
        self.shutdown_graceful();
    }
}

impl std::fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("state", &self.state_name())
            .field("lanes", &self.lane_count())
            .field("in_flight", &self.tracker.len())
            .finish()
    }
}
