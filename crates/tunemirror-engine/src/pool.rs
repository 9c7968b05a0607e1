//! Bounded-concurrency worker pool
//!
//! Tasks are queued FIFO and started by a coordinator task that keeps at most
//! `max_concurrency` of them running. The coordinator wakes on submission, on worker
//! completion, and on a periodic tick, so a missed wake-up only costs latency.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, warn};
use tunemirror_types::{Error, Result, DEFAULT_POOL_TICK};

type PoolTask = BoxFuture<'static, Result<()>>;

struct PoolState {
    queue: VecDeque<PoolTask>,
    max_concurrency: usize,
    closed: bool,
    stopping: bool,
    killing: bool,
}

struct Shared {
    name: String,
    tick: Duration,
    state: Mutex<PoolState>,
    wake: Notify,
    finished: watch::Sender<bool>,
    live: AtomicUsize,
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, outcome: std::result::Result<Result<()>, JoinError>) {
        match outcome {
            Ok(Ok(())) => {
                self.completed.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Err(e)) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                debug!("Task in pool '{}' failed: {}", self.name, e);
            }
            Err(e) if e.is_panic() => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                error!("Task in pool '{}' panicked", self.name);
            }
            Err(_) => {}
        }
    }
}

enum Step {
    Kill,
    Finish,
    Run(Vec<PoolTask>),
}

async fn coordinate(shared: Arc<Shared>) {
    let mut workers: JoinSet<Result<()>> = JoinSet::new();

    loop {
        while let Some(outcome) = workers.try_join_next() {
            shared.record(outcome);
        }

        let step = {
            let mut state = shared.lock();
            if state.killing {
                state.queue.clear();
                Step::Kill
            } else {
                if state.stopping && !state.queue.is_empty() {
                    debug!(
                        "Pool '{}' dropping {} queued task(s)",
                        shared.name,
                        state.queue.len()
                    );
                    state.queue.clear();
                }

                let free = state.max_concurrency.saturating_sub(workers.len());
                let take = free.min(state.queue.len());
                if take == 0 && workers.is_empty() && state.closed && state.queue.is_empty() {
                    Step::Finish
                } else {
                    Step::Run(state.queue.drain(..take).collect())
                }
            }
        };

        match step {
            Step::Kill => {
                if !workers.is_empty() {
                    warn!(
                        "Pool '{}' killed with {} task(s) in flight",
                        shared.name,
                        workers.len()
                    );
                }
                workers.abort_all();
                break;
            }
            Step::Finish => break,
            Step::Run(batch) => {
                for task in batch {
                    workers.spawn(task);
                }
            }
        }

        shared.live.store(workers.len(), Ordering::SeqCst);

        tokio::select! {
            Some(outcome) = workers.join_next(), if !workers.is_empty() => shared.record(outcome),
            () = shared.wake.notified() => {}
            () = tokio::time::sleep(shared.tick) => {}
        }
    }

    shared.live.store(0, Ordering::SeqCst);
    shared.finished.send_replace(true);
    debug!("Pool '{}' finished", shared.name);
}

/// Runs submitted futures with bounded concurrency
///
/// Must be created inside a tokio runtime. Dropping the pool kills it.
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Create a pool running at most `max_concurrency` tasks at once (at least one)
    pub fn new<S: Into<String>>(name: S, max_concurrency: usize) -> Self {
        Self::with_tick(name, max_concurrency, DEFAULT_POOL_TICK)
    }

    /// Create a pool with a custom coordinator tick
    pub fn with_tick<S: Into<String>>(name: S, max_concurrency: usize, tick: Duration) -> Self {
        let (finished, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            name: name.into(),
            tick,
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                max_concurrency: max_concurrency.max(1),
                closed: false,
                stopping: false,
                killing: false,
            }),
            wake: Notify::new(),
            finished,
            live: AtomicUsize::new(0),
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        });

        tokio::spawn(coordinate(Arc::clone(&shared)));
        Self { shared }
    }

    /// Queue a task
    ///
    /// A task that returns an error or panics is counted as failed; the pool keeps
    /// running. Fails with `PoolClosed` after `join`, `stop` or `kill`.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        {
            let mut state = self.shared.lock();
            if state.closed {
                return Err(Error::PoolClosed {
                    pool: self.shared.name.clone(),
                });
            }
            state.queue.push_back(task.boxed());
        }
        self.shared.submitted.fetch_add(1, Ordering::SeqCst);
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Stop accepting work, run everything queued, and wait for it to finish
    pub async fn join(&self) {
        self.update(|state| state.closed = true);
        self.wait_finished().await;
    }

    /// Drop queued tasks and wait for the running ones
    pub async fn stop(&self) {
        self.request_stop();
        self.wait_finished().await;
    }

    /// Drop queued tasks and abort running ones without waiting for them
    pub async fn kill(&self) {
        self.request_kill();
        self.wait_finished().await;
    }

    /// Non-blocking form of [`stop`](Self::stop)
    pub fn request_stop(&self) {
        self.update(|state| {
            state.closed = true;
            state.stopping = true;
        });
    }

    /// Non-blocking form of [`kill`](Self::kill)
    pub fn request_kill(&self) {
        self.update(|state| {
            state.closed = true;
            state.stopping = true;
            state.killing = true;
        });
    }

    /// Change the concurrency bound; applied on the next coordinator pass
    pub fn set_max_concurrency(&self, max_concurrency: usize) -> Result<()> {
        if max_concurrency == 0 {
            return Err(Error::config("pool concurrency must be at least 1"));
        }
        self.update(|state| state.max_concurrency = max_concurrency);
        Ok(())
    }

    /// Pool name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current concurrency bound
    pub fn max_concurrency(&self) -> usize {
        self.shared.lock().max_concurrency
    }

    /// Tasks currently running
    pub fn live_workers(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    /// Tasks waiting to start
    pub fn queued(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Tasks accepted so far
    pub fn submitted(&self) -> u64 {
        self.shared.submitted.load(Ordering::SeqCst)
    }

    /// Tasks that returned `Ok`
    pub fn completed(&self) -> u64 {
        self.shared.completed.load(Ordering::SeqCst)
    }

    /// Tasks that returned an error or panicked
    pub fn failed(&self) -> u64 {
        self.shared.failed.load(Ordering::SeqCst)
    }

    /// Whether the coordinator has exited
    pub fn is_finished(&self) -> bool {
        *self.shared.finished.borrow()
    }

    fn update(&self, change: impl FnOnce(&mut PoolState)) {
        change(&mut self.shared.lock());
        self.shared.wake.notify_one();
    }

    async fn wait_finished(&self) {
        let mut finished = self.shared.finished.subscribe();
        let _ = finished.wait_for(|done| *done).await;
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.is_finished() {
            self.request_kill();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.shared.name)
            .field("max_concurrency", &self.max_concurrency())
            .field("live_workers", &self.live_workers())
            .field("submitted", &self.submitted())
            .field("completed", &self.completed())
            .field("failed", &self.failed())
            .finish()
    }
}
