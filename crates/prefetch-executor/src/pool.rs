//! Bounded request pool with pause/resume.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use prefetch_core::lock;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::trace;

/// Admission state shared by every handle of a pool.
#[derive(Debug, Default)]
struct PoolState {
    /// Tasks currently executing.
    running: usize,
    /// Manual pause via `stop()`.
    stopped: bool,
    /// Outstanding priority holds.
    holds: usize,
    /// Next ticket handed out by `add()`.
    next_ticket: u64,
    /// Ticket allowed to start next.
    serving: u64,
    /// Tickets dropped before admission.
    abandoned: BTreeSet<u64>,
}

impl PoolState {
    fn is_paused(&self) -> bool {
        self.stopped || self.holds > 0
    }

    fn skip_abandoned(&mut self) {
        while self.abandoned.remove(&self.serving) {
            self.serving += 1;
        }
    }

    fn queued(&self) -> usize {
        (self.next_ticket - self.serving) as usize - self.abandoned.len()
    }
}

struct PoolInner {
    concurrency: usize,
    state: Mutex<PoolState>,
    wake: Notify,
}

/// Scheduler limiting how many background tasks execute at once.
///
/// Tasks start in the order they were added. `stop()` and priority holds
/// keep queued tasks from starting without touching running ones. A task's
/// failure is only visible to the caller that added it.
///
/// Handles are cheap to clone and share the same queue.
#[derive(Clone)]
pub struct RequestPool {
    inner: Arc<PoolInner>,
}

impl RequestPool {
    /// Create a pool running at most `concurrency` tasks at once.
    ///
    /// A zero limit is raised to one.
    pub fn new(concurrency: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                concurrency: concurrency.max(1),
                state: Mutex::new(PoolState::default()),
                wake: Notify::new(),
            }),
        }
    }

    /// Queue a unit of work.
    ///
    /// The task is spawned onto the runtime and runs once admitted, whether
    /// or not the returned future is being polled. The returned future
    /// resolves with the task's own output. The queue position is taken when
    /// `add` is called; dropping the returned future cancels the task and, if
    /// it was still queued, gives up its turn.
    ///
    /// Must be called from within a tokio runtime.
    pub fn add<F, Fut, T>(&self, task: F) -> impl Future<Output = T> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let ticket = Ticket::issue(&self.inner);
        let mut spawned = AbortOnDrop(tokio::spawn(async move {
            let slot = ticket.admit().await;
            let output = task().await;
            drop(slot);
            output
        }));

        async move {
            match (&mut spawned.0).await {
                Ok(output) => output,
                Err(err) => match err.try_into_panic() {
                    Ok(payload) => std::panic::resume_unwind(payload),
                    // Cancelled by runtime shutdown.
                    Err(_) => std::future::pending().await,
                },
            }
        }
    }

    /// Stop admitting queued tasks. Running tasks continue.
    pub fn stop(&self) {
        lock(&self.inner.state).stopped = true;
        trace!("request pool stopped");
    }

    /// Resume admitting queued tasks.
    pub fn start(&self) {
        lock(&self.inner.state).stopped = false;
        trace!("request pool started");
        self.inner.wake.notify_waiters();
    }

    /// Pause the pool until the returned guard is dropped.
    ///
    /// Holds nest: the pool resumes only once every hold is released and no
    /// manual `stop()` is in effect.
    pub fn hold(&self) -> PoolHold {
        lock(&self.inner.state).holds += 1;
        PoolHold {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Whether queued tasks are currently kept from starting.
    pub fn is_paused(&self) -> bool {
        lock(&self.inner.state).is_paused()
    }

    /// Number of tasks executing right now.
    pub fn running(&self) -> usize {
        lock(&self.inner.state).running
    }

    /// Number of tasks waiting for admission.
    pub fn queued(&self) -> usize {
        lock(&self.inner.state).queued()
    }

    /// Configured concurrency limit.
    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }
}

impl std::fmt::Debug for RequestPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("RequestPool")
            .field("concurrency", &self.inner.concurrency)
            .field("running", &state.running)
            .field("queued", &state.queued())
            .field("paused", &state.is_paused())
            .finish()
    }
}

/// Guard returned by [`RequestPool::hold`].
#[must_use = "the pool resumes as soon as the hold is dropped"]
pub struct PoolHold {
    inner: Arc<PoolInner>,
}

impl Drop for PoolHold {
    fn drop(&mut self) {
        let resumed = {
            let mut state = lock(&self.inner.state);
            state.holds = state.holds.saturating_sub(1);
            !state.is_paused()
        };
        if resumed {
            self.inner.wake.notify_waiters();
        }
    }
}

/// Aborts a pooled task once nobody can observe its output.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Queue position of a task that has not started yet.
struct Ticket {
    inner: Arc<PoolInner>,
    number: u64,
    admitted: bool,
}

impl Ticket {
    fn issue(inner: &Arc<PoolInner>) -> Self {
        let mut state = lock(&inner.state);
        let number = state.next_ticket;
        state.next_ticket += 1;
        Self {
            inner: Arc::clone(inner),
            number,
            admitted: false,
        }
    }

    async fn admit(mut self) -> Slot {
        let inner = Arc::clone(&self.inner);
        loop {
            // Registered before the check so a release in between is not missed.
            let notified = inner.wake.notified();
            {
                let mut state = lock(&inner.state);
                if state.serving == self.number
                    && !state.is_paused()
                    && state.running < inner.concurrency
                {
                    state.serving += 1;
                    state.skip_abandoned();
                    state.running += 1;
                    self.admitted = true;
                    drop(state);

                    inner.wake.notify_waiters();
                    return Slot {
                        inner: Arc::clone(&inner),
                    };
                }
            }
            notified.await;
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.admitted {
            return;
        }
        {
            let mut state = lock(&self.inner.state);
            state.abandoned.insert(self.number);
            state.skip_abandoned();
        }
        self.inner.wake.notify_waiters();
    }
}

/// An occupied execution slot.
struct Slot {
    inner: Arc<PoolInner>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        {
            let mut state = lock(&self.inner.state);
            state.running = state.running.saturating_sub(1);
        }
        self.inner.wake.notify_waiters();
    }
}
