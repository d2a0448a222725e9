// Dispatcher - admission loop, handler execution and graceful drain

mod config;
pub mod constants;
mod enqueue;
mod event;
mod lifecycle;
mod panic_guard;
mod registry;
mod ticker;


pub use config::DispatcherConfig;
pub use enqueue::parse_batch;
pub use event::{DispatchEvent, EventListener};
pub use lifecycle::LifecycleState;
pub use registry::HandlerRegistry;

use event::ChannelListener;
use panic_guard::{call_guarded, run_guarded};
use ticker::Ticker;

use crate::domain::{
    build_queue, Category, CategorySnapshot, JobRecord, JobRequest, LimitConfig, SingleLimitQueue,
};
use crate::error::{AppError, Result};
use crate::port::{AdmissionQueue, HandlerResult, JobFailure, JobHandler};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

/// Drives an [`AdmissionQueue`]: admits jobs on a fixed tick, runs each
/// admitted job on its category's handler, reports completions back and
/// emits [`DispatchEvent`]s.
///
/// Cheap to clone; every clone is a handle to the same dispatcher. Handlers
/// receive one so they can enqueue follow-up work.
///
/// # Lifecycle
/// ```text
/// Idle --start()--> Running --end()--> Draining --(active == 0)--> Closed
/// Idle --end()--> Closed
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    /// Queue, handlers and lifecycle state change together under one lock
    core: Mutex<Core>,
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    ticker: Mutex<Option<Ticker>>,
    /// Woken when the last in-flight job has settled
    idle: Notify,
    tick_interval: Duration,
}

struct Core {
    queue: Box<dyn AdmissionQueue>,
    handlers: HandlerRegistry,
    state: LifecycleState,
    /// Admitted jobs whose outcome has not been fully published yet
    in_flight: usize,
}

impl Dispatcher {
    /// Create an idle dispatcher around `queue`
    ///
    /// # Errors
    /// - AppError::Config if `tick_interval` is zero
    pub fn new(queue: Box<dyn AdmissionQueue>, tick_interval: Duration) -> Result<Self> {
        config::validate_tick_interval(tick_interval)?;
        Ok(Self {
            inner: Arc::new(Inner {
                core: Mutex::new(Core {
                    queue,
                    handlers: HandlerRegistry::new(),
                    state: LifecycleState::Idle,
                    in_flight: 0,
                }),
                listeners: RwLock::new(Vec::new()),
                ticker: Mutex::new(None),
                idle: Notify::new(),
                tick_interval,
            }),
        })
    }

    /// Create an idle dispatcher whose queue variant follows `config.limits`
    pub fn from_config(config: DispatcherConfig) -> Result<Self> {
        let queue: Box<dyn AdmissionQueue> = match &config.limits {
            Some(limits) => build_queue(limits)?,
            None => Box::new(SingleLimitQueue::new()),
        };
        Self::new(queue, config.tick_interval)
    }

    /// Install handlers and, optionally, new limits.
    ///
    /// Replaces any previously configured handlers. Limits are applied
    /// first; if they are rejected nothing changes.
    ///
    /// # Errors
    /// - AppError::InvalidState unless the dispatcher is idle
    /// - AppError::Queue if the queue rejects `limits`
    pub fn configure(&self, handlers: HandlerRegistry, limits: Option<LimitConfig>) -> Result<()> {
        let mut core = self.core();
        if core.state != LifecycleState::Idle {
            return Err(AppError::InvalidState(format!(
                "cannot configure a dispatcher that is {}",
                core.state
            )));
        }
        if let Some(limits) = &limits {
            core.queue.set_limits(limits)?;
        }
        info!(
            handlers = handlers.len(),
            limits_updated = limits.is_some(),
            "Dispatcher configured"
        );
        core.handlers = handlers;
        Ok(())
    }

    /// Register a listener for every subsequent event
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Receive every subsequent event on a channel
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DispatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_listener(Arc::new(ChannelListener::new(tx)));
        rx
    }

    /// Validate a batch and append it to the queue.
    ///
    /// The batch is all-or-nothing: one malformed item rejects all of them.
    /// Once the dispatcher is draining or closed the call is a no-op that
    /// returns `Ok(0)`. Jobs enqueued while running are admitted on a later
    /// tick.
    ///
    /// # Errors
    /// - AppError::MissingField / AppError::Validation for malformed items
    /// - AppError::Config while running, if a job names a category that has
    ///   no limit (it could never be admitted)
    pub fn enqueue(&self, requests: Vec<JobRequest>) -> Result<usize> {
        if !self.state().accepts_jobs() {
            debug!(jobs = requests.len(), "Enqueue ignored, dispatcher is shutting down");
            return Ok(0);
        }
        let records = enqueue::validate_batch(requests)?;

        let mut core = self.core();
        if !core.state.accepts_jobs() {
            return Ok(0);
        }
        if core.state == LifecycleState::Running {
            if let Some((index, record)) = records
                .iter()
                .enumerate()
                .find(|(_, r)| core.queue.limit_for(&r.category).is_none())
            {
                return Err(AppError::Config(format!(
                    "no limit configured for category '{}' in job at index {index}",
                    record.category
                )));
            }
        }
        let count = records.len();
        core.queue.enqueue(records);
        debug!(
            jobs = count,
            pending = core.queue.pending_count(),
            "Jobs enqueued"
        );
        Ok(count)
    }

    /// Enqueue a JSON array of `{category, payload}` objects
    pub fn enqueue_json(&self, batch: serde_json::Value) -> Result<usize> {
        self.enqueue(enqueue::parse_batch(batch)?)
    }

    /// Begin processing: emits `Started`, runs the first admission tick
    /// immediately, then ticks every `tick_interval`.
    ///
    /// # Errors
    /// - AppError::InvalidState unless idle, or outside a Tokio runtime
    /// - AppError::Config if a pending category has no limit
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            AppError::InvalidState("start() must be called within a Tokio runtime".to_string())
        })?;

        {
            let mut core = self.core();
            if core.state != LifecycleState::Idle {
                return Err(AppError::InvalidState(format!(
                    "cannot start a dispatcher that is {}",
                    core.state
                )));
            }
            if let Some(row) = core
                .queue
                .snapshot()
                .into_iter()
                .find(|row| row.limit.is_none() && row.pending > 0)
            {
                return Err(AppError::Config(format!(
                    "no limit configured for category '{}'",
                    row.category
                )));
            }
            if core.handlers.is_empty() {
                warn!("Dispatcher started without handlers; every job will fail");
            }
            core.state = LifecycleState::Running;
        }

        info!(
            tick_interval_ms = self.inner.tick_interval.as_millis() as u64,
            "Dispatcher started"
        );
        self.emit(DispatchEvent::Started);
        self.tick();

        let ticker = Ticker::spawn(
            &runtime,
            Arc::downgrade(&self.inner),
            self.inner.tick_interval,
        );
        *lock(&self.inner.ticker) = Some(ticker);
        Ok(())
    }

    /// Stop admitting, discard pending jobs and wait for active handlers to
    /// settle.
    ///
    /// Resolves once the dispatcher is closed; `Drained` is emitted just
    /// before. Calling it again, or concurrently, waits for the same close.
    /// Must not be awaited from inside a handler: that handler counts as
    /// active, so the wait could never finish. Spawn it instead.
    pub async fn end(&self) {
        let discarded = {
            let mut core = self.core();
            let state = core.state;
            match state {
                LifecycleState::Idle => {
                    core.state = LifecycleState::Closed;
                    drop(core);
                    info!("Dispatcher closed before start");
                    self.emit(DispatchEvent::Drained);
                    return;
                }
                LifecycleState::Running => {
                    core.state = LifecycleState::Draining;
                    Some(core.queue.drain())
                }
                LifecycleState::Draining => None,
                LifecycleState::Closed => return,
            }
        };

        if let Some(discarded) = discarded {
            info!(
                discarded,
                active = self.active_count(),
                "Dispatcher draining"
            );
        }

        let ticker = lock(&self.inner.ticker).take();
        if let Some(ticker) = ticker {
            ticker.stop().await;
        }

        self.wait_for_idle().await;

        let closed_here = {
            let mut core = self.core();
            if core.state == LifecycleState::Draining {
                core.state = LifecycleState::Closed;
                true
            } else {
                false
            }
        };
        if closed_here {
            info!("Dispatcher closed");
            self.emit(DispatchEvent::Drained);
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.core().state
    }

    /// Jobs currently executing
    pub fn active_count(&self) -> usize {
        self.core().queue.active_count()
    }

    /// Jobs waiting plus jobs executing
    pub fn pending_count(&self) -> usize {
        self.core().queue.pending_count()
    }

    /// Per-category counters
    pub fn snapshot(&self) -> Vec<CategorySnapshot> {
        self.core().queue.snapshot()
    }

    pub fn tick_interval(&self) -> Duration {
        self.inner.tick_interval
    }

    fn core(&self) -> MutexGuard<'_, Core> {
        lock(&self.inner.core)
    }

    /// One admission pass. Returns `false` once the dispatcher stopped
    /// running, which ends the ticker.
    fn tick(&self) -> bool {
        let admitted: Vec<(JobRecord, Option<Arc<dyn JobHandler>>)> = {
            let mut guard = self.core();
            let core = &mut *guard;
            if core.state != LifecycleState::Running {
                return false;
            }
            match core.queue.admit_ready() {
                Ok(records) => {
                    core.in_flight += records.len();
                    records
                        .into_iter()
                        .map(|record| {
                            let handler = core.handlers.get(&record.category);
                            (record, handler)
                        })
                        .collect()
                }
                Err(e) => {
                    error!(error = %e, "Admission tick failed");
                    return true;
                }
            }
        };

        if !admitted.is_empty() {
            debug!(admitted = admitted.len(), "Admission tick");
        }
        for (record, handler) in admitted {
            self.spawn_job(record, handler);
        }
        true
    }

    fn spawn_job(&self, record: JobRecord, handler: Option<Arc<dyn JobHandler>>) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let JobRecord { category, payload } = record;
            debug!(category = %category, "Job admitted");

            let outcome = match handler {
                Some(handler) => {
                    let handle = dispatcher.clone();
                    run_guarded(async move { handler.handle(payload, handle).await }).await
                }
                None => Err(JobFailure::MissingHandler(category.clone()).into()),
            };
            dispatcher.settle(category, outcome);
        });
    }

    /// Publish a job's outcome, release its slot, then mark it settled
    fn settle(&self, category: Category, outcome: HandlerResult) {
        match outcome {
            Ok(Some(result)) if !is_empty_result(&result) => {
                debug!(category = %category, "Job completed");
                self.emit(DispatchEvent::JobCompleted {
                    category: category.clone(),
                    result,
                });
            }
            Ok(_) => debug!(category = %category, "Job completed without result"),
            Err(e) => {
                warn!(category = %category, error = %e, "Job failed");
                self.emit(DispatchEvent::JobError {
                    category: category.clone(),
                    error: Arc::from(e),
                });
            }
        }

        let now_empty = {
            let mut core = self.core();
            match core.queue.report_complete(&category) {
                Ok(()) => core.queue.pending_count() == 0,
                Err(e) => {
                    error!(category = %category, error = %e, "Completion report rejected");
                    false
                }
            }
        };
        if now_empty {
            debug!("Queue empty");
            self.emit(DispatchEvent::EmptyQueue);
        }

        // Only now may a draining `end()` proceed, so `Drained` stays last
        let settled_all = {
            let mut core = self.core();
            core.in_flight = core.in_flight.saturating_sub(1);
            core.in_flight == 0
        };
        if settled_all {
            self.inner.idle.notify_waiters();
        }
    }

    fn emit(&self, event: DispatchEvent) {
        let listeners: Vec<Arc<dyn EventListener>> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            call_guarded(event.name(), || listener.on_event(&event, self));
        }
    }

    async fn wait_for_idle(&self) {
        loop {
            // Registered before the check so a wakeup in between is not lost
            let notified = self.inner.idle.notified();
            if self.core().in_flight == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core();
        f.debug_struct("Dispatcher")
            .field("state", &core.state)
            .field("active", &core.queue.active_count())
            .field("pending", &core.queue.pending_count())
            .field("handlers", &core.handlers)
            .field("tick_interval", &self.inner.tick_interval)
            .finish()
    }
}

/// Results that carry nothing worth reporting: `null`, `false`, `""` and
/// zero. Arrays and objects count as results even when empty.
fn is_empty_result(result: &serde_json::Value) -> bool {
    match result {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => false,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
