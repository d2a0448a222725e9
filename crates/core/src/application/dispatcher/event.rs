//! Dispatcher notifications.
//!
//! The set of events is closed: listeners match on [`DispatchEvent`] and the
//! compiler checks they handle every kind.
//!
//! ## Ordering
//! - `Started` precedes every job event of a run.
//! - Job events follow handler settlement order, not admission order.
//! - `EmptyQueue` is emitted once each time the last pending or active job
//!   is reported complete, after that job's own event.
//! - `Drained` is the last event a dispatcher emits.

use super::Dispatcher;
use crate::domain::Category;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A lifecycle notification emitted by the dispatcher
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    /// The dispatcher entered `Running`
    Started,
    /// A handler finished with a non-empty result
    JobCompleted {
        category: Category,
        result: serde_json::Value,
    },
    /// A handler failed, panicked, or had no registered handler
    JobError {
        category: Category,
        error: Arc<dyn std::error::Error + Send + Sync>,
    },
    /// Nothing pending and nothing active
    EmptyQueue,
    /// `end()` finished draining; the dispatcher is closed
    Drained,
}

impl DispatchEvent {
    /// Stable lowercase event name, for logs
    pub fn name(&self) -> &'static str {
        match self {
            DispatchEvent::Started => "started",
            DispatchEvent::JobCompleted { .. } => "jobcompleted",
            DispatchEvent::JobError { .. } => "joberror",
            DispatchEvent::EmptyQueue => "emptyqueue",
            DispatchEvent::Drained => "drained",
        }
    }
}

/// Receives dispatcher events.
///
/// Called synchronously on the task that produced the event, with no
/// dispatcher lock held. Implementations must not block; to await dispatcher
/// work (e.g. `end()`), spawn a task from the listener.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &DispatchEvent, dispatcher: &Dispatcher);
}

impl<F> EventListener for F
where
    F: Fn(&DispatchEvent, &Dispatcher) + Send + Sync,
{
    fn on_event(&self, event: &DispatchEvent, dispatcher: &Dispatcher) {
        self(event, dispatcher)
    }
}

/// Forwards events into an unbounded channel (backs `Dispatcher::subscribe`)
pub(crate) struct ChannelListener {
    tx: mpsc::UnboundedSender<DispatchEvent>,
}

impl ChannelListener {
    pub fn new(tx: mpsc::UnboundedSender<DispatchEvent>) -> Self {
        Self { tx }
    }
}

impl EventListener for ChannelListener {
    fn on_event(&self, event: &DispatchEvent, _dispatcher: &Dispatcher) {
        // Receiver dropped: the subscriber lost interest
        let _ = self.tx.send(event.clone());
    }
}
