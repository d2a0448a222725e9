// Job Handler Port
// Abstraction for the caller-supplied work behind a category

use crate::application::Dispatcher;
use crate::domain::{Category, JobPayload};
use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;

/// Error returned by a handler. Never surfaces to the enqueuing caller;
/// the dispatcher turns it into a `JobError` event.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// `Ok(None)` means "finished, nothing to report" and emits no completion event
pub type HandlerResult = std::result::Result<Option<serde_json::Value>, HandlerError>;

/// Failures produced by the dispatcher itself on a handler's behalf
#[derive(Error, Debug)]
pub enum JobFailure {
    #[error("No handler registered for category: {0}")]
    MissingHandler(Category),

    #[error("Handler panicked: {0}")]
    Panicked(String),

    #[error("Handler task cancelled")]
    Cancelled,
}

/// Job Handler trait
///
/// Receives the job payload and a handle to the dispatcher running it, so a
/// handler may enqueue follow-up jobs.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, payload: JobPayload, dispatcher: Dispatcher) -> HandlerResult;
}

/// Adapter turning an async closure into a [`JobHandler`]
pub struct FnHandler<F>(F);

/// Wrap `f` as a handler.
///
/// # Example
/// ```text
/// let resize = handler_fn(|payload, _dispatcher| async move {
///     Ok(Some(payload.into_value()))
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(JobPayload, Dispatcher) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(JobPayload, Dispatcher) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, payload: JobPayload, dispatcher: Dispatcher) -> HandlerResult {
        (self.0)(payload, dispatcher).await
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Semaphore;

    /// Mock handler behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Succeed with this result
        Succeed(serde_json::Value),
        /// Succeed with no result
        NoResult,
        /// Echo the payload back as the result
        Echo,
        /// Fail with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock handler that records every payload it receives.
    ///
    /// Built with [`MockHandler::gated`], each invocation waits for a permit
    /// released via [`MockHandler::release`], which lets tests hold jobs
    /// in flight.
    pub struct MockHandler {
        behavior: Mutex<MockBehavior>,
        payloads: Mutex<Vec<serde_json::Value>>,
        gate: Option<Semaphore>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockHandler {
        pub fn new(behavior: MockBehavior) -> Arc<Self> {
            Arc::new(Self::build(behavior, None))
        }

        pub fn gated(behavior: MockBehavior) -> Arc<Self> {
            Arc::new(Self::build(behavior, Some(Semaphore::new(0))))
        }

        pub fn new_success(result: serde_json::Value) -> Arc<Self> {
            Self::new(MockBehavior::Succeed(result))
        }

        pub fn new_fail(message: impl Into<String>) -> Arc<Self> {
            Self::new(MockBehavior::Fail(message.into()))
        }

        fn build(behavior: MockBehavior, gate: Option<Semaphore>) -> Self {
            Self {
                behavior: Mutex::new(behavior),
                payloads: Mutex::new(Vec::new()),
                gate,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        /// Let `n` gated invocations finish
        pub fn release(&self, n: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(n);
            }
        }

        pub fn call_count(&self) -> usize {
            self.payloads.lock().unwrap().len()
        }

        /// Payloads in invocation order
        pub fn payloads(&self) -> Vec<serde_json::Value> {
            self.payloads.lock().unwrap().clone()
        }

        pub fn in_flight(&self) -> usize {
            self.in_flight.load(Ordering::SeqCst)
        }

        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobHandler for MockHandler {
        async fn handle(&self, payload: JobPayload, _dispatcher: Dispatcher) -> HandlerResult {
            self.payloads
                .lock()
                .unwrap()
                .push(payload.as_value().clone());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(gate) = &self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                MockBehavior::Succeed(result) => Ok(Some(result)),
                MockBehavior::NoResult => Ok(None),
                MockBehavior::Echo => Ok(Some(payload.into_value())),
                MockBehavior::Fail(msg) => Err(msg.into()),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
            }
        }
    }
}
