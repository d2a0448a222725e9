// Panic isolation for handler invocations
use crate::port::{HandlerResult, JobFailure};
use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Run a handler future on its own task so a panic inside it cannot take
/// down the completion path.
///
/// A panic becomes `JobFailure::Panicked`, a cancelled task
/// `JobFailure::Cancelled`; either is returned as an ordinary handler error.
pub(crate) async fn run_guarded<F>(future: F) -> HandlerResult
where
    F: Future<Output = HandlerResult> + Send + 'static,
{
    match tokio::task::spawn(future).await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => {
            let panic_msg = panic_message(join_err.into_panic());
            error!(panic_msg = %panic_msg, "Job handler panicked");
            Err(JobFailure::Panicked(panic_msg).into())
        }
        Err(_) => Err(JobFailure::Cancelled.into()),
    }
}

/// Invoke a listener callback, containing any panic it raises.
///
/// Returns `false` if the callback panicked.
pub(crate) fn call_guarded<F>(event: &'static str, f: F) -> bool
where
    F: FnOnce(),
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(panic_info) => {
            let panic_msg = panic_message(panic_info);
            error!(event, panic_msg = %panic_msg, "Event listener panicked");
            false
        }
    }
}

fn panic_message(panic_info: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
