// Admission ticker: the task that calls `Dispatcher::tick` on an interval

use super::{Dispatcher, Inner};
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Handle to a running ticker task, owned by the dispatcher until `end()`
pub(super) struct Ticker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn a ticker for `inner`. It holds only a weak handle, so an
    /// abandoned dispatcher is not kept alive by its own ticker.
    pub(super) fn spawn(runtime: &Handle, inner: Weak<Inner>, tick_interval: Duration) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = runtime.spawn(run(inner, tick_interval, stop_rx));
        Self { stop_tx, handle }
    }

    /// Interrupt the current sleep and wait for the task to exit
    pub(super) async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Admission ticker ended abnormally");
        }
    }
}

async fn run(inner: Weak<Inner>, tick_interval: Duration, mut stop_rx: watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            break;
        }
        tokio::select! {
            _ = sleep(tick_interval) => {},
            // Also fires when the sender is dropped with the dispatcher
            _ = stop_rx.changed() => {
                debug!("Admission ticker interrupted");
                break;
            }
        }
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !(Dispatcher { inner }).tick() {
            break;
        }
    }
    debug!("Admission ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SingleLimitQueue;
    use std::sync::Arc;
    use tokio::time::timeout;

    fn idle_dispatcher(tick_interval: Duration) -> Dispatcher {
        Dispatcher::new(Box::new(SingleLimitQueue::new()), tick_interval).unwrap()
    }

    #[tokio::test]
    async fn test_stop_interrupts_long_sleep() {
        let dispatcher = idle_dispatcher(Duration::from_secs(3600));
        let ticker = Ticker::spawn(
            &Handle::current(),
            Arc::downgrade(&dispatcher.inner),
            Duration::from_secs(3600),
        );

        timeout(Duration::from_secs(1), ticker.stop())
            .await
            .expect("stop should not wait for the interval");
    }

    #[tokio::test]
    async fn test_exits_when_dispatcher_not_running() {
        // Idle: the first tick reports "not running" and the loop ends
        let dispatcher = idle_dispatcher(Duration::from_millis(1));
        let ticker = Ticker::spawn(
            &Handle::current(),
            Arc::downgrade(&dispatcher.inner),
            Duration::from_millis(1),
        );

        timeout(Duration::from_secs(1), ticker.handle)
            .await
            .expect("ticker should exit on its own")
            .unwrap();
    }

    #[tokio::test]
    async fn test_exits_when_dispatcher_dropped() {
        let dispatcher = idle_dispatcher(Duration::from_millis(1));
        let inner = Arc::downgrade(&dispatcher.inner);
        drop(dispatcher);
        let ticker = Ticker::spawn(&Handle::current(), inner, Duration::from_millis(1));

        timeout(Duration::from_secs(1), ticker.handle)
            .await
            .expect("ticker should exit once the dispatcher is gone")
            .unwrap();
    }
}
