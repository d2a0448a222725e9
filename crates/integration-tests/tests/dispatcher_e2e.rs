//! End-to-end dispatcher runs
//!
//! Real handlers with real delays on a multi-threaded runtime; checks the
//! concurrency ceilings and the event stream seen by an embedder.

use admitq_core::port::job_handler::mocks::{MockBehavior, MockHandler};
use admitq_core::{
    DispatchEvent, Dispatcher, DispatcherConfig, HandlerRegistry, HandlerResult, JobHandler,
    JobPayload, JobRequest, LimitConfig,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const TICK: Duration = Duration::from_millis(5);

/// Sleeps for the payload's `ms`, tracking peak concurrency
#[derive(Default)]
struct TimedHandler {
    running: AtomicUsize,
    peak: AtomicUsize,
    finished: Mutex<Vec<u64>>,
}

#[async_trait]
impl JobHandler for TimedHandler {
    async fn handle(&self, payload: JobPayload, _dispatcher: Dispatcher) -> HandlerResult {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let ms = payload.as_value()["ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.finished.lock().unwrap().push(ms);
        Ok(Some(json!({ "slept": ms })))
    }
}

fn timed_jobs(category: &str, durations: &[u64]) -> Vec<JobRequest> {
    durations
        .iter()
        .map(|ms| JobRequest::new(category, json!({ "ms": ms })))
        .collect()
}

async fn collect_until_empty(rx: &mut UnboundedReceiver<DispatchEvent>) -> Vec<DispatchEvent> {
    let mut events = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("dispatcher stalled")
            .expect("event stream closed");
        let done = matches!(event, DispatchEvent::EmptyQueue);
        events.push(event);
        if done {
            return events;
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_limit_caps_concurrency() {
    let dispatcher = Dispatcher::from_config(
        DispatcherConfig::default()
            .with_tick_interval(TICK)
            .with_limits(LimitConfig::single(2)),
    )
    .unwrap();
    let handler = Arc::new(TimedHandler::default());
    dispatcher
        .configure(HandlerRegistry::new().with("resize", handler.clone()), None)
        .unwrap();
    dispatcher
        .enqueue(timed_jobs("resize", &[30, 30, 30, 30, 30]))
        .unwrap();

    let mut rx = dispatcher.subscribe();
    dispatcher.start().unwrap();
    let events = collect_until_empty(&mut rx).await;

    assert_eq!(handler.peak.load(Ordering::SeqCst), 2);
    assert_eq!(handler.finished.lock().unwrap().len(), 5);
    let completed = events
        .iter()
        .filter(|e| matches!(e, DispatchEvent::JobCompleted { .. }))
        .count();
    assert_eq!(completed, 5);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, DispatchEvent::EmptyQueue))
            .count(),
        1
    );

    dispatcher.end().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_category_limits_from_environment() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("ADMITQ_TICK_INTERVAL_MS", "5"),
        ("ADMITQ_LIMIT", r#"{"thumbs": 3, "uploads": 1}"#),
    ]);
    let config = DispatcherConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
    assert_eq!(config.tick_interval, TICK);

    let dispatcher = Dispatcher::from_config(config).unwrap();
    let thumbs = Arc::new(TimedHandler::default());
    let uploads = Arc::new(TimedHandler::default());
    dispatcher
        .configure(
            HandlerRegistry::new()
                .with("thumbs", thumbs.clone())
                .with("uploads", uploads.clone()),
            None,
        )
        .unwrap();

    let mut batch = timed_jobs("uploads", &[20, 20, 20]);
    batch.extend(timed_jobs("thumbs", &[20; 6]));
    dispatcher.enqueue(batch).unwrap();

    let mut rx = dispatcher.subscribe();
    dispatcher.start().unwrap();
    collect_until_empty(&mut rx).await;

    assert_eq!(uploads.peak.load(Ordering::SeqCst), 1);
    assert!(thumbs.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(thumbs.finished.lock().unwrap().len(), 6);
    assert_eq!(uploads.finished.lock().unwrap().len(), 3);

    let rows = dispatcher.snapshot();
    assert!(rows.iter().all(|row| row.active == 0 && row.pending == 0));

    dispatcher.end().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failures_do_not_stop_the_run() {
    let dispatcher = Dispatcher::from_config(
        DispatcherConfig::default()
            .with_tick_interval(TICK)
            .with_limits(LimitConfig::single(3)),
    )
    .unwrap();
    let failing = MockHandler::new_fail("corrupt input");
    let panicking = MockHandler::new(MockBehavior::Panic("bad state".to_string()));
    let echo = MockHandler::new(MockBehavior::Echo);
    dispatcher
        .configure(
            HandlerRegistry::new()
                .with("fail", failing.clone())
                .with("panic", panicking.clone())
                .with("echo", echo.clone()),
            None,
        )
        .unwrap();
    dispatcher
        .enqueue_json(json!([
            { "category": "fail", "payload": 1 },
            { "category": "panic", "payload": 2 },
            { "name": "echo", "data": 3 },
            { "category": "unregistered", "payload": 4 },
            { "category": "echo", "payload": null },
        ]))
        .unwrap();

    let mut rx = dispatcher.subscribe();
    dispatcher.start().unwrap();
    let events = collect_until_empty(&mut rx).await;

    let mut errors: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            DispatchEvent::JobError { category, .. } => Some(category.to_string()),
            _ => None,
        })
        .collect();
    errors.sort();
    assert_eq!(errors, vec!["fail", "panic", "unregistered"]);

    // A null echo result produces no completion event
    let results: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            DispatchEvent::JobCompleted { result, .. } => Some(result.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(results, vec![json!(3)]);
    assert_eq!(echo.call_count(), 2);
    assert_eq!(dispatcher.active_count(), 0);

    dispatcher.end().await;
}

#[tokio::test]
async fn test_empty_queue_fires_again_for_a_new_wave() {
    let dispatcher = Dispatcher::from_config(
        DispatcherConfig::default()
            .with_tick_interval(TICK)
            .with_limits(LimitConfig::single(4)),
    )
    .unwrap();
    let handler = MockHandler::new(MockBehavior::NoResult);
    dispatcher
        .configure(HandlerRegistry::new().with("job", handler.clone()), None)
        .unwrap();
    let mut rx = dispatcher.subscribe();
    dispatcher.start().unwrap();

    for wave in 1..=2 {
        dispatcher
            .enqueue(vec![JobRequest::new("job", json!(wave)); 3])
            .unwrap();
        let events = collect_until_empty(&mut rx).await;
        assert!(matches!(events.last(), Some(DispatchEvent::EmptyQueue)));
    }
    assert_eq!(handler.call_count(), 6);

    dispatcher.end().await;
}
