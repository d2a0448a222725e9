//! Demo handlers wired in by the binary

use admitq_core::{handler_fn, HandlerRegistry, HandlerResult, JobPayload};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Categories served by [`registry`]
pub const CATEGORIES: [&str; 3] = ["sleep", "echo", "fail"];

pub fn registry() -> HandlerRegistry {
    HandlerRegistry::new()
        .with("sleep", Arc::new(handler_fn(|payload, _| sleep(payload))))
        .with("echo", Arc::new(handler_fn(|payload, _| echo(payload))))
        .with("fail", Arc::new(handler_fn(|payload, _| fail(payload))))
}

/// `{"ms": 250}` sleeps that long and reports it
async fn sleep(payload: JobPayload) -> HandlerResult {
    let ms = payload
        .as_value()
        .get("ms")
        .and_then(Value::as_u64)
        .ok_or("sleep job needs an integer \"ms\" field")?;
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(Some(json!({ "slept_ms": ms })))
}

async fn echo(payload: JobPayload) -> HandlerResult {
    Ok(Some(payload.into_value()))
}

async fn fail(payload: JobPayload) -> HandlerResult {
    let reason = payload
        .as_value()
        .as_str()
        .unwrap_or("requested failure")
        .to_string();
    Err(reason.into())
}

/// Batch used when no job file is given
pub fn demo_batch() -> Value {
    json!([
        { "category": "sleep", "payload": { "ms": 300 } },
        { "category": "sleep", "payload": { "ms": 100 } },
        { "category": "echo", "payload": { "hello": "world" } },
        { "category": "sleep", "payload": { "ms": 200 } },
        { "category": "fail", "payload": "demo failure" },
        { "category": "echo", "payload": [1, 2, 3] },
    ])
}
