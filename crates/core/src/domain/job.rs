// Job Domain Model

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Job category: names the handler and the concurrency ceiling a job uses
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Job Payload (opaque to the dispatcher, handed to the handler as-is)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobPayload(serde_json::Value);

impl JobPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for JobPayload {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// A validated job: owned by the queue until admitted, then by its handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub category: Category,
    pub payload: JobPayload,
}

impl JobRecord {
    pub fn new(category: impl Into<Category>, payload: impl Into<JobPayload>) -> Self {
        Self {
            category: category.into(),
            payload: payload.into(),
        }
    }
}

/// Enqueue request as submitted by a caller.
///
/// Both fields are optional so a malformed batch can be reported with the
/// index and name of the missing field instead of failing deserialization.
/// `name`/`data` are accepted as aliases of `category`/`payload`.
/// A `payload` that is present but `null` counts as present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default, alias = "name")]
    pub category: Option<String>,

    #[serde(default, alias = "data", deserialize_with = "present_value")]
    pub payload: Option<serde_json::Value>,
}

impl JobRequest {
    pub fn new(category: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            category: Some(category.into()),
            payload: Some(payload),
        }
    }
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}
