// Enqueue validation

use crate::domain::{JobRecord, JobRequest};
use crate::error::{AppError, Result};

/// Validate a batch, all-or-nothing.
///
/// Each request needs a non-empty category and a payload. The first
/// offending index is reported and no record is produced.
pub fn validate_batch(requests: Vec<JobRequest>) -> Result<Vec<JobRecord>> {
    requests
        .into_iter()
        .enumerate()
        .map(|(index, req)| validate_request(index, req))
        .collect()
}

/// Validate one request at `index` of its batch
pub fn validate_request(index: usize, req: JobRequest) -> Result<JobRecord> {
    let category = req.category.ok_or(AppError::MissingField {
        index,
        field: "category",
    })?;
    if category.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "category is empty in job at index {index}"
        )));
    }
    let payload = req.payload.ok_or(AppError::MissingField {
        index,
        field: "payload",
    })?;
    Ok(JobRecord::new(category, payload))
}

/// Parse an untyped batch (a JSON array of job objects)
pub fn parse_batch(value: serde_json::Value) -> Result<Vec<JobRequest>> {
    let serde_json::Value::Array(items) = value else {
        return Err(AppError::Validation(
            "Array of jobs should be enqueued".to_string(),
        ));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| {
                AppError::Validation(format!("job at index {index} is malformed: {e}"))
            })
        })
        .collect()
}
