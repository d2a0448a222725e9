// Port Layer - Interfaces the dispatcher is written against

pub mod admission_queue;
pub mod job_handler;

// Re-exports
pub use admission_queue::AdmissionQueue;
pub use job_handler::{
    handler_fn, FnHandler, HandlerError, HandlerResult, JobFailure, JobHandler,
};
