// Admitq Core - Admission queues, handler ports and the dispatcher
// No I/O beyond the Tokio runtime: embedders supply handlers and config

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{
    DispatchEvent, Dispatcher, DispatcherConfig, EventListener, HandlerRegistry, LifecycleState,
};
pub use domain::{Category, JobPayload, JobRequest, LimitConfig};
pub use error::{AppError, Result};
pub use port::{handler_fn, HandlerError, HandlerResult, JobHandler};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
