// Application Layer - Dispatcher use cases

pub mod dispatcher;

// Re-exports
pub use dispatcher::{
    DispatchEvent, Dispatcher, DispatcherConfig, EventListener, HandlerRegistry, LifecycleState,
};
