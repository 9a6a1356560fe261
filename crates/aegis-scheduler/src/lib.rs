//! Cron-driven registry of periodic maintenance and escalation tasks.
//!
//! A single lock-guarded task map driven by a ticking loop; handlers are
//! registered against a trait so callers can plug in arbitrary behavior
//! instead of a fixed set of built-in kinds.

pub mod error;
pub mod handlers;
pub mod scheduler;

pub use error::{Error, Result};
pub use handlers::{
    AlertCleanupHandler, ClosureHandler, EscalationProcessorHandler, HealthCheckHandler,
    MetricsCollectionHandler, NotificationCleanupHandler, TaskHandler,
};
pub use scheduler::{Scheduler, TaskStats};
