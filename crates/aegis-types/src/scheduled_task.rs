//! ScheduledTask entity owned exclusively by the scheduler registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered periodic maintenance/escalation task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Unique id; at most one registered task per id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Cron expression governing when the task fires.
    pub cron_expression: String,
    /// Whether the task currently runs on schedule.
    pub enabled: bool,
    /// Last time the handler completed (successfully or not).
    pub last_run: Option<DateTime<Utc>>,
    /// Next time the handler is scheduled to run.
    pub next_run: Option<DateTime<Utc>>,
    /// Total number of completed runs.
    pub run_count: u64,
    /// Total number of runs that returned an error.
    pub error_count: u64,
}

impl ScheduledTask {
    /// Construct a new, enabled task with zeroed counters.
    pub fn new(id: impl Into<String>, name: impl Into<String>, cron_expression: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cron_expression: cron_expression.into(),
            enabled: true,
            last_run: None,
            next_run: None,
            run_count: 0,
            error_count: 0,
        }
    }
}
