//! Scheduler integration: drains pending notifications on a cron tick, for
//! callers that run delivery purely off the scheduler instead of (or in
//! addition to) [`crate::manager::NotificationManager::start`]'s workers.

use crate::manager::NotificationManager;
use aegis_scheduler::TaskHandler;
use aegis_types::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Drains up to `batch_size` pending notifications per run.
pub struct PendingNotificationsDrainHandler {
    manager: Arc<NotificationManager>,
    batch_size: usize,
}

impl PendingNotificationsDrainHandler {
    /// Construct a handler draining up to `batch_size` notifications per
    /// scheduled run.
    pub fn new(manager: Arc<NotificationManager>, batch_size: usize) -> Self {
        Self { manager, batch_size }
    }
}

#[async_trait]
impl TaskHandler for PendingNotificationsDrainHandler {
    async fn execute(&self) -> Result<()> {
        let attempted = self
            .manager
            .process_pending(self.batch_size)
            .await
            .map_err(|e| Error::Fatal(e.to_string()))?;
        if attempted > 0 {
            info!(attempted, "pending notifications drain processed a batch");
        }
        Ok(())
    }
}
