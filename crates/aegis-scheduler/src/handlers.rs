//! Task handler contract and the default maintenance/escalation handlers.
//!
//! The upstream design dispatches to handlers through an interface keyed by
//! task id. Per the re-architecture guidance (spec.md §9) this becomes a
//! small trait plus constructor-registered implementations keyed by id —
//! a name -> execute mapping, nothing more.

use aegis_repositories::{AlertFilter, AlertRepository, AuditRepository, NotificationRepository};
use aegis_types::{AlertStatus, AuditEvent, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Executed by the scheduler on a task's cron trigger, or directly via
/// `execute_now`. Implementations must not panic: the scheduler treats a
/// panic as an internal failure and records it as an error-counted run,
/// but handlers are expected to record their own errors and return `Err`
/// instead.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Run the handler once.
    async fn execute(&self) -> Result<()>;
}

/// A [`TaskHandler`] built from an async closure, for simple cases that
/// don't warrant a dedicated type.
pub struct ClosureHandler<F>
where
    F: Fn() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync,
{
    closure: F,
}

impl<F> ClosureHandler<F>
where
    F: Fn() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync,
{
    /// Wrap `closure` as a [`TaskHandler`].
    pub fn new(closure: F) -> Self {
        Self { closure }
    }
}

#[async_trait]
impl<F> TaskHandler for ClosureHandler<F>
where
    F: Fn() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync,
{
    async fn execute(&self) -> Result<()> {
        (self.closure)().await
    }
}

/// Deletes alerts in a terminal status older than `retention`.
pub struct AlertCleanupHandler {
    repo: Arc<dyn AlertRepository>,
    retention: Duration,
}

impl AlertCleanupHandler {
    /// Construct a handler that deletes terminal alerts older than
    /// `retention`.
    pub fn new(repo: Arc<dyn AlertRepository>, retention: Duration) -> Self {
        Self { repo, retention }
    }
}

#[async_trait]
impl TaskHandler for AlertCleanupHandler {
    async fn execute(&self) -> Result<()> {
        let cutoff = Utc::now() - self.retention;
        let filter = AlertFilter {
            created_before: Some(cutoff),
            ..Default::default()
        };
        let stale: Vec<_> = self
            .repo
            .list(&filter)
            .await?
            .into_iter()
            .filter(|a| matches!(a.status, AlertStatus::Resolved | AlertStatus::Closed))
            .collect();
        for alert in &stale {
            self.repo.delete(&alert.id).await?;
        }
        info!(count = stale.len(), "alert cleanup removed stale terminal alerts");
        Ok(())
    }
}

/// Deletes notifications in a terminal status older than `retention`.
pub struct NotificationCleanupHandler {
    repo: Arc<dyn NotificationRepository>,
    retention: Duration,
}

impl NotificationCleanupHandler {
    /// Construct a handler that deletes terminal notifications older than
    /// `retention`.
    pub fn new(repo: Arc<dyn NotificationRepository>, retention: Duration) -> Self {
        Self { repo, retention }
    }
}

#[async_trait]
impl TaskHandler for NotificationCleanupHandler {
    async fn execute(&self) -> Result<()> {
        let cutoff = Utc::now() - self.retention;
        let removed = self.repo.delete_terminal_before(cutoff).await?;
        info!(removed, "notification cleanup removed stale terminal notifications");
        Ok(())
    }
}

/// Records a liveness marker. In this reference implementation that is
/// just a log line; a real deployment would ping dependency health
/// endpoints here.
pub struct HealthCheckHandler {
    started_at: DateTime<Utc>,
}

impl HealthCheckHandler {
    /// Construct a handler that reports uptime since `started_at`.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self { started_at }
    }
}

#[async_trait]
impl TaskHandler for HealthCheckHandler {
    async fn execute(&self) -> Result<()> {
        let uptime = Utc::now() - self.started_at;
        info!(uptime_secs = uptime.num_seconds(), "health check ok");
        Ok(())
    }
}

/// Bumps the escalation level of active, unacknowledged alerts that carry
/// an escalation policy and have sat longer than `escalation_window`.
pub struct EscalationProcessorHandler {
    alerts: Arc<dyn AlertRepository>,
    audit: Arc<dyn AuditRepository>,
    escalation_window: Duration,
}

impl EscalationProcessorHandler {
    /// Construct a handler using `escalation_window` as the staleness
    /// threshold for unacknowledged alerts.
    pub fn new(
        alerts: Arc<dyn AlertRepository>,
        audit: Arc<dyn AuditRepository>,
        escalation_window: Duration,
    ) -> Self {
        Self {
            alerts,
            audit,
            escalation_window,
        }
    }
}

#[async_trait]
impl TaskHandler for EscalationProcessorHandler {
    async fn execute(&self) -> Result<()> {
        let cutoff = Utc::now() - self.escalation_window;
        let filter = AlertFilter {
            status: Some(AlertStatus::Active),
            has_escalation_policy: Some(true),
            unacknowledged_only: true,
            created_before: Some(cutoff),
            ..Default::default()
        };
        let candidates = self.alerts.list(&filter).await?;
        for mut alert in candidates {
            alert.escalation_level += 1;
            alert.updated_at = Utc::now();
            let alert_id = alert.id.clone();
            self.alerts.save(alert).await?;
            self.audit
                .record(AuditEvent {
                    id: Uuid::new_v4().to_string(),
                    actor: "escalation-processor".to_string(),
                    action: "alert_escalated".to_string(),
                    entity_id: alert_id.clone(),
                    rule_id: None,
                    timestamp: Utc::now(),
                })
                .await?;
            warn!(alert_id, "alert escalated");
        }
        Ok(())
    }
}

/// Collects lightweight platform metrics. In this reference implementation
/// that means logging repository sizes; a real deployment would push to a
/// metrics backend here.
pub struct MetricsCollectionHandler {
    alerts: Arc<dyn AlertRepository>,
    notifications: Arc<dyn NotificationRepository>,
}

impl MetricsCollectionHandler {
    /// Construct a handler that snapshots alert/notification counts.
    pub fn new(alerts: Arc<dyn AlertRepository>, notifications: Arc<dyn NotificationRepository>) -> Self {
        Self {
            alerts,
            notifications,
        }
    }
}

#[async_trait]
impl TaskHandler for MetricsCollectionHandler {
    async fn execute(&self) -> Result<()> {
        let active_alerts = self
            .alerts
            .list(&AlertFilter {
                status: Some(AlertStatus::Active),
                ..Default::default()
            })
            .await?
            .len();
        let pending_notifications = self
            .notifications
            .list(&Default::default())
            .await?
            .iter()
            .filter(|n| n.status == aegis_types::NotificationStatus::Pending)
            .count();
        info!(active_alerts, pending_notifications, "metrics collection snapshot");
        Ok(())
    }
}
