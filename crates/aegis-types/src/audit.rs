//! Audit trail entity emitted by the escalation processor and compliance
//! evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single audit-trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique id.
    pub id: String,
    /// Actor responsible for the action (`"scheduler"`, a user id, …).
    pub actor: String,
    /// What happened (`"alert_escalated"`, `"compliance_finding"`, …).
    pub action: String,
    /// Primary entity the action concerns.
    pub entity_id: String,
    /// Rule that produced this event, if any.
    pub rule_id: Option<String>,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
}
