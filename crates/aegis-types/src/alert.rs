//! Alert entity: a durable record produced when a rule or model flags an
//! entity, transaction, or pattern.

use crate::json::JsonValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an alert, independent of its processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Informational, no action required.
    Low,
    /// Worth a look during normal triage.
    Medium,
    /// Should be triaged ahead of the normal queue.
    High,
    /// Requires immediate attention.
    Critical,
}

/// Lifecycle status of an alert. Transitions are monotonic forward except an
/// explicit reopen (`Closed`/`Resolved` -> `Active`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    /// Newly raised, not yet being worked.
    Active,
    /// Currently being evaluated (e.g. awaiting a sub-analysis).
    Processing,
    /// A human has acknowledged the alert.
    Acknowledged,
    /// Investigation concluded, no further action.
    Resolved,
    /// Closed out administratively.
    Closed,
    /// Bumped to a higher urgency tier by the escalation processor.
    Escalated,
}

impl AlertStatus {
    /// Rank used to enforce monotonic forward transitions. Reopening to
    /// `Active` is the one explicit exception callers must request directly.
    fn rank(self) -> u8 {
        match self {
            AlertStatus::Active => 0,
            AlertStatus::Processing => 1,
            AlertStatus::Acknowledged => 2,
            AlertStatus::Escalated => 3,
            AlertStatus::Resolved => 4,
            AlertStatus::Closed => 5,
        }
    }

    /// Whether moving from `self` to `next` is a legal forward transition,
    /// or an explicit reopen back to `Active`.
    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        next == AlertStatus::Active || next.rank() >= self.rank()
    }
}

/// A durable alert record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique id.
    pub id: String,
    /// Short human-readable title.
    pub title: String,
    /// Longer description of what was flagged and why.
    pub description: String,
    /// Severity independent of status.
    pub severity: AlertSeverity,
    /// Operator-assigned triage priority, 1 (highest) upward.
    pub priority: u32,
    /// Current lifecycle status.
    pub status: AlertStatus,
    /// Subsystem or rule id that raised the alert.
    pub source: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-modified timestamp.
    pub updated_at: DateTime<Utc>,
    /// Set exactly when `status >= Acknowledged`.
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Set when status reaches a terminal resolution.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Current escalation level, bumped by the escalation processor.
    pub escalation_level: u32,
    /// Id of the escalation policy governing this alert, if any.
    pub escalation_policy_id: Option<String>,
    /// Actor that created the alert.
    pub created_by: String,
    /// Actor that last updated the alert.
    pub updated_by: String,
    /// Free-form metadata, preserved round-trip.
    pub metadata: JsonValue,
}

impl Alert {
    /// Apply a status transition, enforcing the monotonic-forward invariant
    /// and keeping `acknowledged_at`/`resolved_at` consistent with it.
    pub fn transition_to(&mut self, next: AlertStatus, now: DateTime<Utc>) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "illegal alert transition {:?} -> {:?}",
                self.status, next
            ));
        }
        self.status = next;
        self.updated_at = now;
        match next {
            AlertStatus::Acknowledged | AlertStatus::Resolved | AlertStatus::Closed | AlertStatus::Escalated => {
                if self.acknowledged_at.is_none() {
                    self.acknowledged_at = Some(now);
                }
            }
            AlertStatus::Active | AlertStatus::Processing => {
                self.acknowledged_at = None;
            }
        }
        if matches!(next, AlertStatus::Resolved | AlertStatus::Closed) {
            self.resolved_at = Some(now);
        } else if next == AlertStatus::Active {
            self.resolved_at = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_alert() -> Alert {
        let now = Utc::now();
        Alert {
            id: "a1".into(),
            title: "t".into(),
            description: "d".into(),
            severity: AlertSeverity::High,
            priority: 1,
            status: AlertStatus::Active,
            source: "rule-engine".into(),
            created_at: now,
            updated_at: now,
            acknowledged_at: None,
            resolved_at: None,
            escalation_level: 0,
            escalation_policy_id: None,
            created_by: "system".into(),
            updated_by: "system".into(),
            metadata: JsonValue::empty_object(),
        }
    }

    #[test]
    fn forward_transitions_set_acknowledged_at() {
        let mut alert = base_alert();
        alert.transition_to(AlertStatus::Acknowledged, Utc::now()).unwrap();
        assert!(alert.acknowledged_at.is_some());
        assert_eq!(alert.status, AlertStatus::Acknowledged);
    }

    #[test]
    fn backward_transition_is_rejected_except_reopen() {
        let mut alert = base_alert();
        alert.transition_to(AlertStatus::Resolved, Utc::now()).unwrap();
        assert!(alert.transition_to(AlertStatus::Processing, Utc::now()).is_err());
        assert!(alert.transition_to(AlertStatus::Active, Utc::now()).is_ok());
        assert!(alert.acknowledged_at.is_none());
        assert!(alert.resolved_at.is_none());
    }
}
