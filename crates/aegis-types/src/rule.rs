//! Rule entity: declarative conditions + actions evaluated against events or
//! on a schedule.

use crate::json::JsonValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of what a rule is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Evaluated against incoming transactions.
    TransactionMonitoring,
    /// Evaluated against detected graph patterns.
    PatternDetection,
    /// Evaluated for regulatory compliance purposes.
    Compliance,
    /// Evaluated for platform health/maintenance concerns.
    Health,
}

/// Comparison operator used by a [`RuleCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// `field == value`
    Equals,
    /// `field != value`
    NotEquals,
    /// `field > value` (numeric)
    GreaterThan,
    /// `field >= value` (numeric)
    GreaterThanOrEqual,
    /// `field < value` (numeric)
    LessThan,
    /// `field <= value` (numeric)
    LessThanOrEqual,
    /// substring match (string)
    Contains,
    /// membership in a comma-free array value
    In,
}

/// A single condition clause: `field operator value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCondition {
    /// Dotted path into the evaluated event/entity's property map.
    pub field: String,
    /// Comparison operator.
    pub operator: ConditionOperator,
    /// Value to compare the field against.
    pub value: JsonValue,
}

/// An action a rule performs when all of its conditions are satisfied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    /// Create a new alert with the given severity and title template.
    CreateAlert {
        /// Alert severity to assign.
        severity: crate::alert::AlertSeverity,
        /// Title template, may reference `{field}` placeholders.
        title_template: String,
    },
    /// Flag the subject entity with a tag.
    FlagEntity {
        /// Tag to apply to the entity.
        tag: String,
    },
    /// Escalate any alert already associated with the subject.
    Escalate {
        /// Escalation policy id to apply.
        policy_id: String,
    },
    /// Send a notification through the given channel.
    Notify {
        /// Notification channel identifier.
        channel: String,
        /// Recipient address/identifier for that channel.
        recipient: String,
    },
}

/// A versioned, schedulable rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What the rule is evaluated against.
    pub rule_type: RuleType,
    /// Severity assigned to findings that don't specify their own.
    pub severity: crate::alert::AlertSeverity,
    /// Whether the rule is currently active.
    pub enabled: bool,
    /// Optional cron schedule (for periodically-evaluated rules).
    pub schedule: Option<String>,
    /// Ordered conditions; all must match for the rule to fire.
    pub conditions: Vec<RuleCondition>,
    /// Ordered actions performed when the rule fires.
    pub actions: Vec<RuleAction>,
    /// Monotonically increasing version, bumped on every edit.
    pub version: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-modified timestamp.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_serializes_round_trip() {
        let rule = Rule {
            id: "r1".into(),
            name: "large cash deposit".into(),
            rule_type: RuleType::TransactionMonitoring,
            severity: crate::alert::AlertSeverity::High,
            enabled: true,
            schedule: None,
            conditions: vec![RuleCondition {
                field: "amount".into(),
                operator: ConditionOperator::GreaterThanOrEqual,
                value: JsonValue::from(10000.0),
            }],
            actions: vec![RuleAction::CreateAlert {
                severity: crate::alert::AlertSeverity::High,
                title_template: "Large deposit: {amount}".into(),
            }],
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&rule).unwrap();
        let back: Rule = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "r1");
        assert_eq!(back.conditions.len(), 1);
    }
}
