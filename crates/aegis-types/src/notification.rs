//! Notification entity and the wire-facing channel enumeration.

use crate::json::JsonValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery channel for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Email, delivered via whichever vendor is configured.
    Email,
    /// SMS text message.
    Sms,
    /// Slack-style chat webhook.
    Slack,
    /// Microsoft Teams-style chat webhook.
    Teams,
    /// Generic JSON webhook.
    Webhook,
    /// Paging/on-call system (PagerDuty-style).
    Pagerduty,
}

impl Channel {
    /// Lowercase wire name, used for template lookup (`<channel>-default`).
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Slack => "slack",
            Channel::Teams => "teams",
            Channel::Webhook => "webhook",
            Channel::Pagerduty => "pagerduty",
        }
    }
}

/// Priority used both for notification ordering and color mapping on chat
/// and paging payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Routine notice.
    Low,
    /// Normal priority.
    Medium,
    /// Should be seen promptly.
    High,
    /// Requires immediate attention.
    Critical,
}

/// Lifecycle status of a notification. Terminal states are `Sent`/`Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Queued, not yet attempted.
    Pending,
    /// Dispatch in progress.
    Sending,
    /// Delivered successfully.
    Sent,
    /// Exhausted retries, or failed terminally.
    Failed,
}

/// A notification to be delivered through exactly one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique id.
    pub id: String,
    /// Id of the alert this notification concerns, if any.
    pub alert_id: Option<String>,
    /// Id of the rule that triggered this notification, if any.
    pub rule_id: Option<String>,
    /// Delivery channel.
    pub channel: Channel,
    /// Recipient address, number, or webhook identifier.
    pub recipient: String,
    /// Subject line (used by channels that have one).
    pub subject: String,
    /// Rendered message body (before per-channel templating).
    pub message: String,
    /// Priority, used for color mapping and ordering.
    pub priority: NotificationPriority,
    /// Current lifecycle status.
    pub status: NotificationStatus,
    /// Number of delivery attempts so far, bounded by `max_retries`.
    pub retry_count: u32,
    /// Maximum number of retries before the notification fails terminally.
    pub max_retries: u32,
    /// Template id, if the caller requested a specific one.
    pub template_id: Option<String>,
    /// Structured data fed into template rendering.
    pub template_data: JsonValue,
    /// Id assigned by the delivering vendor, once known.
    pub external_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last error recorded against this notification, if any.
    pub last_error: Option<String>,
}

impl Notification {
    /// Template lookup key: prefers `<template_id>-<channel>`, then falls
    /// back to `<channel>-default`.
    pub fn template_lookup_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(2);
        if let Some(template_id) = &self.template_id {
            keys.push(format!("{template_id}-{}", self.channel.as_str()));
        }
        keys.push(format!("{}-default", self.channel.as_str()));
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification() -> Notification {
        Notification {
            id: "n1".into(),
            alert_id: Some("a1".into()),
            rule_id: None,
            channel: Channel::Slack,
            recipient: "#alerts".into(),
            subject: "subject".into(),
            message: "body".into(),
            priority: NotificationPriority::High,
            status: NotificationStatus::Pending,
            retry_count: 0,
            max_retries: 3,
            template_id: None,
            template_data: JsonValue::empty_object(),
            external_id: None,
            created_at: Utc::now(),
            last_error: None,
        }
    }

    #[test]
    fn template_lookup_falls_back_to_channel_default() {
        let n = notification();
        assert_eq!(n.template_lookup_keys(), vec!["slack-default".to_string()]);
    }

    #[test]
    fn template_lookup_prefers_named_template() {
        let mut n = notification();
        n.template_id = Some("escalation".into());
        assert_eq!(
            n.template_lookup_keys(),
            vec!["escalation-slack".to_string(), "slack-default".to_string()]
        );
    }
}
