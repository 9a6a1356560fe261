//! PagerDuty Events API v2 adapter.

use super::{priority_severity, ChannelAdapter};
use crate::error::Result;
use crate::templates::Rendered;
use aegis_types::{Channel, Error, Notification};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    dedup_key: Option<String>,
}

/// Triggers an incident through PagerDuty's Events API v2.
pub struct PagerdutyAdapter {
    client: Client,
    events_api_url: String,
    routing_key: String,
}

impl PagerdutyAdapter {
    /// Construct an adapter with the given per-request timeout and
    /// integration routing key.
    pub fn new(timeout: Duration, events_api_url: impl Into<String>, routing_key: impl Into<String>) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|_| Client::new());
        Self {
            client,
            events_api_url: events_api_url.into(),
            routing_key: routing_key.into(),
        }
    }
}

#[async_trait]
impl ChannelAdapter for PagerdutyAdapter {
    fn channel(&self) -> Channel {
        Channel::Pagerduty
    }

    async fn deliver(&self, notification: &Notification, rendered: &Rendered) -> Result<Option<String>> {
        let (subject, body) = match rendered {
            Rendered::Structured { subject, body } => (subject.clone(), body.clone()),
            Rendered::Text(text) => (notification.subject.clone(), text.clone()),
            Rendered::Email { text, .. } => (notification.subject.clone(), text.clone()),
        };

        let payload = json!({
            "routing_key": self.routing_key,
            "event_action": "trigger",
            "dedup_key": notification.alert_id,
            "payload": {
                "summary": subject,
                "source": "aegis-shieldd",
                "severity": priority_severity(notification.priority),
                "timestamp": notification.created_at.to_rfc3339(),
                "component": "alerting-engine",
                "group": "aegisshield",
                "class": "fincrime-alert",
                "custom_details": {
                    "body": body,
                    "notification_id": notification.id,
                },
            },
        });

        let response = self
            .client
            .post(&self.events_api_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Transient(e.to_string()))?;

        if response.status().as_u16() != 202 {
            return Err(Error::Transient(format!("pagerduty events API returned {}", response.status())).into());
        }

        let parsed: EventsResponse = response.json().await.unwrap_or(EventsResponse { dedup_key: None });
        Ok(parsed.dedup_key)
    }
}
