//! Microsoft Teams incoming-webhook adapter (legacy `MessageCard` format).

use super::{priority_color, ChannelAdapter};
use crate::error::Result;
use crate::templates::Rendered;
use aegis_types::{Channel, Error, Notification};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Posts a `MessageCard` payload to a Teams incoming webhook.
pub struct TeamsAdapter {
    client: Client,
}

impl TeamsAdapter {
    /// Construct an adapter with the given per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

#[async_trait]
impl ChannelAdapter for TeamsAdapter {
    fn channel(&self) -> Channel {
        Channel::Teams
    }

    async fn deliver(&self, notification: &Notification, rendered: &Rendered) -> Result<Option<String>> {
        let (subject, body) = match rendered {
            Rendered::Structured { subject, body } => (subject.clone(), body.clone()),
            Rendered::Text(text) => (notification.subject.clone(), text.clone()),
            Rendered::Email { text, .. } => (notification.subject.clone(), text.clone()),
        };

        let color = priority_color(notification.priority);
        let payload = json!({
            "@type": "MessageCard",
            "@context": "http://schema.org/extensions",
            "themeColor": color,
            "summary": subject,
            "sections": [{
                "activityTitle": subject,
                "activitySubtitle": format!("{:?} priority", notification.priority),
                "text": body,
                "facts": [
                    {"name": "Channel", "value": "teams"},
                    {"name": "Priority", "value": format!("{:?}", notification.priority)},
                ],
            }],
        });

        let response = self
            .client
            .post(&notification.recipient)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Transient(e.to_string()))?;

        if response.status().is_success() {
            Ok(None)
        } else {
            Err(Error::Transient(format!("teams webhook returned {}", response.status())).into())
        }
    }
}
