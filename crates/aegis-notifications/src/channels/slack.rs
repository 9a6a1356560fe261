//! Slack-style chat webhook adapter.

use super::ChannelAdapter;
use crate::error::Result;
use crate::templates::Rendered;
use aegis_types::{Channel, Error, Notification};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Posts a block-kit message to a Slack-compatible incoming webhook.
pub struct SlackAdapter {
    client: Client,
}

impl SlackAdapter {
    /// Construct an adapter with the given per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

#[async_trait]
impl ChannelAdapter for SlackAdapter {
    fn channel(&self) -> Channel {
        Channel::Slack
    }

    async fn deliver(&self, notification: &Notification, rendered: &Rendered) -> Result<Option<String>> {
        let (subject, body) = match rendered {
            Rendered::Structured { subject, body } => (subject.clone(), body.clone()),
            Rendered::Text(text) => (notification.subject.clone(), text.clone()),
            Rendered::Email { text, .. } => (notification.subject.clone(), text.clone()),
        };

        let payload = json!({
            "channel": notification.recipient,
            "text": format!("{subject}\n{body}"),
            "blocks": [
                {"type": "section", "text": {"type": "mrkdwn", "text": format!("*{subject}*\n{body}")}},
                {"type": "divider"},
                {"type": "section", "fields": [
                    {"type": "mrkdwn", "text": format!("*Priority:*\n{:?}", notification.priority)},
                ]},
            ],
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
            Err(Error::Transient(format!("slack webhook returned {}", response.status())).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::Rendered;
    use aegis_types::{JsonValue, NotificationPriority, NotificationStatus};
    use chrono::Utc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification(recipient: String) -> Notification {
        Notification {
            id: "n-1".to_string(),
            alert_id: None,
            rule_id: None,
            channel: Channel::Slack,
            recipient,
            subject: "s".into(),
            message: "m".into(),
            priority: NotificationPriority::Low,
            status: NotificationStatus::Sending,
            retry_count: 0,
            max_retries: 3,
            template_id: None,
            template_data: JsonValue::empty_object(),
            external_id: None,
            created_at: Utc::now(),
            last_error: None,
        }
    }

    #[tokio::test]
    async fn success_response_returns_no_external_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let adapter = SlackAdapter::new(Duration::from_secs(5));
        let result = adapter
            .deliver(
                &notification(server.uri()),
                &Rendered::Text("body".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn failure_status_is_transient_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let adapter = SlackAdapter::new(Duration::from_secs(5));
        let err = adapter
            .deliver(
                &notification(server.uri()),
                &Rendered::Text("body".to_string()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::Types(aegis_types::Error::Transient(_))));
    }
}
