//! Generic JSON webhook adapter: POST JSON with standard headers, treat
//! any 2xx status as success.

use super::ChannelAdapter;
use crate::error::Result;
use crate::templates::Rendered;
use aegis_types::{Channel, Error, Notification};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Posts `{event, notification_id, subject, body}` as a generic webhook.
pub struct WebhookAdapter {
    client: Client,
    auth_header: Option<String>,
    auth_token: Option<String>,
}

impl WebhookAdapter {
    /// Construct an adapter with the given per-request timeout and optional
    /// auth header/token pair appended to every request.
    pub fn new(timeout: Duration, auth_header: Option<String>, auth_token: Option<String>) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|_| Client::new());
        Self {
            client,
            auth_header,
            auth_token,
        }
    }
}

#[async_trait]
impl ChannelAdapter for WebhookAdapter {
    fn channel(&self) -> Channel {
        Channel::Webhook
    }

    async fn deliver(&self, notification: &Notification, rendered: &Rendered) -> Result<Option<String>> {
        let (subject, body) = match rendered {
            Rendered::Structured { subject, body } => (subject.clone(), body.clone()),
            Rendered::Text(text) => (notification.subject.clone(), text.clone()),
            Rendered::Email { text, .. } => (notification.subject.clone(), text.clone()),
        };

        let payload = json!({
            "event": "notification",
            "notification_id": notification.id,
            "subject": subject,
            "body": body,
        });

        let mut request = self
            .client
            .post(&notification.recipient)
            .header("Content-Type", "application/json")
            .header("User-Agent", format!("AegisShield/{}", env!("CARGO_PKG_VERSION")))
            .json(&payload);

        if let (Some(header), Some(token)) = (&self.auth_header, &self.auth_token) {
            request = request.header(header, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transient(e.to_string()))?;

        if response.status().is_success() {
            Ok(None)
        } else {
            Err(Error::Transient(format!("webhook returned {}", response.status())).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::Rendered;
    use aegis_types::{JsonValue, NotificationPriority, NotificationStatus};
    use chrono::Utc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification(recipient: String) -> Notification {
        Notification {
            id: "n-1".to_string(),
            alert_id: None,
            rule_id: None,
            channel: Channel::Webhook,
            recipient,
            subject: "s".into(),
            message: "m".into(),
            priority: NotificationPriority::High,
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
    async fn success_response_is_treated_as_delivered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let adapter = WebhookAdapter::new(Duration::from_secs(5), None, None);
        let result = adapter
            .deliver(
                &notification(format!("{}/hook", server.uri())),
                &Rendered::Text("body".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn non_2xx_status_is_a_transient_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let adapter = WebhookAdapter::new(Duration::from_secs(5), None, None);
        let err = adapter
            .deliver(
                &notification(server.uri()),
                &Rendered::Text("body".to_string()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::Types(aegis_types::Error::Transient(_))));
    }

    #[tokio::test]
    async fn auth_header_is_attached_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-Auth-Token", "secret"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let adapter = WebhookAdapter::new(
            Duration::from_secs(5),
            Some("X-Auth-Token".to_string()),
            Some("secret".to_string()),
        );
        adapter
            .deliver(
                &notification(server.uri()),
                &Rendered::Text("body".to_string()),
            )
            .await
            .unwrap();
    }
}
