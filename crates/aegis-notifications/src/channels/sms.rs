//! SMS channel adapter.

use super::ChannelAdapter;
use crate::error::Result;
use crate::templates::Rendered;
use aegis_types::{Channel, Error, Notification};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    message_id: Option<String>,
}

/// Posts a short text message to an SMS vendor's send-message API.
pub struct SmsAdapter {
    client: Client,
    api_base_url: String,
    api_key: String,
    from_number: String,
}

impl SmsAdapter {
    /// Construct an adapter with the given per-request timeout and vendor
    /// credentials.
    pub fn new(timeout: Duration, api_base_url: impl Into<String>, api_key: impl Into<String>, from_number: impl Into<String>) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_base_url: api_base_url.into(),
            api_key: api_key.into(),
            from_number: from_number.into(),
        }
    }
}

#[async_trait]
impl ChannelAdapter for SmsAdapter {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn deliver(&self, notification: &Notification, rendered: &Rendered) -> Result<Option<String>> {
        let body = match rendered {
            Rendered::Text(text) => text.clone(),
            Rendered::Email { text, .. } => text.clone(),
            Rendered::Structured { subject, body } => format!("{subject}: {body}"),
        };

        let payload = json!({
            "to": notification.recipient,
            "from": self.from_number,
            "body": body,
        });

        let response = self
            .client
            .post(&self.api_base_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Transient(format!("SMS vendor returned {}", response.status())).into());
        }

        let parsed: SendMessageResponse = response.json().await.unwrap_or(SendMessageResponse { message_id: None });
        Ok(parsed.message_id)
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

    fn notification() -> Notification {
        Notification {
            id: "n-1".to_string(),
            alert_id: None,
            rule_id: None,
            channel: Channel::Sms,
            recipient: "+15550001111".into(),
            subject: "s".into(),
            message: "m".into(),
            priority: NotificationPriority::Medium,
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
    async fn success_returns_vendor_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"message_id": "msg-1"})))
            .mount(&server)
            .await;

        let adapter = SmsAdapter::new(Duration::from_secs(5), server.uri(), "key", "+15550009999");
        let result = adapter
            .deliver(&notification(), &Rendered::Text("hi".to_string()))
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some("msg-1"));
    }

    #[tokio::test]
    async fn vendor_error_status_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter = SmsAdapter::new(Duration::from_secs(5), server.uri(), "key", "+15550009999");
        let err = adapter
            .deliver(&notification(), &Rendered::Text("hi".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::Types(aegis_types::Error::Transient(_))));
    }
}
