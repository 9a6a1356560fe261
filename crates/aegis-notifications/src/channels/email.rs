//! Email channel adapters: vendor A (HTTP API) and vendor B (SMTP relay),
//! selected in configuration rather than per-call (see
//! [`aegis_config::EmailProvider`]).
//!
//! The SMTP adapter builds a [`lettre::Message`] and relays it through an
//! [`lettre::AsyncSmtpTransport`], applying credentials only when configured.

use super::ChannelAdapter;
use crate::error::Result;
use crate::templates::Rendered;
use aegis_types::{Channel, Error, Notification};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

fn email_body(rendered: &Rendered) -> (String, String) {
    match rendered {
        Rendered::Email { text, html } => (text.clone(), html.clone()),
        Rendered::Text(text) => (text.clone(), format!("<p>{text}</p>")),
        Rendered::Structured { body, .. } => (body.clone(), format!("<p>{body}</p>")),
    }
}

/// Vendor A: a JSON HTTP API, e.g. a SendGrid-style send-mail endpoint.
pub struct EmailApiAdapter {
    client: Client,
    api_base_url: String,
    api_key: String,
    from_address: String,
}

impl EmailApiAdapter {
    /// Construct an adapter posting to `api_base_url` with bearer auth.
    pub fn new(timeout: Duration, api_base_url: impl Into<String>, api_key: impl Into<String>, from_address: impl Into<String>) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_base_url: api_base_url.into(),
            api_key: api_key.into(),
            from_address: from_address.into(),
        }
    }
}

#[async_trait]
impl ChannelAdapter for EmailApiAdapter {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn deliver(&self, notification: &Notification, rendered: &Rendered) -> Result<Option<String>> {
        let (text, html) = email_body(rendered);
        let payload = json!({
            "personalizations": [{"to": [{"email": notification.recipient}]}],
            "from": {"email": self.from_address},
            "subject": notification.subject,
            "content": [
                {"type": "text/plain", "value": text},
                {"type": "text/html", "value": html},
            ],
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
            return Err(Error::Transient(format!("email API returned {}", response.status())).into());
        }
        Ok(response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }
}

/// Vendor B: an SMTP relay, reached through [`lettre`].
pub struct EmailSmtpAdapter {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    from_address: String,
}

impl EmailSmtpAdapter {
    /// Construct an adapter relaying through `host:port`, optionally
    /// authenticating with `username`/`password`.
    pub fn new(host: impl Into<String>, port: u16, username: Option<String>, password: Option<String>, from_address: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username,
            password,
            from_address: from_address.into(),
        }
    }
}

#[async_trait]
impl ChannelAdapter for EmailSmtpAdapter {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn deliver(&self, notification: &Notification, rendered: &Rendered) -> Result<Option<String>> {
        let (text, html) = email_body(rendered);

        let from: Mailbox = self
            .from_address
            .parse()
            .map_err(|e| crate::error::Error::Template(format!("invalid from address: {e}")))?;
        let to: Mailbox = notification
            .recipient
            .parse()
            .map_err(|e| crate::error::Error::Template(format!("invalid recipient address: {e}")))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(&notification.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text))
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html)),
            )
            .map_err(|e| crate::error::Error::Template(format!("failed to build email: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
            .map_err(|e| Error::Transient(format!("failed to create SMTP relay for {}: {e}", self.host)))?
            .port(self.port);
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        let mailer = builder.build();

        mailer
            .send(email)
            .await
            .map_err(|e| Error::Transient(format!("SMTP send failed: {e}")))?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::{JsonValue, NotificationPriority, NotificationStatus};
    use chrono::Utc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification(recipient: String) -> Notification {
        Notification {
            id: "n-1".to_string(),
            alert_id: None,
            rule_id: None,
            channel: Channel::Email,
            recipient,
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
    async fn api_adapter_returns_vendor_message_id_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).insert_header("x-message-id", "msg-42"))
            .mount(&server)
            .await;

        let adapter = EmailApiAdapter::new(Duration::from_secs(5), server.uri(), "key", "from@example.com");
        let result = adapter
            .deliver(&notification("to@example.com".to_string()), &Rendered::Text("hi".to_string()))
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some("msg-42"));
    }

    #[tokio::test]
    async fn api_adapter_errors_on_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let adapter = EmailApiAdapter::new(Duration::from_secs(5), server.uri(), "key", "from@example.com");
        let err = adapter
            .deliver(&notification("to@example.com".to_string()), &Rendered::Text("hi".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::Types(aegis_types::Error::Transient(_))));
    }

    #[tokio::test]
    async fn smtp_adapter_rejects_invalid_recipient_address_as_template_error() {
        let adapter = EmailSmtpAdapter::new("smtp.example.test", 587, None, None, "from@example.com");
        let err = adapter
            .deliver(&notification("not-an-email".to_string()), &Rendered::Text("hi".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::Template(_)));
    }
}
