//! Template lookup and rendering.
//!
//! Template name defaults to `<channel>-default`; if the notification
//! carries a template id `T`, lookup prefers `T-<channel>` then falls back
//! to the default, per [`Notification::template_lookup_keys`].

use crate::error::{Error, Result};
use aegis_types::json::JsonValue;
use aegis_types::{Channel, Notification};
use std::collections::HashMap;

/// A channel's rendered message, just before wire-contract assembly.
#[derive(Debug, Clone)]
pub enum Rendered {
    /// Separate plain-text and HTML bodies, for email.
    Email {
        /// Plain-text body.
        text: String,
        /// HTML body.
        html: String,
    },
    /// A single text body, for SMS.
    Text(String),
    /// A subject/body pair handed to chat, paging, and webhook adapters,
    /// which wrap it into their own wire shape.
    Structured {
        /// Short summary line.
        subject: String,
        /// Rendered body.
        body: String,
    },
}

#[derive(Debug, Clone)]
struct Template {
    channel: Channel,
    body_pattern: Option<String>,
}

/// Registry of named templates, pre-populated with a `<channel>-default`
/// entry per channel that passes the notification's message through
/// unmodified.
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        let mut templates = HashMap::new();
        for channel in [
            Channel::Email,
            Channel::Sms,
            Channel::Slack,
            Channel::Teams,
            Channel::Webhook,
            Channel::Pagerduty,
        ] {
            templates.insert(
                format!("{}-default", channel.as_str()),
                Template {
                    channel,
                    body_pattern: None,
                },
            );
        }
        Self { templates }
    }
}

impl TemplateRegistry {
    /// Construct a registry with only the default passthrough templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named template's body pattern for a channel. The pattern
    /// may reference `{{field}}` placeholders resolved against the
    /// notification's `template_data`.
    pub fn register(&mut self, name: &str, channel: Channel, body_pattern: impl Into<String>) {
        self.templates.insert(
            format!("{name}-{}", channel.as_str()),
            Template {
                channel,
                body_pattern: Some(body_pattern.into()),
            },
        );
    }

    /// Render `notification` through the best-matching registered template.
    pub fn render(&self, notification: &Notification) -> Result<Rendered> {
        let template = notification
            .template_lookup_keys()
            .iter()
            .find_map(|key| self.templates.get(key))
            .ok_or_else(|| {
                Error::Template(format!(
                    "no template registered for channel '{}'",
                    notification.channel.as_str()
                ))
            })?;

        let body = match &template.body_pattern {
            Some(pattern) => substitute(pattern, &notification.template_data, &notification.message),
            None => notification.message.clone(),
        };

        Ok(match template.channel {
            Channel::Email => Rendered::Email {
                html: format!("<p>{}</p>", html_escape(&body)),
                text: body,
            },
            Channel::Sms => Rendered::Text(body),
            Channel::Slack | Channel::Teams | Channel::Webhook | Channel::Pagerduty => Rendered::Structured {
                subject: notification.subject.clone(),
                body,
            },
        })
    }
}

fn substitute(pattern: &str, data: &JsonValue, fallback: &str) -> String {
    let mut out = String::new();
    let mut rest = pattern;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        rest = &rest[start + 2..];
        match rest.find("}}") {
            Some(end) => {
                let key = rest[..end].trim();
                let value = data
                    .get(key)
                    .and_then(JsonValue::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| fallback.to_string());
                out.push_str(&value);
                rest = &rest[end + 2..];
            }
            None => {
                out.push_str("{{");
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
