//! Per-channel delivery adapters.
//!
//! Each adapter posts JSON to a vendor endpoint within a configured
//! timeout; a non-2xx (or non-202 for paging) response is an error. HTTP
//! transport errors and non-success statuses are mapped to
//! [`aegis_types::Error::Transient`] so the manager's retry policy applies.

use crate::error::Result;
use crate::templates::Rendered;
use aegis_types::{Channel, Notification};
use async_trait::async_trait;

pub mod email;
pub mod pagerduty;
pub mod slack;
pub mod sms;
pub mod teams;
pub mod webhook;

pub use email::{EmailApiAdapter, EmailSmtpAdapter};
pub use pagerduty::PagerdutyAdapter;
pub use slack::SlackAdapter;
pub use sms::SmsAdapter;
pub use teams::TeamsAdapter;
pub use webhook::WebhookAdapter;

/// Delivers a rendered notification to one channel's vendor endpoint.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Channel this adapter serves.
    fn channel(&self) -> Channel;
    /// Deliver `notification`'s `rendered` body, returning the vendor's
    /// external id if one was provided.
    async fn deliver(&self, notification: &Notification, rendered: &Rendered) -> Result<Option<String>>;
}

pub(crate) fn priority_color(priority: aegis_types::NotificationPriority) -> &'static str {
    use aegis_types::NotificationPriority::*;
    match priority {
        Critical => "FF0000",
        High => "FF9900",
        Medium => "FFCC00",
        Low => "00CC00",
    }
}

pub(crate) fn priority_severity(priority: aegis_types::NotificationPriority) -> &'static str {
    use aegis_types::NotificationPriority::*;
    match priority {
        Critical => "critical",
        High => "error",
        Medium => "warning",
        Low => "info",
    }
}
