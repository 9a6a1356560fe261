//! Rate-limited, retry-queued multi-channel notification dispatch.
//!
//! Routes a [`aegis_types::Notification`] through a per-channel
//! [`channels::ChannelAdapter`] after rendering it through
//! [`templates::TemplateRegistry`] and checking
//! [`rate_limit::ChannelRateLimiters`]. [`manager::NotificationManager`]
//! owns the send/retry/worker lifecycle; [`handler::PendingNotificationsDrainHandler`]
//! plugs that lifecycle into the cron scheduler.

pub mod channels;
pub mod error;
pub mod handler;
pub mod manager;
pub mod rate_limit;
pub mod templates;

pub use channels::{
    ChannelAdapter, EmailApiAdapter, EmailSmtpAdapter, PagerdutyAdapter, SlackAdapter, SmsAdapter,
    TeamsAdapter, WebhookAdapter,
};
pub use error::{Error, Result};
pub use handler::PendingNotificationsDrainHandler;
pub use manager::{ManagerSettings, NotificationManager};
pub use rate_limit::ChannelRateLimiters;
pub use templates::{Rendered, TemplateRegistry};
