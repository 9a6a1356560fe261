//! Notification manager: template rendering, per-channel rate limiting,
//! dispatch, and the bounded worker/retry-queue lifecycle.

use crate::channels::ChannelAdapter;
use crate::error::{Error, Result};
use crate::rate_limit::ChannelRateLimiters;
use crate::templates::TemplateRegistry;
use aegis_bus::{BusEvent, ErrorEvent, Headers, MessageBusProducer};
use aegis_repositories::{NotificationFilter, NotificationRepository};
use aegis_types::{Channel, JsonValue, Notification, NotificationStatus};
use chrono::Utc;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Tunables controlling worker count, poll cadence, and retry backoff.
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Number of long-lived workers draining pending notifications.
    pub worker_count: usize,
    /// Seconds between each worker's `process_pending` sweep.
    pub poll_interval_secs: u64,
    /// Notifications fetched per sweep, across all workers combined.
    pub batch_size: usize,
    /// Capacity of the bounded retry queue.
    pub retry_queue_capacity: usize,
    /// Base delay, in milliseconds, for exponential-backoff retries.
    pub retry_base_delay_ms: u64,
    /// Maximum retries before a notification fails terminally.
    pub max_retries: u32,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            worker_count: 4,
            poll_interval_secs: 5,
            batch_size: 20,
            retry_queue_capacity: 256,
            retry_base_delay_ms: 100,
            max_retries: 3,
        }
    }
}

/// Dispatches notifications across channel adapters with rate limiting,
/// templating, and bounded retry-with-backoff.
pub struct NotificationManager {
    repo: Arc<dyn NotificationRepository>,
    adapters: HashMap<Channel, Arc<dyn ChannelAdapter>>,
    templates: TemplateRegistry,
    limiters: ChannelRateLimiters,
    bus: Option<Arc<dyn MessageBusProducer>>,
    settings: ManagerSettings,
    retry_tx: mpsc::Sender<String>,
    retry_rx: tokio::sync::Mutex<Option<mpsc::Receiver<String>>>,
    running: AtomicBool,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationManager {
    /// Construct a manager over `repo`, dispatching through `adapters`
    /// (one per supported channel), optionally publishing [`ErrorEvent`]s
    /// onto `bus` for terminal failures.
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        adapters: Vec<Arc<dyn ChannelAdapter>>,
        limiters: ChannelRateLimiters,
        bus: Option<Arc<dyn MessageBusProducer>>,
        settings: ManagerSettings,
    ) -> Self {
        let adapters = adapters.into_iter().map(|a| (a.channel(), a)).collect();
        let (retry_tx, retry_rx) = mpsc::channel(settings.retry_queue_capacity);
        Self {
            repo,
            adapters,
            templates: TemplateRegistry::new(),
            limiters,
            bus,
            settings,
            retry_tx,
            retry_rx: tokio::sync::Mutex::new(Some(retry_rx)),
            running: AtomicBool::new(false),
            workers: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Register or override a named template for `channel`.
    pub fn register_template(&mut self, name: &str, channel: Channel, body_pattern: impl Into<String>) {
        self.templates.register(name, channel, body_pattern);
    }

    /// Submit `notification` and attempt immediate delivery.
    ///
    /// Returns the notification in its resulting state: `Sent` on success,
    /// `Pending` if delivery failed but retries remain (queued for the
    /// retry processor), or `Failed` once retries are exhausted.
    pub async fn send(&self, mut notification: Notification) -> Result<Notification> {
        if !self.adapters.contains_key(&notification.channel) {
            return Err(Error::UnsupportedChannel(notification.channel));
        }
        notification.max_retries = notification.max_retries.max(self.settings.max_retries);
        notification.status = NotificationStatus::Pending;
        self.repo.save(notification.clone()).await?;
        self.dispatch(notification).await
    }

    /// Fetch up to `batch_size` pending notifications and attempt delivery
    /// for each. Returns the number attempted. Safe to call concurrently
    /// and repeatedly: a notification already moved out of `Pending` by
    /// another worker is simply absent from the next fetch.
    pub async fn process_pending(&self, batch_size: usize) -> Result<usize> {
        let filter = NotificationFilter {
            status: Some(NotificationStatus::Pending),
            ..Default::default()
        };
        let pending = self.repo.list(&filter).await?;
        let mut attempted = 0;
        for notification in pending.into_iter().take(batch_size) {
            if let Err(err) = self.dispatch(notification).await {
                warn!(error = %err, "process_pending: dispatch attempt failed");
            }
            attempted += 1;
        }
        Ok(attempted)
    }

    async fn dispatch(&self, mut notification: Notification) -> Result<Notification> {
        self.limiters.check(notification.channel)?;

        let Some(adapter) = self.adapters.get(&notification.channel).cloned() else {
            return Err(Error::UnsupportedChannel(notification.channel));
        };

        notification.status = NotificationStatus::Sending;
        self.repo.save(notification.clone()).await?;

        let rendered = self.templates.render(&notification)?;
        match adapter.deliver(&notification, &rendered).await {
            Ok(external_id) => {
                notification.status = NotificationStatus::Sent;
                notification.external_id = external_id;
                notification.last_error = None;
                self.repo.save(notification.clone()).await?;
                Ok(notification)
            }
            Err(err) => {
                notification.last_error = Some(err.to_string());
                notification.retry_count += 1;
                if err.is_retryable() && notification.retry_count < notification.max_retries {
                    notification.status = NotificationStatus::Pending;
                    self.repo.save(notification.clone()).await?;
                    self.enqueue_retry(&notification).await;
                } else {
                    notification.status = NotificationStatus::Failed;
                    self.repo.save(notification.clone()).await?;
                    self.publish_failure(&notification, &err).await;
                }
                Ok(notification)
            }
        }
    }

    async fn enqueue_retry(&self, notification: &Notification) {
        let delay = backoff_with_jitter(self.settings.retry_base_delay_ms, notification.retry_count);
        let id = notification.id.clone();
        match self.retry_tx.try_send(id.clone()) {
            Ok(()) => {
                info!(notification_id = %id, delay_ms = delay.as_millis() as u64, "notification queued for retry");
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(notification_id = %id, "retry queue full, marking notification failed");
                if let Ok(mut n) = self.repo.get(&id).await {
                    n.status = NotificationStatus::Failed;
                    n.last_error = Some("retry queue full".to_string());
                    let _ = self.repo.save(n).await;
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    async fn publish_failure(&self, notification: &Notification, err: &Error) {
        error!(notification_id = %notification.id, error = %err, "notification delivery failed terminally");
        let Some(bus) = &self.bus else { return };
        let event = BusEvent::ErrorEvent(ErrorEvent {
            component: "notification-manager".to_string(),
            operation: "deliver".to_string(),
            error_code: "notification_delivery_failed".to_string(),
            error_message: err.to_string(),
            context: {
                let mut ctx = JsonValue::empty_object();
                ctx.insert("notification_id", JsonValue::String(notification.id.clone()));
                ctx.insert("channel", JsonValue::String(notification.channel.as_str().to_string()));
                ctx
            },
            timestamp: Utc::now(),
        });
        if let Err(publish_err) = bus.publish(event, Headers::new()).await {
            warn!(error = %publish_err, "failed to publish notification failure event");
        }
    }

    /// Start `settings.worker_count` polling workers plus one retry
    /// processor. Idempotent: a second call while already running is a
    /// no-op.
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut handles = self.workers.lock().await;

        for worker_id in 0..self.settings.worker_count {
            let manager = Arc::clone(self);
            let interval = Duration::from_secs(self.settings.poll_interval_secs);
            let batch_size = self.settings.batch_size;
            handles.push(tokio::spawn(async move {
                while manager.running.load(Ordering::SeqCst) {
                    tokio::time::sleep(interval).await;
                    if !manager.running.load(Ordering::SeqCst) {
                        break;
                    }
                    match manager.process_pending(batch_size).await {
                        Ok(count) if count > 0 => info!(worker_id, count, "notification worker processed pending batch"),
                        Ok(_) => {}
                        Err(err) => warn!(worker_id, error = %err, "notification worker sweep failed"),
                    }
                }
            }));
        }

        if let Some(mut retry_rx) = self.retry_rx.lock().await.take() {
            let manager = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                while let Some(id) = retry_rx.recv().await {
                    let notification = match manager.repo.get(&id).await {
                        Ok(n) => n,
                        Err(_) => continue,
                    };
                    if notification.status != NotificationStatus::Pending {
                        continue;
                    }
                    let delay = backoff_with_jitter(manager.settings.retry_base_delay_ms, notification.retry_count);
                    tokio::time::sleep(delay).await;
                    if let Err(err) = manager.dispatch(notification).await {
                        warn!(notification_id = %id, error = %err, "retry dispatch failed");
                    }
                }
            }));
        }
    }

    /// Signal every worker and the retry processor to stop, then wait for
    /// them to exit.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let mut handles = self.workers.lock().await;
        for handle in handles.drain(..) {
            handle.abort();
        }
    }
}

/// `base_ms * 2^retry_count`, jittered by up to ±20%, capped at 60s.
fn backoff_with_jitter(base_ms: u64, retry_count: u32) -> Duration {
    let exp = base_ms.saturating_mul(1u64 << retry_count.min(10));
    let capped = exp.min(60_000);
    let jitter_fraction = rand::thread_rng().gen_range(-0.2..=0.2);
    let jittered = (capped as f64) * (1.0 + jitter_fraction);
    Duration::from_millis(jittered.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::Rendered;
    use aegis_repositories::InMemoryNotificationRepository;
    use aegis_types::NotificationPriority;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct FlakyAdapter {
        channel: Channel,
        fail_times: AtomicUsize,
    }

    #[async_trait]
    impl ChannelAdapter for FlakyAdapter {
        fn channel(&self) -> Channel {
            self.channel
        }

        async fn deliver(&self, _notification: &Notification, _rendered: &Rendered) -> crate::error::Result<Option<String>> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(aegis_types::Error::Transient("simulated failure".to_string()).into());
            }
            Ok(Some("ext-1".to_string()))
        }
    }

    fn notification(channel: Channel) -> Notification {
        Notification {
            id: uuid::Uuid::new_v4().to_string(),
            alert_id: None,
            rule_id: None,
            channel,
            recipient: "r".into(),
            subject: "s".into(),
            message: "m".into(),
            priority: NotificationPriority::Medium,
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

    fn manager(adapter: Arc<dyn ChannelAdapter>) -> NotificationManager {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let limiters = ChannelRateLimiters::new(std::iter::empty());
        NotificationManager::new(repo, vec![adapter], limiters, None, ManagerSettings::default())
    }

    #[tokio::test]
    async fn send_unsupported_channel_errors_without_touching_repo() {
        let manager = manager(Arc::new(FlakyAdapter {
            channel: Channel::Slack,
            fail_times: AtomicUsize::new(0),
        }));
        let err = manager.send(notification(Channel::Email)).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedChannel(Channel::Email)));
    }

    #[tokio::test]
    async fn send_succeeds_and_records_external_id() {
        let manager = manager(Arc::new(FlakyAdapter {
            channel: Channel::Slack,
            fail_times: AtomicUsize::new(0),
        }));
        let result = manager.send(notification(Channel::Slack)).await.unwrap();
        assert_eq!(result.status, NotificationStatus::Sent);
        assert_eq!(result.external_id.as_deref(), Some("ext-1"));
    }

    #[tokio::test]
    async fn send_failure_under_retry_budget_stays_pending_and_queues_retry() {
        let manager = manager(Arc::new(FlakyAdapter {
            channel: Channel::Slack,
            fail_times: AtomicUsize::new(5),
        }));
        let result = manager.send(notification(Channel::Slack)).await.unwrap();
        assert_eq!(result.status, NotificationStatus::Pending);
        assert_eq!(result.retry_count, 1);
        assert!(result.last_error.is_some());
    }

    #[tokio::test]
    async fn exhausted_retries_mark_notification_failed() {
        let manager = manager(Arc::new(FlakyAdapter {
            channel: Channel::Slack,
            fail_times: AtomicUsize::new(99),
        }));
        let mut n = notification(Channel::Slack);
        n.retry_count = n.max_retries - 1;
        let result = manager.send(n).await.unwrap();
        assert_eq!(result.status, NotificationStatus::Failed);
    }

    #[tokio::test]
    async fn process_pending_drains_queued_notifications() {
        let manager = manager(Arc::new(FlakyAdapter {
            channel: Channel::Slack,
            fail_times: AtomicUsize::new(0),
        }));
        manager.repo.save(notification(Channel::Slack)).await.unwrap();
        manager.repo.save(notification(Channel::Slack)).await.unwrap();
        let attempted = manager.process_pending(10).await.unwrap();
        assert_eq!(attempted, 2);
    }

    #[test]
    fn backoff_grows_exponentially_within_jitter_band() {
        let d0 = backoff_with_jitter(100, 0).as_millis();
        let d3 = backoff_with_jitter(100, 3).as_millis();
        assert!(d0 <= 120 && d0 >= 80);
        assert!(d3 <= 960 && d3 >= 640);
    }
}
