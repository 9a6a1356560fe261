//! Typed configuration for the AegisShield platform, loaded from layered
//! TOML with per-section defaults for anything the file omits.

use aegis_types::Channel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Error returned while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The config file could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file's TOML could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration for every AegisShield subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AegisConfig {
    /// Retention windows used by the scheduler's cleanup handlers.
    pub retention: RetentionConfig,
    /// Cron registry configuration.
    pub scheduler: SchedulerConfig,
    /// Notification manager configuration.
    pub notifications: NotificationConfig,
    /// Graph engine orchestrator bounds.
    pub graph_engine: GraphEngineConfig,
    /// ML inference engine limits.
    pub inference: InferenceConfig,
    /// Training engine configuration.
    pub training: TrainingConfig,
    /// Ingestion pipeline configuration.
    pub ingestion: IngestionConfig,
}

impl Default for AegisConfig {
    fn default() -> Self {
        Self {
            retention: RetentionConfig::default(),
            scheduler: SchedulerConfig::default(),
            notifications: NotificationConfig::default(),
            graph_engine: GraphEngineConfig::default(),
            inference: InferenceConfig::default(),
            training: TrainingConfig::default(),
            ingestion: IngestionConfig::default(),
        }
    }
}

impl AegisConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// any field the file omits, then apply `AEGIS_*` environment overrides
    /// on top of the parsed result.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: AegisConfig = toml::from_str(&raw)?;
        Ok(apply_env_overrides(config))
    }
}

/// Environment variable overrides for configuration, applied on top of a
/// parsed/default [`AegisConfig`]. Unset or unparsable variables leave the
/// existing field untouched.
pub fn apply_env_overrides(mut config: AegisConfig) -> AegisConfig {
    // Retention.
    if let Ok(days) = std::env::var("AEGIS_ALERT_RETENTION_DAYS") {
        if let Ok(days) = days.parse() {
            config.retention.alert_retention_days = days;
        }
    }
    if let Ok(days) = std::env::var("AEGIS_NOTIFICATION_RETENTION_DAYS") {
        if let Ok(days) = days.parse() {
            config.retention.notification_retention_days = days;
        }
    }

    // Scheduler.
    if let Ok(minutes) = std::env::var("AEGIS_ESCALATION_WINDOW_MINUTES") {
        if let Ok(minutes) = minutes.parse() {
            config.scheduler.escalation_window_minutes = minutes;
        }
    }
    if let Ok(minutes) = std::env::var("AEGIS_HANDLER_DEADLINE_MINUTES") {
        if let Ok(minutes) = minutes.parse() {
            config.scheduler.handler_deadline_minutes = minutes;
        }
    }

    // Notification manager.
    if let Ok(count) = std::env::var("AEGIS_NOTIFICATIONS_WORKER_COUNT") {
        if let Ok(count) = count.parse() {
            config.notifications.worker_count = count;
        }
    }
    if let Ok(secs) = std::env::var("AEGIS_NOTIFICATIONS_POLL_INTERVAL_SECS") {
        if let Ok(secs) = secs.parse() {
            config.notifications.poll_interval_secs = secs;
        }
    }
    if let Ok(capacity) = std::env::var("AEGIS_NOTIFICATIONS_RETRY_QUEUE_CAPACITY") {
        if let Ok(capacity) = capacity.parse() {
            config.notifications.retry_queue_capacity = capacity;
        }
    }
    if let Ok(delay) = std::env::var("AEGIS_NOTIFICATIONS_RETRY_BASE_DELAY_MS") {
        if let Ok(delay) = delay.parse() {
            config.notifications.retry_base_delay_ms = delay;
        }
    }
    if let Ok(max_retries) = std::env::var("AEGIS_NOTIFICATIONS_MAX_RETRIES") {
        if let Ok(max_retries) = max_retries.parse() {
            config.notifications.max_retries = max_retries;
        }
    }
    if let Ok(provider) = std::env::var("AEGIS_EMAIL_PROVIDER") {
        match provider.to_lowercase().as_str() {
            "api" => config.notifications.email_provider = EmailProvider::Api,
            "smtp" => config.notifications.email_provider = EmailProvider::Smtp,
            _ => {}
        }
    }
    if let Ok(api_key) = std::env::var("AEGIS_EMAIL_API_KEY") {
        config.notifications.email_api.api_key = api_key;
    }
    if let Ok(host) = std::env::var("AEGIS_EMAIL_SMTP_HOST") {
        config.notifications.email_smtp.host = host;
    }
    if let Ok(port) = std::env::var("AEGIS_EMAIL_SMTP_PORT") {
        if let Ok(port) = port.parse() {
            config.notifications.email_smtp.port = port;
        }
    }
    if let Ok(username) = std::env::var("AEGIS_EMAIL_SMTP_USERNAME") {
        config.notifications.email_smtp.username = Some(username);
    }
    if let Ok(password) = std::env::var("AEGIS_EMAIL_SMTP_PASSWORD") {
        config.notifications.email_smtp.password = Some(password);
    }
    if let Ok(api_key) = std::env::var("AEGIS_SMS_API_KEY") {
        config.notifications.sms.api_key = api_key;
    }
    if let Ok(header) = std::env::var("AEGIS_WEBHOOK_AUTH_HEADER") {
        config.notifications.webhook_auth.auth_header = Some(header);
    }
    if let Ok(token) = std::env::var("AEGIS_WEBHOOK_AUTH_TOKEN") {
        config.notifications.webhook_auth.auth_token = Some(token);
    }
    if let Ok(routing_key) = std::env::var("AEGIS_PAGERDUTY_ROUTING_KEY") {
        config.notifications.pagerduty.routing_key = routing_key;
    }

    // Graph engine.
    if let Ok(depth) = std::env::var("AEGIS_GRAPH_MAX_TRAVERSAL_DEPTH") {
        if let Ok(depth) = depth.parse() {
            config.graph_engine.max_traversal_depth = depth;
        }
    }
    if let Ok(n) = std::env::var("AEGIS_GRAPH_MAX_CONCURRENT_ANALYSES") {
        if let Ok(n) = n.parse() {
            config.graph_engine.max_concurrent_analyses = n;
        }
    }

    // Inference.
    if let Ok(enabled) = std::env::var("AEGIS_INFERENCE_CACHE_ENABLED") {
        if let Ok(enabled) = enabled.parse() {
            config.inference.cache_enabled = enabled;
        }
    }
    if let Ok(batch_size) = std::env::var("AEGIS_INFERENCE_BATCH_SIZE") {
        if let Ok(batch_size) = batch_size.parse() {
            config.inference.batch_size = batch_size;
        }
    }

    // Training.
    if let Ok(count) = std::env::var("AEGIS_TRAINING_WORKER_COUNT") {
        if let Ok(count) = count.parse() {
            config.training.worker_count = count;
        }
    }
    if let Ok(root) = std::env::var("AEGIS_TRAINING_ARTIFACT_ROOT") {
        config.training.artifact_root = root;
    }

    // Ingestion.
    if let Ok(root) = std::env::var("AEGIS_INGESTION_UPLOAD_ROOT") {
        config.ingestion.upload_root = root;
    }
    if let Ok(max_bytes) = std::env::var("AEGIS_INGESTION_MAX_UPLOAD_SIZE_BYTES") {
        if let Ok(max_bytes) = max_bytes.parse() {
            config.ingestion.max_upload_size_bytes = max_bytes;
        }
    }

    config
}

/// Retention windows (in days) for terminal-status cleanup handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Days to keep alerts in a terminal status before cleanup deletes them.
    pub alert_retention_days: u32,
    /// Days to keep notifications in a terminal status before cleanup.
    pub notification_retention_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            alert_retention_days: 90,
            notification_retention_days: 30,
        }
    }
}

/// Scheduler registry configuration: cron strings per task and the
/// escalation window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Cron expression per well-known task id.
    pub task_schedules: HashMap<String, String>,
    /// Minutes an active, unacknowledged alert with an escalation policy
    /// may sit before the escalation processor bumps its level.
    pub escalation_window_minutes: i64,
    /// Deadline, in minutes, granted to every scheduled handler execution.
    pub handler_deadline_minutes: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let mut task_schedules = HashMap::new();
        task_schedules.insert("alert_cleanup".to_string(), "0 0 * * *".to_string());
        task_schedules.insert("notification_cleanup".to_string(), "0 1 * * *".to_string());
        task_schedules.insert("health_check".to_string(), "*/5 * * * *".to_string());
        task_schedules.insert("escalation_processor".to_string(), "*/1 * * * *".to_string());
        task_schedules.insert("metrics_collection".to_string(), "*/1 * * * *".to_string());
        task_schedules.insert("pending_notifications_drain".to_string(), "*/1 * * * *".to_string());
        Self {
            task_schedules,
            escalation_window_minutes: 60,
            handler_deadline_minutes: 30,
        }
    }
}

/// Per-channel rate limit: requests per minute and burst allowance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelRateLimit {
    /// Whether this channel is enabled at all.
    pub enabled: bool,
    /// Sustained requests-per-minute rate.
    pub requests_per_minute: u32,
    /// Instantaneous burst allowance.
    pub burst: u32,
}

impl Default for ChannelRateLimit {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 60,
            burst: 10,
        }
    }
}

/// Email delivery vendor, selected in configuration rather than per-call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailProvider {
    /// Vendor A: HTTP API-based delivery.
    Api,
    /// Vendor B: SMTP-relay-based delivery.
    Smtp,
}

impl Default for EmailProvider {
    fn default() -> Self {
        Self::Api
    }
}

/// Notification manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Number of long-lived dispatch workers.
    pub worker_count: usize,
    /// Interval, in seconds, between `processPending` sweeps per worker.
    pub poll_interval_secs: u64,
    /// Capacity of the bounded retry queue.
    pub retry_queue_capacity: usize,
    /// Base delay, in milliseconds, for exponential-backoff retries.
    pub retry_base_delay_ms: u64,
    /// Maximum retries before a notification fails terminally.
    pub max_retries: u32,
    /// Per-channel rate limits, keyed by [`Channel::as_str`].
    pub channel_limits: HashMap<String, ChannelRateLimit>,
    /// Which vendor handles email delivery.
    pub email_provider: EmailProvider,
    /// Per-request timeout, in milliseconds, applied by every channel
    /// adapter's HTTP/SMTP client.
    pub adapter_timeout_ms: u64,
    /// Vendor-A (HTTP API) email settings, used when `email_provider ==
    /// Api`.
    pub email_api: EmailApiConfig,
    /// Vendor-B (SMTP relay) email settings, used when `email_provider ==
    /// Smtp`.
    pub email_smtp: EmailSmtpConfig,
    /// SMS vendor settings.
    pub sms: SmsConfig,
    /// Generic webhook auth header/token, applied to the `webhook` channel
    /// and reused for Slack/Teams incoming-webhook calls when set.
    pub webhook_auth: WebhookAuthConfig,
    /// Paging/on-call vendor settings.
    pub pagerduty: PagerdutyConfig,
}

/// Vendor-A HTTP API email settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailApiConfig {
    /// Base URL of the vendor's send-mail API.
    pub api_base_url: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Envelope `From` address.
    pub from_address: String,
}

impl Default for EmailApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.email-vendor-a.example/v3/mail/send".to_string(),
            api_key: String::new(),
            from_address: "alerts@aegisshield.dev".to_string(),
        }
    }
}

/// Vendor-B SMTP-relay email settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSmtpConfig {
    /// SMTP relay hostname.
    pub host: String,
    /// SMTP relay port.
    pub port: u16,
    /// SMTP auth username, if the relay requires authentication.
    pub username: Option<String>,
    /// SMTP auth password, if the relay requires authentication.
    pub password: Option<String>,
    /// Envelope `From` address.
    pub from_address: String,
}

impl Default for EmailSmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.email-vendor-b.example".to_string(),
            port: 587,
            username: None,
            password: None,
            from_address: "alerts@aegisshield.dev".to_string(),
        }
    }
}

/// SMS vendor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    /// Base URL of the SMS vendor's send-message API.
    pub api_base_url: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Sending phone number / short code.
    pub from_number: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.sms-vendor.example/v1/messages".to_string(),
            api_key: String::new(),
            from_number: String::new(),
        }
    }
}

/// Generic webhook authentication, also reused by chat/paging adapters
/// when they need an additional auth header beyond their payload-embedded
/// routing key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookAuthConfig {
    /// Header name to send the auth token under, if any.
    pub auth_header: Option<String>,
    /// Auth token value, if any.
    pub auth_token: Option<String>,
}

impl Default for WebhookAuthConfig {
    fn default() -> Self {
        Self {
            auth_header: None,
            auth_token: None,
        }
    }
}

/// Paging/on-call vendor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerdutyConfig {
    /// Events API v2 endpoint.
    pub events_api_url: String,
    /// Integration routing key for the events API.
    pub routing_key: String,
}

impl Default for PagerdutyConfig {
    fn default() -> Self {
        Self {
            events_api_url: "https://events.pagerduty.example/v2/enqueue".to_string(),
            routing_key: String::new(),
        }
    }
}

impl NotificationConfig {
    /// Look up the rate limit configured for a channel, falling back to the
    /// default limit if the config omitted it.
    pub fn limit_for(&self, channel: Channel) -> ChannelRateLimit {
        self.channel_limits
            .get(channel.as_str())
            .copied()
            .unwrap_or_default()
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        let mut channel_limits = HashMap::new();
        for channel in [
            Channel::Email,
            Channel::Sms,
            Channel::Slack,
            Channel::Teams,
            Channel::Webhook,
            Channel::Pagerduty,
        ] {
            channel_limits.insert(channel.as_str().to_string(), ChannelRateLimit::default());
        }
        Self {
            worker_count: 4,
            poll_interval_secs: 5,
            retry_queue_capacity: 256,
            retry_base_delay_ms: 100,
            max_retries: 3,
            channel_limits,
            email_provider: EmailProvider::default(),
            adapter_timeout_ms: 10_000,
            email_api: EmailApiConfig::default(),
            email_smtp: EmailSmtpConfig::default(),
            sms: SmsConfig::default(),
            webhook_auth: WebhookAuthConfig::default(),
            pagerduty: PagerdutyConfig::default(),
        }
    }
}

/// Graph engine orchestrator bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphEngineConfig {
    /// Default maximum traversal depth for subgraph extraction.
    pub max_traversal_depth: u32,
    /// Default maximum path length for `findPaths`.
    pub max_path_length: u32,
    /// Minimum path confidence accepted by `findPaths`.
    pub min_path_confidence: f64,
    /// Maximum concurrent `analyzeSubGraph` executions.
    pub max_concurrent_analyses: usize,
    /// Degree-centrality threshold for the "high centrality" insight.
    pub centrality_threshold: f64,
    /// Density threshold for the "dense cluster" insight.
    pub clustering_threshold: f64,
    /// Pattern-confidence threshold for the "suspicious pattern" insight.
    pub anomaly_threshold: f64,
    /// Minimum confidence accepted by the pattern detector.
    pub min_pattern_confidence: f64,
}

impl Default for GraphEngineConfig {
    fn default() -> Self {
        Self {
            max_traversal_depth: 4,
            max_path_length: 6,
            min_path_confidence: 0.3,
            max_concurrent_analyses: 4,
            centrality_threshold: 0.7,
            clustering_threshold: 0.6,
            anomaly_threshold: 0.8,
            min_pattern_confidence: 0.5,
        }
    }
}

/// ML inference engine limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Whether the predictor cache is enabled.
    pub cache_enabled: bool,
    /// Predictor cache TTL, in seconds.
    pub cache_ttl_secs: u64,
    /// Feature-vector chunk size for `predictBatch`.
    pub batch_size: usize,
    /// Maximum latency, in milliseconds, allowed for a single prediction.
    pub max_latency_ms: u64,
    /// Minimum confidence for a prediction to be considered actionable.
    pub prediction_threshold: f64,
    /// Whether the circuit breaker is enabled.
    pub circuit_breaker_enabled: bool,
    /// Consecutive failures before the circuit opens.
    pub circuit_failure_threshold: u32,
    /// Consecutive successes in half-open before the circuit closes.
    pub circuit_success_threshold: u32,
    /// Milliseconds the circuit stays open before probing half-open.
    pub circuit_recovery_timeout_ms: u64,
    /// Sustained requests-per-second for the process-wide rate limiter.
    pub rate_limit_rps: u32,
    /// Burst allowance for the process-wide rate limiter.
    pub rate_limit_burst: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl_secs: 3600,
            batch_size: 32,
            max_latency_ms: 2000,
            prediction_threshold: 0.5,
            circuit_breaker_enabled: true,
            circuit_failure_threshold: 5,
            circuit_success_threshold: 2,
            circuit_recovery_timeout_ms: 30_000,
            rate_limit_rps: 100,
            rate_limit_burst: 50,
        }
    }
}

/// Training engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of bounded worker tasks consuming the training queue.
    pub worker_count: usize,
    /// Capacity of the bounded training-job queue.
    pub queue_capacity: usize,
    /// Root directory model artifacts are written under.
    pub artifact_root: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            queue_capacity: 64,
            artifact_root: "./models".to_string(),
        }
    }
}

/// Ingestion pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Root directory (or bucket prefix) uploaded files are written under.
    pub upload_root: String,
    /// Maximum accepted upload size, in bytes.
    pub max_upload_size_bytes: u64,
    /// Number of records batched into a single best-effort-atomic publish.
    pub stream_batch_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            upload_root: "./data/uploads".to_string(),
            max_upload_size_bytes: 100 * 1024 * 1024,
            stream_batch_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_limit_per_channel() {
        let config = AegisConfig::default();
        assert_eq!(config.notifications.channel_limits.len(), 6);
    }

    #[test]
    fn toml_round_trip_preserves_overrides() {
        let toml_str = r#"
            [notifications]
            worker_count = 8
        "#;
        let config: AegisConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.notifications.worker_count, 8);
        // Untouched sections fall back to defaults.
        assert_eq!(config.graph_engine.max_concurrent_analyses, 4);
    }

    #[test]
    fn env_overrides_apply_on_top_of_parsed_config() {
        std::env::set_var("AEGIS_NOTIFICATIONS_WORKER_COUNT", "16");
        std::env::set_var("AEGIS_GRAPH_MAX_CONCURRENT_ANALYSES", "9");

        let config = apply_env_overrides(AegisConfig::default());

        std::env::remove_var("AEGIS_NOTIFICATIONS_WORKER_COUNT");
        std::env::remove_var("AEGIS_GRAPH_MAX_CONCURRENT_ANALYSES");

        assert_eq!(config.notifications.worker_count, 16);
        assert_eq!(config.graph_engine.max_concurrent_analyses, 9);
        // Untouched fields still fall back to defaults.
        assert_eq!(config.retention.alert_retention_days, 90);
    }

    #[test]
    fn unset_or_unparsable_env_vars_leave_fields_untouched() {
        std::env::remove_var("AEGIS_NOTIFICATIONS_MAX_RETRIES");
        std::env::set_var("AEGIS_INFERENCE_BATCH_SIZE", "not-a-number");

        let config = apply_env_overrides(AegisConfig::default());

        std::env::remove_var("AEGIS_INFERENCE_BATCH_SIZE");

        assert_eq!(config.notifications.max_retries, 3);
        assert_eq!(config.inference.batch_size, 32);
    }
}
