//! Composition root: loads configuration, wires every repository, the
//! message bus, the notification manager, the cron scheduler, and the
//! graph/ML/ingestion engines into a single running process.

use aegis_bus::InMemoryMessageBus;
use aegis_config::{AegisConfig, EmailProvider};
use aegis_graph::{GraphOrchestrator, InMemoryGraphStore};
use aegis_ingestion::{StreamIngestionPipeline, UploadPipeline};
use aegis_ml::{InferenceEngine, TrainingEngine};
use aegis_notifications::channels::{
    EmailApiAdapter, EmailSmtpAdapter, PagerdutyAdapter, SlackAdapter, SmsAdapter, TeamsAdapter, WebhookAdapter,
};
use aegis_notifications::{ChannelAdapter, ChannelRateLimiters, ManagerSettings, NotificationManager, PendingNotificationsDrainHandler};
use aegis_repositories::{
    FilesystemObjectStorage, InMemoryAlertRepository, InMemoryAnalysisJobRepository, InMemoryAuditRepository,
    InMemoryIngestionJobRepository, InMemoryInvestigationRepository, InMemoryModelRepository,
    InMemoryNetworkMetricsRepository, InMemoryNotificationRepository, InMemoryPatternRepository,
    InMemoryPredictionRequestRepository, InMemoryTrainingJobRepository, InMemoryUploadRepository,
};
use aegis_scheduler::{
    AlertCleanupHandler, EscalationProcessorHandler, HealthCheckHandler, MetricsCollectionHandler,
    NotificationCleanupHandler, Scheduler,
};
use aegis_types::Channel;
use chrono::{Duration as ChronoDuration, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_adapters(config: &aegis_config::NotificationConfig) -> Vec<Arc<dyn ChannelAdapter>> {
    let timeout = Duration::from_millis(config.adapter_timeout_ms);
    let email_adapter: Arc<dyn ChannelAdapter> = match config.email_provider {
        EmailProvider::Api => Arc::new(EmailApiAdapter::new(
            timeout,
            config.email_api.api_base_url.clone(),
            config.email_api.api_key.clone(),
            config.email_api.from_address.clone(),
        )),
        EmailProvider::Smtp => Arc::new(EmailSmtpAdapter::new(
            config.email_smtp.host.clone(),
            config.email_smtp.port,
            config.email_smtp.username.clone(),
            config.email_smtp.password.clone(),
            config.email_smtp.from_address.clone(),
        )),
    };

    vec![
        email_adapter,
        Arc::new(SmsAdapter::new(
            timeout,
            config.sms.api_base_url.clone(),
            config.sms.api_key.clone(),
            config.sms.from_number.clone(),
        )),
        Arc::new(SlackAdapter::new(timeout)),
        Arc::new(TeamsAdapter::new(timeout)),
        Arc::new(WebhookAdapter::new(
            timeout,
            config.webhook_auth.auth_header.clone(),
            config.webhook_auth.auth_token.clone(),
        )),
        Arc::new(PagerdutyAdapter::new(
            timeout,
            config.pagerduty.events_api_url.clone(),
            config.pagerduty.routing_key.clone(),
        )),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config_path = std::env::var("AEGIS_CONFIG").unwrap_or_else(|_| "aegis.toml".to_string());
    let config = match AegisConfig::load_from_file(&config_path) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %config_path, error = %err, "failed to load config file, using defaults");
            AegisConfig::default()
        }
    };

    let started_at = Utc::now();

    // Shared foundation: repositories and the message bus.
    let alerts = Arc::new(InMemoryAlertRepository::new());
    let audit = Arc::new(InMemoryAuditRepository::new());
    let notifications_repo = Arc::new(InMemoryNotificationRepository::new());
    let analysis_jobs = Arc::new(InMemoryAnalysisJobRepository::new());
    let investigations = Arc::new(InMemoryInvestigationRepository::new());
    let network_metrics = Arc::new(InMemoryNetworkMetricsRepository::new());
    let patterns = Arc::new(InMemoryPatternRepository::new());
    let models = Arc::new(InMemoryModelRepository::new());
    let predictions = Arc::new(InMemoryPredictionRequestRepository::new());
    let training_jobs = Arc::new(InMemoryTrainingJobRepository::new());
    let uploads = Arc::new(InMemoryUploadRepository::new());
    let ingestion_jobs = Arc::new(InMemoryIngestionJobRepository::new());
    let upload_storage = Arc::new(FilesystemObjectStorage::new(PathBuf::from(&config.ingestion.upload_root)));
    let bus = Arc::new(InMemoryMessageBus::new(3));

    // Notification manager.
    let adapters = build_adapters(&config.notifications);
    let limiters = ChannelRateLimiters::new(
        [
            Channel::Email,
            Channel::Sms,
            Channel::Slack,
            Channel::Teams,
            Channel::Webhook,
            Channel::Pagerduty,
        ]
        .into_iter()
        .map(|channel| (channel, config.notifications.limit_for(channel))),
    );
    let manager_settings = ManagerSettings {
        worker_count: config.notifications.worker_count,
        poll_interval_secs: config.notifications.poll_interval_secs,
        retry_queue_capacity: config.notifications.retry_queue_capacity,
        retry_base_delay_ms: config.notifications.retry_base_delay_ms,
        max_retries: config.notifications.max_retries,
        ..ManagerSettings::default()
    };
    let notification_manager = Arc::new(NotificationManager::new(
        notifications_repo.clone(),
        adapters,
        limiters,
        Some(bus.clone() as Arc<dyn aegis_bus::MessageBusProducer>),
        manager_settings,
    ));
    notification_manager.start().await;
    info!("notification manager started");

    // Graph engine.
    let graph_store = Arc::new(InMemoryGraphStore::new());
    let graph_orchestrator = Arc::new(GraphOrchestrator::new(
        graph_store,
        analysis_jobs,
        investigations,
        network_metrics,
        patterns,
        bus.clone() as Arc<dyn aegis_bus::MessageBusProducer>,
        config.graph_engine.clone(),
    ));
    let _ = graph_orchestrator;

    // ML inference and training engines.
    let inference_engine = Arc::new(InferenceEngine::new(models.clone(), predictions, config.inference.clone()));
    let training_engine = Arc::new(TrainingEngine::new(training_jobs, models, config.training.clone()));
    let _ = inference_engine;
    let _ = training_engine;

    // Ingestion pipelines.
    let upload_pipeline = Arc::new(UploadPipeline::new(
        uploads,
        upload_storage,
        bus.clone() as Arc<dyn aegis_bus::MessageBusProducer>,
        config.ingestion.max_upload_size_bytes,
    ));
    let stream_pipeline = Arc::new(StreamIngestionPipeline::new(
        ingestion_jobs,
        bus.clone() as Arc<dyn aegis_bus::MessageBusProducer>,
        config.ingestion.stream_batch_size,
    ));
    let _ = upload_pipeline;
    let _ = stream_pipeline;

    // Scheduler: cron-driven maintenance and escalation handlers.
    let handler_deadline = ChronoDuration::minutes(config.scheduler.handler_deadline_minutes);
    let scheduler = Scheduler::new(handler_deadline);
    let retention = &config.retention;
    let escalation_window = ChronoDuration::minutes(config.scheduler.escalation_window_minutes);

    for (task_id, cron_expression) in &config.scheduler.task_schedules {
        let handler: Arc<dyn aegis_scheduler::TaskHandler> = match task_id.as_str() {
            "alert_cleanup" => Arc::new(AlertCleanupHandler::new(
                alerts.clone(),
                ChronoDuration::days(retention.alert_retention_days as i64),
            )),
            "notification_cleanup" => Arc::new(NotificationCleanupHandler::new(
                notifications_repo.clone(),
                ChronoDuration::days(retention.notification_retention_days as i64),
            )),
            "health_check" => Arc::new(HealthCheckHandler::new(started_at)),
            "escalation_processor" => {
                Arc::new(EscalationProcessorHandler::new(alerts.clone(), audit.clone(), escalation_window))
            }
            "metrics_collection" => Arc::new(MetricsCollectionHandler::new(alerts.clone(), notifications_repo.clone())),
            "pending_notifications_drain" => {
                Arc::new(PendingNotificationsDrainHandler::new(notification_manager.clone(), 50))
            }
            other => {
                tracing::warn!(task = other, "no handler registered for configured task id, skipping");
                continue;
            }
        };
        scheduler.add(task_id.clone(), task_id.clone(), cron_expression.clone(), handler).await?;
    }

    scheduler.start().await;
    info!("scheduler started with {} tasks", config.scheduler.task_schedules.len());

    let shutdown = CancellationToken::new();
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received shutdown signal");
            ctrl_c_shutdown.cancel();
        }
    });

    shutdown.cancelled().await;

    info!("shutting down");
    scheduler.stop().await;
    notification_manager.stop().await;

    Ok(())
}
