//! Semaphore-bounded subgraph analysis orchestration: job lifecycle,
//! sub-analysis fan-out with isolated failure handling, insight
//! generation, and event emission.

use crate::centrality::calculate_network_metrics;
use crate::client::{GraphStore, SubGraph};
use crate::communities::{community_density, community_sizes, detect_communities};
use crate::error::{Error, Result};
use crate::patterns::{self, PatternDetectionResult};
use crate::paths::{find_paths, Path};
use aegis_bus::{AnalysisCompletedEvent, BusEvent, Headers, InvestigationCreatedEvent, MessageBusProducer};
use aegis_config::GraphEngineConfig;
use aegis_repositories::{AnalysisJobRepository, InvestigationRepository, NetworkMetricsRepository, PatternRepository};
use aegis_types::{AnalysisJob, Entity, Investigation, JsonValue, NetworkMetrics, PatternType};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

/// Severity tier attached to a generated [`Insight`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Notable but not urgent.
    Medium,
    /// Warrants immediate attention.
    High,
}

/// A derived observation surfaced alongside an analysis's raw results.
#[derive(Debug, Clone)]
pub struct Insight {
    /// Stable kind, e.g. `"high_centrality"`, `"suspicious_pattern"`, `"dense_cluster"`.
    pub kind: &'static str,
    /// Severity tier.
    pub severity: Severity,
    /// Human-readable summary.
    pub message: String,
    /// Entity this insight concerns, if any.
    pub entity_id: Option<String>,
}

/// Options selecting which sub-analyses `analyze_sub_graph` runs, with
/// `None` falling back to the engine's configured defaults.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    /// Entity the subgraph is extracted from.
    pub entity_id: String,
    /// Traversal depth; defaults to `config.max_traversal_depth`.
    pub max_depth: Option<u32>,
    /// Whether to run path finding from `entity_id` to `path_targets`.
    pub include_paths: bool,
    /// Targets for path finding, if `include_paths`.
    pub path_targets: Vec<String>,
    /// Maximum path length; defaults to `config.max_path_length`.
    pub max_path_length: Option<u32>,
    /// Minimum path confidence; defaults to `config.min_path_confidence`.
    pub min_path_confidence: Option<f64>,
    /// Whether to compute centrality metrics over the extracted subgraph.
    pub include_centrality: bool,
    /// Whether to run community detection over the extracted subgraph.
    pub include_communities: bool,
    /// Whether to run the pattern detector over the extracted subgraph.
    pub include_patterns: bool,
    /// Pattern types to run; empty means every type.
    pub pattern_types: Vec<PatternType>,
    /// Minimum pattern confidence; defaults to `config.min_pattern_confidence`.
    pub min_pattern_confidence: Option<f64>,
    /// Actor submitting the analysis.
    pub created_by: String,
}

impl AnalysisRequest {
    fn to_parameters(&self) -> JsonValue {
        let mut object = JsonValue::empty_object();
        object.insert("entity_id", JsonValue::from(self.entity_id.as_str()));
        object.insert("include_paths", JsonValue::from(self.include_paths));
        object.insert("include_centrality", JsonValue::from(self.include_centrality));
        object.insert("include_communities", JsonValue::from(self.include_communities));
        object.insert("include_patterns", JsonValue::from(self.include_patterns));
        object
    }
}

/// Composite result of a single `analyze_sub_graph` run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    /// Entities and relationships the analysis covered.
    pub subgraph: SubGraph,
    /// Shortest paths, if requested.
    pub paths: Option<Vec<Path>>,
    /// Computed centrality metrics, if requested.
    pub network_metrics: Option<Vec<NetworkMetrics>>,
    /// Detected patterns, if requested.
    pub patterns: Option<PatternDetectionResult>,
    /// Community assignment per entity id, if requested.
    pub communities: Option<HashMap<String, String>>,
    /// Derived insights over the above.
    pub insights: Vec<Insight>,
}

/// Default reporting threshold (USD) used by the smurfing/structuring
/// detectors when a request doesn't override it.
const DEFAULT_REPORTING_THRESHOLD: f64 = 10_000.0;
/// Default minimum grouped-transaction count before a smurfing/structuring
/// candidate is considered.
const DEFAULT_MIN_TRANSACTIONS: usize = 5;
/// Default window, in hours, for rapid-movement and kiting detection.
const DEFAULT_WINDOW_HOURS: i64 = 24;

fn run_requested_detectors(subgraph: &SubGraph, pattern_types: &[PatternType], min_confidence: f64, now: chrono::DateTime<Utc>) -> PatternDetectionResult {
    let all_types = pattern_types.is_empty();
    let wants = |pt: PatternType| all_types || pattern_types.contains(&pt);

    let mut combined = PatternDetectionResult::default();
    let mut merge = |mut result: PatternDetectionResult| {
        combined.patterns.append(&mut result.patterns);
    };

    if wants(PatternType::Smurfing) {
        merge(patterns::detect_smurfing(subgraph, DEFAULT_REPORTING_THRESHOLD, DEFAULT_MIN_TRANSACTIONS, min_confidence, now));
    }
    if wants(PatternType::Structuring) {
        merge(patterns::detect_structuring(subgraph, DEFAULT_REPORTING_THRESHOLD, DEFAULT_MIN_TRANSACTIONS, min_confidence, now));
    }
    if wants(PatternType::CircularFlow) {
        merge(patterns::detect_circular_flow(subgraph, 8, min_confidence, now));
    }
    if wants(PatternType::RapidMovement) {
        merge(patterns::detect_rapid_movement(subgraph, DEFAULT_WINDOW_HOURS, min_confidence, now));
    }
    if wants(PatternType::ShellCompany) {
        merge(patterns::detect_shell_company(subgraph, min_confidence, now));
    }
    if wants(PatternType::MuleAccount) {
        merge(patterns::detect_mule_account(subgraph, min_confidence, now));
    }
    if wants(PatternType::KitingScheme) {
        merge(patterns::detect_kiting_scheme(subgraph, DEFAULT_WINDOW_HOURS, min_confidence, now));
    }

    combined.high_risk_count = combined.patterns.iter().filter(|p| p.confidence > 0.8).count();
    combined
}

fn generate_insights(
    subgraph: &SubGraph,
    network_metrics: Option<&[NetworkMetrics]>,
    patterns: Option<&PatternDetectionResult>,
    communities: Option<&HashMap<String, String>>,
    config: &GraphEngineConfig,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    let n = subgraph.entities.len();

    if let Some(metrics) = network_metrics {
        let denominator = (n.saturating_sub(1)).max(1) as f64;
        for m in metrics {
            let normalized_degree = m.degree / denominator;
            if normalized_degree > config.centrality_threshold {
                insights.push(Insight {
                    kind: "high_centrality",
                    severity: Severity::Medium,
                    message: format!("entity {} has normalized degree centrality {normalized_degree:.2}", m.entity_id),
                    entity_id: Some(m.entity_id.clone()),
                });
            }
        }
    }

    if let Some(result) = patterns {
        for pattern in &result.patterns {
            if pattern.confidence > config.anomaly_threshold {
                insights.push(Insight {
                    kind: "suspicious_pattern",
                    severity: Severity::High,
                    message: format!("{:?} pattern with confidence {:.2}", pattern.pattern_type, pattern.confidence),
                    entity_id: pattern.involved_entities.first().cloned(),
                });
            }
        }
    }

    if let Some(assignments) = communities {
        let sizes = community_sizes(assignments);
        let mut seen = HashSet::new();
        for community_id in assignments.values() {
            if !seen.insert(community_id.clone()) {
                continue;
            }
            let size = sizes.get(community_id).copied().unwrap_or(0);
            if size > 5 {
                let density = community_density(subgraph, assignments, community_id);
                if density > config.clustering_threshold {
                    insights.push(Insight {
                        kind: "dense_cluster",
                        severity: Severity::Medium,
                        message: format!("community {community_id} has {size} members at density {density:.2}"),
                        entity_id: None,
                    });
                }
            }
        }
    }

    insights
}

/// Bounds concurrent `analyze_sub_graph` runs and orchestrates every
/// graph sub-analysis behind a single composite contract.
pub struct GraphOrchestrator {
    store: Arc<dyn GraphStore>,
    jobs: Arc<dyn AnalysisJobRepository>,
    investigations: Arc<dyn InvestigationRepository>,
    network_metrics_repo: Arc<dyn NetworkMetricsRepository>,
    patterns_repo: Arc<dyn PatternRepository>,
    bus: Arc<dyn MessageBusProducer>,
    semaphore: Arc<Semaphore>,
    config: GraphEngineConfig,
}

impl GraphOrchestrator {
    /// Construct an orchestrator bounding concurrent analyses to
    /// `config.max_concurrent_analyses`.
    pub fn new(
        store: Arc<dyn GraphStore>,
        jobs: Arc<dyn AnalysisJobRepository>,
        investigations: Arc<dyn InvestigationRepository>,
        network_metrics_repo: Arc<dyn NetworkMetricsRepository>,
        patterns_repo: Arc<dyn PatternRepository>,
        bus: Arc<dyn MessageBusProducer>,
        config: GraphEngineConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_analyses));
        Self {
            store,
            jobs,
            investigations,
            network_metrics_repo,
            patterns_repo,
            bus,
            semaphore,
            config,
        }
    }

    /// Acquires a semaphore slot (capacity = `max_concurrent_analyses`),
    /// runs the sub-analyses the request selects, and persists the job
    /// through to `completed` or `failed`. Fails immediately with
    /// [`Error::Cancelled`] if `cancellation` fires before a slot is
    /// acquired.
    pub async fn analyze_sub_graph(&self, request: AnalysisRequest, cancellation: CancellationToken) -> Result<AnalysisJob> {
        let _permit = tokio::select! {
            permit = self.semaphore.clone().acquire_owned() => permit.map_err(|_| Error::Cancelled("semaphore closed".to_string()))?,
            () = cancellation.cancelled() => return Err(Error::Cancelled("cancelled before semaphore acquisition".to_string())),
        };

        let job_id = Uuid::new_v4().to_string();
        let mut job = AnalysisJob::new(job_id, "subgraph", request.to_parameters(), request.created_by.clone());
        job.mark_processing(Utc::now());
        self.jobs.save(job.clone()).await?;

        let max_depth = request.max_depth.unwrap_or(self.config.max_traversal_depth);
        let subgraph = match self.store.neighborhood(&request.entity_id, max_depth).await {
            Ok(subgraph) => subgraph,
            Err(err) => {
                job.mark_failed(err.to_string(), Utc::now());
                self.jobs.save(job.clone()).await?;
                return Err(err);
            }
        };

        let mut result = AnalysisResult {
            subgraph: subgraph.clone(),
            ..Default::default()
        };

        if request.include_paths {
            let max_path_length = request.max_path_length.unwrap_or(self.config.max_path_length);
            let min_path_confidence = request.min_path_confidence.unwrap_or(self.config.min_path_confidence);
            match find_paths(self.store.as_ref(), &[request.entity_id.clone()], &request.path_targets, max_path_length, min_path_confidence).await {
                Ok(paths) => result.paths = Some(paths),
                Err(err) => warn!(job_id = %job.id, error = %err, "path finding failed, omitting from result"),
            }
        }

        if request.include_centrality {
            let now = Utc::now();
            let metrics = calculate_network_metrics(&subgraph, now);
            for metric in &metrics {
                if let Err(err) = self.network_metrics_repo.upsert(metric.clone()).await {
                    warn!(job_id = %job.id, entity_id = %metric.entity_id, error = %err, "failed to persist network metrics");
                }
            }
            result.network_metrics = Some(metrics);
        }

        if request.include_communities {
            result.communities = Some(detect_communities(&subgraph));
        }

        if request.include_patterns {
            let min_pattern_confidence = request.min_pattern_confidence.unwrap_or(self.config.min_pattern_confidence);
            let now = Utc::now();
            let detected = run_requested_detectors(&subgraph, &request.pattern_types, min_pattern_confidence, now);
            for pattern in &detected.patterns {
                if let Err(err) = self.patterns_repo.save(pattern.clone()).await {
                    warn!(job_id = %job.id, pattern_id = %pattern.id, error = %err, "failed to persist detected pattern");
                }
            }
            result.patterns = Some(detected);
        }

        result.insights = generate_insights(&subgraph, result.network_metrics.as_deref(), result.patterns.as_ref(), result.communities.as_ref(), &self.config);

        let mut results_json = JsonValue::empty_object();
        results_json.insert("entity_count", JsonValue::from(subgraph.entities.len() as f64));
        results_json.insert("relationship_count", JsonValue::from(subgraph.relationships.len() as f64));
        results_json.insert("insight_count", JsonValue::from(result.insights.len() as f64));
        job.mark_completed(results_json, Utc::now());
        self.jobs.save(job.clone()).await?;

        self.bus
            .publish(
                BusEvent::AnalysisCompleted(AnalysisCompletedEvent {
                    job_id: job.id.clone(),
                    job_type: job.job_type.clone(),
                    entity_ids: subgraph.entity_ids(),
                    timestamp: Utc::now(),
                }),
                Headers::new(),
            )
            .await?;

        Ok(job)
    }

    /// Shortest paths up to `max_length` between `sources` and `targets`.
    pub async fn find_paths(&self, sources: &[String], targets: &[String], max_length: Option<u32>, min_confidence: Option<f64>) -> Result<Vec<Path>> {
        find_paths(
            self.store.as_ref(),
            sources,
            targets,
            max_length.unwrap_or(self.config.max_path_length),
            min_confidence.unwrap_or(self.config.min_path_confidence),
        )
        .await
    }

    /// Opens a new investigation and publishes an `investigation_created`
    /// event.
    pub async fn create_investigation(&self, name: String, priority: u32, member_entity_ids: HashSet<String>, created_by: String) -> Result<Investigation> {
        let now = Utc::now();
        let investigation = Investigation {
            id: Uuid::new_v4().to_string(),
            name,
            status: "open".to_string(),
            priority,
            member_entity_ids: member_entity_ids.clone(),
            created_at: now,
            updated_at: now,
            created_by: created_by.clone(),
            assigned_to: None,
        };
        self.investigations.save(investigation.clone()).await?;
        self.bus
            .publish(
                BusEvent::InvestigationCreated(InvestigationCreatedEvent {
                    investigation_id: investigation.id.clone(),
                    created_by,
                    member_entity_ids: member_entity_ids.into_iter().collect(),
                    timestamp: now,
                }),
                Headers::new(),
            )
            .await?;
        Ok(investigation)
    }

    /// Fetches an investigation by id.
    pub async fn get_investigation(&self, id: &str) -> Result<Investigation> {
        Ok(self.investigations.get(id).await?)
    }

    /// Entities and relationships reachable from `entity_id` within
    /// `max_depth` hops.
    pub async fn get_entity_neighborhood(&self, entity_id: &str, max_depth: u32) -> Result<SubGraph> {
        Ok(self.store.neighborhood(entity_id, max_depth).await?)
    }

    /// Computes and persists centrality metrics for `entity_id`'s
    /// neighborhood.
    pub async fn calculate_network_metrics(&self, entity_id: &str, max_depth: u32) -> Result<Vec<NetworkMetrics>> {
        let subgraph = self.store.neighborhood(entity_id, max_depth).await?;
        let metrics = calculate_network_metrics(&subgraph, Utc::now());
        for metric in &metrics {
            self.network_metrics_repo.upsert(metric.clone()).await?;
        }
        Ok(metrics)
    }
}

/// Entities/relationships helper exposed for callers that only need raw
/// entity lookups without going through the orchestrator.
pub async fn load_entity(store: &dyn GraphStore, id: &str) -> Result<Entity> {
    Ok(store.get_entity(id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryGraphStore;
    use aegis_bus::InMemoryMessageBus;
    use aegis_repositories::{InMemoryAnalysisJobRepository, InMemoryInvestigationRepository, InMemoryNetworkMetricsRepository, InMemoryPatternRepository};
    use std::collections::BTreeMap;

    fn entity(id: &str) -> Entity {
        Entity {
            id: id.to_string(),
            entity_type: "account".to_string(),
            properties: BTreeMap::new(),
        }
    }

    fn edge(source: &str, target: &str) -> aegis_types::Relationship {
        aegis_types::Relationship {
            source: source.to_string(),
            target: target.to_string(),
            relationship_type: "transfer".to_string(),
            properties: BTreeMap::new(),
        }
    }

    async fn orchestrator() -> GraphOrchestrator {
        let store = Arc::new(InMemoryGraphStore::new());
        for id in ["a", "b", "c"] {
            store.upsert_entity(entity(id)).await.unwrap();
        }
        store.upsert_relationship(edge("a", "b")).await.unwrap();
        store.upsert_relationship(edge("b", "c")).await.unwrap();

        GraphOrchestrator::new(
            store,
            Arc::new(InMemoryAnalysisJobRepository::new()),
            Arc::new(InMemoryInvestigationRepository::new()),
            Arc::new(InMemoryNetworkMetricsRepository::new()),
            Arc::new(InMemoryPatternRepository::new()),
            Arc::new(InMemoryMessageBus::new(3)),
            GraphEngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn analyze_sub_graph_completes_and_publishes_event() {
        let orchestrator = orchestrator().await;
        let request = AnalysisRequest {
            entity_id: "a".to_string(),
            include_centrality: true,
            created_by: "analyst".to_string(),
            ..Default::default()
        };
        let job = orchestrator.analyze_sub_graph(request, CancellationToken::new()).await.unwrap();
        assert_eq!(job.status, aegis_types::JobStatus::Completed);
        assert!(job.completed_at.unwrap() >= job.started_at.unwrap());
    }

    #[tokio::test]
    async fn analyze_sub_graph_fails_job_on_cancellation_before_acquisition() {
        let orchestrator = orchestrator().await;
        let token = CancellationToken::new();
        token.cancel();
        let request = AnalysisRequest {
            entity_id: "a".to_string(),
            created_by: "analyst".to_string(),
            ..Default::default()
        };
        let err = orchestrator.analyze_sub_graph(request, token).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
    }

    #[tokio::test]
    async fn bounded_concurrency_caps_in_flight_analyses() {
        let store = Arc::new(InMemoryGraphStore::new());
        for id in ["a", "b"] {
            store.upsert_entity(entity(id)).await.unwrap();
        }
        let mut config = GraphEngineConfig::default();
        config.max_concurrent_analyses = 1;
        let orchestrator = Arc::new(GraphOrchestrator::new(
            store,
            Arc::new(InMemoryAnalysisJobRepository::new()),
            Arc::new(InMemoryInvestigationRepository::new()),
            Arc::new(InMemoryNetworkMetricsRepository::new()),
            Arc::new(InMemoryPatternRepository::new()),
            Arc::new(InMemoryMessageBus::new(3)),
            config,
        ));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let orchestrator = orchestrator.clone();
            handles.push(tokio::spawn(async move {
                let request = AnalysisRequest {
                    entity_id: "a".to_string(),
                    created_by: "analyst".to_string(),
                    ..Default::default()
                };
                orchestrator.analyze_sub_graph(request, CancellationToken::new()).await
            }));
        }

        for handle in handles {
            let job = handle.await.unwrap().unwrap();
            assert_eq!(job.status, aegis_types::JobStatus::Completed);
        }
    }
}
