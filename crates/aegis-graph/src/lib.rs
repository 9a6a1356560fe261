//! Subgraph analysis orchestration for AegisShield: graph storage,
//! path finding, centrality, community detection, pattern detection,
//! and entity resolution.

pub mod centrality;
pub mod client;
pub mod communities;
pub mod error;
pub mod orchestrator;
pub mod patterns;
pub mod paths;
pub mod resolver;

pub use client::{GraphStore, InMemoryGraphStore, SubGraph};
pub use communities::{community_density, community_sizes, detect_communities};
pub use error::{Error, Result};
pub use orchestrator::{AnalysisRequest, AnalysisResult, GraphOrchestrator, Insight, Severity};
pub use patterns::PatternDetectionResult;
pub use paths::{find_paths, Path};
pub use resolver::{
    behavioral_match, exact_match, fuzzy_match, high_confidence_count, hybrid_match,
    infer_behavioral, infer_network, infer_relationships, infer_temporal, infer_transactional,
    ml_similarity, resolve_batch, resolve_candidate, EntityMatch, InferredRelationship,
    MatchStrategy, MergeCandidate, ResolutionOutcome,
};

pub use centrality::calculate_network_metrics;
