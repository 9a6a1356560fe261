//! Entity resolution: ranked matching of a candidate entity against
//! existing entities under a named strategy, plus relationship inference
//! across transactional, temporal, behavioral, and network signals.

use aegis_types::{Entity, Relationship};
use std::collections::HashSet;

/// Matching strategies named in the external contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Per-type keyed equality.
    ExactMatch,
    /// Name-similarity via Levenshtein and Jaro-Winkler.
    FuzzyMatch,
    /// Weighted attribute-wise similarity (Jaccard fallback).
    MlSimilarity,
    /// Exact then fuzzy, best score per matched entity.
    Hybrid,
    /// Transaction-count/amount proximity.
    Behavioral,
}

impl MatchStrategy {
    /// Wire name used in events and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStrategy::ExactMatch => "exact_match",
            MatchStrategy::FuzzyMatch => "fuzzy_match",
            MatchStrategy::MlSimilarity => "ml_similarity",
            MatchStrategy::Hybrid => "hybrid",
            MatchStrategy::Behavioral => "behavioral",
        }
    }
}

/// A single ranked match for a candidate entity.
#[derive(Debug, Clone)]
pub struct EntityMatch {
    /// The existing entity this candidate was matched against.
    pub entity_id: String,
    /// Match confidence in `[0, 1]`.
    pub confidence: f64,
    /// `"exact"`, `"fuzzy"`, `"ml"`, `"behavioral"`.
    pub match_type: &'static str,
}

fn exact_keys(entity: &Entity) -> Option<Vec<&str>> {
    match entity.entity_type.as_str() {
        "person" => Some(vec![
            entity.property_str("first_name")?,
            entity.property_str("last_name")?,
            entity.property_str("date_of_birth")?,
            entity.property_str("ssn")?,
        ]),
        "account" => Some(vec![
            entity.property_str("account_number")?,
            entity.property_str("routing_number")?,
            entity.property_str("iban")?,
        ]),
        "company" => Some(vec![
            entity.property_str("name")?,
            entity.property_str("registration_number")?,
            entity.property_str("tax_id")?,
        ]),
        _ => None,
    }
}

/// Exact per-type keyed equality. Score `1.0`, type `"exact"`.
pub fn exact_match(candidate: &Entity, existing: &[Entity]) -> Vec<EntityMatch> {
    let Some(candidate_keys) = exact_keys(candidate) else {
        return Vec::new();
    };
    existing
        .iter()
        .filter(|e| e.entity_type == candidate.entity_type)
        .filter(|e| exact_keys(e).as_deref() == Some(&candidate_keys))
        .map(|e| EntityMatch {
            entity_id: e.id.clone(),
            confidence: 1.0,
            match_type: "exact",
        })
        .collect()
}

fn display_name(entity: &Entity) -> Option<String> {
    if let (Some(first), Some(last)) = (entity.property_str("first_name"), entity.property_str("last_name")) {
        return Some(format!("{first} {last}"));
    }
    entity.property_str("name").map(str::to_string)
}

/// Name similarity via Levenshtein and Jaro-Winkler, confidence = max of
/// the two, rejected below `0.7`.
pub fn fuzzy_match(candidate: &Entity, existing: &[Entity]) -> Vec<EntityMatch> {
    let Some(candidate_name) = display_name(candidate) else {
        return Vec::new();
    };
    let candidate_name = candidate_name.to_lowercase();

    existing
        .iter()
        .filter(|e| e.entity_type == candidate.entity_type)
        .filter_map(|e| {
            let name = display_name(e)?.to_lowercase();
            let levenshtein = strsim::normalized_levenshtein(&candidate_name, &name);
            let jaro_winkler = strsim::jaro_winkler(&candidate_name, &name);
            let confidence = levenshtein.max(jaro_winkler);
            (confidence >= 0.7).then_some(EntityMatch {
                entity_id: e.id.clone(),
                confidence,
                match_type: "fuzzy",
            })
        })
        .collect()
}

fn tokenize(value: &str) -> HashSet<String> {
    value.to_lowercase().split_whitespace().map(str::to_string).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Attribute-wise similarity averaged across every property both
/// entities define, weighted equally. Each field's similarity is Jaccard
/// on whitespace-tokenized lowercase string values, the fallback named in
/// the design for a simplified ML-similarity model.
pub fn ml_similarity(candidate: &Entity, existing: &[Entity], min_confidence: f64) -> Vec<EntityMatch> {
    existing
        .iter()
        .filter(|e| e.entity_type == candidate.entity_type)
        .filter_map(|e| {
            let shared_keys: Vec<&String> = candidate.properties.keys().filter(|k| e.properties.contains_key(*k)).collect();
            if shared_keys.is_empty() {
                return None;
            }
            let total: f64 = shared_keys
                .iter()
                .map(|key| {
                    let a = candidate.property_str(key).unwrap_or_default();
                    let b = e.property_str(key).unwrap_or_default();
                    jaccard(&tokenize(a), &tokenize(b))
                })
                .sum();
            let confidence = total / shared_keys.len() as f64;
            (confidence >= min_confidence).then_some(EntityMatch {
                entity_id: e.id.clone(),
                confidence,
                match_type: "ml",
            })
        })
        .collect()
}

/// Runs `exact_match` then `fuzzy_match`, keeping the best score per
/// matched entity with weights `1.0` and `0.8` respectively.
pub fn hybrid_match(candidate: &Entity, existing: &[Entity]) -> Vec<EntityMatch> {
    let mut by_entity: std::collections::HashMap<String, EntityMatch> = std::collections::HashMap::new();
    for m in exact_match(candidate, existing) {
        by_entity.insert(m.entity_id.clone(), EntityMatch { confidence: m.confidence * 1.0, ..m });
    }
    for m in fuzzy_match(candidate, existing) {
        let weighted = m.confidence * 0.8;
        by_entity
            .entry(m.entity_id.clone())
            .and_modify(|existing_match| {
                if weighted > existing_match.confidence {
                    existing_match.confidence = weighted;
                    existing_match.match_type = "fuzzy";
                }
            })
            .or_insert(EntityMatch { confidence: weighted, ..m });
    }
    by_entity.into_values().collect()
}

/// Transaction-count and average-amount proximity: `similarity = 1 / (1 +
/// (ΔtxCount + Δamount) / 100)`.
pub fn behavioral_match(candidate: &Entity, existing: &[Entity], min_confidence: f64) -> Vec<EntityMatch> {
    let (Some(candidate_count), Some(candidate_avg)) = (candidate.property("transaction_count").and_then(|v| v.as_f64()), candidate.property("avg_amount").and_then(|v| v.as_f64())) else {
        return Vec::new();
    };

    existing
        .iter()
        .filter(|e| e.entity_type == candidate.entity_type)
        .filter_map(|e| {
            let tx_count = e.property("transaction_count").and_then(|v| v.as_f64())?;
            let avg_amount = e.property("avg_amount").and_then(|v| v.as_f64())?;
            let delta = (candidate_count - tx_count).abs() + (candidate_avg - avg_amount).abs();
            let confidence = 1.0 / (1.0 + delta / 100.0);
            (confidence >= min_confidence).then_some(EntityMatch {
                entity_id: e.id.clone(),
                confidence,
                match_type: "behavioral",
            })
        })
        .collect()
}

/// Resolution outcome for one candidate after selecting its best match.
#[derive(Debug, Clone)]
pub enum ResolutionOutcome {
    /// Matched an existing entity.
    Matched(EntityMatch),
    /// No match cleared `threshold`; the candidate should be admitted as
    /// a new entity.
    NewEntity,
}

/// Runs `strategy` for `candidate`, then selects the single best match
/// (by confidence); below `threshold` the candidate is reported as a new
/// entity.
pub fn resolve_candidate(candidate: &Entity, existing: &[Entity], strategy: MatchStrategy, threshold: f64) -> ResolutionOutcome {
    let mut matches = match strategy {
        MatchStrategy::ExactMatch => exact_match(candidate, existing),
        MatchStrategy::FuzzyMatch => fuzzy_match(candidate, existing),
        MatchStrategy::MlSimilarity => ml_similarity(candidate, existing, 0.0),
        MatchStrategy::Hybrid => hybrid_match(candidate, existing),
        MatchStrategy::Behavioral => behavioral_match(candidate, existing, 0.0),
    };
    matches.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

    match matches.into_iter().next() {
        Some(best) if best.confidence >= threshold => ResolutionOutcome::Matched(best),
        _ => ResolutionOutcome::NewEntity,
    }
}

/// A matched entity id that attracted `>= 2` candidates with confidence
/// `> 0.9`, and should be proposed for a merge review.
#[derive(Debug, Clone)]
pub struct MergeCandidate {
    /// The entity multiple candidates resolved to.
    pub entity_id: String,
    /// Confidence of each contributing candidate match.
    pub contributing_confidences: Vec<f64>,
}

/// Resolves every candidate in `candidates` against `existing`, then
/// flags any matched entity that attracted `>= 2` candidates with
/// confidence `> 0.9` as a merge candidate.
pub fn resolve_batch(candidates: &[Entity], existing: &[Entity], strategy: MatchStrategy, threshold: f64) -> (Vec<(String, ResolutionOutcome)>, Vec<MergeCandidate>) {
    let outcomes: Vec<(String, ResolutionOutcome)> = candidates
        .iter()
        .map(|c| (c.id.clone(), resolve_candidate(c, existing, strategy, threshold)))
        .collect();

    let mut by_matched: std::collections::HashMap<String, Vec<f64>> = std::collections::HashMap::new();
    for (_, outcome) in &outcomes {
        if let ResolutionOutcome::Matched(m) = outcome {
            if m.confidence > 0.9 {
                by_matched.entry(m.entity_id.clone()).or_default().push(m.confidence);
            }
        }
    }

    let merges = by_matched
        .into_iter()
        .filter(|(_, confidences)| confidences.len() >= 2)
        .map(|(entity_id, contributing_confidences)| MergeCandidate { entity_id, contributing_confidences })
        .collect();

    (outcomes, merges)
}

/// A relationship inferred between two entities that has no direct
/// transaction edge recorded between them.
#[derive(Debug, Clone)]
pub struct InferredRelationship {
    /// Source entity id.
    pub source: String,
    /// Target entity id.
    pub target: String,
    /// Inferred relationship kind.
    pub relationship_type: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Strategy that produced this inference.
    pub strategy: &'static str,
    /// Human-readable evidence items that contributed to confidence.
    pub evidence: Vec<String>,
}

fn neighbors_of<'a>(entity_id: &str, relationships: &'a [Relationship]) -> HashSet<&'a str> {
    relationships
        .iter()
        .filter_map(|r| {
            if r.source == entity_id {
                Some(r.target.as_str())
            } else if r.target == entity_id {
                Some(r.source.as_str())
            } else {
                None
            }
        })
        .collect()
}

/// Two entities that both transact heavily with the same third parties
/// are inferred to be `"associated_with"`.
pub fn infer_transactional(entities: &[Entity], relationships: &[Relationship]) -> Vec<InferredRelationship> {
    let mut out = Vec::new();
    for i in 0..entities.len() {
        for j in (i + 1)..entities.len() {
            let a = &entities[i];
            let b = &entities[j];
            let neighbors_a = neighbors_of(&a.id, relationships);
            let neighbors_b = neighbors_of(&b.id, relationships);
            let shared = neighbors_a.intersection(&neighbors_b).count();
            if shared == 0 {
                continue;
            }
            let confidence = (shared as f64 / 5.0).min(1.0);
            out.push(InferredRelationship {
                source: a.id.clone(),
                target: b.id.clone(),
                relationship_type: "associated_with".to_string(),
                confidence,
                strategy: "transactional",
                evidence: vec![format!("{shared} shared counterparties")],
            });
        }
    }
    out
}

/// Entities that transact on a recurring schedule with each other are
/// inferred to have a `"recurring_counterparty"` relationship.
pub fn infer_temporal(relationships: &[Relationship]) -> Vec<InferredRelationship> {
    use std::collections::HashMap;
    let mut by_pair: HashMap<(&str, &str), Vec<chrono::DateTime<chrono::Utc>>> = HashMap::new();
    for rel in relationships {
        if let Some(ts) = rel.timestamp() {
            by_pair.entry((rel.source.as_str(), rel.target.as_str())).or_default().push(ts);
        }
    }

    let mut out = Vec::new();
    for ((source, target), mut timestamps) in by_pair {
        if timestamps.len() < 3 {
            continue;
        }
        timestamps.sort();
        let gaps: Vec<f64> = timestamps.windows(2).map(|w| (w[1] - w[0]).num_hours() as f64).collect();
        let mean_gap = gaps.iter().sum::<f64>() / gaps.len() as f64;
        if mean_gap <= 0.0 {
            continue;
        }
        let variance = gaps.iter().map(|g| (g - mean_gap).powi(2)).sum::<f64>() / gaps.len() as f64;
        let regularity = 1.0 - (variance.sqrt() / mean_gap).min(1.0);
        if regularity < 0.5 {
            continue;
        }
        out.push(InferredRelationship {
            source: source.to_string(),
            target: target.to_string(),
            relationship_type: "recurring_counterparty".to_string(),
            confidence: regularity,
            strategy: "temporal",
            evidence: vec![format!("{} transactions at roughly {mean_gap:.1}h intervals", timestamps.len())],
        });
    }
    out
}

/// Entities with closely matching transaction-count/amount profiles are
/// inferred to have a `"similar_behavior"` relationship.
pub fn infer_behavioral(entities: &[Entity]) -> Vec<InferredRelationship> {
    let mut out = Vec::new();
    for i in 0..entities.len() {
        for j in (i + 1)..entities.len() {
            let a = &entities[i];
            let b = &entities[j];
            let matches = behavioral_match(a, std::slice::from_ref(b), 0.0);
            if let Some(m) = matches.into_iter().next() {
                out.push(InferredRelationship {
                    source: a.id.clone(),
                    target: b.id.clone(),
                    relationship_type: "similar_behavior".to_string(),
                    confidence: m.confidence,
                    strategy: "behavioral",
                    evidence: vec!["comparable transaction count and average amount".to_string()],
                });
            }
        }
    }
    out
}

/// Entities whose counterparty sets substantially overlap are inferred
/// to be `"network_affiliated"`, scored by Jaccard similarity of their
/// neighbor sets.
pub fn infer_network(entities: &[Entity], relationships: &[Relationship]) -> Vec<InferredRelationship> {
    let mut out = Vec::new();
    for i in 0..entities.len() {
        for j in (i + 1)..entities.len() {
            let a = &entities[i];
            let b = &entities[j];
            let neighbors_a: HashSet<String> = neighbors_of(&a.id, relationships).into_iter().map(str::to_string).collect();
            let neighbors_b: HashSet<String> = neighbors_of(&b.id, relationships).into_iter().map(str::to_string).collect();
            let similarity = jaccard(&neighbors_a, &neighbors_b);
            if similarity <= 0.0 {
                continue;
            }
            out.push(InferredRelationship {
                source: a.id.clone(),
                target: b.id.clone(),
                relationship_type: "network_affiliated".to_string(),
                confidence: similarity,
                strategy: "network",
                evidence: vec![format!("neighbor-set Jaccard similarity {similarity:.2}")],
            });
        }
    }
    out
}

/// Runs all four inference strategies and filters results below
/// `min_confidence`.
pub fn infer_relationships(entities: &[Entity], relationships: &[Relationship], min_confidence: f64) -> Vec<InferredRelationship> {
    let mut out = Vec::new();
    out.extend(infer_transactional(entities, relationships));
    out.extend(infer_temporal(relationships));
    out.extend(infer_behavioral(entities));
    out.extend(infer_network(entities, relationships));
    out.retain(|r| r.confidence >= min_confidence);
    out
}

/// Count of `inferred` with confidence `> 0.8`, reported as "high
/// confidence" in the external contract.
pub fn high_confidence_count(inferred: &[InferredRelationship]) -> usize {
    inferred.iter().filter(|r| r.confidence > 0.8).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::JsonValue;
    use std::collections::BTreeMap;

    fn person(id: &str, first: &str, last: &str, dob: &str, ssn: &str) -> Entity {
        let mut properties = BTreeMap::new();
        properties.insert("first_name".to_string(), JsonValue::from(first));
        properties.insert("last_name".to_string(), JsonValue::from(last));
        properties.insert("date_of_birth".to_string(), JsonValue::from(dob));
        properties.insert("ssn".to_string(), JsonValue::from(ssn));
        Entity {
            id: id.to_string(),
            entity_type: "person".to_string(),
            properties,
        }
    }

    #[test]
    fn exact_match_requires_full_key_equality() {
        let candidate = person("c1", "Jane", "Doe", "1990-01-01", "123-45-6789");
        let existing = vec![person("e1", "Jane", "Doe", "1990-01-01", "123-45-6789")];
        let matches = exact_match(&candidate, &existing);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].confidence, 1.0);
        assert_eq!(matches[0].match_type, "exact");
    }

    #[test]
    fn exact_match_rejects_partial_equality() {
        let candidate = person("c1", "Jane", "Doe", "1990-01-01", "123-45-6789");
        let existing = vec![person("e1", "Jane", "Doe", "1990-01-01", "999-99-9999")];
        assert!(exact_match(&candidate, &existing).is_empty());
    }

    #[test]
    fn fuzzy_match_rejects_below_threshold() {
        let candidate = person("c1", "Jane", "Doe", "", "");
        let existing = vec![person("e1", "John", "Smith", "", "")];
        assert!(fuzzy_match(&candidate, &existing).is_empty());
    }

    #[test]
    fn resolve_candidate_falls_back_to_new_entity_below_threshold() {
        let candidate = person("c1", "Jane", "Doe", "1990-01-01", "123-45-6789");
        let existing = vec![person("e1", "Janet", "Doerr", "1985-05-05", "000-00-0000")];
        let outcome = resolve_candidate(&candidate, &existing, MatchStrategy::ExactMatch, 1.0);
        assert!(matches!(outcome, ResolutionOutcome::NewEntity));
    }

    #[test]
    fn resolve_batch_flags_merge_when_two_candidates_match_same_entity() {
        let target = person("e1", "Jane", "Doe", "1990-01-01", "123-45-6789");
        let c1 = person("c1", "Jane", "Doe", "1990-01-01", "123-45-6789");
        let c2 = person("c2", "Jane", "Doe", "1990-01-01", "123-45-6789");
        let (_, merges) = resolve_batch(&[c1, c2], &[target], MatchStrategy::ExactMatch, 0.5);
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].entity_id, "e1");
    }
}
