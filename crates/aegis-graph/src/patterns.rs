//! Typed pattern detectors: each applies a per-type confidence rubric to
//! a time-windowed graph slice and reports patterns whose confidence
//! clears the configured threshold, with `risk_score = min(100, 100 *
//! confidence * multiplier)`.

use crate::client::SubGraph;
use aegis_types::{Entity, Pattern, PatternType, Relationship};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Result of a pattern-detection pass: every pattern clearing the
/// confidence threshold, plus a count of how many are "high risk"
/// (confidence > 0.8).
#[derive(Debug, Clone, Default)]
pub struct PatternDetectionResult {
    /// Patterns detected, one per type/grouping that cleared the
    /// confidence threshold.
    pub patterns: Vec<Pattern>,
    /// Count of `patterns` with `confidence > 0.8`.
    pub high_risk_count: usize,
}

fn finalize(mut patterns: Vec<Pattern>, min_confidence: f64) -> PatternDetectionResult {
    patterns.retain(|p| p.confidence >= min_confidence);
    let high_risk_count = patterns.iter().filter(|p| p.confidence > 0.8).count();
    PatternDetectionResult { patterns, high_risk_count }
}

fn new_pattern(pattern_type: PatternType, confidence: f64, involved_entities: Vec<String>, indicators: Vec<String>, now: DateTime<Utc>) -> Pattern {
    let confidence = confidence.clamp(0.0, 1.0);
    Pattern {
        id: Uuid::new_v4().to_string(),
        pattern_type,
        confidence,
        risk_score: Pattern::risk_score_for(confidence, pattern_type),
        involved_entities,
        indicators,
        detected_at: now,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m <= 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / m
}

struct PairGroup<'a> {
    source: &'a str,
    target: &'a str,
    amounts: Vec<f64>,
}

fn group_by_pair(relationships: &[Relationship]) -> Vec<PairGroup<'_>> {
    let mut groups: HashMap<(&str, &str), Vec<f64>> = HashMap::new();
    for rel in relationships {
        if let Some(amount) = rel.amount() {
            groups.entry((rel.source.as_str(), rel.target.as_str())).or_default().push(amount);
        }
    }
    groups
        .into_iter()
        .map(|((source, target), amounts)| PairGroup { source, target, amounts })
        .collect()
}

/// Transaction-count/just-below-threshold/consistency rubric shared by
/// `smurfing` (pairwise) and `structuring` (per-source).
fn count_threshold_confidence(count: usize, amounts: &[f64], reporting_threshold: f64, min_transactions: usize) -> Option<(f64, Vec<String>)> {
    if count < min_transactions {
        return None;
    }
    let mut confidence = 0.0;
    let mut indicators = Vec::new();

    if count >= 10 {
        confidence += 0.4;
        indicators.push(format!("{count} transactions (>=10 bucket)"));
    } else if count >= 5 {
        confidence += 0.25;
        indicators.push(format!("{count} transactions (>=5 bucket)"));
    }

    let avg = mean(amounts);
    if avg >= reporting_threshold * 0.9 && avg < reporting_threshold {
        confidence += 0.3;
        indicators.push(format!("average amount {avg:.2} just below reporting threshold {reporting_threshold:.2}"));
    }

    let cv = coefficient_of_variation(amounts);
    if cv < 0.1 {
        confidence += 0.3;
        indicators.push(format!("very consistent amounts (cv={cv:.3})"));
    } else if cv < 0.2 {
        confidence += 0.2;
        indicators.push(format!("consistent amounts (cv={cv:.3})"));
    }

    Some((confidence.min(1.0), indicators))
}

/// Many small transactions between the same pair of entities, each
/// staying under `reporting_threshold`.
pub fn detect_smurfing(subgraph: &SubGraph, reporting_threshold: f64, min_transactions: usize, min_confidence: f64, now: DateTime<Utc>) -> PatternDetectionResult {
    let mut patterns = Vec::new();
    for group in group_by_pair(&subgraph.relationships) {
        if let Some((confidence, indicators)) = count_threshold_confidence(group.amounts.len(), &group.amounts, reporting_threshold, min_transactions) {
            patterns.push(new_pattern(
                PatternType::Smurfing,
                confidence,
                vec![group.source.to_string(), group.target.to_string()],
                indicators,
                now,
            ));
        }
    }
    finalize(patterns, min_confidence)
}

/// Transactions split across several counterparties to stay under
/// `reporting_threshold`, aggregated by the originating entity.
pub fn detect_structuring(subgraph: &SubGraph, reporting_threshold: f64, min_transactions: usize, min_confidence: f64, now: DateTime<Utc>) -> PatternDetectionResult {
    let mut by_source: HashMap<&str, Vec<f64>> = HashMap::new();
    let mut counterparties: HashMap<&str, HashSet<&str>> = HashMap::new();
    for rel in &subgraph.relationships {
        if let Some(amount) = rel.amount() {
            by_source.entry(rel.source.as_str()).or_default().push(amount);
            counterparties.entry(rel.source.as_str()).or_default().insert(rel.target.as_str());
        }
    }

    let mut patterns = Vec::new();
    for (source, amounts) in &by_source {
        if counterparties.get(source).map(HashSet::len).unwrap_or(0) < 2 {
            continue;
        }
        if let Some((confidence, indicators)) = count_threshold_confidence(amounts.len(), amounts, reporting_threshold, min_transactions) {
            let mut involved = vec![source.to_string()];
            involved.extend(counterparties[source].iter().map(|c| c.to_string()));
            patterns.push(new_pattern(PatternType::Structuring, confidence, involved, indicators, now));
        }
    }
    finalize(patterns, min_confidence)
}

fn entity_property<'a>(entities: &'a [Entity], id: &str, key: &str) -> Option<&'a str> {
    entities.iter().find(|e| e.id == id)?.property_str(key)
}

/// Funds routed through several intermediaries, scored by path length and
/// counterparty/institution diversity along the chain.
pub fn detect_layering(subgraph: &SubGraph, chains: &[Vec<Relationship>], min_confidence: f64, now: DateTime<Utc>) -> PatternDetectionResult {
    let mut patterns = Vec::new();
    for chain in chains {
        if chain.is_empty() {
            continue;
        }
        let mut entity_ids: Vec<String> = vec![chain[0].source.clone()];
        entity_ids.extend(chain.iter().map(|r| r.target.clone()));

        let countries: HashSet<&str> = entity_ids.iter().filter_map(|id| entity_property(&subgraph.entities, id, "country")).collect();
        let institutions: HashSet<&str> = entity_ids.iter().filter_map(|id| entity_property(&subgraph.entities, id, "institution")).collect();

        let path_length = chain.len();
        let country_diversity = countries.len();
        let institution_diversity = institutions.len();

        let mut confidence = 0.0;
        let mut indicators = Vec::new();

        if path_length >= 6 {
            confidence += 0.4;
            indicators.push(format!("path length {path_length} (>=6 bucket)"));
        } else if path_length >= 4 {
            confidence += 0.25;
            indicators.push(format!("path length {path_length} (>=4 bucket)"));
        }

        if country_diversity >= 4 {
            confidence += 0.3;
        } else if country_diversity >= 3 {
            confidence += 0.2;
        } else if country_diversity >= 2 {
            confidence += 0.1;
        }
        if country_diversity >= 2 {
            indicators.push(format!("{country_diversity} distinct countries"));
        }

        if institution_diversity >= 4 {
            confidence += 0.3;
        } else if institution_diversity >= 3 {
            confidence += 0.2;
        }
        if institution_diversity >= 3 {
            indicators.push(format!("{institution_diversity} distinct institutions"));
        }

        if (path_length * country_diversity) > 15 {
            confidence += 0.2;
            indicators.push("complexity bonus: path length x country diversity > 15".to_string());
        }

        patterns.push(new_pattern(PatternType::Layering, confidence.min(1.0), entity_ids, indicators, now));
    }
    finalize(patterns, min_confidence)
}

/// Simple directed cycles up to `max_length` steps, starting and ending
/// at the same entity, discovered by depth-first search.
fn find_cycles(subgraph: &SubGraph, max_length: u32) -> Vec<Vec<Relationship>> {
    let mut adjacency: HashMap<&str, Vec<&Relationship>> = HashMap::new();
    for rel in &subgraph.relationships {
        adjacency.entry(rel.source.as_str()).or_default().push(rel);
    }

    let mut cycles = Vec::new();
    for entity in &subgraph.entities {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        dfs_cycles(&adjacency, &entity.id, &entity.id, max_length, &mut path, &mut visited, &mut cycles);
    }
    cycles
}

#[allow(clippy::too_many_arguments)]
fn dfs_cycles<'a>(
    adjacency: &HashMap<&'a str, Vec<&'a Relationship>>,
    start: &str,
    current: &str,
    remaining: u32,
    path: &mut Vec<&'a Relationship>,
    visited: &mut HashSet<String>,
    out: &mut Vec<Vec<Relationship>>,
) {
    if remaining == 0 {
        return;
    }
    let Some(edges) = adjacency.get(current) else {
        return;
    };
    for rel in edges {
        if rel.target == start && !path.is_empty() {
            let mut cycle: Vec<Relationship> = path.iter().map(|r| (**r).clone()).collect();
            cycle.push((*rel).clone());
            out.push(cycle);
            continue;
        }
        if visited.contains(&rel.target) {
            continue;
        }
        visited.insert(rel.target.clone());
        path.push(rel);
        dfs_cycles(adjacency, start, &rel.target, remaining - 1, path, visited, out);
        path.pop();
        visited.remove(&rel.target);
    }
}

/// Funds returning to (near) their origin through a directed cycle.
pub fn detect_circular_flow(subgraph: &SubGraph, max_length: u32, min_confidence: f64, now: DateTime<Utc>) -> PatternDetectionResult {
    let mut patterns = Vec::new();
    let mut seen_cycles: HashSet<Vec<String>> = HashSet::new();

    for cycle in find_cycles(subgraph, max_length) {
        let mut entity_ids: Vec<String> = vec![cycle[0].source.clone()];
        entity_ids.extend(cycle.iter().map(|r| r.target.clone()));
        let mut canonical = entity_ids.clone();
        canonical.sort();
        if !seen_cycles.insert(canonical) {
            continue;
        }

        let length = cycle.len();
        let total_amount: f64 = cycle.iter().filter_map(|r| r.amount()).sum();

        let mut confidence = 0.3;
        let mut indicators = vec![format!("{length}-step cycle")];

        if length <= 4 {
            confidence += 0.3;
            indicators.push("short circle (<=4 steps)".to_string());
        } else if length >= 7 {
            confidence += 0.3;
            indicators.push("complex circle (>=7 steps)".to_string());
        } else {
            confidence += 0.2;
        }

        if total_amount > 100_000.0 {
            confidence += 0.3;
            indicators.push(format!("total amount {total_amount:.2} (>100k bucket)"));
        } else if total_amount > 50_000.0 {
            confidence += 0.2;
            indicators.push(format!("total amount {total_amount:.2} (>50k bucket)"));
        }

        patterns.push(new_pattern(PatternType::CircularFlow, confidence.min(1.0), entity_ids, indicators, now));
    }
    finalize(patterns, min_confidence)
}

/// Large amounts moved through an entity within a short window: an
/// inbound transfer followed by an outbound transfer of a comparable
/// amount, close together in time.
pub fn detect_rapid_movement(subgraph: &SubGraph, rapid_window_hours: i64, min_confidence: f64, now: DateTime<Utc>) -> PatternDetectionResult {
    let mut patterns = Vec::new();
    for entity in &subgraph.entities {
        let inbound: Vec<&Relationship> = subgraph.relationships.iter().filter(|r| r.target == entity.id).collect();
        let outbound: Vec<&Relationship> = subgraph.relationships.iter().filter(|r| r.source == entity.id).collect();

        for inflow in &inbound {
            let (Some(in_amount), Some(in_time)) = (inflow.amount(), inflow.timestamp()) else {
                continue;
            };
            for outflow in &outbound {
                let (Some(out_amount), Some(out_time)) = (outflow.amount(), outflow.timestamp()) else {
                    continue;
                };
                if out_time < in_time {
                    continue;
                }
                let hours_between = (out_time - in_time).num_minutes() as f64 / 60.0;
                if hours_between > rapid_window_hours as f64 {
                    continue;
                }
                let amount_ratio = (out_amount / in_amount.max(1.0)).min(in_amount / out_amount.max(1.0));
                if amount_ratio < 0.8 {
                    continue;
                }

                let mut confidence = 0.4;
                let mut indicators = vec![format!("{hours_between:.1}h between inflow and outflow")];
                if hours_between < 1.0 {
                    confidence += 0.3;
                } else if hours_between < 24.0 {
                    confidence += 0.15;
                }
                if in_amount.max(out_amount) > 50_000.0 {
                    confidence += 0.2;
                    indicators.push("large amount moved".to_string());
                }

                patterns.push(new_pattern(
                    PatternType::RapidMovement,
                    confidence.min(1.0),
                    vec![inflow.source.clone(), entity.id.clone(), outflow.target.clone()],
                    indicators,
                    now,
                ));
            }
        }
    }
    finalize(patterns, min_confidence)
}

/// Counterparties concentrated in jurisdictions named in
/// `high_risk_countries`.
pub fn detect_high_risk_geography(subgraph: &SubGraph, high_risk_countries: &HashSet<String>, min_confidence: f64, now: DateTime<Utc>) -> PatternDetectionResult {
    let mut patterns = Vec::new();
    for entity in &subgraph.entities {
        let counterparties: HashSet<&str> = subgraph
            .relationships
            .iter()
            .filter_map(|r| {
                if r.source == entity.id {
                    Some(r.target.as_str())
                } else if r.target == entity.id {
                    Some(r.source.as_str())
                } else {
                    None
                }
            })
            .collect();
        if counterparties.is_empty() {
            continue;
        }

        let high_risk_count = counterparties
            .iter()
            .filter(|&&c| entity_property(&subgraph.entities, c, "country").is_some_and(|country| high_risk_countries.contains(country)))
            .count();
        let confidence = high_risk_count as f64 / counterparties.len() as f64;
        if high_risk_count == 0 {
            continue;
        }

        let mut involved = vec![entity.id.clone()];
        involved.extend(counterparties.iter().map(|c| c.to_string()));
        patterns.push(new_pattern(
            PatternType::HighRiskGeography,
            confidence,
            involved,
            vec![format!("{high_risk_count}/{} counterparties in high-risk jurisdictions", counterparties.len())],
            now,
        ));
    }
    finalize(patterns, min_confidence)
}

/// An entity's transaction volume far outside its own historical
/// baseline, scored as a clamped z-score.
pub fn detect_unusual_volume(subgraph: &SubGraph, baseline_mean: f64, baseline_stddev: f64, min_confidence: f64, now: DateTime<Utc>) -> PatternDetectionResult {
    if baseline_stddev <= 0.0 {
        return PatternDetectionResult::default();
    }
    let mut patterns = Vec::new();
    for entity in &subgraph.entities {
        let amounts: Vec<f64> = subgraph
            .relationships
            .iter()
            .filter(|r| r.source == entity.id || r.target == entity.id)
            .filter_map(Relationship::amount)
            .collect();
        if amounts.is_empty() {
            continue;
        }
        let total: f64 = amounts.iter().sum();
        let z_score = ((total - baseline_mean) / baseline_stddev).abs();
        if z_score < 1.0 {
            continue;
        }
        let confidence = (z_score / 5.0).min(1.0);
        patterns.push(new_pattern(
            PatternType::UnusualVolume,
            confidence,
            vec![entity.id.clone()],
            vec![format!("volume {total:.2} is {z_score:.2} std devs from baseline {baseline_mean:.2}")],
            now,
        ));
    }
    finalize(patterns, min_confidence)
}

/// Entities flagged as companies that show hallmarks of a shell
/// company: no registered employees, no physical address, but
/// non-trivial transaction flow.
pub fn detect_shell_company(subgraph: &SubGraph, min_confidence: f64, now: DateTime<Utc>) -> PatternDetectionResult {
    let mut patterns = Vec::new();
    for entity in &subgraph.entities {
        if entity.entity_type != "company" {
            continue;
        }
        let degree = subgraph.relationships.iter().filter(|r| r.source == entity.id || r.target == entity.id).count();
        if degree == 0 {
            continue;
        }

        let mut confidence = 0.0;
        let mut indicators = Vec::new();
        if entity.property_str("employee_count").is_none_or(|v| v == "0") {
            confidence += 0.4;
            indicators.push("no registered employees".to_string());
        }
        if entity.property_str("physical_address").is_none() {
            confidence += 0.3;
            indicators.push("no physical address on file".to_string());
        }
        if degree >= 5 {
            confidence += 0.3;
            indicators.push(format!("{degree} counterparties despite no substantive footprint"));
        }

        patterns.push(new_pattern(PatternType::ShellCompany, confidence.min(1.0), vec![entity.id.clone()], indicators, now));
    }
    finalize(patterns, min_confidence)
}

/// Accounts that pass funds through quickly with many distinct
/// counterparties and little retained balance, consistent with a money
/// mule.
pub fn detect_mule_account(subgraph: &SubGraph, min_confidence: f64, now: DateTime<Utc>) -> PatternDetectionResult {
    let mut patterns = Vec::new();
    for entity in &subgraph.entities {
        if entity.entity_type != "account" {
            continue;
        }
        let inbound: Vec<&Relationship> = subgraph.relationships.iter().filter(|r| r.target == entity.id).collect();
        let outbound: Vec<&Relationship> = subgraph.relationships.iter().filter(|r| r.source == entity.id).collect();
        if inbound.is_empty() || outbound.is_empty() {
            continue;
        }

        let counterparties: HashSet<&str> = inbound
            .iter()
            .map(|r| r.source.as_str())
            .chain(outbound.iter().map(|r| r.target.as_str()))
            .collect();

        let inflow: f64 = inbound.iter().filter_map(|r| r.amount()).sum();
        let outflow: f64 = outbound.iter().filter_map(|r| r.amount()).sum();
        let pass_through_ratio = if inflow > 0.0 { (outflow / inflow).min(1.0) } else { 0.0 };

        let mut confidence = 0.0;
        let mut indicators = Vec::new();
        if counterparties.len() >= 5 {
            confidence += 0.3;
            indicators.push(format!("{} distinct counterparties", counterparties.len()));
        }
        if pass_through_ratio >= 0.9 {
            confidence += 0.4;
            indicators.push(format!("pass-through ratio {pass_through_ratio:.2}"));
        } else if pass_through_ratio >= 0.7 {
            confidence += 0.25;
        }
        if inbound.len() + outbound.len() >= 10 {
            confidence += 0.2;
            indicators.push("high transaction velocity".to_string());
        }

        if confidence <= 0.0 {
            continue;
        }
        let mut involved = vec![entity.id.clone()];
        involved.extend(counterparties.iter().map(|c| c.to_string()));
        patterns.push(new_pattern(PatternType::MuleAccount, confidence.min(1.0), involved, indicators, now));
    }
    finalize(patterns, min_confidence)
}

/// Rapid deposit-then-withdraw cycling on a single account.
pub fn detect_kiting_scheme(subgraph: &SubGraph, cycle_window_hours: i64, min_confidence: f64, now: DateTime<Utc>) -> PatternDetectionResult {
    let mut patterns = Vec::new();
    for entity in &subgraph.entities {
        let mut events: Vec<(DateTime<Utc>, bool)> = subgraph
            .relationships
            .iter()
            .filter_map(|r| {
                if r.target == entity.id {
                    r.timestamp().map(|t| (t, true))
                } else if r.source == entity.id {
                    r.timestamp().map(|t| (t, false))
                } else {
                    None
                }
            })
            .collect();
        events.sort_by_key(|(t, _)| *t);

        let mut cycles = 0usize;
        for window in events.windows(2) {
            let [(t1, is_deposit1), (t2, is_deposit2)] = window else { continue };
            if *is_deposit1 && !is_deposit2 {
                let hours = (*t2 - *t1).num_minutes() as f64 / 60.0;
                if hours <= cycle_window_hours as f64 {
                    cycles += 1;
                }
            }
        }
        if cycles == 0 {
            continue;
        }

        let confidence = (0.3 + 0.15 * cycles as f64).min(1.0);
        patterns.push(new_pattern(
            PatternType::KitingScheme,
            confidence,
            vec![entity.id.clone()],
            vec![format!("{cycles} deposit-then-withdraw cycle(s) within {cycle_window_hours}h")],
            now,
        ));
    }
    finalize(patterns, min_confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn entity(id: &str) -> Entity {
        Entity {
            id: id.to_string(),
            entity_type: "account".to_string(),
            properties: BTreeMap::new(),
        }
    }

    fn transfer(source: &str, target: &str, amount: f64, timestamp: DateTime<Utc>) -> Relationship {
        let mut properties = BTreeMap::new();
        properties.insert("amount".to_string(), aegis_types::JsonValue::from(amount));
        properties.insert("timestamp".to_string(), aegis_types::JsonValue::from(timestamp.to_rfc3339()));
        Relationship {
            source: source.to_string(),
            target: target.to_string(),
            relationship_type: "transfer".to_string(),
            properties,
        }
    }

    #[test]
    fn smurfing_scenario_matches_testable_property() {
        let base = Utc::now();
        let amounts = [9000.0, 9100.0, 9200.0, 9050.0, 9300.0, 9150.0, 9080.0, 9250.0];
        let relationships: Vec<Relationship> = amounts
            .iter()
            .enumerate()
            .map(|(i, &amount)| transfer("a", "b", amount, base + chrono::Duration::days(i as i64)))
            .collect();
        let subgraph = SubGraph {
            entities: vec![entity("a"), entity("b")],
            relationships,
        };

        let result = detect_smurfing(&subgraph, 10_000.0, 5, 0.5, base);
        assert_eq!(result.patterns.len(), 1);
        assert!(result.patterns[0].confidence >= 0.7, "confidence was {}", result.patterns[0].confidence);
        assert!(result.patterns[0].risk_score >= 70.0);
    }

    #[test]
    fn circular_flow_scenario_matches_testable_property() {
        let base = Utc::now();
        let subgraph = SubGraph {
            entities: vec![entity("a"), entity("b"), entity("c"), entity("d")],
            relationships: vec![
                transfer("a", "b", 20_000.0, base),
                transfer("b", "c", 20_000.0, base + chrono::Duration::hours(12)),
                transfer("c", "d", 20_000.0, base + chrono::Duration::hours(24)),
                transfer("d", "a", 20_000.0, base + chrono::Duration::hours(36)),
            ],
        };

        let result = detect_circular_flow(&subgraph, 6, 0.5, base);
        assert_eq!(result.patterns.len(), 1);
        assert!(result.patterns[0].confidence >= 0.6, "confidence was {}", result.patterns[0].confidence);
        assert!(result.patterns[0].risk_score >= 78.0, "risk_score was {}", result.patterns[0].risk_score);
    }

    #[test]
    fn high_risk_count_counts_above_point_eight() {
        let now = Utc::now();
        let mut patterns = vec![
            new_pattern(PatternType::Smurfing, 0.95, vec!["a".into()], vec![], now),
            new_pattern(PatternType::Smurfing, 0.5, vec!["b".into()], vec![], now),
        ];
        patterns.sort_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap());
        let result = finalize(patterns, 0.0);
        assert_eq!(result.high_risk_count, 1);
    }
}
