//! Integration coverage for the typed pattern detectors against
//! hand-built subgraphs, mirroring the testable scenarios describing
//! smurfing and circular-flow detection.

use aegis_graph::client::SubGraph;
use aegis_graph::patterns::{detect_circular_flow, detect_smurfing};
use aegis_types::{Entity, PatternType, Relationship};
use chrono::{Duration, Utc};
use std::collections::BTreeMap;

fn account(id: &str) -> Entity {
    Entity {
        id: id.to_string(),
        entity_type: "account".to_string(),
        properties: BTreeMap::new(),
    }
}

fn transfer(source: &str, target: &str, amount: f64, timestamp: chrono::DateTime<Utc>) -> Relationship {
    let mut properties = BTreeMap::new();
    properties.insert("amount".to_string(), aegis_types::JsonValue::Number(amount));
    properties.insert(
        "timestamp".to_string(),
        aegis_types::JsonValue::String(timestamp.to_rfc3339()),
    );
    Relationship {
        source: source.to_string(),
        target: target.to_string(),
        relationship_type: "transfer".to_string(),
        properties,
    }
}

/// Eight transactions of $9000-$9500 between the same pair of accounts,
/// spread over ten days, must clear the smurfing threshold with
/// `confidence >= 0.7` and `risk_score >= 70`.
#[test]
fn eight_transactions_just_below_reporting_threshold_are_flagged_as_smurfing() {
    let now = Utc::now();
    let entities = vec![account("acct-a"), account("acct-b")];
    let relationships: Vec<Relationship> = (0..8)
        .map(|i| {
            let amount = 9000.0 + (i as f64) * 62.5; // 9000..=9437.5, avg well under 10_000
            transfer("acct-a", "acct-b", amount, now - Duration::days(10 - i))
        })
        .collect();
    let subgraph = SubGraph { entities, relationships };

    let result = detect_smurfing(&subgraph, 10_000.0, 5, 0.5, now);

    assert_eq!(result.patterns.len(), 1, "the eight transactions should collapse into a single smurfing pattern");
    let pattern = &result.patterns[0];
    assert_eq!(pattern.pattern_type, PatternType::Smurfing);
    assert!(pattern.confidence >= 0.7, "confidence {} should clear 0.7", pattern.confidence);
    assert!(pattern.risk_score >= 70, "risk_score {} should clear 70", pattern.risk_score);
    assert!(pattern.involved_entities.contains(&"acct-a".to_string()));
    assert!(pattern.involved_entities.contains(&"acct-b".to_string()));
}

/// A four-hop circular flow A -> B -> C -> D -> A moving $20,000 at each
/// step must be detected with `confidence >= 0.6` and `risk_score >= 78`.
#[test]
fn four_hop_circular_flow_of_twenty_thousand_is_flagged() {
    let now = Utc::now();
    let entities = vec![account("acct-a"), account("acct-b"), account("acct-c"), account("acct-d")];
    let relationships = vec![
        transfer("acct-a", "acct-b", 20_000.0, now - Duration::hours(3)),
        transfer("acct-b", "acct-c", 20_000.0, now - Duration::hours(2)),
        transfer("acct-c", "acct-d", 20_000.0, now - Duration::hours(1)),
        transfer("acct-d", "acct-a", 20_000.0, now),
    ];
    let subgraph = SubGraph { entities, relationships };

    let result = detect_circular_flow(&subgraph, 6, 0.5, now);

    assert_eq!(result.patterns.len(), 1, "the four-hop cycle should be reported exactly once");
    let pattern = &result.patterns[0];
    assert_eq!(pattern.pattern_type, PatternType::CircularFlow);
    assert!(pattern.confidence >= 0.6, "confidence {} should clear 0.6", pattern.confidence);
    assert!(pattern.risk_score >= 78, "risk_score {} should clear 78", pattern.risk_score);
    for id in ["acct-a", "acct-b", "acct-c", "acct-d"] {
        assert!(pattern.involved_entities.contains(&id.to_string()), "cycle should include {id}");
    }
}

/// A handful of transactions well under the minimum-transaction count, or
/// far above the reporting threshold, must not be flagged at all.
#[test]
fn ordinary_transfers_are_not_flagged_as_smurfing() {
    let now = Utc::now();
    let entities = vec![account("acct-a"), account("acct-b")];
    let relationships = vec![
        transfer("acct-a", "acct-b", 9200.0, now - Duration::days(2)),
        transfer("acct-a", "acct-b", 9300.0, now - Duration::days(1)),
    ];
    let subgraph = SubGraph { entities, relationships };

    let result = detect_smurfing(&subgraph, 10_000.0, 5, 0.5, now);

    assert!(result.patterns.is_empty(), "two transactions should not clear the minimum-transaction bucket");
}
