//! Community detection via asynchronous label propagation: every node
//! starts in its own community and repeatedly adopts the most common
//! label among its neighbors until labels stabilize.

use crate::centrality::build_graph;
use crate::client::SubGraph;
use std::collections::HashMap;

const MAX_ITERATIONS: usize = 100;

/// Assigns every entity in `subgraph` to a community id, derived from
/// (and stable across reruns on) the lexicographically smallest entity id
/// in the converged label set.
pub fn detect_communities(subgraph: &SubGraph) -> HashMap<String, String> {
    let graph = build_graph(subgraph);
    let n = graph.ids.len();
    if n == 0 {
        return HashMap::new();
    }

    let mut labels: Vec<usize> = (0..n).collect();

    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for node in 0..n {
            if graph.adjacency[node].is_empty() {
                continue;
            }
            let mut counts: HashMap<usize, usize> = HashMap::new();
            for &neighbor in &graph.adjacency[node] {
                *counts.entry(labels[neighbor]).or_insert(0) += 1;
            }
            if let Some((&best_label, _)) = counts.iter().max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0))) {
                if labels[node] != best_label {
                    labels[node] = best_label;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    let mut canonical_name: HashMap<usize, String> = HashMap::new();
    for (i, &label) in labels.iter().enumerate() {
        let id = &graph.ids[i];
        canonical_name
            .entry(label)
            .and_modify(|existing| {
                if id < existing {
                    *existing = id.clone();
                }
            })
            .or_insert_with(|| id.clone());
    }

    graph
        .ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), format!("community-{}", canonical_name[&labels[i]])))
        .collect()
}

/// Size of each detected community, keyed by community id.
pub fn community_sizes(assignments: &HashMap<String, String>) -> HashMap<String, usize> {
    let mut sizes = HashMap::new();
    for community in assignments.values() {
        *sizes.entry(community.clone()).or_insert(0) += 1;
    }
    sizes
}

/// Edge density within a single community's induced subgraph:
/// `edges / (n * (n - 1) / 2)` for `n >= 2`, else `0.0`.
pub fn community_density(subgraph: &SubGraph, assignments: &HashMap<String, String>, community_id: &str) -> f64 {
    let members: Vec<&str> = assignments
        .iter()
        .filter(|(_, c)| c.as_str() == community_id)
        .map(|(id, _)| id.as_str())
        .collect();
    let n = members.len();
    if n < 2 {
        return 0.0;
    }
    let member_set: std::collections::HashSet<&str> = members.iter().copied().collect();
    let edges = subgraph
        .relationships
        .iter()
        .filter(|r| member_set.contains(r.source.as_str()) && member_set.contains(r.target.as_str()))
        .count();
    let possible = (n * (n - 1)) / 2;
    edges as f64 / possible as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::{Entity, Relationship};
    use std::collections::BTreeMap;

    fn entity(id: &str) -> Entity {
        Entity {
            id: id.to_string(),
            entity_type: "account".to_string(),
            properties: BTreeMap::new(),
        }
    }

    fn edge(source: &str, target: &str) -> Relationship {
        Relationship {
            source: source.to_string(),
            target: target.to_string(),
            relationship_type: "transfer".to_string(),
            properties: BTreeMap::new(),
        }
    }

    #[test]
    fn two_disconnected_triangles_form_two_communities() {
        let subgraph = SubGraph {
            entities: vec!["a", "b", "c", "x", "y", "z"].into_iter().map(entity).collect(),
            relationships: vec![
                edge("a", "b"),
                edge("b", "c"),
                edge("c", "a"),
                edge("x", "y"),
                edge("y", "z"),
                edge("z", "x"),
            ],
        };

        let assignments = detect_communities(&subgraph);
        assert_eq!(assignments["a"], assignments["b"]);
        assert_eq!(assignments["b"], assignments["c"]);
        assert_eq!(assignments["x"], assignments["y"]);
        assert_ne!(assignments["a"], assignments["x"]);
    }

    #[test]
    fn fully_connected_community_has_density_one() {
        let subgraph = SubGraph {
            entities: vec!["a", "b", "c"].into_iter().map(entity).collect(),
            relationships: vec![edge("a", "b"), edge("b", "c"), edge("c", "a")],
        };
        let assignments = detect_communities(&subgraph);
        let community_id = assignments["a"].clone();
        assert_eq!(community_density(&subgraph, &assignments, &community_id), 1.0);
    }
}
