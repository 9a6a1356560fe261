//! Shortest-path finding with a relationship-confidence-weighted path
//! score.

use crate::client::GraphStore;
use crate::error::Result;
use aegis_types::Relationship;
use std::collections::{HashMap, HashSet, VecDeque};

/// A single path between a source and target entity.
#[derive(Debug, Clone)]
pub struct Path {
    /// Entity ids visited, source first, target last.
    pub entity_ids: Vec<String>,
    /// Relationships traversed, in order.
    pub relationships: Vec<Relationship>,
    /// `1 / sqrt(length)` times the product of per-relationship
    /// `confidence` properties (relationships without one contribute a
    /// factor of `1.0`).
    pub confidence: f64,
}

impl Path {
    /// Number of edges traversed.
    pub fn length(&self) -> usize {
        self.relationships.len()
    }
}

fn path_confidence(relationships: &[Relationship]) -> f64 {
    let length = relationships.len().max(1) as f64;
    let product: f64 = relationships.iter().map(|r| r.confidence().unwrap_or(1.0)).product();
    (1.0 / length.sqrt()) * product
}

/// Shortest path (by hop count) from `source` to `target`, bounded to
/// `max_length` edges. Ties among equal-length shortest paths are broken
/// by BFS discovery order, which is deterministic for a given store
/// snapshot.
async fn shortest_path(store: &dyn GraphStore, source: &str, target: &str, max_length: u32) -> Result<Option<Path>> {
    if source == target {
        return Ok(None);
    }

    let all_relationships = store.all_relationships().await?;
    let mut adjacency: HashMap<&str, Vec<&Relationship>> = HashMap::new();
    for rel in &all_relationships {
        adjacency.entry(rel.source.as_str()).or_default().push(rel);
        adjacency.entry(rel.target.as_str()).or_default().push(rel);
    }

    let mut visited = HashSet::new();
    visited.insert(source.to_string());
    let mut queue = VecDeque::new();
    queue.push_back((source.to_string(), 0u32));
    let mut came_from: HashMap<String, (String, Relationship)> = HashMap::new();

    while let Some((current, depth)) = queue.pop_front() {
        if current == target {
            let mut entity_ids = vec![current.clone()];
            let mut relationships = Vec::new();
            let mut cursor = current;
            while let Some((prev, rel)) = came_from.get(&cursor) {
                entity_ids.push(prev.clone());
                relationships.push(rel.clone());
                cursor = prev.clone();
            }
            entity_ids.reverse();
            relationships.reverse();
            let confidence = path_confidence(&relationships);
            return Ok(Some(Path { entity_ids, relationships, confidence }));
        }

        if depth >= max_length {
            continue;
        }

        let Some(edges) = adjacency.get(current.as_str()) else {
            continue;
        };
        for rel in edges {
            let neighbor = if rel.source == current {
                rel.target.clone()
            } else {
                rel.source.clone()
            };
            if visited.insert(neighbor.clone()) {
                came_from.insert(neighbor.clone(), (current.clone(), (*rel).clone()));
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    Ok(None)
}

/// Shortest paths up to `max_length` edges between every `(source,
/// target)` pair drawn from `sources` and `targets`, excluding paths
/// whose computed confidence falls below `min_confidence`.
pub async fn find_paths(
    store: &dyn GraphStore,
    sources: &[String],
    targets: &[String],
    max_length: u32,
    min_confidence: f64,
) -> Result<Vec<Path>> {
    let mut paths = Vec::new();
    for source in sources {
        for target in targets {
            if let Some(path) = shortest_path(store, source, target, max_length).await? {
                if path.confidence >= min_confidence {
                    paths.push(path);
                }
            }
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryGraphStore;
    use std::collections::BTreeMap;

    fn entity(id: &str) -> aegis_types::Entity {
        aegis_types::Entity {
            id: id.to_string(),
            entity_type: "account".to_string(),
            properties: BTreeMap::new(),
        }
    }

    fn edge_with_confidence(source: &str, target: &str, confidence: f64) -> Relationship {
        let mut properties = BTreeMap::new();
        properties.insert("confidence".to_string(), aegis_types::JsonValue::from(confidence));
        Relationship {
            source: source.to_string(),
            target: target.to_string(),
            relationship_type: "transfer".to_string(),
            properties,
        }
    }

    #[tokio::test]
    async fn finds_shortest_path_within_bound() {
        let store = InMemoryGraphStore::new();
        for id in ["a", "b", "c"] {
            store.upsert_entity(entity(id)).await.unwrap();
        }
        store.upsert_relationship(edge_with_confidence("a", "b", 1.0)).await.unwrap();
        store.upsert_relationship(edge_with_confidence("b", "c", 1.0)).await.unwrap();

        let paths = find_paths(&store, &["a".to_string()], &["c".to_string()], 4, 0.0).await.unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].length(), 2);
        assert_eq!(paths[0].entity_ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn path_exceeding_max_length_is_not_returned() {
        let store = InMemoryGraphStore::new();
        for id in ["a", "b", "c"] {
            store.upsert_entity(entity(id)).await.unwrap();
        }
        store.upsert_relationship(edge_with_confidence("a", "b", 1.0)).await.unwrap();
        store.upsert_relationship(edge_with_confidence("b", "c", 1.0)).await.unwrap();

        let paths = find_paths(&store, &["a".to_string()], &["c".to_string()], 1, 0.0).await.unwrap();
        assert!(paths.is_empty());
    }

    #[tokio::test]
    async fn low_confidence_paths_are_filtered() {
        let store = InMemoryGraphStore::new();
        for id in ["a", "b"] {
            store.upsert_entity(entity(id)).await.unwrap();
        }
        store.upsert_relationship(edge_with_confidence("a", "b", 0.1)).await.unwrap();

        let paths = find_paths(&store, &["a".to_string()], &["b".to_string()], 4, 0.5).await.unwrap();
        assert!(paths.is_empty());
    }
}
