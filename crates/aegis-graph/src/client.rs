//! Parameterized graph queries over the entity-relationship property
//! graph: a small [`GraphStore`] contract plus an in-memory reference
//! adapter, following the same trait-plus-`InMemory*`-adapter shape as
//! `aegis-repositories`.

use crate::error::{Error, Result};
use aegis_types::{Entity, Relationship};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::RwLock;

/// A bounded slice of the graph: every entity reached from a traversal
/// plus the relationships among them.
#[derive(Debug, Clone, Default)]
pub struct SubGraph {
    /// Entities included in this slice.
    pub entities: Vec<Entity>,
    /// Relationships whose endpoints are both in `entities`.
    pub relationships: Vec<Relationship>,
}

impl SubGraph {
    /// Entity ids present in this slice.
    pub fn entity_ids(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.id.clone()).collect()
    }
}

/// Parameterized graph-query contract. Production deployments back this
/// with a real graph database; the in-memory adapter below exists so the
/// orchestrator, pattern detector, and entity resolver are independently
/// testable.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Insert or overwrite an entity node.
    async fn upsert_entity(&self, entity: Entity) -> Result<()>;

    /// Fetch a single entity by id.
    async fn get_entity(&self, id: &str) -> Result<Entity>;

    /// List every entity currently stored.
    async fn all_entities(&self) -> Result<Vec<Entity>>;

    /// Insert or overwrite a directed relationship. Relationships are
    /// traversed as undirected edges by [`GraphStore::neighborhood`] and
    /// path finding; direction is preserved for callers that need it
    /// (e.g. transfer flow direction in circular-flow detection).
    async fn upsert_relationship(&self, relationship: Relationship) -> Result<()>;

    /// Every relationship with `entity_id` as either endpoint.
    async fn relationships_of(&self, entity_id: &str) -> Result<Vec<Relationship>>;

    /// Every relationship in the store, used by detectors that need a
    /// time-windowed slice of the whole graph rather than a single
    /// entity's neighborhood.
    async fn all_relationships(&self) -> Result<Vec<Relationship>>;

    /// Breadth-first traversal from `entity_id` out to `max_depth` hops,
    /// returning every entity reached and the relationships among them.
    async fn neighborhood(&self, entity_id: &str, max_depth: u32) -> Result<SubGraph>;
}

/// In-memory [`GraphStore`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryGraphStore {
    entities: RwLock<HashMap<String, Entity>>,
    relationships: RwLock<Vec<Relationship>>,
}

impl InMemoryGraphStore {
    /// Construct an empty graph.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn upsert_entity(&self, entity: Entity) -> Result<()> {
        self.entities.write().await.insert(entity.id.clone(), entity);
        Ok(())
    }

    async fn get_entity(&self, id: &str) -> Result<Entity> {
        self.entities
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Types(aegis_types::Error::not_found("entity", id)))
    }

    async fn all_entities(&self) -> Result<Vec<Entity>> {
        Ok(self.entities.read().await.values().cloned().collect())
    }

    async fn upsert_relationship(&self, relationship: Relationship) -> Result<()> {
        let mut relationships = self.relationships.write().await;
        if let Some(existing) = relationships.iter_mut().find(|r| {
            r.source == relationship.source && r.target == relationship.target && r.relationship_type == relationship.relationship_type
        }) {
            *existing = relationship;
        } else {
            relationships.push(relationship);
        }
        Ok(())
    }

    async fn relationships_of(&self, entity_id: &str) -> Result<Vec<Relationship>> {
        let relationships = self.relationships.read().await;
        Ok(relationships
            .iter()
            .filter(|r| r.source == entity_id || r.target == entity_id)
            .cloned()
            .collect())
    }

    async fn all_relationships(&self) -> Result<Vec<Relationship>> {
        Ok(self.relationships.read().await.clone())
    }

    async fn neighborhood(&self, entity_id: &str, max_depth: u32) -> Result<SubGraph> {
        let entities = self.entities.read().await;
        let relationships = self.relationships.read().await;

        let mut visited = HashSet::new();
        visited.insert(entity_id.to_string());
        let mut queue = VecDeque::new();
        queue.push_back((entity_id.to_string(), 0u32));
        let mut subgraph = SubGraph::default();
        let mut included_relationships = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if let Some(entity) = entities.get(&current) {
                subgraph.entities.push(entity.clone());
            }
            if depth >= max_depth {
                continue;
            }
            for rel in relationships.iter() {
                let neighbor = if rel.source == current {
                    Some(rel.target.clone())
                } else if rel.target == current {
                    Some(rel.source.clone())
                } else {
                    None
                };
                if let Some(neighbor) = neighbor {
                    included_relationships.push(rel.clone());
                    if visited.insert(neighbor.clone()) {
                        queue.push_back((neighbor, depth + 1));
                    }
                }
            }
        }

        let member_ids: HashSet<&str> = subgraph.entities.iter().map(|e| e.id.as_str()).collect();
        included_relationships.retain(|r| member_ids.contains(r.source.as_str()) && member_ids.contains(r.target.as_str()));
        included_relationships.sort_by(|a, b| (a.source.as_str(), a.target.as_str()).cmp(&(b.source.as_str(), b.target.as_str())));
        included_relationships.dedup_by(|a, b| a.source == b.source && a.target == b.target && a.relationship_type == b.relationship_type);
        subgraph.relationships = included_relationships;

        Ok(subgraph)
    }
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

    fn edge(source: &str, target: &str) -> Relationship {
        Relationship {
            source: source.to_string(),
            target: target.to_string(),
            relationship_type: "transfer".to_string(),
            properties: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn neighborhood_respects_max_depth() {
        let store = InMemoryGraphStore::new();
        for id in ["a", "b", "c", "d"] {
            store.upsert_entity(entity(id)).await.unwrap();
        }
        store.upsert_relationship(edge("a", "b")).await.unwrap();
        store.upsert_relationship(edge("b", "c")).await.unwrap();
        store.upsert_relationship(edge("c", "d")).await.unwrap();

        let sub = store.neighborhood("a", 1).await.unwrap();
        let ids: HashSet<_> = sub.entity_ids().into_iter().collect();
        assert_eq!(ids, HashSet::from(["a".to_string(), "b".to_string()]));
    }

    #[tokio::test]
    async fn neighborhood_includes_induced_relationships_only() {
        let store = InMemoryGraphStore::new();
        for id in ["a", "b", "c"] {
            store.upsert_entity(entity(id)).await.unwrap();
        }
        store.upsert_relationship(edge("a", "b")).await.unwrap();
        store.upsert_relationship(edge("b", "c")).await.unwrap();

        let sub = store.neighborhood("a", 1).await.unwrap();
        assert_eq!(sub.relationships.len(), 1);
        assert_eq!(sub.relationships[0].target, "b");
    }

    #[tokio::test]
    async fn get_missing_entity_is_not_found() {
        let store = InMemoryGraphStore::new();
        let err = store.get_entity("missing").await.unwrap_err();
        assert!(matches!(err, Error::Types(aegis_types::Error::NotFound { .. })));
    }
}
