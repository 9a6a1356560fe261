//! Network-centrality computation over a [`SubGraph`](crate::client::SubGraph):
//! degree, betweenness, closeness, eigenvector, PageRank, and local
//! clustering coefficient.

use crate::client::SubGraph;
use aegis_types::NetworkMetrics;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};

const PAGERANK_DAMPING: f64 = 0.85;
const POWER_ITERATIONS: usize = 100;
const CONVERGENCE_EPSILON: f64 = 1e-6;

pub(crate) struct UndirectedGraph {
    pub(crate) ids: Vec<String>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) adjacency: Vec<Vec<usize>>,
}

pub(crate) fn build_graph(subgraph: &SubGraph) -> UndirectedGraph {
    let ids: Vec<String> = subgraph.entity_ids();
    let index: HashMap<String, usize> = ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
    let mut adjacency = vec![Vec::new(); ids.len()];
    for rel in &subgraph.relationships {
        if let (Some(&s), Some(&t)) = (index.get(&rel.source), index.get(&rel.target)) {
            if s != t && !adjacency[s].contains(&t) {
                adjacency[s].push(t);
                adjacency[t].push(s);
            }
        }
    }
    UndirectedGraph { ids, index, adjacency }
}

fn bfs_distances(graph: &UndirectedGraph, start: usize) -> Vec<Option<u32>> {
    let mut distances = vec![None; graph.ids.len()];
    distances[start] = Some(0);
    let mut queue = VecDeque::new();
    queue.push_back(start);
    while let Some(node) = queue.pop_front() {
        let d = distances[node].unwrap();
        for &neighbor in &graph.adjacency[node] {
            if distances[neighbor].is_none() {
                distances[neighbor] = Some(d + 1);
                queue.push_back(neighbor);
            }
        }
    }
    distances
}

/// Brandes' algorithm for unweighted betweenness centrality, normalized
/// by the number of node pairs excluding the node itself.
fn betweenness(graph: &UndirectedGraph) -> Vec<f64> {
    let n = graph.ids.len();
    let mut betweenness = vec![0.0; n];
    if n < 3 {
        return betweenness;
    }

    for s in 0..n {
        let mut stack = Vec::new();
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        sigma[s] = 1.0;
        let mut distance = vec![-1i64; n];
        distance[s] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &graph.adjacency[v] {
                if distance[w] < 0 {
                    distance[w] = distance[v] + 1;
                    queue.push_back(w);
                }
                if distance[w] == distance[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
            }
            if w != s {
                betweenness[w] += delta[w];
            }
        }
    }

    let normalizer = ((n - 1) * (n - 2)) as f64;
    betweenness.iter().map(|&b| if normalizer > 0.0 { b / normalizer } else { 0.0 }).collect()
}

fn closeness(graph: &UndirectedGraph) -> Vec<f64> {
    let n = graph.ids.len();
    (0..n)
        .map(|i| {
            let distances = bfs_distances(graph, i);
            let reachable: Vec<u32> = distances.into_iter().flatten().filter(|&d| d > 0).collect();
            if reachable.is_empty() {
                0.0
            } else {
                let sum: u32 = reachable.iter().sum();
                reachable.len() as f64 / sum as f64
            }
        })
        .collect()
}

fn eigenvector(graph: &UndirectedGraph) -> Vec<f64> {
    let n = graph.ids.len();
    if n == 0 {
        return Vec::new();
    }
    let mut scores = vec![1.0 / n as f64; n];
    for _ in 0..POWER_ITERATIONS {
        let mut next = vec![0.0; n];
        for (node, neighbors) in graph.adjacency.iter().enumerate() {
            for &neighbor in neighbors {
                next[neighbor] += scores[node];
            }
        }
        let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm < CONVERGENCE_EPSILON {
            break;
        }
        for v in &mut next {
            *v /= norm;
        }
        if next.iter().zip(&scores).all(|(a, b)| (a - b).abs() < CONVERGENCE_EPSILON) {
            scores = next;
            break;
        }
        scores = next;
    }
    scores
}

fn pagerank(graph: &UndirectedGraph) -> Vec<f64> {
    let n = graph.ids.len();
    if n == 0 {
        return Vec::new();
    }
    let mut scores = vec![1.0 / n as f64; n];
    let degrees: Vec<usize> = graph.adjacency.iter().map(Vec::len).collect();

    for _ in 0..POWER_ITERATIONS {
        let dangling_mass: f64 = (0..n).filter(|&i| degrees[i] == 0).map(|i| scores[i]).sum();
        let mut next = vec![(1.0 - PAGERANK_DAMPING) / n as f64 + PAGERANK_DAMPING * dangling_mass / n as f64; n];
        for (node, neighbors) in graph.adjacency.iter().enumerate() {
            if degrees[node] == 0 {
                continue;
            }
            let share = PAGERANK_DAMPING * scores[node] / degrees[node] as f64;
            for &neighbor in neighbors {
                next[neighbor] += share;
            }
        }
        let delta: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        if delta < CONVERGENCE_EPSILON {
            break;
        }
    }
    scores
}

fn clustering(graph: &UndirectedGraph) -> Vec<f64> {
    graph
        .adjacency
        .iter()
        .map(|neighbors| {
            let k = neighbors.len();
            if k < 2 {
                return 0.0;
            }
            let mut links = 0usize;
            for i in 0..neighbors.len() {
                for j in (i + 1)..neighbors.len() {
                    if graph.adjacency[neighbors[i]].contains(&neighbors[j]) {
                        links += 1;
                    }
                }
            }
            let possible = (k * (k - 1)) / 2;
            links as f64 / possible as f64
        })
        .collect()
}

/// Computes every centrality measure for each entity in `subgraph`,
/// stamping `calculated_at` with `now`.
pub fn calculate_network_metrics(subgraph: &SubGraph, now: chrono::DateTime<Utc>) -> Vec<NetworkMetrics> {
    let graph = build_graph(subgraph);
    let degree: Vec<f64> = graph.adjacency.iter().map(|n| n.len() as f64).collect();
    let betweenness = betweenness(&graph);
    let closeness = closeness(&graph);
    let eigenvector = eigenvector(&graph);
    let pagerank = pagerank(&graph);
    let clustering = clustering(&graph);

    graph
        .ids
        .iter()
        .enumerate()
        .map(|(i, id)| NetworkMetrics {
            entity_id: id.clone(),
            degree: degree[i],
            betweenness: betweenness[i],
            closeness: closeness[i],
            eigenvector: eigenvector.get(i).copied().unwrap_or(0.0),
            pagerank: pagerank.get(i).copied().unwrap_or(0.0),
            clustering: clustering[i],
            community_id: None,
            calculated_at: now,
        })
        .collect()
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

    fn star_subgraph() -> SubGraph {
        SubGraph {
            entities: vec![entity("hub"), entity("a"), entity("b"), entity("c")],
            relationships: vec![edge("hub", "a"), edge("hub", "b"), edge("hub", "c")],
        }
    }

    #[test]
    fn hub_has_highest_degree_in_star_topology() {
        let metrics = calculate_network_metrics(&star_subgraph(), Utc::now());
        let hub = metrics.iter().find(|m| m.entity_id == "hub").unwrap();
        assert_eq!(hub.degree, 3.0);
        for leaf in ["a", "b", "c"] {
            let m = metrics.iter().find(|m| m.entity_id == leaf).unwrap();
            assert_eq!(m.degree, 1.0);
        }
    }

    #[test]
    fn closeness_is_zero_for_isolated_node() {
        let subgraph = SubGraph {
            entities: vec![entity("isolated")],
            relationships: vec![],
        };
        let metrics = calculate_network_metrics(&subgraph, Utc::now());
        assert_eq!(metrics[0].closeness, 0.0);
    }

    #[test]
    fn pagerank_sums_to_approximately_one() {
        let metrics = calculate_network_metrics(&star_subgraph(), Utc::now());
        let total: f64 = metrics.iter().map(|m| m.pagerank).sum();
        assert!((total - 1.0).abs() < 1e-3, "pagerank sum was {total}");
    }

    #[test]
    fn triangle_has_full_clustering_coefficient() {
        let subgraph = SubGraph {
            entities: vec![entity("a"), entity("b"), entity("c")],
            relationships: vec![edge("a", "b"), edge("b", "c"), edge("c", "a")],
        };
        let metrics = calculate_network_metrics(&subgraph, Utc::now());
        for m in &metrics {
            assert_eq!(m.clustering, 1.0);
        }
    }
}
