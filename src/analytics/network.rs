//! Structure statistics over a generic weighted edge list: node/edge
//! counts, out-degree, and DAG longest path. Works on whatever edges the
//! caller hands it — referral flow edges are just one producer.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

/// A directed edge between two labeled nodes with an aggregate weight.
/// Weight decides threshold inclusion only; path length counts edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedEdge {
    pub source: String,
    pub target: String,
    pub value: f64,
}

impl WeightedEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, value: f64) -> WeightedEdge {
        WeightedEdge {
            source: source.into(),
            target: target.into(),
            value,
        }
    }
}

/// Structure stats for one thresholded edge list. `longest_path` is in
/// edges, and None when the retained graph contains a cycle — reported as
/// explicitly undefined rather than estimated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub max_out_degree: usize,
    pub longest_path: Option<usize>,
}

/// Topological traversal outcome: longest distance per node, or an
/// explicit cycle marker. Traversal never mutates shared state.
enum Traversal {
    Ordered { distances: Vec<usize> },
    Cycle,
}

/// Analyze the edges at or above `min_value`.
pub fn analyze(edges: &[WeightedEdge], min_value: f64) -> NetworkStats {
    let retained: Vec<&WeightedEdge> =
        edges.iter().filter(|e| e.value >= min_value).collect();

    let mut index: HashMap<&str, usize> = HashMap::new();
    for edge in &retained {
        let next = index.len();
        index.entry(edge.source.as_str()).or_insert(next);
        let next = index.len();
        index.entry(edge.target.as_str()).or_insert(next);
    }

    let node_count = index.len();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut in_degree: Vec<usize> = vec![0; node_count];
    let mut out_degree: Vec<usize> = vec![0; node_count];
    for edge in &retained {
        let source = index[edge.source.as_str()];
        let target = index[edge.target.as_str()];
        adjacency[source].push(target);
        in_degree[target] += 1;
        out_degree[source] += 1;
    }

    let longest_path = match topo_longest(&adjacency, &in_degree) {
        Traversal::Ordered { distances } => Some(distances.into_iter().max().unwrap_or(0)),
        Traversal::Cycle => None,
    };

    NetworkStats {
        node_count,
        edge_count: retained.len(),
        max_out_degree: out_degree.into_iter().max().unwrap_or(0),
        longest_path,
    }
}

/// Kahn's algorithm with longest-distance propagation: every node's best
/// distance is max(predecessor distance) + 1. Fewer processed nodes than
/// total nodes means a cycle survived the threshold.
fn topo_longest(adjacency: &[Vec<usize>], in_degree: &[usize]) -> Traversal {
    let mut remaining = in_degree.to_vec();
    let mut distances = vec![0usize; adjacency.len()];
    let mut queue: VecDeque<usize> = remaining
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| node)
        .collect();

    let mut processed = 0usize;
    while let Some(node) = queue.pop_front() {
        processed += 1;
        for &next in &adjacency[node] {
            if distances[node] + 1 > distances[next] {
                distances[next] = distances[node] + 1;
            }
            remaining[next] -= 1;
            if remaining[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if processed < adjacency.len() {
        Traversal::Cycle
    } else {
        Traversal::Ordered { distances }
    }
}
