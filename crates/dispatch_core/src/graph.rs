//! Undirected weighted graph over integer node ids with a single-source
//! shortest-path query.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::order::NodeId;

/// Distance reported for nodes that cannot be reached from the source.
pub const UNREACHABLE: u64 = u64::MAX / 4;

/// One half of an undirected edge, stored in the adjacency list of its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub to: NodeId,
    pub weight: u64,
}

/// Fixed-size undirected graph. Every edge is stored in both endpoints'
/// adjacency lists.
#[derive(Debug, Clone, Default)]
pub struct WeightedGraph {
    adjacency: Vec<Vec<Edge>>,
}

/// Priority-queue entry for Dijkstra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frontier {
    cost: u64,
    node: NodeId,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by cost.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl WeightedGraph {
    pub fn new(node_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); node_count],
        }
    }

    /// Build a graph from `(u, v, weight)` triples. Invalid edges are dropped.
    pub fn from_edges(node_count: usize, edges: &[(NodeId, NodeId, u64)]) -> Self {
        let mut graph = Self::new(node_count);
        for &(u, v, weight) in edges {
            graph.add_edge(u, v, weight);
        }
        graph
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges (self-loops count once).
    pub fn edge_count(&self) -> usize {
        let half_edges: usize = self.adjacency.iter().map(Vec::len).sum();
        let self_loops: usize = self
            .adjacency
            .iter()
            .enumerate()
            .map(|(node, edges)| edges.iter().filter(|edge| edge.to == node).count())
            .sum();
        (half_edges - self_loops) / 2 + self_loops / 2
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node < self.adjacency.len()
    }

    /// Add an undirected edge. Returns `false` and leaves the graph untouched when
    /// either endpoint is out of range.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId, weight: u64) -> bool {
        if !self.contains(u) || !self.contains(v) {
            return false;
        }
        self.adjacency[u].push(Edge { to: v, weight });
        self.adjacency[v].push(Edge { to: u, weight });
        true
    }

    pub fn neighbors(&self, node: NodeId) -> &[Edge] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Minimum path weight from `source` to every node; [`UNREACHABLE`] for nodes
    /// with no path. An out-of-range source reaches nothing.
    pub fn shortest_distances(&self, source: NodeId) -> Vec<u64> {
        let mut dist = vec![UNREACHABLE; self.adjacency.len()];
        if !self.contains(source) {
            return dist;
        }

        let mut heap = BinaryHeap::new();
        dist[source] = 0;
        heap.push(Frontier {
            cost: 0,
            node: source,
        });

        while let Some(Frontier { cost, node }) = heap.pop() {
            if cost > dist[node] {
                continue;
            }
            for edge in &self.adjacency[node] {
                let next = cost.saturating_add(edge.weight).min(UNREACHABLE);
                if next < dist[edge.to] {
                    dist[edge.to] = next;
                    heap.push(Frontier {
                        cost: next,
                        node: edge.to,
                    });
                }
            }
        }

        dist
    }

    /// Shortest distance between two nodes, or [`UNREACHABLE`].
    pub fn distance(&self, from: NodeId, to: NodeId) -> u64 {
        if !self.contains(to) {
            return UNREACHABLE;
        }
        self.shortest_distances(from)[to]
    }
}
