//! Graph model building.
//!
//! The backend supplies the link graph as a denormalized join: one row per
//! node/edge pair, with nodes repeated once per edge they take part in. This
//! module folds those rows into a deduplicated node set and an edge set with
//! no duplicates and no dangling endpoints.

use crate::models::{GraphEdge, GraphModel, GraphNode, GraphRelationRow, GraphStats, Vec2, Viewport};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Side of the square, anchored at the viewport centre, that seeds initial positions.
pub const SEED_SPREAD: f64 = 100.0;

// ============================================================================
// Graph Building
// ============================================================================

/// Build a fresh model with random initial positions.
pub fn build_graph_model(rows: &[GraphRelationRow], viewport: Viewport) -> GraphModel {
    build_graph_model_with_rng(rows, viewport, &mut rand::thread_rng())
}

pub fn build_graph_model_with_rng<R: Rng + ?Sized>(
    rows: &[GraphRelationRow],
    viewport: Viewport,
    rng: &mut R,
) -> GraphModel {
    let origin = viewport.center();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut nodes: Vec<GraphNode> = Vec::new();
    let mut candidates: Vec<GraphEdge> = Vec::new();

    for row in rows {
        if !index.contains_key(row.node_id.as_str()) {
            let position = Vec2::new(
                origin.x + rng.gen::<f64>() * SEED_SPREAD,
                origin.y + rng.gen::<f64>() * SEED_SPREAD,
            );
            index.insert(row.node_id.as_str(), nodes.len());
            nodes.push(GraphNode::new(&row.node_id, &row.node_name, position));
        }
        if let Some((from, to)) = row.edge() {
            candidates.push(GraphEdge {
                source: from.to_string(),
                target: to.to_string(),
                tag: row.tag.clone(),
            });
        }
    }

    // Dedup on (source, target, tag), then drop edges with unknown endpoints
    let mut seen: HashSet<GraphEdge> = HashSet::new();
    let mut edges = Vec::new();
    for edge in candidates {
        if seen.contains(&edge) {
            continue;
        }
        seen.insert(edge.clone());
        if index.contains_key(edge.source.as_str()) && index.contains_key(edge.target.as_str()) {
            edges.push(edge);
        }
    }

    for edge in &edges {
        if let Some(&i) = index.get(edge.source.as_str()) {
            nodes[i].out_degree += 1;
        }
    }

    debug!(
        rows = rows.len(),
        nodes = nodes.len(),
        edges = edges.len(),
        "built graph model"
    );

    GraphModel { nodes, edges }
}

// ============================================================================
// Model Queries
// ============================================================================

impl GraphModel {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Map from node id to its index in `nodes`.
    pub fn index(&self) -> HashMap<&str, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect()
    }

    /// Edges as `(source_index, target_index)` pairs, in edge order.
    pub fn edge_indices(&self) -> Vec<(usize, usize)> {
        let index = self.index();
        self.edges
            .iter()
            .filter_map(|e| {
                Some((
                    *index.get(e.source.as_str())?,
                    *index.get(e.target.as_str())?,
                ))
            })
            .collect()
    }

    pub fn stats(&self) -> GraphStats {
        let mut touched: HashSet<&str> = HashSet::new();
        for edge in &self.edges {
            touched.insert(edge.source.as_str());
            touched.insert(edge.target.as_str());
        }
        GraphStats {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            orphan_count: self
                .nodes
                .iter()
                .filter(|n| !touched.contains(n.id.as_str()))
                .count(),
            max_out_degree: self.nodes.iter().map(|n| n.out_degree).max().unwrap_or(0),
        }
    }
}
