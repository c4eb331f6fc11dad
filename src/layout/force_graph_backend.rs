//! Adapter running the `force_graph` crate's spring/charge simulation behind
//! [`PhysicsStepper`].
//!
//! The crate has no notion of a rest length, centering or collision. Spring
//! and charge constants are derived from [`LayoutParams`], and after each
//! crate update the built-in centering and collision passes run on the
//! synced-out positions.

use super::forces::ForceStepper;
use super::{LayoutParams, PhysicsStepper};
use crate::models::{GraphNode, Vec2};
use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

const NODE_MASS: f32 = 10.0;
const FRAME_DT: f32 = 0.016;

/// Crate constants that match the full-page profile.
const BASE_CHARGE: f64 = 150.0;
const BASE_SPRING: f64 = 0.05;
const BASE_LINK_DISTANCE: f64 = 150.0;
const BASE_CHARGE_STRENGTH: f64 = 400.0;

pub struct ForceGraphStepper {
    graph: Option<ForceGraph<usize, ()>>,
    /// Edge list the current `graph` was built from.
    built_for: Vec<(usize, usize)>,
    node_count: usize,
    params: LayoutParams,
    constraints: ForceStepper,
    dt: f32,
}

impl ForceGraphStepper {
    pub fn new(params: LayoutParams, center: Vec2) -> Self {
        Self {
            graph: None,
            built_for: Vec::new(),
            node_count: 0,
            constraints: ForceStepper::new(params.clone(), center),
            params,
            dt: FRAME_DT,
        }
    }

    fn parameters(params: &LayoutParams) -> SimulationParameters {
        let charge = (-params.charge_strength).max(0.0) / BASE_CHARGE_STRENGTH * BASE_CHARGE;
        let spring = BASE_SPRING * BASE_LINK_DISTANCE / params.link_distance.max(1.0);
        SimulationParameters {
            force_charge: charge as f32,
            force_spring: spring as f32,
            force_max: 100.0,
            node_speed: 3000.0,
            damping_factor: (1.0 - params.velocity_decay / 4.0).clamp(0.0, 1.0) as f32,
        }
    }

    fn rebuild(&mut self, nodes: &[GraphNode], edges: &[(usize, usize)]) {
        let mut graph = ForceGraph::new(Self::parameters(&self.params));
        let indices: Vec<DefaultNodeIdx> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                graph.add_node(NodeData {
                    x: node.position.x as f32,
                    y: node.position.y as f32,
                    mass: NODE_MASS,
                    is_anchor: node.is_pinned(),
                    user_data: i,
                })
            })
            .collect();
        for &(s, t) in edges {
            if s != t {
                graph.add_edge(indices[s], indices[t], EdgeData::default());
            }
        }
        self.graph = Some(graph);
        self.built_for = edges.to_vec();
        self.node_count = nodes.len();
    }
}

impl PhysicsStepper for ForceGraphStepper {
    fn step(&mut self, nodes: &mut [GraphNode], edges: &[(usize, usize)], alpha: f64) {
        if self.graph.is_none() || self.node_count != nodes.len() || self.built_for != edges {
            self.rebuild(nodes, edges);
        }
        let Some(graph) = self.graph.as_mut() else {
            return;
        };

        graph.visit_nodes_mut(|node| {
            let source = &nodes[node.data.user_data];
            let at = source.pinned.unwrap_or(source.position);
            node.data.x = at.x as f32;
            node.data.y = at.y as f32;
            node.data.is_anchor = source.is_pinned();
        });

        graph.update(self.dt * alpha.min(1.0) as f32);

        graph.visit_nodes(|node| {
            let target = &mut nodes[node.data.user_data];
            if target.pinned.is_none() {
                target.position = Vec2::new(node.x() as f64, node.y() as f64);
            }
        });

        self.constraints.constrain(nodes);
    }
}
