//! A graph view: one model, one simulation, one interaction controller.
//!
//! The view is the single owner of its graph. Every refresh rebuilds the
//! model from scratch and replaces the simulation, stopping the old one
//! first. Refreshes that complete out of order are recognised by their
//! generation ticket and dropped.

use crate::graph::build_graph_model;
use crate::interaction::{GraphInteractionController, InteractionOutcome, PointerEvent, ViewTransform};
use crate::layout::{
    arrow_size, node_radius, ArrowSize, LayoutParams, PhysicsBackend, Simulation, SimulationState,
    TickReport,
};
use crate::models::{GraphRelationRow, GraphStats, ViewProfile, Viewport};
use serde::Serialize;
use tracing::debug;

/// Identifies one refresh request. Only the newest ticket may apply its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

pub struct GraphView {
    profile: ViewProfile,
    viewport: Viewport,
    params: LayoutParams,
    backend: PhysicsBackend,
    simulation: Option<Simulation>,
    controller: GraphInteractionController,
    generation: u64,
    torn_down: bool,
}

impl GraphView {
    pub fn new(profile: ViewProfile, params: LayoutParams, backend: PhysicsBackend) -> Self {
        Self {
            profile,
            viewport: profile.viewport(),
            params,
            backend,
            simulation: None,
            controller: GraphInteractionController::new(),
            generation: 0,
            torn_down: false,
        }
    }

    pub fn for_profile(profile: ViewProfile) -> Self {
        Self::new(profile, LayoutParams::for_profile(profile), PhysicsBackend::default())
    }

    pub fn profile(&self) -> ViewProfile {
        self.profile
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn transform(&self) -> ViewTransform {
        self.controller.transform()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn is_animating(&self) -> bool {
        self.simulation.as_ref().is_some_and(Simulation::is_running)
    }

    // ------------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------------

    /// Start a refresh. Any earlier ticket becomes stale.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.generation += 1;
        RefreshTicket(self.generation)
    }

    /// Apply the rows fetched for `ticket`. Returns false if the ticket is
    /// stale or the view has been torn down.
    pub fn complete_refresh(&mut self, ticket: RefreshTicket, rows: &[GraphRelationRow]) -> bool {
        if !self.is_current(ticket) {
            debug!(ticket = ticket.0, current = self.generation, "dropping stale refresh");
            return false;
        }
        self.rebuild(rows);
        true
    }

    /// True while `ticket` is the newest refresh of a live view.
    pub fn is_current(&self, ticket: RefreshTicket) -> bool {
        !self.torn_down && ticket.0 == self.generation
    }

    /// Synchronous refresh with rows already in hand.
    pub fn refresh(&mut self, rows: &[GraphRelationRow]) -> bool {
        let ticket = self.begin_refresh();
        self.complete_refresh(ticket, rows)
    }

    fn rebuild(&mut self, rows: &[GraphRelationRow]) {
        if let Some(old) = self.simulation.as_mut() {
            old.stop();
        }
        self.controller.reset_gestures();

        let model = build_graph_model(rows, self.viewport);
        let stepper = self.backend.stepper(&self.params, self.viewport.center());
        self.simulation = Some(Simulation::new(model, &self.params, stepper));
    }

    /// Stop the simulation for good and invalidate in-flight refreshes.
    pub fn teardown(&mut self) {
        if let Some(sim) = self.simulation.as_mut() {
            sim.stop();
        }
        self.generation += 1;
        self.torn_down = true;
    }

    // ------------------------------------------------------------------------
    // Frames and input
    // ------------------------------------------------------------------------

    /// Advance the simulation by one frame.
    pub fn frame(&mut self) -> Option<TickReport> {
        self.simulation.as_mut().map(Simulation::tick)
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> InteractionOutcome {
        match self.simulation.as_mut() {
            Some(sim) if !self.torn_down => self.controller.handle(event, sim),
            _ => InteractionOutcome::Ignored,
        }
    }

    pub fn stats(&self) -> GraphStats {
        self.simulation
            .as_ref()
            .map(|s| s.model().stats())
            .unwrap_or_default()
    }

    /// Everything a renderer needs to draw the current state.
    pub fn snapshot(&self) -> GraphFrame {
        let mut frame = GraphFrame {
            width: self.viewport.width,
            height: self.viewport.height,
            transform: self.controller.transform(),
            state: self
                .simulation
                .as_ref()
                .map(Simulation::state)
                .unwrap_or(SimulationState::Idle),
            nodes: Vec::new(),
            edges: Vec::new(),
            placeholder: None,
        };

        let Some(sim) = self.simulation.as_ref().filter(|s| !s.model().is_empty()) else {
            frame.placeholder = Some(self.profile.placeholder());
            return frame;
        };

        let model = sim.model();
        frame.nodes = model
            .nodes
            .iter()
            .map(|n| FrameNode {
                id: n.id.clone(),
                name: n.name.clone(),
                x: n.position.x,
                y: n.position.y,
                radius: node_radius(n.out_degree),
                pinned: n.is_pinned(),
            })
            .collect();
        let index = model.index();
        frame.edges = model
            .edges
            .iter()
            .filter_map(|edge| {
                let src = &model.nodes[*index.get(edge.source.as_str())?];
                let tgt = &model.nodes[*index.get(edge.target.as_str())?];
                let arrow = arrow_size(node_radius(tgt.out_degree));
                Some(FrameEdge {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    tag: edge.tag.clone(),
                    x1: src.position.x,
                    y1: src.position.y,
                    x2: tgt.position.x,
                    y2: tgt.position.y,
                    arrow,
                    marker: arrow.marker_id(),
                })
            })
            .collect();
        frame
    }
}

impl Drop for GraphView {
    fn drop(&mut self) {
        if !self.torn_down {
            self.teardown();
        }
    }
}

// ============================================================================
// Frames
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GraphFrame {
    pub width: f64,
    pub height: f64,
    pub transform: ViewTransform,
    pub state: SimulationState,
    pub nodes: Vec<FrameNode>,
    pub edges: Vec<FrameEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameNode {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub pinned: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameEdge {
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub arrow: ArrowSize,
    pub marker: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Vec2;

    fn rows() -> Vec<GraphRelationRow> {
        vec![
            GraphRelationRow::node("1", "Home"),
            GraphRelationRow::node("2", "About").with_edge("1", "2", None),
        ]
    }

    #[test]
    fn test_empty_view_shows_placeholder() {
        let mut view = GraphView::for_profile(ViewProfile::Summary);
        assert!(view.refresh(&[]));
        let frame = view.snapshot();
        assert_eq!(frame.placeholder, Some("graph is empty"));
        assert!(frame.nodes.is_empty());
        assert!(!view.is_animating());
    }

    #[test]
    fn test_no_refresh_yet_shows_placeholder() {
        let view = GraphView::for_profile(ViewProfile::Full);
        let frame = view.snapshot();
        assert_eq!(frame.placeholder, Some(ViewProfile::Full.placeholder()));
        assert_eq!(frame.width, 1200.0);
    }

    #[test]
    fn test_refresh_builds_and_animates() {
        let mut view = GraphView::for_profile(ViewProfile::Full);
        view.refresh(&rows());
        assert!(view.is_animating());
        let frame = view.snapshot();
        assert_eq!(frame.nodes.len(), 2);
        assert_eq!(frame.edges.len(), 1);
        assert_eq!(frame.edges[0].arrow, ArrowSize::Small);
        assert_eq!(frame.edges[0].marker, "arrowhead-small");
        let home = frame.nodes.iter().find(|n| n.id == "1").unwrap();
        assert_eq!(home.radius, 25.0);
    }

    #[test]
    fn test_rebuild_replaces_simulation() {
        let mut view = GraphView::for_profile(ViewProfile::Full);
        view.refresh(&rows());
        for _ in 0..5 {
            view.frame();
        }
        assert_eq!(view.simulation().unwrap().ticks(), 5);
        view.refresh(&rows());
        assert_eq!(view.simulation().unwrap().ticks(), 0);
        assert!(view.is_animating());
    }

    #[test]
    fn test_stale_ticket_is_dropped() {
        let mut view = GraphView::for_profile(ViewProfile::Full);
        let first = view.begin_refresh();
        let second = view.begin_refresh();
        assert!(!view.complete_refresh(first, &rows()));
        assert!(view.simulation().is_none());
        assert!(view.complete_refresh(second, &rows()));
        assert_eq!(view.stats().total_nodes, 2);
    }

    #[test]
    fn test_teardown_stops_everything() {
        let mut view = GraphView::for_profile(ViewProfile::Full);
        let pending = view.begin_refresh();
        view.refresh(&rows());
        view.teardown();
        assert!(view.is_torn_down());
        assert!(!view.complete_refresh(pending, &rows()));
        assert_eq!(
            view.simulation().unwrap().state(),
            SimulationState::Stopped
        );
        let before = view.snapshot();
        let report = view.frame().unwrap();
        assert_eq!(report.movement, 0.0);
        let after = view.snapshot();
        assert_eq!(before.nodes[0].x, after.nodes[0].x);

        let at = Vec2::new(after.nodes[0].x, after.nodes[0].y);
        assert_eq!(
            view.handle_pointer(PointerEvent::Click { at }),
            InteractionOutcome::Ignored
        );
    }

    #[test]
    fn test_pointer_without_graph_is_ignored() {
        let mut view = GraphView::for_profile(ViewProfile::Summary);
        let outcome = view.handle_pointer(PointerEvent::DragStart {
            at: Vec2::new(1.0, 1.0),
        });
        assert_eq!(outcome, InteractionOutcome::Ignored);
    }

    #[test]
    fn test_force_graph_backend_view() {
        let mut view = GraphView::new(
            ViewProfile::Summary,
            LayoutParams::summary(),
            PhysicsBackend::ForceGraph,
        );
        view.refresh(&rows());
        for _ in 0..10 {
            view.frame();
        }
        assert!(view
            .snapshot()
            .nodes
            .iter()
            .all(|n| n.x.is_finite() && n.y.is_finite()));
    }

    #[test]
    fn test_force_graph_backend_settles_on_viewport_center() {
        let mut view = GraphView::new(
            ViewProfile::Full,
            LayoutParams::full(),
            PhysicsBackend::ForceGraph,
        );
        view.refresh(&[
            GraphRelationRow::node("1", "Home"),
            GraphRelationRow::node("2", "About").with_edge("1", "2", None),
            GraphRelationRow::node("3", "Notes").with_edge("1", "3", Some("see")),
        ]);
        let mut ticks = 0;
        while view.is_animating() {
            view.frame();
            ticks += 1;
            assert!(ticks < 5000, "layout never settled");
        }
        let frame = view.snapshot();
        let n = frame.nodes.len() as f64;
        let mx = frame.nodes.iter().map(|node| node.x).sum::<f64>() / n;
        let my = frame.nodes.iter().map(|node| node.y).sum::<f64>() / n;
        let center = ViewProfile::Full.viewport().center();
        assert!((mx - center.x).abs() < 1e-6, "mean x {}", mx);
        assert!((my - center.y).abs() < 1e-6, "mean y {}", my);
    }
}
