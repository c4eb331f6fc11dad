//! Pointer interaction with a live graph.
//!
//! The host UI reports gestures already disambiguated (a click is never also
//! a drag), in screen coordinates. Dragging a node pins it under the pointer
//! while the simulation relaxes everything else around it; dragging the
//! background pans; the wheel zooms. Pan and zoom only change the
//! [`ViewTransform`], never node positions.

use crate::layout::{node_radius, Simulation, DRAG_ALPHA_TARGET};
use crate::models::{GraphNode, Vec2};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 4.0;

/// Wheel delta to zoom exponent, per pixel and per line.
const WHEEL_PIXEL_SCALE: f64 = 0.002;
const WHEEL_LINE_SCALE: f64 = 0.05;

// ============================================================================
// View Transform
// ============================================================================

/// Screen = layout * k + (x, y).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            k: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn screen_to_layout(&self, p: Vec2) -> Vec2 {
        Vec2::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }

    pub fn layout_to_screen(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    /// Scale by `factor` keeping the layout point under `pointer` fixed.
    pub fn zoom_about(&mut self, pointer: Vec2, factor: f64) {
        let anchor = self.screen_to_layout(pointer);
        self.k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.x = pointer.x - anchor.x * self.k;
        self.y = pointer.y - anchor.y * self.k;
    }
}

/// Zoom factor for a wheel event.
pub fn wheel_zoom_factor(delta_y: f64, line_mode: bool) -> f64 {
    let scale = if line_mode {
        WHEEL_LINE_SCALE
    } else {
        WHEEL_PIXEL_SCALE
    };
    2f64.powf(-delta_y * scale)
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    DragStart { at: Vec2 },
    DragMove { at: Vec2 },
    DragEnd { at: Vec2 },
    Zoom { at: Vec2, delta_y: f64, line_mode: bool },
    Click { at: Vec2 },
}

/// Request for the router to open a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationRequest {
    pub page_id: String,
}

impl NavigationRequest {
    pub fn path(&self) -> String {
        format!("/editor/{}", urlencoding::encode(&self.page_id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionOutcome {
    Ignored,
    /// Pins or the view transform changed; redraw.
    Changed,
    Navigate(NavigationRequest),
}

// ============================================================================
// Controller
// ============================================================================

#[derive(Debug, Clone)]
struct NodeDrag {
    node_id: String,
    /// Node position minus pointer position at drag start, in layout space.
    grab_offset: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct Pan {
    start: Vec2,
    origin: ViewTransform,
}

#[derive(Debug, Default)]
pub struct GraphInteractionController {
    transform: ViewTransform,
    drag: Option<NodeDrag>,
    pan: Option<Pan>,
}

impl GraphInteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn dragged_node(&self) -> Option<&str> {
        self.drag.as_ref().map(|d| d.node_id.as_str())
    }

    /// Forget any gesture in progress, e.g. after the graph was rebuilt.
    pub fn reset_gestures(&mut self) {
        self.drag = None;
        self.pan = None;
    }

    pub fn handle(&mut self, event: PointerEvent, sim: &mut Simulation) -> InteractionOutcome {
        match event {
            PointerEvent::DragStart { at } => self.drag_start(at, sim),
            PointerEvent::DragMove { at } => self.drag_move(at, sim),
            PointerEvent::DragEnd { .. } => self.drag_end(sim),
            PointerEvent::Zoom {
                at,
                delta_y,
                line_mode,
            } => {
                self.transform
                    .zoom_about(at, wheel_zoom_factor(delta_y, line_mode));
                InteractionOutcome::Changed
            }
            PointerEvent::Click { at } => self.click(at, sim),
        }
    }

    /// Topmost node under a screen point.
    pub fn node_at(&self, nodes: &[GraphNode], screen: Vec2) -> Option<usize> {
        let p = self.transform.screen_to_layout(screen);
        nodes
            .iter()
            .enumerate()
            .rev()
            .find(|(_, n)| n.position.distance(p) <= node_radius(n.out_degree))
            .map(|(i, _)| i)
    }

    fn drag_start(&mut self, at: Vec2, sim: &mut Simulation) -> InteractionOutcome {
        let Some(idx) = self.node_at(sim.nodes(), at) else {
            self.pan = Some(Pan {
                start: at,
                origin: self.transform,
            });
            return InteractionOutcome::Ignored;
        };

        let node = &sim.nodes()[idx];
        let (node_id, position) = (node.id.clone(), node.position);
        let pointer = self.transform.screen_to_layout(at);

        // A new grab replaces any drag still in progress
        match self.drag.take() {
            Some(prev) => {
                sim.unpin(&prev.node_id);
            }
            None => sim.reheat(DRAG_ALPHA_TARGET),
        }
        sim.pin(&node_id, position);
        debug!(node = %node_id, "drag start");

        self.drag = Some(NodeDrag {
            node_id,
            grab_offset: Vec2::new(position.x - pointer.x, position.y - pointer.y),
        });
        InteractionOutcome::Changed
    }

    fn drag_move(&mut self, at: Vec2, sim: &mut Simulation) -> InteractionOutcome {
        if let Some(drag) = &self.drag {
            let p = self.transform.screen_to_layout(at);
            let target = Vec2::new(p.x + drag.grab_offset.x, p.y + drag.grab_offset.y);
            sim.pin(&drag.node_id, target);
            return InteractionOutcome::Changed;
        }
        if let Some(pan) = self.pan {
            self.transform.x = pan.origin.x + (at.x - pan.start.x);
            self.transform.y = pan.origin.y + (at.y - pan.start.y);
            return InteractionOutcome::Changed;
        }
        InteractionOutcome::Ignored
    }

    fn drag_end(&mut self, sim: &mut Simulation) -> InteractionOutcome {
        self.pan = None;
        match self.drag.take() {
            Some(drag) => {
                sim.unpin(&drag.node_id);
                sim.set_alpha_target(0.0);
                debug!(node = %drag.node_id, "drag end");
                InteractionOutcome::Changed
            }
            None => InteractionOutcome::Ignored,
        }
    }

    fn click(&mut self, at: Vec2, sim: &Simulation) -> InteractionOutcome {
        match self.node_at(sim.nodes(), at) {
            Some(idx) => InteractionOutcome::Navigate(NavigationRequest {
                page_id: sim.nodes()[idx].id.clone(),
            }),
            None => InteractionOutcome::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ForceStepper, LayoutParams, SimulationState};
    use crate::models::{GraphEdge, GraphModel};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sim() -> Simulation {
        let mut home = GraphNode::new("1", "Home", Vec2::new(100.0, 100.0));
        home.out_degree = 1;
        let about = GraphNode::new("2", "About", Vec2::new(300.0, 100.0));
        let model = GraphModel {
            nodes: vec![home, about],
            edges: vec![GraphEdge {
                source: "1".into(),
                target: "2".into(),
                tag: None,
            }],
        };
        let params = LayoutParams::full();
        let stepper =
            ForceStepper::with_rng(params.clone(), Vec2::new(200.0, 100.0), StdRng::seed_from_u64(9));
        Simulation::new(model, &params, Box::new(stepper))
    }

    fn cool(sim: &mut Simulation) {
        for _ in 0..1000 {
            if sim.tick().state != SimulationState::Running {
                break;
            }
        }
    }

    fn position(sim: &Simulation, id: &str) -> Vec2 {
        sim.model().node(id).unwrap().position
    }

    #[test]
    fn test_drag_reheats_and_pins() {
        let mut sim = sim();
        cool(&mut sim);
        assert_eq!(sim.state(), SimulationState::Idle);

        let mut ctl = GraphInteractionController::new();
        let at = position(&sim, "1");
        let outcome = ctl.handle(PointerEvent::DragStart { at }, &mut sim);
        assert_eq!(outcome, InteractionOutcome::Changed);
        assert!(sim.is_running());
        assert_eq!(sim.alpha_target(), DRAG_ALPHA_TARGET);
        assert_eq!(ctl.dragged_node(), Some("1"));

        let to = Vec2::new(at.x + 40.0, at.y - 10.0);
        ctl.handle(PointerEvent::DragMove { at: to }, &mut sim);
        sim.tick();
        assert_eq!(position(&sim, "1"), to);
    }

    #[test]
    fn test_drag_end_clears_pin() {
        let mut sim = sim();
        let mut ctl = GraphInteractionController::new();
        let at = position(&sim, "2");
        ctl.handle(PointerEvent::DragStart { at }, &mut sim);
        assert!(sim.model().node("2").unwrap().pinned.is_some());

        ctl.handle(PointerEvent::DragEnd { at }, &mut sim);
        assert!(sim.model().node("2").unwrap().pinned.is_none());
        assert_eq!(sim.alpha_target(), 0.0);
        assert!(ctl.dragged_node().is_none());
    }

    #[test]
    fn test_second_drag_start_releases_first_node() {
        let mut sim = sim();
        let mut ctl = GraphInteractionController::new();
        let first = position(&sim, "1");
        let second = position(&sim, "2");
        ctl.handle(PointerEvent::DragStart { at: first }, &mut sim);
        ctl.handle(PointerEvent::DragStart { at: second }, &mut sim);
        assert!(sim.model().node("1").unwrap().pinned.is_none());
        assert_eq!(ctl.dragged_node(), Some("2"));

        ctl.handle(PointerEvent::DragEnd { at: second }, &mut sim);
        assert!(sim.nodes().iter().all(|n| n.pinned.is_none()));
        assert_eq!(sim.alpha_target(), 0.0);
    }

    #[test]
    fn test_drag_follows_pointer_under_zoom() {
        let mut sim = sim();
        let mut ctl = GraphInteractionController::new();
        ctl.handle(
            PointerEvent::Zoom {
                at: Vec2::new(0.0, 0.0),
                delta_y: -500.0,
                line_mode: false,
            },
            &mut sim,
        );
        let t = ctl.transform();
        assert!((t.k - 2.0).abs() < 1e-9);

        let at = t.layout_to_screen(position(&sim, "1"));
        ctl.handle(PointerEvent::DragStart { at }, &mut sim);
        ctl.handle(
            PointerEvent::DragMove {
                at: Vec2::new(at.x + 20.0, at.y),
            },
            &mut sim,
        );
        let pinned = sim.model().node("1").unwrap().pinned.unwrap();
        assert!((pinned.x - 110.0).abs() < 1e-9);
        assert!((pinned.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_never_moves_nodes() {
        let mut sim = sim();
        let before = sim.nodes().to_vec();
        let mut ctl = GraphInteractionController::new();
        ctl.handle(
            PointerEvent::Zoom {
                at: Vec2::new(50.0, 50.0),
                delta_y: 120.0,
                line_mode: false,
            },
            &mut sim,
        );
        assert_eq!(sim.nodes(), &before[..]);
        assert!(ctl.transform().k < 1.0);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut t = ViewTransform::default();
        t.zoom_about(Vec2::new(10.0, 10.0), 1000.0);
        assert_eq!(t.k, MAX_ZOOM);
        t.zoom_about(Vec2::new(10.0, 10.0), 1e-6);
        assert_eq!(t.k, MIN_ZOOM);
    }

    #[test]
    fn test_zoom_keeps_pointer_anchor() {
        let mut t = ViewTransform::default();
        let pointer = Vec2::new(320.0, 200.0);
        let before = t.screen_to_layout(pointer);
        t.zoom_about(pointer, 1.7);
        let after = t.screen_to_layout(pointer);
        assert!(before.distance(after) < 1e-9);
    }

    #[test]
    fn test_wheel_factor() {
        assert!((wheel_zoom_factor(-500.0, false) - 2.0).abs() < 1e-12);
        assert!((wheel_zoom_factor(20.0, true) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_background_drag_pans() {
        let mut sim = sim();
        let before = sim.nodes().to_vec();
        let mut ctl = GraphInteractionController::new();
        let outcome = ctl.handle(
            PointerEvent::DragStart {
                at: Vec2::new(600.0, 600.0),
            },
            &mut sim,
        );
        assert_eq!(outcome, InteractionOutcome::Ignored);
        ctl.handle(
            PointerEvent::DragMove {
                at: Vec2::new(630.0, 590.0),
            },
            &mut sim,
        );
        ctl.handle(
            PointerEvent::DragEnd {
                at: Vec2::new(630.0, 590.0),
            },
            &mut sim,
        );
        assert_eq!(ctl.transform().x, 30.0);
        assert_eq!(ctl.transform().y, -10.0);
        assert_eq!(sim.nodes(), &before[..]);
    }

    #[test]
    fn test_click_on_node_navigates() {
        let mut sim = sim();
        let mut ctl = GraphInteractionController::new();
        let outcome = ctl.handle(
            PointerEvent::Click {
                at: Vec2::new(305.0, 95.0),
            },
            &mut sim,
        );
        let InteractionOutcome::Navigate(req) = outcome else {
            panic!("expected navigation");
        };
        assert_eq!(req.page_id, "2");
        assert_eq!(req.path(), "/editor/2");
    }

    #[test]
    fn test_click_on_background_is_ignored() {
        let mut sim = sim();
        let mut ctl = GraphInteractionController::new();
        let outcome = ctl.handle(
            PointerEvent::Click {
                at: Vec2::new(200.0, 400.0),
            },
            &mut sim,
        );
        assert_eq!(outcome, InteractionOutcome::Ignored);
    }

    #[test]
    fn test_hit_radius_grows_with_out_degree() {
        let sim = sim();
        let ctl = GraphInteractionController::new();
        // Home has out-degree 1, so radius 25.
        assert_eq!(ctl.node_at(sim.nodes(), Vec2::new(124.0, 100.0)), Some(0));
        assert_eq!(ctl.node_at(sim.nodes(), Vec2::new(324.0, 100.0)), None);
    }
}
