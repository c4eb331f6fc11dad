//! Force-directed layout.
//!
//! A [`Simulation`] owns a graph model and advances it one relaxation step per
//! rendered frame. The physics itself sits behind [`PhysicsStepper`]; the
//! simulation only owns the cooling schedule ("alpha"), pin enforcement and
//! the running/idle/stopped lifecycle.
//!
//! Cooling follows the usual force-layout schedule: each tick moves alpha a
//! fixed fraction toward `alpha_target`. With the default decay, alpha falls
//! from 1 to `alpha_min` in about 300 ticks, after which the simulation idles
//! until something reheats it.

mod force_graph_backend;
mod forces;
pub mod sizing;

pub use force_graph_backend::ForceGraphStepper;
pub use forces::ForceStepper;
pub use sizing::{arrow_size, node_radius, ArrowSize};

use crate::models::{GraphModel, GraphNode, Vec2, ViewProfile};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_ALPHA_MIN: f64 = 0.001;
/// Alpha target while a node is being dragged.
pub const DRAG_ALPHA_TARGET: f64 = 0.3;

// ============================================================================
// Parameters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutParams {
    /// Rest length of link springs.
    pub link_distance: f64,
    /// Many-body strength; negative values repel.
    pub charge_strength: f64,
    pub center_strength: f64,
    pub collision: bool,
    pub collision_strength: f64,
    /// Fraction of velocity lost per tick.
    pub velocity_decay: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
}

impl LayoutParams {
    fn base() -> Self {
        Self {
            link_distance: 150.0,
            charge_strength: -400.0,
            center_strength: 1.0,
            collision: true,
            collision_strength: 1.0,
            velocity_decay: 0.4,
            alpha_min: DEFAULT_ALPHA_MIN,
            alpha_decay: 1.0 - DEFAULT_ALPHA_MIN.powf(1.0 / 300.0),
        }
    }

    /// Full-page graph: longer links, stronger repulsion, collision on.
    pub fn full() -> Self {
        Self::base()
    }

    /// Embedded summary graph: tighter and without collision.
    pub fn summary() -> Self {
        Self {
            link_distance: 120.0,
            charge_strength: -220.0,
            collision: false,
            ..Self::base()
        }
    }

    pub fn for_profile(profile: ViewProfile) -> Self {
        match profile {
            ViewProfile::Summary => Self::summary(),
            ViewProfile::Full => Self::full(),
        }
    }
}

// ============================================================================
// Physics Backends
// ============================================================================

/// One relaxation step over a node set.
///
/// Implementations move `nodes` in place. `edges` index into `nodes`.
/// `alpha` is the current temperature in `[0, 1]`; it scales how far nodes move.
pub trait PhysicsStepper: Send {
    fn step(&mut self, nodes: &mut [GraphNode], edges: &[(usize, usize)], alpha: f64);
}

/// Which [`PhysicsStepper`] a view runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicsBackend {
    #[default]
    Forces,
    ForceGraph,
}

impl PhysicsBackend {
    pub fn stepper(self, params: &LayoutParams, center: Vec2) -> Box<dyn PhysicsStepper> {
        match self {
            PhysicsBackend::Forces => Box::new(ForceStepper::new(params.clone(), center)),
            PhysicsBackend::ForceGraph => Box::new(ForceGraphStepper::new(params.clone(), center)),
        }
    }
}

// ============================================================================
// Simulation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationState {
    Running,
    /// Cooled below `alpha_min`; resumes when reheated.
    Idle,
    /// Torn down. Never moves nodes again.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Sum of node displacements during this tick.
    pub movement: f64,
    pub alpha: f64,
    pub state: SimulationState,
}

pub struct Simulation {
    model: GraphModel,
    edges: Vec<(usize, usize)>,
    stepper: Box<dyn PhysicsStepper>,
    alpha: f64,
    alpha_target: f64,
    alpha_min: f64,
    alpha_decay: f64,
    state: SimulationState,
    ticks: u64,
}

impl Simulation {
    pub fn new(model: GraphModel, params: &LayoutParams, stepper: Box<dyn PhysicsStepper>) -> Self {
        let edges = model.edge_indices();
        let state = if model.is_empty() {
            SimulationState::Idle
        } else {
            SimulationState::Running
        };
        Self {
            model,
            edges,
            stepper,
            alpha: 1.0,
            alpha_target: 0.0,
            alpha_min: params.alpha_min,
            alpha_decay: params.alpha_decay,
            state,
            ticks: 0,
        }
    }

    /// Simulation with the built-in force backend centred on `center`.
    pub fn with_forces(model: GraphModel, params: &LayoutParams, center: Vec2) -> Self {
        let stepper = Box::new(ForceStepper::new(params.clone(), center));
        Self::new(model, params, stepper)
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.model.nodes
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_running(&self) -> bool {
        self.state == SimulationState::Running
    }

    /// Advance one step. Does nothing unless running.
    pub fn tick(&mut self) -> TickReport {
        if self.state != SimulationState::Running {
            return TickReport {
                movement: 0.0,
                alpha: self.alpha,
                state: self.state,
            };
        }

        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        let before: Vec<Vec2> = self.model.nodes.iter().map(|n| n.position).collect();

        self.stepper
            .step(&mut self.model.nodes, &self.edges, self.alpha);

        // Pins hold regardless of what the backend did
        for node in &mut self.model.nodes {
            if let Some(pin) = node.pinned {
                node.position = pin;
                node.velocity = Vec2::ZERO;
            }
        }

        let movement = self
            .model
            .nodes
            .iter()
            .zip(&before)
            .map(|(n, p)| n.position.distance(*p))
            .sum();

        self.ticks += 1;
        if self.alpha < self.alpha_min {
            self.state = SimulationState::Idle;
            debug!(ticks = self.ticks, "simulation cooled to idle");
        }

        TickReport {
            movement,
            alpha: self.alpha,
            state: self.state,
        }
    }

    pub fn set_alpha_target(&mut self, target: f64) {
        self.alpha_target = target;
    }

    /// Resume an idle simulation. A stopped one stays stopped.
    pub fn restart(&mut self) {
        if self.state == SimulationState::Idle && !self.model.is_empty() {
            self.state = SimulationState::Running;
        }
    }

    /// Raise the alpha target and resume.
    pub fn reheat(&mut self, target: f64) {
        self.set_alpha_target(target);
        self.restart();
    }

    pub fn stop(&mut self) {
        if self.state != SimulationState::Stopped {
            debug!(ticks = self.ticks, "simulation stopped");
        }
        self.state = SimulationState::Stopped;
    }

    /// Fix a node at `position`. Returns false for an unknown id.
    pub fn pin(&mut self, id: &str, position: Vec2) -> bool {
        if self.state == SimulationState::Stopped {
            return false;
        }
        match self.model.node_mut(id) {
            Some(node) => {
                node.pinned = Some(position);
                true
            }
            None => false,
        }
    }

    pub fn unpin(&mut self, id: &str) -> bool {
        match self.model.node_mut(id) {
            Some(node) => {
                node.pinned = None;
                true
            }
            None => false,
        }
    }
}
