//! Node and arrowhead sizing.
//!
//! Radius grows with out-degree so hubs read as larger circles; arrowheads are
//! offset by the radius of the node they point into.

use serde::Serialize;

pub const BASE_RADIUS: f64 = 20.0;
pub const RADIUS_PER_LINK: f64 = 5.0;
pub const MAX_RADIUS: f64 = 40.0;

pub fn node_radius(out_degree: usize) -> f64 {
    (BASE_RADIUS + out_degree as f64 * RADIUS_PER_LINK).min(MAX_RADIUS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowSize {
    Small,
    Medium,
    Large,
}

/// Arrowhead size for an edge, keyed to the radius of its target node.
pub fn arrow_size(target_radius: f64) -> ArrowSize {
    if target_radius <= 25.0 {
        ArrowSize::Small
    } else if target_radius <= 35.0 {
        ArrowSize::Medium
    } else {
        ArrowSize::Large
    }
}

impl ArrowSize {
    pub fn marker_id(self) -> &'static str {
        match self {
            ArrowSize::Small => "arrowhead-small",
            ArrowSize::Medium => "arrowhead-medium",
            ArrowSize::Large => "arrowhead-large",
        }
    }

    /// Distance back from the target centre where the arrow tip sits.
    pub fn ref_offset(self) -> f64 {
        match self {
            ArrowSize::Small => 25.0,
            ArrowSize::Medium => 35.0,
            ArrowSize::Large => 45.0,
        }
    }
}
