//! Data models for the wiki graph engine.
//!
//! This module contains the wire and in-memory types shared by link
//! resolution, graph building, layout and the interaction layer.

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Pages
// ============================================================================

/// A page known to the wiki, used only for name lookups during link resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: String,
    pub name: String,
}

impl PageRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// ============================================================================
// Relation Rows
// ============================================================================

/// One denormalized row of the node/edge join supplied by the backend.
///
/// Empty strings and missing values for `edge_from`/`edge_to` both mean the
/// row carries no edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphRelationRow {
    pub node_id: String,
    pub node_name: String,
    #[serde(default)]
    pub edge_from: Option<String>,
    #[serde(default)]
    pub edge_to: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tag")]
    pub tag: Option<String>,
}

impl GraphRelationRow {
    pub fn node(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            node_id: id.into(),
            node_name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_edge(mut self, from: &str, to: &str, tag: Option<&str>) -> Self {
        self.edge_from = Some(from.to_string());
        self.edge_to = Some(to.to_string());
        self.tag = tag.map(str::to_string);
        self
    }

    /// The `(from, to)` pair when both endpoints are present and non-empty.
    pub fn edge(&self) -> Option<(&str, &str)> {
        let from = self.edge_from.as_deref().filter(|s| !s.is_empty())?;
        let to = self.edge_to.as_deref().filter(|s| !s.is_empty())?;
        Some((from, to))
    }
}

/// Tags arrive either as plain strings or as the nullable-string object
/// `{"String": "...", "Valid": true}` produced by SQL-backed services.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTag {
    Plain(String),
    Nullable {
        #[serde(rename = "String")]
        value: String,
        #[serde(rename = "Valid")]
        valid: bool,
    },
}

fn deserialize_tag<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTag>::deserialize(deserializer)?;
    let tag = match raw {
        Some(RawTag::Plain(s)) => Some(s),
        Some(RawTag::Nullable { value, valid: true }) => Some(value),
        Some(RawTag::Nullable { valid: false, .. }) | None => None,
    };
    Ok(tag.filter(|t| !t.is_empty()))
}

// ============================================================================
// Graph Types
// ============================================================================

/// A point or displacement in layout coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub position: Vec2,
    #[serde(skip)]
    pub velocity: Vec2,
    /// Set while the user drags the node; the simulation leaves it in place.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pinned: Option<Vec2>,
    pub out_degree: usize,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: Vec2) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position,
            velocity: Vec2::ZERO,
            pinned: None,
            out_degree: 0,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub orphan_count: usize, // Nodes with no edges in either direction
    pub max_out_degree: usize,
}

// ============================================================================
// Viewports
// ============================================================================

/// Fixed logical size of a rendered graph surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// The two places a graph is shown: embedded on the home page, or full page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewProfile {
    Summary,
    #[default]
    #[serde(alias = "full_page", alias = "fullpage")]
    Full,
}

impl ViewProfile {
    pub fn viewport(self) -> Viewport {
        match self {
            ViewProfile::Summary => Viewport::new(960.0, 420.0),
            ViewProfile::Full => Viewport::new(1200.0, 700.0),
        }
    }

    /// Text shown in place of the diagram when there is nothing to draw.
    pub fn placeholder(self) -> &'static str {
        match self {
            ViewProfile::Summary => "graph is empty",
            ViewProfile::Full => "Graph is empty - create pages and add links",
        }
    }
}
