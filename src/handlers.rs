//! HTTP route handlers.
//!
//! Thin JSON wrappers around the link resolver, the preview renderer and the
//! graph model builder. Live graphs go through [`crate::session`].

use axum::extract::{rejection::JsonRejection, Query};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::graph::build_graph_model;
use crate::models::{GraphEdge, GraphNode, GraphRelationRow, GraphStats, PageRef};
use crate::preview::{render_preview, RenderedPreview};
use crate::session::ProfileQuery;
use crate::wiki_links;

// ============================================================================
// Wiki Links
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub text: String,
    #[serde(default)]
    pub pages: Vec<PageRef>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub markup: String,
}

/// POST /api/wiki/resolve
pub async fn resolve_links(
    body: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<ResolveResponse>, AppError> {
    let Json(req) = body?;
    Ok(Json(ResolveResponse {
        markup: wiki_links::resolve(&req.text, &req.pages),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LinksRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinksResponse {
    pub names: Vec<String>,
}

/// POST /api/wiki/links - raw link names in order, duplicates kept.
pub async fn extract_links(
    body: Result<Json<LinksRequest>, JsonRejection>,
) -> Result<Json<LinksResponse>, AppError> {
    let Json(req) = body?;
    Ok(Json(LinksResponse {
        names: wiki_links::extract_names(&req.text),
    }))
}

// ============================================================================
// Preview
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub content: String,
    #[serde(default)]
    pub pages: Vec<PageRef>,
}

/// POST /api/preview
pub async fn preview(
    body: Result<Json<PreviewRequest>, JsonRejection>,
) -> Result<Json<RenderedPreview>, AppError> {
    let Json(req) = body?;
    Ok(Json(render_preview(&req.content, &req.pages)))
}

// ============================================================================
// Graph Model
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GraphModelRequest {
    pub rows: Vec<GraphRelationRow>,
}

#[derive(Debug, Serialize)]
pub struct GraphModelResponse {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub stats: GraphStats,
}

/// POST /api/graph/model?profile=summary|full - one-shot model with seeded
/// positions, for clients that run their own layout.
pub async fn graph_model(
    Query(query): Query<ProfileQuery>,
    body: Result<Json<GraphModelRequest>, JsonRejection>,
) -> Result<Json<GraphModelResponse>, AppError> {
    let Json(req) = body?;
    let model = build_graph_model(&req.rows, query.profile.viewport());
    let stats = model.stats();
    Ok(Json(GraphModelResponse {
        nodes: model.nodes,
        edges: model.edges,
        stats,
    }))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
