//! Wikigraph library - wiki-link resolution and the live page graph.
//!
//! - `wiki_links`: `[[Page Name]]` resolution and extraction
//! - `graph`: relation rows to a deduplicated graph model
//! - `layout`: force-directed simulation
//! - `interaction`: drag, pan, zoom and click over a live simulation
//! - `view`: one model + simulation + controller, with refresh tickets
//! - `preview`: Markdown preview with a link action table
//! - `session`, `handlers`: the HTTP/WebSocket host

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod graph;
pub mod handlers;
pub mod interaction;
pub mod layout;
pub mod models;
pub mod preview;
pub mod session;
pub mod view;
pub mod wiki_links;

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub config: config::Config,
    pub http: reqwest::Client,
    next_session_id: AtomicU64,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            next_session_id: AtomicU64::new(1),
        }
    }

    pub fn next_session_id(&self) -> u64 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(config::Config::default())
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Wiki links
        .route("/api/wiki/resolve", post(handlers::resolve_links))
        .route("/api/wiki/links", post(handlers::extract_links))
        .route("/api/preview", post(handlers::preview))
        // Graph
        .route("/api/graph/model", post(handlers::graph_model))
        .route("/api/graph/ws", get(session::ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until the listener fails.
pub async fn serve(state: Arc<AppState>) -> Result<(), AppError> {
    let bind = state.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("Wikigraph server running at http://{}", bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use error::AppError;
pub use graph::{build_graph_model, build_graph_model_with_rng};
pub use interaction::{
    GraphInteractionController, InteractionOutcome, NavigationRequest, PointerEvent,
    ViewTransform,
};
pub use layout::{LayoutParams, PhysicsBackend, Simulation, SimulationState};
pub use models::{
    GraphEdge, GraphModel, GraphNode, GraphRelationRow, GraphStats, PageRef, Vec2, ViewProfile,
    Viewport,
};
pub use preview::{render_preview, LinkAction, RenderedPreview};
pub use view::{GraphFrame, GraphView, RefreshTicket};
pub use wiki_links::{extract_names, resolve, ResolvedToken};
