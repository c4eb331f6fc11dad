//! WebSocket graph sessions.
//!
//! Each connection owns one [`GraphView`]. A single task multiplexes client
//! messages, the frame clock and relation fetch completions, so the view is
//! only ever touched from that task.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::interaction::{InteractionOutcome, PointerEvent};
use crate::models::{GraphRelationRow, Vec2, ViewProfile};
use crate::view::{GraphFrame, GraphView, RefreshTicket};
use crate::AppState;

// ============================================================================
// Wire Protocol
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Rebuild from rows the client already has.
    Refresh { rows: Vec<GraphRelationRow> },
    /// Rebuild from the configured relation source.
    Reload,
    DragStart { x: f64, y: f64 },
    DragMove { x: f64, y: f64 },
    DragEnd { x: f64, y: f64 },
    Zoom {
        x: f64,
        y: f64,
        delta_y: f64,
        #[serde(default)]
        line_mode: bool,
    },
    Click { x: f64, y: f64 },
}

impl ClientMessage {
    pub fn pointer_event(&self) -> Option<PointerEvent> {
        let event = match *self {
            ClientMessage::DragStart { x, y } => PointerEvent::DragStart { at: Vec2::new(x, y) },
            ClientMessage::DragMove { x, y } => PointerEvent::DragMove { at: Vec2::new(x, y) },
            ClientMessage::DragEnd { x, y } => PointerEvent::DragEnd { at: Vec2::new(x, y) },
            ClientMessage::Zoom {
                x,
                y,
                delta_y,
                line_mode,
            } => PointerEvent::Zoom {
                at: Vec2::new(x, y),
                delta_y,
                line_mode,
            },
            ClientMessage::Click { x, y } => PointerEvent::Click { at: Vec2::new(x, y) },
            ClientMessage::Refresh { .. } | ClientMessage::Reload => return None,
        };
        Some(event)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Frame(GraphFrame),
    Navigate { page_id: String, path: String },
    Error { message: String },
}

impl ServerMessage {
    pub fn error(err: &AppError) -> Self {
        ServerMessage::Error {
            message: err.to_string(),
        }
    }
}

/// What the socket loop should do after a client message.
#[derive(Debug)]
pub enum Reply {
    None,
    Send(ServerMessage),
    Fetch(RefreshTicket),
}

// ============================================================================
// Session State
// ============================================================================

pub struct GraphSession {
    id: u64,
    view: GraphView,
    dirty: bool,
}

impl GraphSession {
    pub fn new(id: u64, profile: ViewProfile, config: &Config) -> Self {
        let params = config.layout.params(profile).clone();
        Self {
            id,
            view: GraphView::new(profile, params, config.layout.backend),
            // the first tick sends the empty placeholder frame
            dirty: true,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn view(&self) -> &GraphView {
        &self.view
    }

    pub fn handle(&mut self, message: ClientMessage) -> Reply {
        if let Some(event) = message.pointer_event() {
            return match self.view.handle_pointer(event) {
                InteractionOutcome::Ignored => Reply::None,
                InteractionOutcome::Changed => {
                    self.dirty = true;
                    Reply::None
                }
                InteractionOutcome::Navigate(request) => {
                    debug!(session = self.id, page_id = %request.page_id, "navigate");
                    Reply::Send(ServerMessage::Navigate {
                        path: request.path(),
                        page_id: request.page_id,
                    })
                }
            };
        }
        match message {
            ClientMessage::Refresh { rows } => {
                self.dirty |= self.view.refresh(&rows);
                Reply::None
            }
            ClientMessage::Reload => Reply::Fetch(self.view.begin_refresh()),
            _ => Reply::None,
        }
    }

    /// Apply a finished relation fetch. Failures keep the current graph.
    pub fn complete_fetch(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<GraphRelationRow>, AppError>,
    ) -> Option<ServerMessage> {
        match result {
            Ok(rows) => {
                self.dirty |= self.view.complete_refresh(ticket, &rows);
                None
            }
            Err(err) if self.view.is_current(ticket) => {
                warn!(session = self.id, error = %err, "relation fetch failed");
                Some(ServerMessage::error(&err))
            }
            Err(err) => {
                debug!(session = self.id, error = %err, "ignoring failure of superseded fetch");
                None
            }
        }
    }

    /// One frame-clock tick. Returns a frame when something moved or changed.
    pub fn tick(&mut self) -> Option<ServerMessage> {
        if self.view.is_animating() {
            self.view.frame();
            self.dirty = true;
        }
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(ServerMessage::Frame(self.view.snapshot()))
    }

    pub fn close(&mut self) {
        self.view.teardown();
    }
}

// ============================================================================
// WebSocket Handler
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    #[serde(default)]
    pub profile: ViewProfile,
}

/// GET /api/graph/ws - live graph session.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProfileQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, state, query.profile))
}

type FetchResult = (RefreshTicket, Result<Vec<GraphRelationRow>, AppError>);

async fn handle_ws(socket: WebSocket, state: Arc<AppState>, profile: ViewProfile) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut session = GraphSession::new(state.next_session_id(), profile, &state.config);
    let (fetch_tx, mut fetch_rx) = mpsc::channel::<FetchResult>(4);

    let mut clock = tokio::time::interval(state.config.server.frame_interval());
    clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(session = session.id(), ?profile, "graph session opened");

    loop {
        let outgoing = tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(message) => match session.handle(message) {
                                Reply::None => None,
                                Reply::Send(reply) => Some(reply),
                                Reply::Fetch(ticket) => {
                                    spawn_fetch(&state, ticket, fetch_tx.clone());
                                    None
                                }
                            },
                            Err(e) => Some(ServerMessage::error(&AppError::from(e))),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(session = session.id(), error = %e, "socket error");
                        break;
                    }
                    _ => None,
                }
            }
            Some((ticket, result)) = fetch_rx.recv() => session.complete_fetch(ticket, result),
            _ = clock.tick() => session.tick(),
        };

        let Some(message) = outgoing else {
            continue;
        };
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                warn!(session = session.id(), error = %e, "failed to encode message");
                continue;
            }
        };
        if ws_tx.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }

    session.close();
    info!(session = session.id(), "graph session closed");
}

fn spawn_fetch(state: &AppState, ticket: RefreshTicket, tx: mpsc::Sender<FetchResult>) {
    let client = state.http.clone();
    let url = state.config.server.graph_url.clone();
    tokio::spawn(async move {
        let result = match url {
            Some(url) => fetch_relations(&client, &url).await,
            None => Err(AppError::NoGraphSource),
        };
        tx.send((ticket, result)).await.ok();
    });
}

/// GET the relation rows from the configured backend.
pub async fn fetch_relations(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<GraphRelationRow>, AppError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(AppError::FetchStatus(response.status().as_u16()));
    }
    Ok(response.json().await?)
}
