//! Axum router: video stream, control WebSocket and a small JSON API.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::connections::{ConnectionRegistry, ConnectionStats};
use crate::control::ws_handler;
use crate::frame::Frame;
use crate::multiplexer::{snapshot_handler, video_handler};
use crate::playback::{Cursor, PlaybackState, PlaybackStatus};
use crate::pump::{PumpStats, PumpStatsSnapshot};

/// Shared application state.
pub struct AppState {
    pub(crate) playback: Arc<PlaybackState>,
    pub(crate) frames: broadcast::Sender<Frame>,
    pub(crate) latest: watch::Receiver<Option<Frame>>,
    pub(crate) stats: Arc<PumpStats>,
    pub(crate) viewers: Arc<ConnectionRegistry>,
    pub(crate) controls: Arc<ConnectionRegistry>,
    pub(crate) shutdown: CancellationToken,
    pub(crate) engine: &'static str,
}

impl AppState {
    pub fn new(
        playback: Arc<PlaybackState>,
        frames: broadcast::Sender<Frame>,
        latest: watch::Receiver<Option<Frame>>,
        stats: Arc<PumpStats>,
        shutdown: CancellationToken,
        engine: &'static str,
    ) -> Self {
        Self {
            playback,
            frames,
            latest,
            stats,
            viewers: Arc::new(ConnectionRegistry::new("viewer")),
            controls: Arc::new(ConnectionRegistry::new("control client")),
            shutdown,
            engine,
        }
    }

    pub fn viewers(&self) -> &Arc<ConnectionRegistry> {
        &self.viewers
    }

    pub fn controls(&self) -> &Arc<ConnectionRegistry> {
        &self.controls
    }
}

/// Build the router for the server.
pub fn router(state: Arc<AppState>) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // MJPEG stream and latest still
        .route("/video", get(video_handler))
        .route("/snapshot.jpg", get(snapshot_handler))
        // Control channel
        .route("/ws", get(ws_handler))
        // API routes
        .route("/api/status", get(status_handler))
        .route("/api/playback/play", post(play_handler))
        .route("/api/playback/pause", post(pause_handler))
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Server status response.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    engine: &'static str,
    playing: bool,
    cursor: Cursor,
    viewers: ConnectionStats,
    controls: ConnectionStats,
    pump: PumpStatsSnapshot,
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let playback = state.playback.status();
    Json(StatusResponse {
        status: "ok",
        engine: state.engine,
        playing: playback.playing,
        cursor: playback.cursor,
        viewers: state.viewers.stats(),
        controls: state.controls.stats(),
        pump: state.stats.snapshot(),
    })
}

async fn play_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    state.playback.set_playing(true);
    Json(state.playback.status())
}

async fn pause_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    state.playback.set_playing(false);
    Json(state.playback.status())
}
