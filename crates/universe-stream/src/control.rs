//! Control channel: text commands over WebSocket that drive playback.
//!
//! | Message             | Effect                                   |
//! |---------------------|------------------------------------------|
//! | `play`              | resume stepping the simulation           |
//! | `pause`             | stop stepping the simulation             |
//! | `mousemove,<x>,<y>` | move the cursor                          |
//! | anything else       | reply `Message not recognized: <text>`   |

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connections::ConnectionGuard;
use crate::playback::PlaybackState;
use crate::server::AppState;

/// A parsed control message.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Play,
    Pause,
    MouseMove { x: f32, y: f32 },
    /// `mousemove` whose coordinates are missing or not numbers
    MalformedMouseMove(String),
    Unrecognized(String),
}

impl ControlCommand {
    pub fn parse(text: &str) -> Self {
        match text {
            "play" => return ControlCommand::Play,
            "pause" => return ControlCommand::Pause,
            _ => {}
        }

        let mut fields = text.split(',');
        if fields.next() != Some("mousemove") {
            return ControlCommand::Unrecognized(text.to_string());
        }

        match (fields.next(), fields.next(), fields.next()) {
            (Some(x), Some(y), None) => match (x.trim().parse(), y.trim().parse()) {
                (Ok(x), Ok(y)) => ControlCommand::MouseMove { x, y },
                _ => ControlCommand::MalformedMouseMove(text.to_string()),
            },
            _ => ControlCommand::MalformedMouseMove(text.to_string()),
        }
    }

    /// Apply to the shared playback state. Returns the reply to send, if any.
    pub fn apply(&self, playback: &PlaybackState) -> Option<String> {
        match self {
            ControlCommand::Play => {
                playback.set_playing(true);
                None
            }
            ControlCommand::Pause => {
                playback.set_playing(false);
                None
            }
            ControlCommand::MouseMove { x, y } => {
                playback.set_cursor(*x, *y);
                None
            }
            ControlCommand::MalformedMouseMove(text) => {
                warn!("Ignoring malformed mousemove: {:?}", text);
                None
            }
            ControlCommand::Unrecognized(text) => Some(format!("Message not recognized: {}", text)),
        }
    }
}

/// `GET /ws`: upgrade to a control connection.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let guard = state.controls.register();
    let playback = Arc::clone(&state.playback);
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| handle_control_socket(socket, playback, shutdown, guard))
}

async fn handle_control_socket(
    mut socket: WebSocket,
    playback: Arc<PlaybackState>,
    shutdown: CancellationToken,
    guard: ConnectionGuard,
) {
    info!("Control client {} connected", guard.id());

    loop {
        let msg = tokio::select! {
            _ = shutdown.cancelled() => break,
            msg = socket.recv() => msg,
        };

        match msg {
            Some(Ok(Message::Text(text))) => {
                debug!("Received message: {}", text.as_str());
                let reply = ControlCommand::parse(text.as_str()).apply(&playback);
                if let Some(reply) = reply {
                    if let Err(e) = socket.send(Message::Text(reply.into())).await {
                        warn!("Failed to send control reply: {}", e);
                        break;
                    }
                }
            }
            Some(Ok(Message::Binary(data))) => {
                debug!("Ignoring {}-byte binary control frame", data.len());
            }
            Some(Ok(Message::Ping(data))) => {
                if let Err(e) = socket.send(Message::Pong(data)).await {
                    warn!("Failed to send pong: {}", e);
                    break;
                }
            }
            Some(Ok(Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(e)) => {
                debug!("Control socket error: {}", e);
                break;
            }
        }
    }

    info!("Control client {} disconnected", guard.id());
}
