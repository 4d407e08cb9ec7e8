//! Stream node lifecycle.
//!
//! Startup: initialize the engine, start the frame pump, bind the listener.
//! Shutdown: cancel the shared token so viewers, control sockets and the pump
//! wind down, wait for the HTTP server to drain and the pump to join, then
//! release the engine exactly once.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use universe_engine::{EngineSession, SimulationBinding};

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::playback::PlaybackState;
use crate::pump::{FramePump, PumpStats};
use crate::server::{self, AppState};

/// Handle to a running node.
pub struct NodeHandle {
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: CancellationToken,
    server: Option<JoinHandle<std::io::Result<()>>>,
    pump: Option<JoinHandle<()>>,
}

impl NodeHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn playback(&self) -> &Arc<PlaybackState> {
        &self.state.playback
    }

    pub fn stats(&self) -> &Arc<PumpStats> {
        &self.state.stats
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Resolves once shutdown has been requested.
    pub async fn cancelled(&self) {
        self.shutdown.cancelled().await
    }

    /// Stop everything and release the engine.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down stream node");
        self.shutdown.cancel();

        let served = match self.server.take() {
            Some(server) => server.await.map_err(Error::from).and_then(|r| r.map_err(Error::from)),
            None => Ok(()),
        };
        if let Some(pump) = self.pump.take() {
            pump.await?;
        }
        served
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        // The pump task still releases the engine after it stops.
        self.shutdown.cancel();
    }
}

/// Initialize `engine` and serve it per `config`.
///
/// Engine initialization failure is returned before anything is bound.
pub async fn start<E: SimulationBinding>(config: &StreamConfig, engine: E) -> Result<NodeHandle> {
    config.validate()?;

    let session = EngineSession::initialize(engine, config.width, config.height)?;
    let engine_name = session.engine_name();

    let playback = Arc::new(PlaybackState::new());
    let pump = FramePump::new(session, Arc::clone(&playback), config.tick_interval(), config.frame_buffer);
    let shutdown = CancellationToken::new();

    let state = Arc::new(AppState::new(
        playback,
        pump.frames(),
        pump.latest(),
        pump.stats(),
        shutdown.clone(),
        engine_name,
    ));

    // Dropping the unstarted pump on a bind error releases the engine.
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    let pump = tokio::spawn(run_pump(pump, shutdown.clone()));

    let app = server::router(Arc::clone(&state));
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
    });

    info!(
        "Streaming {} engine at {}x{} on http://{} ({} fps)",
        engine_name, config.width, config.height, addr, config.fps
    );

    Ok(NodeHandle {
        addr,
        state,
        shutdown,
        server: Some(server),
        pump: Some(pump),
    })
}

async fn run_pump<E: SimulationBinding>(pump: FramePump<E>, shutdown: CancellationToken) {
    let Some(session) = pump.run(shutdown).await else {
        return;
    };
    // Native cleanup may block.
    if let Err(e) = tokio::task::spawn_blocking(move || session.release()).await {
        error!("Engine release failed: {}", e);
    }
}
