//! Universe Stream
//!
//! Live MJPEG streaming of a stateful simulation, with playback controls over
//! WebSocket.
//!
//! # Architecture
//!
//! - **Playback**: shared play/pause flag and pointer cursor
//! - **Pump**: steps the engine at a fixed rate and publishes owned frames
//! - **Multiplexer**: fans frames out to every `/video` viewer
//! - **Control**: `/ws` text commands that mutate playback
//! - **Node**: startup and the ordered, release-once shutdown
//!
//! # Usage
//!
//! ```no_run
//! use universe_engine::SyntheticEngine;
//! use universe_stream::{node, StreamConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StreamConfig::default();
//!     let handle = node::start(&config, SyntheticEngine::default()).await?;
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connections;
pub mod control;
pub mod error;
pub mod frame;
pub mod multiplexer;
pub mod node;
pub mod playback;
pub mod pump;
pub mod server;

pub use config::{EngineKind, StreamConfig};
pub use control::ControlCommand;
pub use error::{Error, Result};
pub use frame::Frame;
pub use node::NodeHandle;
pub use playback::{Cursor, PlaybackState, PlaybackStatus};
pub use pump::{FramePump, PumpStats, PumpStatsSnapshot};
pub use server::AppState;
