//! Simulation engine binding.
//!
//! The simulation (physics, rendering, image encoding) lives behind a narrow
//! foreign-function boundary with three operations: initialize at a
//! resolution, advance one step and get the encoded frame, release.
//!
//! # Architecture
//!
//! - **Binding**: the [`SimulationBinding`] trait and the borrowed
//!   [`FrameRef`] view whose lifetime pins the engine until it is copied
//! - **Session**: [`EngineSession`], an initialized engine that releases once
//! - **Native**: the `libsimulation` FFI adapter (feature `native`)
//! - **Synthetic**: a pure-Rust JPEG test-pattern engine
//!
//! # Usage
//!
//! ```
//! use universe_engine::{EngineSession, SyntheticEngine};
//!
//! let mut session = EngineSession::initialize(SyntheticEngine::default(), 64, 64)?;
//! let owned = session.advance()?.to_vec();
//! assert!(!owned.is_empty());
//! session.release();
//! # Ok::<(), universe_engine::EngineError>(())
//! ```

mod binding;
mod error;
#[cfg(feature = "native")]
mod native;
mod session;
mod synthetic;

pub use binding::{FrameRef, SimulationBinding};
pub use error::{EngineError, Result};
#[cfg(feature = "native")]
pub use native::NativeEngine;
pub use session::EngineSession;
pub use synthetic::{SyntheticEngine, DEFAULT_JPEG_QUALITY};
