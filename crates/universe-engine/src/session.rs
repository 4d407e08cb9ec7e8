//! Initialized engine handle that releases native resources exactly once.
//!
//! An [`EngineSession`] only exists after `initialize()` succeeded, so an
//! engine that never got initialized is never released. Releasing consumes
//! the session; dropping an unreleased session releases it.

use tracing::{debug, info};

use crate::binding::{FrameRef, SimulationBinding};
use crate::error::{EngineError, Result};

/// An initialized simulation engine.
pub struct EngineSession<E: SimulationBinding> {
    engine: E,
    width: u32,
    height: u32,
    steps: u64,
    released: bool,
}

impl<E: SimulationBinding> EngineSession<E> {
    /// Initialize `engine` at `width`x`height`.
    ///
    /// Both dimensions must be non-zero and fit a C `int`.
    pub fn initialize(mut engine: E, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(EngineError::InvalidDimensions { width, height });
        }

        engine.initialize(width, height)?;
        info!("{} engine initialized at {}x{}", engine.name(), width, height);

        Ok(Self {
            engine,
            width,
            height,
            steps: 0,
            released: false,
        })
    }

    /// Advance one step. An empty frame is reported as an error.
    pub fn advance(&mut self) -> Result<FrameRef<'_>> {
        self.steps += 1;
        let frame = self.engine.advance()?;
        if frame.is_empty() {
            return Err(EngineError::EmptyFrame);
        }
        Ok(frame)
    }

    /// Configured resolution.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of `advance()` calls issued so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Release the engine. Consumes the session so no further step can follow.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        debug!("releasing {} engine after {} steps", self.engine.name(), self.steps);
        self.engine.release();
        info!("{} engine released", self.engine.name());
    }
}

impl<E: SimulationBinding> Drop for EngineSession<E> {
    fn drop(&mut self) {
        self.release_once();
    }
}
