//! The narrow contract every simulation engine implements.

use std::fmt;

use crate::error::Result;

/// Borrowed view of the engine's current output buffer.
///
/// The lifetime is tied to the `&mut` borrow of the engine that produced it,
/// so the next `advance()` cannot run while the view is alive. Callers copy
/// the bytes out with [`FrameRef::to_vec`] or [`FrameRef::as_bytes`] before
/// letting go of the engine.
#[derive(Clone, Copy)]
pub struct FrameRef<'a> {
    bytes: &'a [u8],
}

impl<'a> FrameRef<'a> {
    /// Wrap an engine-owned buffer.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Encoded frame length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the encoded bytes. Valid until the next `advance()`.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Copy the frame into an owned buffer of exactly `len()` bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl fmt::Debug for FrameRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRef").field("len", &self.bytes.len()).finish()
    }
}

/// A stateful frame source behind a foreign-function boundary.
///
/// Implementations are not required to be reentrant: callers must serialize
/// every call on one instance.
pub trait SimulationBinding: Send + 'static {
    /// Allocate engine state for the given resolution. Called exactly once,
    /// before anything else.
    fn initialize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Step the simulation and encode the new state as one image.
    fn advance(&mut self) -> Result<FrameRef<'_>>;

    /// Free all engine resources. No `advance()` may follow.
    fn release(&mut self);

    /// Short name for logs.
    fn name(&self) -> &'static str {
        "engine"
    }
}

impl<E: SimulationBinding + ?Sized> SimulationBinding for Box<E> {
    fn initialize(&mut self, width: u32, height: u32) -> Result<()> {
        (**self).initialize(width, height)
    }

    fn advance(&mut self) -> Result<FrameRef<'_>> {
        (**self).advance()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
