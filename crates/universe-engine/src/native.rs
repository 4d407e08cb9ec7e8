//! Binding to the native simulation library (`libsimulation`).
//!
//! The library keeps its state in process globals, so at most one
//! [`NativeEngine`] may exist per process. `step` hands back a pointer into a
//! buffer the library owns and reuses; it stays valid until the next `step`
//! or `cleanup`.

use std::os::raw::{c_int, c_uchar, c_ulong};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::binding::{FrameRef, SimulationBinding};
use crate::error::{EngineError, Result};

#[link(name = "simulation")]
extern "C" {
    fn init(width: c_int, height: c_int);
    fn step(out_buffer: *mut *mut c_uchar, out_size: *mut c_ulong);
    fn cleanup();
}

static CLAIMED: AtomicBool = AtomicBool::new(false);

/// The process-wide native engine.
pub struct NativeEngine {
    initialized: bool,
}

impl NativeEngine {
    /// Claim the native engine. Fails if another handle is alive.
    pub fn claim() -> Result<Self> {
        if CLAIMED.swap(true, Ordering::AcqRel) {
            return Err(EngineError::AlreadyClaimed);
        }
        Ok(Self { initialized: false })
    }
}

impl SimulationBinding for NativeEngine {
    fn initialize(&mut self, width: u32, height: u32) -> Result<()> {
        let (w, h) = match (c_int::try_from(width), c_int::try_from(height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => return Err(EngineError::InvalidDimensions { width, height }),
        };
        // SAFETY: plain value arguments; the library aborts the process itself
        // if it cannot allocate.
        unsafe { init(w, h) };
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self) -> Result<FrameRef<'_>> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }

        let mut buffer: *mut c_uchar = ptr::null_mut();
        let mut size: c_ulong = 0;
        // SAFETY: both out-parameters point to live locals for the duration of
        // the call; `&mut self` guarantees no concurrent `step`.
        unsafe { step(&mut buffer, &mut size) };

        if buffer.is_null() || size == 0 {
            return Err(EngineError::EmptyFrame);
        }
        let len = usize::try_from(size).map_err(|_| EngineError::Encode(format!("frame size {size} overflows usize")))?;
        debug!("native step produced {} bytes", len);

        // SAFETY: the library guarantees `len` initialized bytes at `buffer`
        // until the next `step`/`cleanup`. The view borrows `self` mutably, so
        // neither can be called while it is alive.
        let bytes = unsafe { std::slice::from_raw_parts(buffer as *const u8, len) };
        Ok(FrameRef::new(bytes))
    }

    fn release(&mut self) {
        if !self.initialized {
            return;
        }
        self.initialized = false;
        // SAFETY: called once after a successful `init`; no view into the
        // frame buffer can outlive this `&mut self` borrow.
        unsafe { cleanup() };
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        CLAIMED.store(false, Ordering::Release);
    }
}
