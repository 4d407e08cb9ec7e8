//! Pure-Rust stand-in engine.
//!
//! Renders a scrolling gradient with a sweeping bar and a sprinkle of noise,
//! JPEG-encodes it into a single reused output buffer, and hands out a view of
//! that buffer. Like the native renderer, the buffer is overwritten on every
//! step.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use rand::Rng;

use crate::binding::{FrameRef, SimulationBinding};
use crate::error::{EngineError, Result};

/// Default JPEG quality, matching the native renderer.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Fraction of pixels replaced by noise each step (1 in N).
const NOISE_DENSITY: u32 = 97;

/// Synthetic test-pattern engine.
pub struct SyntheticEngine {
    quality: u8,
    width: u32,
    height: u32,
    frame: u64,
    pixels: Vec<u8>,
    output: Vec<u8>,
}

impl SyntheticEngine {
    /// Create an engine encoding at `quality` (clamped to 1..=100).
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            width: 0,
            height: 0,
            frame: 0,
            pixels: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Steps rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn render(&mut self) {
        let (w, h) = (self.width as usize, self.height as usize);
        let t = self.frame as usize;
        let bar = t % w.max(1);
        let mut rng = rand::thread_rng();

        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) * 3;
                let px = &mut self.pixels[i..i + 3];
                if x.abs_diff(bar) < 4 {
                    px.copy_from_slice(&[255, 255, 255]);
                } else if rng.gen_ratio(1, NOISE_DENSITY) {
                    px.copy_from_slice(&[rng.gen(), rng.gen(), rng.gen()]);
                } else {
                    px[0] = ((x + t) * 255 / w.max(1)) as u8;
                    px[1] = ((y + t / 2) * 255 / h.max(1)) as u8;
                    px[2] = (t % 256) as u8;
                }
            }
        }
    }
}

impl Default for SyntheticEngine {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl SimulationBinding for SyntheticEngine {
    fn initialize(&mut self, width: u32, height: u32) -> Result<()> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or(EngineError::InvalidDimensions { width, height })?;

        self.width = width;
        self.height = height;
        self.frame = 0;
        self.pixels = vec![0; len];
        self.output = Vec::with_capacity(len / 8);
        Ok(())
    }

    fn advance(&mut self) -> Result<FrameRef<'_>> {
        if self.pixels.is_empty() {
            return Err(EngineError::NotInitialized);
        }

        self.render();
        self.frame += 1;

        self.output.clear();
        JpegEncoder::new_with_quality(&mut self.output, self.quality).encode(
            &self.pixels,
            self.width,
            self.height,
            ExtendedColorType::Rgb8,
        )?;

        Ok(FrameRef::new(&self.output))
    }

    fn release(&mut self) {
        self.pixels = Vec::new();
        self.output = Vec::new();
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
