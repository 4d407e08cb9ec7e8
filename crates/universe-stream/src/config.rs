//! Node configuration, read from `UNIVERSE_*` environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use universe_engine::{SimulationBinding, SyntheticEngine, DEFAULT_JPEG_QUALITY};

use crate::error::{Error, Result};

/// Which simulation engine to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// `libsimulation` over FFI (feature `native`)
    Native,
    /// Built-in JPEG test pattern
    Synthetic,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(EngineKind::Native),
            "synthetic" => Ok(EngineKind::Synthetic),
            other => Err(format!("unknown engine {other:?} (expected native or synthetic)")),
        }
    }
}

impl Default for EngineKind {
    fn default() -> Self {
        if cfg!(feature = "native") {
            EngineKind::Native
        } else {
            EngineKind::Synthetic
        }
    }
}

/// Configuration for a stream node.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// HTTP listen address
    pub bind_addr: SocketAddr,

    /// Simulation resolution
    pub width: u32,
    pub height: u32,

    /// Pump rate in frames per second
    pub fps: u32,

    /// Frames a viewer may fall behind before losing the oldest
    pub frame_buffer: usize,

    pub engine: EngineKind,

    /// JPEG quality for the synthetic engine
    pub jpeg_quality: u8,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            width: 1024,
            height: 1024,
            fps: 60,
            frame_buffer: 8,
            engine: EngineKind::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl StreamConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            bind_addr: parse_var(&lookup, "UNIVERSE_BIND_ADDR", defaults.bind_addr)?,
            width: parse_var(&lookup, "UNIVERSE_WIDTH", defaults.width)?,
            height: parse_var(&lookup, "UNIVERSE_HEIGHT", defaults.height)?,
            fps: parse_var(&lookup, "UNIVERSE_FPS", defaults.fps)?,
            frame_buffer: parse_var(&lookup, "UNIVERSE_FRAME_BUFFER", defaults.frame_buffer)?,
            engine: parse_var(&lookup, "UNIVERSE_ENGINE", defaults.engine)?,
            jpeg_quality: parse_var(&lookup, "UNIVERSE_JPEG_QUALITY", defaults.jpeg_quality)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!("resolution {}x{} must be non-zero", self.width, self.height)));
        }
        if !(1..=1000).contains(&self.fps) {
            return Err(Error::Config(format!("fps {} out of range 1..=1000", self.fps)));
        }
        if self.frame_buffer == 0 {
            return Err(Error::Config("frame buffer must hold at least one frame".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::Config(format!("jpeg quality {} out of range 1..=100", self.jpeg_quality)));
        }
        Ok(())
    }

    /// Time between pump ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.fps.max(1)))
    }

    /// Instantiate the configured engine (not yet initialized).
    pub fn build_engine(&self) -> Result<Box<dyn SimulationBinding>> {
        match self.engine {
            EngineKind::Synthetic => Ok(Box::new(SyntheticEngine::new(self.jpeg_quality))),
            #[cfg(feature = "native")]
            EngineKind::Native => Ok(Box::new(universe_engine::NativeEngine::claim()?)),
            #[cfg(not(feature = "native"))]
            EngineKind::Native => Err(Error::Config(
                "native engine requested but built without the `native` feature".into(),
            )),
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = StreamConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!((config.width, config.height), (1024, 1024));
        assert_eq!(config.fps, 60);
        assert_eq!(config.jpeg_quality, 75);
        assert_eq!(config.engine, EngineKind::default());
    }

    #[test]
    fn reads_overrides() {
        let config = StreamConfig::from_lookup(lookup(&[
            ("UNIVERSE_BIND_ADDR", "127.0.0.1:9000"),
            ("UNIVERSE_WIDTH", "640"),
            ("UNIVERSE_HEIGHT", "480"),
            ("UNIVERSE_FPS", "30"),
            ("UNIVERSE_ENGINE", "Synthetic"),
            ("UNIVERSE_FRAME_BUFFER", " 2 "),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.engine, EngineKind::Synthetic);
        assert_eq!(config.frame_buffer, 2);
        assert_eq!(config.tick_interval(), Duration::from_nanos(33_333_333));
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            ("UNIVERSE_WIDTH", "wide"),
            ("UNIVERSE_FPS", "0"),
            ("UNIVERSE_ENGINE", "cuda"),
            ("UNIVERSE_FRAME_BUFFER", "0"),
            ("UNIVERSE_JPEG_QUALITY", "101"),
            ("UNIVERSE_BIND_ADDR", "localhost"),
        ];
        for var in bad {
            let result = StreamConfig::from_lookup(lookup(&[var]));
            assert!(matches!(result, Err(Error::Config(_))), "{var:?} accepted");
        }
    }

    #[test]
    fn sixty_fps_is_about_sixteen_ms() {
        let config = StreamConfig::default();
        assert_eq!(config.tick_interval().as_micros(), 16_666);
    }

    #[test]
    fn builds_synthetic_engine() {
        let config = StreamConfig {
            engine: EngineKind::Synthetic,
            ..StreamConfig::default()
        };
        assert_eq!(config.build_engine().unwrap().name(), "synthetic");
    }
}
