//! Shared playback state: the play/pause flag and the pointer cursor.
//!
//! Written by control connections, read by the frame pump. Both fields are
//! lock-free; the cursor's two coordinates share one 64-bit word so a reader
//! always sees a pair from a single write.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Pointer position reported by a control client.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f32,
    pub y: f32,
}

impl Cursor {
    pub const ORIGIN: Cursor = Cursor { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn pack(self) -> u64 {
        ((self.x.to_bits() as u64) << 32) | self.y.to_bits() as u64
    }

    fn unpack(word: u64) -> Self {
        Self {
            x: f32::from_bits((word >> 32) as u32),
            y: f32::from_bits(word as u32),
        }
    }
}

/// Process-wide playback state. Share it as `Arc<PlaybackState>`.
#[derive(Debug)]
pub struct PlaybackState {
    playing: AtomicBool,
    cursor: AtomicU64,
}

impl PlaybackState {
    /// Playing, cursor at the origin.
    pub fn new() -> Self {
        Self {
            playing: AtomicBool::new(true),
            cursor: AtomicU64::new(Cursor::ORIGIN.pack()),
        }
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Store a new cursor position. Values are not validated.
    pub fn set_cursor(&self, x: f32, y: f32) {
        self.cursor.store(Cursor::new(x, y).pack(), Ordering::Release);
    }

    pub fn cursor(&self) -> Cursor {
        Cursor::unpack(self.cursor.load(Ordering::Acquire))
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            playing: self.is_playing(),
            cursor: self.cursor(),
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

/// Playback status for sending to clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub playing: bool,
    pub cursor: Cursor,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_playing_at_origin() {
        let state = PlaybackState::new();
        assert!(state.is_playing());
        assert_eq!(state.cursor(), Cursor::ORIGIN);
    }

    #[test]
    fn pause_then_play_toggles() {
        let state = PlaybackState::new();
        state.set_playing(false);
        assert!(!state.is_playing());
        state.set_playing(true);
        assert!(state.is_playing());
    }

    #[test]
    fn cursor_round_trips_exactly() {
        let state = PlaybackState::new();
        state.set_cursor(12.5, -3.0);
        assert_eq!(state.cursor(), Cursor::new(12.5, -3.0));

        state.set_cursor(-0.0, f32::MAX);
        let cursor = state.cursor();
        assert!(cursor.x.is_sign_negative());
        assert_eq!(cursor.y, f32::MAX);
    }

    #[test]
    fn cursor_accepts_non_finite_values() {
        let state = PlaybackState::new();
        state.set_cursor(f32::NAN, f32::INFINITY);
        let cursor = state.cursor();
        assert!(cursor.x.is_nan());
        assert!(cursor.y.is_infinite());
    }

    #[test]
    fn concurrent_writers_never_tear_cursor() {
        let state = Arc::new(PlaybackState::new());
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let state = state.clone();
                std::thread::spawn(move || {
                    let v = i as f32;
                    for _ in 0..10_000 {
                        state.set_cursor(v, -v);
                    }
                })
            })
            .collect();

        for _ in 0..10_000 {
            let cursor = state.cursor();
            assert_eq!(cursor.x, -cursor.y);
        }
        for writer in writers {
            writer.join().unwrap();
        }
    }

    #[test]
    fn status_serializes() {
        let state = PlaybackState::new();
        state.set_playing(false);
        state.set_cursor(1.5, 2.0);

        let json = serde_json::to_value(state.status()).unwrap();
        assert_eq!(json["playing"], false);
        assert_eq!(json["cursor"]["x"], 1.5);
        assert_eq!(json["cursor"]["y"], 2.0);
    }
}
