//! Frame pump: paced producer that turns the pull-based engine into a push
//! stream.
//!
//! Once per tick the pump checks the playback flag. When playing it steps the
//! engine on the blocking pool, copies the frame out while still holding the
//! engine lock, and publishes the owned frame to every subscribed viewer.
//! Failures skip the tick; only cancellation stops the pump.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use universe_engine::{EngineSession, SimulationBinding};

use crate::frame::Frame;
use crate::playback::PlaybackState;

/// Pump counters. Updated by the pump, read by anyone.
#[derive(Debug, Default)]
pub struct PumpStats {
    ticks: AtomicU64,
    idle_ticks: AtomicU64,
    advances: AtomicU64,
    frames: AtomicU64,
    failures: AtomicU64,
}

impl PumpStats {
    /// Engine `advance()` invocations so far.
    pub fn advances(&self) -> u64 {
        self.advances.load(Ordering::Relaxed)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PumpStatsSnapshot {
        PumpStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            idle_ticks: self.idle_ticks.load(Ordering::Relaxed),
            advances: self.advances(),
            frames: self.frames(),
            failures: self.failures(),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PumpStatsSnapshot {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub advances: u64,
    pub frames: u64,
    pub failures: u64,
}

/// Paced frame producer. Exclusively owns the engine session.
pub struct FramePump<E: SimulationBinding> {
    engine: Arc<Mutex<EngineSession<E>>>,
    playback: Arc<PlaybackState>,
    frames: broadcast::Sender<Frame>,
    latest: watch::Sender<Option<Frame>>,
    stats: Arc<PumpStats>,
    interval: Duration,
    next_seq: u64,
}

impl<E: SimulationBinding> FramePump<E> {
    /// Create a pump ticking every `interval`. Each viewer may fall
    /// `frame_buffer` frames behind before it starts losing the oldest ones.
    pub fn new(
        session: EngineSession<E>,
        playback: Arc<PlaybackState>,
        interval: Duration,
        frame_buffer: usize,
    ) -> Self {
        let (frames, _) = broadcast::channel(frame_buffer.max(1));
        let (latest, _) = watch::channel(None);
        Self {
            engine: Arc::new(Mutex::new(session)),
            playback,
            frames,
            latest,
            stats: Arc::new(PumpStats::default()),
            interval,
            next_seq: 0,
        }
    }

    /// Sender viewers subscribe through.
    pub fn frames(&self) -> broadcast::Sender<Frame> {
        self.frames.clone()
    }

    /// Most recently published frame.
    pub fn latest(&self) -> watch::Receiver<Option<Frame>> {
        self.latest.subscribe()
    }

    pub fn stats(&self) -> Arc<PumpStats> {
        Arc::clone(&self.stats)
    }

    /// Tick until `cancel` fires, then hand the engine session back so the
    /// caller can release it. No `advance()` is in flight once this returns.
    pub async fn run(mut self, cancel: CancellationToken) -> Option<EngineSession<E>> {
        info!("Frame pump started: {:?} per tick", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.tick().await;
        }

        let stats = self.stats.snapshot();
        info!(
            "Frame pump stopped: {} frames, {} failures, {} idle ticks",
            stats.frames, stats.failures, stats.idle_ticks
        );

        match Arc::try_unwrap(self.engine) {
            Ok(engine) => Some(engine.into_inner().unwrap_or_else(PoisonError::into_inner)),
            Err(_) => {
                warn!("Engine still shared after pump stopped; releasing on last drop");
                None
            }
        }
    }

    /// Run one tick. Returns the published frame, if any.
    pub async fn tick(&mut self) -> Option<Frame> {
        PumpStats::bump(&self.stats.ticks);

        if !self.playback.is_playing() {
            PumpStats::bump(&self.stats.idle_ticks);
            return None;
        }
        let cursor = self.playback.cursor();

        PumpStats::bump(&self.stats.advances);
        let engine = Arc::clone(&self.engine);
        let step = tokio::task::spawn_blocking(move || -> universe_engine::Result<Bytes> {
            let mut session = engine.lock().unwrap_or_else(PoisonError::into_inner);
            let frame = session.advance()?;
            // The engine may reuse this buffer on its next step.
            Ok(Bytes::copy_from_slice(frame.as_bytes()))
        })
        .await;

        let data = match step {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => {
                PumpStats::bump(&self.stats.failures);
                warn!("Error generating frame: {}", e);
                return None;
            }
            Err(e) => {
                PumpStats::bump(&self.stats.failures);
                warn!("Engine step aborted: {}", e);
                return None;
            }
        };

        let frame = Frame::new(self.next_seq, cursor, data);
        self.next_seq += 1;
        PumpStats::bump(&self.stats.frames);

        // Err only means nobody is watching right now.
        if let Ok(viewers) = self.frames.send(frame.clone()) {
            if frame.seq % 600 == 0 {
                debug!("Frame {} ({} bytes) sent to {} viewers", frame.seq, frame.len(), viewers);
            }
        }
        self.latest.send_replace(Some(frame.clone()));

        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use universe_engine::{EngineError, FrameRef};

    #[derive(Default)]
    struct Calls {
        advance: AtomicUsize,
        release: AtomicUsize,
    }

    /// Emits `[n; n + 1]` on step `n`; can fail or panic on chosen steps.
    struct ScriptedEngine {
        calls: Arc<Calls>,
        fail_on: Option<usize>,
        panic_on: Option<usize>,
        buffer: Vec<u8>,
    }

    impl ScriptedEngine {
        fn new(calls: Arc<Calls>) -> Self {
            Self { calls, fail_on: None, panic_on: None, buffer: Vec::new() }
        }
    }

    impl SimulationBinding for ScriptedEngine {
        fn initialize(&mut self, _width: u32, _height: u32) -> universe_engine::Result<()> {
            Ok(())
        }

        fn advance(&mut self) -> universe_engine::Result<FrameRef<'_>> {
            let n = self.calls.advance.fetch_add(1, Ordering::SeqCst);
            if self.panic_on == Some(n) {
                panic!("engine blew up on step {n}");
            }
            if self.fail_on == Some(n) {
                return Err(EngineError::Encode("bad frame".into()));
            }
            self.buffer = vec![n as u8; n + 1];
            Ok(FrameRef::new(&self.buffer))
        }

        fn release(&mut self) {
            self.calls.release.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pump_with(engine: ScriptedEngine, interval: Duration) -> (FramePump<ScriptedEngine>, Arc<PlaybackState>) {
        let session = EngineSession::initialize(engine, 640, 480).unwrap();
        let playback = Arc::new(PlaybackState::new());
        (FramePump::new(session, playback.clone(), interval, 8), playback)
    }

    #[tokio::test]
    async fn tick_publishes_owned_copies() {
        let calls = Arc::new(Calls::default());
        let (mut pump, _) = pump_with(ScriptedEngine::new(calls.clone()), Duration::from_millis(16));
        let mut rx = pump.frames().subscribe();

        pump.tick().await.unwrap();
        pump.tick().await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((first.seq, &first.data[..]), (0, &[0u8][..]));
        assert_eq!((second.seq, &second.data[..]), (1, &[1u8, 1][..]));
        assert_eq!(pump.latest().borrow().as_ref().map(|f| f.seq), Some(1));
    }

    #[tokio::test]
    async fn paused_ticks_skip_engine() {
        let calls = Arc::new(Calls::default());
        let (mut pump, playback) = pump_with(ScriptedEngine::new(calls.clone()), Duration::from_millis(16));

        playback.set_playing(false);
        for _ in 0..5 {
            assert!(pump.tick().await.is_none());
        }
        assert_eq!(calls.advance.load(Ordering::SeqCst), 0);

        playback.set_playing(true);
        assert!(pump.tick().await.is_some());

        let stats = pump.stats().snapshot();
        assert_eq!(stats.ticks, 6);
        assert_eq!(stats.idle_ticks, 5);
        assert_eq!(stats.advances, 1);
    }

    #[tokio::test]
    async fn tick_carries_cursor() {
        let calls = Arc::new(Calls::default());
        let (mut pump, playback) = pump_with(ScriptedEngine::new(calls), Duration::from_millis(16));

        playback.set_cursor(3.0, 4.5);
        let frame = pump.tick().await.unwrap();
        assert_eq!(frame.cursor, crate::playback::Cursor::new(3.0, 4.5));
    }

    #[tokio::test]
    async fn engine_errors_skip_the_tick() {
        let calls = Arc::new(Calls::default());
        let mut engine = ScriptedEngine::new(calls.clone());
        engine.fail_on = Some(1);
        let (mut pump, _) = pump_with(engine, Duration::from_millis(16));

        assert_eq!(pump.tick().await.unwrap().seq, 0);
        assert!(pump.tick().await.is_none());
        let next = pump.tick().await.unwrap();
        assert_eq!(next.seq, 1);
        assert_eq!(next.data.len(), 3);

        let stats = pump.stats().snapshot();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.frames, 2);
    }

    #[tokio::test]
    async fn engine_panics_do_not_stop_the_pump() {
        let calls = Arc::new(Calls::default());
        let mut engine = ScriptedEngine::new(calls.clone());
        engine.panic_on = Some(0);
        let (mut pump, _) = pump_with(engine, Duration::from_millis(16));

        assert!(pump.tick().await.is_none());
        assert!(pump.tick().await.is_some());
        assert_eq!(pump.stats().failures(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_paces_and_returns_session() {
        let calls = Arc::new(Calls::default());
        let (pump, playback) = pump_with(ScriptedEngine::new(calls.clone()), Duration::from_millis(10));
        let stats = pump.stats();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(500)).await;
        let playing = stats.advances();
        assert!((20..=60).contains(&playing), "advanced {playing} times in 500ms at 100 Hz");

        playback.set_playing(false);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let paused_from = stats.advances();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(stats.advances() - paused_from <= 1);

        cancel.cancel();
        let session = task.await.unwrap().expect("pump hands the session back");
        assert_eq!(calls.release.load(Ordering::SeqCst), 0);
        session.release();
        assert_eq!(calls.release.load(Ordering::SeqCst), 1);
    }
}
