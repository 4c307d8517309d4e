//! Acquisition engine: drives a numeric backend at a fixed cadence.
//!
//! [`EffCalcMca`] owns one [`NumericEngine`] handle and spawns one background
//! calculation task for the engine's lifetime. The task advances the
//! simulation every `cadence` seconds while acquisition is running, whether
//! or not any client is connected, so the simulated source behaves like a
//! real detector.
//!
//! # Locking
//!
//! A single `tokio::sync::Mutex` around the numeric handle is the sole
//! correctness mechanism: calculation steps, `clear()` and `snapshot()` all
//! take it, so operations on one engine are totally ordered and a snapshot
//! never observes the store mid-write. Control flags (`running`, `shutdown`,
//! `failed`) are atomics observed once per loop iteration, which bounds the
//! reaction latency of `start`/`stop`/`shutdown` at one cadence period.

use crate::core::{Mca, Snapshot};
use crate::physics::{decode_store, NumericEngine};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, error, info, warn};

/// A simulated MCA backed by a Monte-Carlo numeric engine.
pub struct EffCalcMca {
    name: String,
    channels: usize,
    engine: Arc<Mutex<Box<dyn NumericEngine>>>,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
}

impl EffCalcMca {
    /// Build the device and spawn its background calculation task.
    ///
    /// Must be called from within a Tokio runtime. `cadence_s` is the
    /// acquisition interval in whole seconds; `activity_bq` the simulated
    /// source strength.
    pub fn spawn(
        name: impl Into<String>,
        engine: Box<dyn NumericEngine>,
        cadence_s: u32,
        activity_bq: f64,
    ) -> Self {
        let name = name.into();
        let channels = engine.channels();
        let engine = Arc::new(Mutex::new(engine));
        let running = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let failed = Arc::new(AtomicBool::new(false));

        tokio::spawn(calculation_task(
            name.clone(),
            Arc::clone(&engine),
            cadence_s,
            activity_bq,
            Arc::clone(&running),
            Arc::clone(&shutdown),
            Arc::clone(&failed),
        ));

        Self {
            name,
            channels,
            engine,
            running,
            shutdown,
            failed,
        }
    }

    /// Device name used for registry lookups and logging.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One loop iteration per cadence period, drift-compensated: the wait is
/// `cadence - elapsed`, so steps land on period boundaries regardless of how
/// long the calculation took.
async fn calculation_task(
    name: String,
    engine: Arc<Mutex<Box<dyn NumericEngine>>>,
    cadence_s: u32,
    activity_bq: f64,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
) {
    let cadence = Duration::from_secs(u64::from(cadence_s));
    loop {
        let started = Instant::now();
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        if running.load(Ordering::SeqCst) {
            let mut engine = engine.lock().await;
            if let Err(err) = engine.advance(cadence_s, activity_bq) {
                error!(device = %name, "{err}");
                failed.store(true, Ordering::SeqCst);
                running.store(false, Ordering::SeqCst);
                break;
            }
        }
        sleep(cadence.saturating_sub(started.elapsed())).await;
    }
    debug!(device = %name, "calculation task terminated");
}

#[async_trait]
impl Mca for EffCalcMca {
    fn start(&self) {
        if self.failed.load(Ordering::SeqCst) {
            warn!(device = %self.name, "start ignored: numeric engine failed");
            return;
        }
        if !self.running.swap(true, Ordering::SeqCst) {
            info!(device = %self.name, "acquisition started");
        }
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!(device = %self.name, "acquisition stopped");
        }
    }

    async fn clear(&self) {
        self.engine.lock().await.reset_accumulator();
        info!(device = %self.name, "spectrum cleared");
    }

    async fn snapshot(&self) -> Snapshot {
        let engine = self.engine.lock().await;
        match engine.store() {
            Some(store) => decode_store(store),
            None => Snapshot::empty(self.channels),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppResult, McaError};
    use crate::nuclide::Nuclide;
    use crate::physics::{MonteCarloEngine, SpectrumStore};

    fn spawn_co60(channels: usize) -> EffCalcMca {
        let engine = MonteCarloEngine::prepare(Nuclide::default_source(), channels, 42)
            .expect("valid config");
        EffCalcMca::spawn("effcalc_mca", Box::new(engine), 1, 1000.0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_production_monotonicity() {
        let mca = spawn_co60(1024);
        mca.start();
        sleep(Duration::from_millis(3500)).await;

        let running_snap = mca.snapshot().await;
        assert!(running_snap.total_counts() > 0);
        assert!(running_snap.live_time > 0.0);
        assert!(running_snap.live_time <= running_snap.real_time);

        // Stopping freezes the sum. One extra period lets an in-flight
        // step drain before the reference snapshot is taken.
        mca.stop();
        sleep(Duration::from_millis(1500)).await;
        let frozen = mca.snapshot().await;
        sleep(Duration::from_millis(3000)).await;
        assert_eq!(mca.snapshot().await, frozen);

        mca.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_resets_fully() {
        let mca = spawn_co60(512);
        mca.start();
        sleep(Duration::from_millis(2500)).await;
        assert!(mca.snapshot().await.total_counts() > 0);

        mca.clear().await;
        let snap = mca.snapshot().await;
        assert_eq!(snap.counts.len(), mca.channels());
        assert_eq!(snap.total_counts(), 0);
        assert_eq!(snap.live_time, 0.0);
        assert_eq!(snap.real_time, 0.0);

        // Clear does not change the acquisition state.
        assert!(mca.is_running());
        mca.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_before_first_step_is_zero() {
        let mca = spawn_co60(256);
        let snap = mca.snapshot().await;
        assert_eq!(snap, Snapshot::empty(256));
        mca.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_idempotent_controls() {
        let mca = spawn_co60(256);

        mca.stop();
        assert!(!mca.is_running());

        mca.start();
        mca.start();
        assert!(mca.is_running());

        mca.stop();
        mca.stop();
        assert!(!mca.is_running());
        mca.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_snapshots_never_tear() {
        let mca = Arc::new(spawn_co60(1024));
        mca.start();

        let mut readers = Vec::new();
        for _ in 0..8 {
            let mca = Arc::clone(&mca);
            readers.push(tokio::spawn(async move {
                for _ in 0..20 {
                    let snap = mca.snapshot().await;
                    assert_eq!(snap.counts.len(), 1024);
                    assert!(snap.live_time <= snap.real_time);
                    sleep(Duration::from_millis(200)).await;
                }
            }));
        }
        for reader in readers {
            reader.await.expect("reader task");
        }
        mca.shutdown();
    }

    /// Numeric engine whose step always fails, for the failure-path tests.
    struct FailingEngine {
        channels: usize,
    }

    impl NumericEngine for FailingEngine {
        fn advance(&mut self, _seconds: u32, _activity_bq: f64) -> AppResult<()> {
            Err(McaError::CalcStep { code: 9 })
        }

        fn reset_accumulator(&mut self) {}

        fn store(&self) -> Option<&SpectrumStore> {
            None
        }

        fn channels(&self) -> usize {
            self.channels
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_calc_step_error_parks_engine() {
        let mca = EffCalcMca::spawn(
            "broken",
            Box::new(FailingEngine { channels: 64 }),
            1,
            1000.0,
        );
        mca.start();
        sleep(Duration::from_millis(2500)).await;

        // The task terminated and the device reports itself stopped.
        assert!(!mca.is_running());

        // Further starts are ignored.
        mca.start();
        assert!(!mca.is_running());

        // Snapshot still answers with the zero spectrum.
        assert_eq!(mca.snapshot().await, Snapshot::empty(64));
        mca.shutdown();
    }
}
