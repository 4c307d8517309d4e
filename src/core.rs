//! Core traits and data types for the MCA emulator.
//!
//! This module defines the foundational abstractions of the system:
//!
//! - [`Mca`]: capability trait for a multichannel analyzer device with
//!   lifecycle control (start/stop/clear) and spectrum readout
//! - [`Snapshot`]: a decoded spectrum at a point in time
//! - [`AcquisitionState`]: the two-state acquisition lifecycle
//!
//! # Thread Safety
//!
//! [`Mca`] requires `Send + Sync` so devices can be shared between the TCP
//! server's connection tasks through `Arc<dyn Mca>`. Implementations must
//! guarantee that concurrent snapshots never observe a spectrum mid-write;
//! the reference implementation ([`crate::acquisition::EffCalcMca`]) does
//! this with one exclusive lock per engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Acquisition lifecycle state.
///
/// `Idle ⇄ Running` is the only transition pair; `clear` is valid in either
/// state and does not change it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionState {
    /// Not acquiring; the background task idles on its cadence.
    Idle,
    /// Acquiring; the background task advances the spectrum every cadence.
    Running,
}

/// A decoded spectrum at a point in time.
///
/// `counts.len()` always equals the owning device's channel count, and
/// `live_time <= real_time` as in a physical detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Cumulative time the detector was able to record events, seconds.
    pub live_time: f64,
    /// Cumulative wall-clock acquisition time, seconds.
    pub real_time: f64,
    /// Accumulated counts per channel.
    pub counts: Vec<u64>,
}

impl Snapshot {
    /// The all-zero snapshot returned before any acquisition has happened.
    pub fn empty(channels: usize) -> Self {
        Self {
            live_time: 0.0,
            real_time: 0.0,
            counts: vec![0; channels],
        }
    }

    /// Total number of events across all channels.
    pub fn total_counts(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Capability trait for a multichannel analyzer.
///
/// The TCP server works exclusively against this trait so alternative
/// backends (e.g. a real-hardware MCA) can be registered without touching
/// the protocol layer.
#[async_trait]
pub trait Mca: Send + Sync {
    /// Start spectrum acquisition. No-op if already running.
    fn start(&self);

    /// Stop spectrum acquisition. No-op if already idle.
    fn stop(&self);

    /// Reset the accumulator and discard the backing store.
    ///
    /// Valid in either state; waits for an in-flight calculation step to
    /// finish before touching the store.
    async fn clear(&self);

    /// Decode the current spectrum.
    ///
    /// Returns the all-zero snapshot if nothing has been acquired yet —
    /// never an error.
    async fn snapshot(&self) -> Snapshot;

    /// Whether acquisition is currently running. Never blocks.
    fn is_running(&self) -> bool;

    /// Number of analyzer channels, fixed at construction.
    fn channels(&self) -> usize;

    /// Request the background task terminate. Fire-and-forget: the task may
    /// still be draining its current cadence when this returns.
    fn shutdown(&self);
}
