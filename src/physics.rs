//! Simulated Monte-Carlo numeric engine and spectrum store.
//!
//! The real device stack drives a vendor calculation library that owns an
//! internal accumulator and periodically persists it as a spectrum file.
//! This module reproduces that seam in memory:
//!
//! - [`NumericEngine`]: the black-box interface the acquisition engine
//!   drives (`advance` / `reset_accumulator` / `store`)
//! - [`SpectrumStore`]: the accumulated counts plus live/real timing
//! - [`decode_store`]: the codec that turns a store into a [`Snapshot`]
//! - [`MonteCarloEngine`]: a synthetic backend that samples a plausible
//!   gamma spectrum for the configured nuclide with a seeded ChaCha RNG
//!
//! The physics is deliberately crude — per-line Poisson event counts,
//! Gaussian detector response, a flat Compton continuum and a paralyzable-ish
//! dead-time estimate — but it produces spectra that look right to client
//! software: photopeaks in the expected channels, `live_time <= real_time`,
//! counts monotonically accumulating while running.

use crate::core::Snapshot;
use crate::error::{AppResult, McaError};
use crate::nuclide::Nuclide;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Poisson};

/// Full-scale energy mapped onto the analyzer, keV.
const FULL_SCALE_KEV: f64 = 2048.0;

/// Per-event dead time of the simulated pulse processor, seconds.
const DEAD_TIME_S: f64 = 5.0e-6;

/// One gamma emission line: energy in keV and photons per decay.
#[derive(Clone, Copy, Debug)]
struct GammaLine {
    energy_kev: f64,
    intensity: f64,
}

/// Accumulated spectrum written by a numeric engine.
///
/// Each engine owns exactly one store; nothing is shared between devices.
#[derive(Clone, Debug)]
pub struct SpectrumStore {
    live_time: f64,
    real_time: f64,
    counts: Vec<u64>,
}

impl SpectrumStore {
    fn new(channels: usize) -> Self {
        Self {
            live_time: 0.0,
            real_time: 0.0,
            counts: vec![0; channels],
        }
    }
}

/// Decode a backing store into a [`Snapshot`].
///
/// This is the codec seam: a file-backed store would be parsed here instead
/// of cloned.
pub fn decode_store(store: &SpectrumStore) -> Snapshot {
    Snapshot {
        live_time: store.live_time,
        real_time: store.real_time,
        counts: store.counts.clone(),
    }
}

/// Black-box numeric backend driven by the acquisition engine.
///
/// Implementations are `Send` (not `Sync`): the acquisition engine wraps
/// its handle in a mutex and that lock is the sole serialization point.
pub trait NumericEngine: Send {
    /// Advance the simulation by `seconds` of acquisition at `activity_bq`.
    ///
    /// Accumulates into the backing store, creating it on first use.
    fn advance(&mut self, seconds: u32, activity_bq: f64) -> AppResult<()>;

    /// Zero the accumulator and discard the backing store.
    fn reset_accumulator(&mut self);

    /// Current backing store, if any acquisition happened since the last
    /// reset.
    fn store(&self) -> Option<&SpectrumStore>;

    /// Number of analyzer channels.
    fn channels(&self) -> usize;
}

/// Synthetic Monte-Carlo backend.
#[derive(Debug)]
pub struct MonteCarloEngine {
    channels: usize,
    kev_per_channel: f64,
    lines: Vec<GammaLine>,
    rng: ChaCha8Rng,
    store: Option<SpectrumStore>,
}

impl MonteCarloEngine {
    /// Validate the configuration and build the engine.
    ///
    /// A `seed` of 0 selects a random seed, matching the vendor tool's
    /// convention. Fails with [`McaError::Prepare`] on an invalid nuclide
    /// identity or channel count; this is fatal at startup.
    pub fn prepare(nuclide: Nuclide, channels: usize, seed: u64) -> AppResult<Self> {
        if channels == 0 {
            return Err(McaError::Prepare { code: 5 });
        }
        if nuclide.symbol().is_none() {
            return Err(McaError::Prepare { code: 2 });
        }
        if nuclide.a < nuclide.z || nuclide.a > 300 {
            return Err(McaError::Prepare { code: 3 });
        }
        if nuclide.m > 3 {
            return Err(McaError::Prepare { code: 4 });
        }

        let rng = if seed == 0 {
            ChaCha8Rng::from_entropy()
        } else {
            ChaCha8Rng::seed_from_u64(seed)
        };

        Ok(Self {
            channels,
            kev_per_channel: FULL_SCALE_KEV / channels as f64,
            lines: emission_lines(nuclide),
            rng,
            store: None,
        })
    }

    /// Deposit one event of energy `energy_kev` into the accumulator.
    fn record_event(store: &mut SpectrumStore, kev_per_channel: f64, energy_kev: f64) {
        if energy_kev <= 0.0 {
            return;
        }
        let channel = (energy_kev / kev_per_channel).round() as usize;
        if let Some(count) = store.counts.get_mut(channel) {
            *count += 1;
        }
        // Above full scale: the event saturates the ADC and is dropped.
    }
}

impl NumericEngine for MonteCarloEngine {
    fn advance(&mut self, seconds: u32, activity_bq: f64) -> AppResult<()> {
        if !activity_bq.is_finite() || activity_bq <= 0.0 {
            return Err(McaError::CalcStep { code: 1 });
        }

        let channels = self.channels;
        let kev_per_channel = self.kev_per_channel;
        let store = self.store.get_or_insert_with(|| SpectrumStore::new(channels));

        let decays = activity_bq * f64::from(seconds);
        let mut detected: u64 = 0;

        for line in &self.lines {
            let mean = decays * line.intensity * detection_efficiency(line.energy_kev);
            if mean <= 0.0 {
                continue;
            }
            let n = Poisson::new(mean)
                .map_err(|_| McaError::CalcStep { code: 2 })?
                .sample(&mut self.rng) as u64;
            detected += n;

            let sigma = peak_sigma_kev(line.energy_kev);
            let response = Normal::new(line.energy_kev, sigma)
                .map_err(|_| McaError::CalcStep { code: 2 })?;
            let edge = compton_edge_kev(line.energy_kev);
            let photo = photopeak_fraction(line.energy_kev);

            for _ in 0..n {
                let energy = if self.rng.gen::<f64>() < photo {
                    response.sample(&mut self.rng)
                } else {
                    self.rng.gen::<f64>() * edge
                };
                Self::record_event(store, kev_per_channel, energy);
            }
        }

        // Dead-time model: every detected event blocks the processor for
        // DEAD_TIME_S, so live time accrues slower than real time.
        let rate = detected as f64 / f64::from(seconds);
        let dead_fraction = (rate * DEAD_TIME_S).min(0.5);
        store.real_time += f64::from(seconds);
        store.live_time += f64::from(seconds) * (1.0 - dead_fraction);

        Ok(())
    }

    fn reset_accumulator(&mut self) {
        self.store = None;
    }

    fn store(&self) -> Option<&SpectrumStore> {
        self.store.as_ref()
    }

    fn channels(&self) -> usize {
        self.channels
    }
}

/// Intrinsic-plus-geometric detection efficiency at `energy_kev`.
fn detection_efficiency(energy_kev: f64) -> f64 {
    (0.30 * (661.7 / energy_kev).powf(0.7)).clamp(0.02, 0.45)
}

/// Fraction of detected events depositing their full energy.
fn photopeak_fraction(energy_kev: f64) -> f64 {
    (1.15 - energy_kev / 2000.0).clamp(0.25, 0.95)
}

/// Maximum energy a single Compton scatter can deposit, keV.
fn compton_edge_kev(energy_kev: f64) -> f64 {
    2.0 * energy_kev * energy_kev / (511.0 + 2.0 * energy_kev)
}

/// Detector resolution as a Gaussian sigma at `energy_kev`.
fn peak_sigma_kev(energy_kev: f64) -> f64 {
    (0.9 + 0.035 * energy_kev.sqrt()) / 2.355
}

/// Principal gamma lines for the common calibration sources; any other
/// identity gets a deterministic synthetic line set so the emulator stays
/// usable for nuclides outside the table.
fn emission_lines(nuclide: Nuclide) -> Vec<GammaLine> {
    let line = |energy_kev: f64, intensity: f64| GammaLine {
        energy_kev,
        intensity,
    };
    match (nuclide.z, nuclide.a, nuclide.m) {
        // Co-60
        (27, 60, 0) => vec![line(1173.2, 0.9985), line(1332.5, 0.9998)],
        // Cs-137 (via Ba-137m)
        (55, 137, _) => vec![line(661.7, 0.851)],
        // Na-22 (annihilation + de-excitation)
        (11, 22, 0) => vec![line(511.0, 1.798), line(1274.5, 0.9994)],
        // Am-241
        (95, 241, 0) => vec![line(59.5, 0.359)],
        // Ba-133
        (56, 133, 0) => vec![line(81.0, 0.329), line(356.0, 0.6205)],
        // Mn-54
        (25, 54, 0) => vec![line(834.8, 0.9998)],
        // K-40
        (19, 40, 0) => vec![line(1460.8, 0.1066)],
        // Eu-152
        (63, 152, 0) => vec![line(121.8, 0.284), line(344.3, 0.265), line(1408.0, 0.210)],
        (z, a, m) => {
            let energy = 60.0 + f64::from((a * 37 + z * 11 + m * 5) % 1700);
            vec![line(energy, 0.8), line(energy * 0.42, 0.25)]
        }
    }
}
