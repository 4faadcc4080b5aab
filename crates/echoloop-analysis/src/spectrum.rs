//! 32-band byte spectrum of the live analysis tap.
//!
//! [`SpectrumAnalyzer`] turns the most recent 64-sample tap block into 32
//! magnitudes in `0..=255`, the same shape a browser analyser node reports for
//! an FFT size of 64:
//!
//! 1. Blackman window over the 64 samples
//! 2. FFT, magnitude of bins `0..32` scaled by `1/64`
//! 3. Temporal smoothing `s = tau * s_prev + (1 - tau) * m`
//! 4. `20 * log10(s)` mapped linearly from `[min_db, max_db]` to `[0, 255]`
//!
//! Sampling never blocks. If the audio thread has not published a new block
//! since the last call, the previous block is analysed again.

use echoloop_core::{TAP_BLOCK_SIZE, TapBlock, TapReader};
use rustfft::num_complex::Complex;
use thiserror::Error;

use crate::fft::{Fft, apply_blackman};

/// Number of bands in a [`SpectrumSnapshot`].
pub const BAND_COUNT: usize = TAP_BLOCK_SIZE / 2;

/// Errors from an invalid [`AnalyzerConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerConfigError {
    /// Smoothing must lie in `[0, 1]`.
    #[error("smoothing must be within 0.0..=1.0, got {0}")]
    InvalidSmoothing(f32),
    /// The dB window must be finite with `min_db < max_db`.
    #[error("invalid dB range: min {min_db} must be below max {max_db}")]
    InvalidDbRange {
        /// Level mapped to 0.
        min_db: f32,
        /// Level mapped to 255.
        max_db: f32,
    },
}

/// Tuning of the spectrum display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    /// Temporal smoothing constant, 0 = none, close to 1 = very sluggish.
    pub smoothing: f32,
    /// Level shown as an empty bar.
    pub min_db: f32,
    /// Level shown as a full bar.
    pub max_db: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalyzerConfig {
    /// Checks ranges.
    pub fn validate(&self) -> Result<(), AnalyzerConfigError> {
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(AnalyzerConfigError::InvalidSmoothing(self.smoothing));
        }
        if !self.min_db.is_finite() || !self.max_db.is_finite() || self.min_db >= self.max_db {
            return Err(AnalyzerConfigError::InvalidDbRange {
                min_db: self.min_db,
                max_db: self.max_db,
            });
        }
        Ok(())
    }
}

/// One frame of band magnitudes, lowest band first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpectrumSnapshot {
    bands: [u8; BAND_COUNT],
}

impl SpectrumSnapshot {
    /// All bands at zero.
    pub const SILENT: Self = Self {
        bands: [0; BAND_COUNT],
    };

    /// Wraps raw band values.
    pub fn from_bands(bands: [u8; BAND_COUNT]) -> Self {
        Self { bands }
    }

    /// Band magnitudes.
    pub fn bands(&self) -> &[u8; BAND_COUNT] {
        &self.bands
    }

    /// Index and value of the loudest band, or `None` when all are zero.
    ///
    /// Ties go to the lowest band.
    pub fn peak_band(&self) -> Option<(usize, u8)> {
        let (idx, &value) = self
            .bands
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|&(_, v)| *v)?;
        (value > 0).then_some((idx, value))
    }

    /// True when every band is zero.
    pub fn is_silent(&self) -> bool {
        self.bands.iter().all(|&b| b == 0)
    }
}

impl Default for SpectrumSnapshot {
    fn default() -> Self {
        Self::SILENT
    }
}

/// Center frequency of `band` in Hz.
pub fn band_frequency(band: usize, sample_rate: f32) -> f32 {
    band as f32 * sample_rate / TAP_BLOCK_SIZE as f32
}

/// Periodic sampler over the graph's analysis tap.
pub struct SpectrumAnalyzer {
    tap: TapReader,
    config: AnalyzerConfig,
    fft: Fft,
    window: [f32; TAP_BLOCK_SIZE],
    frame: [f32; TAP_BLOCK_SIZE],
    bins: Vec<Complex<f32>>,
    smoothed: [f32; BAND_COUNT],
    fresh_blocks: u64,
    stale_reads: u64,
}

impl SpectrumAnalyzer {
    /// Creates an analyzer over `tap`.
    pub fn new(tap: TapReader, config: AnalyzerConfig) -> Result<Self, AnalyzerConfigError> {
        config.validate()?;
        let mut window = [1.0; TAP_BLOCK_SIZE];
        apply_blackman(&mut window);
        Ok(Self {
            tap,
            config,
            fft: Fft::new(TAP_BLOCK_SIZE),
            window,
            frame: [0.0; TAP_BLOCK_SIZE],
            bins: vec![Complex::new(0.0, 0.0); TAP_BLOCK_SIZE],
            smoothed: [0.0; BAND_COUNT],
            fresh_blocks: 0,
            stale_reads: 0,
        })
    }

    /// Analyzes the newest tap block (or the previous one again).
    pub fn sample(&mut self) -> SpectrumSnapshot {
        let (block, fresh) = self.tap.latest();
        let block: TapBlock = *block;
        if fresh {
            self.fresh_blocks += 1;
        } else {
            self.stale_reads += 1;
        }
        self.analyze(&block)
    }

    /// Analyzer settings.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Number of calls that found a newly published block.
    pub fn fresh_blocks(&self) -> u64 {
        self.fresh_blocks
    }

    /// Number of calls that re-used the previous block.
    pub fn stale_reads(&self) -> u64 {
        self.stale_reads
    }

    /// Forgets smoothing history.
    pub fn reset(&mut self) {
        self.smoothed = [0.0; BAND_COUNT];
    }

    fn analyze(&mut self, block: &TapBlock) -> SpectrumSnapshot {
        for ((dst, &s), &w) in self.frame.iter_mut().zip(block).zip(&self.window) {
            *dst = s * w;
        }
        self.fft.forward_into(&self.frame, &mut self.bins);

        let tau = self.config.smoothing;
        let scale = 1.0 / TAP_BLOCK_SIZE as f32;
        let span = self.config.max_db - self.config.min_db;
        let mut bands = [0u8; BAND_COUNT];

        for (k, band) in bands.iter_mut().enumerate() {
            let magnitude = self.bins[k].norm() * scale;
            let mut s = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            if !s.is_finite() {
                s = 0.0;
            }
            self.smoothed[k] = s;

            let db = 20.0 * s.max(1e-20).log10();
            let scaled = 255.0 * (db - self.config.min_db) / span;
            *band = scaled.clamp(0.0, 255.0) as u8;
        }

        SpectrumSnapshot { bands }
    }
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("config", &self.config)
            .field("fresh_blocks", &self.fresh_blocks)
            .field("stale_reads", &self.stale_reads)
            .finish_non_exhaustive()
    }
}
