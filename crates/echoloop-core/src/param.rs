//! Parameter smoothing for zipper-free live changes.
//!
//! The control side may move gain, delay time or feedback at any moment. The
//! audio thread only picks up a new value at a block boundary and then glides
//! toward it sample by sample, so a slider drag never produces a step
//! discontinuity in the output.
//!
//! ## Usage
//!
//! ```rust
//! use echoloop_core::SmoothedParam;
//!
//! let mut gain = SmoothedParam::standard(1.0, 48000.0);
//!
//! // New target arrives from the control side
//! gain.set_target(0.5);
//!
//! // In the audio callback, advance once per sample
//! for _ in 0..480 { // 10ms at 48kHz
//!     let smoothed_gain = gain.advance();
//!     // Use smoothed_gain for processing...
//! #   let _ = smoothed_gain;
//! }
//! ```

/// Smoothing time used for gain stages.
pub const STANDARD_SMOOTHING_MS: f32 = 10.0;

/// Smoothing time used for delay time.
///
/// Delay time changes are pitch-bending by nature, so they glide slower.
pub const SLOW_SMOOTHING_MS: f32 = 50.0;

/// A parameter with built-in smoothing for zipper-free changes.
///
/// Uses exponential smoothing (one-pole lowpass), which provides
/// natural-sounding transitions for gain and delay-time changes.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    /// Current smoothed value
    current: f32,
    /// Target value we're smoothing towards
    target: f32,
    /// Smoothing coefficient (1 = instant, close to 0 = very slow)
    coeff: f32,
}

impl SmoothedParam {
    /// Create a smoothed parameter with full configuration.
    ///
    /// A non-positive `smoothing_time_ms` or `sample_rate` disables smoothing.
    ///
    /// # Arguments
    /// * `initial` - Initial parameter value
    /// * `sample_rate` - Sample rate in Hz
    /// * `smoothing_time_ms` - Smoothing time constant in milliseconds
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: one_pole_coeff(sample_rate, smoothing_time_ms),
        }
    }

    /// 10 ms smoothing, used for gain stages.
    pub fn standard(initial: f32, sample_rate: f32) -> Self {
        Self::with_config(initial, sample_rate, STANDARD_SMOOTHING_MS)
    }

    /// 50 ms smoothing, used for delay time.
    pub fn slow(initial: f32, sample_rate: f32) -> Self {
        Self::with_config(initial, sample_rate, SLOW_SMOOTHING_MS)
    }

    /// Set the target value (parameter will smooth towards this).
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Get the next smoothed value (advances by one sample).
    #[inline]
    pub fn advance(&mut self) -> f32 {
        // y[n] = y[n-1] + coeff * (target - y[n-1])
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Skip ahead to the target value immediately.
    ///
    /// Used when a graph is first built, so the initial snapshot is in effect
    /// from the very first sample.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }
}

/// One-pole coefficient `1 - exp(-1 / (tau * sample_rate))`, `tau` in seconds.
///
/// After 5 tau the parameter sits within 0.7% of target.
fn one_pole_coeff(sample_rate: f32, smoothing_time_ms: f32) -> f32 {
    if smoothing_time_ms <= 0.0 || sample_rate <= 0.0 {
        1.0
    } else {
        let samples = smoothing_time_ms / 1000.0 * sample_rate;
        1.0 - (-1.0 / samples).exp()
    }
}
