//! Live control values shared between the control side and the audio thread.
//!
//! [`ParameterStore`] holds gain, delay time and feedback gain in three
//! independent atomic cells. The control side writes, the audio thread reads
//! once per block. No locks, no allocations.
//!
//! # Clamping policy
//!
//! Setters saturate: a value outside the range is pinned to the nearest bound,
//! never rejected. `NaN` is treated as the lower bound. The feedback ceiling
//! [`MAX_FEEDBACK_GAIN`] keeps the loop gain strictly below unity, so no
//! accepted value can make the echo run away.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::math::clamp_finite;

/// Hard ceiling for feedback gain. Loop gain through the delay is unity, so
/// this is also the loop gain ceiling.
pub const MAX_FEEDBACK_GAIN: f32 = 0.95;

/// Longest delay the delay line is sized for, in seconds.
pub const MAX_DELAY_SECS: f32 = 1.0;

/// Bounds and default of one live control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    /// Lowest accepted value.
    pub min: f32,
    /// Highest accepted value.
    pub max: f32,
    /// Value at session start.
    pub default: f32,
}

impl ParamRange {
    /// Pins `value` into `[min, max]`. `NaN` maps to `min`.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        clamp_finite(value, self.min, self.max)
    }

    /// Returns true if `value` lies within the range.
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Output gain, linear. The control surface shows 0-150 percent.
pub const GAIN_RANGE: ParamRange = ParamRange {
    min: 0.0,
    max: 1.5,
    default: 1.0,
};

/// Echo delay time in seconds.
pub const DELAY_TIME_RANGE: ParamRange = ParamRange {
    min: 0.0,
    max: MAX_DELAY_SECS,
    default: 0.3,
};

/// Gain applied on the way back into the delay line.
pub const FEEDBACK_RANGE: ParamRange = ParamRange {
    min: 0.0,
    max: MAX_FEEDBACK_GAIN,
    default: 0.4,
};

/// Plain copy of the three live values at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    /// Output gain (linear).
    pub gain: f32,
    /// Delay time in seconds.
    pub delay_time_secs: f32,
    /// Feedback gain (linear, below 1).
    pub feedback_gain: f32,
}

impl ParameterSnapshot {
    /// Returns a copy with every field clamped to its range.
    pub fn clamped(self) -> Self {
        Self {
            gain: GAIN_RANGE.clamp(self.gain),
            delay_time_secs: DELAY_TIME_RANGE.clamp(self.delay_time_secs),
            feedback_gain: FEEDBACK_RANGE.clamp(self.feedback_gain),
        }
    }

    /// Attenuation after one pass around the feedback loop.
    pub fn loop_gain(&self) -> f32 {
        FEEDBACK_RANGE.clamp(self.feedback_gain)
    }
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            gain: GAIN_RANGE.default,
            delay_time_secs: DELAY_TIME_RANGE.default,
            feedback_gain: FEEDBACK_RANGE.default,
        }
    }
}

/// One f32 stored as bits in an `AtomicU32`.
#[derive(Debug)]
struct ParamCell {
    value: AtomicU32,
    range: ParamRange,
}

impl ParamCell {
    fn new(range: ParamRange, initial: f32) -> Self {
        Self {
            value: AtomicU32::new(range.clamp(initial).to_bits()),
            range,
        }
    }

    #[inline]
    fn set(&self, v: f32) -> f32 {
        let clamped = self.range.clamp(v);
        self.value.store(clamped.to_bits(), Ordering::Release);
        clamped
    }

    #[inline]
    fn get(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Acquire))
    }
}

/// Thread-safe holder of the three live control values.
///
/// Share it behind an `Arc`: the control side calls the setters, the graph
/// processor calls [`snapshot`](Self::snapshot) at each block boundary. Each
/// cell is independent, so a snapshot taken during a burst of writes may mix
/// old and new values; every value it holds is still in range.
///
/// ```rust
/// use echoloop_core::ParameterStore;
///
/// let store = ParameterStore::new();
/// store.set_gain(-5.0);
/// assert_eq!(store.snapshot().gain, 0.0);
/// store.set_gain(1000.0);
/// assert_eq!(store.snapshot().gain, 1.5);
/// ```
#[derive(Debug)]
pub struct ParameterStore {
    gain: ParamCell,
    delay_time: ParamCell,
    feedback_gain: ParamCell,
}

impl ParameterStore {
    /// Creates a store holding the defaults (gain 1.0, delay 0.3 s, feedback 0.4).
    pub fn new() -> Self {
        Self::with_snapshot(ParameterSnapshot::default())
    }

    /// Creates a store seeded from `snapshot` (clamped).
    pub fn with_snapshot(snapshot: ParameterSnapshot) -> Self {
        Self {
            gain: ParamCell::new(GAIN_RANGE, snapshot.gain),
            delay_time: ParamCell::new(DELAY_TIME_RANGE, snapshot.delay_time_secs),
            feedback_gain: ParamCell::new(FEEDBACK_RANGE, snapshot.feedback_gain),
        }
    }

    /// Sets output gain. Returns the value actually stored.
    pub fn set_gain(&self, gain: f32) -> f32 {
        self.gain.set(gain)
    }

    /// Sets output gain from control-surface percent (0-150).
    pub fn set_gain_percent(&self, percent: f32) -> f32 {
        self.gain.set(percent / 100.0)
    }

    /// Sets delay time in seconds. Returns the value actually stored.
    pub fn set_delay_time(&self, secs: f32) -> f32 {
        self.delay_time.set(secs)
    }

    /// Sets feedback gain. Returns the value actually stored (at most 0.95).
    pub fn set_feedback_gain(&self, feedback: f32) -> f32 {
        self.feedback_gain.set(feedback)
    }

    /// Current output gain.
    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    /// Current delay time in seconds.
    #[inline]
    pub fn delay_time(&self) -> f32 {
        self.delay_time.get()
    }

    /// Current feedback gain.
    #[inline]
    pub fn feedback_gain(&self) -> f32 {
        self.feedback_gain.get()
    }

    /// Latest values.
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            gain: self.gain(),
            delay_time_secs: self.delay_time(),
            feedback_gain: self.feedback_gain(),
        }
    }

    /// Stores every field of `snapshot` (clamped).
    pub fn apply(&self, snapshot: ParameterSnapshot) {
        self.gain.set(snapshot.gain);
        self.delay_time.set(snapshot.delay_time_secs);
        self.feedback_gain.set(snapshot.feedback_gain);
    }

    /// Restores the defaults.
    pub fn reset(&self) {
        self.apply(ParameterSnapshot::default());
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}
