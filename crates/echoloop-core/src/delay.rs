//! Circular-buffer delay line for the echo path.
//!
//! The delay line is allocated once, sized for the longest delay the control
//! surface can request, and never reallocates. Reads accept fractional delay
//! so a gliding delay-time parameter sweeps smoothly through the buffer.
//!
//! # Read/write order
//!
//! [`InterpolatedDelay::read`] with delay `d` returns the sample written `d`
//! writes ago, counting the most recent write as `0`. The graph reads before
//! it writes on every sample, so a read at `d` yields a total delay of `d + 1`
//! samples. This one-sample minimum is what lets a feedback edge close a loop
//! without an instantaneous (undefined) cycle.

/// Linearly interpolated delay line using a circular buffer (heap-allocated).
///
/// # Memory
///
/// The buffer is heap-allocated during construction but never reallocates.
/// No allocations occur during audio processing.
///
/// # Example
///
/// ```rust
/// use echoloop_core::InterpolatedDelay;
///
/// // 1 s max delay at 48kHz
/// let mut delay = InterpolatedDelay::from_time(48000.0, 1.0);
///
/// let output = delay.read(10.5);
/// delay.write(1.0);
/// # let _ = output;
/// ```
#[derive(Debug, Clone)]
pub struct InterpolatedDelay {
    /// Circular buffer storage
    buffer: Vec<f32>,
    /// Write position in buffer
    write_pos: usize,
}

impl InterpolatedDelay {
    /// Creates a new delay line with the given capacity in samples.
    ///
    /// # Panics
    ///
    /// Panics if `max_delay_samples` is 0.
    pub fn new(max_delay_samples: usize) -> Self {
        assert!(max_delay_samples > 0, "Delay size must be > 0");

        Self {
            buffer: vec![0.0; max_delay_samples],
            write_pos: 0,
        }
    }

    /// Creates a delay line able to hold `max_seconds` at `sample_rate`.
    ///
    /// Two guard samples are added so that a read at exactly
    /// `max_seconds * sample_rate` still has an interpolation neighbour.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        let max_samples = (sample_rate * max_seconds).ceil() as usize + 2;
        Self::new(max_samples)
    }

    /// Reads a delayed sample, interpolating linearly between neighbours.
    ///
    /// `delay_samples` is clamped to `[0, capacity - 1]`.
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay_clamped = delay_samples.clamp(0.0, (len - 1) as f32);

        let delay_int = delay_clamped as usize;
        let frac = delay_clamped - delay_int as f32;

        // Points at the sample `delay_int` writes before the last one.
        let read_pos = (self.write_pos + len - delay_int - 1) % len;

        let next_pos = (read_pos + len - 1) % len;
        let a = self.buffer[read_pos];
        let b = self.buffer[next_pos];
        a + (b - a) * frac
    }

    /// Writes a sample to the delay line and advances the write position.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Clears the delay line (sets all samples to 0).
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Returns the capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Largest value `read` accepts without clamping.
    pub fn max_delay(&self) -> f32 {
        (self.buffer.len() - 1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolated_delay_basic() {
        let mut delay = InterpolatedDelay::new(10);

        for i in 1..=5 {
            delay.write(i as f32);
        }

        delay.write(6.0);
        let output = delay.read(3.0);
        assert_eq!(output, 3.0);
    }

    #[test]
    fn test_interpolated_delay_interpolation() {
        let mut delay = InterpolatedDelay::new(10);

        delay.write(0.0);
        delay.write(1.0);
        delay.write(2.0);
        delay.write(3.0);

        let output = delay.read(1.5);
        assert!((output - 1.5).abs() < 0.01, "Expected ~1.5, got {}", output);
    }

    #[test]
    fn test_interpolated_delay_wrap() {
        let mut delay = InterpolatedDelay::new(4);

        delay.write(1.0);
        delay.write(2.0);
        delay.write(3.0);
        delay.write(4.0);
        delay.write(5.0);

        let output = delay.read(3.0);
        assert_eq!(output, 2.0);
    }

    #[test]
    fn test_from_time_holds_one_second() {
        let delay = InterpolatedDelay::from_time(48000.0, 1.0);
        assert!(delay.max_delay() >= 48000.0);
    }

    #[test]
    fn test_read_beyond_capacity_is_clamped() {
        let mut delay = InterpolatedDelay::new(8);
        for i in 0..8 {
            delay.write(i as f32);
        }
        assert_eq!(delay.read(100.0), delay.read(7.0));
    }

    #[test]
    fn test_clear_silences() {
        let mut delay = InterpolatedDelay::new(8);
        delay.write(1.0);
        delay.clear();
        assert_eq!(delay.read(0.0), 0.0);
    }

    #[test]
    #[should_panic]
    fn test_delay_zero_size_panics() {
        let _delay = InterpolatedDelay::new(0);
    }
}
