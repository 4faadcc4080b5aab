//! FFT wrapper with the analysis window

use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use std::sync::Arc;

/// Multiplies `buffer` by a Blackman window, the classic `a = 0.16` form.
pub fn apply_blackman(buffer: &mut [f32]) {
    let n = buffer.len();
    for (i, sample) in buffer.iter_mut().enumerate() {
        let x = 2.0 * PI * i as f32 / n as f32;
        let w = 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos();
        *sample *= w;
    }
}

/// Forward FFT processor with a cached plan
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    size: usize,
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self { fft, scratch, size }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward FFT into a caller-owned buffer of length `size`.
    ///
    /// `input` is zero-padded or truncated to the FFT size. No allocation.
    pub fn forward_into(&mut self, input: &[f32], buffer: &mut [Complex<f32>]) {
        debug_assert_eq!(buffer.len(), self.size);
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(input.get(i).copied().unwrap_or(0.0), 0.0);
        }
        self.fft.process_with_scratch(buffer, &mut self.scratch);
    }
}

impl std::fmt::Debug for Fft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fft").field("size", &self.size).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(fft: &mut Fft, input: &[f32]) -> Vec<Complex<f32>> {
        let mut bins = vec![Complex::new(0.0, 0.0); fft.size()];
        fft.forward_into(input, &mut bins);
        bins
    }

    #[test]
    fn test_window_blackman_shape() {
        let mut coeffs = vec![1.0; 64];
        apply_blackman(&mut coeffs);
        assert!(coeffs[0].abs() < 1e-6);
        assert!((coeffs[32] - 1.0).abs() < 1e-5);
        assert!(coeffs.iter().all(|&w| (-1e-6..=1.0 + 1e-6).contains(&w)));
    }

    #[test]
    fn test_dc_detection() {
        let mut fft = Fft::new(64);

        let bins = spectrum(&mut fft, &[1.0; 64]);

        // DC bin should be large, others small
        let dc_mag = bins[0].norm();
        let other_mag: f32 = bins[1..=32].iter().map(|c| c.norm()).sum();

        assert!(dc_mag > other_mag * 10.0);
    }

    #[test]
    fn test_bin_centered_tone() {
        let mut fft = Fft::new(64);
        let input: Vec<f32> = (0..64)
            .map(|i| (2.0 * PI * 8.0 * i as f32 / 64.0).sin())
            .collect();
        let bins = spectrum(&mut fft, &input);
        let peak = bins[..=32]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(8));
        assert!((bins[8].norm() - 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_short_input_is_zero_padded() {
        let mut fft = Fft::new(64);
        let bins = spectrum(&mut fft, &[1.0; 8]);
        assert!((bins[0].re - 8.0).abs() < 1e-4);
    }
}
