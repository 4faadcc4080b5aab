//! Small numeric helpers shared by the audio path and the parameter store.

/// Flush denormal (subnormal) floats to zero.
///
/// A feedback loop with gain below unity decays geometrically toward zero and
/// would otherwise spend a long tail in the subnormal range, where many CPUs
/// slow down dramatically. Anything below `1e-20` is treated as silence.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Clamp `x` into `[min, max]`, mapping NaN to `min`.
///
/// `f32::clamp` propagates NaN, which must never reach a gain stage.
#[inline]
pub fn clamp_finite(x: f32, min: f32, max: f32) -> f32 {
    if x.is_nan() { min } else { x.clamp(min, max) }
}
