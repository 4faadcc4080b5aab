//! Pluggable audio backend abstraction.
//!
//! [`AudioBackend`] decouples the live signal graph from any specific platform
//! audio API. Two implementations ship with this crate:
//!
//! - [`CpalBackend`](crate::CpalBackend): ALSA, CoreAudio, WASAPI through cpal
//! - [`MockBackend`](crate::MockBackend): deterministic, test-driven callbacks
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │  SignalGraph / SessionController │
//! └──────────────┬───────────────────┘
//!                │ uses AudioBackend trait
//!                ▼
//! ┌──────────────────────────────────┐
//! │        AudioBackend trait        │
//! │  list_devices / build_streams    │
//! └──────────────┬───────────────────┘
//!                │ implemented by
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌─────────────┐  ┌─────────────┐
//! │ CpalBackend │  │ MockBackend │
//! └─────────────┘  └─────────────┘
//! ```
//!
//! The trait uses boxed closures for callbacks rather than generic parameters,
//! making `AudioBackend` object-safe. Stream handles are returned as
//! [`StreamHandle`], a type-erased wrapper that stops the stream on drop.

use crate::{AudioDevice, Result};

/// Configuration for building an audio stream.
///
/// ## Fields
///
/// - `sample_rate`: Requested sample rate in Hz (default: 48000)
/// - `buffer_size`: Preferred buffer size in frames (default: 256)
/// - `channels`: Number of audio channels (default: 2, stereo)
/// - `device_name`: Optional device name filter (uses default device if `None`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of audio channels.
    pub channels: u16,
    /// Optional device name (uses system default if `None`).
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            channels: 2,
            device_name: None,
        }
    }
}

/// Platform voice-processing toggles for microphone capture.
///
/// The live graph always captures with [`raw()`](Self::raw): every stage off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputConstraints {
    /// Acoustic echo cancellation.
    pub echo_cancellation: bool,
    /// Background noise suppression.
    pub noise_suppression: bool,
    /// Automatic gain control.
    pub auto_gain_control: bool,
}

impl InputConstraints {
    /// All processing disabled.
    pub const fn raw() -> Self {
        Self {
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
        }
    }

    /// True if no processing stage is requested.
    pub fn is_raw(&self) -> bool {
        !(self.echo_cancellation || self.noise_suppression || self.auto_gain_control)
    }
}

impl Default for InputConstraints {
    fn default() -> Self {
        Self::raw()
    }
}

/// Type-erased audio stream handle.
///
/// Wraps a backend-specific stream object. The stream is active while this handle
/// exists; dropping it stops playback/capture, and the backend guarantees no
/// callback runs after the drop returns.
pub struct StreamHandle {
    /// The backend-specific stream object, kept alive via RAII.
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Create a new stream handle wrapping a backend-specific stream object.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Audio output callback signature.
///
/// Called by the audio backend on the real-time audio thread with a mutable
/// buffer of interleaved f32 samples (`[L0, R0, L1, R1, ...]` for stereo) that
/// it must fill. Implementations must not allocate, lock, or perform I/O.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Audio input callback signature.
///
/// Called on the real-time audio thread with captured interleaved samples.
pub type InputCallback = Box<dyn FnMut(&[f32]) + Send>;

/// Error callback signature.
///
/// Called when the audio backend encounters an error during streaming.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Pluggable audio backend trait.
///
/// Object-safe, so callers hold a `Box<dyn AudioBackend>` and tests inject a
/// [`MockBackend`](crate::MockBackend).
pub trait AudioBackend: Send {
    /// Human-readable name of this backend (e.g., "cpal", "mock").
    fn name(&self) -> &str;

    /// List all available audio devices.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// Get the default output device, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Get the default input device, if any.
    fn default_input_device(&self) -> Result<Option<AudioDevice>>;

    /// Build an output-only audio stream.
    ///
    /// The returned [`StreamHandle`] keeps the stream alive. Dropping it stops
    /// playback.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// Build an input-only audio stream.
    ///
    /// `constraints` names the voice-processing stages the caller wants.
    /// Permission refusal surfaces as [`Error::PermissionDenied`](crate::Error::PermissionDenied).
    fn build_input_stream(
        &self,
        config: &BackendStreamConfig,
        constraints: &InputConstraints,
        callback: InputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// Query the actual sample rate the backend will use for the given config.
    ///
    /// Default implementation returns the requested rate unchanged.
    fn actual_sample_rate(&self, config: &BackendStreamConfig) -> u32 {
        config.sample_rate
    }
}
