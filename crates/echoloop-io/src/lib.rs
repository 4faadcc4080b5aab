//! Audio I/O layer for echoloop.
//!
//! This crate provides:
//!
//! - **Backends**: the [`AudioBackend`] trait, the cpal-based [`CpalBackend`],
//!   and a deterministic [`MockBackend`] for tests
//! - **Devices**: [`list_devices`] / [`default_device`] and wireless output
//!   discovery via [`detect_wireless_output`]
//! - **Live graph**: [`SignalGraph`] wires a microphone stream through the
//!   karaoke echo graph to the speakers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use echoloop_core::ParameterSnapshot;
//! use echoloop_io::{CpalBackend, SignalGraph, StreamConfig};
//!
//! let backend = CpalBackend::try_new()?;
//! let mut graph = SignalGraph::construct(&backend, &StreamConfig::default(), ParameterSnapshot::default())?;
//! let tap = graph.tap_analysis();
//! // ... later
//! graph.teardown();
//! ```

pub mod backend;
pub mod cpal_backend;
mod devices;
mod engine;
pub mod mock;
pub mod transport;

pub use backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, InputCallback, InputConstraints,
    OutputCallback, StreamHandle,
};
pub use cpal_backend::CpalBackend;
pub use devices::{AudioDevice, default_device, list_devices};
pub use engine::{SignalGraph, StreamConfig};
pub use mock::MockBackend;
pub use transport::{OutputTransport, TransportReport, detect_wireless_output};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The platform refused microphone access.
    #[error("Microphone access denied: {0}")]
    PermissionDenied(String),

    /// No usable device, or the device disappeared.
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// No audio host exists on this platform.
    #[error("Audio capture not supported on this platform: {0}")]
    UnsupportedPlatform(String),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The signal graph could not be built.
    #[error("Signal graph error: {0}")]
    Graph(#[from] echoloop_core::GraphError),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
