//! echoloop Analysis - live spectrum of the echo engine's analysis tap
//!
//! - [`fft`] - FFT wrapper and the Blackman analysis window
//! - [`spectrum`] - 32-band byte spectrum analyzer over a [`TapReader`](echoloop_core::TapReader)
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use echoloop_analysis::{AnalyzerConfig, SpectrumAnalyzer};
//! use echoloop_core::{ParameterStore, graph::build_karaoke_graph};
//!
//! let built = build_karaoke_graph(48000.0, Arc::new(ParameterStore::new())).unwrap();
//! let mut analyzer = SpectrumAnalyzer::new(built.tap, AnalyzerConfig::default()).unwrap();
//!
//! let snapshot = analyzer.sample();
//! assert_eq!(snapshot.bands().len(), 32);
//! ```

pub mod fft;
pub mod spectrum;

pub use fft::{Fft, apply_blackman};
pub use spectrum::{
    AnalyzerConfig, AnalyzerConfigError, BAND_COUNT, SpectrumAnalyzer, SpectrumSnapshot,
    band_frequency,
};
