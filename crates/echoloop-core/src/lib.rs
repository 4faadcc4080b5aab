//! echoloop Core - DSP primitives for a live feedback-echo engine
//!
//! This crate provides the building blocks for the audio path: live parameter
//! cells shared with the control side, zipper-free parameter smoothing, the
//! circular delay line, and the arena-based signal graph that routes a
//! microphone through a regenerative delay loop.
//!
//! # Core Abstractions
//!
//! ## Live Parameters
//!
//! - [`ParameterStore`] - Lock-free holder of gain, delay time and feedback gain
//! - [`ParameterSnapshot`] - Plain copy of the three values at one instant
//! - [`ParamRange`] - Bounds and defaults for each control
//!
//! ## Parameter Smoothing
//!
//! - [`SmoothedParam`] - Exponential smoothing (RC-like response)
//!
//! ## Delay Lines
//!
//! - [`InterpolatedDelay`] - Variable-length delay with interpolation
//!
//! ## Signal Graph
//!
//! - [`SignalTopology`] - Arena of nodes plus a tagged edge list (one feedback edge)
//! - [`GraphProcessor`] - Compiled, audio-thread-owned executor
//! - [`TapReader`] - Latest-block reader for the analysis tap
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use echoloop_core::{ParameterStore, graph::build_karaoke_graph};
//!
//! let params = Arc::new(ParameterStore::new());
//! params.set_feedback_gain(0.5);
//!
//! let built = build_karaoke_graph(48000.0, Arc::clone(&params)).unwrap();
//! let mut processor = built.processor;
//!
//! let input = [0.25_f32; 256];
//! let mut output = [0.0_f32; 256];
//! processor.process_block(&input, &mut output);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations or locks in audio processing paths
//! - **Arena topology**: Nodes are addressed by index, so the feedback cycle is
//!   an edge, not a pair of owning pointers
//! - **Bounded loop gain**: Feedback is clamped below unity at every layer

pub mod delay;
pub mod graph;
pub mod math;
pub mod param;
pub mod params;

// Re-export main types at crate root
pub use delay::InterpolatedDelay;
pub use graph::{
    BuiltGraph, EdgeId, EdgeKind, GainRole, GraphError, GraphProcessor, KaraokeNodes, NodeId,
    SignalTopology, TAP_BLOCK_SIZE, TapBlock, TapReader,
};
pub use math::{clamp_finite, flush_denormal};
pub use param::SmoothedParam;
pub use params::{
    DELAY_TIME_RANGE, FEEDBACK_RANGE, GAIN_RANGE, MAX_DELAY_SECS, MAX_FEEDBACK_GAIN, ParamRange,
    ParameterSnapshot, ParameterStore,
};
