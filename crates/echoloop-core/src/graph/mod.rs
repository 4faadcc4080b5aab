//! Arena-based signal graph with a single regenerative delay loop.
//!
//! The graph module routes the microphone through a small fixed topology: a
//! master gain, a delay line whose output is fed back into itself through a
//! feedback gain, a speaker sink and an analysis tap.
//!
//! # Architecture
//!
//! The system uses a **two-object split**:
//!
//! - [`SignalTopology`]: owned by the control side while the graph is being
//!   declared. Holds nodes and edges in flat arenas addressed by [`NodeId`]
//!   and [`EdgeId`], validates every connection, and is consumed by
//!   [`compile()`](SignalTopology::compile).
//! - [`GraphProcessor`]: owned by the audio thread. Holds the evaluation
//!   order, per-node state (smoothers, delay buffer, tap writer) and a shared
//!   handle to the [`ParameterStore`](crate::ParameterStore).
//!
//! # Cycles
//!
//! Forward edges must form a DAG; [`SignalTopology::connect`] rejects any edge
//! that would close a cycle. The echo loop is declared with
//! [`SignalTopology::connect_feedback`], which only accepts a Delay node as
//! target. Per sample the processor runs three phases:
//!
//! 1. every Delay node emits its delayed read
//! 2. remaining nodes run in topological order, summing their incoming edges
//! 3. every Delay node writes the sum of its incoming edges, feedback included
//!
//! The delay therefore always contributes at least one sample of latency, so
//! the feedback edge never forms an instantaneous loop.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use echoloop_core::{GainRole, ParameterStore, SignalTopology};
//!
//! let mut topo = SignalTopology::new(48000.0);
//! let src = topo.add_source();
//! let gain = topo.add_gain(GainRole::Master);
//! let delay = topo.add_delay();
//! let fb = topo.add_gain(GainRole::Feedback);
//! let sink = topo.add_sink();
//!
//! topo.connect(src, gain)?;
//! topo.connect(gain, delay)?;
//! topo.connect(delay, fb)?;
//! topo.connect_feedback(fb, delay)?;
//! topo.connect(gain, sink)?;
//! topo.connect(delay, sink)?;
//!
//! let mut processor = topo.compile(Arc::new(ParameterStore::new()))?;
//! let mut out = [0.0_f32; 64];
//! processor.process_block(&[0.1; 64], &mut out);
//! # Ok::<(), echoloop_core::GraphError>(())
//! ```

pub mod edge;
pub mod node;
mod processor;
mod tap;
mod topology;

use std::sync::Arc;

pub use edge::{EdgeId, EdgeKind};
pub use node::{GainRole, NodeId};
pub use processor::GraphProcessor;
pub use tap::{TAP_BLOCK_SIZE, TapBlock, TapReader};
pub use topology::{GraphError, SignalTopology};

use crate::params::ParameterStore;

/// Node handles of the karaoke topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KaraokeNodes {
    /// Microphone input.
    pub source: NodeId,
    /// Output gain stage.
    pub master_gain: NodeId,
    /// Echo delay line.
    pub delay: NodeId,
    /// Gain on the way back into the delay.
    pub feedback_gain: NodeId,
    /// Speaker output.
    pub sink: NodeId,
    /// Analyzer tap on the dry (gained) signal.
    pub tap: NodeId,
}

/// A compiled karaoke graph ready to hand to the audio thread.
pub struct BuiltGraph {
    /// Audio-thread executor.
    pub processor: GraphProcessor,
    /// Reader side of the analysis tap.
    pub tap: TapReader,
    /// Handles of every node, for introspection and tests.
    pub nodes: KaraokeNodes,
}

impl std::fmt::Debug for BuiltGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltGraph")
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}

/// Declares, validates and compiles the karaoke topology:
///
/// ```text
/// source -> gain -> delay -> feedback_gain -+
///             |      ^  |                   |
///             |      +--|-------------------+  (feedback)
///             |         v
///             +------> sink
///             +------> tap
/// ```
///
/// Parameters are taken from `params` and snapped, so the first block already
/// runs at the requested values.
pub fn build_karaoke_graph(
    sample_rate: f32,
    params: Arc<ParameterStore>,
) -> Result<BuiltGraph, GraphError> {
    let (topology, nodes, tap) = SignalTopology::karaoke(sample_rate)?;
    let processor = topology.compile(params)?;
    Ok(BuiltGraph {
        processor,
        tap,
        nodes,
    })
}
