//! Graph node types.
//!
//! Each node has a [`NodeId`] and a `NodeKind` carrying its per-node state.
//! `NodeData` bundles the kind with adjacency lists.

use crate::delay::InterpolatedDelay;
use crate::param::SmoothedParam;
use crate::params::MAX_DELAY_SECS;

use super::edge::EdgeId;
use super::tap::TapWriter;

/// Unique identifier for a node in the signal graph.
///
/// Node IDs are arena indices assigned sequentially and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Which live parameter drives a Gain node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GainRole {
    /// Output gain (`gain`).
    Master,
    /// Gain inside the echo loop (`feedback_gain`), capped below unity.
    Feedback,
}

/// The role and state of a node.
pub(crate) enum NodeKind {
    /// Microphone input. Exactly one per graph.
    Source,
    /// Scalar multiply with a smoothed level.
    Gain { role: GainRole, level: SmoothedParam },
    /// Circular delay line with a smoothed delay time in seconds.
    Delay {
        line: InterpolatedDelay,
        time_secs: SmoothedParam,
    },
    /// Speaker output. Exactly one per graph.
    Sink,
    /// Buffers its input for the analyzer. Has no outgoing edges.
    AnalysisTap(TapWriter),
}

impl NodeKind {
    pub fn gain(role: GainRole, sample_rate: f32) -> Self {
        Self::Gain {
            role,
            level: SmoothedParam::standard(0.0, sample_rate),
        }
    }

    pub fn delay(sample_rate: f32) -> Self {
        Self::Delay {
            line: InterpolatedDelay::from_time(sample_rate, MAX_DELAY_SECS),
            time_secs: SmoothedParam::slow(0.0, sample_rate),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Gain {
                role: GainRole::Master,
                ..
            } => "gain",
            Self::Gain {
                role: GainRole::Feedback,
                ..
            } => "feedback-gain",
            Self::Delay { .. } => "delay",
            Self::Sink => "sink",
            Self::AnalysisTap(_) => "analysis-tap",
        }
    }

    pub fn is_delay(&self) -> bool {
        matches!(self, Self::Delay { .. })
    }
}

/// Internal bookkeeping for a node in the graph.
pub(crate) struct NodeData {
    pub kind: NodeKind,
    /// Edges arriving at this node.
    pub incoming: Vec<EdgeId>,
    /// Edges leaving this node.
    pub outgoing: Vec<EdgeId>,
}

impl NodeData {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }
}
