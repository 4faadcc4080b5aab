//! Graph edge types.
//!
//! An `Edge` connects two nodes, representing audio signal flow from a source
//! node to a destination node. Forward edges form a DAG and fix the evaluation
//! order; the single feedback edge closes the echo loop through a delay.

use super::node::NodeId;

/// Unique identifier for an edge in the signal graph.
///
/// Edge IDs are assigned sequentially and never reused within a graph instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

/// How an edge participates in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    /// Ordinary signal flow. Forward edges must not form a cycle.
    Forward,
    /// Loop-closing edge into a Delay node, read on the next sample.
    Feedback,
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Edge {
    /// Source node.
    pub from: NodeId,
    /// Destination node.
    pub to: NodeId,
    pub kind: EdgeKind,
}
