//! Signal topology: node arena, edge validation and compilation.
//!
//! [`SignalTopology`] is declared once on the control side, then consumed by
//! [`compile()`](SignalTopology::compile) into a [`GraphProcessor`]. The node
//! set and edges are fixed from that point on; only per-node scalar
//! parameters change while audio runs.

use std::sync::Arc;

use crate::params::ParameterStore;

use super::KaraokeNodes;
use super::edge::{Edge, EdgeId, EdgeKind};
use super::node::{GainRole, NodeData, NodeId, NodeKind};
use super::processor::GraphProcessor;
use super::tap::{TapReader, tap_channel};

/// Errors that can occur while declaring or compiling a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The specified node was not found in the graph.
    NodeNotFound(NodeId),
    /// Adding this forward edge would create a cycle.
    CycleDetected,
    /// A duplicate edge already exists between these nodes.
    DuplicateEdge(NodeId, NodeId),
    /// Feedback edges may only target a Delay node.
    FeedbackTargetNotDelay(NodeId),
    /// The graph already has its feedback edge.
    FeedbackAlreadyConnected,
    /// The graph must have exactly one Source node.
    InvalidSourceCount(usize),
    /// The graph must have exactly one Sink node.
    InvalidSinkCount(usize),
    /// A node has an invalid connection (e.g. an edge into the Source).
    InvalidConnection(String),
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "node {id} not found"),
            Self::CycleDetected => write!(f, "adding this edge would create a cycle"),
            Self::DuplicateEdge(a, b) => write!(f, "edge from {a} to {b} already exists"),
            Self::FeedbackTargetNotDelay(id) => {
                write!(f, "feedback edge must target a delay node, {id} is not one")
            }
            Self::FeedbackAlreadyConnected => write!(f, "graph already has a feedback edge"),
            Self::InvalidSourceCount(n) => write!(f, "expected 1 Source node, found {n}"),
            Self::InvalidSinkCount(n) => write!(f, "expected 1 Sink node, found {n}"),
            Self::InvalidConnection(msg) => write!(f, "invalid connection: {msg}"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Node arena plus tagged edge list.
///
/// # Usage
///
/// 1. Create with [`new()`](Self::new)
/// 2. Add nodes: [`add_source()`](Self::add_source), [`add_gain()`](Self::add_gain),
///    [`add_delay()`](Self::add_delay), [`add_sink()`](Self::add_sink),
///    [`add_analysis_tap()`](Self::add_analysis_tap)
/// 3. Connect: [`connect()`](Self::connect) and at most one
///    [`connect_feedback()`](Self::connect_feedback)
/// 4. Compile: [`compile()`](Self::compile)
pub struct SignalTopology {
    nodes: Vec<NodeData>,
    edges: Vec<Edge>,
    sample_rate: f32,
}

impl SignalTopology {
    /// Creates an empty topology for the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            sample_rate,
        }
    }

    /// Declares the karaoke graph: source, master gain, delay with a feedback
    /// gain loop, sink, and an analysis tap on the master gain output.
    pub fn karaoke(sample_rate: f32) -> Result<(Self, KaraokeNodes, TapReader), GraphError> {
        let mut topo = Self::new(sample_rate);
        let source = topo.add_source();
        let master_gain = topo.add_gain(GainRole::Master);
        let delay = topo.add_delay();
        let feedback_gain = topo.add_gain(GainRole::Feedback);
        let sink = topo.add_sink();
        let (tap, reader) = topo.add_analysis_tap();

        topo.connect(source, master_gain)?;
        topo.connect(master_gain, delay)?;
        topo.connect(delay, feedback_gain)?;
        topo.connect_feedback(feedback_gain, delay)?;
        topo.connect(master_gain, sink)?;
        topo.connect(delay, sink)?;
        topo.connect(master_gain, tap)?;

        let nodes = KaraokeNodes {
            source,
            master_gain,
            delay,
            feedback_gain,
            sink,
            tap,
        };
        Ok((topo, nodes, reader))
    }

    // --- Node declarations ---

    /// Adds the microphone input node.
    pub fn add_source(&mut self) -> NodeId {
        self.add_node(NodeKind::Source)
    }

    /// Adds the speaker output node.
    pub fn add_sink(&mut self) -> NodeId {
        self.add_node(NodeKind::Sink)
    }

    /// Adds a smoothed gain stage driven by the given live parameter.
    pub fn add_gain(&mut self, role: GainRole) -> NodeId {
        let kind = NodeKind::gain(role, self.sample_rate);
        self.add_node(kind)
    }

    /// Adds a delay line sized for the longest accepted delay time.
    pub fn add_delay(&mut self) -> NodeId {
        let kind = NodeKind::delay(self.sample_rate);
        self.add_node(kind)
    }

    /// Adds an analysis tap and returns its reader.
    pub fn add_analysis_tap(&mut self) -> (NodeId, TapReader) {
        let (writer, reader) = tap_channel();
        (self.add_node(NodeKind::AnalysisTap(writer)), reader)
    }

    // --- Edges ---

    /// Connects two nodes with a forward edge.
    ///
    /// Returns the new edge's ID, or an error if:
    /// - Either node doesn't exist
    /// - The connection is structurally invalid (e.g. an edge into the Source)
    /// - A duplicate edge already exists
    /// - The edge would create a cycle among forward edges
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<EdgeId, GraphError> {
        self.validate_connection(from, to)?;

        if self.has_edge(from, to) {
            return Err(GraphError::DuplicateEdge(from, to));
        }

        // A cycle exists if `to` can already reach `from` via forward edges.
        if self.can_reach(to, from) {
            return Err(GraphError::CycleDetected);
        }

        let id = self.push_edge(from, to, EdgeKind::Forward);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {from} -> {to}");
        Ok(id)
    }

    /// Connects the loop-closing feedback edge into a Delay node.
    ///
    /// Only one feedback edge is allowed per graph.
    pub fn connect_feedback(&mut self, from: NodeId, to: NodeId) -> Result<EdgeId, GraphError> {
        self.validate_connection(from, to)?;

        if !self.node(to)?.kind.is_delay() {
            return Err(GraphError::FeedbackTargetNotDelay(to));
        }
        if self.edges.iter().any(|e| e.kind == EdgeKind::Feedback) {
            return Err(GraphError::FeedbackAlreadyConnected);
        }
        if self.has_edge(from, to) {
            return Err(GraphError::DuplicateEdge(from, to));
        }

        let id = self.push_edge(from, to, EdgeKind::Feedback);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect_feedback: {from} -> {to}");
        Ok(id)
    }

    /// Number of declared nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of declared edges, feedback included.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Kind of the edge from `from` to `to`, if one exists.
    pub fn edge_kind(&self, from: NodeId, to: NodeId) -> Option<EdgeKind> {
        self.find_edge(from, to).map(|id| self.edges[id.0 as usize].kind)
    }

    /// Sample rate the nodes were sized for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    // --- Compilation ---

    /// Validates and orders the graph, producing the audio-thread processor.
    ///
    /// Requires exactly one Source and one Sink. Live values are read from
    /// `params` and snapped, so the first block already uses them.
    pub fn compile(self, params: Arc<ParameterStore>) -> Result<GraphProcessor, GraphError> {
        let (sources, sinks) = self.count_io_nodes();
        if sources != 1 {
            return Err(GraphError::InvalidSourceCount(sources));
        }
        if sinks != 1 {
            return Err(GraphError::InvalidSinkCount(sinks));
        }

        let order = self.kahn_sort()?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "graph_sort: {} nodes in topo order [{}]",
            order.len(),
            order
                .iter()
                .map(|&i| self.nodes[i].kind.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let incoming: Vec<Vec<usize>> = self
            .nodes
            .iter()
            .map(|node| {
                node.incoming
                    .iter()
                    .map(|e| self.edges[e.0 as usize].from.0 as usize)
                    .collect()
            })
            .collect();

        let kinds = self.nodes.into_iter().map(|n| n.kind).collect();
        Ok(GraphProcessor::new(
            kinds,
            incoming,
            &order,
            self.sample_rate,
            params,
        ))
    }

    // --- Internal helpers ---

    fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add: {} node {id}", kind.name());
        self.nodes.push(NodeData::new(kind));
        id
    }

    fn node(&self, id: NodeId) -> Result<&NodeData, GraphError> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(GraphError::NodeNotFound(id))
    }

    fn push_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge { from, to, kind });
        self.nodes[from.0 as usize].outgoing.push(id);
        self.nodes[to.0 as usize].incoming.push(id);
        id
    }

    /// DFS reachability over forward edges: can `from` reach `to`?
    fn can_reach(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            let idx = current.0 as usize;
            if visited[idx] {
                continue;
            }
            visited[idx] = true;

            for edge_id in &self.nodes[idx].outgoing {
                let edge = &self.edges[edge_id.0 as usize];
                if edge.kind == EdgeKind::Forward {
                    stack.push(edge.to);
                }
            }
        }
        false
    }

    fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.find_edge(from, to).is_some()
    }

    fn find_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        let node = self.nodes.get(from.0 as usize)?;
        node.outgoing
            .iter()
            .copied()
            .find(|id| self.edges[id.0 as usize].to == to)
    }

    fn validate_connection(&self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        let from_node = self.node(from)?;
        let to_node = self.node(to)?;

        if matches!(to_node.kind, NodeKind::Source) {
            return Err(GraphError::InvalidConnection(format!(
                "cannot connect into Source node {from}->{to}"
            )));
        }
        if matches!(from_node.kind, NodeKind::Sink) {
            return Err(GraphError::InvalidConnection(format!(
                "cannot connect from Sink node {from}->{to}"
            )));
        }
        if matches!(from_node.kind, NodeKind::AnalysisTap(_)) {
            return Err(GraphError::InvalidConnection(format!(
                "analysis tap {from} has no output"
            )));
        }
        Ok(())
    }

    fn count_io_nodes(&self) -> (usize, usize) {
        let mut sources = 0;
        let mut sinks = 0;
        for node in &self.nodes {
            match node.kind {
                NodeKind::Source => sources += 1,
                NodeKind::Sink => sinks += 1,
                _ => {}
            }
        }
        (sources, sinks)
    }

    /// Kahn's algorithm over forward edges.
    ///
    /// Feedback edges are ignored here; the processor resolves them with its
    /// read-then-write delay phases.
    fn kahn_sort(&self) -> Result<Vec<usize>, GraphError> {
        let n = self.nodes.len();
        let mut in_degree = vec![0u32; n];

        for edge in &self.edges {
            if edge.kind == EdgeKind::Forward {
                in_degree[edge.to.0 as usize] += 1;
            }
        }

        // Reverse so nodes pop in declaration order.
        let mut queue: Vec<usize> = (0..n).rev().filter(|&i| in_degree[i] == 0).collect();
        let mut sorted = Vec::with_capacity(n);

        while let Some(idx) = queue.pop() {
            sorted.push(idx);
            for edge_id in &self.nodes[idx].outgoing {
                let edge = &self.edges[edge_id.0 as usize];
                if edge.kind != EdgeKind::Forward {
                    continue;
                }
                let to_idx = edge.to.0 as usize;
                in_degree[to_idx] -= 1;
                if in_degree[to_idx] == 0 {
                    queue.push(to_idx);
                }
            }
        }

        if sorted.len() != n {
            return Err(GraphError::CycleDetected);
        }
        Ok(sorted)
    }
}

impl std::fmt::Debug for SignalTopology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalTopology")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<ParameterStore> {
        Arc::new(ParameterStore::new())
    }

    #[test]
    fn karaoke_topology_has_one_feedback_edge() {
        let (topo, nodes, _tap) = SignalTopology::karaoke(48000.0).unwrap();
        assert_eq!(topo.node_count(), 6);
        assert_eq!(topo.edge_count(), 7);
        assert_eq!(
            topo.edge_kind(nodes.feedback_gain, nodes.delay),
            Some(EdgeKind::Feedback)
        );
        assert_eq!(
            topo.edge_kind(nodes.master_gain, nodes.delay),
            Some(EdgeKind::Forward)
        );
        assert_eq!(topo.edge_kind(nodes.delay, nodes.master_gain), None);
    }

    #[test]
    fn forward_cycle_rejected() {
        let mut topo = SignalTopology::new(48000.0);
        let a = topo.add_gain(GainRole::Master);
        let b = topo.add_gain(GainRole::Feedback);
        topo.connect(a, b).unwrap();
        assert_eq!(topo.connect(b, a), Err(GraphError::CycleDetected));
    }

    #[test]
    fn self_loop_rejected() {
        let mut topo = SignalTopology::new(48000.0);
        let a = topo.add_gain(GainRole::Master);
        assert_eq!(topo.connect(a, a), Err(GraphError::CycleDetected));
    }

    #[test]
    fn duplicate_edge_rejected() {
        let mut topo = SignalTopology::new(48000.0);
        let src = topo.add_source();
        let sink = topo.add_sink();
        topo.connect(src, sink).unwrap();
        assert_eq!(
            topo.connect(src, sink),
            Err(GraphError::DuplicateEdge(src, sink))
        );
    }

    #[test]
    fn feedback_must_target_delay() {
        let mut topo = SignalTopology::new(48000.0);
        let a = topo.add_gain(GainRole::Master);
        let b = topo.add_gain(GainRole::Feedback);
        topo.connect(a, b).unwrap();
        assert_eq!(
            topo.connect_feedback(b, a),
            Err(GraphError::FeedbackTargetNotDelay(a))
        );
    }

    #[test]
    fn only_one_feedback_edge() {
        let mut topo = SignalTopology::new(48000.0);
        let delay = topo.add_delay();
        let fb = topo.add_gain(GainRole::Feedback);
        let other = topo.add_gain(GainRole::Master);
        topo.connect(delay, fb).unwrap();
        topo.connect(delay, other).unwrap();
        topo.connect_feedback(fb, delay).unwrap();
        assert_eq!(
            topo.connect_feedback(other, delay),
            Err(GraphError::FeedbackAlreadyConnected)
        );
    }

    #[test]
    fn edges_into_source_or_out_of_sink_rejected() {
        let mut topo = SignalTopology::new(48000.0);
        let src = topo.add_source();
        let sink = topo.add_sink();
        let gain = topo.add_gain(GainRole::Master);
        assert!(matches!(
            topo.connect(gain, src),
            Err(GraphError::InvalidConnection(_))
        ));
        assert!(matches!(
            topo.connect(sink, gain),
            Err(GraphError::InvalidConnection(_))
        ));
    }

    #[test]
    fn tap_has_no_output() {
        let mut topo = SignalTopology::new(48000.0);
        let (tap, _reader) = topo.add_analysis_tap();
        let sink = topo.add_sink();
        assert!(matches!(
            topo.connect(tap, sink),
            Err(GraphError::InvalidConnection(_))
        ));
    }

    #[test]
    fn unknown_node_rejected() {
        let mut topo = SignalTopology::new(48000.0);
        let src = topo.add_source();
        assert_eq!(
            topo.connect(src, NodeId(42)),
            Err(GraphError::NodeNotFound(NodeId(42)))
        );
    }

    #[test]
    fn compile_requires_one_source_and_sink() {
        let mut topo = SignalTopology::new(48000.0);
        topo.add_sink();
        assert_eq!(
            topo.compile(store()).err(),
            Some(GraphError::InvalidSourceCount(0))
        );

        let mut topo = SignalTopology::new(48000.0);
        topo.add_source();
        topo.add_sink();
        topo.add_sink();
        assert_eq!(
            topo.compile(store()).err(),
            Some(GraphError::InvalidSinkCount(2))
        );
    }

    #[test]
    fn error_messages_name_nodes() {
        let msg = GraphError::FeedbackTargetNotDelay(NodeId(3)).to_string();
        assert!(msg.contains("NodeId(3)"));
    }
}
