use crate::pipeline::graph::PipelineGraph;
use crate::pipeline::id::NodeId;

/// Compiled execution plan for a pipeline graph.
/// Contains only active nodes (nodes on a path from a source to a terminal).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionPlan {
    /// Active nodes in topological order, ties broken by creation order
    pub order: Vec<NodeId>,

    /// Edges between active nodes (from, to)
    pub edges: Vec<(NodeId, NodeId)>,

    /// Graph generation the plan was compiled from
    pub generation: u64,

    /// Compilation statistics
    pub stats: PlanStats,

    /// Executable nodes that do not feed any terminal
    pub inactive_nodes: Vec<NodeId>,
}

/// Statistics about the compiled plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanStats {
    /// Total number of nodes in the graph (notes included)
    pub total_nodes: usize,

    /// Number of active nodes in the execution plan
    pub active_nodes: usize,

    /// Number of nodes left out of the plan
    pub disconnected_nodes: usize,

    /// Number of source nodes (no inputs)
    pub source_nodes: usize,

    /// Number of terminal nodes
    pub terminal_nodes: usize,

    /// Compilation time in microseconds
    pub compile_time_us: u64,
}

impl ExecutionPlan {
    /// Check if the plan has any active nodes
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether the graph has changed since this plan was compiled
    pub fn is_current(&self, graph: &PipelineGraph) -> bool {
        self.generation == graph.generation()
    }

    /// Position of `node` in the execution order
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.order.iter().position(|&n| n == node)
    }

    /// Direct predecessors of `node` within the plan
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |(_, to)| *to == node)
            .map(|(from, _)| *from)
    }
}
