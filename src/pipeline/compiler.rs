use super::compiled_plan::{ExecutionPlan, PlanStats};
use super::error::{PipelineError, PipelineResult};
use super::graph::PipelineGraph;
use super::id::NodeId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Compiles a pipeline graph into an execution plan
pub struct PipelineCompiler;

impl PipelineCompiler {
    /// Compile a runnable graph into an execution plan.
    ///
    /// The graph is validated first; an invalid graph yields
    /// `PipelineError::NotRunnable` with every issue and no plan. Then
    /// bidirectional reachability identifies the nodes that participate in
    /// data flow (have both an upstream source AND a downstream terminal).
    pub fn compile(graph: &PipelineGraph) -> PipelineResult<ExecutionPlan> {
        let start_time = std::time::Instant::now();
        graph.check_runnable()?;

        let sources: Vec<NodeId> = graph
            .nodes()
            .iter()
            .filter(|n| n.node_type().is_source())
            .map(|n| n.id)
            .collect();
        let terminals: Vec<NodeId> = graph
            .nodes()
            .iter()
            .filter(|n| n.node_type().is_terminal())
            .map(|n| n.id)
            .collect();

        let (fwd_adj, bwd_adj) = Self::build_adjacency(graph);
        let fwd_reachable = Self::reachability(&sources, &fwd_adj);
        let bwd_reachable = Self::reachability(&terminals, &bwd_adj);

        let active: HashSet<NodeId> = fwd_reachable
            .intersection(&bwd_reachable)
            .copied()
            .collect();

        let order: Vec<NodeId> = Self::execution_order(graph)?
            .into_iter()
            .filter(|id| active.contains(id))
            .collect();

        let edges: Vec<(NodeId, NodeId)> = graph
            .edges()
            .iter()
            .filter(|e| active.contains(&e.from_node) && active.contains(&e.to_node))
            .map(|e| (e.from_node, e.to_node))
            .collect();

        let inactive_nodes: Vec<NodeId> = graph
            .nodes()
            .iter()
            .filter(|n| n.node_type().is_executable() && !active.contains(&n.id))
            .map(|n| n.id)
            .collect();

        let total_nodes = graph.len();
        let stats = PlanStats {
            total_nodes,
            active_nodes: order.len(),
            disconnected_nodes: total_nodes.saturating_sub(order.len()),
            source_nodes: sources.len(),
            terminal_nodes: terminals.len(),
            compile_time_us: start_time.elapsed().as_micros() as u64,
        };

        tracing::debug!(
            "Compiled pipeline: {} active of {} nodes in {}us",
            stats.active_nodes,
            stats.total_nodes,
            stats.compile_time_us
        );

        Ok(ExecutionPlan {
            order,
            edges,
            generation: graph.generation(),
            stats,
            inactive_nodes,
        })
    }

    /// Topological order of every executable node.
    ///
    /// Uses Kahn's algorithm with a min-heap so that among nodes whose
    /// dependencies are satisfied the earliest created runs first. Notes are
    /// excluded. Fails with `CycleDetected` if some node can never be ordered.
    pub fn execution_order(graph: &PipelineGraph) -> PipelineResult<Vec<NodeId>> {
        let executable: HashSet<NodeId> = graph
            .nodes()
            .iter()
            .filter(|n| n.node_type().is_executable())
            .map(|n| n.id)
            .collect();

        let mut in_degree: HashMap<NodeId, usize> = executable.iter().map(|&id| (id, 0)).collect();
        let mut adj: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for edge in graph.edges() {
            if executable.contains(&edge.from_node) && executable.contains(&edge.to_node) {
                adj.entry(edge.from_node).or_default().push(edge.to_node);
                *in_degree.entry(edge.to_node).or_default() += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<NodeId>> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&id, _)| Reverse(id))
            .collect();
        let mut result = Vec::with_capacity(executable.len());

        while let Some(Reverse(node)) = ready.pop() {
            result.push(node);
            for &next in adj.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(d) = in_degree.get_mut(&next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(Reverse(next));
                    }
                }
            }
        }

        if result.len() != executable.len() {
            return Err(PipelineError::CycleDetected);
        }
        Ok(result)
    }

    /// Build forward and backward adjacency lists
    fn build_adjacency(
        graph: &PipelineGraph,
    ) -> (HashMap<NodeId, Vec<NodeId>>, HashMap<NodeId, Vec<NodeId>>) {
        let mut fwd_adj: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut bwd_adj: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for edge in graph.edges() {
            fwd_adj.entry(edge.from_node).or_default().push(edge.to_node);
            bwd_adj.entry(edge.to_node).or_default().push(edge.from_node);
        }

        (fwd_adj, bwd_adj)
    }

    /// Nodes reachable from `roots` (roots included) using DFS
    fn reachability(roots: &[NodeId], adj: &HashMap<NodeId, Vec<NodeId>>) -> HashSet<NodeId> {
        let mut reachable: HashSet<NodeId> = roots.iter().copied().collect();
        let mut stack: Vec<NodeId> = roots.to_vec();

        while let Some(node) = stack.pop() {
            for &neighbor in adj.get(&node).into_iter().flatten() {
                if reachable.insert(neighbor) {
                    stack.push(neighbor);
                }
            }
        }

        reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::node::sockets::{IMAGE, INPUT, OUTPUT};
    use crate::pipeline::node_type::NodeType;
    use crate::plugins::PluginSpec;

    fn op(name: &str) -> PluginSpec {
        PluginSpec::new(name, name, "Filters")
    }

    #[test]
    fn test_compile_linear() {
        let mut graph = PipelineGraph::new();
        let save = graph.add_node(NodeType::SaveImage).unwrap();
        let b = graph.add_operator(&op("b"));
        let a = graph.add_operator(&op("a"));
        let load = graph.add_node(NodeType::LoadImage).unwrap();
        graph.connect(load, IMAGE, a, INPUT).unwrap();
        graph.connect(a, OUTPUT, b, INPUT).unwrap();
        graph.connect(b, OUTPUT, save, IMAGE).unwrap();

        let plan = PipelineCompiler::compile(&graph).unwrap();
        assert_eq!(plan.order, vec![load, a, b, save]);
        assert_eq!(plan.stats.active_nodes, 4);
        assert_eq!(plan.stats.source_nodes, 1);
        assert!(plan.is_current(&graph));
        assert_eq!(plan.predecessors(save).collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_ties_follow_creation_order() {
        let mut graph = PipelineGraph::new();
        let load2 = graph.add_node(NodeType::LoadImage).unwrap();
        let load1 = graph.add_node(NodeType::LoadImage).unwrap();
        let p2 = graph.add_node(NodeType::Preview).unwrap();
        let p1 = graph.add_node(NodeType::Preview).unwrap();
        graph.connect(load1, IMAGE, p1, IMAGE).unwrap();
        graph.connect(load2, IMAGE, p2, IMAGE).unwrap();

        let order = PipelineCompiler::execution_order(&graph).unwrap();
        assert_eq!(order, vec![load2, load1, p2, p1]);
    }

    #[test]
    fn test_inactive_branch_excluded() {
        let mut graph = PipelineGraph::new();
        let load = graph.add_node(NodeType::LoadImage).unwrap();
        let dead_end = graph.add_operator(&op("a"));
        let preview = graph.add_node(NodeType::Preview).unwrap();
        let note = graph.add_node(NodeType::MarkdownNote).unwrap();
        graph.connect(load, IMAGE, dead_end, INPUT).unwrap();
        graph.connect(load, IMAGE, preview, IMAGE).unwrap();

        let plan = PipelineCompiler::compile(&graph).unwrap();
        assert_eq!(plan.order, vec![load, preview]);
        assert_eq!(plan.inactive_nodes, vec![dead_end]);
        assert!(plan.position(note).is_none());
        assert_eq!(plan.stats.disconnected_nodes, 2);
    }

    #[test]
    fn test_compile_rejects_invalid_graph() {
        let mut graph = PipelineGraph::new();
        graph.add_operator(&op("a"));
        let err = PipelineCompiler::compile(&graph).unwrap_err();
        match err {
            PipelineError::NotRunnable(issues) => assert_eq!(issues.len(), 2),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_stale_plan_detected() {
        let mut graph = PipelineGraph::new();
        let load = graph.add_node(NodeType::LoadImage).unwrap();
        let preview = graph.add_node(NodeType::Preview).unwrap();
        graph.connect(load, IMAGE, preview, IMAGE).unwrap();
        let plan = PipelineCompiler::compile(&graph).unwrap();

        graph.add_node(NodeType::MarkdownNote).unwrap();
        assert!(!plan.is_current(&graph));
    }
}
