//! Runnable check for pipeline graphs.
//!
//! A graph is runnable when every required input has exactly one incoming
//! edge, every edge joins existing compatible sockets, every resolved
//! operator's parameters fit its plugin spec, the graph is acyclic and at
//! least one terminal (`save_image` or `preview`) exists. Validation
//! collects every problem rather than stopping at the first.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::Serialize;

use crate::error::NeuroPixelError;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::graph::PipelineGraph;
use crate::pipeline::id::{EdgeId, NodeId};
use crate::pipeline::node::NodeData;
use crate::pipeline::port::{SocketDirection, SocketType};
use crate::plugins::params::resolve_params;

/// One reason a graph is not runnable
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// A required input has no incoming edge
    MissingInput { node_id: NodeId, socket: String },
    /// A required input has more than one incoming edge
    MultipleInputs {
        node_id: NodeId,
        socket: String,
        count: usize,
    },
    /// An edge references a node or socket that does not exist
    DanglingEdge { edge_id: EdgeId, reason: String },
    /// An edge joins sockets whose types do not match
    IncompatibleEdge {
        edge_id: EdgeId,
        from: SocketType,
        to: SocketType,
    },
    /// An operator's parameters do not fit its plugin spec
    InvalidParams {
        node_id: NodeId,
        name: String,
        message: String,
    },
    /// These nodes lie on or behind a cycle
    Cycle { nodes: Vec<NodeId> },
    /// No `save_image` or `preview` node exists
    NoTerminal,
}

impl ValidationIssue {
    /// The node the issue is attached to, if it concerns a single node
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            ValidationIssue::MissingInput { node_id, .. }
            | ValidationIssue::MultipleInputs { node_id, .. }
            | ValidationIssue::InvalidParams { node_id, .. } => Some(*node_id),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingInput { node_id, socket } => {
                write!(f, "input '{}' of node {} is not connected", socket, node_id)
            }
            ValidationIssue::MultipleInputs {
                node_id,
                socket,
                count,
            } => write!(
                f,
                "input '{}' of node {} has {} incoming edges",
                socket, node_id, count
            ),
            ValidationIssue::DanglingEdge { edge_id, reason } => {
                write!(f, "edge {} is dangling: {}", edge_id, reason)
            }
            ValidationIssue::IncompatibleEdge { edge_id, from, to } => {
                write!(f, "edge {} connects {} output to {} input", edge_id, from, to)
            }
            ValidationIssue::InvalidParams {
                node_id,
                name,
                message,
            } => write!(f, "parameter '{}' of node {}: {}", name, node_id, message),
            ValidationIssue::Cycle { nodes } => {
                let ids: Vec<String> = nodes.iter().map(|n| n.to_string()).collect();
                write!(f, "cycle through nodes {}", ids.join(", "))
            }
            ValidationIssue::NoTerminal => {
                write!(f, "graph has no Save Image or Preview node")
            }
        }
    }
}

/// Collect every issue that keeps `graph` from running.
pub fn validate(graph: &PipelineGraph) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut input_counts: HashMap<(NodeId, &str), usize> = HashMap::new();

    for edge in graph.edges() {
        let from = graph
            .node(edge.from_node)
            .and_then(|n| n.socket(&edge.from_socket, SocketDirection::Output));
        let to = graph
            .node(edge.to_node)
            .and_then(|n| n.socket(&edge.to_socket, SocketDirection::Input));

        match (from, to) {
            (Some(from), Some(to)) => {
                if !from.socket_type.is_compatible_with(to.socket_type) {
                    issues.push(ValidationIssue::IncompatibleEdge {
                        edge_id: edge.id,
                        from: from.socket_type,
                        to: to.socket_type,
                    });
                }
                *input_counts
                    .entry((edge.to_node, edge.to_socket.as_str()))
                    .or_default() += 1;
            }
            (None, _) => issues.push(ValidationIssue::DanglingEdge {
                edge_id: edge.id,
                reason: format!("no output '{}' on node {}", edge.from_socket, edge.from_node),
            }),
            (_, None) => issues.push(ValidationIssue::DanglingEdge {
                edge_id: edge.id,
                reason: format!("no input '{}' on node {}", edge.to_socket, edge.to_node),
            }),
        }
    }

    for node in graph.nodes() {
        if !node.node_type().is_executable() {
            continue;
        }
        for socket in node.inputs.iter().filter(|s| s.required) {
            let count = input_counts
                .get(&(node.id, socket.name.as_str()))
                .copied()
                .unwrap_or(0);
            match count {
                1 => {}
                0 => issues.push(ValidationIssue::MissingInput {
                    node_id: node.id,
                    socket: socket.name.clone(),
                }),
                n => issues.push(ValidationIssue::MultipleInputs {
                    node_id: node.id,
                    socket: socket.name.clone(),
                    count: n,
                }),
            }
        }
    }

    for node in graph.nodes() {
        if let NodeData::Operator {
            params,
            spec: Some(spec),
            ..
        } = &node.data
        {
            if let Err(err) = resolve_params(spec, params) {
                let (name, message) = match err {
                    NeuroPixelError::InvalidParam { name, message } => (name, message),
                    other => (String::new(), other.to_string()),
                };
                issues.push(ValidationIssue::InvalidParams {
                    node_id: node.id,
                    name,
                    message,
                });
            }
        }
    }

    let cyclic = nodes_in_cycles(graph);
    if !cyclic.is_empty() {
        issues.push(ValidationIssue::Cycle { nodes: cyclic });
    }

    if !graph.nodes().iter().any(|n| n.node_type().is_terminal()) {
        issues.push(ValidationIssue::NoTerminal);
    }

    issues
}

/// Nodes Kahn's algorithm cannot order, in id order. Empty for a DAG.
fn nodes_in_cycles(graph: &PipelineGraph) -> Vec<NodeId> {
    let mut in_degree: HashMap<NodeId, usize> = graph.nodes().iter().map(|n| (n.id, 0)).collect();
    for edge in graph.edges() {
        if in_degree.contains_key(&edge.from_node) {
            if let Some(d) = in_degree.get_mut(&edge.to_node) {
                *d += 1;
            }
        }
    }

    let mut queue: VecDeque<NodeId> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&id, _)| id)
        .collect();

    while let Some(node) = queue.pop_front() {
        for edge in graph.outgoing(node) {
            if let Some(d) = in_degree.get_mut(&edge.to_node) {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(edge.to_node);
                }
            }
        }
        in_degree.remove(&node);
    }

    let mut remaining: Vec<NodeId> = in_degree.into_keys().collect();
    remaining.sort();
    remaining
}

impl PipelineGraph {
    /// `Ok` when the graph is runnable, otherwise every issue found
    pub fn check_runnable(&self) -> PipelineResult<()> {
        let issues = validate(self);
        if issues.is_empty() {
            tracing::debug!("Pipeline graph is runnable ({} nodes)", self.len());
            Ok(())
        } else {
            tracing::info!("Pipeline graph is not runnable: {} issue(s)", issues.len());
            Err(PipelineError::NotRunnable(issues))
        }
    }

    pub fn is_runnable(&self) -> bool {
        validate(self).is_empty()
    }
}
