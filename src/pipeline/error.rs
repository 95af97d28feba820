//! Pipeline-specific error types.

use crate::pipeline::id::{EdgeId, NodeId};
use crate::pipeline::node_type::NodeType;
use crate::pipeline::port::SocketType;
use crate::pipeline::validation::ValidationIssue;
use thiserror::Error;

/// Errors that can occur within the pipeline graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("Unknown edge {0:?}")]
    UnknownEdge(EdgeId),

    #[error("Node {node_id:?} has no {direction} socket '{socket}'")]
    UnknownSocket {
        node_id: NodeId,
        socket: String,
        direction: &'static str,
    },

    #[error("Node id {0:?} appears more than once")]
    DuplicateNode(NodeId),

    #[error("Edge id {0:?} appears more than once")]
    DuplicateEdge(EdgeId),

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Cannot connect {from} output to {to} input")]
    IncompatibleSockets { from: SocketType, to: SocketType },

    #[error("Input '{socket}' of node {node_id:?} is already connected")]
    SocketOccupied { node_id: NodeId, socket: String },

    #[error("Cycle detected in pipeline graph")]
    CycleDetected,

    #[error("Node {node_id:?} is not a {expected} node")]
    WrongNodeType { node_id: NodeId, expected: NodeType },

    #[error("Node {node_id:?} has invalid parameters: {message}")]
    InvalidParams { node_id: NodeId, message: String },

    #[error("Node {node_id:?} references unknown plugin '{plugin}'")]
    UnresolvedPlugin { node_id: NodeId, plugin: String },

    #[error("Node {0:?} has no input bound")]
    MissingSource(NodeId),

    #[error("Pipeline is not runnable: {}", summarize(.0))]
    NotRunnable(Vec<ValidationIssue>),

    #[error("Unsupported pipeline: {0}")]
    Unsupported(String),
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
