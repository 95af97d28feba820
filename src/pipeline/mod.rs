//! Node-based processing graph.
//!
//! Images flow through typed nodes: Source (load image, load batch) →
//! Operator (backend plugins) → Terminal (save image, preview). Notes can be
//! placed anywhere and never execute.
//!
//! # Architecture
//!
//! ```text
//! [LoadImage] ──► [Operator] ──► [Operator] ──► [SaveImage]
//!                           └──────────────────► [Preview]
//! ```
//!
//! # Design
//!
//! - **Closed node set**: `NodeData` is a tagged union, one variant per `NodeType`.
//! - **Typed sockets**: edges join equal socket types, or `any` on either side.
//! - **Validated mutation**: rejected edits leave the graph untouched.
//! - **Deterministic order**: topological, ties broken by creation order.
//! - **Batch submission**: single-chain plans convert to a `BatchRunRequest`.

pub mod compiled_plan;
pub mod compiler;
pub mod error;
pub mod graph;
pub mod id;
pub mod node;
pub mod node_type;
pub mod plan;
pub mod port;
pub mod validation;

pub use compiled_plan::{ExecutionPlan, PlanStats};
pub use compiler::PipelineCompiler;
pub use error::{PipelineError, PipelineResult};
pub use graph::{Edge, NodeSnapshot, PipelineGraph, TopologySnapshot};
pub use id::{EdgeId, NodeId};
pub use node::{sockets, NodeData, NodeFactory, PipelineNode};
pub use node_type::NodeType;
pub use plan::{BatchRunRequest, PipelineStep, DEFAULT_BATCH_OUTPUT};
pub use port::{SocketDescriptor, SocketDirection, SocketType};
pub use validation::{validate, ValidationIssue};
