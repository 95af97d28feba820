//! Identity types for the pipeline graph.
//!
//! Both IDs are newtypes over `u32` handed out from monotonic counters, so
//! comparing two node IDs compares their creation order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node in a `PipelineGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of an edge in a `PipelineGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u32);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        assert!(NodeId(1) < NodeId(2));
        assert_eq!(NodeId::default(), NodeId(0));
        assert_eq!(NodeId(42).to_string(), "#42");
        assert_eq!(format!("{:?}", NodeId(42)), "NodeId(42)");
    }

    #[test]
    fn test_edge_id() {
        let id = EdgeId(5);
        assert_eq!(id.to_string(), "e5");
        assert_eq!(format!("{:?}", id), "EdgeId(5)");
    }

    #[test]
    fn test_serde_transparent() {
        assert_eq!(serde_json::to_string(&NodeId(3)).unwrap(), "3");
        let id: EdgeId = serde_json::from_str("7").unwrap();
        assert_eq!(id, EdgeId(7));
    }
}
