//! The editable pipeline graph.
//!
//! Nodes are kept in creation order and addressed by [`NodeId`]. Edges
//! reference sockets by name. Every mutation either fully succeeds or leaves
//! the graph untouched, and bumps a generation counter that compiled plans
//! use to detect staleness.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::{EdgeId, NodeId};
use crate::pipeline::node::{NodeData, NodeFactory, PipelineNode};
use crate::pipeline::node_type::NodeType;
use crate::pipeline::port::{SocketDescriptor, SocketDirection};
use crate::plugins::params::{resolve_params, ParamMap};
use crate::plugins::{PluginCatalog, PluginSpec};
use crate::types::ImageId;

/// A directed connection from an output socket to an input socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from_node: NodeId,
    pub from_socket: String,
    pub to_node: NodeId,
    pub to_socket: String,
}

/// Snapshot of a single pipeline node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub label: String,
    pub node_type: NodeType,
    pub inputs: Vec<SocketDescriptor>,
    pub outputs: Vec<SocketDescriptor>,
}

/// Complete topology snapshot of the pipeline graph.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologySnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<Edge>,
    pub generation: u64,
}

/// Node-based processing graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineGraph {
    nodes: Vec<PipelineNode>,
    edges: Vec<Edge>,
    #[serde(default)]
    next_node_id: u32,
    #[serde(default)]
    next_edge_id: u32,
    #[serde(skip)]
    generation: u64,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a saved graph, re-deriving sockets and id counters.
    ///
    /// Files that reuse a node or edge id are rejected.
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        let mut graph: PipelineGraph = serde_json::from_str(json)
            .map_err(|e| PipelineError::Unsupported(format!("malformed graph file: {}", e)))?;
        graph.normalize()?;
        Ok(graph)
    }

    pub fn to_json(&self) -> PipelineResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Unsupported(format!("cannot serialize graph: {}", e)))
    }

    fn normalize(&mut self) -> PipelineResult<()> {
        self.nodes.sort_by_key(|n| n.id);
        if let Some(pair) = self.nodes.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(PipelineError::DuplicateNode(pair[0].id));
        }
        let mut edge_ids: Vec<EdgeId> = self.edges.iter().map(|e| e.id).collect();
        edge_ids.sort();
        if let Some(pair) = edge_ids.windows(2).find(|w| w[0] == w[1]) {
            return Err(PipelineError::DuplicateEdge(pair[0]));
        }

        for node in &mut self.nodes {
            node.refresh_sockets();
        }
        let max_node = self.nodes.iter().map(|n| n.id.0 + 1).max().unwrap_or(0);
        let max_edge = self.edges.iter().map(|e| e.id.0 + 1).max().unwrap_or(0);
        self.next_node_id = self.next_node_id.max(max_node);
        self.next_edge_id = self.next_edge_id.max(max_edge);
        Ok(())
    }

    // ── Queries ──

    /// Nodes in creation order
    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&PipelineNode> {
        self.nodes
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .map(|idx| &self.nodes[idx])
    }

    fn node_mut(&mut self, id: NodeId) -> PipelineResult<&mut PipelineNode> {
        match self.nodes.binary_search_by_key(&id, |n| n.id) {
            Ok(idx) => Ok(&mut self.nodes[idx]),
            Err(_) => Err(PipelineError::UnknownNode(id)),
        }
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn incoming(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.to_node == node)
    }

    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.from_node == node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Incremented by every successful mutation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn topology(&self) -> TopologySnapshot {
        TopologySnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|n| NodeSnapshot {
                    id: n.id,
                    label: n.label.clone(),
                    node_type: n.node_type(),
                    inputs: n.inputs.clone(),
                    outputs: n.outputs.clone(),
                })
                .collect(),
            edges: self.edges.clone(),
            generation: self.generation,
        }
    }

    // ── Node mutation ──

    fn allocate_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn insert_node(&mut self, node: PipelineNode) -> NodeId {
        let id = node.id;
        tracing::info!("Added node {:?} of type {:?}", id, node.node_type());
        self.nodes.push(node);
        self.generation += 1;
        id
    }

    /// Add a non-operator node with default data.
    pub fn add_node(&mut self, node_type: NodeType) -> PipelineResult<NodeId> {
        let node = NodeFactory::create(NodeId(self.next_node_id), node_type)?;
        self.allocate_node_id();
        Ok(self.insert_node(node))
    }

    /// Add an operator node for `spec`.
    pub fn add_operator(&mut self, spec: &PluginSpec) -> NodeId {
        let id = self.allocate_node_id();
        self.insert_node(NodeFactory::operator(id, spec))
    }

    /// Add a node from explicit data.
    pub fn add_node_data(&mut self, data: NodeData) -> NodeId {
        let id = self.allocate_node_id();
        self.insert_node(NodeFactory::from_data(id, data))
    }

    /// Remove a node together with every edge attached to it.
    pub fn remove_node(&mut self, id: NodeId) -> PipelineResult<PipelineNode> {
        let idx = self
            .nodes
            .binary_search_by_key(&id, |n| n.id)
            .map_err(|_| PipelineError::UnknownNode(id))?;

        let before = self.edges.len();
        self.edges.retain(|e| e.from_node != id && e.to_node != id);
        let dropped = before - self.edges.len();

        let node = self.nodes.remove(idx);
        self.generation += 1;
        tracing::info!("Removed node {:?} and {} attached edge(s)", id, dropped);
        Ok(node)
    }

    // ── Edge mutation ──

    /// Connect `from_socket` of `from` to `to_socket` of `to`.
    ///
    /// Rejected without mutation when either endpoint is missing, the
    /// sockets are incompatible, the input already has an edge, or the
    /// edge would close a cycle.
    pub fn connect(
        &mut self,
        from: NodeId,
        from_socket: &str,
        to: NodeId,
        to_socket: &str,
    ) -> PipelineResult<EdgeId> {
        let result = self.check_connect(from, from_socket, to, to_socket);
        if let Err(err) = result {
            tracing::warn!("Rejected edge {:?}.{} -> {:?}.{}: {}", from, from_socket, to, to_socket, err);
            return Err(err);
        }

        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;
        self.edges.push(Edge {
            id,
            from_node: from,
            from_socket: from_socket.to_string(),
            to_node: to,
            to_socket: to_socket.to_string(),
        });
        self.generation += 1;

        tracing::info!(
            "Added edge {:?}: {:?}.{} -> {:?}.{}",
            id,
            from,
            from_socket,
            to,
            to_socket
        );
        Ok(id)
    }

    fn check_connect(
        &self,
        from: NodeId,
        from_socket: &str,
        to: NodeId,
        to_socket: &str,
    ) -> PipelineResult<()> {
        let source = self.node(from).ok_or(PipelineError::UnknownNode(from))?;
        let target = self.node(to).ok_or(PipelineError::UnknownNode(to))?;

        if from == to {
            return Err(PipelineError::InvalidEdge(
                "Cannot connect node to itself".to_string(),
            ));
        }

        let output = source
            .socket(from_socket, SocketDirection::Output)
            .ok_or_else(|| PipelineError::UnknownSocket {
                node_id: from,
                socket: from_socket.to_string(),
                direction: "output",
            })?;
        let input = target
            .socket(to_socket, SocketDirection::Input)
            .ok_or_else(|| PipelineError::UnknownSocket {
                node_id: to,
                socket: to_socket.to_string(),
                direction: "input",
            })?;

        if !output.socket_type.is_compatible_with(input.socket_type) {
            return Err(PipelineError::IncompatibleSockets {
                from: output.socket_type,
                to: input.socket_type,
            });
        }

        if self
            .incoming(to)
            .any(|e| e.to_socket == to_socket)
        {
            return Err(PipelineError::SocketOccupied {
                node_id: to,
                socket: to_socket.to_string(),
            });
        }

        if self.would_create_cycle(from, to) {
            return Err(PipelineError::CycleDetected);
        }

        Ok(())
    }

    /// Remove an edge.
    pub fn disconnect(&mut self, id: EdgeId) -> PipelineResult<Edge> {
        let idx = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or(PipelineError::UnknownEdge(id))?;
        let edge = self.edges.remove(idx);
        self.generation += 1;
        tracing::info!("Removed edge {:?}", id);
        Ok(edge)
    }

    /// Whether adding `from -> to` would close a cycle.
    pub fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        // If `to` can reach `from` through existing edges, adding from->to creates a cycle.
        let mut visited = std::collections::HashSet::new();
        let mut stack = vec![to];

        while let Some(current) = stack.pop() {
            if current == from {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.extend(self.outgoing(current).map(|e| e.to_node));
        }
        false
    }

    // ── Node data ──

    /// Replace an operator's parameters after validating them against its spec.
    ///
    /// Absent parameters take their defaults.
    pub fn set_operator_params(&mut self, id: NodeId, new_params: &ParamMap) -> PipelineResult<()> {
        let node = self.node_mut(id)?;
        match &mut node.data {
            NodeData::Operator {
                params,
                spec: Some(spec),
                ..
            } => {
                let resolved =
                    resolve_params(spec, new_params).map_err(|e| PipelineError::InvalidParams {
                        node_id: id,
                        message: e.to_string(),
                    })?;
                *params = resolved;
            }
            NodeData::Operator {
                plugin_name,
                spec: None,
                ..
            } => {
                return Err(PipelineError::UnresolvedPlugin {
                    node_id: id,
                    plugin: plugin_name.clone(),
                })
            }
            _ => {
                return Err(PipelineError::WrongNodeType {
                    node_id: id,
                    expected: NodeType::Operator,
                })
            }
        }
        self.generation += 1;
        tracing::debug!("Updated parameters of node {:?}", id);
        Ok(())
    }

    /// Point a `load_image` node at an image in the session.
    pub fn bind_image(&mut self, id: NodeId, image: ImageId) -> PipelineResult<()> {
        self.edit_data(id, NodeType::LoadImage, |data| {
            if let NodeData::LoadImage { image_id } = data {
                *image_id = Some(image);
            }
        })
    }

    /// Set the folder a `load_batch` node reads from.
    pub fn set_batch_folder(&mut self, id: NodeId, path: PathBuf) -> PipelineResult<()> {
        self.edit_data(id, NodeType::LoadBatch, |data| {
            if let NodeData::LoadBatch { folder } = data {
                *folder = Some(path);
            }
        })
    }

    /// Set the folder a `save_image` node writes to.
    pub fn set_output_folder(&mut self, id: NodeId, path: PathBuf) -> PipelineResult<()> {
        self.edit_data(id, NodeType::SaveImage, |data| {
            if let NodeData::SaveImage { output_folder } = data {
                *output_folder = Some(path);
            }
        })
    }

    pub fn set_note_text(&mut self, id: NodeId, new_text: impl Into<String>) -> PipelineResult<()> {
        let new_text = new_text.into();
        self.edit_data(id, NodeType::MarkdownNote, |data| {
            if let NodeData::MarkdownNote { text } = data {
                *text = new_text;
            }
        })
    }

    fn edit_data(
        &mut self,
        id: NodeId,
        expected: NodeType,
        edit: impl FnOnce(&mut NodeData),
    ) -> PipelineResult<()> {
        let node = self.node_mut(id)?;
        if node.node_type() != expected {
            return Err(PipelineError::WrongNodeType {
                node_id: id,
                expected,
            });
        }
        edit(&mut node.data);
        self.generation += 1;
        Ok(())
    }

    /// Attach catalog specs to operator nodes and re-derive their sockets.
    ///
    /// Returns the operators whose plugin is not in the catalog. The
    /// generation only moves when a spec or label actually changed.
    pub fn resolve_specs(&mut self, catalog: &PluginCatalog) -> Vec<NodeId> {
        let mut unresolved = Vec::new();
        let mut changed = false;
        for node in &mut self.nodes {
            let NodeData::Operator {
                plugin_name, spec, ..
            } = &mut node.data
            else {
                continue;
            };
            match catalog.get(plugin_name) {
                Some(found) => {
                    if node.label == *plugin_name && node.label != found.display_name {
                        node.label = found.display_name.clone();
                        changed = true;
                    }
                    if spec.as_ref() != Some(found) {
                        *spec = Some(found.clone());
                        node.refresh_sockets();
                        changed = true;
                    }
                }
                None => {
                    tracing::warn!("Operator {:?} uses unknown plugin '{}'", node.id, plugin_name);
                    unresolved.push(node.id);
                }
            }
        }
        if changed {
            self.generation += 1;
        }
        unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::node::sockets::{IMAGE, INPUT, OUTPUT};
    use crate::plugins::{DataKind, PluginParam, ParamValue};

    fn blur() -> PluginSpec {
        PluginSpec::new("gaussian_blur", "Gaussian Blur", "Filters")
            .with_param(PluginParam::float("sigma", 1.0, 0.1, 10.0))
    }

    fn threshold() -> PluginSpec {
        PluginSpec::new("otsu_threshold", "Otsu Threshold", "Segmentation")
            .with_io(DataKind::Image, DataKind::Mask)
    }

    #[test]
    fn test_ids_follow_creation_order() {
        let mut graph = PipelineGraph::new();
        let a = graph.add_node(NodeType::LoadImage).unwrap();
        let b = graph.add_operator(&blur());
        assert!(a < b);
        assert_eq!(graph.nodes()[1].id, b);
    }

    #[test]
    fn test_connect_compatible() {
        let mut graph = PipelineGraph::new();
        let load = graph.add_node(NodeType::LoadImage).unwrap();
        let op = graph.add_operator(&blur());
        let edge = graph.connect(load, IMAGE, op, INPUT).unwrap();
        assert_eq!(graph.edge(edge).unwrap().to_node, op);
    }

    #[test]
    fn test_connect_incompatible_no_mutation() {
        let mut graph = PipelineGraph::new();
        let op = graph.add_operator(&threshold());
        let save = graph.add_node(NodeType::SaveImage).unwrap();
        let generation = graph.generation();

        let err = graph.connect(op, OUTPUT, save, IMAGE).unwrap_err();
        assert!(matches!(err, PipelineError::IncompatibleSockets { .. }));
        assert!(graph.edges().is_empty());
        assert_eq!(graph.generation(), generation);
    }

    #[test]
    fn test_mask_into_preview_wildcard() {
        let mut graph = PipelineGraph::new();
        let op = graph.add_operator(&threshold());
        let preview = graph.add_node(NodeType::Preview).unwrap();
        assert!(graph.connect(op, OUTPUT, preview, IMAGE).is_ok());
    }

    #[test]
    fn test_connect_rejects_cycle_and_self_loop() {
        let mut graph = PipelineGraph::new();
        let a = graph.add_operator(&blur());
        let b = graph.add_operator(&blur());
        graph.connect(a, OUTPUT, b, INPUT).unwrap();

        assert_eq!(graph.connect(b, OUTPUT, a, INPUT), Err(PipelineError::CycleDetected));
        assert!(matches!(
            graph.connect(a, OUTPUT, a, INPUT),
            Err(PipelineError::InvalidEdge(_))
        ));
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_connect_rejects_occupied_input() {
        let mut graph = PipelineGraph::new();
        let a = graph.add_node(NodeType::LoadImage).unwrap();
        let b = graph.add_node(NodeType::LoadImage).unwrap();
        let op = graph.add_operator(&blur());
        graph.connect(a, IMAGE, op, INPUT).unwrap();
        assert!(matches!(
            graph.connect(b, IMAGE, op, INPUT),
            Err(PipelineError::SocketOccupied { .. })
        ));
    }

    #[test]
    fn test_connect_unknown_socket_and_node() {
        let mut graph = PipelineGraph::new();
        let a = graph.add_node(NodeType::LoadImage).unwrap();
        let op = graph.add_operator(&blur());
        assert!(matches!(
            graph.connect(a, "nope", op, INPUT),
            Err(PipelineError::UnknownSocket { .. })
        ));
        assert_eq!(
            graph.connect(a, IMAGE, NodeId(99), INPUT),
            Err(PipelineError::UnknownNode(NodeId(99)))
        );
    }

    #[test]
    fn test_remove_node_drops_edges() {
        let mut graph = PipelineGraph::new();
        let a = graph.add_node(NodeType::LoadImage).unwrap();
        let op = graph.add_operator(&blur());
        let save = graph.add_node(NodeType::SaveImage).unwrap();
        graph.connect(a, IMAGE, op, INPUT).unwrap();
        graph.connect(op, OUTPUT, save, IMAGE).unwrap();

        graph.remove_node(op).unwrap();
        assert!(graph.edges().is_empty());
        assert_eq!(graph.len(), 2);
        assert!(graph.remove_node(op).is_err());

        // Ids are never reused
        let next = graph.add_node(NodeType::Preview).unwrap();
        assert!(next > save);
    }

    #[test]
    fn test_disconnect() {
        let mut graph = PipelineGraph::new();
        let a = graph.add_node(NodeType::LoadImage).unwrap();
        let op = graph.add_operator(&blur());
        let edge = graph.connect(a, IMAGE, op, INPUT).unwrap();
        assert_eq!(graph.disconnect(edge).unwrap().id, edge);
        assert_eq!(graph.disconnect(edge), Err(PipelineError::UnknownEdge(edge)));
    }

    #[test]
    fn test_set_operator_params() {
        let mut graph = PipelineGraph::new();
        let op = graph.add_operator(&blur());
        let mut params = ParamMap::new();
        params.insert("sigma".into(), ParamValue::Float(3.0));
        graph.set_operator_params(op, &params).unwrap();

        params.insert("sigma".into(), ParamValue::Float(50.0));
        assert!(matches!(
            graph.set_operator_params(op, &params),
            Err(PipelineError::InvalidParams { .. })
        ));
        match &graph.node(op).unwrap().data {
            NodeData::Operator { params, .. } => assert_eq!(params["sigma"], ParamValue::Float(3.0)),
            other => panic!("unexpected data {:?}", other),
        }
    }

    #[test]
    fn test_data_setters_check_type() {
        let mut graph = PipelineGraph::new();
        let load = graph.add_node(NodeType::LoadImage).unwrap();
        let note = graph.add_node(NodeType::MarkdownNote).unwrap();

        graph.bind_image(load, ImageId::from("abc")).unwrap();
        graph.set_note_text(note, "# Notes").unwrap();
        assert!(matches!(
            graph.set_output_folder(load, PathBuf::from("/tmp/out")),
            Err(PipelineError::WrongNodeType { .. })
        ));
    }

    #[test]
    fn test_json_round_trip_resolves_specs() {
        let mut graph = PipelineGraph::new();
        let load = graph.add_node(NodeType::LoadImage).unwrap();
        let op = graph.add_operator(&threshold());
        graph.connect(load, IMAGE, op, INPUT).unwrap();

        let json = graph.to_json().unwrap();
        let mut restored = PipelineGraph::from_json(&json).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.edges().len(), 1);

        let catalog = PluginCatalog::from_specs(vec![threshold()]);
        assert!(restored.resolve_specs(&catalog).is_empty());

        let next = restored.add_node(NodeType::Preview).unwrap();
        assert_eq!(next, NodeId(2));
    }

    #[test]
    fn test_resolve_specs_keeps_generation_when_unchanged() {
        let mut graph = PipelineGraph::new();
        graph.add_operator(&threshold());
        let catalog = PluginCatalog::from_specs(vec![threshold()]);

        let generation = graph.generation();
        assert!(graph.resolve_specs(&catalog).is_empty());
        assert_eq!(graph.generation(), generation);

        let updated = threshold().with_io(DataKind::Image, DataKind::Image);
        graph.resolve_specs(&PluginCatalog::from_specs(vec![updated]));
        assert!(graph.generation() > generation);
    }

    #[test]
    fn test_from_json_rejects_duplicate_ids() {
        let node = r#"{"id": 3, "label": "Preview", "icon": "visibility", "data": {"type": "preview"}}"#;
        let json = format!(r#"{{"nodes": [{node}, {node}], "edges": []}}"#);
        assert_eq!(
            PipelineGraph::from_json(&json).unwrap_err(),
            PipelineError::DuplicateNode(NodeId(3))
        );

        let edge = r#"{"id": 0, "from_node": 0, "from_socket": "image", "to_node": 1, "to_socket": "image"}"#;
        let json = format!(
            r#"{{"nodes": [
                {{"id": 0, "label": "Load", "icon": "image", "data": {{"type": "load_image"}}}},
                {{"id": 1, "label": "Preview", "icon": "visibility", "data": {{"type": "preview"}}}}
            ], "edges": [{edge}, {edge}]}}"#
        );
        assert_eq!(
            PipelineGraph::from_json(&json).unwrap_err(),
            PipelineError::DuplicateEdge(EdgeId(0))
        );
    }

    #[test]
    fn test_topology_snapshot() {
        let mut graph = PipelineGraph::new();
        graph.add_node(NodeType::LoadImage).unwrap();
        graph.add_node(NodeType::Preview).unwrap();
        let topo = graph.topology();
        assert_eq!(topo.nodes.len(), 2);
        assert_eq!(topo.nodes[1].node_type, NodeType::Preview);
        assert_eq!(topo.generation, graph.generation());
    }
}
