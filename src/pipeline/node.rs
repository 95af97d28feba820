//! Pipeline nodes.
//!
//! Every node shares a common base (label, icon, ordered sockets) and carries
//! variant-specific data in [`NodeData`], a closed tagged union with one
//! variant per [`NodeType`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::NodeId;
use crate::pipeline::node_type::NodeType;
use crate::pipeline::port::{SocketDescriptor, SocketDirection, SocketType};
use crate::plugins::params::{defaults, ParamMap};
use crate::plugins::PluginSpec;
use crate::types::ImageId;

/// Socket names used by the built-in node types.
pub mod sockets {
    pub const IMAGE: &str = "image";
    pub const IMAGES: &str = "images";
    pub const INPUT: &str = "input";
    pub const OUTPUT: &str = "output";
}

/// Variant-specific node data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeData {
    LoadImage {
        #[serde(default)]
        image_id: Option<ImageId>,
    },
    LoadBatch {
        #[serde(default)]
        folder: Option<PathBuf>,
    },
    Operator {
        plugin_name: String,
        #[serde(default)]
        params: ParamMap,
        /// Resolved from the catalog; absent until resolved
        #[serde(default, skip_serializing_if = "Option::is_none")]
        spec: Option<PluginSpec>,
    },
    SaveImage {
        #[serde(default)]
        output_folder: Option<PathBuf>,
    },
    Preview,
    MarkdownNote {
        #[serde(default)]
        text: String,
    },
}

impl NodeData {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeData::LoadImage { .. } => NodeType::LoadImage,
            NodeData::LoadBatch { .. } => NodeType::LoadBatch,
            NodeData::Operator { .. } => NodeType::Operator,
            NodeData::SaveImage { .. } => NodeType::SaveImage,
            NodeData::Preview => NodeType::Preview,
            NodeData::MarkdownNote { .. } => NodeType::MarkdownNote,
        }
    }

    /// Input and output sockets for this data.
    ///
    /// Operator sockets follow the resolved spec's `input_type` and
    /// `output_type`; an unresolved operator gets wildcard sockets.
    pub fn sockets(&self) -> (Vec<SocketDescriptor>, Vec<SocketDescriptor>) {
        use sockets::*;
        match self {
            NodeData::LoadImage { .. } => (
                Vec::new(),
                vec![SocketDescriptor::output(IMAGE, SocketType::Image)],
            ),
            NodeData::LoadBatch { .. } => (
                Vec::new(),
                vec![SocketDescriptor::output(IMAGES, SocketType::Image)],
            ),
            NodeData::Operator { spec, .. } => {
                let (input, output) = match spec {
                    Some(spec) => (spec.input_type.into(), spec.output_type.into()),
                    None => (SocketType::Any, SocketType::Any),
                };
                (
                    vec![SocketDescriptor::input(INPUT, input)],
                    vec![SocketDescriptor::output(OUTPUT, output)],
                )
            }
            NodeData::SaveImage { .. } => (
                vec![SocketDescriptor::input(IMAGE, SocketType::Image)],
                Vec::new(),
            ),
            NodeData::Preview => (
                vec![SocketDescriptor::input(IMAGE, SocketType::Any)],
                Vec::new(),
            ),
            NodeData::MarkdownNote { .. } => (Vec::new(), Vec::new()),
        }
    }
}

/// A node placed in a pipeline graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineNode {
    pub id: NodeId,
    pub label: String,
    pub icon: String,
    #[serde(default)]
    pub inputs: Vec<SocketDescriptor>,
    #[serde(default)]
    pub outputs: Vec<SocketDescriptor>,
    pub data: NodeData,
}

impl PipelineNode {
    pub fn node_type(&self) -> NodeType {
        self.data.node_type()
    }

    pub fn input(&self, name: &str) -> Option<&SocketDescriptor> {
        self.inputs.iter().find(|s| s.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&SocketDescriptor> {
        self.outputs.iter().find(|s| s.name == name)
    }

    pub fn socket(&self, name: &str, direction: SocketDirection) -> Option<&SocketDescriptor> {
        match direction {
            SocketDirection::Input => self.input(name),
            SocketDirection::Output => self.output(name),
        }
    }

    /// Plugin name if this is an operator node
    pub fn plugin_name(&self) -> Option<&str> {
        match &self.data {
            NodeData::Operator { plugin_name, .. } => Some(plugin_name),
            _ => None,
        }
    }

    /// Re-derive sockets from the current data
    pub(crate) fn refresh_sockets(&mut self) {
        let (inputs, outputs) = self.data.sockets();
        self.inputs = inputs;
        self.outputs = outputs;
    }
}

/// Builds nodes from the static node-type registry or a plugin spec.
pub struct NodeFactory;

impl NodeFactory {
    /// Create a node of a non-operator type with default data.
    pub fn create(id: NodeId, node_type: NodeType) -> PipelineResult<PipelineNode> {
        let data = match node_type {
            NodeType::LoadImage => NodeData::LoadImage { image_id: None },
            NodeType::LoadBatch => NodeData::LoadBatch { folder: None },
            NodeType::SaveImage => NodeData::SaveImage {
                output_folder: None,
            },
            NodeType::Preview => NodeData::Preview,
            NodeType::MarkdownNote => NodeData::MarkdownNote {
                text: String::new(),
            },
            NodeType::Operator => {
                return Err(PipelineError::Unsupported(
                    "operator nodes are created from a plugin spec".to_string(),
                ))
            }
        };
        Ok(Self::from_data(id, data))
    }

    /// Create an operator node for `spec` with every parameter at its default.
    pub fn operator(id: NodeId, spec: &PluginSpec) -> PipelineNode {
        Self::from_data(
            id,
            NodeData::Operator {
                plugin_name: spec.name.clone(),
                params: defaults(spec),
                spec: Some(spec.clone()),
            },
        )
    }

    /// Wrap arbitrary node data, taking label and icon from the registry entry
    /// (or the plugin spec for operators).
    pub fn from_data(id: NodeId, data: NodeData) -> PipelineNode {
        let node_type = data.node_type();
        let (label, icon) = match &data {
            NodeData::Operator {
                spec: Some(spec), ..
            } => (spec.display_name.clone(), spec.icon.clone()),
            NodeData::Operator { plugin_name, .. } => {
                (plugin_name.clone(), node_type.icon().to_string())
            }
            _ => (
                node_type.display_name().to_string(),
                node_type.icon().to_string(),
            ),
        };
        let (inputs, outputs) = data.sockets();
        PipelineNode {
            id,
            label,
            icon,
            inputs,
            outputs,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{DataKind, PluginParam};

    #[test]
    fn test_factory_registry_entries() {
        let node = NodeFactory::create(NodeId(0), NodeType::SaveImage).unwrap();
        assert_eq!(node.label, "Save Image");
        assert_eq!(node.icon, "save");
        assert_eq!(node.inputs.len(), 1);
        assert!(node.inputs[0].required);
        assert!(node.outputs.is_empty());

        let note = NodeFactory::create(NodeId(1), NodeType::MarkdownNote).unwrap();
        assert!(note.inputs.is_empty() && note.outputs.is_empty());
    }

    #[test]
    fn test_factory_rejects_bare_operator() {
        assert!(NodeFactory::create(NodeId(0), NodeType::Operator).is_err());
    }

    #[test]
    fn test_operator_sockets_from_spec() {
        let spec = PluginSpec::new("otsu_threshold", "Otsu Threshold", "Segmentation")
            .with_icon("contrast")
            .with_io(DataKind::Image, DataKind::Mask)
            .with_param(PluginParam::boolean("invert", false));
        let node = NodeFactory::operator(NodeId(3), &spec);

        assert_eq!(node.label, "Otsu Threshold");
        assert_eq!(node.icon, "contrast");
        assert_eq!(node.input(sockets::INPUT).unwrap().socket_type, SocketType::Image);
        assert_eq!(node.output(sockets::OUTPUT).unwrap().socket_type, SocketType::Mask);
        assert_eq!(node.plugin_name(), Some("otsu_threshold"));
        match &node.data {
            NodeData::Operator { params, .. } => assert_eq!(params.len(), 1),
            other => panic!("unexpected data {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_operator_is_wildcard() {
        let node = NodeFactory::from_data(
            NodeId(0),
            NodeData::Operator {
                plugin_name: "mystery".into(),
                params: ParamMap::new(),
                spec: None,
            },
        );
        assert_eq!(node.label, "mystery");
        assert_eq!(node.inputs[0].socket_type, SocketType::Any);
    }

    #[test]
    fn test_node_data_serde_tag() {
        let json = serde_json::to_value(NodeData::Preview).unwrap();
        assert_eq!(json, serde_json::json!({"type": "preview"}));

        let data: NodeData =
            serde_json::from_str(r#"{"type": "load_image", "image_id": "abc"}"#).unwrap();
        assert_eq!(
            data,
            NodeData::LoadImage {
                image_id: Some(ImageId::from("abc"))
            }
        );
    }
}
