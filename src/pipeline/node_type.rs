//! Node type enumeration and the static registry entry for each type.
//!
//! This module defines the types of nodes that can be placed in the
//! pipeline editor, along with the label, icon, category and description
//! a new node of that type starts with.

use serde::{Deserialize, Serialize};

/// Types of nodes that can be placed in a pipeline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    // Source nodes
    /// Feeds one image already present in the session.
    LoadImage,
    /// Feeds every image found in a folder.
    LoadBatch,

    // Transform nodes
    /// Runs one backend plugin.
    Operator,

    // Terminal nodes
    /// Writes results to an output folder.
    SaveImage,
    /// Shows results in the viewer.
    Preview,

    // Annotation
    /// Free-form documentation, not part of execution.
    MarkdownNote,
}

impl NodeType {
    /// Get the display name for this node type.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeType::LoadImage => "Load Image",
            NodeType::LoadBatch => "Load Batch",
            NodeType::Operator => "Operator",
            NodeType::SaveImage => "Save Image",
            NodeType::Preview => "Preview",
            NodeType::MarkdownNote => "Note",
        }
    }

    /// Material Symbol icon name.
    pub fn icon(&self) -> &'static str {
        match self {
            NodeType::LoadImage => "image",
            NodeType::LoadBatch => "folder_open",
            NodeType::Operator => "tune",
            NodeType::SaveImage => "save",
            NodeType::Preview => "visibility",
            NodeType::MarkdownNote => "sticky_note_2",
        }
    }

    /// Palette category.
    pub fn category(&self) -> &'static str {
        match self {
            NodeType::LoadImage | NodeType::LoadBatch => "Input",
            NodeType::Operator => "Processing",
            NodeType::SaveImage | NodeType::Preview => "Output",
            NodeType::MarkdownNote => "Annotation",
        }
    }

    /// Get all available node types.
    pub fn all() -> &'static [NodeType] {
        &[
            NodeType::LoadImage,
            NodeType::LoadBatch,
            NodeType::Operator,
            NodeType::SaveImage,
            NodeType::Preview,
            NodeType::MarkdownNote,
        ]
    }

    /// Check if this node type produces data without inputs.
    pub fn is_source(&self) -> bool {
        matches!(self, NodeType::LoadImage | NodeType::LoadBatch)
    }

    /// Check if this node type ends a pipeline. A runnable graph needs one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeType::SaveImage | NodeType::Preview)
    }

    /// Check if nodes of this type take part in execution.
    pub fn is_executable(&self) -> bool {
        !matches!(self, NodeType::MarkdownNote)
    }

    /// Get a detailed description of what this node does.
    pub fn description(&self) -> &'static str {
        match self {
            NodeType::LoadImage =>
                "Loads a single image from the session.\n\
                 Bind it to an uploaded image before running.",

            NodeType::LoadBatch =>
                "Loads every image in a folder.\n\
                 Each file runs through the pipeline in turn.",

            NodeType::Operator =>
                "Applies a backend plugin to its input.\n\
                 Parameters follow the plugin's spec.",

            NodeType::SaveImage =>
                "Writes incoming images to an output folder.\n\
                 Defaults to the configured batch output folder.",

            NodeType::Preview =>
                "Displays incoming images in the viewer.\n\
                 Accepts images and masks alike.",

            NodeType::MarkdownNote =>
                "A free-form note for documenting the graph.\n\
                 Has no sockets and is never executed.",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let terminals: Vec<_> = NodeType::all().iter().filter(|t| t.is_terminal()).collect();
        assert_eq!(terminals, vec![&NodeType::SaveImage, &NodeType::Preview]);
        assert!(NodeType::LoadBatch.is_source());
        assert!(!NodeType::MarkdownNote.is_executable());
    }

    #[test]
    fn test_serde_tag() {
        assert_eq!(serde_json::to_string(&NodeType::MarkdownNote).unwrap(), "\"markdown_note\"");
        let t: NodeType = serde_json::from_str("\"save_image\"").unwrap();
        assert_eq!(t, NodeType::SaveImage);
    }
}
