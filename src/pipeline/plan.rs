//! Conversion of a compiled plan into the backend's batch request.
//!
//! The batch endpoint runs a linear list of plugin steps over a set of
//! source images, so only graphs whose operators form a single chain can be
//! submitted.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::pipeline::compiled_plan::ExecutionPlan;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::graph::PipelineGraph;
use crate::pipeline::id::NodeId;
use crate::pipeline::node::NodeData;
use crate::plugins::params::{resolve_params, wire_params};
use crate::types::ImageId;

/// Output folder used when no `save_image` node names one
pub const DEFAULT_BATCH_OUTPUT: &str = "/tmp/neuropixel_batch_output";

/// One step of a linear batch pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub plugin_name: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Inactive steps are skipped by the backend
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Body of `POST /batch/run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRunRequest {
    #[serde(default)]
    pub source_image_ids: Vec<ImageId>,
    pub pipeline_steps: Vec<PipelineStep>,
    pub output_folder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_folder: Option<String>,
}

impl ExecutionPlan {
    /// Build the batch request for this plan.
    ///
    /// Source images come from `load_image` nodes and the input folder from
    /// a `load_batch` node. The output folder comes from the `save_image`
    /// node, or `default_output` when none is set.
    pub fn to_batch_request(
        &self,
        graph: &PipelineGraph,
        default_output: &str,
    ) -> PipelineResult<BatchRunRequest> {
        if !self.is_current(graph) {
            return Err(PipelineError::Unsupported(
                "graph changed since the plan was compiled".to_string(),
            ));
        }

        let mut source_image_ids = Vec::new();
        let mut input_folder: Option<String> = None;
        let mut output_folder: Option<String> = None;
        let mut operators: Vec<NodeId> = Vec::new();
        let mut steps = Vec::new();

        for &id in &self.order {
            let node = graph.node(id).ok_or(PipelineError::UnknownNode(id))?;
            match &node.data {
                NodeData::LoadImage { image_id } => {
                    let image = image_id.clone().ok_or(PipelineError::MissingSource(id))?;
                    if !source_image_ids.contains(&image) {
                        source_image_ids.push(image);
                    }
                }
                NodeData::LoadBatch { folder } => {
                    let folder = folder
                        .as_ref()
                        .ok_or(PipelineError::MissingSource(id))?
                        .to_string_lossy()
                        .into_owned();
                    if input_folder.as_ref().is_some_and(|f| *f != folder) {
                        return Err(PipelineError::Unsupported(
                            "more than one input folder".to_string(),
                        ));
                    }
                    input_folder = Some(folder);
                }
                NodeData::Operator {
                    plugin_name,
                    params,
                    spec,
                } => {
                    let params = match spec {
                        Some(spec) => resolve_params(spec, params).map_err(|e| {
                            PipelineError::InvalidParams {
                                node_id: id,
                                message: e.to_string(),
                            }
                        })?,
                        None => params.clone(),
                    };
                    operators.push(id);
                    steps.push(PipelineStep {
                        plugin_name: plugin_name.clone(),
                        params: wire_params(&params),
                        active: true,
                    });
                }
                NodeData::SaveImage {
                    output_folder: Some(folder),
                } => {
                    let folder = folder_string(folder);
                    if output_folder.as_ref().is_some_and(|f| *f != folder) {
                        return Err(PipelineError::Unsupported(
                            "save nodes disagree on the output folder".to_string(),
                        ));
                    }
                    output_folder = Some(folder);
                }
                NodeData::SaveImage { output_folder: None }
                | NodeData::Preview
                | NodeData::MarkdownNote { .. } => {}
            }
        }

        if steps.is_empty() {
            return Err(PipelineError::Unsupported(
                "pipeline has no operator steps".to_string(),
            ));
        }
        self.check_single_chain(&operators)?;

        Ok(BatchRunRequest {
            source_image_ids,
            pipeline_steps: steps,
            output_folder: output_folder.unwrap_or_else(|| default_output.to_string()),
            input_folder,
        })
    }

    /// Operators, taken in plan order, must each feed the next and nothing else.
    fn check_single_chain(&self, operators: &[NodeId]) -> PipelineResult<()> {
        let is_operator = |id: &NodeId| operators.contains(id);
        let operator_edges = self
            .edges
            .iter()
            .filter(|(from, to)| is_operator(from) && is_operator(to))
            .count();

        let linked = operators
            .windows(2)
            .all(|pair| self.edges.contains(&(pair[0], pair[1])));

        if operator_edges + 1 != operators.len() || !linked {
            return Err(PipelineError::Unsupported(
                "operators must form a single chain for batch execution".to_string(),
            ));
        }
        Ok(())
    }
}

fn folder_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::compiler::PipelineCompiler;
    use crate::pipeline::node::sockets::{IMAGE, IMAGES, INPUT, OUTPUT};
    use crate::pipeline::node_type::NodeType;
    use crate::plugins::{PluginParam, PluginSpec};
    use std::path::PathBuf;

    fn canny() -> PluginSpec {
        PluginSpec::new("canny_edge", "Canny Edge Detection", "Edge Detection")
            .with_param(PluginParam::range("threshold", 0.1, 0.2, 0.0, 1.0))
    }

    fn blur() -> PluginSpec {
        PluginSpec::new("gaussian_blur", "Gaussian Blur", "Filters")
            .with_param(PluginParam::float("sigma", 1.0, 0.1, 10.0))
    }

    fn chain() -> (PipelineGraph, NodeId, NodeId) {
        let mut graph = PipelineGraph::new();
        let load = graph.add_node(NodeType::LoadImage).unwrap();
        let a = graph.add_operator(&blur());
        let b = graph.add_operator(&canny());
        let save = graph.add_node(NodeType::SaveImage).unwrap();
        graph.connect(load, IMAGE, a, INPUT).unwrap();
        graph.connect(a, OUTPUT, b, INPUT).unwrap();
        graph.connect(b, OUTPUT, save, IMAGE).unwrap();
        graph.bind_image(load, ImageId::from("img-1")).unwrap();
        (graph, load, save)
    }

    #[test]
    fn test_chain_to_batch_request() {
        let (mut graph, _, save) = chain();
        graph.set_output_folder(save, PathBuf::from("/data/out")).unwrap();
        let plan = PipelineCompiler::compile(&graph).unwrap();

        let request = plan.to_batch_request(&graph, DEFAULT_BATCH_OUTPUT).unwrap();
        assert_eq!(request.source_image_ids, vec![ImageId::from("img-1")]);
        assert_eq!(request.output_folder, "/data/out");
        let names: Vec<&str> = request.pipeline_steps.iter().map(|s| s.plugin_name.as_str()).collect();
        assert_eq!(names, vec!["gaussian_blur", "canny_edge"]);
        assert!(request.pipeline_steps[1].params.contains_key("threshold_low"));
        assert!(request.input_folder.is_none());
    }

    #[test]
    fn test_default_output_folder() {
        let (graph, _, _) = chain();
        let plan = PipelineCompiler::compile(&graph).unwrap();
        let request = plan.to_batch_request(&graph, DEFAULT_BATCH_OUTPUT).unwrap();
        assert_eq!(request.output_folder, DEFAULT_BATCH_OUTPUT);
    }

    #[test]
    fn test_unbound_source_rejected() {
        let mut graph = PipelineGraph::new();
        let load = graph.add_node(NodeType::LoadImage).unwrap();
        let a = graph.add_operator(&blur());
        let preview = graph.add_node(NodeType::Preview).unwrap();
        graph.connect(load, IMAGE, a, INPUT).unwrap();
        graph.connect(a, OUTPUT, preview, IMAGE).unwrap();

        let plan = PipelineCompiler::compile(&graph).unwrap();
        assert_eq!(
            plan.to_batch_request(&graph, DEFAULT_BATCH_OUTPUT),
            Err(PipelineError::MissingSource(load))
        );
    }

    #[test]
    fn test_branching_rejected() {
        let mut graph = PipelineGraph::new();
        let load = graph.add_node(NodeType::LoadBatch).unwrap();
        let a = graph.add_operator(&blur());
        let b = graph.add_operator(&canny());
        let p1 = graph.add_node(NodeType::Preview).unwrap();
        let p2 = graph.add_node(NodeType::Preview).unwrap();
        graph.set_batch_folder(load, PathBuf::from("/data/in")).unwrap();
        graph.connect(load, IMAGES, a, INPUT).unwrap();
        graph.connect(load, IMAGES, b, INPUT).unwrap();
        graph.connect(a, OUTPUT, p1, IMAGE).unwrap();
        graph.connect(b, OUTPUT, p2, IMAGE).unwrap();

        let plan = PipelineCompiler::compile(&graph).unwrap();
        assert!(matches!(
            plan.to_batch_request(&graph, DEFAULT_BATCH_OUTPUT),
            Err(PipelineError::Unsupported(_))
        ));
    }

    #[test]
    fn test_request_wire_shape() {
        let request = BatchRunRequest {
            source_image_ids: vec![ImageId::from("a")],
            pipeline_steps: vec![PipelineStep {
                plugin_name: "gaussian_blur".into(),
                params: Map::new(),
                active: true,
            }],
            output_folder: DEFAULT_BATCH_OUTPUT.into(),
            input_folder: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["source_image_ids"][0], "a");
        assert!(json.get("input_folder").is_none());
    }
}
