//! Plugin specification records as served by the backend.

use serde::{Deserialize, Serialize};

/// Kind of pixel data a plugin consumes or produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    #[default]
    Image,
    /// Single-channel binary mask, e.g. a threshold result
    Mask,
}

fn default_icon() -> String {
    "tune".to_string()
}

/// Complete specification for a plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Stable identifier (snake_case)
    pub name: String,
    pub display_name: String,
    pub description: String,
    /// Grouping label, e.g. "Segmentation"
    pub category: String,
    /// Material Symbol icon name
    #[serde(default = "default_icon")]
    pub icon: String,
    /// Ordered parameter list
    #[serde(default)]
    pub params: Vec<PluginParam>,
    #[serde(default)]
    pub input_type: DataKind,
    #[serde(default)]
    pub output_type: DataKind,
}

impl PluginSpec {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            category: category.into(),
            icon: default_icon(),
            params: Vec::new(),
            input_type: DataKind::Image,
            output_type: DataKind::Image,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_param(mut self, param: PluginParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_io(mut self, input: DataKind, output: DataKind) -> Self {
        self.input_type = input;
        self.output_type = output;
        self
    }

    /// Look up a parameter by name
    pub fn param(&self, name: &str) -> Option<&PluginParam> {
        self.params.iter().find(|p| p.name() == name)
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name())
    }
}

// ==================== Parameters ====================

/// One typed parameter. The wire format is tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PluginParam {
    Float(FloatParam),
    Int(IntParam),
    Bool(BoolParam),
    Select(SelectParam),
    Range(RangeParam),
}

impl PluginParam {
    pub fn name(&self) -> &str {
        match self {
            PluginParam::Float(p) => &p.name,
            PluginParam::Int(p) => &p.name,
            PluginParam::Bool(p) => &p.name,
            PluginParam::Select(p) => &p.name,
            PluginParam::Range(p) => &p.name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PluginParam::Float(p) => &p.label,
            PluginParam::Int(p) => &p.label,
            PluginParam::Bool(p) => &p.label,
            PluginParam::Select(p) => &p.label,
            PluginParam::Range(p) => &p.label,
        }
    }

    /// Type tag as it appears on the wire
    pub fn type_name(&self) -> &'static str {
        match self {
            PluginParam::Float(_) => "float",
            PluginParam::Int(_) => "int",
            PluginParam::Bool(_) => "bool",
            PluginParam::Select(_) => "select",
            PluginParam::Range(_) => "range",
        }
    }

    pub fn float(name: &str, default: f64, min: f64, max: f64) -> Self {
        PluginParam::Float(FloatParam {
            name: name.to_string(),
            label: name.to_string(),
            description: None,
            default,
            min,
            max,
            step: default_float_step(),
        })
    }

    pub fn int(name: &str, default: i64, min: i64, max: i64) -> Self {
        PluginParam::Int(IntParam {
            name: name.to_string(),
            label: name.to_string(),
            description: None,
            default,
            min,
            max,
            step: 1,
        })
    }

    pub fn boolean(name: &str, default: bool) -> Self {
        PluginParam::Bool(BoolParam {
            name: name.to_string(),
            label: name.to_string(),
            description: None,
            default,
        })
    }

    pub fn select(name: &str, default: &str, options: &[&str]) -> Self {
        PluginParam::Select(SelectParam {
            name: name.to_string(),
            label: name.to_string(),
            description: None,
            default: default.to_string(),
            options: options
                .iter()
                .map(|o| SelectOption {
                    value: o.to_string(),
                    label: o.to_string(),
                })
                .collect(),
        })
    }

    pub fn range(name: &str, default_low: f64, default_high: f64, min: f64, max: f64) -> Self {
        PluginParam::Range(RangeParam {
            name: name.to_string(),
            label: name.to_string(),
            description: None,
            default_low,
            default_high,
            min,
            max,
            step: default_float_step(),
        })
    }
}

fn default_float_step() -> f64 {
    0.01
}

fn default_float_max() -> f64 {
    1.0
}

fn default_int_max() -> i64 {
    100
}

fn default_int_step() -> i64 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatParam {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default = "default_float_max")]
    pub max: f64,
    #[serde(default = "default_float_step")]
    pub step: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntParam {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: i64,
    #[serde(default)]
    pub min: i64,
    #[serde(default = "default_int_max")]
    pub max: i64,
    #[serde(default = "default_int_step")]
    pub step: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolParam {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectParam {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    pub default: String,
    pub options: Vec<SelectOption>,
}

impl SelectParam {
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

/// Dual-ended range, sent to the backend as `<name>_low` / `<name>_high`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeParam {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_low: f64,
    #[serde(default = "default_float_max")]
    pub default_high: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default = "default_float_max")]
    pub max: f64,
    #[serde(default = "default_float_step")]
    pub step: f64,
}
