//! Parameter values and their validation against a plugin's spec.
//!
//! Values are kept keyed by parameter name. A dual-ended range is a single
//! [`ParamValue::Range`] on the client side and is only split into
//! `<name>_low` / `<name>_high` keys when the request is serialized for the
//! backend (see [`wire_params`]).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{NeuroPixelError, Result};
use crate::plugins::spec::{PluginParam, PluginSpec};

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Range { low: f64, high: f64 },
}

impl ParamValue {
    /// Numeric view of the value; integers widen to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Text(_) => "string",
            ParamValue::Range { .. } => "range",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Range { low, high } => write!(f, "{}..{}", low, high),
        }
    }
}

/// Parameter values keyed by parameter name
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Default value of every parameter in `spec`
pub fn defaults(spec: &PluginSpec) -> ParamMap {
    spec.params
        .iter()
        .map(|p| (p.name().to_string(), default_value(p)))
        .collect()
}

pub fn default_value(param: &PluginParam) -> ParamValue {
    match param {
        PluginParam::Float(p) => ParamValue::Float(p.default),
        PluginParam::Int(p) => ParamValue::Int(p.default),
        PluginParam::Bool(p) => ParamValue::Bool(p.default),
        PluginParam::Select(p) => ParamValue::Text(p.default.clone()),
        PluginParam::Range(p) => ParamValue::Range {
            low: p.default_low,
            high: p.default_high,
        },
    }
}

/// Validate `supplied` against `spec` and fill in defaults.
///
/// The result holds exactly one entry per parameter of the spec. Unknown
/// keys, type mismatches, out-of-bounds numbers, values outside a select's
/// options and inverted ranges are rejected.
pub fn resolve_params(spec: &PluginSpec, supplied: &ParamMap) -> Result<ParamMap> {
    if let Some(unknown) = supplied.keys().find(|k| spec.param(k).is_none()) {
        return Err(NeuroPixelError::invalid_param(
            unknown.clone(),
            format!("not a parameter of plugin '{}'", spec.name),
        ));
    }

    let mut resolved = ParamMap::new();
    for param in &spec.params {
        let value = match supplied.get(param.name()) {
            Some(value) => check_value(param, value)?,
            None => default_value(param),
        };
        resolved.insert(param.name().to_string(), value);
    }
    Ok(resolved)
}

/// Check one value against its parameter, normalizing numeric representation
pub fn check_value(param: &PluginParam, value: &ParamValue) -> Result<ParamValue> {
    let name = param.name();
    let mismatch = || {
        NeuroPixelError::invalid_param(
            name,
            format!("expected {}, got {}", param.type_name(), value.kind()),
        )
    };

    match param {
        PluginParam::Float(p) => {
            let v = value.as_f64().ok_or_else(mismatch)?;
            check_bounds(name, v, p.min, p.max)?;
            Ok(ParamValue::Float(v))
        }
        PluginParam::Int(p) => {
            let v = match value {
                ParamValue::Int(i) => *i,
                ParamValue::Float(f) if f.fract() == 0.0 && f.is_finite() => *f as i64,
                _ => return Err(mismatch()),
            };
            if v < p.min || v > p.max {
                return Err(NeuroPixelError::invalid_param(
                    name,
                    format!("{} is outside [{}, {}]", v, p.min, p.max),
                ));
            }
            Ok(ParamValue::Int(v))
        }
        PluginParam::Bool(_) => match value {
            ParamValue::Bool(b) => Ok(ParamValue::Bool(*b)),
            _ => Err(mismatch()),
        },
        PluginParam::Select(p) => match value {
            ParamValue::Text(s) if p.has_option(s) => Ok(ParamValue::Text(s.clone())),
            ParamValue::Text(s) => Err(NeuroPixelError::invalid_param(
                name,
                format!("'{}' is not one of the available options", s),
            )),
            _ => Err(mismatch()),
        },
        PluginParam::Range(p) => match value {
            ParamValue::Range { low, high } => {
                check_bounds(name, *low, p.min, p.max)?;
                check_bounds(name, *high, p.min, p.max)?;
                if low > high {
                    return Err(NeuroPixelError::invalid_param(
                        name,
                        format!("low {} is greater than high {}", low, high),
                    ));
                }
                Ok(ParamValue::Range {
                    low: *low,
                    high: *high,
                })
            }
            _ => Err(mismatch()),
        },
    }
}

fn check_bounds(name: &str, v: f64, min: f64, max: f64) -> Result<()> {
    if !v.is_finite() || v < min || v > max {
        return Err(NeuroPixelError::invalid_param(
            name,
            format!("{} is outside [{}, {}]", v, min, max),
        ));
    }
    Ok(())
}

/// Parse a textual value (e.g. from `--param sigma=2.0`) for `param`.
///
/// Ranges accept `low..high` or `low,high`.
pub fn parse_value(param: &PluginParam, raw: &str) -> Result<ParamValue> {
    let raw = raw.trim();
    let bad = |what: &str| NeuroPixelError::invalid_param(param.name(), format!("'{}' {}", raw, what));

    let value = match param {
        PluginParam::Float(_) => ParamValue::Float(raw.parse().map_err(|_| bad("is not a number"))?),
        PluginParam::Int(_) => ParamValue::Int(raw.parse().map_err(|_| bad("is not an integer"))?),
        PluginParam::Bool(_) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => ParamValue::Bool(true),
            "false" | "0" | "no" | "off" => ParamValue::Bool(false),
            _ => return Err(bad("is not a boolean")),
        },
        PluginParam::Select(_) => ParamValue::Text(raw.to_string()),
        PluginParam::Range(_) => {
            let (low, high) = raw
                .split_once("..")
                .or_else(|| raw.split_once(','))
                .ok_or_else(|| bad("is not a range (expected low..high)"))?;
            ParamValue::Range {
                low: low.trim().parse().map_err(|_| bad("has a non-numeric low end"))?,
                high: high.trim().parse().map_err(|_| bad("has a non-numeric high end"))?,
            }
        }
    };
    check_value(param, &value)
}

/// Serialize parameters the way the backend reads them.
///
/// Ranges expand to `<name>_low` and `<name>_high`.
pub fn wire_params(params: &ParamMap) -> Map<String, Value> {
    let mut out = Map::new();
    for (name, value) in params {
        match value {
            ParamValue::Range { low, high } => {
                out.insert(format!("{}_low", name), Value::from(*low));
                out.insert(format!("{}_high", name), Value::from(*high));
            }
            ParamValue::Bool(b) => {
                out.insert(name.clone(), Value::Bool(*b));
            }
            ParamValue::Int(i) => {
                out.insert(name.clone(), Value::from(*i));
            }
            ParamValue::Float(f) => {
                out.insert(name.clone(), Value::from(*f));
            }
            ParamValue::Text(s) => {
                out.insert(name.clone(), Value::String(s.clone()));
            }
        }
    }
    out
}
