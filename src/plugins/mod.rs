//! Plugin spec registry
//!
//! Plugins run on the backend; the client only holds their specs,
//! which drive parameter validation, operator node construction and the
//! catalog listing.
//!
//! - [`spec`] - `PluginSpec` and its typed parameters
//! - [`params`] - parameter values, defaults, validation and wire encoding
//! - [`catalog`] - spec list plus category index
//! - [`registry`] - time-bounded catalog cache
//! - [`run`] - invocation request/response bodies

pub mod catalog;
pub mod params;
pub mod registry;
pub mod run;
pub mod spec;

pub use catalog::PluginCatalog;
pub use params::{resolve_params, wire_params, ParamMap, ParamValue};
pub use registry::{CatalogCache, DEFAULT_CATALOG_TTL};
pub use run::{PluginRunRequest, PluginRunResponse};
pub use spec::{DataKind, PluginParam, PluginSpec, SelectOption};
