//! Error handling for the NeuroPixel client
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the client core. Every error here is recoverable: callers
//! surface it for display and keep the previous session state.

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Fallback message when a failing service response carries no `detail`.
pub const GENERIC_FAILURE_DETAIL: &str = "The request failed without an error message";

/// Main error type for NeuroPixel client operations
#[derive(Error, Debug)]
pub enum NeuroPixelError {
    /// A backend service answered with a non-success status
    #[error("Service error ({status}): {detail}")]
    Service { status: u16, detail: String },

    /// The request never produced a response (connect failure, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An operation addressed an image, node or plugin that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Plugin parameters failed validation against their plugin spec
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParam { name: String, message: String },

    /// A wait on the backend ran past its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// A plugin invocation is already in flight for this lineage
    #[error("Image lineage rooted at '{0}' is busy")]
    LineageBusy(String),

    /// The pipeline graph rejected an operation
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Folder/file selection failed
    #[error("Selection error: {0}")]
    Selection(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<NeuroPixelError>,
    },
}

impl NeuroPixelError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        NeuroPixelError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a service error, substituting the generic message for a blank detail
    pub fn service(status: u16, detail: Option<String>) -> Self {
        let detail = detail
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE_DETAIL.to_string());
        NeuroPixelError::Service { status, detail }
    }

    /// Shorthand for parameter validation failures
    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        NeuroPixelError::InvalidParam {
            name: name.into(),
            message: message.into(),
        }
    }

    /// The message a presentation layer should show for this error
    pub fn user_message(&self) -> String {
        match self {
            NeuroPixelError::Service { detail, .. } => detail.clone(),
            NeuroPixelError::WithContext { source, .. } => source.user_message(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for NeuroPixelError {
    fn from(err: serde_json::Error) -> Self {
        NeuroPixelError::Serialization(err.to_string())
    }
}

/// Result type alias for NeuroPixel operations
pub type Result<T> = std::result::Result<T, NeuroPixelError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NeuroPixelError::NotFound("image 'abc'".to_string());
        assert_eq!(err.to_string(), "Not found: image 'abc'");
    }

    #[test]
    fn test_error_with_context() {
        let err = NeuroPixelError::Config("bad url".to_string());
        let with_ctx = err.with_context("Failed to load client config");
        assert!(with_ctx.to_string().contains("Failed to load client config"));
    }

    #[test]
    fn test_service_error_fallback_detail() {
        let err = NeuroPixelError::service(500, None);
        assert_eq!(err.user_message(), GENERIC_FAILURE_DETAIL);

        let err = NeuroPixelError::service(404, Some("   ".to_string()));
        assert_eq!(err.user_message(), GENERIC_FAILURE_DETAIL);

        let err = NeuroPixelError::service(404, Some("Plugin not found: blur".to_string()));
        assert_eq!(err.user_message(), "Plugin not found: blur");
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_user_message_unwraps_context() {
        let err = NeuroPixelError::service(500, Some("Plugin execution failed: boom".into()))
            .with_context("Running gaussian_blur");
        assert_eq!(err.user_message(), "Plugin execution failed: boom");
    }

    #[test]
    fn test_result_ext_context() {
        let res: Result<()> = Err(NeuroPixelError::Selection("no display".into()));
        let err = res.context("Choosing output folder").unwrap_err();
        assert!(err.to_string().starts_with("Choosing output folder"));
    }
}
