//! Error handling for camgraph
//!
//! This module defines the crate-level error type and a Result alias used by
//! configuration loading and the command line tool. Graph operations use
//! [`GraphError`](crate::pipeline::GraphError) directly.

use crate::pipeline::{GraphError, TopologyError};
use thiserror::Error;

/// Main error type for camgraph operations
#[derive(Error, Debug)]
pub enum CamGraphError {
    /// Errors raised while registering entities or building the pipeline
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Errors in the topology description
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

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
        source: Box<CamGraphError>,
    },
}

impl CamGraphError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CamGraphError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<toml::de::Error> for CamGraphError {
    fn from(err: toml::de::Error) -> Self {
        CamGraphError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for CamGraphError {
    fn from(err: toml::ser::Error) -> Self {
        CamGraphError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for CamGraphError {
    fn from(err: serde_json::Error) -> Self {
        CamGraphError::Serialization(err.to_string())
    }
}

/// Result type alias for camgraph operations
pub type Result<T> = std::result::Result<T, CamGraphError>;

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

impl<T> ResultExt<T> for std::result::Result<T, GraphError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CamGraphError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| CamGraphError::from(e).with_context(f()))
    }
}
