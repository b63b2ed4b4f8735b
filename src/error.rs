//! Error types for Nodeflow.
//!
//! All errors in Nodeflow are represented by the `FlowError` enum,
//! which provides specific variants for different error categories.
//! Node handlers never let these escape a run: the node lifecycle turns
//! them into an `error` [`NodeResult`](crate::NodeResult).

use std::{io::ErrorKind, string::FromUtf8Error};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Nodeflow operations.
///
/// Each variant represents a specific category of error that can occur
/// while loading a flow snapshot or executing one of its nodes.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML, etc.).
    #[error("{0}")]
    Convert(String),

    /// Flow snapshot errors.
    #[error("{0}")]
    Workflow(String),

    /// Node definition errors.
    #[error("{0}")]
    Node(String),

    /// Edge definition errors.
    #[error("{0}")]
    Edge(String),

    /// Template expansion errors.
    #[error("{0}")]
    Template(String),

    /// Malformed JSONPath expressions.
    #[error("invalid JSONPath '{path}': {message}")]
    JsonPath {
        path: String,
        message: String,
    },

    /// Node action errors (missing fields, unexpected data shapes).
    #[error("{0}")]
    Action(String),

    /// HTTP proxy failures.
    #[error("{0}")]
    Http(String),

    /// Export worker failures.
    #[error("{0}")]
    Export(String),

    /// Runtime execution errors.
    #[error("{0}")]
    Runtime(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),
}

impl From<FlowError> for String {
    fn from(val: FlowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for FlowError {
    fn from(error: std::io::Error) -> Self {
        FlowError::IoError(error.to_string())
    }
}

impl From<FlowError> for std::io::Error {
    fn from(val: FlowError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<FromUtf8Error> for FlowError {
    fn from(_: FromUtf8Error) -> Self {
        FlowError::Runtime("Error with utf-8 string convert".to_string())
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(error: serde_json::Error) -> Self {
        FlowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for FlowError {
    fn from(error: toml::de::Error) -> Self {
        FlowError::Config(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for FlowError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        FlowError::Node(error.to_string())
    }
}
