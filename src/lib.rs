//! # Nodeflow
//!
//! Nodeflow executes visually assembled node graphs. A flow is a snapshot of
//! typed nodes (HTTP request, JSON, select-fields, delay, variable-set,
//! transform, conditional, loop, export) wired together by edges that listen
//! on named output handles of their source node.
//!
//! ## Core Features
//!
//! - **Depth-first dispatch**: every node awaits its whole downstream subtree,
//!   sibling edges run one after another in snapshot order
//! - **Templating**: `{{env.NAME}}`, `{{context.NAME}}` and `{{nodeId::$.path}}`
//!   expressions are resolved in every node field before it runs
//! - **Failure isolation**: a failed node stops only its own downstream edges
//! - **Pluggable collaborators**: HTTP, result and config sinks, the
//!   environment store and export delivery are traits
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nodeflow::{EngineBuilder, Environment, FlowModel, Workflow};
//!
//! let engine = EngineBuilder::new().build()?;
//! let mut events = engine.subscribe();
//!
//! let model = FlowModel::from_json(json_str)?;
//! let workflow = Arc::new(Workflow::try_from(&model)?);
//! let report = engine.run_flow(workflow, Environment::default()).await;
//! ```

mod builder;
mod common;
mod config;
mod dispatcher;
mod engine;
mod error;
mod events;
mod model;
mod runtime;
mod utils;
mod workflow;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use config::{ExportConfig, HttpConfig, RuntimeConfig};
pub use engine::{Engine, RunReport};
pub use error::FlowError;
pub use events::FlowEvent;
pub use model::*;
pub use runtime::{
    ChannelSink, ConfigSink, EnvironmentSink, ExportSink, ExportedFile, FsExportSink, HttpProxy, MemEnvironmentStore, NoopSink, ProxyRequest, ProxyResponse, ReqwestProxy,
    ResultSink, RunId,
};
pub use workflow::{
    Workflow,
    actions::{
        ActionType,
        http_request::models::{BodyType, HttpRequestMethod},
    },
    node::{NodeId, NodeResult, NodeStatus, SaveToEnvironment},
};

/// Result type alias for Nodeflow operations.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
