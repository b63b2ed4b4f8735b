//! Event types for flow execution.
//!
//! Events are emitted during a run so that observers (the editor UI, logs,
//! tests) can follow node progress while the run is still active.

use serde_json::Value;

use crate::{
    runtime::RunId,
    workflow::node::{NodeId, NodeResult},
};

/// Event published on the engine's broadcast channel.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    /// A run started with the given nodes reset to idle.
    RunStarted {
        run_id: RunId,
        node_ids: Vec<NodeId>,
    },
    /// A node recorded a new result.
    NodeResult {
        run_id: RunId,
        nid: NodeId,
        result: NodeResult,
    },
    /// A node asked for its config to be patched.
    NodeData {
        run_id: RunId,
        nid: NodeId,
        patch: Value,
    },
    /// Every reachable branch of a run has finished.
    RunFinished {
        run_id: RunId,
    },
}

impl FlowEvent {
    pub fn run_id(&self) -> &str {
        match self {
            FlowEvent::RunStarted { run_id, .. } | FlowEvent::NodeResult { run_id, .. } | FlowEvent::NodeData { run_id, .. } | FlowEvent::RunFinished { run_id } => run_id,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, FlowEvent::RunFinished { .. })
    }
}
