//! Workflow edge definitions for connecting nodes.
//!
//! Edges define the execution flow between nodes. The source handle names
//! which logical output of the source node an edge listens on: `output` for
//! plain nodes, a condition's handle id for conditional nodes, `loopBody` /
//! `loopEnd` for loop nodes.

use serde::{Deserialize, Serialize};

use crate::{
    model::EdgeModel,
    workflow::{consts::OUTPUT_HANDLE, node::NodeId},
};

/// Unique identifier for an edge within a workflow.
pub type EdgeId = String;

/// Runtime edge representation connecting two nodes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Unique edge identifier.
    pub id: EdgeId,
    /// ID of the source node.
    pub source: NodeId,
    /// ID of the target node.
    pub target: NodeId,
    /// Which output handle this edge connects from.
    pub source_handle: String,
}

impl Edge {
    /// Returns true when this edge listens on `handle` of `source`.
    pub fn listens_on(
        &self,
        source: &str,
        handle: &str,
    ) -> bool {
        self.source == source && self.source_handle == handle
    }
}

impl From<&EdgeModel> for Edge {
    fn from(model: &EdgeModel) -> Self {
        Self {
            id: model.id.clone(),
            source: model.source.clone(),
            target: model.target.clone(),
            source_handle: model.source_handle.clone().filter(|h| !h.is_empty()).unwrap_or_else(|| OUTPUT_HANDLE.to_string()),
        }
    }
}
