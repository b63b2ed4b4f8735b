use serde::{Deserialize, Serialize};

use crate::{
    FlowError, Result,
    model::{EdgeModel, NodeModel},
};

/// Graph snapshot handed over by the editor for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowModel {
    #[serde(default)]
    pub nodes: Vec<NodeModel>,
    #[serde(default)]
    pub edges: Vec<EdgeModel>,
}

impl FlowModel {
    pub fn from_json(s: &str) -> Result<Self> {
        let flow = serde_json::from_str::<FlowModel>(s);
        match flow {
            Ok(v) => Ok(v),
            Err(e) => Err(FlowError::Workflow(format!("{}", e))),
        }
    }
}
