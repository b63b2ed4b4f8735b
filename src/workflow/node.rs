use std::{collections::HashMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
    Result,
    model::NodeModel,
    utils,
    workflow::actions::{
        Action, ActionType, ConditionalAction, DelayAction, ExportAction, HttpRequestAction, InvalidAction, JsonAction, LoopAction, SelectFieldsAction,
        TransformAction, VariableSetAction,
    },
};

/// node id
pub type NodeId = String;

/// Status of a node during one run: `idle -> loading -> success | error`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Request for the environment store to persist a variable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveToEnvironment {
    pub variable_name: String,
    pub value: String,
    pub is_secret: bool,
}

/// Result of a node execution, one per node per run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeResult {
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_to_environment: Option<SaveToEnvironment>,
}

impl NodeResult {
    fn with_status(status: NodeStatus) -> Self {
        Self {
            status,
            data: None,
            error: None,
            status_code: None,
            headers: None,
            timestamp: utils::time::time_millis(),
            save_to_environment: None,
        }
    }

    pub fn idle() -> Self {
        Self::with_status(NodeStatus::Idle)
    }

    pub fn loading() -> Self {
        Self::with_status(NodeStatus::Loading)
    }

    pub fn success(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::with_status(NodeStatus::Success)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::with_status(NodeStatus::Error)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == NodeStatus::Success
    }
}

/// A node of the flow snapshot together with its decoded action.
#[derive(Clone)]
pub struct Node {
    /// node id
    pub id: NodeId,
    /// type tag as the editor wrote it
    pub type_tag: String,
    /// decoded node type, `None` for tags this runtime does not know
    pub uses: Option<ActionType>,
    /// node action, `None` for unsupported node types, an [`InvalidAction`]
    /// when the config did not decode
    pub action: Option<Arc<dyn Action>>,
}

impl fmt::Debug for Node {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Node").field("id", &self.id).field("type", &self.type_tag).field("uses", &self.uses).finish()
    }
}

impl Node {
    pub fn new(model: &NodeModel) -> Self {
        let uses = model.node_type.parse::<ActionType>().ok();

        let action = uses.map(|uses| {
            Self::create_action(uses, model.data.clone()).unwrap_or_else(|err| {
                warn!(nid = %model.id, node_type = %model.node_type, "invalid node config: {}", err);
                Arc::new(InvalidAction::new(uses, err.to_string()))
            })
        });

        Self {
            id: model.id.clone(),
            type_tag: model.node_type.clone(),
            uses,
            action,
        }
    }

    /// The static type -> handler table.
    fn create_action(
        uses: ActionType,
        params: Value,
    ) -> Result<Arc<dyn Action>> {
        let action: Arc<dyn Action> = match uses {
            ActionType::HttpRequest => Arc::new(HttpRequestAction::create(params)?),
            ActionType::Json => Arc::new(JsonAction::create(params)?),
            ActionType::SelectFields => Arc::new(SelectFieldsAction::create(params)?),
            ActionType::Delay => Arc::new(DelayAction::create(params)?),
            ActionType::VariableSet => Arc::new(VariableSetAction::create(params)?),
            ActionType::Transform => Arc::new(TransformAction::create(params)?),
            ActionType::Conditional => Arc::new(ConditionalAction::create(params)?),
            ActionType::Loop => Arc::new(LoopAction::create(params)?),
            ActionType::Export => Arc::new(ExportAction::create(params)?),
        };
        Ok(action)
    }
}
