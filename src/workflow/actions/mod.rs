pub mod conditional;
pub mod delay;
pub mod export;
pub mod http_request;
pub mod invalid;
pub mod json;
pub mod loop_over;
pub mod select_fields;
pub mod transform;
pub mod variable_set;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    Result,
    runtime::Context,
    workflow::{
        consts::OUTPUT_HANDLE,
        node::{NodeId, NodeResult, NodeStatus, SaveToEnvironment},
    },
};

pub use conditional::ConditionalAction;
pub use delay::DelayAction;
pub use export::ExportAction;
pub use http_request::HttpRequestAction;
pub use invalid::InvalidAction;
pub use json::JsonAction;
pub use loop_over::LoopAction;
pub use select_fields::SelectFieldsAction;
pub use transform::TransformAction;
pub use variable_set::VariableSetAction;

/// The closed set of node types, keyed by the editor's type tag.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ActionType {
    HttpRequest,
    Json,
    SelectFields,
    Delay,
    VariableSet,
    Transform,
    Conditional,
    Loop,
    Export,
}

/// One invocation of a node within a run.
#[derive(Debug, Clone)]
pub struct NodeCall {
    /// the node being executed
    pub nid: NodeId,
    /// payload handed over by the upstream node, `None` for roots
    pub input: Option<Value>,
    /// dispatch nesting of this call
    pub depth: usize,
}

#[async_trait]
pub trait Action: Send + Sync {
    /// Creates a new instance of the action from the node's config.
    ///
    /// # Arguments
    ///
    /// * `params` - The [`serde_json::Value`] holding the node's `data`.
    ///
    /// # Returns
    ///
    /// Returns a [`Result`] containing the created action instance.
    fn create(params: Value) -> Result<Self>
    where
        Self: Sized;

    /// Returns the JSON schema the node config must satisfy.
    fn schema() -> Value
    where
        Self: Sized;

    /// Returns the type of the action.
    fn action_type(&self) -> ActionType;

    /// Performs the node's type-specific work.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The [`Context`] of the current run.
    /// * `call` - The node id, its input and its dispatch depth.
    ///
    /// # Returns
    ///
    /// Returns the [`ActionOutput`] to record, or an error that the node
    /// lifecycle turns into an `error` result.
    async fn run(
        &self,
        ctx: Arc<Context>,
        call: NodeCall,
    ) -> Result<ActionOutput>;
}

/// Validate `params` against `schema` and decode them.
pub(crate) fn decode<T: DeserializeOwned>(
    params: Value,
    schema: &Value,
) -> Result<T> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    jsonschema::validate(schema, &params)?;
    Ok(serde_json::from_value::<T>(params)?)
}

/// The downstream handle to fire and the payload it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub handle: String,
    pub payload: Value,
}

/// Output returned by an action's run method
#[derive(Debug, Clone)]
pub struct ActionOutput {
    /// terminal status, `Success` or `Error`
    pub status: NodeStatus,
    /// recorded result data
    pub data: Value,
    /// error message for failed outputs
    pub error: Option<String>,
    pub status_code: Option<u16>,
    pub headers: Option<HashMap<String, String>>,
    pub save_to_environment: Option<SaveToEnvironment>,
    /// handle dispatched after the result is recorded
    pub next: Option<Route>,
}

impl ActionOutput {
    /// A successful output that forwards `data` on the `output` handle.
    pub fn success(data: Value) -> Self {
        Self {
            status: NodeStatus::Success,
            data: data.clone(),
            error: None,
            status_code: None,
            headers: None,
            save_to_environment: None,
            next: Some(Route {
                handle: OUTPUT_HANDLE.to_string(),
                payload: data,
            }),
        }
    }

    /// A failed output, nothing downstream fires.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: NodeStatus::Error,
            data: Value::Null,
            error: Some(error.into()),
            status_code: None,
            headers: None,
            save_to_environment: None,
            next: None,
        }
    }

    pub fn with_route(
        mut self,
        handle: impl Into<String>,
        payload: Value,
    ) -> Self {
        self.next = Some(Route {
            handle: handle.into(),
            payload,
        });
        self
    }

    pub fn with_data(
        mut self,
        data: Value,
    ) -> Self {
        self.data = data;
        self
    }

    pub fn with_status_code(
        mut self,
        status_code: u16,
    ) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_headers(
        mut self,
        headers: HashMap<String, String>,
    ) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_save_to_environment(
        mut self,
        instruction: SaveToEnvironment,
    ) -> Self {
        self.save_to_environment = Some(instruction);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == NodeStatus::Success
    }

    /// The result recorded for this output.
    pub fn to_result(&self) -> NodeResult {
        let mut result = match self.status {
            NodeStatus::Success => NodeResult::success(self.data.clone()),
            _ => {
                let mut failed = NodeResult::error(self.error.clone().unwrap_or_default());
                if !self.data.is_null() {
                    failed.data = Some(self.data.clone());
                }
                failed
            }
        };
        result.status_code = self.status_code;
        result.headers = self.headers.clone();
        result.save_to_environment = self.save_to_environment.clone();
        result
    }
}
