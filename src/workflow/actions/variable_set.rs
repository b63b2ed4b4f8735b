use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    FlowError, Result,
    runtime::Context,
    workflow::{
        actions::{Action, ActionOutput, ActionType, NodeCall, decode},
        consts::OUTPUT_HANDLE,
        node::SaveToEnvironment,
    },
};

/// Where a variable-set node writes its value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum VariableTarget {
    /// the run's execution context, visible through `{{context.NAME}}`
    #[default]
    FlowContext,
    /// the persistent environment, applied by the environment store
    SelectedEnvironment,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VariableSetAction {
    #[serde(default)]
    variable_name: String,
    #[serde(default)]
    variable_value: String,
    #[serde(default)]
    target: VariableTarget,
    #[serde(default)]
    is_secret: bool,
}

#[async_trait]
impl Action for VariableSetAction {
    fn create(params: Value) -> Result<Self> {
        decode(params, &Self::schema())
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "variableName": { "type": "string" },
                "variableValue": {
                    "type": "string",
                    "description": "Value to store, supports template variables"
                },
                "target": {
                    "type": "string",
                    "enum": ["flowContext", "selectedEnvironment"]
                },
                "isSecret": { "type": "boolean" }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::VariableSet
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        call: NodeCall,
    ) -> Result<ActionOutput> {
        let name = self.variable_name.trim();
        if name.is_empty() {
            return Err(FlowError::Action("variable name is required".to_string()));
        }

        let value = ctx.resolve_str(&self.variable_value);
        let input = call.input.unwrap_or(Value::Null);

        match self.target {
            VariableTarget::SelectedEnvironment => {
                debug!(run_id = ctx.run_id(), nid = %call.nid, variable = name, "saving variable to environment");
                Ok(ActionOutput::success(input)
                    .with_route(OUTPUT_HANDLE, Value::String(value.clone()))
                    .with_save_to_environment(SaveToEnvironment {
                        variable_name: name.to_string(),
                        value,
                        is_secret: self.is_secret,
                    }))
            }
            VariableTarget::FlowContext => {
                ctx.set_var(name, Value::String(value.clone()));
                Ok(ActionOutput::success(input).with_route(OUTPUT_HANDLE, Value::String(value)))
            }
        }
    }
}
