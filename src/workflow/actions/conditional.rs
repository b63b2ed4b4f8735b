use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    Result,
    runtime::Context,
    workflow::{
        actions::{Action, ActionOutput, ActionType, NodeCall, decode},
        consts::DEFAULT_CONDITION_HANDLE,
    },
};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub expression: String,
    pub output_handle_id: String,
}

fn default_handle() -> String {
    DEFAULT_CONDITION_HANDLE.to_string()
}

/// Routes its input to the handle of the first truthy condition.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalAction {
    #[serde(default)]
    conditions: Vec<Condition>,
    #[serde(default = "default_handle")]
    default_output_handle_id: String,
}

/// Truthiness of a resolved expression. This is a string check, not an
/// expression language: `"true"` and any other non-empty text are true,
/// `"false"`, `"null"`, `"undefined"`, `"0"` and `""` are false.
pub fn is_truthy(resolved: &str) -> bool {
    !matches!(resolved, "" | "false" | "null" | "undefined" | "0")
}

impl ConditionalAction {
    fn select_handle(
        &self,
        ctx: &Context,
    ) -> &str {
        self.conditions
            .iter()
            .find(|condition| is_truthy(&ctx.resolve_str(&condition.expression)))
            .map(|condition| condition.output_handle_id.as_str())
            .unwrap_or(&self.default_output_handle_id)
    }
}

#[async_trait]
impl Action for ConditionalAction {
    fn create(params: Value) -> Result<Self> {
        decode(params, &Self::schema())
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "conditions": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["expression", "outputHandleId"],
                        "properties": {
                            "expression": {
                                "type": "string",
                                "description": "Resolved then checked for truthiness, supports template variables"
                            },
                            "outputHandleId": { "type": "string" }
                        }
                    }
                },
                "defaultOutputHandleId": { "type": "string" }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Conditional
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        call: NodeCall,
    ) -> Result<ActionOutput> {
        let input = call.input.unwrap_or(Value::Null);
        let handle = self.select_handle(&ctx);
        debug!(run_id = ctx.run_id(), nid = %call.nid, handle, "condition selected");
        Ok(ActionOutput::success(input.clone()).with_route(handle, input))
    }
}
