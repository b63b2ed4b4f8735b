use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    FlowError, Result,
    runtime::Context,
    workflow::actions::{Action, ActionOutput, ActionType, NodeCall, decode},
};

const JSON_DATA_KEY: &str = "jsonData";

/// Passes its input through, or emits its own configured document when it
/// starts a run.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct JsonAction {
    #[serde(default)]
    json_data: Option<Value>,
}

impl JsonAction {
    fn configured_data(
        &self,
        ctx: &Context,
    ) -> Result<Value> {
        match &self.json_data {
            None => Ok(Value::Null),
            Some(Value::String(text)) => {
                let resolved = ctx.resolve_str(text);
                if resolved.trim().is_empty() {
                    return Ok(Value::Null);
                }
                serde_json::from_str(&resolved).map_err(|err| FlowError::Action(format!("invalid JSON data: {}", err)))
            }
            Some(value) => Ok(ctx.resolver().resolve_json_value(value)),
        }
    }
}

#[async_trait]
impl Action for JsonAction {
    fn create(params: Value) -> Result<Self> {
        decode(params, &Self::schema())
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "jsonData": {
                    "description": "Document emitted when the node has no input, JSON text or inline JSON"
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Json
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        call: NodeCall,
    ) -> Result<ActionOutput> {
        match call.input {
            Some(input) => {
                ctx.update_node_data(&call.nid, &json!({ JSON_DATA_KEY: input }));
                Ok(ActionOutput::success(input))
            }
            None => Ok(ActionOutput::success(self.configured_data(&ctx)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{model::EnvironmentVariable, runtime::testing::*, workflow::node::NodeStatus};

    fn single(data: serde_json::Value) -> serde_json::Value {
        json!({ "nodes": [{ "id": "j", "type": "json", "data": data }], "edges": [] })
    }

    #[tokio::test]
    async fn test_passthrough_writes_config() {
        let harness = Harness::new(single(json!({})));
        let result = harness.run("j", Some(json!({ "a": [1, 2] }))).await;

        assert_eq!(result.data, Some(json!({ "a": [1, 2] })));
        let patches = harness.sink.patches.lock().unwrap().clone();
        assert_eq!(patches, vec![("j".to_string(), json!({ "jsonData": { "a": [1, 2] } }))]);
    }

    #[tokio::test]
    async fn test_root_emits_configured_text() {
        let harness = Harness::with(
            single(json!({ "jsonData": "{\"host\": \"{{env.HOST}}\"}" })),
            vec![EnvironmentVariable::new("HOST", "example.com")],
            MockProxy::replying(200, json!(null)),
        );
        let result = harness.run("j", None).await;
        assert_eq!(result.data, Some(json!({ "host": "example.com" })));
    }

    #[tokio::test]
    async fn test_root_emits_inline_json() {
        let harness = Harness::new(single(json!({ "jsonData": { "items": [1, 2, 3] } })));
        let result = harness.run("j", None).await;
        assert_eq!(result.data, Some(json!({ "items": [1, 2, 3] })));
    }

    #[tokio::test]
    async fn test_root_invalid_text_fails() {
        let harness = Harness::new(single(json!({ "jsonData": "{not json" })));
        let result = harness.run("j", None).await;
        assert_eq!(result.status, NodeStatus::Error);
        assert!(result.error.unwrap().contains("invalid JSON data"));
    }
}
