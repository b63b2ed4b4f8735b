use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    FlowError, Result, dispatcher,
    runtime::Context,
    workflow::{
        actions::{Action, ActionOutput, ActionType, NodeCall, decode},
        consts::{LOOP_BODY_HANDLE, LOOP_END_HANDLE},
        jsonpath,
    },
};

/// Runs the `loopBody` subtree once per array item, then `loopEnd` once.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoopAction {
    #[serde(default)]
    input_array_path: String,
}

#[async_trait]
impl Action for LoopAction {
    fn create(params: Value) -> Result<Self> {
        decode(params, &Self::schema())
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "inputArrayPath": {
                    "type": "string",
                    "description": "JSONPath to the array to iterate, supports template variables"
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Loop
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        call: NodeCall,
    ) -> Result<ActionOutput> {
        let path = ctx.resolve_str(&self.input_array_path);
        if path.trim().is_empty() {
            return Err(FlowError::Action("input array path is required".to_string()));
        }

        let input = call.input.unwrap_or(Value::Null);
        let items = match jsonpath::unwrap_matches(jsonpath::query(&path, &input)?) {
            Some(Value::Array(items)) => items,
            _ => return Err(FlowError::Action(format!("path '{}' did not resolve to an array", path))),
        };

        let item_count = items.len();
        for (index, item) in items.into_iter().enumerate() {
            debug!(run_id = ctx.run_id(), nid = %call.nid, index, item_count, "loop iteration");
            dispatcher::trigger_next_nodes(ctx.clone(), call.nid.clone(), LOOP_BODY_HANDLE.to_string(), item, call.depth).await;
        }

        Ok(ActionOutput::success(json!({ "itemCount": item_count })).with_route(LOOP_END_HANDLE, input))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{runtime::testing::*, workflow::node::NodeStatus};

    fn flow(path: &str) -> serde_json::Value {
        json!({
            "nodes": [
                { "id": "loop", "type": "loop", "data": { "inputArrayPath": path } },
                { "id": "body", "type": "delay", "data": { "delayMs": 5 } },
                { "id": "body_after", "type": "json", "data": {} },
                { "id": "end", "type": "json", "data": {} }
            ],
            "edges": [
                { "id": "e1", "source": "loop", "target": "body", "sourceHandle": "loopBody" },
                { "id": "e2", "source": "body", "target": "body_after" },
                { "id": "e3", "source": "loop", "target": "end", "sourceHandle": "loopEnd" }
            ]
        })
    }

    #[tokio::test]
    async fn test_iterations_run_in_order_then_end_once() {
        let harness = Harness::new(flow("$.items"));
        let input = json!({ "items": ["a", "b"] });
        let result = harness.run("loop", Some(input.clone())).await;

        assert_eq!(result.data, Some(json!({ "itemCount": 2 })));

        let trace: Vec<(String, String)> = harness
            .sink
            .results
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.is_success())
            .map(|(id, r)| (id.clone(), r.data.clone().unwrap_or_default().to_string()))
            .collect();
        assert_eq!(
            trace,
            vec![
                ("body".to_string(), "\"a\"".to_string()),
                ("body_after".to_string(), "\"a\"".to_string()),
                ("body".to_string(), "\"b\"".to_string()),
                ("body_after".to_string(), "\"b\"".to_string()),
                ("loop".to_string(), json!({ "itemCount": 2 }).to_string()),
                ("end".to_string(), input.to_string()),
            ]
        );
        assert_eq!(harness.sink.statuses("end"), vec!["loading", "success"]);
    }

    #[tokio::test]
    async fn test_empty_array_still_ends() {
        let harness = Harness::new(flow("items"));
        let result = harness.run("loop", Some(json!({ "items": [] }))).await;

        assert_eq!(result.data, Some(json!({ "itemCount": 0 })));
        assert!(harness.result("body").is_none());
        assert!(harness.result("end").unwrap().is_success());
    }

    #[tokio::test]
    async fn test_non_array_fails() {
        let harness = Harness::new(flow("$.items"));
        let result = harness.run("loop", Some(json!({ "items": "nope" }))).await;

        assert_eq!(result.status, NodeStatus::Error);
        assert!(result.error.unwrap().contains("did not resolve to an array"));
        assert!(harness.result("end").is_none());
    }

    #[tokio::test]
    async fn test_missing_path_fails() {
        let harness = Harness::new(flow(""));
        let result = harness.run("loop", Some(json!([1]))).await;
        assert_eq!(result.status, NodeStatus::Error);
    }
}
