use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    FlowError, Result,
    runtime::Context,
    workflow::actions::{Action, ActionOutput, ActionType, NodeCall},
};

/// Stands in for a node whose config failed to decode.
///
/// The snapshot still loads; the decode error only surfaces as this node's
/// `error` result once it is dispatched.
#[derive(Debug, Clone)]
pub struct InvalidAction {
    uses: ActionType,
    message: String,
}

impl InvalidAction {
    pub fn new(
        uses: ActionType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            uses,
            message: message.into(),
        }
    }
}

#[async_trait]
impl Action for InvalidAction {
    fn create(_: Value) -> Result<Self> {
        Err(FlowError::Node("an invalid action is only built from a decode error".to_string()))
    }

    fn schema() -> Value {
        json!({})
    }

    fn action_type(&self) -> ActionType {
        self.uses
    }

    async fn run(
        &self,
        _: Arc<Context>,
        _: NodeCall,
    ) -> Result<ActionOutput> {
        Err(FlowError::Node(format!("invalid {} config: {}", self.uses.as_ref(), self.message)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{runtime::testing::*, workflow::node::NodeStatus};

    #[tokio::test]
    async fn test_decode_error_becomes_node_error() {
        let harness = Harness::new(json!({
            "nodes": [
                { "id": "wait", "type": "delay", "data": { "delayMs": "soon" } },
                { "id": "after", "type": "json", "data": {} }
            ],
            "edges": [{ "id": "e1", "source": "wait", "target": "after" }]
        }));

        let result = harness.run("wait", Some(json!(1))).await;

        assert_eq!(result.status, NodeStatus::Error);
        assert!(result.error.unwrap().starts_with("invalid delay config"));
        assert_eq!(harness.sink.statuses("wait"), vec!["loading", "error"]);
        assert!(harness.result("after").is_none());
    }
}
