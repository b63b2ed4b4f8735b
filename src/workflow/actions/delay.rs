use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Result,
    runtime::Context,
    workflow::actions::{Action, ActionOutput, ActionType, NodeCall, decode},
};

const DEFAULT_DELAY_MS: u64 = 1000;

fn default_delay() -> u64 {
    DEFAULT_DELAY_MS
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DelayAction {
    #[serde(default = "default_delay")]
    delay_ms: u64,
}

#[async_trait]
impl Action for DelayAction {
    fn create(params: Value) -> Result<Self> {
        decode(params, &Self::schema())
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "delayMs": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Pause in milliseconds before passing the input on"
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Delay
    }

    async fn run(
        &self,
        _: Arc<Context>,
        call: NodeCall,
    ) -> Result<ActionOutput> {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(ActionOutput::success(call.input.unwrap_or(Value::Null)))
    }
}
