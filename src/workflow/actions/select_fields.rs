use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Result,
    runtime::Context,
    workflow::{
        actions::{Action, ActionOutput, ActionType, NodeCall, decode},
        jsonpath,
    },
};

fn enabled_by_default() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FieldPath {
    pub path: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// Collects the matches of several JSONPath expressions into one array.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SelectFieldsAction {
    #[serde(default)]
    paths: Vec<FieldPath>,
}

impl SelectFieldsAction {
    fn select(
        &self,
        ctx: &Context,
        input: &Value,
    ) -> Result<Vec<Value>> {
        let mut selected = Vec::new();
        for field in self.paths.iter().filter(|p| p.enabled) {
            let path = ctx.resolve_str(&field.path);
            match jsonpath::unwrap_matches(jsonpath::query(&path, input)?) {
                Some(Value::Array(items)) => selected.extend(items),
                Some(value) => selected.push(value),
                None => {}
            }
        }
        Ok(selected)
    }
}

#[async_trait]
impl Action for SelectFieldsAction {
    fn create(params: Value) -> Result<Self> {
        decode(params, &Self::schema())
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "paths": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["path"],
                        "properties": {
                            "path": {
                                "type": "string",
                                "description": "JSONPath expression, supports template variables"
                            },
                            "enabled": { "type": "boolean" }
                        }
                    }
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::SelectFields
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        call: NodeCall,
    ) -> Result<ActionOutput> {
        let input = call.input.unwrap_or(Value::Null);
        let selected = self.select(&ctx, &input)?;
        Ok(ActionOutput::success(Value::Array(selected)))
    }
}
