use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::{
    FlowError, Result,
    runtime::Context,
    workflow::{
        actions::{Action, ActionOutput, ActionType, NodeCall, decode},
        jsonpath,
    },
};

/// Largest array index an output path may write to.
const MAX_OUTPUT_INDEX: usize = 10_000;

fn enabled_by_default() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub input_path: String,
    pub output_path: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// Builds a fresh object out of values picked from the input.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TransformAction {
    #[serde(default)]
    mappings: Vec<Mapping>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Split an output path such as `$.user.tags[0]` or `items['a b']` into
/// its segments.
fn parse_output_path(path: &str) -> Result<Vec<Segment>> {
    let path = path.trim();
    let path = path.strip_prefix("$.").or_else(|| path.strip_prefix('$')).unwrap_or(path);

    let mut segments = Vec::new();
    let mut key = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '.' => flush_key(&mut key, &mut segments),
            '[' => {
                flush_key(&mut key, &mut segments);
                let mut inner = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed {
                    return Err(FlowError::Action(format!("unclosed '[' in output path '{}'", path)));
                }
                let inner = inner.trim();
                let unquoted = inner.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')).or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
                segments.push(match (unquoted, inner.parse::<usize>()) {
                    (Some(name), _) => Segment::Key(name.to_string()),
                    (None, Ok(index)) if index > MAX_OUTPUT_INDEX => {
                        return Err(FlowError::Action(format!("output path index too large: {} (max {})", index, MAX_OUTPUT_INDEX)));
                    }
                    (None, Ok(index)) => Segment::Index(index),
                    (None, Err(_)) => Segment::Key(inner.to_string()),
                });
            }
            _ => key.push(c),
        }
    }
    flush_key(&mut key, &mut segments);
    Ok(segments)
}

fn flush_key(
    key: &mut String,
    segments: &mut Vec<Segment>,
) {
    if !key.is_empty() {
        segments.push(Segment::Key(std::mem::take(key)));
    }
}

/// Write `value` at `segments`, creating objects and arrays on the way and
/// replacing anything in the way that has the wrong shape.
fn assign(
    target: &mut Value,
    segments: &[Segment],
    value: Value,
) {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return;
    };

    let slot = match first {
        Segment::Key(key) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            target.as_object_mut().map(|obj| obj.entry(key.clone()).or_insert(Value::Null))
        }
        Segment::Index(index) => {
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            target.as_array_mut().map(|arr| {
                if arr.len() <= *index {
                    arr.resize(*index + 1, Value::Null);
                }
                &mut arr[*index]
            })
        }
    };

    if let Some(slot) = slot {
        assign(slot, rest, value);
    }
}

#[async_trait]
impl Action for TransformAction {
    fn create(params: Value) -> Result<Self> {
        decode(params, &Self::schema())
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "mappings": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["inputPath", "outputPath"],
                        "properties": {
                            "inputPath": {
                                "type": "string",
                                "description": "JSONPath into the input, supports template variables"
                            },
                            "outputPath": {
                                "type": "string",
                                "description": "Dotted or bracket path in the output, supports template variables"
                            },
                            "enabled": { "type": "boolean" }
                        }
                    }
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Transform
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        call: NodeCall,
    ) -> Result<ActionOutput> {
        let input = call.input.unwrap_or(Value::Null);
        let mut output = Value::Object(Map::new());

        for mapping in self.mappings.iter().filter(|m| m.enabled) {
            let input_path = ctx.resolve_str(&mapping.input_path);
            let output_path = ctx.resolve_str(&mapping.output_path);

            let segments = parse_output_path(&output_path)?;
            if segments.is_empty() {
                debug!(run_id = ctx.run_id(), nid = %call.nid, input_path, "skipping mapping without output path");
                continue;
            }

            let value = jsonpath::unwrap_matches(jsonpath::query(&input_path, &input)?).unwrap_or(Value::Null);
            assign(&mut output, &segments, value);
        }

        Ok(ActionOutput::success(output))
    }
}
