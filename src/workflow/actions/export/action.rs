use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    FlowError, Result,
    runtime::{Context, ExportedFile},
    workflow::actions::{Action, ActionOutput, ActionType, NodeCall, decode},
};

use super::{
    format::ExportFormat,
    worker::{self, ExportRequest, ExportSettings},
};

/// Renders its input into a file and hands it to the export sink.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExportAction {
    #[serde(default)]
    format: ExportFormat,
    #[serde(default)]
    file_name: String,
}

#[async_trait]
impl Action for ExportAction {
    fn create(params: Value) -> Result<Self> {
        decode(params, &Self::schema())
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "enum": ["csv", "json", "txt", "html", "markdown"]
                },
                "fileName": {
                    "type": "string",
                    "description": "File name without extension, supports template variables"
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Export
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        call: NodeCall,
    ) -> Result<ActionOutput> {
        let records = match call.input {
            None | Some(Value::Null) => return Err(FlowError::Action("no input data to export".to_string())),
            Some(Value::Array(items)) => items,
            Some(value) => vec![value],
        };
        let record_count = records.len();

        let response = worker::post(ExportRequest {
            input_data: records,
            config: ExportSettings {
                format: self.format,
                file_name: ctx.resolve_str(&self.file_name),
            },
        })
        .await?;

        let (true, Some(content), Some(file_name), Some(mime_type)) = (response.success, response.file_content, response.file_name, response.mime_type) else {
            return Err(FlowError::Export(response.error.unwrap_or_else(|| "export failed".to_string())));
        };

        ctx.export_sink()
            .deliver(ExportedFile {
                file_name: file_name.clone(),
                mime_type,
                content,
            })
            .await?;
        info!(run_id = ctx.run_id(), nid = %call.nid, file_name = %file_name, record_count, "exported");

        Ok(ActionOutput::success(json!({
            "exportedFormat": self.format.as_ref(),
            "fileName": file_name,
            "recordCount": record_count,
        })))
    }
}
