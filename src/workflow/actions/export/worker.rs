//! Background export worker.
//!
//! Formatting runs on a blocking thread. The handler posts one
//! [`ExportRequest`] and reads back one [`ExportResponse`], after which the
//! worker exits.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::debug;

use crate::{FlowError, Result, common::Queue};

use super::format::{self, ExportFormat};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    pub format: ExportFormat,
    pub file_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub input_data: Vec<Value>,
    pub config: ExportSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handle one request, never panics on bad input.
pub fn handle(request: &ExportRequest) -> ExportResponse {
    let format = request.config.format;
    match format::render(&request.input_data, format) {
        Ok(content) => ExportResponse {
            success: true,
            file_content: Some(content),
            file_name: Some(format::file_name(&request.config.file_name, format)),
            mime_type: Some(format.mime_type().to_string()),
            error: None,
        },
        Err(err) => ExportResponse {
            success: false,
            error: Some(err.to_string()),
            ..Default::default()
        },
    }
}

/// Post `request` to a fresh worker and wait for its single reply.
pub async fn post(request: ExportRequest) -> Result<ExportResponse> {
    let runtime = Handle::try_current().map_err(|_| FlowError::Export("background workers are not supported".to_string()))?;

    let requests = Queue::<ExportRequest>::new(1);
    let responses = Queue::<ExportResponse>::new(1);

    let worker = {
        let requests = requests.clone();
        let responses = responses.clone();
        runtime.spawn_blocking(move || -> Result<()> {
            let request = requests.next().ok_or_else(|| FlowError::Export("export worker received no request".to_string()))?;
            debug!(records = request.input_data.len(), format = request.config.format.as_ref(), "export worker formatting");
            responses.send(handle(&request))
        })
    };

    requests.send_async(request).await?;
    worker.await.map_err(|err| FlowError::Export(format!("export worker stopped: {}", err)))??;

    responses.next_async().await.ok_or_else(|| FlowError::Export("export worker sent no response".to_string()))
}
