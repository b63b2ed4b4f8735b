//! Collaborator boundaries the runtime writes into.
//!
//! The runtime only ever calls these, it never reads state back through them.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::error;

use crate::{
    FlowError, Result, ShareLock,
    common::BroadcastQueue,
    events::FlowEvent,
    model::{Environment, EnvironmentVariable},
    workflow::node::{NodeResult, SaveToEnvironment},
};

/// Receives every node status change of a run.
pub trait ResultSink: Send + Sync {
    fn set_node_result(
        &self,
        run_id: &str,
        nid: &str,
        result: &NodeResult,
    );
}

/// Receives node config patches.
pub trait ConfigSink: Send + Sync {
    fn update_node_data(
        &self,
        run_id: &str,
        nid: &str,
        patch: &Value,
    );
}

/// Persists variables that nodes asked to save into the environment.
pub trait EnvironmentSink: Send + Sync {
    fn commit(
        &self,
        instruction: &SaveToEnvironment,
    ) -> Result<()>;
}

/// A rendered export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub mime_type: String,
    pub content: String,
}

/// Delivers rendered exports to the user (download, file, upload...).
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn deliver(
        &self,
        file: ExportedFile,
    ) -> Result<()>;
}

/// Publishes results and config patches as [`FlowEvent`]s.
#[derive(Clone)]
pub struct ChannelSink {
    queue: Arc<BroadcastQueue<FlowEvent>>,
}

impl ChannelSink {
    pub fn new(queue: Arc<BroadcastQueue<FlowEvent>>) -> Self {
        Self {
            queue,
        }
    }
}

impl ResultSink for ChannelSink {
    fn set_node_result(
        &self,
        run_id: &str,
        nid: &str,
        result: &NodeResult,
    ) {
        let event = FlowEvent::NodeResult {
            run_id: run_id.to_string(),
            nid: nid.to_string(),
            result: result.clone(),
        };
        if let Err(err) = self.queue.send(event) {
            error!(run_id, nid, "failed to publish node result: {}", err);
        }
    }
}

impl ConfigSink for ChannelSink {
    fn update_node_data(
        &self,
        run_id: &str,
        nid: &str,
        patch: &Value,
    ) {
        let event = FlowEvent::NodeData {
            run_id: run_id.to_string(),
            nid: nid.to_string(),
            patch: patch.clone(),
        };
        if let Err(err) = self.queue.send(event) {
            error!(run_id, nid, "failed to publish node data: {}", err);
        }
    }
}

/// In-memory environment store, upserting committed variables.
#[derive(Clone, Default)]
pub struct MemEnvironmentStore {
    variables: ShareLock<Vec<EnvironmentVariable>>,
}

impl MemEnvironmentStore {
    pub fn new(variables: Vec<EnvironmentVariable>) -> Self {
        Self {
            variables: ShareLock::new(variables.into()),
        }
    }

    /// Environment for the next run.
    pub fn snapshot(&self) -> Environment {
        Environment::new(self.variables())
    }

    pub fn variables(&self) -> Vec<EnvironmentVariable> {
        self.variables.read().map(|vars| vars.clone()).unwrap_or_default()
    }
}

impl EnvironmentSink for MemEnvironmentStore {
    fn commit(
        &self,
        instruction: &SaveToEnvironment,
    ) -> Result<()> {
        let mut variables = self.variables.write().map_err(|e| FlowError::Runtime(e.to_string()))?;
        match variables.iter_mut().find(|v| v.key == instruction.variable_name) {
            Some(existing) => {
                existing.value = instruction.value.clone();
                existing.is_secret = instruction.is_secret;
                existing.enabled = true;
            }
            None => {
                let mut variable = EnvironmentVariable::new(&instruction.variable_name, &instruction.value);
                variable.is_secret = instruction.is_secret;
                variables.push(variable);
            }
        }
        Ok(())
    }
}

/// Writes exports into a directory.
#[derive(Debug, Clone)]
pub struct FsExportSink {
    dir: std::path::PathBuf,
}

impl FsExportSink {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            dir: dir.into(),
        }
    }
}

#[async_trait]
impl ExportSink for FsExportSink {
    async fn deliver(
        &self,
        file: ExportedFile,
    ) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        // keep the write inside the export directory
        let name = std::path::Path::new(&file.file_name).file_name().ok_or_else(|| FlowError::Export(format!("invalid file name '{}'", file.file_name)))?;
        tokio::fs::write(self.dir.join(name), file.content.as_bytes()).await?;
        Ok(())
    }
}

/// Discards everything, for embedders that only need the run report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ResultSink for NoopSink {
    fn set_node_result(
        &self,
        _: &str,
        _: &str,
        _: &NodeResult,
    ) {
    }
}

impl ConfigSink for NoopSink {
    fn update_node_data(
        &self,
        _: &str,
        _: &str,
        _: &Value,
    ) {
    }
}
