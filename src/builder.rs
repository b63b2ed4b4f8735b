use std::{path::Path, sync::Arc, time::Duration};

use crate::{
    Engine, Result, RuntimeConfig,
    common::BroadcastQueue,
    events::FlowEvent,
    runtime::{ChannelSink, Collaborators, ConfigSink, EnvironmentSink, ExportSink, FsExportSink, HttpProxy, MemEnvironmentStore, ReqwestProxy, ResultSink},
};

/// Buffered events per subscriber before slow observers start lagging.
const EVENT_QUEUE_SIZE: usize = 1024;

/// Assembles an [`Engine`] from config and collaborators.
///
/// Every collaborator is optional: results and config patches default to a
/// [`ChannelSink`] on the engine's event channel, HTTP to a [`ReqwestProxy`],
/// the environment store to a [`MemEnvironmentStore`] and export delivery to
/// a [`FsExportSink`] on `export.output_dir`.
pub struct EngineBuilder {
    config: RuntimeConfig,
    event_queue_size: usize,
    http: Option<Arc<dyn HttpProxy>>,
    results: Option<Arc<dyn ResultSink>>,
    node_data: Option<Arc<dyn ConfigSink>>,
    environment: Option<Arc<dyn EnvironmentSink>>,
    export: Option<Arc<dyn ExportSink>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: RuntimeConfig::default(),
            event_queue_size: EVENT_QUEUE_SIZE,
            http: None,
            results: None,
            node_data: None,
            environment: None,
            export: None,
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: RuntimeConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Load the config from a TOML file.
    pub fn config_file<T: AsRef<Path>>(
        mut self,
        path: T,
    ) -> Result<Self> {
        self.config = RuntimeConfig::create(path)?;
        Ok(self)
    }

    pub fn event_queue_size(
        mut self,
        n: usize,
    ) -> Self {
        self.event_queue_size = n;
        self
    }

    pub fn http_proxy(
        mut self,
        http: Arc<dyn HttpProxy>,
    ) -> Self {
        self.http = Some(http);
        self
    }

    pub fn result_sink(
        mut self,
        results: Arc<dyn ResultSink>,
    ) -> Self {
        self.results = Some(results);
        self
    }

    pub fn config_sink(
        mut self,
        node_data: Arc<dyn ConfigSink>,
    ) -> Self {
        self.node_data = Some(node_data);
        self
    }

    pub fn environment_sink(
        mut self,
        environment: Arc<dyn EnvironmentSink>,
    ) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn export_sink(
        mut self,
        export: Arc<dyn ExportSink>,
    ) -> Self {
        self.export = Some(export);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let events = BroadcastQueue::<FlowEvent>::new(self.event_queue_size);
        let channel = Arc::new(ChannelSink::new(events.clone()));

        let http: Arc<dyn HttpProxy> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestProxy::new(Duration::from_millis(self.config.http.timeout_ms))?),
        };

        let collaborators = Collaborators {
            http,
            results: self.results.unwrap_or_else(|| channel.clone()),
            node_data: self.node_data.unwrap_or_else(|| channel.clone()),
            environment: self.environment.unwrap_or_else(|| Arc::new(MemEnvironmentStore::default())),
            export: self.export.unwrap_or_else(|| Arc::new(FsExportSink::new(&self.config.export.output_dir))),
        };

        Ok(Engine::new(self.config, collaborators, events))
    }
}
