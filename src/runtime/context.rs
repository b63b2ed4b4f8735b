use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use tracing::error;

use crate::{
    RuntimeConfig,
    common::MemCache,
    model::Environment,
    runtime::{ConfigSink, EnvironmentSink, ExportSink, HttpProxy, ResultSink, RunId},
    workflow::{
        Workflow,
        node::{NodeId, NodeResult, SaveToEnvironment},
        template::Resolver,
    },
};

/// The external collaborators a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub http: Arc<dyn HttpProxy>,
    pub results: Arc<dyn ResultSink>,
    pub node_data: Arc<dyn ConfigSink>,
    pub environment: Arc<dyn EnvironmentSink>,
    pub export: Arc<dyn ExportSink>,
}

/// Run caches hold at least one entry per node, so no result of the run is
/// ever evicted.
fn cache_capacity(
    config: &RuntimeConfig,
    workflow: &Workflow,
) -> usize {
    config.cache_capacity.max(workflow.get_all_node_ids().len())
}

/// Everything one run reads and writes.
///
/// A context is created fresh for each run, so results and execution context
/// variables of earlier runs are never visible.
pub struct Context {
    run_id: RunId,
    workflow: Arc<Workflow>,
    environment: Arc<Environment>,
    vars: MemCache<String, Value>,
    results: MemCache<NodeId, NodeResult>,
    collaborators: Collaborators,
    config: Arc<RuntimeConfig>,
}

impl Context {
    pub fn new(
        run_id: RunId,
        workflow: Arc<Workflow>,
        environment: Arc<Environment>,
        collaborators: Collaborators,
        config: Arc<RuntimeConfig>,
    ) -> Self {
        let capacity = cache_capacity(&config, &workflow);
        Self {
            run_id,
            workflow,
            environment,
            vars: MemCache::new(capacity),
            results: MemCache::new(capacity),
            collaborators,
            config,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn workflow(&self) -> Arc<Workflow> {
        self.workflow.clone()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn http(&self) -> Arc<dyn HttpProxy> {
        self.collaborators.http.clone()
    }

    pub fn export_sink(&self) -> Arc<dyn ExportSink> {
        self.collaborators.export.clone()
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.environment, &self.vars, &self.results, self.config.max_template_depth)
    }

    /// Resolve an optional template field.
    pub fn resolve(
        &self,
        template: Option<&str>,
    ) -> Option<String> {
        self.resolver().resolve(template)
    }

    pub fn resolve_str(
        &self,
        template: &str,
    ) -> String {
        self.resolver().resolve_str(template)
    }

    /// Write an execution context variable.
    pub fn set_var(
        &self,
        name: impl Into<String>,
        value: Value,
    ) {
        self.vars.set(name.into(), value);
    }

    pub fn get_var(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.vars.get(&name.to_string())
    }

    pub fn vars(&self) -> HashMap<String, Value> {
        self.vars.snapshot()
    }

    pub fn node_result(
        &self,
        nid: &str,
    ) -> Option<NodeResult> {
        self.results.get(&nid.to_string())
    }

    pub fn results(&self) -> HashMap<NodeId, NodeResult> {
        self.results.snapshot()
    }

    /// Record a node result and forward it to the result sink.
    pub fn set_node_result(
        &self,
        nid: &str,
        result: NodeResult,
    ) {
        self.collaborators.results.set_node_result(&self.run_id, nid, &result);
        self.results.set(nid.to_string(), result);
    }

    pub fn update_node_data(
        &self,
        nid: &str,
        patch: &Value,
    ) {
        self.collaborators.node_data.update_node_data(&self.run_id, nid, patch);
    }

    /// Hand a save instruction to the environment store, failures are only logged.
    pub fn save_to_environment(
        &self,
        nid: &str,
        instruction: &SaveToEnvironment,
    ) {
        if let Err(err) = self.collaborators.environment.commit(instruction) {
            error!(run_id = %self.run_id, nid, variable = %instruction.variable_name, "failed to save environment variable: {}", err);
        }
    }
}
