//! Run orchestrator - the main entry point for Nodeflow.
//!
//! The engine owns the collaborators and the event channel shared by every
//! run, and starts runs in two ways:
//! - [`Engine::run_flow`] resets every node and starts at each root node
//! - [`Engine::execute_single_node`] starts at one chosen node without input
//!
//! Both return once every reachable branch has finished.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    FlowError, Result, RuntimeConfig,
    common::BroadcastQueue,
    dispatcher,
    events::FlowEvent,
    model::{Environment, FlowModel},
    runtime::{Collaborators, Context, RunId},
    utils,
    workflow::{
        Workflow,
        node::{NodeId, NodeResult, NodeStatus},
    },
};

/// Snapshot of a finished run.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: RunId,
    /// latest result per node
    pub results: HashMap<NodeId, NodeResult>,
    /// execution context variables at the end of the run
    pub context: HashMap<String, Value>,
}

impl RunReport {
    pub fn result(
        &self,
        nid: &str,
    ) -> Option<&NodeResult> {
        self.results.get(nid)
    }

    /// Status of `nid`, `Idle` for nodes that never ran.
    pub fn status(
        &self,
        nid: &str,
    ) -> NodeStatus {
        self.result(nid).map(|r| r.status).unwrap_or_default()
    }
}

/// The flow runtime.
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().http_proxy(proxy).build()?;
///
/// let workflow = Arc::new(Workflow::try_from(&model)?);
/// let report = engine.run_flow(workflow.clone(), environment.clone()).await;
/// let single = engine.execute_single_node(workflow, environment, "node-1").await?;
/// ```
pub struct Engine {
    config: Arc<RuntimeConfig>,
    collaborators: Collaborators,
    /// Event channel observers subscribe to.
    events: Arc<BroadcastQueue<FlowEvent>>,
}

impl Engine {
    pub(crate) fn new(
        config: RuntimeConfig,
        collaborators: Collaborators,
        events: Arc<BroadcastQueue<FlowEvent>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            collaborators,
            events,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Receive the events of every following run.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    /// Build the graph for a flow snapshot.
    pub fn load(
        &self,
        model: &FlowModel,
    ) -> Result<Arc<Workflow>> {
        let workflow = Workflow::try_from(model)?;
        debug!("flow loaded\n{}", workflow.schema());
        Ok(Arc::new(workflow))
    }

    /// Run the whole flow: reset every node to `idle`, then execute each root
    /// node (no incoming edge) in snapshot order.
    pub async fn run_flow(
        &self,
        workflow: Arc<Workflow>,
        environment: Environment,
    ) -> RunReport {
        let ctx = self.start_run(workflow.clone(), environment);

        let node_ids = workflow.get_all_node_ids();
        self.publish(FlowEvent::RunStarted {
            run_id: ctx.run_id().to_string(),
            node_ids: node_ids.clone(),
        });
        for nid in &node_ids {
            ctx.set_node_result(nid, NodeResult::idle());
        }

        let roots: Vec<NodeId> = workflow.get_root_nodes().into_iter().map(|node| node.id.clone()).collect();
        if roots.is_empty() {
            warn!(run_id = ctx.run_id(), "flow has no root nodes, nothing to run");
        }
        for root in roots {
            dispatcher::execute_node(ctx.clone(), root, None, 0).await;
        }

        self.finish_run(ctx)
    }

    /// Start execution at `nid` with no input. Its downstream edges are
    /// dispatched as usual.
    pub async fn execute_single_node(
        &self,
        workflow: Arc<Workflow>,
        environment: Environment,
        nid: &str,
    ) -> Result<RunReport> {
        if workflow.get_node(nid).is_none() {
            return Err(FlowError::Node(format!("node {} not found", nid)));
        }

        let ctx = self.start_run(workflow, environment);
        self.publish(FlowEvent::RunStarted {
            run_id: ctx.run_id().to_string(),
            node_ids: vec![nid.to_string()],
        });

        dispatcher::execute_node(ctx.clone(), nid.to_string(), None, 0).await;

        Ok(self.finish_run(ctx))
    }

    fn start_run(
        &self,
        workflow: Arc<Workflow>,
        environment: Environment,
    ) -> Arc<Context> {
        let run_id = utils::longid();
        info!(run_id = %run_id, "run started");
        Arc::new(Context::new(run_id, workflow, Arc::new(environment), self.collaborators.clone(), self.config.clone()))
    }

    fn finish_run(
        &self,
        ctx: Arc<Context>,
    ) -> RunReport {
        let report = RunReport {
            run_id: ctx.run_id().to_string(),
            results: ctx.results(),
            context: ctx.vars(),
        };

        let failed = report.results.values().filter(|r| r.status == NodeStatus::Error).count();
        info!(run_id = %report.run_id, nodes = report.results.len(), failed, "run finished");
        self.publish(FlowEvent::RunFinished {
            run_id: report.run_id.clone(),
        });
        report
    }

    fn publish(
        &self,
        event: FlowEvent,
    ) {
        if let Err(err) = self.events.send(event) {
            error!("failed to publish flow event: {}", err);
        }
    }
}
