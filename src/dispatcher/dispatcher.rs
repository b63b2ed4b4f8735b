//! Flow dispatcher for executing nodes and walking their outgoing edges.
//!
//! The dispatcher is responsible for:
//! - Running a node through its lifecycle (`loading` -> `success` | `error`)
//! - Selecting the edges listening on the handle a node emitted
//! - Executing their targets one after another, depth-first
//!
//! Every call awaits its whole downstream subtree before returning, so a
//! fan-out costs the sum of its branches and a loop iteration finishes before
//! the next one starts.

use std::{sync::Arc, time::Duration};

use futures::{FutureExt, future::BoxFuture};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::{
    FlowError,
    runtime::Context,
    workflow::{
        actions::{ActionOutput, NodeCall},
        node::{NodeId, NodeResult},
    },
};

/// Executes a single node and, on success, everything downstream of the
/// handle it emitted.
///
/// Failures never escape: whatever goes wrong is recorded as the node's
/// `error` result and stops only this node's own dispatch.
pub fn execute_node(
    ctx: Arc<Context>,
    nid: NodeId,
    input: Option<Value>,
    depth: usize,
) -> BoxFuture<'static, NodeResult> {
    async move {
        let workflow = ctx.workflow();

        let Some(node) = workflow.get_node(&nid) else {
            return NodeResult::error(format!("node {} not found", nid));
        };
        let Some(action) = node.action.clone() else {
            warn!(run_id = ctx.run_id(), nid = %nid, node_type = %node.type_tag, "skipping node of unsupported type");
            return NodeResult::idle();
        };

        ctx.set_node_result(&nid, NodeResult::loading());

        let call = NodeCall {
            nid: nid.clone(),
            input,
            depth,
        };
        let run_future = action.run(ctx.clone(), call);
        let ret = match ctx.config().node_timeout_ms {
            Some(timeout) => match tokio::time::timeout(Duration::from_millis(timeout), run_future).await {
                Ok(ret) => ret,
                Err(_) => Err(FlowError::Runtime(format!("node timed out after {}ms", timeout))),
            },
            None => run_future.await,
        };

        let output = ret.unwrap_or_else(|err| ActionOutput::failed(err.to_string()));
        let result = output.to_result();
        ctx.set_node_result(&nid, result.clone());

        if !output.is_success() {
            error!(run_id = ctx.run_id(), nid = %nid, "node failed: {}", result.error.as_deref().unwrap_or_default());
            return result;
        }

        if let Some(instruction) = &output.save_to_environment {
            ctx.save_to_environment(&nid, instruction);
        }

        if let Some(route) = output.next {
            trigger_next_nodes(ctx.clone(), nid, route.handle, route.payload, depth).await;
        }

        result
    }
    .boxed()
}

/// Executes the targets of every edge leaving `source` on `handle`, in edge
/// order, each with `data` as input.
///
/// Targets that are missing or of an unsupported type are skipped. Targets
/// beyond the configured dispatch depth record an error instead of running.
pub fn trigger_next_nodes(
    ctx: Arc<Context>,
    source: NodeId,
    handle: String,
    data: Value,
    depth: usize,
) -> BoxFuture<'static, ()> {
    async move {
        let workflow = ctx.workflow();
        let edges = workflow.get_outgoing_edges(&source, &handle);
        if edges.is_empty() {
            debug!(run_id = ctx.run_id(), source = %source, handle = %handle, "no outgoing edges");
            return;
        }

        let next_depth = depth + 1;
        for edge in edges {
            let Some(target) = workflow.get_node(&edge.target) else {
                debug!(run_id = ctx.run_id(), edge = %edge.id, target = %edge.target, "edge target not found, skipping");
                continue;
            };
            if target.action.is_none() {
                warn!(run_id = ctx.run_id(), edge = %edge.id, target = %edge.target, node_type = %target.type_tag, "edge target has unsupported type, skipping");
                continue;
            }
            if next_depth > ctx.config().max_dispatch_depth {
                warn!(run_id = ctx.run_id(), edge = %edge.id, target = %edge.target, "maximum dispatch depth exceeded");
                ctx.set_node_result(&edge.target, NodeResult::error(format!("maximum dispatch depth ({}) exceeded", ctx.config().max_dispatch_depth)));
                continue;
            }

            debug!(run_id = ctx.run_id(), edge = %edge.id, source = %source, handle = %handle, target = %edge.target, "dispatching");
            execute_node(ctx.clone(), edge.target.clone(), Some(data.clone()), next_depth).await;
        }
    }
    .boxed()
}
