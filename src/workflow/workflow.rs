//! Immutable flow graph used for one run.

use std::collections::HashMap;

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};

use crate::{
    FlowError, Result,
    model::FlowModel,
    workflow::{
        edge::Edge,
        node::{Node, NodeId},
    },
};

/// Runtime flow representation as a directed graph.
///
/// The graph is a snapshot: nodes and edges never change during a run.
/// Outgoing edges are always reported in the order the snapshot listed them,
/// which is the order the dispatcher walks them in.
#[derive(Clone, Debug)]
pub struct Workflow {
    graph: DiGraph<Node, Edge>,
    index: HashMap<NodeId, NodeIndex>,
}

impl Workflow {
    /// get node by id
    pub fn get_node(
        &self,
        id: &str,
    ) -> Option<&Node> {
        self.index.get(id).map(|idx| &self.graph[*idx])
    }

    /// all node ids in snapshot order
    pub fn get_all_node_ids(&self) -> Vec<NodeId> {
        self.graph.node_indices().map(|idx| self.graph[idx].id.clone()).collect()
    }

    /// nodes without incoming edges, in snapshot order
    pub fn get_root_nodes(&self) -> Vec<&Node> {
        self.graph
            .node_indices()
            .filter(|idx| self.graph.neighbors_directed(*idx, Direction::Incoming).next().is_none())
            .map(|idx| &self.graph[idx])
            .collect()
    }

    /// Edges leaving `nid` on `handle`, in snapshot order.
    pub fn get_outgoing_edges(
        &self,
        nid: &str,
        handle: &str,
    ) -> Vec<Edge> {
        let Some(src_idx) = self.index.get(nid) else {
            return Vec::new();
        };

        let mut edges: Vec<_> = self.graph.edges_directed(*src_idx, Direction::Outgoing).filter(|edge_ref| edge_ref.weight().listens_on(nid, handle)).collect();
        edges.sort_by_key(|edge_ref| edge_ref.id());
        edges.into_iter().map(|edge_ref| edge_ref.weight().clone()).collect()
    }

    /// Output a human-readable representation of the flow graph
    pub fn schema(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Nodes: {}, Edges: {}", self.graph.node_count(), self.graph.edge_count()));
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            lines.push(format!("[{}] type: {}", node.id, node.type_tag));
        }
        for idx in self.graph.edge_indices() {
            let edge = &self.graph[idx];
            lines.push(format!("{} --[{}]--> {} (id: {})", edge.source, edge.source_handle, edge.target, edge.id));
        }

        lines.join("\n")
    }
}

impl TryFrom<&FlowModel> for Workflow {
    type Error = FlowError;

    fn try_from(model: &FlowModel) -> Result<Self> {
        let mut graph: DiGraph<Node, Edge> = DiGraph::new();
        let mut index = HashMap::new();

        for node in model.nodes.iter() {
            if index.contains_key(&node.id) {
                return Err(FlowError::Workflow(format!("duplicate node id '{}'", node.id)));
            }
            let node = Node::new(node);
            let nid = node.id.clone();
            let node_idx = graph.add_node(node);
            index.insert(nid, node_idx);
        }
        for edge in model.edges.iter() {
            let edge = Edge::from(edge);
            let source = index.get(&edge.source).ok_or(FlowError::Edge(format!("source node {} not found", edge.source)))?;
            let target = index.get(&edge.target).ok_or(FlowError::Edge(format!("target node {} not found", edge.target)))?;
            graph.add_edge(*source, *target, edge);
        }

        Ok(Self {
            graph,
            index,
        })
    }
}

impl TryFrom<FlowModel> for Workflow {
    type Error = FlowError;

    fn try_from(model: FlowModel) -> Result<Self> {
        Workflow::try_from(&model)
    }
}
