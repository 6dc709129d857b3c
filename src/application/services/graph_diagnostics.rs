//! Ordering diagnostics service module
//!
//! This service projects the enabled edges of an action graph into a
//! directed graph and analyzes it: ordering loops (which the propagator
//! tolerates but an executor cannot schedule) and a topological execution
//! order. Diagnostics never mutate the action graph.

use std::collections::HashMap;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::domain::entities::action::ActionId;
use crate::domain::entities::graph::ActionGraph;
use crate::domain::ports::config_sink::ConfigSink;

/// Analyzer for the enabled portion of an action graph
pub struct OrderingDiagnostics {
    graph: DiGraph<ActionId, ()>,
    indices: HashMap<ActionId, NodeIndex>,
}

impl OrderingDiagnostics {
    /// Projects the enabled edges of an action graph
    ///
    /// Disabled edges (empty order kind) are left out, so diagnostics see
    /// the graph the executor would see.
    ///
    /// # Arguments
    ///
    /// * `actions` - Action graph to project
    ///
    /// # Returns
    ///
    /// A new OrderingDiagnostics over the enabled edges of `actions`
    pub fn build(actions: &ActionGraph) -> Self {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();

        for id in actions.action_ids() {
            indices.insert(id, graph.add_node(id));
        }
        for eid in actions.edge_ids() {
            let edge = actions.edge(eid);
            if edge.is_disabled() {
                continue;
            }
            graph.add_edge(indices[&edge.first], indices[&edge.then], ());
        }

        Self { graph, indices }
    }

    /// Finds all ordering loops among enabled edges
    ///
    /// Each loop is reported once as the set of actions in a strongly
    /// connected component of more than one action (single-action cycles
    /// cannot be expressed: an edge needs two distinct endpoints).
    ///
    /// # Returns
    ///
    /// Vector of loops, each a vector of the action handles involved
    pub fn loops(&self) -> Vec<Vec<ActionId>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                component
                    .into_iter()
                    .map(|idx| self.graph[idx])
                    .collect()
            })
            .collect()
    }

    /// Checks whether the enabled graph contains an ordering loop
    ///
    /// # Returns
    ///
    /// `true` if at least one ordering loop exists, `false` otherwise
    pub fn has_loops(&self) -> bool {
        !self.loops().is_empty()
    }

    /// Computes a valid execution order over the enabled edges
    ///
    /// Actions come after everything they are ordered behind, matching the
    /// order an executor could run them in.
    ///
    /// # Returns
    ///
    /// Action handles in topological order, or `None` if the enabled graph
    /// contains a loop
    pub fn topological_order(&self) -> Option<Vec<ActionId>> {
        toposort(&self.graph, None)
            .ok()
            .map(|sorted| sorted.into_iter().map(|idx| self.graph[idx]).collect())
    }

    /// Reports every ordering loop through the configuration warning sink
    ///
    /// # Arguments
    ///
    /// * `actions` - Action graph the diagnostics were built from, used to
    ///   resolve action keys for the messages
    /// * `sink` - Sink the loop warnings are sent to
    pub fn report_loops(&self, actions: &ActionGraph, sink: &dyn ConfigSink) {
        for component in self.loops() {
            let keys: Vec<&str> = component
                .iter()
                .map(|&id| actions.action(id).key.as_str())
                .collect();
            sink.config_warn(&format!(
                "Ordering loop between {}; the executor cannot schedule these actions",
                keys.join(", ")
            ));
        }
    }

    /// Counts the actions that participate in at least one enabled edge
    ///
    /// # Returns
    ///
    /// Number of actions with an enabled inbound or outbound edge
    pub fn constrained_actions(&self) -> usize {
        self.indices
            .values()
            .filter(|&&idx| self.graph.neighbors_undirected(idx).next().is_some())
            .count()
    }
}
