use crate::application::services::graph_diagnostics::OrderingDiagnostics;
use crate::application::services::ordering_propagator::OrderingPropagator;
use crate::domain::entities::action::{ActionFlags, ActionId};
use crate::domain::entities::graph::ActionGraph;
use crate::domain::ports::config_sink::ConfigSink;
use crate::domain::ports::resource_policy::ResourcePolicy;

/// Drives a whole action graph to its ordering fix-point
///
/// Warns about ordering loops first, then updates every action in insertion
/// order; each update re-enters neighbors as needed, so one sweep suffices.
pub struct SettleOrdering;

impl SettleOrdering {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(
        &self,
        graph: &mut ActionGraph,
        policy: &dyn ResourcePolicy,
        sink: &dyn ConfigSink,
    ) -> SettleReport {
        OrderingDiagnostics::build(graph).report_loops(graph, sink);

        let ids: Vec<ActionId> = graph.action_ids().collect();
        let mut propagator = OrderingPropagator::new(graph, policy, sink);
        for id in &ids {
            propagator.update_action(*id);
        }

        let unrunnable_actions = graph
            .action_ids()
            .filter(|&id| !graph.action(id).flags.contains(ActionFlags::RUNNABLE))
            .count();
        let disabled_edges = graph
            .edge_ids()
            .filter(|&id| graph.edge(id).is_disabled())
            .count();

        SettleReport {
            actions: graph.action_count(),
            unrunnable_actions,
            disabled_edges,
        }
    }
}

impl Default for SettleOrdering {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a settled graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleReport {
    pub actions: usize,
    pub unrunnable_actions: usize,
    pub disabled_edges: usize,
}
