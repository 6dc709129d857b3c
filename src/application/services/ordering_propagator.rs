//! Ordering propagation service module
//!
//! The fix-point engine of the scheduler core. Given an action whose flags
//! may have changed, [`OrderingPropagator::update_action`] walks its inbound
//! ordering edges, applies each edge's transfer functions, and re-enters
//! neighbors whose flags changed, until no visited edge changes anything.
//!
//! Termination rests on monotonicity: action flag bits are only cleared
//! (except the bounded one-or-more and requires-any restorations, both
//! guarded by a last-flags comparison) and edge kinds only lose bits.

use tracing::trace;

use crate::application::services::action_expansion::expand_action;
use crate::domain::entities::action::{ActionFlags, ActionId, TaskKind};
use crate::domain::entities::graph::ActionGraph;
use crate::domain::entities::node::NodeId;
use crate::domain::entities::ordering::{EdgeId, GraphChange, OrderKind};
use crate::domain::entities::resource::{ResourceFlags, ResourceVariant};
use crate::domain::ports::config_sink::ConfigSink;
use crate::domain::ports::resource_policy::ResourcePolicy;

/// Drives action flags to a fix-point over the ordering edges
pub struct OrderingPropagator<'a> {
    graph: &'a mut ActionGraph,
    policy: &'a dyn ResourcePolicy,
    sink: &'a dyn ConfigSink,
}

impl<'a> OrderingPropagator<'a> {
    /// Creates a propagator over a graph with the given resource policy
    ///
    /// # Arguments
    ///
    /// * `graph` - Action graph whose flags and edges are propagated
    /// * `policy` - Resource policy consulted for resource-scoped transfers
    /// * `sink` - Sink for expansion errors
    ///
    /// # Returns
    ///
    /// A new OrderingPropagator borrowing the graph for its lifetime
    pub fn new(
        graph: &'a mut ActionGraph,
        policy: &'a dyn ResourcePolicy,
        sink: &'a dyn ConfigSink,
    ) -> Self {
        Self {
            graph,
            policy,
            sink,
        }
    }

    /// Updates an action against all of its predecessors
    ///
    /// Re-enters predecessors and successors as their flags change and
    /// returns once nothing changed on any visited edge.
    ///
    /// # Arguments
    ///
    /// * `then` - Action whose inbound ordering edges are applied
    pub fn update_action(&mut self, then: ActionId) {
        let last_flags = self.graph.action(then).flags;
        trace!(
            "Updating {} ({}runnable)",
            self.graph.action(then).key,
            if last_flags.contains(ActionFlags::RUNNABLE) {
                ""
            } else {
                "un"
            }
        );

        if last_flags.contains(ActionFlags::REQUIRES_ANY) {
            // Restart the count; the one-or-more transfer of each inbound
            // edge restores RUNNABLE if enough predecessors still qualify
            let action = self.graph.action_mut(then);
            action.runnable_before = 0;
            if action.required_runnable_before == 0 {
                action.required_runnable_before = 1;
            }
            action.flags.remove(ActionFlags::RUNNABLE);
        }

        let mut changed = GraphChange::empty();
        let mut idx = 0;
        while idx < self.graph.action(then).before.len() {
            let eid = self.graph.action(then).before[idx];
            idx += 1;
            let first = self.graph.edge(eid).first;

            let first_node = self.effective_node(first);
            let then_node = self.effective_node(then);

            // Disable constraint if it only applies when on same node, but isn't
            let kind = self.graph.edge(eid).kind;
            if kind.contains(OrderKind::SAME_NODE) {
                if let (Some(first_node), Some(then_node)) = (first_node, then_node) {
                    if first_node != then_node {
                        trace!(
                            "Disabled ordering {} then {}: not same node",
                            self.graph.action(first).key,
                            self.graph.action(then).key
                        );
                        self.graph.edge_mut(eid).kind = OrderKind::empty();
                        continue;
                    }
                }
            }

            changed.remove(GraphChange::UPDATED_FIRST);

            if kind.contains(OrderKind::THEN_CANCELS_FIRST)
                && self.graph.action(first).rsc.is_some()
                && !self.graph.action(then).flags.contains(ActionFlags::OPTIONAL)
            {
                // A required 'then' abandons 'first' (e.g. a required stop
                // cancels any pending agent reload)
                self.graph.action_mut(first).flags.insert(ActionFlags::OPTIONAL);
                if self.graph.action(first).task == TaskKind::ReloadAgent {
                    if let Some(rsc) = self.graph.action(first).rsc {
                        self.graph.resource_mut(rsc).flags.remove(ResourceFlags::RELOAD);
                    }
                }
            }

            let effective_first = self.maybe_expand(first, then);
            if effective_first != first {
                trace!(
                    "Ordering {} after {} instead of {}",
                    self.graph.action(then).key,
                    self.graph.action(effective_first).key,
                    self.graph.action(first).key
                );
            }

            let first_flags = self.action_flags_for_ordering(effective_first, then_node);
            let then_flags = self.action_flags_for_ordering(then, first_node);

            let mut new_edge = false;
            if effective_first == first {
                let node = self.graph.action(then).node;
                changed |= self.graph_update_action(
                    effective_first,
                    then,
                    node,
                    first_flags,
                    then_flags,
                    eid,
                );
            } else if self.graph.order_if_new(effective_first, then, kind) {
                // First association of the expanded 'first' with 'then':
                // retire this edge and let the re-entry below walk the
                // refreshed predecessor list
                changed |= GraphChange::UPDATED_THEN | GraphChange::DISABLE;
                new_edge = true;
            }

            if changed.contains(GraphChange::DISABLE) {
                changed.remove(GraphChange::DISABLE);
                self.graph.edge_mut(eid).kind = OrderKind::empty();
            }
            if new_edge {
                break;
            }

            if changed.contains(GraphChange::UPDATED_FIRST) {
                let successors: Vec<ActionId> = self
                    .graph
                    .action(effective_first)
                    .after
                    .iter()
                    .map(|&edge| self.graph.edge(edge).then)
                    .collect();
                for successor in successors {
                    self.update_action(successor);
                }
                self.update_action(effective_first);
            }
        }

        if self.graph.action(then).flags.contains(ActionFlags::REQUIRES_ANY) {
            if last_flags != self.graph.action(then).flags {
                changed.insert(GraphChange::UPDATED_THEN);
            } else {
                changed.remove(GraphChange::UPDATED_THEN);
            }
        }

        if changed.contains(GraphChange::UPDATED_THEN) {
            if last_flags.contains(ActionFlags::RUNNABLE)
                && !self.graph.action(then).flags.contains(ActionFlags::RUNNABLE)
            {
                self.policy.block_colocated_starts(self.graph, then);
            }
            self.update_action(then);
            let successors: Vec<ActionId> = self
                .graph
                .action(then)
                .after
                .iter()
                .map(|&edge| self.graph.edge(edge).then)
                .collect();
            for successor in successors {
                self.update_action(successor);
            }
        }
    }

    /// Applies every transfer function selected by an edge's order kinds
    ///
    /// Each handler works from the snapshot flags the driver derived, so the
    /// kinds act in isolation.
    ///
    /// # Arguments
    ///
    /// * `first` - Predecessor endpoint of the edge
    /// * `then` - Successor endpoint of the edge
    /// * `node` - Node limiting the scope of resource-scoped transfers
    /// * `first_flags` - Ordering-view flags of `first`
    /// * `then_flags` - Ordering-view flags of `then`
    /// * `eid` - Edge whose kinds select the transfers
    ///
    /// # Returns
    ///
    /// Change bits telling the driver which endpoints to re-enter and
    /// whether to disable the edge
    fn graph_update_action(
        &mut self,
        first: ActionId,
        then: ActionId,
        node: Option<NodeId>,
        first_flags: ActionFlags,
        then_flags: ActionFlags,
        eid: EdgeId,
    ) -> GraphChange {
        let mut changed = GraphChange::empty();
        let mut kind = self.graph.edge(eid).kind;
        let mut node = node;

        if kind.contains(OrderKind::IMPLIES_THEN_ON_NODE) {
            /* Normally the whole 'then' clone restarts when 'first' does.
             * For unfencing we only want instances on the same node as the
             * unfencing operation, so swap in first's node and treat the
             * edge as a plain IMPLIES_THEN for the rest of this call.
             */
            kind.remove(OrderKind::IMPLIES_THEN_ON_NODE);
            kind.insert(OrderKind::IMPLIES_THEN);
            node = self.graph.action(first).node;
        }

        let first_rsc = self.graph.action(first).rsc;
        let then_rsc = self.graph.action(then).rsc;

        if kind.contains(OrderKind::IMPLIES_THEN) {
            if then_rsc.is_some() {
                changed |= self.policy.update_actions(
                    self.graph,
                    first,
                    then,
                    node,
                    first_flags & ActionFlags::OPTIONAL,
                    ActionFlags::OPTIONAL,
                    OrderKind::IMPLIES_THEN,
                );
            } else if !first_flags.contains(ActionFlags::OPTIONAL)
                && self.graph.action(then).flags.contains(ActionFlags::OPTIONAL)
            {
                self.graph.action_mut(then).flags.remove(ActionFlags::OPTIONAL);
                changed |= GraphChange::UPDATED_THEN;
            }
        }

        if kind.contains(OrderKind::RESTART) && then_rsc.is_some() {
            changed |= self.policy.update_actions(
                self.graph,
                first,
                then,
                node,
                first_flags,
                ActionFlags::OPTIONAL | ActionFlags::RUNNABLE,
                OrderKind::RESTART,
            );
        }

        if kind.contains(OrderKind::IMPLIES_FIRST) {
            if first_rsc.is_some() {
                changed |= self.policy.update_actions(
                    self.graph,
                    first,
                    then,
                    node,
                    first_flags,
                    ActionFlags::OPTIONAL,
                    OrderKind::IMPLIES_FIRST,
                );
            } else if !first_flags.contains(ActionFlags::OPTIONAL)
                && self.graph.action(first).flags.contains(ActionFlags::RUNNABLE)
            {
                self.graph.action_mut(first).flags.remove(ActionFlags::RUNNABLE);
                changed |= GraphChange::UPDATED_FIRST;
            }
        }

        if kind.contains(OrderKind::PROMOTED_IMPLIES_FIRST) && then_rsc.is_some() {
            changed |= self.policy.update_actions(
                self.graph,
                first,
                then,
                node,
                first_flags & ActionFlags::OPTIONAL,
                ActionFlags::OPTIONAL,
                OrderKind::PROMOTED_IMPLIES_FIRST,
            );
        }

        if kind.contains(OrderKind::ONE_OR_MORE) {
            if then_rsc.is_some() {
                changed |= self.policy.update_actions(
                    self.graph,
                    first,
                    then,
                    node,
                    first_flags,
                    ActionFlags::RUNNABLE,
                    OrderKind::ONE_OR_MORE,
                );
            } else if first_flags.contains(ActionFlags::RUNNABLE) {
                // Another runnable instance of 'first'
                let then_action = self.graph.action_mut(then);
                then_action.runnable_before += 1;
                if then_action.runnable_before >= then_action.required_runnable_before
                    && !then_action.flags.contains(ActionFlags::RUNNABLE)
                {
                    then_action.flags.insert(ActionFlags::RUNNABLE);
                    changed |= GraphChange::UPDATED_THEN;
                }
            }
        }

        if kind.contains(OrderKind::PROBE) && then_rsc.is_some() {
            let first_running = first_rsc
                .map(|rsc| !self.graph.resource(rsc).running_on.is_empty())
                .unwrap_or(false);
            if !first_flags.contains(ActionFlags::RUNNABLE) && first_running {
                // 'first' is a stop of a running resource, so the probe
                // ordering is already satisfied
                trace!(
                    "{} then {}: ignoring because first is stopping",
                    self.graph.action(first).key,
                    self.graph.action(then).key
                );
                kind = OrderKind::empty();
                changed |= GraphChange::DISABLE;
            } else {
                changed |= self.policy.update_actions(
                    self.graph,
                    first,
                    then,
                    node,
                    first_flags,
                    ActionFlags::RUNNABLE,
                    OrderKind::RUNNABLE_LEFT,
                );
            }
        }

        if kind.contains(OrderKind::RUNNABLE_LEFT) {
            if then_rsc.is_some() {
                changed |= self.policy.update_actions(
                    self.graph,
                    first,
                    then,
                    node,
                    first_flags,
                    ActionFlags::RUNNABLE,
                    OrderKind::RUNNABLE_LEFT,
                );
            } else if !first_flags.contains(ActionFlags::RUNNABLE)
                && self.graph.action(then).flags.contains(ActionFlags::RUNNABLE)
            {
                self.graph.action_mut(then).flags.remove(ActionFlags::RUNNABLE);
                changed |= GraphChange::UPDATED_THEN;
            }
        }

        if kind.contains(OrderKind::IMPLIES_FIRST_MIGRATABLE) && then_rsc.is_some() {
            changed |= self.policy.update_actions(
                self.graph,
                first,
                then,
                node,
                first_flags,
                ActionFlags::OPTIONAL,
                OrderKind::IMPLIES_FIRST_MIGRATABLE,
            );
        }

        if kind.contains(OrderKind::PSEUDO_LEFT) && then_rsc.is_some() {
            changed |= self.policy.update_actions(
                self.graph,
                first,
                then,
                node,
                first_flags,
                ActionFlags::OPTIONAL,
                OrderKind::PSEUDO_LEFT,
            );
        }

        if kind.contains(OrderKind::OPTIONAL) && then_rsc.is_some() {
            changed |= self.policy.update_actions(
                self.graph,
                first,
                then,
                node,
                first_flags,
                ActionFlags::RUNNABLE,
                OrderKind::OPTIONAL,
            );
        }

        if kind.contains(OrderKind::ASYMMETRICAL) && then_rsc.is_some() {
            changed |= self.policy.update_actions(
                self.graph,
                first,
                then,
                node,
                first_flags,
                ActionFlags::RUNNABLE,
                OrderKind::ASYMMETRICAL,
            );
        }

        if self.graph.action(first).flags.contains(ActionFlags::RUNNABLE)
            && kind.contains(OrderKind::IMPLIES_THEN_PRINTED)
            && !first_flags.contains(ActionFlags::OPTIONAL)
        {
            // 'then' stays in graph output because 'first' is required;
            // printing never re-triggers propagation
            self.graph.action_mut(then).flags.insert(ActionFlags::PRINT_ALWAYS);
        }

        if kind.contains(OrderKind::IMPLIES_FIRST_PRINTED)
            && !then_flags.contains(ActionFlags::OPTIONAL)
        {
            self.graph.action_mut(first).flags.insert(ActionFlags::PRINT_ALWAYS);
        }

        if kind.intersects(
            OrderKind::IMPLIES_THEN | OrderKind::IMPLIES_FIRST | OrderKind::RESTART,
        ) {
            if let Some(rsc) = first_rsc {
                let blocked_stop = self.graph.action(first).task == TaskKind::Stop
                    && !self.graph.resource(rsc).flags.contains(ResourceFlags::MANAGED)
                    && self.graph.resource(rsc).flags.contains(ResourceFlags::BLOCKED)
                    && !self.graph.action(first).flags.contains(ActionFlags::RUNNABLE);
                if blocked_stop
                    && self.graph.action(then).flags.contains(ActionFlags::RUNNABLE)
                {
                    // Nothing may proceed past the stop of a blocked,
                    // unmanaged resource
                    self.graph.action_mut(then).flags.remove(ActionFlags::RUNNABLE);
                    changed |= GraphChange::UPDATED_THEN;
                }
            }
        }

        changed
    }

    /// Derives the flags an ordering should see for an action
    ///
    /// For a clone action with a known other-endpoint node, a globally set
    /// RUNNABLE is re-added if the per-node query dropped it: orderings
    /// between clones consider whether the action is runnable anywhere, not
    /// on a particular node. This applies only to ordering constraints.
    ///
    /// # Arguments
    ///
    /// * `action` - Action whose flags are derived
    /// * `node` - Node of the other endpoint of the ordering edge
    ///
    /// # Returns
    ///
    /// The flag set the transfer functions should work from
    fn action_flags_for_ordering(
        &self,
        action: ActionId,
        node: Option<NodeId>,
    ) -> ActionFlags {
        let Some(rsc) = self.graph.action(action).rsc else {
            return self.graph.action(action).flags;
        };

        let flags = self.policy.action_flags(self.graph, action, None);
        let Some(node) = node else {
            return flags;
        };
        if self.graph.resource(rsc).variant != ResourceVariant::Clone {
            return flags;
        }

        let runnable = flags.contains(ActionFlags::RUNNABLE);
        let mut flags = self.policy.action_flags(self.graph, action, Some(node));
        if runnable && !flags.contains(ActionFlags::RUNNABLE) {
            flags.insert(ActionFlags::RUNNABLE);
        }
        flags
    }

    /// Resolves the node an endpoint effectively runs on
    ///
    /// A start on a group stands for the whole group, so its node is the
    /// group's location rather than the action's own assignment.
    ///
    /// # Arguments
    ///
    /// * `action` - Endpoint whose node is resolved
    ///
    /// # Returns
    ///
    /// The effective node, or `None` when no node is known
    fn effective_node(&self, action: ActionId) -> Option<NodeId> {
        if let Some(rsc) = self.graph.action(action).rsc {
            if self.graph.resource(rsc).variant == ResourceVariant::Group
                && self.graph.action(action).task == TaskKind::Start
            {
                return self.policy.location(self.graph, rsc, false);
            }
        }
        self.graph.action(action).node
    }

    /// Expands `first` when the two endpoints belong to unrelated resources
    ///
    /// # Arguments
    ///
    /// * `first` - Predecessor endpoint, candidate for expansion
    /// * `then` - Successor endpoint the relationship is checked against
    ///
    /// # Returns
    ///
    /// The expanded action handle, or `first` when no expansion applies
    fn maybe_expand(&mut self, first: ActionId, then: ActionId) -> ActionId {
        let (Some(first_rsc), Some(then_rsc)) =
            (self.graph.action(first).rsc, self.graph.action(then).rsc)
        else {
            return first;
        };
        if first_rsc == then_rsc || self.graph.is_ancestor(then_rsc, first_rsc) {
            return first;
        }
        expand_action(self.graph, self.sink, first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::action::Action;
    use crate::domain::entities::node::Node;
    use crate::domain::entities::resource::Resource;
    use crate::domain::ports::config_sink::RecordingSink;
    use crate::domain::ports::resource_policy::{MockResourcePolicy, StandardPolicy};

    fn runnable(graph: &ActionGraph, id: ActionId) -> bool {
        graph.action(id).flags.contains(ActionFlags::RUNNABLE)
    }

    fn settle(graph: &mut ActionGraph, policy: &dyn ResourcePolicy) {
        let sink = RecordingSink::new();
        let ids: Vec<ActionId> = graph.action_ids().collect();
        let mut propagator = OrderingPropagator::new(graph, policy, &sink);
        for id in ids {
            propagator.update_action(id);
        }
    }

    #[test]
    fn test_runnable_left_chain_propagates() {
        // A -> B -> C, both edges RUNNABLE_LEFT; blocking A blocks the rest
        let mut graph = ActionGraph::new();
        let a = graph.add_action(Action::new("a_start_0", TaskKind::Start));
        let b = graph.add_action(Action::new("b_start_0", TaskKind::Start));
        let c = graph.add_action(Action::new("c_start_0", TaskKind::Start));
        let ab = graph.order(a, b, OrderKind::RUNNABLE_LEFT);
        let bc = graph.order(b, c, OrderKind::RUNNABLE_LEFT);

        graph.action_mut(a).flags.remove(ActionFlags::RUNNABLE);
        settle(&mut graph, &StandardPolicy::new());

        assert!(!runnable(&graph, b));
        assert!(!runnable(&graph, c));
        assert_eq!(graph.edge(ab).kind, OrderKind::RUNNABLE_LEFT);
        assert_eq!(graph.edge(bc).kind, OrderKind::RUNNABLE_LEFT);
    }

    #[test]
    fn test_one_or_more_with_quorum_of_predecessors() {
        // 'then' needs two runnable predecessors out of three
        let mut graph = ActionGraph::new();
        let then = graph.add_action(
            Action::new("then_start_0", TaskKind::Start)
                .with_flags(ActionFlags::RUNNABLE | ActionFlags::REQUIRES_ANY),
        );
        graph.action_mut(then).required_runnable_before = 2;

        let mut firsts = Vec::new();
        for i in 0..3 {
            let first =
                graph.add_action(Action::new(&format!("f{}_start_0", i), TaskKind::Start));
            graph.order(first, then, OrderKind::ONE_OR_MORE);
            firsts.push(first);
        }
        graph.action_mut(firsts[1]).flags.remove(ActionFlags::RUNNABLE);

        let sink = RecordingSink::new();
        let policy = StandardPolicy::new();
        let mut propagator = OrderingPropagator::new(&mut graph, &policy, &sink);
        propagator.update_action(then);

        assert!(runnable(&graph, then));
        assert_eq!(graph.action(then).runnable_before, 2);
    }

    #[test]
    fn test_one_or_more_below_quorum_blocks() {
        let mut graph = ActionGraph::new();
        let then = graph.add_action(
            Action::new("then_start_0", TaskKind::Start)
                .with_flags(ActionFlags::RUNNABLE | ActionFlags::REQUIRES_ANY),
        );
        graph.action_mut(then).required_runnable_before = 2;

        for i in 0..2 {
            let first =
                graph.add_action(Action::new(&format!("f{}_start_0", i), TaskKind::Start));
            if i == 0 {
                graph.action_mut(first).flags.remove(ActionFlags::RUNNABLE);
            }
            graph.order(first, then, OrderKind::ONE_OR_MORE);
        }

        let sink = RecordingSink::new();
        let policy = StandardPolicy::new();
        let mut propagator = OrderingPropagator::new(&mut graph, &policy, &sink);
        propagator.update_action(then);

        assert!(!runnable(&graph, then));
        assert_eq!(graph.action(then).runnable_before, 1);
    }

    #[test]
    fn test_requires_any_defaults_required_to_one() {
        let mut graph = ActionGraph::new();
        let then = graph.add_action(
            Action::new("then_start_0", TaskKind::Start)
                .with_flags(ActionFlags::RUNNABLE | ActionFlags::REQUIRES_ANY),
        );
        let first = graph.add_action(Action::new("f_start_0", TaskKind::Start));
        graph.order(first, then, OrderKind::ONE_OR_MORE);

        settle(&mut graph, &StandardPolicy::new());

        assert_eq!(graph.action(then).required_runnable_before, 1);
        assert!(runnable(&graph, then));
    }

    #[test]
    fn test_same_node_edge_disabled_when_nodes_differ() {
        let mut graph = ActionGraph::new();
        let node1 = graph.add_node(Node::new("node-1"));
        let node2 = graph.add_node(Node::new("node-2"));
        let first =
            graph.add_action(Action::new("a_start_0", TaskKind::Start).on_node(node1));
        let then = graph.add_action(Action::new("b_start_0", TaskKind::Start).on_node(node2));
        let edge = graph.order(
            first,
            then,
            OrderKind::SAME_NODE | OrderKind::RUNNABLE_LEFT,
        );
        graph.action_mut(first).flags.remove(ActionFlags::RUNNABLE);

        settle(&mut graph, &StandardPolicy::new());

        // The edge is void across nodes: disabled, and no effect on 'then'
        assert_eq!(graph.edge(edge).kind, OrderKind::empty());
        assert!(runnable(&graph, then));
    }

    #[test]
    fn test_same_node_edge_applies_when_nodes_match() {
        let mut graph = ActionGraph::new();
        let node1 = graph.add_node(Node::new("node-1"));
        let first =
            graph.add_action(Action::new("a_start_0", TaskKind::Start).on_node(node1));
        let then = graph.add_action(Action::new("b_start_0", TaskKind::Start).on_node(node1));
        graph.order(
            first,
            then,
            OrderKind::SAME_NODE | OrderKind::RUNNABLE_LEFT,
        );
        graph.action_mut(first).flags.remove(ActionFlags::RUNNABLE);

        settle(&mut graph, &StandardPolicy::new());
        assert!(!runnable(&graph, then));
    }

    #[test]
    fn test_implies_then_clears_optional_transitively() {
        let mut graph = ActionGraph::new();
        let first = graph.add_action(Action::new("a_stop_0", TaskKind::Stop));
        let then = graph.add_action(
            Action::new("b_stop_0", TaskKind::Stop)
                .with_flags(ActionFlags::RUNNABLE | ActionFlags::OPTIONAL),
        );
        graph.order(first, then, OrderKind::IMPLIES_THEN);

        settle(&mut graph, &StandardPolicy::new());
        assert!(!graph.action(then).flags.contains(ActionFlags::OPTIONAL));
    }

    #[test]
    fn test_then_cancels_first_marks_first_optional() {
        let mut graph = ActionGraph::new();
        let rsc = graph.add_resource(Resource::new("db", ResourceVariant::Primitive));
        graph.resource_mut(rsc).flags.insert(ResourceFlags::RELOAD);
        let reload = graph.add_action(
            Action::new("db_reload-agent_0", TaskKind::ReloadAgent).on_resource(rsc),
        );
        let stop =
            graph.add_action(Action::new("db_stop_0", TaskKind::Stop).on_resource(rsc));
        graph.order(reload, stop, OrderKind::THEN_CANCELS_FIRST);

        settle(&mut graph, &StandardPolicy::new());

        // The required stop cancels the reload and clears the resource's
        // pending-reload flag
        assert!(graph.action(reload).flags.contains(ActionFlags::OPTIONAL));
        assert!(!graph.resource(rsc).flags.contains(ResourceFlags::RELOAD));
    }

    #[test]
    fn test_probe_edge_disabled_when_first_is_unrunnable_stop_of_running() {
        let mut graph = ActionGraph::new();
        let node = graph.add_node(Node::new("node-1"));
        let stopping = graph.add_resource(Resource::new("old", ResourceVariant::Primitive));
        graph.resource_mut(stopping).running_on.push(node);
        let probed = graph.add_resource(Resource::new("new", ResourceVariant::Primitive));

        let stop = graph.add_action(
            Action::new("old_stop_0", TaskKind::Stop)
                .on_resource(stopping)
                .with_flags(ActionFlags::empty()),
        );
        let probe = graph.add_action(
            Action::new("new_monitor_0", TaskKind::Monitor).on_resource(probed),
        );
        let edge = graph.order(stop, probe, OrderKind::PROBE);

        settle(&mut graph, &StandardPolicy::new());

        assert_eq!(graph.edge(edge).kind, OrderKind::empty());
        assert!(runnable(&graph, probe));
    }

    #[test]
    fn test_probe_edge_applies_runnable_left_otherwise() {
        let mut graph = ActionGraph::new();
        let stopped = graph.add_resource(Resource::new("old", ResourceVariant::Primitive));
        let probed = graph.add_resource(Resource::new("new", ResourceVariant::Primitive));

        // Not running anywhere, so the probe ordering stays in force
        let stop = graph.add_action(
            Action::new("old_stop_0", TaskKind::Stop)
                .on_resource(stopped)
                .with_flags(ActionFlags::empty()),
        );
        let probe = graph.add_action(
            Action::new("new_monitor_0", TaskKind::Monitor).on_resource(probed),
        );
        let edge = graph.order(stop, probe, OrderKind::PROBE);

        settle(&mut graph, &StandardPolicy::new());

        assert_eq!(graph.edge(edge).kind, OrderKind::PROBE);
        assert!(!runnable(&graph, probe));
    }

    #[test]
    fn test_blocked_unmanaged_stop_blocks_then() {
        let mut graph = ActionGraph::new();
        let rsc = graph.add_resource(Resource::new("db", ResourceVariant::Primitive));
        graph.resource_mut(rsc).flags.remove(ResourceFlags::MANAGED);
        graph.resource_mut(rsc).flags.insert(ResourceFlags::BLOCKED);

        let stop = graph.add_action(
            Action::new("db_stop_0", TaskKind::Stop)
                .on_resource(rsc)
                .with_flags(ActionFlags::empty()),
        );
        let then = graph.add_action(Action::new("web_start_0", TaskKind::Start));
        graph.order(stop, then, OrderKind::IMPLIES_THEN);

        settle(&mut graph, &StandardPolicy::new());
        assert!(!runnable(&graph, then));
    }

    #[test]
    fn test_implies_then_printed_sets_print_always() {
        let mut graph = ActionGraph::new();
        let first = graph.add_action(Action::new("a_start_0", TaskKind::Start));
        let then = graph.add_action(Action::new("b_start_0", TaskKind::Start));
        graph.order(first, then, OrderKind::IMPLIES_THEN_PRINTED);

        settle(&mut graph, &StandardPolicy::new());
        assert!(graph.action(then).flags.contains(ActionFlags::PRINT_ALWAYS));
    }

    #[test]
    fn test_implies_then_on_node_rewrites_to_implies_then() {
        let mut graph = ActionGraph::new();
        let node = graph.add_node(Node::new("node-1"));
        let rsc = graph.add_resource(Resource::new("cl", ResourceVariant::Clone));
        let fence = graph.add_action(Action::new("node-1_fence_0", TaskKind::Fence).on_node(node));
        let then = graph.add_action(
            Action::new("cl_start_0", TaskKind::Start)
                .on_resource(rsc)
                .with_flags(ActionFlags::RUNNABLE | ActionFlags::OPTIONAL),
        );
        let edge = graph.order(fence, then, OrderKind::IMPLIES_THEN_ON_NODE);

        let sink = RecordingSink::new();
        let mut policy = MockResourcePolicy::new();
        policy
            .expect_action_flags()
            .returning(|graph, action, _| graph.action(action).flags);
        // The clone policy must see a plain IMPLIES_THEN pinned to the
        // fencing action's node
        policy
            .expect_update_actions()
            .withf(move |_, _, _, seen_node, _, _, kind| {
                *kind == OrderKind::IMPLIES_THEN && *seen_node == Some(node)
            })
            .times(1)
            .returning(|_, _, _, _, _, _, _| GraphChange::empty());
        policy.expect_location().returning(|_, _, _| None);

        let mut propagator = OrderingPropagator::new(&mut graph, &policy, &sink);
        propagator.update_action(then);

        // The edge itself keeps its kind; the rewrite is per-call
        assert_eq!(graph.edge(edge).kind, OrderKind::IMPLIES_THEN_ON_NODE);
    }

    #[test]
    fn test_expansion_relinks_edge_to_completed_action() {
        let mut graph = ActionGraph::new();
        let grp = graph.add_resource(Resource::new("grp", ResourceVariant::Group));
        let db = graph.add_resource(Resource::new("db", ResourceVariant::Primitive));

        let grp_start =
            graph.add_action(Action::new("grp_start_0", TaskKind::Start).on_resource(grp));
        let grp_running = graph.add_action(
            Action::new("grp_running_0", TaskKind::Started)
                .on_resource(grp)
                .with_flags(ActionFlags::empty()),
        );
        let db_start =
            graph.add_action(Action::new("db_start_0", TaskKind::Start).on_resource(db));
        let edge = graph.order(grp_start, db_start, OrderKind::RUNNABLE_LEFT);

        settle(&mut graph, &StandardPolicy::new());

        // The original edge is retired in favor of one from the completed
        // action, whose non-runnability now gates db_start
        assert_eq!(graph.edge(edge).kind, OrderKind::empty());
        assert!(graph
            .action(db_start)
            .before
            .iter()
            .any(|&e| graph.edge(e).first == grp_running
                && graph.edge(e).kind == OrderKind::RUNNABLE_LEFT));
        assert!(!runnable(&graph, db_start));
    }

    #[test]
    fn test_propagation_is_monotone_on_flags_and_edges() {
        let mut graph = ActionGraph::new();
        let a = graph.add_action(Action::new("a_start_0", TaskKind::Start));
        let b = graph.add_action(
            Action::new("b_start_0", TaskKind::Start)
                .with_flags(ActionFlags::RUNNABLE | ActionFlags::OPTIONAL),
        );
        let c = graph.add_action(Action::new("c_start_0", TaskKind::Start));
        graph.order(a, b, OrderKind::IMPLIES_THEN | OrderKind::RUNNABLE_LEFT);
        graph.order(b, c, OrderKind::RUNNABLE_LEFT | OrderKind::SAME_NODE);
        graph.action_mut(a).flags.remove(ActionFlags::RUNNABLE);

        let flags_before: Vec<ActionFlags> =
            graph.action_ids().map(|id| graph.action(id).flags).collect();
        let kinds_before: Vec<OrderKind> =
            graph.edge_ids().map(|id| graph.edge(id).kind).collect();

        settle(&mut graph, &StandardPolicy::new());

        for (id, before) in graph.action_ids().zip(flags_before) {
            assert!(before.contains(graph.action(id).flags));
        }
        for (id, before) in graph.edge_ids().zip(kinds_before) {
            assert!(before.contains(graph.edge(id).kind));
        }
    }

    #[test]
    fn test_fix_point_terminates_on_cyclic_graph() {
        // A two-cycle with flag-clearing kinds must still settle
        let mut graph = ActionGraph::new();
        let a = graph.add_action(Action::new("a_start_0", TaskKind::Start));
        let b = graph.add_action(Action::new("b_start_0", TaskKind::Start));
        graph.order(a, b, OrderKind::RUNNABLE_LEFT);
        graph.order(b, a, OrderKind::RUNNABLE_LEFT);
        graph.action_mut(a).flags.remove(ActionFlags::RUNNABLE);

        settle(&mut graph, &StandardPolicy::new());
        assert!(!runnable(&graph, a));
        assert!(!runnable(&graph, b));
    }

    #[test]
    fn test_clone_ordering_sees_global_runnability() {
        let mut graph = ActionGraph::new();
        let node = graph.add_node(Node::new("node-1"));
        let clone = graph.add_resource(Resource::new("cl", ResourceVariant::Clone));
        let first = graph
            .add_action(Action::new("cl_start_0", TaskKind::Start).on_resource(clone));
        let then = graph.add_action(Action::new("web_start_0", TaskKind::Start).on_node(node));
        graph.order(first, then, OrderKind::RUNNABLE_LEFT);

        let sink = RecordingSink::new();
        let mut policy = MockResourcePolicy::new();
        // Globally runnable, but not on the node the other endpoint uses
        policy
            .expect_action_flags()
            .returning(|_, _, node| match node {
                None => ActionFlags::RUNNABLE,
                Some(_) => ActionFlags::empty(),
            });
        policy
            .expect_update_actions()
            .returning(|_, _, _, _, _, _, _| GraphChange::empty());
        policy.expect_location().returning(|_, _, _| None);

        let mut propagator = OrderingPropagator::new(&mut graph, &policy, &sink);
        propagator.update_action(then);

        // RUNNABLE_LEFT saw an (inflated) runnable first, so then survives
        assert!(runnable(&graph, then));
    }

    #[test]
    fn test_block_colocated_starts_hook_fires_on_lost_runnable() {
        let mut graph = ActionGraph::new();
        let rsc = graph.add_resource(Resource::new("db", ResourceVariant::Primitive));
        let first = graph.add_action(
            Action::new("a_start_0", TaskKind::Start).with_flags(ActionFlags::empty()),
        );
        let then =
            graph.add_action(Action::new("db_start_0", TaskKind::Start).on_resource(rsc));
        graph.order(first, then, OrderKind::RUNNABLE_LEFT);

        let sink = RecordingSink::new();
        let mut policy = MockResourcePolicy::new();
        policy
            .expect_action_flags()
            .returning(|graph, action, _| graph.action(action).flags);
        policy
            .expect_update_actions()
            .returning(|graph, _, then, _, first_flags, _, kind| {
                if kind == OrderKind::RUNNABLE_LEFT
                    && !first_flags.contains(ActionFlags::RUNNABLE)
                    && graph.action(then).flags.contains(ActionFlags::RUNNABLE)
                {
                    graph.action_mut(then).flags.remove(ActionFlags::RUNNABLE);
                    return GraphChange::UPDATED_THEN;
                }
                GraphChange::empty()
            });
        policy.expect_location().returning(|_, _, _| None);
        policy
            .expect_block_colocated_starts()
            .times(1)
            .returning(|_, _| ());

        let mut propagator = OrderingPropagator::new(&mut graph, &policy, &sink);
        propagator.update_action(then);
        assert!(!runnable(&graph, then));
    }
}
