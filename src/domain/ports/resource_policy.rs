//! Resource policy port module
//!
//! Resource-type behavior (how a primitive, group, clone, or container
//! reacts to ordering constraints) lives outside the core. The ordering
//! propagator talks to it through this trait; [`StandardPolicy`] is a
//! reference implementation so the engine works stand-alone.

use crate::domain::entities::action::{ActionFlags, ActionId};
use crate::domain::entities::graph::ActionGraph;
use crate::domain::entities::node::NodeId;
use crate::domain::entities::ordering::{GraphChange, OrderKind};
use crate::domain::entities::resource::ResourceId;

/// Hooks the ordering propagator needs from resource-type modules
///
/// `update_actions` receives one order-kind bit at a time together with the
/// flag masks the propagator derived for that bit; it may mutate action
/// flags in the graph and reports what changed. Implementations must not
/// mutate flags outside this hook.
#[cfg_attr(test, mockall::automock)]
pub trait ResourcePolicy {
    /// Returns the flags of an action as the resource sees them
    ///
    /// When `node` is given, the answer is specific to that node (clone
    /// policies answer per-instance).
    fn action_flags(
        &self,
        graph: &ActionGraph,
        action: ActionId,
        node: Option<NodeId>,
    ) -> ActionFlags;

    /// Applies one order-kind transfer between two actions
    fn update_actions(
        &self,
        graph: &mut ActionGraph,
        first: ActionId,
        then: ActionId,
        node: Option<NodeId>,
        first_flags: ActionFlags,
        then_mask: ActionFlags,
        kind: OrderKind,
    ) -> GraphChange;

    /// Returns where a resource is (or will be) located
    fn location(
        &self,
        graph: &ActionGraph,
        rsc: ResourceId,
        current_only: bool,
    ) -> Option<NodeId>;

    /// Called when propagation makes an action unrunnable, so colocated
    /// starts can be blocked in turn
    fn block_colocated_starts(&self, _graph: &mut ActionGraph, _action: ActionId) {}
}

/// Reference policy applying the direct per-kind transfers
///
/// Mirrors the transfers the propagator itself applies to resource-less
/// actions, so primitive-only graphs behave the same whether or not their
/// actions carry resources. Variant-specific refinements (group and clone
/// internals) belong to external policies.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardPolicy;

impl StandardPolicy {
    /// Creates the reference policy
    pub fn new() -> Self {
        Self
    }
}

impl ResourcePolicy for StandardPolicy {
    fn action_flags(
        &self,
        graph: &ActionGraph,
        action: ActionId,
        _node: Option<NodeId>,
    ) -> ActionFlags {
        graph.action(action).flags
    }

    fn update_actions(
        &self,
        graph: &mut ActionGraph,
        first: ActionId,
        then: ActionId,
        _node: Option<NodeId>,
        first_flags: ActionFlags,
        _then_mask: ActionFlags,
        kind: OrderKind,
    ) -> GraphChange {
        let mut changed = GraphChange::empty();
        let first_required = !first_flags.contains(ActionFlags::OPTIONAL);
        let first_unrunnable = !first_flags.contains(ActionFlags::RUNNABLE);

        if kind.contains(OrderKind::IMPLIES_THEN)
            && first_required
            && graph.action(then).flags.contains(ActionFlags::OPTIONAL)
        {
            graph.action_mut(then).flags.remove(ActionFlags::OPTIONAL);
            changed |= GraphChange::UPDATED_THEN;
        }

        if kind.contains(OrderKind::RESTART) {
            if first_required && graph.action(then).flags.contains(ActionFlags::OPTIONAL) {
                graph.action_mut(then).flags.remove(ActionFlags::OPTIONAL);
                changed |= GraphChange::UPDATED_THEN;
            }
            if first_unrunnable && graph.action(then).flags.contains(ActionFlags::RUNNABLE) {
                graph.action_mut(then).flags.remove(ActionFlags::RUNNABLE);
                changed |= GraphChange::UPDATED_THEN;
            }
        }

        if kind.contains(OrderKind::IMPLIES_FIRST)
            && first_required
            && graph.action(first).flags.contains(ActionFlags::RUNNABLE)
        {
            graph.action_mut(first).flags.remove(ActionFlags::RUNNABLE);
            changed |= GraphChange::UPDATED_FIRST;
        }

        if kind.contains(OrderKind::PROMOTED_IMPLIES_FIRST)
            && !graph.action(then).flags.contains(ActionFlags::OPTIONAL)
            && graph.action(first).flags.contains(ActionFlags::OPTIONAL)
        {
            graph.action_mut(first).flags.remove(ActionFlags::OPTIONAL);
            changed |= GraphChange::UPDATED_FIRST;
        }

        if kind.contains(OrderKind::ONE_OR_MORE)
            && first_flags.contains(ActionFlags::RUNNABLE)
        {
            let then_action = graph.action_mut(then);
            then_action.runnable_before += 1;
            if then_action.runnable_before >= then_action.required_runnable_before
                && !then_action.flags.contains(ActionFlags::RUNNABLE)
            {
                then_action.flags.insert(ActionFlags::RUNNABLE);
                changed |= GraphChange::UPDATED_THEN;
            }
        }

        if kind.intersects(OrderKind::RUNNABLE_LEFT | OrderKind::OPTIONAL | OrderKind::ASYMMETRICAL)
            && first_unrunnable
            && graph.action(then).flags.contains(ActionFlags::RUNNABLE)
        {
            graph.action_mut(then).flags.remove(ActionFlags::RUNNABLE);
            changed |= GraphChange::UPDATED_THEN;
        }

        if kind.contains(OrderKind::PSEUDO_LEFT)
            && first_unrunnable
            && graph.action(then).flags.contains(ActionFlags::PSEUDO)
            && graph.action(then).flags.contains(ActionFlags::RUNNABLE)
        {
            graph.action_mut(then).flags.remove(ActionFlags::RUNNABLE);
            changed |= GraphChange::UPDATED_THEN;
        }

        if kind.contains(OrderKind::IMPLIES_FIRST_MIGRATABLE)
            && !graph.action(then).flags.contains(ActionFlags::OPTIONAL)
            && graph.action(first).flags.contains(ActionFlags::MIGRATABLE)
        {
            graph.action_mut(first).flags.remove(ActionFlags::MIGRATABLE);
            changed |= GraphChange::UPDATED_FIRST;
        }

        changed
    }

    fn location(
        &self,
        graph: &ActionGraph,
        rsc: ResourceId,
        current_only: bool,
    ) -> Option<NodeId> {
        let resource = graph.resource(rsc);
        if current_only {
            return resource.running_on.first().copied();
        }
        resource
            .assigned_to
            .or_else(|| resource.running_on.first().copied())
    }
}
