//! Ordering constraint entity module
//!
//! This module defines the directed `first → then` edges of the action
//! graph and the order-kind bitset that selects which transfer functions
//! apply during propagation.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::domain::entities::action::ActionId;

/// Handle of an edge in an [`crate::domain::entities::graph::ActionGraph`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    /// Returns the arena index of this edge
    pub fn index(self) -> usize {
        self.0
    }
}

bitflags! {
    /// Kinds of ordering between a `first` and a `then` action
    ///
    /// Each bit selects a transfer function in the propagator. An empty set
    /// is the disabled sentinel: bits may only be cleared during
    /// propagation, never set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OrderKind: u32 {
        /// Ordering applies only when both actions are already in the graph
        const OPTIONAL = 1 << 0;
        /// Non-optionality of `then` propagates back to `first`
        const IMPLIES_FIRST = 1 << 1;
        /// Non-optionality of `first` propagates to `then`
        const IMPLIES_THEN = 1 << 2;
        /// Role-specific variant of `IMPLIES_FIRST` for promoted instances
        const PROMOTED_IMPLIES_FIRST = 1 << 3;
        /// A required `then` clears `first`'s migratable flag
        const IMPLIES_FIRST_MIGRATABLE = 1 << 4;
        /// Non-runnability of `first` propagates to `then`
        const RUNNABLE_LEFT = 1 << 5;
        /// Non-runnability of `first` blocks a pseudo `then`
        const PSEUDO_LEFT = 1 << 6;
        /// A required `first` forces `then` into graph output
        const IMPLIES_THEN_PRINTED = 1 << 7;
        /// A required `then` forces `first` into graph output
        const IMPLIES_FIRST_PRINTED = 1 << 8;
        /// One-way ordering: `then` is not pulled in by `first`
        const ASYMMETRICAL = 1 << 9;
        /// Combined optional and runnable transfer for restarts
        const RESTART = 1 << 10;
        /// `then` becomes runnable once enough `first` predecessors are
        const ONE_OR_MORE = 1 << 11;
        /// Probe ordering: satisfied when `first` is a stop of a running
        /// resource
        const PROBE = 1 << 12;
        /// Constraint is void when the two actions are on different nodes
        const SAME_NODE = 1 << 13;
        /// `IMPLIES_THEN`, but pinned to `first`'s node (unfencing)
        const IMPLIES_THEN_ON_NODE = 1 << 14;
        /// A required `then` makes `first` optional (reload cancellation)
        const THEN_CANCELS_FIRST = 1 << 15;
    }
}

bitflags! {
    /// Change report of a per-edge transfer
    ///
    /// Tells the propagation driver which endpoint to re-enter and whether
    /// the edge itself should be disabled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GraphChange: u32 {
        /// Flags changed on the `first` endpoint
        const UPDATED_FIRST = 1 << 0;
        /// Flags changed on the `then` endpoint
        const UPDATED_THEN = 1 << 1;
        /// The edge must be disabled by the driver
        const DISABLE = 1 << 2;
    }
}

/// A directed ordering constraint between two actions
///
/// Every edge appears in the `before` list of its `then` action and the
/// `after` list of its `first` action under the same handle.
#[derive(Debug, Clone)]
pub struct OrderingEdge {
    /// The action that comes first
    pub first: ActionId,
    /// The action ordered after `first`
    pub then: ActionId,
    /// Order kinds in effect; empty means the edge is disabled
    pub kind: OrderKind,
}

impl OrderingEdge {
    /// Checks whether the edge has been disabled
    ///
    /// # Returns
    ///
    /// `true` once propagation has cleared every order-kind bit
    pub fn is_disabled(&self) -> bool {
        self.kind.is_empty()
    }
}
