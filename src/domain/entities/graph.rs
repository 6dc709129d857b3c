//! Action graph entity module
//!
//! This module defines the arena holding actions, ordering edges, resources,
//! and nodes, all addressed by integer handles. Adjacency lists are vectors
//! of edge handles kept in insertion order; that order is observable (it
//! decides tie-breaks in one-or-more counting) and must be preserved.

use crate::domain::entities::action::{Action, ActionId};
use crate::domain::entities::node::{Node, NodeId};
use crate::domain::entities::ordering::{EdgeId, OrderKind, OrderingEdge};
use crate::domain::entities::resource::{Resource, ResourceId};

/// Arena of actions, edges, resources, and nodes for one scheduler run
///
/// Every edge is dual-listed: it appears in the `before` list of its `then`
/// action and the `after` list of its `first` action under the same handle.
#[derive(Debug, Default)]
pub struct ActionGraph {
    actions: Vec<Action>,
    edges: Vec<OrderingEdge>,
    resources: Vec<Resource>,
    nodes: Vec<Node>,
}

impl ActionGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cluster node
    ///
    /// # Arguments
    ///
    /// * `node` - Node to add
    ///
    /// # Returns
    ///
    /// The handle of the new node
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Adds a resource
    ///
    /// # Arguments
    ///
    /// * `resource` - Resource to add
    ///
    /// # Returns
    ///
    /// The handle of the new resource
    pub fn add_resource(&mut self, resource: Resource) -> ResourceId {
        self.resources.push(resource);
        ResourceId(self.resources.len() - 1)
    }

    /// Adds an action, registering it with its resource if it has one
    ///
    /// # Arguments
    ///
    /// * `action` - Action to add
    ///
    /// # Returns
    ///
    /// The handle of the new action
    pub fn add_action(&mut self, action: Action) -> ActionId {
        let id = ActionId(self.actions.len());
        if let Some(rsc) = action.rsc {
            self.resources[rsc.0].actions.push(id);
        }
        self.actions.push(action);
        id
    }

    /// Creates an ordering edge and links it into both adjacency lists
    ///
    /// # Arguments
    ///
    /// * `first` - Action that comes first
    /// * `then` - Action ordered after `first`
    /// * `kind` - Order kinds the edge carries
    ///
    /// # Returns
    ///
    /// The handle of the new edge
    pub fn order(&mut self, first: ActionId, then: ActionId, kind: OrderKind) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.edges.push(OrderingEdge { first, then, kind });
        self.actions[then.0].before.push(id);
        self.actions[first.0].after.push(id);
        id
    }

    /// Orders `first` before `then` unless they are already ordered
    ///
    /// If an edge between the pair exists, its kind absorbs `kind` and no
    /// new edge is created.
    ///
    /// # Arguments
    ///
    /// * `first` - Action that comes first
    /// * `then` - Action ordered after `first`
    /// * `kind` - Order kinds to carry or absorb
    ///
    /// # Returns
    ///
    /// `true` only when a new edge was added
    pub fn order_if_new(&mut self, first: ActionId, then: ActionId, kind: OrderKind) -> bool {
        for &eid in &self.actions[then.0].before {
            if self.edges[eid.0].first == first {
                self.edges[eid.0].kind |= kind;
                return false;
            }
        }
        self.order(first, then, kind);
        true
    }

    /// Looks up an action by handle
    ///
    /// # Returns
    ///
    /// Shared reference to the action
    pub fn action(&self, id: ActionId) -> &Action {
        &self.actions[id.0]
    }

    /// Looks up an action by handle for mutation
    ///
    /// # Returns
    ///
    /// Mutable reference to the action
    pub fn action_mut(&mut self, id: ActionId) -> &mut Action {
        &mut self.actions[id.0]
    }

    /// Looks up an edge by handle
    ///
    /// # Returns
    ///
    /// Shared reference to the edge
    pub fn edge(&self, id: EdgeId) -> &OrderingEdge {
        &self.edges[id.0]
    }

    /// Looks up an edge by handle for mutation
    ///
    /// # Returns
    ///
    /// Mutable reference to the edge
    pub fn edge_mut(&mut self, id: EdgeId) -> &mut OrderingEdge {
        &mut self.edges[id.0]
    }

    /// Looks up a resource by handle
    ///
    /// # Returns
    ///
    /// Shared reference to the resource
    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id.0]
    }

    /// Looks up a resource by handle for mutation
    ///
    /// # Returns
    ///
    /// Mutable reference to the resource
    pub fn resource_mut(&mut self, id: ResourceId) -> &mut Resource {
        &mut self.resources[id.0]
    }

    /// Looks up a node by handle
    ///
    /// # Returns
    ///
    /// Shared reference to the node
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Iterates over all action handles
    ///
    /// # Returns
    ///
    /// Iterator over action handles in insertion order
    pub fn action_ids(&self) -> impl Iterator<Item = ActionId> {
        (0..self.actions.len()).map(ActionId)
    }

    /// Iterates over all edge handles
    ///
    /// # Returns
    ///
    /// Iterator over edge handles in insertion order
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> {
        (0..self.edges.len()).map(EdgeId)
    }

    /// Counts the actions in the graph
    ///
    /// # Returns
    ///
    /// Number of actions
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Counts the edges in the graph
    ///
    /// # Returns
    ///
    /// Number of edges, including disabled ones
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Checks whether `ancestor` encloses `rsc` (or is `rsc` itself)
    ///
    /// # Arguments
    ///
    /// * `ancestor` - Candidate enclosing resource
    /// * `rsc` - Resource whose parent chain is walked
    ///
    /// # Returns
    ///
    /// `true` if `ancestor` appears in `rsc`'s parent chain
    pub fn is_ancestor(&self, ancestor: ResourceId, rsc: ResourceId) -> bool {
        let mut current = Some(rsc);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.resources[id.0].parent;
        }
        false
    }

    /// Finds an action of `rsc` by operation key
    ///
    /// # Arguments
    ///
    /// * `rsc` - Resource whose action list is searched
    /// * `key` - Operation key to look for
    ///
    /// # Returns
    ///
    /// The handle of the first matching action, or `None`
    pub fn find_resource_action(&self, rsc: ResourceId, key: &str) -> Option<ActionId> {
        self.resources[rsc.0]
            .actions
            .iter()
            .copied()
            .find(|&aid| self.actions[aid.0].key == key)
    }
}
