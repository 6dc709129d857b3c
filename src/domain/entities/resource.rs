//! Resource entity module
//!
//! This module defines the cluster resource record consumed by the ordering
//! propagator. How a resource computes its own scores and actions is the job
//! of external policy modules; the core only needs the structural facts
//! recorded here.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::domain::entities::action::ActionId;
use crate::domain::entities::node::NodeId;

/// Handle of a resource in an [`crate::domain::entities::graph::ActionGraph`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResourceId(pub(crate) usize);

impl ResourceId {
    /// Returns the arena index of this resource
    pub fn index(self) -> usize {
        self.0
    }
}

/// Resource families, ordered from simple to composite
///
/// The ordering is semantic: `variant >= Group` means the resource derives
/// its actions from children and participates in action expansion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResourceVariant {
    /// A single resource agent instance
    Primitive,
    /// An ordered set of primitives started and stopped as a unit
    Group,
    /// Multiple instances of the same resource across nodes
    Clone,
    /// A containerized resource with its own inner resources
    Container,
}

impl ResourceVariant {
    /// Checks whether this variant derives its actions from children
    ///
    /// # Returns
    ///
    /// `true` for group, clone, and container resources
    pub fn is_composite(self) -> bool {
        self >= ResourceVariant::Group
    }
}

bitflags! {
    /// Boolean properties of a resource
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResourceFlags: u32 {
        /// The cluster is allowed to start and stop this resource
        const MANAGED = 1 << 0;
        /// A failed stop has blocked further actions on this resource
        const BLOCKED = 1 << 1;
        /// This resource wants notify operations around state changes
        const NOTIFY = 1 << 2;
        /// A pending reload replaces a full restart
        const RELOAD = 1 << 3;
    }
}

/// A cluster resource as seen by the ordering propagator
#[derive(Debug, Clone)]
pub struct Resource {
    /// Configured resource id
    pub id: String,
    /// Resource family
    pub variant: ResourceVariant,
    /// Boolean properties
    pub flags: ResourceFlags,
    /// Enclosing composite resource, if any
    pub parent: Option<ResourceId>,
    /// Actions scheduled for this resource, used by action expansion
    pub actions: Vec<ActionId>,
    /// Nodes the resource is currently active on
    pub running_on: Vec<NodeId>,
    /// Node the resource has been assigned to for the coming transition
    pub assigned_to: Option<NodeId>,
}

impl Resource {
    /// Creates a new managed resource with no parent and no known location
    ///
    /// # Arguments
    ///
    /// * `id` - Configured resource id
    /// * `variant` - Resource family
    ///
    /// # Returns
    ///
    /// A new Resource with only the MANAGED flag set
    pub fn new(id: &str, variant: ResourceVariant) -> Self {
        Self {
            id: id.to_string(),
            variant,
            flags: ResourceFlags::MANAGED,
            parent: None,
            actions: Vec::new(),
            running_on: Vec::new(),
            assigned_to: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_ordering() {
        assert!(ResourceVariant::Primitive < ResourceVariant::Group);
        assert!(ResourceVariant::Group < ResourceVariant::Clone);
        assert!(ResourceVariant::Clone < ResourceVariant::Container);
    }

    #[test]
    fn test_composite_variants() {
        assert!(!ResourceVariant::Primitive.is_composite());
        assert!(ResourceVariant::Group.is_composite());
        assert!(ResourceVariant::Clone.is_composite());
        assert!(ResourceVariant::Container.is_composite());
    }

    #[test]
    fn test_new_resource_defaults() {
        let rsc = Resource::new("db", ResourceVariant::Primitive);
        assert!(rsc.flags.contains(ResourceFlags::MANAGED));
        assert!(rsc.parent.is_none());
        assert!(rsc.running_on.is_empty());
    }
}
