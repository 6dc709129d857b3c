//! Action entity module
//!
//! This module defines scheduled actions and their flag set. Actions are the
//! vertices of the transition graph; ordering constraints between them are
//! [`crate::domain::entities::ordering::OrderingEdge`] values.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::entities::node::NodeId;
use crate::domain::entities::ordering::EdgeId;
use crate::domain::entities::resource::ResourceId;

/// Handle of an action in an [`crate::domain::entities::graph::ActionGraph`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ActionId(pub(crate) usize);

impl ActionId {
    /// Returns the arena index of this action
    pub fn index(self) -> usize {
        self.0
    }
}

/// Task names an action can carry
///
/// Each state-changing task has a completed counterpart used by action
/// expansion on composite resources. `Started` reads back as `running`,
/// matching the identifier form used in operation keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskKind {
    Stop,
    Stopped,
    Start,
    Started,
    Notify,
    Notified,
    Promote,
    Promoted,
    Demote,
    Demoted,
    Monitor,
    Shutdown,
    Fence,
    ReloadAgent,
}

impl TaskKind {
    /// Parses a task name from its operation-key form
    ///
    /// # Arguments
    ///
    /// * `text` - Task name as it appears in an operation key
    ///
    /// # Returns
    ///
    /// The matching TaskKind, or `None` for unknown names
    pub fn from_text(text: &str) -> Option<Self> {
        match text {
            "stop" => Some(TaskKind::Stop),
            "stopped" => Some(TaskKind::Stopped),
            "start" => Some(TaskKind::Start),
            "running" => Some(TaskKind::Started),
            "notify" => Some(TaskKind::Notify),
            "notified" => Some(TaskKind::Notified),
            "promote" => Some(TaskKind::Promote),
            "promoted" => Some(TaskKind::Promoted),
            "demote" => Some(TaskKind::Demote),
            "demoted" => Some(TaskKind::Demoted),
            "monitor" => Some(TaskKind::Monitor),
            "shutdown" => Some(TaskKind::Shutdown),
            "fence" => Some(TaskKind::Fence),
            "reload-agent" => Some(TaskKind::ReloadAgent),
            _ => None,
        }
    }

    /// Returns the operation-key form of this task
    ///
    /// # Returns
    ///
    /// The task name as it appears in operation keys
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Stop => "stop",
            TaskKind::Stopped => "stopped",
            TaskKind::Start => "start",
            TaskKind::Started => "running",
            TaskKind::Notify => "notify",
            TaskKind::Notified => "notified",
            TaskKind::Promote => "promote",
            TaskKind::Promoted => "promoted",
            TaskKind::Demote => "demote",
            TaskKind::Demoted => "demoted",
            TaskKind::Monitor => "monitor",
            TaskKind::Shutdown => "shutdown",
            TaskKind::Fence => "fence",
            TaskKind::ReloadAgent => "reload-agent",
        }
    }

    /// Maps a pending task to its completed counterpart
    ///
    /// Already-completed tasks map to themselves.
    ///
    /// # Returns
    ///
    /// The completed counterpart, or `None` for monitor, shutdown, fencing,
    /// and reload tasks, which have no completed form
    pub fn completed(self) -> Option<TaskKind> {
        match self {
            TaskKind::Stop | TaskKind::Stopped => Some(TaskKind::Stopped),
            TaskKind::Start | TaskKind::Started => Some(TaskKind::Started),
            TaskKind::Notify | TaskKind::Notified => Some(TaskKind::Notified),
            TaskKind::Promote | TaskKind::Promoted => Some(TaskKind::Promoted),
            TaskKind::Demote | TaskKind::Demoted => Some(TaskKind::Demoted),
            TaskKind::Monitor
            | TaskKind::Shutdown
            | TaskKind::Fence
            | TaskKind::ReloadAgent => None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

bitflags! {
    /// Boolean properties of an action
    ///
    /// During ordering propagation these bits are monotone: propagation only
    /// clears them, with two bounded exceptions (`RUNNABLE` restoration via
    /// the one-or-more counting rule and the requires-any reset).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ActionFlags: u32 {
        /// A synthetic event, not an operation executed on a node
        const PSEUDO = 1 << 0;
        /// The action can be executed in this transition
        const RUNNABLE = 1 << 1;
        /// The action is not needed unless something requires it
        const OPTIONAL = 1 << 2;
        /// Always keep the action in graph output
        const PRINT_ALWAYS = 1 << 3;
        /// Runnable once enough predecessors are runnable (see
        /// `required_runnable_before`)
        const REQUIRES_ANY = 1 << 4;
        /// The action can be replaced by a live migration
        const MIGRATABLE = 1 << 5;
    }
}

/// A scheduled operation on a resource, or a node-level or pseudo event
#[derive(Debug, Clone)]
pub struct Action {
    /// Operation key identifying the action (e.g. `db_start_0`)
    pub key: String,
    /// Task this action performs
    pub task: TaskKind,
    /// Resource the action operates on, if any
    pub rsc: Option<ResourceId>,
    /// Node the action is assigned to, if any
    pub node: Option<NodeId>,
    /// Boolean properties
    pub flags: ActionFlags,
    /// Inbound ordering edges: this action is the `then` endpoint.
    /// Iteration order is insertion order and is observable.
    pub before: Vec<EdgeId>,
    /// Outbound ordering edges: this action is the `first` endpoint
    pub after: Vec<EdgeId>,
    /// Runnable predecessors counted so far under `REQUIRES_ANY`
    pub runnable_before: u32,
    /// Runnable predecessors needed before this action becomes runnable
    pub required_runnable_before: u32,
}

impl Action {
    /// Creates a new runnable, non-optional action
    ///
    /// # Arguments
    ///
    /// * `key` - Operation key identifying the action
    /// * `task` - Task the action performs
    ///
    /// # Returns
    ///
    /// A new Action with only the RUNNABLE flag set and no resource or node
    pub fn new(key: &str, task: TaskKind) -> Self {
        Self {
            key: key.to_string(),
            task,
            rsc: None,
            node: None,
            flags: ActionFlags::RUNNABLE,
            before: Vec::new(),
            after: Vec::new(),
            runnable_before: 0,
            required_runnable_before: 0,
        }
    }

    /// Sets the resource this action operates on
    ///
    /// # Arguments
    ///
    /// * `rsc` - Handle of the resource
    ///
    /// # Returns
    ///
    /// The action with the resource set
    pub fn on_resource(mut self, rsc: ResourceId) -> Self {
        self.rsc = Some(rsc);
        self
    }

    /// Sets the node this action is assigned to
    ///
    /// # Arguments
    ///
    /// * `node` - Handle of the node
    ///
    /// # Returns
    ///
    /// The action with the node set
    pub fn on_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Replaces the action's flags
    ///
    /// # Arguments
    ///
    /// * `flags` - Flag set to use instead of the defaults
    ///
    /// # Returns
    ///
    /// The action with the given flags
    pub fn with_flags(mut self, flags: ActionFlags) -> Self {
        self.flags = flags;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_text_roundtrip() {
        for task in [
            TaskKind::Stop,
            TaskKind::Started,
            TaskKind::Promote,
            TaskKind::Monitor,
            TaskKind::ReloadAgent,
        ] {
            assert_eq!(TaskKind::from_text(task.as_str()), Some(task));
        }
        assert_eq!(TaskKind::from_text("bounce"), None);
    }

    #[test]
    fn test_completed_counterparts() {
        assert_eq!(TaskKind::Stop.completed(), Some(TaskKind::Stopped));
        assert_eq!(TaskKind::Start.completed(), Some(TaskKind::Started));
        assert_eq!(TaskKind::Started.completed(), Some(TaskKind::Started));
        assert_eq!(TaskKind::Monitor.completed(), None);
        assert_eq!(TaskKind::Fence.completed(), None);
    }

    #[test]
    fn test_new_action_defaults() {
        let action = Action::new("db_start_0", TaskKind::Start);
        assert!(action.flags.contains(ActionFlags::RUNNABLE));
        assert!(!action.flags.contains(ActionFlags::OPTIONAL));
        assert!(action.before.is_empty());
        assert!(action.after.is_empty());
    }
}
