pub mod action;
pub mod graph;
pub mod node;
pub mod ordering;
pub mod resource;

pub use action::{Action, ActionFlags, ActionId, TaskKind};
pub use graph::ActionGraph;
pub use node::{Node, NodeId};
pub use ordering::{EdgeId, GraphChange, OrderKind, OrderingEdge};
pub use resource::{Resource, ResourceFlags, ResourceId, ResourceVariant};
