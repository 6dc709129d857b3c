//! Action expansion service module
//!
//! Ordering constraints against a composite resource's `start` or `stop`
//! really mean "after the whole thing is started/stopped". At ordering time
//! those actions are rewritten to their completed counterparts (`start` →
//! `running`, `stop` → `stopped`, ...), or to the post-notification form
//! when the resource notifies.

use tracing::trace;

use crate::domain::entities::action::{ActionId, TaskKind};
use crate::domain::entities::graph::ActionGraph;
use crate::domain::entities::resource::{ResourceFlags, ResourceId, ResourceVariant};
use crate::domain::ports::config_sink::ConfigSink;
use crate::domain::value_objects::op_key::{notify_key, OpKey};

/// Rewrites an operation key to its completed form for a composite resource
///
/// # Arguments
///
/// * `graph` - Graph holding the resource
/// * `sink` - Sink for errors about malformed or unknown keys
/// * `key` - Operation key to convert
/// * `rsc` - Resource the key belongs to
/// * `allow_notify` - Whether the notification form may be used
///
/// # Returns
///
/// The converted key, or `None` when no conversion applies: notification
/// keys, simple resources, recurring operations, and tasks without a
/// completed form (monitor, shutdown, fencing) are left alone
pub fn convert_non_atomic_key(
    graph: &ActionGraph,
    sink: &dyn ConfigSink,
    key: &str,
    rsc: ResourceId,
    allow_notify: bool,
) -> Option<String> {
    if key.contains("notify") {
        return None;
    }
    let resource = graph.resource(rsc);
    if resource.variant < ResourceVariant::Group {
        return None;
    }

    let op = match OpKey::parse(key) {
        Ok(op) => op,
        Err(_) => {
            sink.config_err(&format!(
                "Cannot expand malformed operation key '{}' for {}",
                key, resource.id
            ));
            return None;
        }
    };
    if op.interval_ms > 0 {
        return None;
    }

    let task = match TaskKind::from_text(&op.task) {
        Some(task) => task,
        None => {
            sink.config_err(&format!("Unknown action: {}", op.task));
            return None;
        }
    };
    let completed = task.completed()?;

    let converted = if allow_notify && resource.flags.contains(ResourceFlags::NOTIFY) {
        notify_key(&op.rsc_id, "confirmed-post", completed.as_str())
    } else {
        OpKey::new(&op.rsc_id, completed.as_str(), 0).to_string()
    };
    trace!("Converted {} -> {}", key, converted);
    Some(converted)
}

/// Replaces a composite resource's action with its completed counterpart
///
/// The converted key is looked up in the resource's action list; on a miss
/// an error is logged and the original action is returned unchanged.
///
/// # Arguments
///
/// * `graph` - Graph holding the action and its resource
/// * `sink` - Sink for expansion errors
/// * `action` - Action to expand
///
/// # Returns
///
/// The handle of the expanded action, or `action` itself when no expansion
/// applies
pub fn expand_action(graph: &ActionGraph, sink: &dyn ConfigSink, action: ActionId) -> ActionId {
    let Some(rsc) = graph.action(action).rsc else {
        return action;
    };
    let resource = graph.resource(rsc);

    // Only outermost resources have notification actions, except clones
    // directly inside a container
    let notify = match resource.parent {
        None => resource.flags.contains(ResourceFlags::NOTIFY),
        Some(parent) => {
            if resource.variant == ResourceVariant::Clone
                && graph.resource(parent).variant == ResourceVariant::Container
            {
                resource.flags.contains(ResourceFlags::NOTIFY)
            } else {
                false
            }
        }
    };

    if resource.variant >= ResourceVariant::Group {
        let key = &graph.action(action).key;
        if let Some(converted) = convert_non_atomic_key(graph, sink, key, rsc, notify) {
            match graph.find_resource_action(rsc, &converted) {
                Some(expanded) => return expanded,
                None => {
                    sink.config_err(&format!(
                        "Couldn't expand {} to {} in {}",
                        key, converted, resource.id
                    ));
                    return action;
                }
            }
        }
    }
    action
}
