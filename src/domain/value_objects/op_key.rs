//! Operation key value object module
//!
//! Actions are identified by operation keys of the form
//! `<resource>_<task>_<interval_ms>`. Resource ids may themselves contain
//! underscores, so keys are parsed from the right.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error raised when an operation key cannot be parsed
#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not a valid operation key")]
pub struct OpKeyParseError(pub String);

/// A parsed operation key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpKey {
    /// Resource id the operation applies to
    pub rsc_id: String,
    /// Task name (e.g. `start`, `stop`, `monitor`)
    pub task: String,
    /// Operation interval in milliseconds (0 for one-shot operations)
    pub interval_ms: u64,
}

impl OpKey {
    /// Composes an operation key from its parts
    pub fn new(rsc_id: &str, task: &str, interval_ms: u64) -> Self {
        Self {
            rsc_id: rsc_id.to_string(),
            task: task.to_string(),
            interval_ms,
        }
    }

    /// Parses an operation key, splitting from the right
    ///
    /// # Errors
    ///
    /// Returns [`OpKeyParseError`] if the key has fewer than three
    /// `_`-separated parts or a non-numeric interval.
    pub fn parse(key: &str) -> Result<Self, OpKeyParseError> {
        let invalid = || OpKeyParseError(key.to_string());

        let (rest, interval) = key.rsplit_once('_').ok_or_else(invalid)?;
        let interval_ms = interval.parse::<u64>().map_err(|_| invalid())?;
        let (rsc_id, task) = rest.rsplit_once('_').ok_or_else(invalid)?;
        if rsc_id.is_empty() || task.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            rsc_id: rsc_id.to_string(),
            task: task.to_string(),
            interval_ms,
        })
    }
}

impl fmt::Display for OpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.rsc_id, self.task, self.interval_ms)
    }
}

/// Composes a notification operation key
///
/// Notification actions carry the notify type between the resource id and
/// the notified task, e.g. `db_confirmed-post_notify_started_0`.
pub fn notify_key(rsc_id: &str, notify_type: &str, task: &str) -> String {
    format!("{}_{}_notify_{}_0", rsc_id, notify_type, task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_key() {
        let key = OpKey::parse("db_start_0").unwrap();
        assert_eq!(key.rsc_id, "db");
        assert_eq!(key.task, "start");
        assert_eq!(key.interval_ms, 0);
    }

    #[test]
    fn test_parse_rsc_id_with_underscores() {
        let key = OpKey::parse("my_db_clone_monitor_10000").unwrap();
        assert_eq!(key.rsc_id, "my_db_clone");
        assert_eq!(key.task, "monitor");
        assert_eq!(key.interval_ms, 10000);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(OpKey::parse("start_0").is_err());
        assert!(OpKey::parse("db_start_soon").is_err());
        assert!(OpKey::parse("").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let key = OpKey::new("my_db", "stop", 0);
        assert_eq!(OpKey::parse(&key.to_string()).unwrap(), key);
    }

    #[test]
    fn test_notify_key() {
        assert_eq!(
            notify_key("db", "confirmed-post", "started"),
            "db_confirmed-post_notify_started_0"
        );
    }
}
