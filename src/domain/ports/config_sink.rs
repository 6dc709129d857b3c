//! Configuration message sink port module
//!
//! Rule evaluation and ordering propagation report configuration defects
//! through this interface instead of a process-global logger, so callers
//! decide where warnings go and tests can assert on them.

use std::cell::RefCell;

/// Sink for configuration warnings and errors
///
/// Emitting a message is the only side effect rule evaluation has besides
/// the next-change watermark.
pub trait ConfigSink {
    /// Reports a tolerated configuration defect
    fn config_warn(&self, msg: &str);

    /// Reports a configuration defect that prevented an operation
    fn config_err(&self, msg: &str);
}

/// Sink that routes messages to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ConfigSink for TracingSink {
    fn config_warn(&self, msg: &str) {
        tracing::warn!(target: "schedweaver::config", "{}", msg);
    }

    fn config_err(&self, msg: &str) {
        tracing::error!(target: "schedweaver::config", "{}", msg);
    }
}

/// Sink that records messages in memory, for assertions in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    warnings: RefCell<Vec<String>>,
    errors: RefCell<Vec<String>>,
}

impl RecordingSink {
    /// Creates an empty recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all warnings recorded so far
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    /// Returns all errors recorded so far
    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }
}

impl ConfigSink for RecordingSink {
    fn config_warn(&self, msg: &str) {
        self.warnings.borrow_mut().push(msg.to_string());
    }

    fn config_err(&self, msg: &str) {
        self.errors.borrow_mut().push(msg.to_string());
    }
}
