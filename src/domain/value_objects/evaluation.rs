//! Evaluation result value object module
//!
//! This module defines the result type shared by all rule evaluation
//! functions. Evaluation never fails with an error; every outcome, including
//! configuration defects, is expressed as one of these values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of evaluating a rule, expression, or range check
///
/// `Ok` and `WithinRange` are both passing outcomes. The distinction is
/// preserved because callers tracking the next-change watermark need to know
/// whether a passing result came from a bounded range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EvalResult {
    /// The check passed (or was vacuously satisfied)
    Ok,
    /// The evaluated moment falls inside the configured range
    WithinRange,
    /// The evaluated moment falls before the configured range
    BeforeRange,
    /// The evaluated moment falls after the configured range
    AfterRange,
    /// Not enough information to decide; treated as non-passing
    Undetermined,
    /// An operation-specific predicate failed
    OpUnsatisfied,
    /// A required input was null or empty
    Invalid,
    /// Malformed element or missing required child (strict mode)
    UnpackError,
}

impl EvalResult {
    /// Returns `true` for the passing outcomes (`Ok` and `WithinRange`)
    pub fn is_passing(self) -> bool {
        matches!(self, EvalResult::Ok | EvalResult::WithinRange)
    }
}

impl fmt::Display for EvalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EvalResult::Ok => "ok",
            EvalResult::WithinRange => "within range",
            EvalResult::BeforeRange => "before range",
            EvalResult::AfterRange => "after range",
            EvalResult::Undetermined => "undetermined",
            EvalResult::OpUnsatisfied => "operation unsatisfied",
            EvalResult::Invalid => "invalid argument",
            EvalResult::UnpackError => "unpack error",
        };
        write!(f, "{}", text)
    }
}
