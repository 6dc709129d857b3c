pub mod evaluate_rules;
pub mod settle_ordering;

pub use evaluate_rules::EvaluateRules;
pub use settle_ordering::{SettleOrdering, SettleReport};
