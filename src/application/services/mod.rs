pub mod action_expansion;
pub mod date_rules;
pub mod graph_diagnostics;
pub mod ordering_propagator;
pub mod rule_evaluator;
pub mod submatch;

pub use date_rules::DateRules;
pub use graph_diagnostics::OrderingDiagnostics;
pub use ordering_propagator::OrderingPropagator;
pub use rule_evaluator::{RuleEvaluator, RuleInput};
