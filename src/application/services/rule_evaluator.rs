//! Rule evaluation service module
//!
//! A rule is a boolean composition of sub-expressions: nested rules, date
//! expressions, node attribute expressions, resource expressions, and
//! operation expressions. This service classifies and evaluates the
//! children of a `rule` element against a [`RuleInput`] and combines the
//! results under the rule's `boolean-op`.

use std::cmp::Ordering;
use std::collections::HashMap;

use roxmltree::Node;
use tracing::trace;

use crate::application::services::date_rules::DateRules;
use crate::application::services::submatch::replace_submatches;
use crate::domain::ports::config_sink::ConfigSink;
use crate::domain::value_objects::evaluation::EvalResult;
use crate::domain::value_objects::moment::Moment;
use crate::infrastructure::parsers::xml_support::{element_id, parse_interval_ms};

/// Context a rule is evaluated against
///
/// Only the fields a given rule actually references need to be populated;
/// everything except the moment and the node attribute table is optional.
pub struct RuleInput<'a> {
    /// Time to evaluate date expressions at
    pub now: &'a Moment,
    /// Attributes of the node being considered
    pub node_attrs: &'a HashMap<String, String>,
    /// Resource standard (e.g. `ocf`) for resource expressions
    pub rsc_standard: Option<&'a str>,
    /// Resource provider for resource expressions
    pub rsc_provider: Option<&'a str>,
    /// Resource agent type for resource expressions
    pub rsc_agent: Option<&'a str>,
    /// Resource instance parameters, for `value-source="param"`
    pub rsc_params: Option<&'a HashMap<String, String>>,
    /// Resource meta attributes, for `value-source="meta"`
    pub rsc_meta: Option<&'a HashMap<String, String>>,
    /// Operation name for operation expressions
    pub op_name: Option<&'a str>,
    /// Operation interval for operation expressions
    pub op_interval_ms: Option<u64>,
    /// Resource id that matched a pattern constraint, for `%n` expansion
    pub rsc_id: Option<&'a str>,
    /// Submatch table of the pattern match over `rsc_id`
    pub rsc_id_submatches: &'a [Option<(usize, usize)>],
}

impl<'a> RuleInput<'a> {
    /// Creates an input with only a moment and node attributes
    ///
    /// # Arguments
    ///
    /// * `now` - Time to evaluate date expressions at
    /// * `node_attrs` - Attributes of the node being considered
    ///
    /// # Returns
    ///
    /// A new RuleInput with every optional field unset
    pub fn new(now: &'a Moment, node_attrs: &'a HashMap<String, String>) -> Self {
        Self {
            now,
            node_attrs,
            rsc_standard: None,
            rsc_provider: None,
            rsc_agent: None,
            rsc_params: None,
            rsc_meta: None,
            op_name: None,
            op_interval_ms: None,
            rsc_id: None,
            rsc_id_submatches: &[],
        }
    }
}

/// How two attribute values are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Defined,
    NotDefined,
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl Comparison {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "defined" => Some(Comparison::Defined),
            "not_defined" => Some(Comparison::NotDefined),
            "eq" => Some(Comparison::Eq),
            "ne" => Some(Comparison::Ne),
            "lt" => Some(Comparison::Lt),
            "gt" => Some(Comparison::Gt),
            "lte" => Some(Comparison::Lte),
            "gte" => Some(Comparison::Gte),
            _ => None,
        }
    }

    fn is_ordering(self) -> bool {
        matches!(
            self,
            Comparison::Lt | Comparison::Gt | Comparison::Lte | Comparison::Gte
        )
    }
}

/// Value domain used for a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    String,
    Integer,
    Number,
    Version,
}

/// Evaluator for rule trees and their non-date sub-expressions
pub struct RuleEvaluator<'a> {
    sink: &'a dyn ConfigSink,
    strict: bool,
}

impl<'a> RuleEvaluator<'a> {
    /// Creates an evaluator in legacy-lenient mode
    ///
    /// # Arguments
    ///
    /// * `sink` - Sink configuration warnings and errors are sent to
    ///
    /// # Returns
    ///
    /// A new RuleEvaluator with strict mode off
    pub fn new(sink: &'a dyn ConfigSink) -> Self {
        Self {
            sink,
            strict: false,
        }
    }

    /// Enables or disables strict mode (see [`DateRules::strict`])
    ///
    /// # Arguments
    ///
    /// * `strict` - Whether configuration defects fail the evaluation
    ///
    /// # Returns
    ///
    /// The evaluator with the requested strictness
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Evaluates a `rule` element and its whole sub-expression tree
    ///
    /// Children are all evaluated (no short-circuit) so the next-change
    /// watermark aggregates over every date sub-expression; the boolean
    /// combination happens afterwards. An empty rule passes.
    ///
    /// # Arguments
    ///
    /// * `rule` - `rule` element to evaluate
    /// * `input` - Context the rule's sub-expressions are matched against
    /// * `next_change` - Watermark to lower to the earliest known flip point
    ///   of any date sub-expression
    ///
    /// # Returns
    ///
    /// `Ok` if the boolean combination of children passes, otherwise
    /// `OpUnsatisfied` (`UnpackError` for defects in strict mode)
    pub fn evaluate_rule(
        &self,
        rule: Node,
        input: &RuleInput,
        mut next_change: Option<&mut Moment>,
    ) -> EvalResult {
        let id = match element_id(rule) {
            Some(id) => id,
            None => {
                self.sink.config_warn("rule element has no id");
                if self.strict {
                    return EvalResult::UnpackError;
                }
                "without ID"
            }
        };

        let require_all = match rule.attribute("boolean-op") {
            None => true,
            Some(op) if op.eq_ignore_ascii_case("and") => true,
            Some(op) if op.eq_ignore_ascii_case("or") => false,
            Some(op) => {
                self.sink.config_warn(&format!(
                    "Rule {} has invalid boolean-op '{}', using 'and'",
                    id, op
                ));
                if self.strict {
                    return EvalResult::UnpackError;
                }
                true
            }
        };

        let mut any_child = false;
        let mut any_passing = false;
        let mut any_failing = false;
        for child in rule.children().filter(|c| c.is_element()) {
            let rc = self.evaluate_condition(child, input, next_change.as_deref_mut());
            any_child = true;
            if rc.is_passing() {
                any_passing = true;
            } else {
                any_failing = true;
            }
        }

        let rc = if !any_child {
            EvalResult::Ok
        } else if require_all {
            if any_failing {
                EvalResult::OpUnsatisfied
            } else {
                EvalResult::Ok
            }
        } else if any_passing {
            EvalResult::Ok
        } else {
            EvalResult::OpUnsatisfied
        };

        trace!(
            "rule {} ({}): {}",
            id,
            if require_all { "and" } else { "or" },
            rc
        );
        rc
    }

    /// Evaluates a single condition element by its tag name
    ///
    /// # Arguments
    ///
    /// * `condition` - Condition element (`rule`, `date_expression`,
    ///   `expression`, `rsc_expression`, or `op_expression`)
    /// * `input` - Context the condition is matched against
    /// * `next_change` - Watermark passed through to date expressions
    ///
    /// # Returns
    ///
    /// The condition's result; unknown element names warn and yield
    /// `Undetermined`
    pub fn evaluate_condition(
        &self,
        condition: Node,
        input: &RuleInput,
        next_change: Option<&mut Moment>,
    ) -> EvalResult {
        match condition.tag_name().name() {
            "rule" => self.evaluate_rule(condition, input, next_change),
            "date_expression" => DateRules::new(self.sink)
                .strict(self.strict)
                .evaluate_date_expression(condition, input.now, next_change),
            "expression" => self.evaluate_attr_expression(condition, input),
            "rsc_expression" => self.evaluate_rsc_expression(condition, input),
            "op_expression" => self.evaluate_op_expression(condition, input),
            other => {
                self.sink.config_warn(&format!(
                    "Treating unknown condition element <{}> as not passing",
                    other
                ));
                EvalResult::Undetermined
            }
        }
    }

    /// Evaluates an `expression` element against the node attributes
    ///
    /// # Arguments
    ///
    /// * `expr` - `expression` element holding attribute, operation, and
    ///   value
    /// * `input` - Context supplying node attributes, resource tables, and
    ///   submatches
    ///
    /// # Returns
    ///
    /// `Ok` if the comparison is satisfied, `OpUnsatisfied` if not, or
    /// `UnpackError` for a malformed expression
    pub fn evaluate_attr_expression(&self, expr: Node, input: &RuleInput) -> EvalResult {
        let id = element_id(expr).unwrap_or("without ID");

        let Some(attr) = expr.attribute("attribute").filter(|a| !a.is_empty()) else {
            self.sink.config_warn(&format!(
                "Treating expression {} as not passing because it has no attribute",
                id
            ));
            return EvalResult::UnpackError;
        };

        let Some(comparison) = expr
            .attribute("operation")
            .and_then(Comparison::parse)
        else {
            self.sink.config_warn(&format!(
                "Treating expression {} as not passing because '{}' is not a valid operation",
                id,
                expr.attribute("operation").unwrap_or("")
            ));
            return EvalResult::UnpackError;
        };

        // Pattern constraints may refer to their capture groups in both the
        // attribute name and the reference value
        let attr = self.expand(attr, input);
        let actual = input.node_attrs.get(attr.as_ref());

        match comparison {
            Comparison::Defined => {
                return if actual.is_some() {
                    EvalResult::Ok
                } else {
                    EvalResult::OpUnsatisfied
                };
            }
            Comparison::NotDefined => {
                return if actual.is_none() {
                    EvalResult::Ok
                } else {
                    EvalResult::OpUnsatisfied
                };
            }
            _ => {}
        }

        let Some(value) = expr.attribute("value") else {
            self.sink.config_warn(&format!(
                "Treating expression {} as not passing because '{}' comparisons require \
                 a value",
                id,
                expr.attribute("operation").unwrap_or("")
            ));
            return EvalResult::UnpackError;
        };
        let value = self.expand(value, input);

        let reference = match expr.attribute("value-source") {
            None | Some("literal") => Some(value.into_owned()),
            Some("param") => input
                .rsc_params
                .and_then(|params| params.get(value.as_ref()).cloned()),
            Some("meta") => input
                .rsc_meta
                .and_then(|meta| meta.get(value.as_ref()).cloned()),
            Some(source) => {
                self.sink.config_warn(&format!(
                    "Treating expression {} as not passing because '{}' is not a valid \
                     value-source",
                    id, source
                ));
                return EvalResult::UnpackError;
            }
        };

        let (Some(actual), Some(reference)) = (actual, reference) else {
            return EvalResult::OpUnsatisfied;
        };

        let value_type = match expr.attribute("type") {
            Some("string") => ValueType::String,
            Some("integer") => ValueType::Integer,
            Some("number") => ValueType::Number,
            Some("version") => ValueType::Version,
            None if comparison.is_ordering() => ValueType::Number,
            None => ValueType::String,
            Some(other) => {
                self.sink.config_warn(&format!(
                    "Treating expression {} as not passing because '{}' is not a valid type",
                    id, other
                ));
                return EvalResult::UnpackError;
            }
        };

        let Some(ordering) = compare_values(actual, &reference, value_type) else {
            return EvalResult::OpUnsatisfied;
        };

        let satisfied = match comparison {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Lte => ordering != Ordering::Greater,
            Comparison::Gte => ordering != Ordering::Less,
            Comparison::Defined | Comparison::NotDefined => unreachable!(),
        };

        if satisfied {
            EvalResult::Ok
        } else {
            EvalResult::OpUnsatisfied
        }
    }

    /// Evaluates an `rsc_expression` element against the resource identity
    ///
    /// Unspecified attributes are wildcards; only the class, provider, and
    /// type values actually given need to match.
    ///
    /// # Arguments
    ///
    /// * `expr` - `rsc_expression` element to evaluate
    /// * `input` - Context supplying the resource identity
    ///
    /// # Returns
    ///
    /// `Ok` if every specified field matches, `OpUnsatisfied` otherwise
    pub fn evaluate_rsc_expression(&self, expr: Node, input: &RuleInput) -> EvalResult {
        let checks = [
            ("class", input.rsc_standard),
            ("provider", input.rsc_provider),
            ("type", input.rsc_agent),
        ];
        for (attr, actual) in checks {
            if let Some(wanted) = expr.attribute(attr) {
                if actual != Some(wanted) {
                    return EvalResult::OpUnsatisfied;
                }
            }
        }
        EvalResult::Ok
    }

    /// Evaluates an `op_expression` element against the operation identity
    ///
    /// # Arguments
    ///
    /// * `expr` - `op_expression` element holding name and optional interval
    /// * `input` - Context supplying the operation name and interval
    ///
    /// # Returns
    ///
    /// `Ok` if name (and interval, when given) match, `OpUnsatisfied` if
    /// not, or `UnpackError` for a malformed expression
    pub fn evaluate_op_expression(&self, expr: Node, input: &RuleInput) -> EvalResult {
        let id = element_id(expr).unwrap_or("without ID");

        let Some(name) = expr.attribute("name") else {
            self.sink.config_warn(&format!(
                "Treating op_expression {} as not passing because it has no name",
                id
            ));
            return EvalResult::UnpackError;
        };

        let interval_ms = match expr.attribute("interval") {
            None => None,
            Some(text) => match parse_interval_ms(text) {
                Some(ms) => Some(ms),
                None => {
                    self.sink.config_warn(&format!(
                        "Treating op_expression {} as not passing because '{}' is not a \
                         valid interval",
                        id, text
                    ));
                    return EvalResult::UnpackError;
                }
            },
        };

        if input.op_name != Some(name) {
            return EvalResult::OpUnsatisfied;
        }
        if let Some(ms) = interval_ms {
            if input.op_interval_ms != Some(ms) {
                return EvalResult::OpUnsatisfied;
            }
        }
        EvalResult::Ok
    }

    /// Expands `%n` submatch references against the matched resource id
    fn expand<'t>(&self, text: &'t str, input: &RuleInput) -> std::borrow::Cow<'t, str> {
        if let Some(rsc_id) = input.rsc_id {
            if let Some(expanded) =
                replace_submatches(text, rsc_id, input.rsc_id_submatches)
            {
                return std::borrow::Cow::Owned(expanded);
            }
        }
        std::borrow::Cow::Borrowed(text)
    }
}

/// Compares two attribute values in the given domain
///
/// Returns `None` when the values cannot be compared in that domain (e.g.
/// non-numeric text under `integer`), which callers treat as unsatisfied.
fn compare_values(actual: &str, reference: &str, value_type: ValueType) -> Option<Ordering> {
    match value_type {
        ValueType::String => Some(
            actual
                .to_ascii_lowercase()
                .cmp(&reference.to_ascii_lowercase()),
        ),
        ValueType::Integer => {
            let lhs = actual.trim().parse::<i64>().ok()?;
            let rhs = reference.trim().parse::<i64>().ok()?;
            Some(lhs.cmp(&rhs))
        }
        ValueType::Number => {
            let lhs = actual.trim().parse::<f64>().ok()?;
            let rhs = reference.trim().parse::<f64>().ok()?;
            lhs.partial_cmp(&rhs)
        }
        ValueType::Version => Some(compare_versions(actual, reference)),
    }
}

/// Compares dotted version strings segment by segment
///
/// Missing segments count as zero, so `1.2` equals `1.2.0` and precedes
/// `1.2.1`. Non-numeric segments count as zero.
fn compare_versions(lhs: &str, rhs: &str) -> Ordering {
    let segment = |s: &str, i: usize| -> i64 {
        s.split('.')
            .nth(i)
            .and_then(|part| part.trim().parse::<i64>().ok())
            .unwrap_or(0)
    };
    let segments = lhs.split('.').count().max(rhs.split('.').count());
    for i in 0..segments {
        let ordering = segment(lhs, i).cmp(&segment(rhs, i));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::submatch::submatches_from_captures;
    use crate::domain::ports::config_sink::RecordingSink;
    use regex::Regex;
    use roxmltree::Document;

    fn moment(text: &str) -> Moment {
        Moment::parse(text).unwrap()
    }

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn eval_rule(xml: &str, input: &RuleInput) -> EvalResult {
        let doc = Document::parse(xml).unwrap();
        let sink = RecordingSink::new();
        RuleEvaluator::new(&sink).evaluate_rule(doc.root_element(), input, None)
    }

    #[test]
    fn test_empty_rule_passes() {
        let now = moment("2024-02-15T00:00:00Z");
        let node_attrs = attrs(&[]);
        let input = RuleInput::new(&now, &node_attrs);
        assert_eq!(eval_rule(r#"<rule id="r"/>"#, &input), EvalResult::Ok);
    }

    #[test]
    fn test_and_requires_all_children() {
        let now = moment("2024-02-15T12:00:00Z");
        let node_attrs = attrs(&[("tier", "gold")]);
        let input = RuleInput::new(&now, &node_attrs);

        let xml = r#"<rule id="r" boolean-op="and">
             <expression id="e1" attribute="tier" operation="eq" value="gold"/>
             <date_expression id="e2" operation="date_spec">
               <date_spec id="s" hours="9-17"/>
             </date_expression>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);

        let off_hours = moment("2024-02-15T06:00:00Z");
        let input = RuleInput::new(&off_hours, &node_attrs);
        assert_eq!(eval_rule(xml, &input), EvalResult::OpUnsatisfied);
    }

    #[test]
    fn test_or_requires_any_child() {
        let now = moment("2024-02-15T06:00:00Z");
        let node_attrs = attrs(&[("tier", "gold")]);
        let input = RuleInput::new(&now, &node_attrs);

        let xml = r#"<rule id="r" boolean-op="or">
             <expression id="e1" attribute="tier" operation="eq" value="bronze"/>
             <expression id="e2" attribute="tier" operation="eq" value="gold"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);

        let xml = r#"<rule id="r" boolean-op="or">
             <expression id="e1" attribute="tier" operation="eq" value="bronze"/>
             <expression id="e2" attribute="tier" operation="eq" value="silver"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::OpUnsatisfied);
    }

    #[test]
    fn test_nested_rules_compose() {
        let now = moment("2024-02-15T12:00:00Z");
        let node_attrs = attrs(&[("tier", "gold"), ("site", "east")]);
        let input = RuleInput::new(&now, &node_attrs);

        let xml = r#"<rule id="outer" boolean-op="and">
             <expression id="e1" attribute="tier" operation="defined"/>
             <rule id="inner" boolean-op="or">
               <expression id="e2" attribute="site" operation="eq" value="west"/>
               <expression id="e3" attribute="site" operation="eq" value="east"/>
             </rule>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);
    }

    #[test]
    fn test_rule_aggregates_watermark_across_children() {
        let now = moment("2024-02-01T00:00:00Z");
        let node_attrs = attrs(&[]);
        let input = RuleInput::new(&now, &node_attrs);
        let mut watermark = moment("2030-01-01T00:00:00Z");

        // The first child already fails, but the second child's flip point
        // must still reach the watermark
        let xml = r#"<rule id="r" boolean-op="and">
             <date_expression id="e1" operation="gt" start="2025-01-01T00:00:00Z"/>
             <date_expression id="e2" operation="lt" end="2024-06-01T00:00:00Z"/>
           </rule>"#;
        let doc = Document::parse(xml).unwrap();
        let sink = RecordingSink::new();
        let rc = RuleEvaluator::new(&sink).evaluate_rule(
            doc.root_element(),
            &input,
            Some(&mut watermark),
        );
        assert_eq!(rc, EvalResult::OpUnsatisfied);
        assert_eq!(watermark, moment("2024-06-01T00:00:00Z"));
    }

    #[test]
    fn test_unknown_condition_element_is_undetermined() {
        let now = moment("2024-02-15T00:00:00Z");
        let node_attrs = attrs(&[]);
        let input = RuleInput::new(&now, &node_attrs);

        let xml = r#"<rule id="r"><when_convenient id="e"/></rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::OpUnsatisfied);
    }

    #[test]
    fn test_attr_expression_numeric_default_for_ordering() {
        let now = moment("2024-02-15T00:00:00Z");
        let node_attrs = attrs(&[("capacity", "90")]);
        let input = RuleInput::new(&now, &node_attrs);

        // "90" > "100" as strings, but ordering comparisons default to numbers
        let xml = r#"<rule id="r">
             <expression id="e" attribute="capacity" operation="lt" value="100"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);
    }

    #[test]
    fn test_attr_expression_string_eq_case_insensitive() {
        let now = moment("2024-02-15T00:00:00Z");
        let node_attrs = attrs(&[("site", "East")]);
        let input = RuleInput::new(&now, &node_attrs);

        let xml = r#"<rule id="r">
             <expression id="e" attribute="site" operation="eq" value="east"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);
    }

    #[test]
    fn test_attr_expression_version_compare() {
        let now = moment("2024-02-15T00:00:00Z");
        let node_attrs = attrs(&[("agent-version", "1.2")]);
        let input = RuleInput::new(&now, &node_attrs);

        let xml = r#"<rule id="r">
             <expression id="e" attribute="agent-version" operation="lt"
                         type="version" value="1.2.1"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);

        let xml = r#"<rule id="r">
             <expression id="e" attribute="agent-version" operation="eq"
                         type="version" value="1.2.0"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);
    }

    #[test]
    fn test_attr_expression_undefined_attribute() {
        let now = moment("2024-02-15T00:00:00Z");
        let node_attrs = attrs(&[]);
        let input = RuleInput::new(&now, &node_attrs);

        let xml = r#"<rule id="r">
             <expression id="e" attribute="tier" operation="not_defined"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);

        let xml = r#"<rule id="r">
             <expression id="e" attribute="tier" operation="eq" value="gold"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::OpUnsatisfied);
    }

    #[test]
    fn test_attr_expression_param_value_source() {
        let now = moment("2024-02-15T00:00:00Z");
        let node_attrs = attrs(&[("preferred-port", "5432")]);
        let params = attrs(&[("port", "5432")]);
        let mut input = RuleInput::new(&now, &node_attrs);
        input.rsc_params = Some(&params);

        let xml = r#"<rule id="r">
             <expression id="e" attribute="preferred-port" operation="eq"
                         value-source="param" value="port"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);
    }

    #[test]
    fn test_attr_expression_submatch_expansion() {
        let now = moment("2024-02-15T00:00:00Z");
        let node_attrs = attrs(&[("db-set-1-role", "primary")]);
        let rsc_id = "db-set-1";
        let re = Regex::new(r"^(db-set-\d+)$").unwrap();
        let submatches = submatches_from_captures(&re.captures(rsc_id).unwrap());

        let mut input = RuleInput::new(&now, &node_attrs);
        input.rsc_id = Some(rsc_id);
        input.rsc_id_submatches = &submatches;

        let xml = r#"<rule id="r">
             <expression id="e" attribute="%1-role" operation="eq" value="primary"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);
    }

    #[test]
    fn test_rsc_expression_matches_identity() {
        let now = moment("2024-02-15T00:00:00Z");
        let node_attrs = attrs(&[]);
        let mut input = RuleInput::new(&now, &node_attrs);
        input.rsc_standard = Some("ocf");
        input.rsc_provider = Some("heartbeat");
        input.rsc_agent = Some("pgsql");

        let xml = r#"<rule id="r">
             <rsc_expression id="e" class="ocf" provider="heartbeat" type="pgsql"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);

        let xml = r#"<rule id="r">
             <rsc_expression id="e" class="ocf" type="mysql"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::OpUnsatisfied);
    }

    #[test]
    fn test_rsc_expression_unspecified_fields_are_wildcards() {
        let now = moment("2024-02-15T00:00:00Z");
        let node_attrs = attrs(&[]);
        let mut input = RuleInput::new(&now, &node_attrs);
        input.rsc_standard = Some("ocf");

        let xml = r#"<rule id="r"><rsc_expression id="e"/></rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);
    }

    #[test]
    fn test_op_expression_name_and_interval() {
        let now = moment("2024-02-15T00:00:00Z");
        let node_attrs = attrs(&[]);
        let mut input = RuleInput::new(&now, &node_attrs);
        input.op_name = Some("monitor");
        input.op_interval_ms = Some(10_000);

        let xml = r#"<rule id="r">
             <op_expression id="e" name="monitor" interval="10s"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::Ok);

        let xml = r#"<rule id="r">
             <op_expression id="e" name="monitor" interval="30s"/>
           </rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::OpUnsatisfied);

        let xml = r#"<rule id="r"><op_expression id="e" name="start"/></rule>"#;
        assert_eq!(eval_rule(xml, &input), EvalResult::OpUnsatisfied);
    }

    #[test]
    fn test_invalid_boolean_op_falls_back_to_and() {
        let now = moment("2024-02-15T00:00:00Z");
        let node_attrs = attrs(&[("tier", "gold")]);
        let input = RuleInput::new(&now, &node_attrs);

        let doc = Document::parse(
            r#"<rule id="r" boolean-op="xor">
                 <expression id="e" attribute="tier" operation="eq" value="gold"/>
               </rule>"#,
        )
        .unwrap();
        let sink = RecordingSink::new();
        let rc = RuleEvaluator::new(&sink).evaluate_rule(doc.root_element(), &input, None);
        assert_eq!(rc, EvalResult::Ok);
        assert!(sink
            .warnings()
            .iter()
            .any(|w| w.contains("invalid boolean-op")));

        let rc = RuleEvaluator::new(&sink)
            .strict(true)
            .evaluate_rule(doc.root_element(), &input, None);
        assert_eq!(rc, EvalResult::UnpackError);
    }
}
