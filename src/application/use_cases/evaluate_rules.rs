use roxmltree::Document;

use crate::application::services::rule_evaluator::{RuleEvaluator, RuleInput};
use crate::domain::ports::config_sink::ConfigSink;
use crate::domain::value_objects::evaluation::EvalResult;
use crate::domain::value_objects::moment::Moment;

/// Parses a rule document and evaluates it against a rule input
///
/// Thin entry point for callers holding rule XML as text; anything already
/// holding element nodes uses [`RuleEvaluator`] directly.
pub struct EvaluateRules<'a> {
    sink: &'a dyn ConfigSink,
    strict: bool,
}

impl<'a> EvaluateRules<'a> {
    pub fn new(sink: &'a dyn ConfigSink) -> Self {
        Self {
            sink,
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Evaluates the root `rule` element of an XML document
    ///
    /// # Errors
    ///
    /// Returns the parse error if `rule_xml` is not well-formed XML; rule
    /// evaluation itself never fails, it returns an [`EvalResult`].
    pub fn execute(
        &self,
        rule_xml: &str,
        input: &RuleInput,
        next_change: Option<&mut Moment>,
    ) -> Result<EvalResult, roxmltree::Error> {
        let doc = Document::parse(rule_xml)?;
        Ok(RuleEvaluator::new(self.sink)
            .strict(self.strict)
            .evaluate_rule(doc.root_element(), input, next_change))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::config_sink::RecordingSink;
    use anyhow::Result;
    use std::collections::HashMap;

    #[test]
    fn test_evaluate_rule_document_with_watermark() -> Result<()> {
        let now = Moment::parse("2024-01-15T00:00:00Z")?;
        let node_attrs = HashMap::new();
        let input = RuleInput::new(&now, &node_attrs);
        let mut next_change = Moment::parse("2030-01-01T00:00:00Z")?;

        let sink = RecordingSink::new();
        let rc = EvaluateRules::new(&sink).execute(
            r#"<rule id="maintenance-window">
                 <date_expression id="e" operation="in_range"
                                  start="2024-01-01T00:00:00Z">
                   <duration id="d" months="1"/>
                 </date_expression>
               </rule>"#,
            &input,
            Some(&mut next_change),
        )?;

        assert_eq!(rc, EvalResult::Ok);
        assert_eq!(next_change, Moment::parse("2024-02-01T00:00:01Z")?);
        Ok(())
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let now = Moment::parse("2024-01-15T00:00:00Z").unwrap();
        let node_attrs = HashMap::new();
        let input = RuleInput::new(&now, &node_attrs);

        let sink = RecordingSink::new();
        assert!(EvaluateRules::new(&sink)
            .execute("<rule id='r'", &input, None)
            .is_err());
    }
}
