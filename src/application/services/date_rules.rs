//! Date rule evaluation service module
//!
//! This service evaluates the temporal half of the rule language: range
//! checks, `date_spec` elements, `duration` elements, and full
//! `date_expression` elements. Results are always [`EvalResult`] values;
//! configuration defects go to the [`ConfigSink`] and map to the most
//! lenient safe outcome unless strict mode is enabled.

use roxmltree::Node;
use tracing::trace;

use crate::domain::ports::config_sink::ConfigSink;
use crate::domain::value_objects::evaluation::EvalResult;
use crate::domain::value_objects::moment::{Moment, DURATION_COMPONENTS};
use crate::domain::value_objects::range::{NumericRange, RangePosition};
use crate::infrastructure::parsers::xml_support::{
    datetime_attr, element_id, first_named_child, int_attr, loggable_parent_id,
};

/// Range attributes of a `date_spec` element, in evaluation order
const DATE_SPEC_COMPONENTS: [&str; 11] = [
    "years",
    "months",
    "monthdays",
    "hours",
    "minutes",
    "seconds",
    "yeardays",
    "weekyears",
    "weeks",
    "weekdays",
    "moon",
];

/// Evaluator for the date portion of the rule language
pub struct DateRules<'a> {
    sink: &'a dyn ConfigSink,
    strict: bool,
}

impl<'a> DateRules<'a> {
    /// Creates an evaluator in legacy-lenient mode
    ///
    /// # Arguments
    ///
    /// * `sink` - Sink configuration warnings and errors are sent to
    ///
    /// # Returns
    ///
    /// A new DateRules evaluator with strict mode off
    pub fn new(sink: &'a dyn ConfigSink) -> Self {
        Self {
            sink,
            strict: false,
        }
    }

    /// Enables or disables strict mode
    ///
    /// In strict mode, configuration defects that legacy behavior tolerates
    /// fail the evaluation instead.
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

    /// Checks one range attribute of a date specification against a value
    ///
    /// An absent attribute passes. An unparsable range warns and passes in
    /// legacy mode (`Invalid` in strict mode), so the remaining attributes
    /// still get checked.
    ///
    /// # Arguments
    ///
    /// * `date_spec` - `date_spec` element holding the range attribute
    /// * `id` - Specification id for logging purposes
    /// * `attr` - Name of the range attribute to check
    /// * `value` - Calendar component value to classify
    ///
    /// # Returns
    ///
    /// `Ok`, `BeforeRange`, or `AfterRange` (`Invalid` for an unparsable
    /// range in strict mode)
    pub fn check_range(
        &self,
        date_spec: Node,
        id: &str,
        attr: &str,
        value: i64,
    ) -> EvalResult {
        let Some(range_text) = date_spec.attribute(attr) else {
            return EvalResult::Ok;
        };

        let rc = match NumericRange::parse(range_text) {
            Err(_) => {
                self.sink.config_warn(&format!(
                    "Ignoring date_spec {} attribute {} because '{}' is not a valid range",
                    id, attr, range_text
                ));
                if self.strict {
                    EvalResult::Invalid
                } else {
                    EvalResult::Ok
                }
            }
            Ok(range) => match range.position(value) {
                RangePosition::Before => EvalResult::BeforeRange,
                RangePosition::After => EvalResult::AfterRange,
                RangePosition::Within => EvalResult::Ok,
            },
        };

        trace!(
            "Checked date_spec {} {}='{}' for {}: {}",
            id,
            attr,
            range_text,
            value,
            rc
        );
        rc
    }

    /// Evaluates a `date_spec` element for a given moment
    ///
    /// Every calendar component is computed exactly once; the attributes are
    /// then checked in a fixed order and the first non-passing result wins.
    /// An empty specification passes.
    ///
    /// # Arguments
    ///
    /// * `date_spec` - `date_spec` element to evaluate
    /// * `now` - Moment to evaluate the specification at
    ///
    /// # Returns
    ///
    /// `Ok` if every given range admits `now`, otherwise the first
    /// non-passing range result
    pub fn evaluate_date_spec(&self, date_spec: Node, now: &Moment) -> EvalResult {
        let parent_id = loggable_parent_id(date_spec);
        let id = match element_id(date_spec) {
            Some(id) => id,
            None => {
                self.sink.config_warn(&format!(
                    "date_spec subelement of date_expression {} has no id",
                    parent_id
                ));
                if self.strict {
                    return EvalResult::UnpackError;
                }
                "without ID"
            }
        };

        let (year, month, monthday) = now.gregorian();
        let (hour, minute, second) = now.time_of_day();
        let (_, yearday) = now.ordinal();
        let (weekyear, week, weekday) = now.iso_week();

        if date_spec.attribute("moon").is_some() {
            self.sink.config_warn(&format!(
                "Support for 'moon' in date_spec elements (such as {}) is deprecated \
                 and will be removed in a future release",
                id
            ));
        }

        let values = [
            year,
            month,
            monthday,
            hour,
            minute,
            second,
            yearday,
            weekyear,
            week,
            weekday,
            moon_phase(now),
        ];

        for (attr, value) in DATE_SPEC_COMPONENTS.iter().copied().zip(values) {
            let rc = self.check_range(date_spec, id, attr, value);
            if rc != EvalResult::Ok {
                return rc;
            }
        }

        // All given ranges passed, or none were given
        EvalResult::Ok
    }

    /// Adds a `duration` element to a start moment, yielding the end moment
    ///
    /// Invalid components warn and are skipped; the returned code is the
    /// last sub-error but an end moment is always produced.
    ///
    /// # Arguments
    ///
    /// * `duration` - `duration` element holding the component offsets
    /// * `start` - Moment the duration is added to
    ///
    /// # Returns
    ///
    /// Tuple of the end moment and the last sub-error code (`Ok` when every
    /// component applied cleanly)
    pub fn unpack_duration(&self, duration: Node, start: &Moment) -> (Moment, EvalResult) {
        let parent_id = loggable_parent_id(duration);
        let id = match element_id(duration) {
            Some(id) => id,
            None => {
                self.sink.config_warn(&format!(
                    "duration subelement of date_expression {} has no id",
                    parent_id
                ));
                if self.strict {
                    return (*start, EvalResult::UnpackError);
                }
                "without ID"
            }
        };

        let mut end = *start;
        let mut rc = EvalResult::Ok;
        for component in DURATION_COMPONENTS {
            let invalid = |sink: &dyn ConfigSink| {
                sink.config_warn(&format!(
                    "Ignoring {} in duration {} because it is invalid",
                    component.as_str(),
                    id
                ));
            };
            match int_attr(duration, component.as_str()) {
                Ok(None) => {}
                Ok(Some(amount)) => match end.add(component, amount) {
                    Ok(added) => end = added,
                    Err(_) => {
                        invalid(self.sink);
                        rc = EvalResult::UnpackError;
                    }
                },
                Err(()) => {
                    invalid(self.sink);
                    rc = EvalResult::UnpackError;
                }
            }
        }

        (end, rc)
    }

    /// Evaluates a `date_expression` element for a given moment
    ///
    /// Dispatches on the `operation` attribute (`in_range` when absent).
    /// When the evaluation has a known flip point, `next_change` is lowered
    /// to it; `date_spec` operations never lower it.
    ///
    /// # Arguments
    ///
    /// * `expr` - `date_expression` element to evaluate
    /// * `now` - Moment to evaluate the expression at
    /// * `next_change` - Watermark to lower to the evaluation's flip point,
    ///   if one is known and earlier
    ///
    /// # Returns
    ///
    /// The operation's placement result; `Ok` and `WithinRange` are both
    /// passing
    pub fn evaluate_date_expression(
        &self,
        expr: Node,
        now: &Moment,
        next_change: Option<&mut Moment>,
    ) -> EvalResult {
        let id = match element_id(expr) {
            Some(id) => id,
            None => {
                self.sink
                    .config_warn("date_expression element has no id");
                if self.strict {
                    return EvalResult::UnpackError;
                }
                "without ID"
            }
        };

        let op = expr.attribute("operation");
        let rc = match op {
            None => self.evaluate_in_range(expr, id, now, next_change),
            Some(op) if op.eq_ignore_ascii_case("in_range") => {
                self.evaluate_in_range(expr, id, now, next_change)
            }
            Some(op) if op.eq_ignore_ascii_case("date_spec") => {
                match first_named_child(expr, "date_spec") {
                    None => {
                        self.sink.config_warn(&format!(
                            "Treating date_expression {} as not passing because date_spec \
                             operations require a date_spec subelement",
                            id
                        ));
                        if self.strict {
                            EvalResult::UnpackError
                        } else {
                            EvalResult::Undetermined
                        }
                    }
                    // The flip point of a date_spec is not computed, so
                    // next_change stays untouched on this branch
                    Some(spec) => self.evaluate_date_spec(spec, now),
                }
            }
            Some(op) if op.eq_ignore_ascii_case("gt") => {
                self.evaluate_gt(expr, id, now, next_change)
            }
            Some(op) if op.eq_ignore_ascii_case("lt") => {
                self.evaluate_lt(expr, id, now, next_change)
            }
            Some(op) => {
                self.sink.config_warn(&format!(
                    "Treating date_expression {} as not passing because '{}' is not a \
                     valid operation",
                    id, op
                ));
                if self.strict {
                    EvalResult::UnpackError
                } else {
                    EvalResult::Undetermined
                }
            }
        };

        trace!(
            "date_expression {} ({}): {}",
            id,
            op.unwrap_or("in_range"),
            rc
        );
        rc
    }

    fn evaluate_in_range(
        &self,
        expr: Node,
        id: &str,
        now: &Moment,
        mut next_change: Option<&mut Moment>,
    ) -> EvalResult {
        let start = match datetime_attr(expr, "start") {
            Ok(start) => start,
            Err(_) => {
                self.sink.config_warn(&format!(
                    "Ignoring start in date_expression {} because it is invalid",
                    id
                ));
                if self.strict {
                    return EvalResult::UnpackError;
                }
                None
            }
        };
        let mut end = match datetime_attr(expr, "end") {
            Ok(end) => end,
            Err(_) => {
                self.sink.config_warn(&format!(
                    "Ignoring end in date_expression {} because it is invalid",
                    id
                ));
                if self.strict {
                    return EvalResult::UnpackError;
                }
                None
            }
        };

        if start.is_none() && end.is_none() {
            self.sink.config_warn(&format!(
                "Treating date_expression {} as not passing because in_range requires \
                 at least one of start or end",
                id
            ));
            return if self.strict {
                EvalResult::UnpackError
            } else {
                EvalResult::Undetermined
            };
        }

        if end.is_none() {
            if let (Some(start), Some(duration)) =
                (start.as_ref(), first_named_child(expr, "duration"))
            {
                let (derived, sub_rc) = self.unpack_duration(duration, start);
                if self.strict && sub_rc != EvalResult::Ok {
                    return sub_rc;
                }
                end = Some(derived);
            }
        }

        if let Some(start) = start {
            if *now < start {
                if let Some(next_change) = next_change.as_deref_mut() {
                    next_change.set_if_earlier(&start);
                }
                return EvalResult::BeforeRange;
            }
        }

        if let Some(end) = end {
            if *now > end {
                return EvalResult::AfterRange;
            }
            // Evaluation doesn't change until the second after the end
            if let Some(next_change) = next_change.as_deref_mut() {
                next_change.set_if_earlier(&end.add_seconds(1));
            }
        }

        EvalResult::WithinRange
    }

    fn evaluate_gt(
        &self,
        expr: Node,
        id: &str,
        now: &Moment,
        next_change: Option<&mut Moment>,
    ) -> EvalResult {
        let start = match datetime_attr(expr, "start") {
            Err(_) => {
                self.sink.config_warn(&format!(
                    "Treating date_expression {} as not passing because start is invalid",
                    id
                ));
                return if self.strict {
                    EvalResult::UnpackError
                } else {
                    EvalResult::Undetermined
                };
            }
            Ok(None) => {
                self.sink.config_warn(&format!(
                    "Treating date_expression {} as not passing because gt requires start",
                    id
                ));
                return if self.strict {
                    EvalResult::UnpackError
                } else {
                    EvalResult::Undetermined
                };
            }
            Ok(Some(start)) => start,
        };

        if *now > start {
            return EvalResult::WithinRange;
        }

        // Evaluation doesn't change until the second after the start
        if let Some(next_change) = next_change {
            next_change.set_if_earlier(&start.add_seconds(1));
        }
        EvalResult::BeforeRange
    }

    fn evaluate_lt(
        &self,
        expr: Node,
        id: &str,
        now: &Moment,
        next_change: Option<&mut Moment>,
    ) -> EvalResult {
        let end = match datetime_attr(expr, "end") {
            Err(_) => {
                self.sink.config_warn(&format!(
                    "Treating date_expression {} as not passing because end is invalid",
                    id
                ));
                return if self.strict {
                    EvalResult::UnpackError
                } else {
                    EvalResult::Undetermined
                };
            }
            Ok(None) => {
                self.sink.config_warn(&format!(
                    "Treating date_expression {} as not passing because lt requires end",
                    id
                ));
                return if self.strict {
                    EvalResult::UnpackError
                } else {
                    EvalResult::Undetermined
                };
            }
            Ok(Some(end)) => end,
        };

        if *now < end {
            if let Some(next_change) = next_change {
                next_change.set_if_earlier(&end);
            }
            return EvalResult::WithinRange;
        }
        EvalResult::AfterRange
    }
}

/// Moon phase for a moment, 0 (new) through 7 (full)
///
/// The nethack formula, kept bit-exact for compatibility with existing
/// configurations that still use the deprecated `moon` attribute.
fn moon_phase(now: &Moment) -> i64 {
    let (year, day_of_year) = now.ordinal();
    let goldn = (year % 19) + 1;
    let mut epact = (11 * goldn + 18) % 30;
    if (epact == 25 && goldn > 11) || epact == 24 {
        epact += 1;
    }
    ((((day_of_year + epact) * 6) + 11) % 177) / 22 & 7
}
