//! XML element access module
//!
//! Rule configuration reaches the engine as `roxmltree` element nodes. This
//! module collects the small access helpers the evaluators share: named
//! child lookup, id extraction for logging, and typed attribute parsing.
//! Unknown attributes are never an error; the evaluators consult only the
//! names they know.

use roxmltree::Node;

use crate::domain::value_objects::moment::{Moment, MomentError};

/// Returns the first element child with the given tag name
pub fn first_named_child<'a, 'input>(
    parent: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    parent
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
}

/// Returns the element's non-empty `id` attribute
pub fn element_id<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.attribute("id").filter(|id| !id.is_empty())
}

/// Returns the parent element's id for logging purposes
///
/// Falls back to `"implied"` when there is no parent element and
/// `"without ID"` when the parent has none; never empty.
pub fn loggable_parent_id<'a>(node: Node<'a, '_>) -> &'a str {
    match node.parent_element() {
        Some(parent) => element_id(parent).unwrap_or("without ID"),
        None => "implied",
    }
}

/// Parses a date/time attribute
///
/// Returns `Ok(None)` when the attribute is absent and an error only when
/// it is present but unparsable; the caller decides how lenient to be.
pub fn datetime_attr(node: Node, name: &str) -> Result<Option<Moment>, MomentError> {
    match node.attribute(name) {
        Some(text) => Moment::parse(text).map(Some),
        None => Ok(None),
    }
}

/// Parses a signed integer attribute
///
/// Same contract as [`datetime_attr`]: absence is not an error.
pub fn int_attr(node: Node, name: &str) -> Result<Option<i64>, ()> {
    match node.attribute(name) {
        Some(text) => text.trim().parse::<i64>().map(Some).map_err(|_| ()),
        None => Ok(None),
    }
}

/// Parses an interval specification into milliseconds
///
/// Accepts bare milliseconds (`"10000"`) or a number with an `ms`, `s`,
/// `m`, or `h` suffix (case-insensitive). Returns `None` for anything else.
pub fn parse_interval_ms(text: &str) -> Option<u64> {
    let text = text.trim().to_ascii_lowercase();

    let (digits, multiplier) = if let Some(rest) = text.strip_suffix("ms") {
        (rest.to_string(), 1)
    } else if let Some(rest) = text.strip_suffix('s') {
        (rest.to_string(), 1_000)
    } else if let Some(rest) = text.strip_suffix('m') {
        (rest.to_string(), 60_000)
    } else if let Some(rest) = text.strip_suffix('h') {
        (rest.to_string(), 3_600_000)
    } else {
        (text, 1)
    };

    let value = digits.trim().parse::<u64>().ok()?;
    value.checked_mul(multiplier)
}
