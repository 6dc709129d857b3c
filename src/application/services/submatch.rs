//! Regex submatch expansion service module
//!
//! Rules that match resource ids by pattern may refer to capture groups in
//! attribute names and values as `%0` through `%9`. This module expands
//! those references against the matched text.

/// Byte ranges of regex submatches over the matched text
///
/// `None` entries are groups that did not participate in the match.
pub type Submatches = Vec<Option<(usize, usize)>>;

/// Builds a submatch table from regex captures
///
/// # Arguments
///
/// * `captures` - Captures of a regex match over the text the table will be
///   applied to
///
/// # Returns
///
/// Byte ranges of the capture groups, `None` for groups that did not
/// participate
pub fn submatches_from_captures(captures: &regex::Captures) -> Submatches {
    captures
        .iter()
        .map(|group| group.map(|m| (m.start(), m.end())))
        .collect()
}

/// Expands `%0`–`%9` submatch references in a template
///
/// A `%n` whose submatch is present and non-empty is replaced by the
/// corresponding slice of `matched`; a `%n` without a usable submatch
/// expands to nothing; every other character copies verbatim.
///
/// The result is built in a single allocation sized by a measurement pass.
///
/// # Arguments
///
/// * `template` - Text possibly containing `%0`-`%9` references
/// * `matched` - Text the submatch ranges index into
/// * `submatches` - Byte ranges of the submatches over `matched`
///
/// # Returns
///
/// The expanded string, or `None` when the template is empty or no
/// reference was expanded (callers read `None` as "no rewriting needed")
pub fn replace_submatches(
    template: &str,
    matched: &str,
    submatches: &[Option<(usize, usize)>],
) -> Option<String> {
    if template.is_empty() {
        return None;
    }

    let bytes = template.as_bytes();

    // Resolve a %n reference at byte offset i to its submatch slice
    let reference_at = |i: usize| -> Option<Option<(usize, usize)>> {
        if bytes[i] == b'%' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() {
            let group = (bytes[i + 1] - b'0') as usize;
            Some(submatches.get(group).copied().flatten().filter(|(so, eo)| eo > so))
        } else {
            None
        }
    };

    // Measurement pass: exact output length, and whether anything expands
    let mut len = 0;
    let mut expanded = false;
    let mut i = 0;
    while i < bytes.len() {
        match reference_at(i) {
            Some(Some((so, eo))) => {
                len += eo - so;
                expanded = true;
                i += 2;
            }
            Some(None) => i += 2,
            None => {
                len += 1;
                i += 1;
            }
        }
    }

    if !expanded {
        return None;
    }

    // References start at an ASCII '%', so literal segments between them
    // are always char-aligned
    let mut result = String::with_capacity(len);
    let mut segment_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match reference_at(i) {
            Some(reference) => {
                result.push_str(&template[segment_start..i]);
                if let Some((so, eo)) = reference {
                    result.push_str(&matched[so..eo]);
                }
                i += 2;
                segment_start = i;
            }
            None => i += 1,
        }
    }
    result.push_str(&template[segment_start..]);

    Some(result)
}
