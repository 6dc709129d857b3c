//! Numeric range value object module
//!
//! This module defines the inclusive integer ranges used by date
//! specifications. Either endpoint may be absent, meaning unbounded on that
//! side.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error raised when a range string cannot be parsed
#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not a valid range")]
pub struct RangeParseError(pub String);

/// Where a value falls relative to a range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RangePosition {
    Before,
    Within,
    After,
}

/// An inclusive integer range with optional endpoints
///
/// Parsed from strings of the form `"N"` (exactly N), `"N-"` (N or later),
/// `"-N"` (N or earlier), and `"N-M"` (N through M).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NumericRange {
    pub low: Option<i64>,
    pub high: Option<i64>,
}

impl NumericRange {
    /// Parses a range string
    ///
    /// # Errors
    ///
    /// Returns [`RangeParseError`] if the string is empty, has no endpoint
    /// at all (`"-"`), or contains a non-numeric endpoint.
    pub fn parse(text: &str) -> Result<Self, RangeParseError> {
        let invalid = || RangeParseError(text.to_string());

        if text.is_empty() || text == "-" {
            return Err(invalid());
        }

        let parse_endpoint = |s: &str| s.parse::<i64>().map_err(|_| invalid());

        if let Some(high) = text.strip_prefix('-') {
            return Ok(Self {
                low: None,
                high: Some(parse_endpoint(high)?),
            });
        }
        if let Some(low) = text.strip_suffix('-') {
            return Ok(Self {
                low: Some(parse_endpoint(low)?),
                high: None,
            });
        }
        if let Some((low, high)) = text.split_once('-') {
            return Ok(Self {
                low: Some(parse_endpoint(low)?),
                high: Some(parse_endpoint(high)?),
            });
        }

        let exact = parse_endpoint(text)?;
        Ok(Self {
            low: Some(exact),
            high: Some(exact),
        })
    }

    /// Classifies a value as before, within, or after this range
    ///
    /// An absent endpoint never excludes a value, so classification is total
    /// over all inputs.
    pub fn position(&self, value: i64) -> RangePosition {
        if let Some(low) = self.low {
            if value < low {
                return RangePosition::Before;
            }
        }
        if let Some(high) = self.high {
            if value > high {
                return RangePosition::After;
            }
        }
        RangePosition::Within
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.low, self.high) {
            (Some(low), Some(high)) if low == high => write!(f, "{}", low),
            (Some(low), Some(high)) => write!(f, "{}-{}", low, high),
            (Some(low), None) => write!(f, "{}-", low),
            (None, Some(high)) => write!(f, "-{}", high),
            (None, None) => write!(f, "-"),
        }
    }
}
