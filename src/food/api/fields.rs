//! Parsing of raw nutrient values returned by the remote source.
//!
//! The free tier of the remote API replaces some numbers with a fixed
//! message. Everything that knows about that message lives here.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

/// Phrase the remote source puts in place of a number it will not disclose.
pub const GATING_SENTINEL: &str = "only available for premium subscribers";

lazy_static! {
    static ref FIRST_NUMBER: Regex =
        Regex::new(r"\d+(?:\.\d+)?(?:[eE][+-]?\d+)?").expect("valid number pattern");
}

/// A parsed nutrient value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Number(f64),
    /// Withheld by the source's access tier.
    Restricted,
    /// Present but unusable: not a number and not the gating message.
    Unknown,
}

impl FieldValue {
    pub fn number(self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Value to store when the field is unknown or withheld.
    pub fn or_zero(self) -> f64 {
        self.number().unwrap_or(0.0)
    }

    pub fn is_missing(self) -> bool {
        !matches!(self, FieldValue::Number(_))
    }
}

pub fn is_gating_message(text: &str) -> bool {
    text.to_lowercase().contains(GATING_SENTINEL)
}

/// Parses a textual nutrient value.
///
/// Standard decimal first, then the gating message, then the first
/// decimal-looking substring ("12.5 g", "approx. 1.2e2"). Negative or
/// non-finite numbers are never returned.
pub fn parse_field_str(raw: &str) -> FieldValue {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<f64>() {
        return checked(n);
    }
    if is_gating_message(trimmed) {
        return FieldValue::Restricted;
    }
    match FIRST_NUMBER.find(trimmed) {
        Some(m) => match m.as_str().parse::<f64>() {
            Ok(n) => checked(n),
            Err(_) => FieldValue::Unknown,
        },
        None => FieldValue::Unknown,
    }
}

/// Parses a JSON nutrient value, which may be a number or a string.
pub fn parse_field(raw: &Value) -> FieldValue {
    match raw {
        Value::Number(n) => n.as_f64().map(checked).unwrap_or(FieldValue::Unknown),
        Value::String(s) => parse_field_str(s),
        _ => FieldValue::Unknown,
    }
}

fn checked(n: f64) -> FieldValue {
    if n.is_finite() && n >= 0.0 {
        FieldValue::Number(n)
    } else {
        FieldValue::Unknown
    }
}
