//! # Criteria Parser
//!
//! Parses raw form / query-string fields into a [`Criteria`].
//!
//! Input is a flat `field → value` map as produced by a form submission:
//! ```text
//! category=5&min_price=10&max_price=50&pa_color=red&availability=in_stock
//! ```
//!
//! Empty values mean "not specified". How malformed numbers are treated is
//! governed by [`NumericPolicy`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::criteria::{self, Availability, Criteria, CriteriaBuilder};

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static OCTET_REGEX: OnceLock<Regex> = OnceLock::new();
static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn octet_regex() -> &'static Regex {
    OCTET_REGEX.get_or_init(|| Regex::new(r"%[a-fA-F0-9]{2}").unwrap())
}

fn slug_regex() -> &'static Regex {
    SLUG_REGEX.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap())
}

/// How the parser treats malformed numeric and slug input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericPolicy {
    /// Coerce to a default: bad prices become 0, bad categories are dropped.
    #[default]
    Coerce,
    /// Reject the request with a per-field error.
    Strict,
}

impl std::fmt::Display for NumericPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coerce => write!(f, "coerce"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// A rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

/// Every field the parser rejected, in dimension order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub errors: Vec<FieldError>,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.reason))
            .collect();
        write!(f, "invalid filter criteria ({})", parts.join("; "))
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, Copy, Default)]
pub struct CriteriaParser {
    policy: NumericPolicy,
}

impl CriteriaParser {
    pub fn new(policy: NumericPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> NumericPolicy {
        self.policy
    }

    /// Parse a raw field map. Unknown fields are ignored.
    pub fn parse(&self, params: &HashMap<String, String>) -> Result<Criteria, ParseError> {
        let mut errors = Vec::new();
        let mut builder = Criteria::builder();

        if let Some(raw) = field(params, &[criteria::CATEGORY]) {
            if let Some(id) = self.parse_category(raw, &mut errors) {
                builder = builder.category(id);
            }
        }

        if let Some(raw) = field(params, &[criteria::MIN_PRICE]) {
            if let Some(price) = self.parse_price(criteria::MIN_PRICE, raw, &mut errors) {
                builder = builder.min_price(price);
            }
        }

        if let Some(raw) = field(params, &[criteria::MAX_PRICE]) {
            if let Some(price) = self.parse_price(criteria::MAX_PRICE, raw, &mut errors) {
                builder = builder.max_price(price);
            }
        }

        if let Some(raw) = field(params, &[criteria::COLOR, criteria::COLOR_ALIAS]) {
            if let Some(slug) = self.parse_slug(criteria::COLOR, raw, &mut errors) {
                builder = builder.color(slug);
            }
        }

        if let Some(raw) = field(params, &[criteria::SIZE, criteria::SIZE_ALIAS]) {
            if let Some(slug) = self.parse_slug(criteria::SIZE, raw, &mut errors) {
                builder = builder.size(slug);
            }
        }

        if let Some(raw) = field(params, &[criteria::BRAND]) {
            let brand = sanitize_text(raw);
            if !brand.is_empty() {
                builder = builder.brand(brand);
            }
        }

        builder = apply_availability(builder, params);

        if errors.is_empty() {
            Ok(builder.build())
        } else {
            Err(ParseError { errors })
        }
    }

    fn parse_category(&self, raw: &str, errors: &mut Vec<FieldError>) -> Option<u64> {
        if let Ok(id) = raw.parse::<i64>() {
            return match id {
                // "All Categories" in the dropdown posts 0.
                0 => None,
                id if id > 0 => Some(id as u64),
                _ => match self.policy {
                    NumericPolicy::Coerce => None,
                    NumericPolicy::Strict => {
                        self.reject(criteria::CATEGORY, "must be a positive integer", errors)
                    }
                },
            };
        }
        match self.policy {
            NumericPolicy::Coerce => numeric_prefix(raw)
                .and_then(|n| n.parse::<f64>().ok())
                .filter(|n| *n >= 1.0)
                .map(|n| n.trunc() as u64),
            NumericPolicy::Strict => self.reject(criteria::CATEGORY, "not an integer", errors),
        }
    }

    fn parse_price(
        &self,
        name: &'static str,
        raw: &str,
        errors: &mut Vec<FieldError>,
    ) -> Option<f64> {
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
            Ok(v) if v.is_finite() => match self.policy {
                NumericPolicy::Coerce => Some(0.0),
                NumericPolicy::Strict => self.reject(name, "must not be negative", errors),
            },
            // Overflow ("1e999"), "inf" and "nan" parse but are not prices.
            Ok(_) => match self.policy {
                NumericPolicy::Coerce => Some(0.0),
                NumericPolicy::Strict => self.reject(name, "not a finite number", errors),
            },
            Err(_) => match self.policy {
                NumericPolicy::Coerce => Some(
                    numeric_prefix(raw)
                        .and_then(|n| n.parse::<f64>().ok())
                        .map(|n| n.max(0.0))
                        .unwrap_or(0.0),
                ),
                NumericPolicy::Strict => self.reject(name, "not a number", errors),
            },
        }
    }

    fn parse_slug(
        &self,
        name: &'static str,
        raw: &str,
        errors: &mut Vec<FieldError>,
    ) -> Option<String> {
        let slug = sanitize_text(raw);
        if slug.is_empty() {
            return None;
        }
        if self.policy == NumericPolicy::Strict && !is_slug(&slug) {
            return self.reject(name, "not a valid term slug", errors);
        }
        Some(slug)
    }

    fn reject<T>(
        &self,
        field: &'static str,
        reason: &str,
        errors: &mut Vec<FieldError>,
    ) -> Option<T> {
        errors.push(FieldError {
            field,
            reason: reason.to_string(),
        });
        None
    }
}

fn apply_availability(builder: CriteriaBuilder, params: &HashMap<String, String>) -> CriteriaBuilder {
    match field(params, &[criteria::AVAILABILITY]) {
        Some(raw) => builder.availability(Availability::from_param(raw)),
        None => builder,
    }
}

/// First of `names` carrying a non-blank value, trimmed.
fn field<'a>(params: &'a HashMap<String, String>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| params.get(*name))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

/// Longest leading decimal number in `raw` (`"12.5abc"` → `"12.5"`).
fn numeric_prefix(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-') | Some(b'+')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            has_digits = true;
            end = frac_end;
        }
    }
    has_digits.then(|| &raw[..end])
}

/// Cleans a free-text field before it reaches a query or is echoed back.
///
/// Removes markup tags and percent-encoded octets, turns line breaks and tabs
/// into spaces, drops the remaining control characters, collapses whitespace
/// runs and trims.
pub fn sanitize_text(raw: &str) -> String {
    let without_tags = tag_regex().replace_all(raw, "");
    let without_octets = octet_regex().replace_all(&without_tags, "");
    let cleaned: String = without_octets
        .chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            '<' | '>' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase ASCII letters, digits, `-` and `_`.
pub fn is_slug(value: &str) -> bool {
    slug_regex().is_match(value)
}
