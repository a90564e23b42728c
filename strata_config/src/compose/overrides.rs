//! Parsing of command-line `key=value` overrides.

use serde_json::Value;

use crate::error::{StrataError, StrataResult};
use crate::node::MISSING_TOKEN;
use crate::result_ext::StrataResultExt;

/// A single parsed override: a dotted key path and its raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    /// Dotted key path; dots denote nesting.
    pub key: String,
    /// Parsed scalar value.
    pub value: Value,
}

/// Parse raw override strings into key/value pairs.
///
/// # Errors
///
/// Returns a composition error for a string without exactly one `=` or
/// with an empty key.
pub fn parse_overrides(raw: &[String]) -> StrataResult<Vec<Override>> {
    raw.iter().map(|s| parse_override(s).into_shared()).collect()
}

fn parse_override(raw: &str) -> Result<Override, StrataError> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(StrataError::composition(
            raw,
            "override",
            "expected 'key=value'",
        ));
    };
    if key.is_empty() {
        return Err(StrataError::composition(
            raw,
            "override",
            "override key is empty",
        ));
    }
    if value.contains('=') {
        return Err(StrataError::composition(
            raw,
            "override",
            "expected exactly one '='",
        ));
    }
    Ok(Override {
        key: key.to_owned(),
        value: parse_scalar(value),
    })
}

/// Parse a raw override value into a scalar.
///
/// Booleans, integers, floats, `null`/`~` and quoted strings are
/// recognised; everything else, including the `???` MISSING token, stays a
/// string.
#[must_use]
pub fn parse_scalar(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" | "~" => return Value::Null,
        MISSING_TOKEN => return Value::String(MISSING_TOKEN.to_owned()),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = raw.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(float) {
            return Value::Number(number);
        }
    }
    for quote in ['"', '\''] {
        if let Some(inner) = raw
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Value::String(inner.to_owned());
        }
    }
    Value::String(raw.to_owned())
}
