//! The value classifier (SPEC_FULL.md §4.5): turns a resolved scalar
//! `Entry` into a `serde_json::Value`.
//!
//! Grounded on the teacher's implicit-tag resolver (pattern-based type
//! detection backed by pre-compiled `regex`, `chrono`, and `base64`), but
//! rebuilt to classify directly into `serde_json::Value` instead of a
//! bound Python object.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use crate::element::{Entry, Tag};
use crate::error::{YamlError, YamlErrorKind, YamlResult};
use crate::scanner::NEWLINE_PLACEHOLDER;

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?[0-9]+$").unwrap());
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$").unwrap()
});
static FLOAT_REQUIRES_DOT_OR_EXP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.eE]").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap());
static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}[Tt ][0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?(Z|[-+][0-9]{2}:?[0-9]{2})?$")
        .unwrap()
});

/// Turn the internal newline placeholder back into a real newline. This
/// is the only place outside the emitter allowed to do that, since a
/// value might still be re-quoted as a JSON string key elsewhere.
fn restore_newlines(text: &str) -> String {
    text.replace(NEWLINE_PLACEHOLDER, "\n")
}

fn is_null(text: &str) -> bool {
    matches!(text, "" | "~" | "null" | "Null" | "NULL")
}

fn is_true(text: &str, yes_no_bool: bool) -> bool {
    matches!(text, "true" | "True" | "TRUE") || (yes_no_bool && matches!(text, "yes" | "Yes" | "YES"))
}

fn is_false(text: &str, yes_no_bool: bool) -> bool {
    matches!(text, "false" | "False" | "FALSE") || (yes_no_bool && matches!(text, "no" | "No" | "NO"))
}

fn looks_like_timestamp(text: &str) -> bool {
    DATE_RE.is_match(text) || DATETIME_RE.is_match(text)
}

fn parse_timestamp(text: &str, line: usize) -> YamlResult<String> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&chrono::Utc).to_rfc3339());
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date.format("%Y-%m-%d").to_string());
    }
    let normalized = text.replacen(' ', "T", 1).replacen("t", "T", 1);
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.with_timezone(&chrono::Utc).to_rfc3339());
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S") {
        return Ok(format!("{}Z", naive.format("%Y-%m-%dT%H:%M:%S")));
    }
    Err(YamlError::parse(
        YamlErrorKind::ValueIncompatibleWithTag,
        line,
        format!("'{text}' is not a valid timestamp"),
    ))
}

fn decode_binary(text: &str, line: usize) -> YamlResult<Value> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64.decode(cleaned).map_err(|e| {
        YamlError::parse(
            YamlErrorKind::ValueIncompatibleWithTag,
            line,
            format!("invalid base64 for !!binary: {e}"),
        )
    })?;
    Ok(Value::Array(bytes.into_iter().map(|b| Value::Number(b.into())).collect()))
}

/// Classify a resolved scalar entry into its final JSON value.
pub fn classify(entry: &Entry, yes_no_bool: bool) -> YamlResult<Value> {
    let text = restore_newlines(&entry.value);

    if let Some(tag) = entry.tag {
        return classify_tagged(tag, &text, entry.line);
    }

    if entry.literal {
        return Ok(Value::String(text));
    }

    if is_null(&text) {
        return Ok(Value::Null);
    }
    if is_true(&text, yes_no_bool) {
        return Ok(Value::Bool(true));
    }
    if is_false(&text, yes_no_bool) {
        return Ok(Value::Bool(false));
    }
    if looks_like_timestamp(&text) {
        // Only an explicit `!!timestamp` tag is allowed to fail here; a
        // plain scalar that merely looks timestamp-shaped falls back to
        // a string, matching the guarantee that untagged input never
        // errors except `!!binary`.
        if let Ok(normalized) = parse_timestamp(&text, entry.line) {
            return Ok(Value::String(normalized));
        }
        return Ok(Value::String(text));
    }
    if INT_RE.is_match(&text) {
        if let Ok(n) = text.parse::<i64>() {
            return Ok(Value::Number(Number::from(n)));
        }
    }
    if FLOAT_RE.is_match(&text) && FLOAT_REQUIRES_DOT_OR_EXP.is_match(&text) {
        if let Ok(f) = text.parse::<f64>() {
            if let Some(n) = Number::from_f64(f) {
                return Ok(Value::Number(n));
            }
        }
    }
    Ok(Value::String(text))
}

fn classify_tagged(tag: Tag, text: &str, line: usize) -> YamlResult<Value> {
    match tag {
        Tag::Str => Ok(Value::String(text.to_string())),
        Tag::Null => {
            if !text.trim().is_empty() && !is_null(text) {
                return Err(YamlError::parse(
                    YamlErrorKind::ValueIncompatibleWithTag,
                    line,
                    format!("'{text}' is not a valid !!null value"),
                ));
            }
            Ok(Value::Null)
        }
        Tag::Bool => {
            if is_true(text, true) {
                Ok(Value::Bool(true))
            } else if is_false(text, true) {
                Ok(Value::Bool(false))
            } else {
                Err(YamlError::parse(
                    YamlErrorKind::ValueIncompatibleWithTag,
                    line,
                    format!("'{text}' is not a valid !!bool value"),
                ))
            }
        }
        Tag::Int => text.parse::<i64>().map(|n| Value::Number(Number::from(n))).map_err(|_| {
            YamlError::parse(
                YamlErrorKind::ValueIncompatibleWithTag,
                line,
                format!("'{text}' is not a valid !!int value"),
            )
        }),
        Tag::Float => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| {
                YamlError::parse(
                    YamlErrorKind::ValueIncompatibleWithTag,
                    line,
                    format!("'{text}' is not a valid !!float value"),
                )
            }),
        Tag::Timestamp => Ok(Value::String(parse_timestamp(text, line)?)),
        Tag::Binary => decode_binary(text, line),
        // A bare `!!map`/`!!seq` tag with no inline flow body and no
        // nested lines reaches here as an empty scalar; render the
        // corresponding empty container rather than panicking.
        Tag::Map if text.trim().is_empty() => Ok(Value::Object(serde_json::Map::new())),
        Tag::Seq if text.trim().is_empty() => Ok(Value::Array(Vec::new())),
        Tag::Map | Tag::Seq => Err(YamlError::parse(
            YamlErrorKind::ValueIncompatibleWithTag,
            line,
            format!("'{text}' cannot carry a !!map/!!seq tag as a scalar"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: &str) -> Entry {
        Entry::new(value, 0, 1)
    }

    #[test]
    fn classifies_booleans_and_yes_no() {
        assert_eq!(classify(&entry("true"), false).unwrap(), Value::Bool(true));
        assert_eq!(classify(&entry("yes"), true).unwrap(), Value::Bool(true));
        assert_eq!(classify(&entry("no"), true).unwrap(), Value::Bool(false));
        assert_eq!(classify(&entry("yes"), false).unwrap(), Value::String("yes".into()));
    }

    #[test]
    fn classifies_numbers() {
        assert_eq!(classify(&entry("42"), false).unwrap(), Value::Number(42.into()));
        assert_eq!(classify(&entry("-3.5"), false).unwrap(), Value::Number(Number::from_f64(-3.5).unwrap()));
    }

    #[test]
    fn literal_scalars_stay_strings() {
        let mut e = entry("true");
        e.literal = true;
        assert_eq!(classify(&e, false).unwrap(), Value::String("true".into()));
    }

    #[test]
    fn classifies_binary_tag() {
        let mut e = entry("aGVsbG8=");
        e.tag = Some(Tag::Binary);
        let v = classify(&e, false).unwrap();
        assert_eq!(v, Value::Array(vec![104, 101, 108, 108, 111].into_iter().map(|b| Value::Number(b.into())).collect()));
    }

    #[test]
    fn restores_embedded_newlines() {
        let e = entry(&format!("a{}b", NEWLINE_PLACEHOLDER));
        assert_eq!(classify(&e, false).unwrap(), Value::String("a\nb".into()));
    }

    #[test]
    fn normalizes_timestamp_offset_to_utc() {
        let e = entry("2024-01-01T10:00:00+02:00");
        assert_eq!(
            classify(&e, false).unwrap(),
            Value::String("2024-01-01T08:00:00+00:00".into())
        );
    }

    #[test]
    fn unparseable_timestamp_shaped_scalar_falls_back_to_string() {
        let e = entry("2001-12-14 21:59:43.10");
        assert_eq!(
            classify(&e, false).unwrap(),
            Value::String("2001-12-14 21:59:43.10".into())
        );
    }
}
