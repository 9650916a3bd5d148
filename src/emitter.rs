//! The JSON emitter (SPEC_FULL.md §4.5, emission half): walks the fully
//! resolved flat element list and builds the corresponding
//! `serde_json::Value` tree, then renders it to text.
//!
//! The source emitter serializes a `Node` tree directly to formatted
//! text, tracking column/indent state by hand. Our pipeline produces a
//! flat list rather than a tree, and the target format is JSON rather
//! than YAML, so building a `serde_json::Value` and delegating text
//! rendering to `serde_json`'s own pretty-printer is both simpler and
//! more idiomatic than re-implementing indentation bookkeeping — the
//! crate already depends on `serde_json` for every JSON-side interface.

use serde_json::ser::{CompactFormatter, PrettyFormatter};
use serde_json::{Serializer, Value};

use crate::element::{ContainerKind, FlatElement};
use crate::error::{YamlError, YamlErrorKind, YamlResult};
use crate::value::classify;

/// Build the `serde_json::Value` tree for a fully resolved flat list.
pub fn build_value(elements: &[FlatElement], yes_no_bool: bool) -> YamlResult<Value> {
    if elements.is_empty() {
        return Ok(Value::Null);
    }
    let (value, next) = build_node(elements, 0, yes_no_bool)?;
    if next != elements.len() {
        let line = elements[next].line();
        return Err(YamlError::parse(
            YamlErrorKind::UnconsumedContent,
            line,
            "unexpected content after the document's single root value",
        ));
    }
    Ok(value)
}

fn build_node(elements: &[FlatElement], i: usize, yes_no_bool: bool) -> YamlResult<(Value, usize)> {
    match &elements[i] {
        FlatElement::Entry(e) => {
            let value = classify(e, yes_no_bool)?;
            Ok((value, i + 1))
        }
        FlatElement::Opener {
            kind: ContainerKind::Map,
            ..
        } => {
            let mut map = serde_json::Map::new();
            let mut j = i + 1;
            loop {
                match &elements[j] {
                    FlatElement::Closer { .. } => {
                        j += 1;
                        break;
                    }
                    other => {
                        let key = other.key_name().unwrap_or_default().to_string();
                        let (value, next) = build_node(elements, j, yes_no_bool)?;
                        map.insert(key, value);
                        j = next;
                    }
                }
            }
            Ok((Value::Object(map), j))
        }
        FlatElement::Opener {
            kind: ContainerKind::Seq,
            ..
        } => {
            let mut items = Vec::new();
            let mut j = i + 1;
            loop {
                match &elements[j] {
                    FlatElement::Closer { .. } => {
                        j += 1;
                        break;
                    }
                    _ => {
                        let (value, next) = build_node(elements, j, yes_no_bool)?;
                        items.push(value);
                        j = next;
                    }
                }
            }
            Ok((Value::Array(items), j))
        }
        FlatElement::Closer { line, .. } => Err(YamlError::parse(
            YamlErrorKind::UnclosedArray,
            *line,
            "unmatched closing bracket",
        )),
    }
}

/// Render `value` as compact, single-line JSON text.
pub fn to_compact_text(value: &Value) -> YamlResult<String> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, CompactFormatter);
    serde::Serialize::serialize(value, &mut ser).map_err(YamlError::Json)?;
    Ok(String::from_utf8(buf).expect("serde_json only ever writes valid UTF-8"))
}

/// Render `value` as indented JSON text, `indent_width` spaces per level.
pub fn to_pretty_text(value: &Value, indent_width: usize) -> YamlResult<String> {
    if indent_width == 0 {
        return to_compact_text(value);
    }
    let indent = " ".repeat(indent_width);
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(value, &mut ser).map_err(YamlError::Json)?;
    Ok(String::from_utf8(buf).expect("serde_json only ever writes valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::resolve_merges;
    use crate::parser::{parse, ParserOptions};
    use crate::reader::LineSource;
    use crate::resolver::resolve_aliases;

    fn convert(text: &str) -> Value {
        let src = LineSource::from_str(text);
        let mut els = parse(&src, ParserOptions::default()).unwrap();
        resolve_aliases(&mut els).unwrap();
        resolve_merges(&mut els).unwrap();
        build_value(&els, false).unwrap()
    }

    #[test]
    fn builds_nested_mapping() {
        let v = convert("a:\n  b: 1\n  c: 2\n");
        assert_eq!(v, serde_json::json!({"a": {"b": 1, "c": 2}}));
    }

    #[test]
    fn builds_sequence_of_mappings() {
        let v = convert("- x: 1\n  y: 2\n- x: 3\n  y: 4\n");
        assert_eq!(v, serde_json::json!([{"x": 1, "y": 2}, {"x": 3, "y": 4}]));
    }

    #[test]
    fn renders_compact_and_pretty_text() {
        let v = serde_json::json!({"a": 1});
        assert_eq!(to_compact_text(&v).unwrap(), "{\"a\":1}");
        assert_eq!(to_pretty_text(&v, 2).unwrap(), "{\n  \"a\": 1\n}");
    }
}
