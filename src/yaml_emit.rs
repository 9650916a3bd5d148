//! The auxiliary JSON→YAML emitter (SPEC_FULL.md §4.6).
//!
//! Grounded on the source emitter's `ScalarAnalysis` scalar-safety
//! checks (plain vs. quoted vs. literal-block), trimmed down to the
//! subset JSON scalars actually need: JSON has no single-quoted or
//! folded style, and every object/array nests by fixed `indent_width`
//! rather than YAML's flow/block auto-detection.

use serde_json::Value;

use crate::scanner::NEWLINE_PLACEHOLDER;

/// Render `value` as a YAML document using `indent_width` spaces per
/// nesting level. `yes_no_bool` renders booleans as `yes`/`no` instead
/// of `true`/`false`.
pub fn to_yaml_text(value: &Value, indent_width: usize, yes_no_bool: bool) -> String {
    let mut out = String::new();
    match value {
        Value::Object(map) if !map.is_empty() => {
            write_mapping(&mut out, map, 0, indent_width, yes_no_bool)
        }
        Value::Array(items) if !items.is_empty() => {
            write_sequence(&mut out, items, 0, indent_width, yes_no_bool)
        }
        other => {
            out.push_str(&render_scalar(other, yes_no_bool));
            out.push('\n');
        }
    }
    out
}

fn write_mapping(out: &mut String, map: &serde_json::Map<String, Value>, depth: usize, width: usize, yes_no_bool: bool) {
    let pad = " ".repeat(depth * width);
    for (key, value) in map {
        out.push_str(&pad);
        out.push_str(&render_key(key));
        out.push(':');
        write_child(out, value, depth, width, yes_no_bool);
    }
}

fn write_sequence(out: &mut String, items: &[Value], depth: usize, width: usize, yes_no_bool: bool) {
    let pad = " ".repeat(depth * width);
    for item in items {
        out.push_str(&pad);
        out.push('-');
        match item {
            Value::Object(map) if !map.is_empty() => {
                out.push(' ');
                write_inline_first_entry(out, map, depth, width, yes_no_bool);
            }
            Value::Array(inner) if !inner.is_empty() => {
                out.push('\n');
                write_sequence(out, inner, depth + 1, width, yes_no_bool);
            }
            other => {
                out.push(' ');
                out.push_str(&render_scalar(other, yes_no_bool));
                out.push('\n');
            }
        }
    }
}

/// A sequence item whose value is a non-empty mapping puts the first
/// key on the dash's own line (`- a: 1`) and the rest at the mapping's
/// indent, one level past the dash.
fn write_inline_first_entry(out: &mut String, map: &serde_json::Map<String, Value>, depth: usize, width: usize, yes_no_bool: bool) {
    let mut iter = map.iter();
    if let Some((key, value)) = iter.next() {
        out.push_str(&render_key(key));
        out.push(':');
        write_child(out, value, depth + 1, width, yes_no_bool);
    }
    let pad = " ".repeat((depth + 1) * width);
    for (key, value) in iter {
        out.push_str(&pad);
        out.push_str(&render_key(key));
        out.push(':');
        write_child(out, value, depth + 1, width, yes_no_bool);
    }
}

fn write_child(out: &mut String, value: &Value, depth: usize, width: usize, yes_no_bool: bool) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            out.push('\n');
            write_mapping(out, map, depth + 1, width, yes_no_bool);
        }
        Value::Array(items) if !items.is_empty() => {
            out.push('\n');
            write_sequence(out, items, depth + 1, width, yes_no_bool);
        }
        other => {
            out.push(' ');
            out.push_str(&render_scalar(other, yes_no_bool));
            out.push('\n');
        }
    }
}

fn render_key(key: &str) -> String {
    if needs_quoting(key) {
        quote_double(key)
    } else {
        key.to_string()
    }
}

fn render_scalar(value: &Value, yes_no_bool: bool) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) if yes_no_bool => if *b { "yes".to_string() } else { "no".to_string() },
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => render_string_scalar(s),
        Value::Array(_) | Value::Object(_) => unreachable!("containers are dispatched before render_scalar"),
    }
}

fn render_string_scalar(s: &str) -> String {
    if s.contains('\n') {
        return render_literal_block(s);
    }
    if s.is_empty() || needs_quoting(s) {
        quote_double(s)
    } else {
        s.to_string()
    }
}

/// A multi-line string renders as a `|` literal block scalar, indented
/// one level past its own key/dash. Caller already placed the newline
/// after `:`/`-`, so this just needs the block header and body.
fn render_literal_block(s: &str) -> String {
    let mut block = String::from("|\n");
    for line in s.split('\n') {
        block.push_str("  ");
        block.push_str(line.replace(NEWLINE_PLACEHOLDER, "\n").as_str());
        block.push('\n');
    }
    block.pop();
    block
}

fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    let first = s.chars().next().unwrap();
    if matches!(first, '-' | '?' | ':' | ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@' | '`') {
        return true;
    }
    if s.starts_with(' ') || s.ends_with(' ') {
        return true;
    }
    if s.contains(": ") || s.ends_with(':') || s.contains(" #") {
        return true;
    }
    matches!(s, "null" | "Null" | "NULL" | "~" | "true" | "True" | "TRUE" | "false" | "False" | "FALSE" | "yes" | "Yes" | "YES" | "no" | "No" | "NO")
        || s.parse::<f64>().is_ok()
}

fn quote_double(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emits_flat_mapping() {
        let v = json!({"a": 1, "b": "two"});
        let text = to_yaml_text(&v, 2, false);
        assert!(text.contains("a: 1\n"));
        assert!(text.contains("b: two\n"));
    }

    #[test]
    fn quotes_ambiguous_scalars() {
        let v = json!({"flag": "true", "num": "42"});
        let text = to_yaml_text(&v, 2, false);
        assert!(text.contains("flag: \"true\""));
        assert!(text.contains("num: \"42\""));
    }

    #[test]
    fn emits_sequence_of_mappings_inline() {
        let v = json!([{"x": 1, "y": 2}]);
        let text = to_yaml_text(&v, 2, false);
        assert!(text.starts_with("- x: 1\n"));
        assert!(text.contains("  y: 2\n"));
    }

    #[test]
    fn multiline_strings_become_literal_blocks() {
        let v = json!({"body": "line one\nline two"});
        let text = to_yaml_text(&v, 2, false);
        assert!(text.contains("body: |\n"));
        assert!(text.contains("  line one\n"));
        assert!(text.contains("  line two\n"));
    }

    #[test]
    fn renders_yes_no_booleans_when_enabled() {
        let v = json!({"flag": true, "off": false});
        let text = to_yaml_text(&v, 2, true);
        assert!(text.contains("flag: yes\n"));
        assert!(text.contains("off: no\n"));
    }
}
