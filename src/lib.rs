//! A bidirectional converter between a configuration-oriented YAML
//! subset and JSON.
//!
//! YAML→JSON is the core conversion: a line-oriented scanner tokenizes
//! the input, a structural parser builds a flat element list (not a
//! tree — see [`element`]), an alias resolver and then a merge-key
//! resolver rewrite that list in place, and a value classifier turns
//! each resolved scalar into its final JSON representation. JSON→YAML
//! is the auxiliary direction: a direct, single-pass walk of a
//! `serde_json::Value` that needs none of the above machinery.
//!
//! ```
//! use yamljson::{yaml_to_json_text, Options};
//!
//! let json = yaml_to_json_text("name: demo\ncount: 3\n", &Options::default()).unwrap();
//! assert_eq!(json, "{\"count\":3,\"name\":\"demo\"}");
//! ```

pub mod element;
pub mod emitter;
pub mod error;
pub mod merge;
pub mod parser;
pub mod reader;
pub mod resolver;
pub mod scanner;
pub mod value;
pub mod yaml_emit;

use serde_json::Value;
use tracing::debug;

pub use error::{YamlError, YamlErrorKind, YamlResult};

use element::FlatElement;
use parser::ParserOptions;
use reader::LineSource;

/// Conversion options shared by every entry point in this crate.
///
/// Construct with [`Options::default`] and adjust with the `with_*`
/// builders; invalid values are clamped rather than rejected, matching
/// the source emitter's own `with_indent`/`with_width` convention.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Spaces per nesting level in generated text. JSON output accepts
    /// `0` (compact, single line); YAML output is clamped to `2..=8`.
    pub indent_width: usize,
    /// Also recognize `yes`/`no` as booleans, in addition to `true`/`false`.
    pub yes_no_bool: bool,
    /// Allow a mapping to repeat a key instead of raising `DuplicatedKey`
    /// (last write wins).
    pub allow_duplicate_keys: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            indent_width: 2,
            yes_no_bool: false,
            allow_duplicate_keys: false,
        }
    }
}

impl Options {
    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width.min(8);
        self
    }

    pub fn with_yes_no_bool(mut self, enabled: bool) -> Self {
        self.yes_no_bool = enabled;
        self
    }

    pub fn with_allow_duplicate_keys(mut self, enabled: bool) -> Self {
        self.allow_duplicate_keys = enabled;
        self
    }

    fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            allow_duplicate_keys: self.allow_duplicate_keys,
        }
    }

    fn yaml_indent_width(&self) -> usize {
        self.indent_width.clamp(2, 8)
    }
}

/// Run the full YAML→JSON pipeline and return the resulting
/// `serde_json::Value`, without rendering it to text.
pub fn yaml_to_json_value(yaml: &str, options: &Options) -> YamlResult<Value> {
    let src = LineSource::from_str(yaml);
    let elements = resolve(&src, options)?;
    emitter::build_value(&elements, options.yes_no_bool)
}

/// Run the full YAML→JSON pipeline and render the result as JSON text.
/// `options.indent_width == 0` produces compact single-line JSON.
pub fn yaml_to_json_text(yaml: &str, options: &Options) -> YamlResult<String> {
    let value = yaml_to_json_value(yaml, options)?;
    emitter::to_pretty_text(&value, options.indent_width)
}

fn resolve(src: &LineSource, options: &Options) -> YamlResult<Vec<FlatElement>> {
    let mut elements = parser::parse(src, options.parser_options())?;
    debug!(elements = elements.len(), "parsed flat element list");
    resolver::resolve_aliases(&mut elements)?;
    merge::resolve_merges(&mut elements)?;
    Ok(elements)
}

/// Render an already-parsed `serde_json::Value` as a YAML document.
pub fn json_to_yaml_text(value: &Value, options: &Options) -> String {
    yaml_emit::to_yaml_text(value, options.yaml_indent_width(), options.yes_no_bool)
}

/// Parse `json` and render it as a YAML document in one step.
pub fn json_to_yaml_text_from_str(json: &str, options: &Options) -> YamlResult<String> {
    let value: Value = serde_json::from_str(json).map_err(YamlError::Json)?;
    Ok(json_to_yaml_text(&value, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_flat_mapping() {
        let json = yaml_to_json_text("a: 1\nb: two\n", &Options::default()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({"a": 1, "b": "two"}));
    }

    #[test]
    fn json_to_yaml_round_trips_through_parser() {
        let yaml = json_to_yaml_text_from_str(r#"{"a":1,"b":[1,2,3]}"#, &Options::default()).unwrap();
        let back = yaml_to_json_value(&yaml, &Options::default()).unwrap();
        assert_eq!(back, serde_json::json!({"a": 1, "b": [1, 2, 3]}));
    }

    #[test]
    fn compact_indent_width_zero() {
        let opts = Options::default().with_indent_width(0);
        let json = yaml_to_json_text("a: 1\n", &opts).unwrap();
        assert_eq!(json, "{\"a\":1}");
    }
}
