//! Integration tests for the six worked conversion scenarios and the
//! round-trip/idempotence properties.

use yamljson::{json_to_yaml_text_from_str, yaml_to_json_text, yaml_to_json_value, Options};

fn to_json(yaml: &str) -> serde_json::Value {
    yaml_to_json_value(yaml, &Options::default()).expect("yaml should parse")
}

fn to_json_with(yaml: &str, options: &Options) -> serde_json::Value {
    yaml_to_json_value(yaml, options).expect("yaml should parse")
}

#[test]
fn scenario_booleans_and_yes_no() {
    let v = to_json_with("a: true\nb: yes\nc: no\n", &Options::default().with_yes_no_bool(true));
    assert_eq!(v, serde_json::json!({"a": true, "b": true, "c": false}));
}

#[test]
fn scenario_multiline_literal_vs_folded() {
    let v = to_json("literal: |\n  one\n  two\nfolded: >\n  one\n  two\n");
    assert_eq!(
        v,
        serde_json::json!({"literal": "one\ntwo\n", "folded": "one two\n"})
    );
}

#[test]
fn scenario_anchor_alias_scalar() {
    let v = to_json("base: &x 42\nother: *x\n");
    assert_eq!(v, serde_json::json!({"base": 42, "other": 42}));
}

#[test]
fn scenario_merge_with_local_override() {
    let v = to_json("defaults: &d\n  a: 1\n  b: 2\nitem:\n  <<: *d\n  b: 99\n");
    assert_eq!(
        v,
        serde_json::json!({"defaults": {"a": 1, "b": 2}, "item": {"a": 1, "b": 99}})
    );
}

#[test]
fn scenario_inline_flow_with_nulls_and_nested_map() {
    let v = to_json("arr: [1, , {k: v}, 3]\n");
    assert_eq!(v, serde_json::json!({"arr": [1, null, {"k": "v"}, 3]}));
}

#[test]
fn scenario_binary_tag() {
    let v = to_json("icon: !!binary SGk=\n");
    assert_eq!(v, serde_json::json!({"icon": [72, 105]}));
}

#[test]
fn law_json_round_trip() {
    let original = serde_json::json!({"a": 1, "b": [true, false, null], "c": {"d": "text"}});
    let yaml = json_to_yaml_text_from_str(&original.to_string(), &Options::default()).unwrap();
    let back = yaml_to_json_value(&yaml, &Options::default()).unwrap();
    assert_eq!(original, back);
}

#[test]
fn law_yaml_idempotence_through_json_text() {
    let yaml = "a:\n  b: 1\n  c:\n    - 1\n    - 2\n";
    let first = yaml_to_json_text(yaml, &Options::default()).unwrap();
    let reparsed: serde_json::Value = serde_json::from_str(&first).unwrap();
    let second = yaml_to_json_text(&json_to_yaml_text_from_str(&reparsed.to_string(), &Options::default()).unwrap(), &Options::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn law_tag_override() {
    let v = to_json("x: !!str 42\n");
    assert_eq!(v, serde_json::json!({"x": "42"}));
    let v2 = to_json("x: !!int \"42\"\n");
    assert_eq!(v2, serde_json::json!({"x": 42}));
}

#[test]
fn law_escape_preservation() {
    let v = to_json("s: \"line one\\nline two\"\n");
    assert_eq!(v, serde_json::json!({"s": "line one\nline two"}));
}

#[test]
fn duplicate_keys_rejected_by_default() {
    let err = yaml_to_json_value("a: 1\na: 2\n", &Options::default()).unwrap_err();
    assert!(matches!(
        err,
        yamljson::YamlError::Parse {
            kind: yamljson::YamlErrorKind::DuplicatedKey,
            ..
        }
    ));
}

#[test]
fn duplicate_keys_allowed_when_opted_in() {
    let options = Options::default().with_allow_duplicate_keys(true);
    let v = to_json_with("a: 1\na: 2\n", &options);
    assert_eq!(v, serde_json::json!({"a": 2}));
}

#[test]
fn yaml_emission_honors_yes_no_bool() {
    let options = Options::default().with_yes_no_bool(true);
    let yaml = yamljson::json_to_yaml_text(&serde_json::json!({"a": true, "b": false}), &options);
    assert!(yaml.contains("a: yes\n"));
    assert!(yaml.contains("b: no\n"));
}

#[test]
fn merge_key_without_alias_is_rejected() {
    let err = yaml_to_json_value("item:\n  <<: notanalias\n", &Options::default()).unwrap_err();
    assert!(matches!(
        err,
        yamljson::YamlError::Parse {
            kind: yamljson::YamlErrorKind::InvalidMerge,
            ..
        }
    ));
}

#[test]
fn block_scalar_after_dash_is_rejected() {
    let err = yaml_to_json_value("items:\n  - |\n    hi\n", &Options::default()).unwrap_err();
    assert!(matches!(
        err,
        yamljson::YamlError::Parse {
            kind: yamljson::YamlErrorKind::BlockModifierOnCollectionItem,
            ..
        }
    ));
}
