//! The structural parser (SPEC_FULL.md §4.2): three mutually recursive
//! routines — mapping, block sequence, inline flow sequence — that walk
//! the token stream produced by [`crate::scanner::Scanner`] and build the
//! flat element list.
//!
//! Every routine that starts a container is handed the source column
//! its own content begins at (`node_col`): a deeper line belongs to it
//! only if its indent exceeds `node_col`. That one convention is what
//! lets a block-sequence item whose first key arrives on the same
//! physical line as the `-` marker (`- key: value`) line up correctly
//! with its sibling keys on subsequent, more indented lines.

use std::collections::HashSet;

use crate::element::{ContainerKind, Entry, FlatElement};
use crate::error::{YamlError, YamlErrorKind, YamlResult};
use crate::reader::LineSource;
use crate::scanner::{split_flow_entry, LookAhead, Scanner, Token};

/// The subset of conversion options the parser itself consults.
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    pub allow_duplicate_keys: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            allow_duplicate_keys: false,
        }
    }
}

struct ParseState<'a> {
    scanner: Scanner<'a>,
    options: ParserOptions,
    anchors_seen: HashSet<String>,
    out: Vec<FlatElement>,
}

impl<'a> ParseState<'a> {
    fn push(&mut self, el: FlatElement) {
        self.out.push(el);
    }

    fn push_null_entry(&mut self, indent: usize, key: Option<String>, anchor: Option<String>) {
        let line = self.scanner.current_line();
        let mut entry = Entry::new("", indent, line);
        entry.key = key;
        entry.anchor = anchor;
        self.push(FlatElement::Entry(entry));
    }

    fn push_scalar_entry(
        &mut self,
        indent: usize,
        key: Option<String>,
        anchor: Option<String>,
        tok: Token,
    ) -> YamlResult<()> {
        if let Some(name) = &anchor {
            self.register_anchor(name, tok.line)?;
        }
        if let Some(name) = &tok.anchor {
            self.register_anchor(name, tok.line)?;
        }
        let entry = Entry {
            key,
            value: tok.text,
            indent,
            literal: tok.is_literal,
            alias: tok.alias,
            anchor: anchor.or(tok.anchor),
            line: tok.line,
            tag: tok.tag,
        };
        self.push(FlatElement::Entry(entry));
        Ok(())
    }

    fn register_anchor(&mut self, name: &str, line: usize) -> YamlResult<()> {
        if !self.anchors_seen.insert(name.to_string()) {
            return Err(YamlError::parse(
                YamlErrorKind::DuplicateAnchor,
                line,
                format!("anchor '{name}' is already defined"),
            ));
        }
        Ok(())
    }
}

/// Parse a complete document into the flat element list.
pub fn parse(lines: &LineSource, options: ParserOptions) -> YamlResult<Vec<FlatElement>> {
    let mut state = ParseState {
        scanner: Scanner::new(lines),
        options,
        anchors_seen: HashSet::new(),
        out: Vec::new(),
    };
    parse_root(&mut state)?;
    match state.scanner.look_ahead(None)? {
        LookAhead::EndOfInput => {}
        _ => {
            return Err(YamlError::parse(
                YamlErrorKind::UnconsumedContent,
                state.scanner.current_line(),
                "unexpected content after the document's single root value",
            ))
        }
    }
    Ok(state.out)
}

fn parse_root(state: &mut ParseState) -> YamlResult<()> {
    match state.scanner.look_ahead(None)? {
        LookAhead::EndOfInput => {
            state.push_null_entry(0, None, None);
            Ok(())
        }
        LookAhead::CollectionItem => {
            let col = state.scanner.current_indent();
            parse_sequence(state, 0, col.wrapping_sub(1), None, None)
        }
        LookAhead::Key => {
            let col = state.scanner.current_indent();
            parse_mapping(state, 0, col.wrapping_sub(1), None, None, None)
        }
        LookAhead::FlowOpen => {
            state.scanner.next_value(false)?;
            parse_flow_sequence_body(state, 0, None, None)
        }
        LookAhead::Scalar => {
            let tok = state.scanner.next_value(false)?;
            state.push_scalar_entry(0, None, None, tok)
        }
        LookAhead::Outdent => unreachable!("look_ahead(None) never reports Outdent"),
    }
}

/// Parse whatever sits at `key`'s value (or, when `key` is `None`, a
/// block-sequence item): a same-line scalar, a nested mapping/sequence
/// on following lines, or an explicit null.
///
/// `node_col` is the column of the key/marker that led here; a deeper
/// container's own entries must be indented strictly past it.
fn parse_node(state: &mut ParseState, depth: usize, node_col: usize, key: Option<String>) -> YamlResult<()> {
    let anchor = state.scanner.take_leading_anchor();
    let shape = if state.scanner.remainder_has_content() {
        state.scanner.peek_inline_shape()
    } else {
        state.scanner.look_ahead(Some(node_col))?
    };
    match shape {
        LookAhead::Outdent | LookAhead::EndOfInput => {
            state.push_null_entry(depth, key, anchor);
        }
        LookAhead::CollectionItem => {
            parse_sequence(state, depth, node_col, key, anchor)?;
        }
        LookAhead::Key => {
            parse_mapping(state, depth, node_col, key, anchor, None)?;
        }
        LookAhead::FlowOpen => {
            state.scanner.next_value(false)?;
            parse_flow_sequence_body(state, depth, key, anchor)?;
        }
        LookAhead::Scalar => {
            let tok = state.scanner.next_value(false)?;
            state.push_scalar_entry(depth, key, anchor, tok)?;
        }
    }
    Ok(())
}

/// Parse a block mapping.
///
/// `first_key_col`, when set, means the first key has already been
/// positioned inline (the `- key: value` case): its column is forced
/// rather than discovered from a fresh `look_ahead`.
fn parse_mapping(
    state: &mut ParseState,
    depth: usize,
    node_col: usize,
    key: Option<String>,
    anchor: Option<String>,
    first_key_col: Option<usize>,
) -> YamlResult<()> {
    let opener_line = state.scanner.current_line();
    if let Some(name) = &anchor {
        state.register_anchor(name, opener_line)?;
    }
    state.push(FlatElement::open_with(
        ContainerKind::Map,
        depth,
        opener_line,
        key,
        anchor,
    ));

    let mut item_col = first_key_col;
    let mut first_iter = first_key_col.is_some();
    let mut seen_keys: HashSet<String> = HashSet::new();

    loop {
        if !first_iter {
            match state.scanner.look_ahead(Some(node_col))? {
                LookAhead::Outdent | LookAhead::EndOfInput => break,
                LookAhead::Key => {}
                _ => {
                    return Err(YamlError::parse(
                        YamlErrorKind::ExpectedKey,
                        state.scanner.current_line(),
                        "expected a mapping key",
                    ))
                }
            }
            let col = state.scanner.current_indent();
            match item_col {
                Some(ic) if ic != col => break,
                None => item_col = Some(col),
                _ => {}
            }
        }
        first_iter = false;

        let key_tok = state.scanner.next_key()?;
        if key_tok.text == "<<" {
            parse_merge_entry(state, depth + 1, item_col.unwrap())?;
            continue;
        }
        if !seen_keys.insert(key_tok.text.clone()) && !state.options.allow_duplicate_keys {
            return Err(YamlError::parse(
                YamlErrorKind::DuplicatedKey,
                key_tok.line,
                format!("duplicate key '{}'", key_tok.text),
            ));
        }
        parse_node(state, depth + 1, item_col.unwrap(), Some(key_tok.text))?;
    }

    let closer_line = state.scanner.current_line();
    state.push(FlatElement::close(ContainerKind::Map, depth, closer_line));
    Ok(())
}

/// Parse the value of a `<<` merge key, which must be a `*`-style
/// alias. Emitted as an ordinary `Entry` with `key` set to `"<<"`;
/// `merge.rs` looks for exactly this marker.
fn parse_merge_entry(state: &mut ParseState, depth: usize, node_col: usize) -> YamlResult<()> {
    let start = state.out.len();
    parse_node(state, depth, node_col, Some("<<".to_string()))?;
    let line = state.out[start].line();
    match state.out[start].as_entry() {
        Some(e) if e.alias.is_some() => Ok(()),
        _ => Err(YamlError::parse(
            YamlErrorKind::InvalidMerge,
            line,
            "a merge key's value must be a '*'-style alias",
        )),
    }
}

/// Parse a block sequence (`- item` lines).
fn parse_sequence(
    state: &mut ParseState,
    depth: usize,
    node_col: usize,
    key: Option<String>,
    anchor: Option<String>,
) -> YamlResult<()> {
    let opener_line = state.scanner.current_line();
    if let Some(name) = &anchor {
        state.register_anchor(name, opener_line)?;
    }
    state.push(FlatElement::open_with(
        ContainerKind::Seq,
        depth,
        opener_line,
        key,
        anchor,
    ));

    let mut item_col: Option<usize> = None;
    loop {
        match state.scanner.look_ahead(Some(node_col))? {
            LookAhead::Outdent | LookAhead::EndOfInput => break,
            LookAhead::CollectionItem => {}
            _ => break,
        }
        let col = state.scanner.current_indent();
        match item_col {
            Some(ic) if ic != col => break,
            None => item_col = Some(col),
            _ => {}
        }
        let marker = state.scanner.next_value(false)?;
        let item_indent = marker.collection_item_indent.unwrap_or(col + 2);
        parse_sequence_item(state, depth + 1, item_indent)?;
    }

    let closer_line = state.scanner.current_line();
    state.push(FlatElement::close(ContainerKind::Seq, depth, closer_line));
    Ok(())
}

/// Parse one block-sequence item: a plain scalar, a nested
/// sequence/flow-sequence, or (`- key: value`) a mapping whose first key
/// is inline with the marker.
fn parse_sequence_item(state: &mut ParseState, depth: usize, item_indent: usize) -> YamlResult<()> {
    if state.scanner.remainder_starts_block_scalar() {
        return Err(YamlError::parse(
            YamlErrorKind::BlockModifierOnCollectionItem,
            state.scanner.current_line(),
            "block scalars are not allowed immediately after '- '",
        ));
    }
    let anchor = state.scanner.take_leading_anchor();
    let node_col = item_indent.wrapping_sub(1);
    let shape = if state.scanner.remainder_has_content() {
        state.scanner.peek_inline_shape()
    } else {
        state.scanner.look_ahead(Some(node_col))?
    };
    match shape {
        LookAhead::Outdent | LookAhead::EndOfInput => {
            state.push_null_entry(depth, None, anchor);
        }
        LookAhead::CollectionItem => {
            parse_sequence(state, depth, node_col, None, anchor)?;
        }
        LookAhead::Key => {
            let key_tok = state.scanner.next_key()?;
            if key_tok.text == "<<" {
                return Err(YamlError::parse(
                    YamlErrorKind::MergeInArray,
                    key_tok.line,
                    "a merge key cannot be a block-sequence item's own value",
                ));
            }
            let mut seen = HashSet::new();
            seen.insert(key_tok.text.clone());
            parse_mapping_with_first_key(state, depth, node_col, anchor, item_indent, key_tok, seen)?;
        }
        LookAhead::FlowOpen => {
            state.scanner.next_value(false)?;
            parse_flow_sequence_body(state, depth, None, anchor)?;
        }
        LookAhead::Scalar => {
            let tok = state.scanner.next_value(false)?;
            state.push_scalar_entry(depth, None, anchor, tok)?;
        }
    }
    Ok(())
}

/// Continue a mapping whose first key has already been read (the
/// `- key: value` block-sequence item case). Mirrors the loop body in
/// [`parse_mapping`] but starts from a key in hand instead of reading
/// one via `look_ahead`.
fn parse_mapping_with_first_key(
    state: &mut ParseState,
    depth: usize,
    node_col: usize,
    anchor: Option<String>,
    item_col: usize,
    first_key: Token,
    mut seen_keys: HashSet<String>,
) -> YamlResult<()> {
    let opener_line = first_key.line;
    if let Some(name) = &anchor {
        state.register_anchor(name, opener_line)?;
    }
    state.push(FlatElement::open_with(
        ContainerKind::Map,
        depth,
        opener_line,
        None,
        anchor,
    ));
    parse_node(state, depth + 1, item_col, Some(first_key.text))?;

    loop {
        match state.scanner.look_ahead(Some(node_col))? {
            LookAhead::Outdent | LookAhead::EndOfInput => break,
            LookAhead::Key => {}
            _ => {
                return Err(YamlError::parse(
                    YamlErrorKind::ExpectedKey,
                    state.scanner.current_line(),
                    "expected a mapping key",
                ))
            }
        }
        let col = state.scanner.current_indent();
        if col != item_col {
            break;
        }
        let key_tok = state.scanner.next_key()?;
        if key_tok.text == "<<" {
            parse_merge_entry(state, depth + 1, item_col)?;
            continue;
        }
        if !seen_keys.insert(key_tok.text.clone()) && !state.options.allow_duplicate_keys {
            return Err(YamlError::parse(
                YamlErrorKind::DuplicatedKey,
                key_tok.line,
                format!("duplicate key '{}'", key_tok.text),
            ));
        }
        parse_node(state, depth + 1, item_col, Some(key_tok.text))?;
    }

    let closer_line = state.scanner.current_line();
    state.push(FlatElement::close(ContainerKind::Map, depth, closer_line));
    Ok(())
}

/// Parse the body of an inline flow sequence (`[` already consumed).
fn parse_flow_sequence_body(
    state: &mut ParseState,
    depth: usize,
    key: Option<String>,
    anchor: Option<String>,
) -> YamlResult<()> {
    let opener_line = state.scanner.current_line();
    if let Some(name) = &anchor {
        state.register_anchor(name, opener_line)?;
    }
    state.push(FlatElement::open_with(
        ContainerKind::Seq,
        depth,
        opener_line,
        key,
        anchor,
    ));

    let mut awaiting_value = true;
    loop {
        let tok = state.scanner.next_value(true)?;
        match tok.text.as_str() {
            "]" => break,
            "," => {
                if awaiting_value {
                    state.push_null_entry(depth + 1, None, None);
                }
                awaiting_value = true;
            }
            "[" => {
                parse_flow_sequence_body(state, depth + 1, None, None)?;
                awaiting_value = false;
            }
            _ => {
                push_flow_item(state, depth + 1, tok)?;
                awaiting_value = false;
            }
        }
    }

    let closer_line = state.scanner.current_line();
    state.push(FlatElement::close(ContainerKind::Seq, depth, closer_line));
    Ok(())
}

/// Emit one scalar/alias/one-entry-mapping item inside a flow sequence.
fn push_flow_item(state: &mut ParseState, depth: usize, tok: Token) -> YamlResult<()> {
    if tok.alias.is_some() {
        return state.push_scalar_entry(depth, None, None, tok);
    }
    if !tok.is_literal && tok.tag.is_none() {
        let inner = tok
            .text
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .map(str::trim)
            .unwrap_or(tok.text.as_str());
        if let Some((k, v)) = split_flow_entry(inner) {
            if k == "<<" {
                return Err(YamlError::parse(
                    YamlErrorKind::MergeInCollection,
                    tok.line,
                    "a merge key cannot appear inside a flow sequence",
                ));
            }
            let opener_line = tok.line;
            state.push(FlatElement::open_with(
                ContainerKind::Map,
                depth,
                opener_line,
                None,
                None,
            ));
            let value_tok = Token {
                kind: tok.kind,
                text: v,
                tag: None,
                anchor: None,
                alias: None,
                collection_item_indent: None,
                is_literal: false,
                line: tok.line,
            };
            state.push_scalar_entry(depth + 1, Some(k), None, value_tok)?;
            state.push(FlatElement::close(ContainerKind::Map, depth, tok.line));
            return Ok(());
        }
    }
    state.push_scalar_entry(depth, None, None, tok)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_text(text: &str) -> Vec<FlatElement> {
        let src = LineSource::from_str(text);
        parse(&src, ParserOptions::default()).unwrap()
    }

    #[test]
    fn parses_flat_mapping() {
        let els = parse_text("a: 1\nb: two\n");
        assert!(els[0].is_opener());
        assert_eq!(els[1].as_entry().unwrap().key.as_deref(), Some("a"));
        assert_eq!(els[1].as_entry().unwrap().value, "1");
        assert_eq!(els[2].as_entry().unwrap().key.as_deref(), Some("b"));
        assert!(els[3].is_closer());
    }

    #[test]
    fn parses_nested_mapping() {
        let els = parse_text("outer:\n  inner: 1\n");
        assert!(els[0].is_opener());
        assert_eq!(els[1].key_name(), Some("outer"));
        assert!(els[1].is_opener());
        assert_eq!(els[2].as_entry().unwrap().key.as_deref(), Some("inner"));
        assert!(els[3].is_closer());
        assert!(els[4].is_closer());
    }

    #[test]
    fn parses_block_sequence() {
        let els = parse_text("items:\n  - 1\n  - 2\n");
        assert!(els[1].is_opener());
        assert_eq!(els[2].as_entry().unwrap().value, "1");
        assert_eq!(els[3].as_entry().unwrap().value, "2");
        assert!(els[4].is_closer());
    }

    #[test]
    fn parses_sequence_of_mappings_with_inline_first_key() {
        let els = parse_text("items:\n  - a: 1\n    b: 2\n  - a: 3\n    b: 4\n");
        let openers = els.iter().filter(|e| e.is_opener()).count();
        let closers = els.iter().filter(|e| e.is_closer()).count();
        assert_eq!(openers, closers);
        assert_eq!(openers, 4); // root map, seq, map item 1, map item 2
    }

    #[test]
    fn detects_duplicate_sibling_keys() {
        let src = LineSource::from_str("a: 1\na: 2\n");
        let err = parse(&src, ParserOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            YamlError::Parse {
                kind: YamlErrorKind::DuplicatedKey,
                ..
            }
        ));
    }

    #[test]
    fn parses_inline_flow_sequence_with_null_and_map() {
        let els = parse_text("a: [1, , {k: v}, 3]\n");
        let values: Vec<_> = els
            .iter()
            .filter_map(|e| e.as_entry())
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect();
        assert!(values.iter().any(|(k, v)| k.is_none() && v == "1"));
        assert!(values.iter().any(|(k, v)| k.is_none() && v.is_empty()));
        assert!(values
            .iter()
            .any(|(k, v)| k.as_deref() == Some("k") && v == "v"));
        assert!(values.iter().any(|(k, v)| k.is_none() && v == "3"));
    }

    #[test]
    fn parses_anchor_on_block_opener() {
        let els = parse_text("defaults: &d\n  a: 1\n  b: 2\nother: *d\n");
        let opener_with_anchor = els.iter().find(|e| e.anchor_name() == Some("d"));
        assert!(opener_with_anchor.is_some());
        assert!(opener_with_anchor.unwrap().is_opener());
        let alias_entry = els.iter().find(|e| e.alias_name() == Some("d"));
        assert!(alias_entry.is_some());
    }

    #[test]
    fn merge_key_without_alias_is_rejected() {
        let src = LineSource::from_str("item:\n  <<: somevalue\n");
        let err = parse(&src, ParserOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            YamlError::Parse {
                kind: YamlErrorKind::InvalidMerge,
                ..
            }
        ));
    }

    #[test]
    fn block_scalar_after_collection_marker_is_rejected() {
        let src = LineSource::from_str("items:\n  - |\n    hello\n");
        let err = parse(&src, ParserOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            YamlError::Parse {
                kind: YamlErrorKind::BlockModifierOnCollectionItem,
                ..
            }
        ));
    }

    #[test]
    fn anchor_or_alias_on_key_is_rejected() {
        let src = LineSource::from_str("&k: 1\n");
        let err = parse(&src, ParserOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            YamlError::Parse {
                kind: YamlErrorKind::AliasOrAnchorOnKey,
                ..
            }
        ));
    }

    #[test]
    fn merge_key_inside_flow_sequence_is_rejected() {
        let src = LineSource::from_str("a: [{<<: *x}]\n");
        let err = parse(&src, ParserOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            YamlError::Parse {
                kind: YamlErrorKind::MergeInCollection,
                ..
            }
        ));
    }
}
