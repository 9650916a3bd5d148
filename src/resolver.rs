//! The alias resolver (SPEC_FULL.md §4.3): a second pass over the flat
//! element list that substitutes every `*name` reference with the
//! anchor's scalar value or a re-indented copy of its subtree.
//!
//! Re-scanning from the top on every pass is quadratic in the number of
//! aliases rather than a single indexed pass — kept deliberately simple
//! per the Open Questions decision in SPEC_FULL.md §9; each pass is
//! guaranteed to resolve at least one alias or fail.

use tracing::trace;

use crate::element::FlatElement;
use crate::error::{YamlError, YamlErrorKind, YamlResult};

/// Resolve every non-merge alias in `elements` in place.
pub fn resolve_aliases(elements: &mut Vec<FlatElement>) -> YamlResult<()> {
    loop {
        let pos = elements.iter().position(is_unresolved_alias);
        let Some(pos) = pos else { break };
        resolve_one(elements, pos)?;
    }
    Ok(())
}

fn is_unresolved_alias(el: &FlatElement) -> bool {
    match el.as_entry() {
        Some(e) => e.alias.is_some() && e.key.as_deref() != Some("<<"),
        None => false,
    }
}

fn resolve_one(elements: &mut Vec<FlatElement>, pos: usize) -> YamlResult<()> {
    let alias_entry = elements[pos].as_entry().cloned().expect("checked above");
    let name = alias_entry.alias.clone().expect("checked above");
    let line = alias_entry.line;

    let d_pos = elements
        .iter()
        .position(|e| e.anchor_name() == Some(name.as_str()));
    let d_pos = match d_pos {
        Some(p) if p < pos => p,
        _ => {
            return Err(YamlError::parse(
                YamlErrorKind::AnchorNotFound,
                line,
                format!("anchor '{name}' is not defined before this alias"),
            ))
        }
    };

    trace!(anchor = %name, from_line = line, "resolving alias");

    if let Some(d_entry) = elements[d_pos].as_entry() {
        if !d_entry.value.is_empty() || d_entry.alias.is_some() {
            let value = d_entry.value.clone();
            let literal = d_entry.literal;
            let tag = d_entry.tag;
            let entry = elements[pos].as_entry_mut().expect("checked above");
            entry.value = value;
            entry.literal = literal;
            entry.tag = tag;
            entry.alias = None;
            return Ok(());
        }
        // An anchor on an empty scalar still resolves to an empty string.
        let entry = elements[pos].as_entry_mut().expect("checked above");
        entry.value.clear();
        entry.alias = None;
        return Ok(());
    }

    // Subtree alias: D is a container opener.
    let d_kind = elements[d_pos].kind().expect("checked above");
    let d_indent = elements[d_pos].indent();
    let closer_idx = find_matching_closer(elements, d_pos)?;

    let subtree: Vec<FlatElement> = elements[d_pos + 1..closer_idx].to_vec();
    for el in &subtree {
        if el.alias_name() == Some(name.as_str()) {
            return Err(YamlError::parse(
                YamlErrorKind::RecursiveAlias,
                line,
                format!("alias '{name}' references its own subtree"),
            ));
        }
    }

    let a_indent = elements[pos].indent();
    let delta = a_indent as i64 - (d_indent as i64 + 1);
    let mut copies = subtree;
    for el in &mut copies {
        let new_indent = (el.indent() as i64 + delta).max(0) as usize;
        el.set_indent(new_indent);
    }

    let key = alias_entry.key.clone();
    let mut replacement = Vec::with_capacity(copies.len() + 2);
    replacement.push(FlatElement::open_with(d_kind, a_indent, line, key, None));
    replacement.extend(copies);
    replacement.push(FlatElement::close(d_kind, a_indent, line));

    elements.splice(pos..pos + 1, replacement);
    Ok(())
}

/// Find the index of the `Closer` matching the `Opener` at `open_idx`.
pub(crate) fn find_matching_closer(elements: &[FlatElement], open_idx: usize) -> YamlResult<usize> {
    let mut depth = 0i32;
    for i in (open_idx + 1)..elements.len() {
        match &elements[i] {
            FlatElement::Opener { .. } => depth += 1,
            FlatElement::Closer { .. } => {
                if depth == 0 {
                    return Ok(i);
                }
                depth -= 1;
            }
            FlatElement::Entry(_) => {}
        }
    }
    let line = elements[open_idx].line();
    Err(YamlError::parse(
        YamlErrorKind::UnclosedArray,
        line,
        "container opened here is never closed",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, ParserOptions};
    use crate::reader::LineSource;

    fn parse_text(text: &str) -> Vec<FlatElement> {
        let src = LineSource::from_str(text);
        parse(&src, ParserOptions::default()).unwrap()
    }

    #[test]
    fn resolves_scalar_alias() {
        let mut els = parse_text("base: &x 42\nother: *x\n");
        resolve_aliases(&mut els).unwrap();
        let other = els.iter().find(|e| e.key_name() == Some("other")).unwrap();
        assert_eq!(other.as_entry().unwrap().value, "42");
        assert!(other.as_entry().unwrap().alias.is_none());
    }

    #[test]
    fn resolves_subtree_alias() {
        let mut els = parse_text("defaults: &d\n  a: 1\n  b: 2\nother: *d\n");
        resolve_aliases(&mut els).unwrap();
        assert!(els.iter().all(|e| e.alias_name().is_none()));
        let other_pos = els.iter().position(|e| e.key_name() == Some("other")).unwrap();
        assert!(els[other_pos].is_opener());
    }

    #[test]
    fn forward_reference_is_an_error() {
        let mut els = parse_text("other: *x\nbase: &x 42\n");
        let err = resolve_aliases(&mut els).unwrap_err();
        assert!(matches!(
            err,
            YamlError::Parse {
                kind: YamlErrorKind::AnchorNotFound,
                ..
            }
        ));
    }

    #[test]
    fn missing_anchor_is_an_error() {
        let mut els = parse_text("other: *ghost\n");
        let err = resolve_aliases(&mut els).unwrap_err();
        assert!(matches!(
            err,
            YamlError::Parse {
                kind: YamlErrorKind::AnchorNotFound,
                ..
            }
        ));
    }
}
