//! The merge-key resolver (SPEC_FULL.md §4.4): a third pass, run after
//! alias resolution completes, that expands `<<: *name` entries into the
//! anchor's key/value pairs with the mapping's own local keys winning on
//! collision.

use tracing::trace;

use crate::element::{ContainerKind, FlatElement};
use crate::error::{YamlError, YamlErrorKind, YamlResult};
use crate::resolver::find_matching_closer;

/// Resolve every `<<` merge entry in `elements` in place.
pub fn resolve_merges(elements: &mut Vec<FlatElement>) -> YamlResult<()> {
    loop {
        let pos = elements.iter().position(is_merge_entry);
        let Some(pos) = pos else { break };
        resolve_one(elements, pos)?;
    }
    Ok(())
}

fn is_merge_entry(el: &FlatElement) -> bool {
    match el.as_entry() {
        Some(e) => e.key.as_deref() == Some("<<") && e.alias.is_some(),
        None => false,
    }
}

fn resolve_one(elements: &mut Vec<FlatElement>, pos: usize) -> YamlResult<()> {
    let merge_entry = elements[pos].as_entry().cloned().expect("checked above");
    let name = merge_entry.alias.clone().expect("checked above");
    let line = merge_entry.line;
    let alias_indent = merge_entry.indent;

    let parent_idx = (0..pos)
        .rev()
        .find(|&i| elements[i].indent() < alias_indent)
        .ok_or_else(|| {
            YamlError::parse(
                YamlErrorKind::MergeInArray,
                line,
                "merge key has no enclosing mapping",
            )
        })?;
    if elements[parent_idx].kind() != Some(ContainerKind::Map) {
        return Err(YamlError::parse(
            YamlErrorKind::MergeInArray,
            line,
            "merge key is only valid directly inside a mapping",
        ));
    }
    let parent_closer_idx = find_matching_closer(elements, parent_idx)?;

    trace!(anchor = %name, from_line = line, "resolving merge key");

    let d_pos = elements
        .iter()
        .position(|e| e.anchor_name() == Some(name.as_str()));
    let d_pos = match d_pos {
        Some(p) if p < pos => p,
        _ => {
            return Err(YamlError::parse(
                YamlErrorKind::AnchorNotFound,
                line,
                format!("anchor '{name}' is not defined before this merge"),
            ))
        }
    };

    if elements[d_pos].as_entry().is_some() {
        return Err(YamlError::parse(
            YamlErrorKind::MergeOnScalar,
            line,
            format!("cannot merge scalar anchor '{name}' into a mapping"),
        ));
    }

    let d_indent = elements[d_pos].indent();
    let d_closer_idx = find_matching_closer(elements, d_pos)?;
    let mut anchor_children: Vec<FlatElement> = elements[d_pos + 1..d_closer_idx].to_vec();
    let delta = alias_indent as i64 - (d_indent as i64 + 1);
    for el in &mut anchor_children {
        let new_indent = (el.indent() as i64 + delta).max(0) as usize;
        el.set_indent(new_indent);
    }

    let local_children: Vec<FlatElement> = elements[parent_idx + 1..parent_closer_idx].to_vec();

    let anchor_siblings = split_into_siblings(&anchor_children, alias_indent);
    let mut local_siblings = split_into_siblings(&local_children, alias_indent);
    local_siblings.retain(|(k, _)| k.as_deref() != Some("<<"));

    let mut merged: Vec<FlatElement> = Vec::new();
    for (key, items) in &anchor_siblings {
        if let Some(k) = key {
            if let Some(idx) = local_siblings.iter().position(|(lk, _)| lk.as_deref() == Some(k.as_str())) {
                let (_, local_items) = local_siblings.remove(idx);
                merged.extend(local_items);
                continue;
            }
        }
        merged.extend(items.clone());
    }
    // Flush remaining local-only keys (not present on the anchor).
    for (_, items) in local_siblings {
        merged.extend(items);
    }

    elements.splice(parent_idx + 1..parent_closer_idx, merged);
    Ok(())
}

/// Group a flat span of `elements`, all direct children of the same
/// container, into `(key, item)` pairs — each pair's `item` is either a
/// single `Entry` or a whole `Opener..Closer` block.
fn split_into_siblings(elements: &[FlatElement], base_indent: usize) -> Vec<(Option<String>, Vec<FlatElement>)> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < elements.len() {
        if elements[i].indent() != base_indent {
            i += 1;
            continue;
        }
        if elements[i].is_opener() {
            let mut depth = 0i32;
            let mut j = i + 1;
            while j < elements.len() {
                match &elements[j] {
                    FlatElement::Opener { .. } => depth += 1,
                    FlatElement::Closer { .. } => {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                    }
                    FlatElement::Entry(_) => {}
                }
                j += 1;
            }
            let key = elements[i].key_name().map(str::to_string);
            out.push((key, elements[i..=j].to_vec()));
            i = j + 1;
        } else {
            let key = elements[i].key_name().map(str::to_string);
            out.push((key, vec![elements[i].clone()]));
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, ParserOptions};
    use crate::reader::LineSource;
    use crate::resolver::resolve_aliases;

    fn parse_text(text: &str) -> Vec<FlatElement> {
        let src = LineSource::from_str(text);
        let mut els = parse(&src, ParserOptions::default()).unwrap();
        resolve_aliases(&mut els).unwrap();
        els
    }

    #[test]
    fn merges_with_local_override() {
        let mut els = parse_text("defaults: &d\n  a: 1\n  b: 2\nitem:\n  <<: *d\n  b: 99\n");
        resolve_merges(&mut els).unwrap();
        let item_pos = els.iter().position(|e| e.key_name() == Some("item")).unwrap();
        let closer = find_matching_closer(&els, item_pos).unwrap();
        let children = &els[item_pos + 1..closer];
        assert!(children.iter().all(|e| e.key_name() != Some("<<")));
        let a = children.iter().find(|e| e.key_name() == Some("a")).unwrap();
        assert_eq!(a.as_entry().unwrap().value, "1");
        let b = children.iter().find(|e| e.key_name() == Some("b")).unwrap();
        assert_eq!(b.as_entry().unwrap().value, "99");
    }

    #[test]
    fn merge_of_scalar_anchor_is_an_error() {
        let mut els = parse_text("x: &x 1\nitem:\n  <<: *x\n");
        let err = resolve_merges(&mut els).unwrap_err();
        assert!(matches!(
            err,
            YamlError::Parse {
                kind: YamlErrorKind::MergeOnScalar,
                ..
            }
        ));
    }
}
