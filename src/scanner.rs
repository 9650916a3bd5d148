//! The tokenizer (SPEC_FULL.md §4.1): turns physical lines into Key and
//! Value tokens, tracking the `(row, indent)` cursor and the `remainder`
//! left over from splitting `key: value` (or `a, b`, `]`) on one
//! physical line.
//!
//! Multi-line plain/folded/literal scalars are folded here, using the
//! Unicode Private Use Area code point [`NEWLINE_PLACEHOLDER`] to stand
//! in for an embedded logical newline until the emitter converts it to
//! the JSON escape sequence `\n` (SPEC_FULL.md §4.1, §9).

use crate::element::Tag;
use crate::error::{YamlError, YamlErrorKind, YamlResult};
use crate::reader::LineSource;

/// Stands in for a logical newline inside a folded/literal scalar while
/// it is still being trimmed and re-indented. Chosen from the Unicode
/// Private Use Area: it cannot occur in well-formed input text.
pub const NEWLINE_PLACEHOLDER: char = '\u{E000}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Key,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChompMode {
    Clip,
    Strip,
    Keep,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub tag: Option<Tag>,
    pub anchor: Option<String>,
    pub alias: Option<String>,
    /// Set when this value is a collection-item marker (`- `); the
    /// number of columns the marker itself consumed.
    pub collection_item_indent: Option<usize>,
    pub is_literal: bool,
    pub line: usize,
}

impl Token {
    fn value(text: impl Into<String>, line: usize) -> Self {
        Token {
            kind: TokenKind::Value,
            text: text.into(),
            tag: None,
            anchor: None,
            alias: None,
            collection_item_indent: None,
            is_literal: false,
            line,
        }
    }
}

/// What the next non-blank, non-comment line looks like, without
/// consuming it. Used by the structural parser to choose which of the
/// three mutually recursive routines to dispatch to (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookAhead {
    EndOfInput,
    /// A line whose indent is `<=` the indent passed to `look_ahead`.
    Outdent,
    CollectionItem,
    FlowOpen,
    /// `key:` or `key: value`.
    Key,
    /// Anything else: a bare scalar, quoted literal, or block scalar
    /// introducer standing alone.
    Scalar,
}

pub struct Scanner<'a> {
    lines: &'a LineSource,
    row: usize,
    indent: usize,
    remainder: String,
}

impl<'a> Scanner<'a> {
    pub fn new(lines: &'a LineSource) -> Self {
        Scanner {
            lines,
            row: 0,
            indent: 0,
            remainder: String::new(),
        }
    }

    pub fn current_indent(&self) -> usize {
        self.indent
    }

    pub fn current_line(&self) -> usize {
        self.row + 1
    }

    /// Whether the remainder of the current physical line (after a key's
    /// `:`) still holds non-whitespace content, i.e. the value continues
    /// on the same line rather than on an indented following line.
    pub fn remainder_has_content(&self) -> bool {
        !self.remainder.trim().is_empty()
    }

    /// Consume a bare `&name` anchor that stands alone on the remainder
    /// (nothing else follows it on this physical line), leaving the
    /// actual value to be discovered on a following, more indented line.
    /// Returns `None` (without mutating) when the remainder isn't exactly
    /// that shape — e.g. `&name 42` is left untouched, since `next_value`
    /// reads the anchor itself in that case.
    pub fn take_leading_anchor(&mut self) -> Option<String> {
        let trimmed = self.remainder.trim_start();
        let rest = trimmed.strip_prefix('&')?;
        let (name, after) = read_identifier(rest)?;
        if !after.trim().is_empty() {
            return None;
        }
        self.remainder = String::new();
        Some(name)
    }

    /// True when the unconsumed remainder of the current line — skipping
    /// a leading bare anchor, if any — begins with a block scalar
    /// introducer (`|`/`>`). Used right after a collection-item marker,
    /// where a block scalar is illegal (SPEC_FULL.md §4.1).
    pub fn remainder_starts_block_scalar(&self) -> bool {
        let text = self.remainder.trim_start();
        let after_anchor = match text.strip_prefix('&').and_then(read_identifier) {
            Some((_, after)) => after.trim_start().to_string(),
            None => text.to_string(),
        };
        after_anchor.starts_with('|') || after_anchor.starts_with('>')
    }

    /// Classify the remainder of the current line without fetching a new
    /// one. Only meaningful right after a key or collection marker, when
    /// `remainder_has_content` is already `true`.
    pub fn peek_inline_shape(&self) -> LookAhead {
        let text = self.remainder.trim_start();
        if text.starts_with('[') {
            LookAhead::FlowOpen
        } else if looks_like_key(text) {
            LookAhead::Key
        } else {
            LookAhead::Scalar
        }
    }

    fn is_blank_or_comment(line: &str) -> bool {
        let trimmed = line.trim_start();
        trimmed.is_empty() || trimmed.starts_with('#')
    }

    fn leading_spaces(line: &str) -> usize {
        line.chars().take_while(|c| *c == ' ').count()
    }

    fn strip_comment(line: &str) -> &str {
        // A `#` only starts a comment when preceded by whitespace; we
        // don't track quote state here; callers that need `#` inside a
        // quoted literal consume the literal before this runs.
        if let Some(pos) = line.find(" #") {
            &line[..pos]
        } else if line.starts_with('#') {
            ""
        } else {
            line
        }
    }

    /// Advance past blank/comment lines, refilling `remainder` from the
    /// next meaningful line if the current remainder is empty. Returns
    /// `false` at end of input.
    fn ensure_remainder(&mut self) -> bool {
        if !self.remainder.trim().is_empty() {
            return true;
        }
        loop {
            let probe = self.row;
            match self.lines.get(probe) {
                None => return false,
                Some(line) if Self::is_blank_or_comment(line) => {
                    self.row += 1;
                }
                Some(line) => {
                    self.indent = Self::leading_spaces(line);
                    let content = Self::strip_comment(line[self.indent..].trim_end());
                    if content.trim().is_empty() {
                        self.row += 1;
                        continue;
                    }
                    self.remainder = content.to_string();
                    return true;
                }
            }
        }
    }

    /// Look ahead at the next meaningful line, classifying its shape for
    /// the structural parser. Does not consume tokens. `base_indent` is
    /// the source column of the enclosing container (`None` at the
    /// document root, which never auto-outdents).
    pub fn look_ahead(&mut self, base_indent: Option<usize>) -> YamlResult<LookAhead> {
        if !self.ensure_remainder() {
            return Ok(LookAhead::EndOfInput);
        }
        if let Some(base) = base_indent {
            if self.indent <= base {
                return Ok(LookAhead::Outdent);
            }
        }
        let text = self.remainder.trim_start();
        if text.starts_with('[') {
            return Ok(LookAhead::FlowOpen);
        }
        if text == "-" || text.starts_with("- ") {
            return Ok(LookAhead::CollectionItem);
        }
        if looks_like_key(text) {
            return Ok(LookAhead::Key);
        }
        Ok(LookAhead::Scalar)
    }

    /// Read one Key token: everything up to the first top-level `:`.
    pub fn next_key(&mut self) -> YamlResult<Token> {
        if !self.ensure_remainder() {
            return Err(YamlError::parse(
                YamlErrorKind::ExpectedKey,
                self.current_line(),
                "expected a key but reached end of input",
            ));
        }
        let line = self.current_line();
        let trimmed = self.remainder.trim_start().to_string();

        match trimmed.chars().next() {
            Some(first) if first == '&' || first == '*' => {
                return Err(YamlError::parse(
                    YamlErrorKind::AliasOrAnchorOnKey,
                    line,
                    "a mapping key cannot carry an anchor or alias",
                ));
            }
            Some(first) if "[,]-|>+".contains(first) => {
                return Err(YamlError::parse(
                    YamlErrorKind::InvalidInitialChar,
                    line,
                    format!("key cannot start with '{first}'"),
                ));
            }
            None => {
                return Err(YamlError::parse(YamlErrorKind::EmptyKey, line, "empty key"));
            }
            _ => {}
        }

        let colon_pos = find_top_level_colon(&trimmed).ok_or_else(|| {
            YamlError::parse(YamlErrorKind::ExpectedKey, line, "expected ':' after key")
        })?;

        let key_text = trimmed[..colon_pos].trim().to_string();
        if key_text.is_empty() {
            return Err(YamlError::parse(YamlErrorKind::EmptyKey, line, "empty key"));
        }

        let rest = trimmed[colon_pos + 1..].to_string();
        self.remainder = rest;

        Ok(Token {
            kind: TokenKind::Key,
            text: key_text,
            tag: None,
            anchor: None,
            alias: None,
            collection_item_indent: None,
            is_literal: false,
            line,
        })
    }

    /// Read one Value token, per the algorithm in SPEC_FULL.md §4.1.
    pub fn next_value(&mut self, in_inline_array: bool) -> YamlResult<Token> {
        if !self.ensure_remainder() {
            return Err(YamlError::parse(
                YamlErrorKind::InvalidArray,
                self.current_line(),
                "expected a value but reached end of input",
            ));
        }
        let line = self.current_line();
        let mut text = self.remainder.trim_start().to_string();

        // 3. inline-flow delimiters
        if text.starts_with('[') {
            self.remainder = text[1..].to_string();
            return Ok(Token::value("[", line));
        }
        if in_inline_array {
            if let Some(rest) = text.strip_prefix(']') {
                self.remainder = rest.to_string();
                return Ok(Token::value("]", line));
            }
            if let Some(rest) = text.strip_prefix(',') {
                self.remainder = rest.to_string();
                return Ok(Token::value(",", line));
            }
        }

        // 4. collection item marker
        if !in_inline_array && (text == "-" || text.starts_with("- ")) {
            let marker_width = if text == "-" { 1 } else { 2 };
            self.remainder = if text == "-" {
                String::new()
            } else {
                text[2..].to_string()
            };
            let mut tok = Token::value("-", line);
            tok.collection_item_indent = Some(self.indent + marker_width);
            return Ok(tok);
        }

        // 5. anchor / alias introducer
        let mut anchor = None;
        if let Some(rest) = text.strip_prefix('&') {
            let (name, after) = read_identifier(rest).ok_or_else(|| {
                YamlError::parse(YamlErrorKind::InvalidAnchorName, line, "invalid anchor name")
            })?;
            anchor = Some(name);
            text = after.trim_start().to_string();
        } else if let Some(rest) = text.strip_prefix('*') {
            let (name, after) = read_identifier(rest).ok_or_else(|| {
                YamlError::parse(YamlErrorKind::InvalidAnchorName, line, "invalid alias name")
            })?;
            self.remainder = after.to_string();
            if !after.trim().is_empty() {
                return Err(YamlError::parse(
                    YamlErrorKind::AliasWithValue,
                    line,
                    "alias cannot be followed by a value",
                ));
            }
            return Ok(Token {
                kind: TokenKind::Value,
                text: String::new(),
                tag: None,
                anchor: None,
                alias: Some(name),
                collection_item_indent: None,
                is_literal: false,
                line,
            });
        }

        // 2. explicit tags
        let mut tag = None;
        if text.starts_with("!!") {
            let tag_token = text.split_whitespace().next().unwrap_or("").to_string();
            tag = Some(Tag::from_token(&tag_token).ok_or_else(|| {
                YamlError::parse(
                    YamlErrorKind::UnknownTag,
                    line,
                    format!("unrecognized tag '{tag_token}'"),
                )
            })?);
            text = text[tag_token.len()..].trim_start().to_string();
        }

        // 6. block scalar introducers
        if text.starts_with('|') || text.starts_with('>') {
            let folded = text.starts_with('>');
            let mut rest = &text[1..];
            let chomp = if let Some(stripped) = rest.strip_prefix('-') {
                rest = stripped;
                ChompMode::Strip
            } else if let Some(stripped) = rest.strip_prefix('+') {
                rest = stripped;
                ChompMode::Keep
            } else {
                ChompMode::Clip
            };
            if !rest.trim().is_empty() {
                return Err(YamlError::parse(
                    YamlErrorKind::InvalidBlockModifier,
                    line,
                    "unexpected content after block scalar header",
                ));
            }
            let base_indent = self.indent;
            self.row += 1;
            self.remainder = String::new();
            let value = self.read_block_scalar(base_indent, folded, chomp)?;
            let mut tok = Token::value(value, line);
            tok.tag = tag;
            tok.anchor = anchor;
            tok.is_literal = true;
            return Ok(tok);
        }

        // 7. quoted literals
        if text.starts_with('"') {
            let (value, rest) = self.read_quoted(line, '"', true)?;
            self.remainder = rest;
            let mut tok = Token::value(value, line);
            tok.tag = tag;
            tok.anchor = anchor;
            tok.is_literal = true;
            return Ok(tok);
        }
        if text.starts_with('\'') {
            let (value, rest) = self.read_quoted(line, '\'', false)?;
            self.remainder = rest;
            let mut tok = Token::value(value, line);
            tok.tag = tag;
            tok.anchor = anchor;
            tok.is_literal = true;
            return Ok(tok);
        }

        // 8. plain scalar
        let (value, rest) = self.read_plain_scalar(&text, in_inline_array)?;
        self.remainder = rest;
        let mut tok = Token::value(value, line);
        tok.tag = tag;
        tok.anchor = anchor;
        Ok(tok)
    }

    /// Read the body of a `|`/`>` block scalar: every physical line more
    /// indented than `base_indent` belongs to it.
    fn read_block_scalar(
        &mut self,
        base_indent: usize,
        folded: bool,
        chomp: ChompMode,
    ) -> YamlResult<String> {
        let mut captured: Vec<(usize, String)> = Vec::new();
        loop {
            let Some(raw) = self.lines.get(self.row) else {
                break;
            };
            if raw.trim().is_empty() {
                captured.push((usize::MAX, String::new()));
                self.row += 1;
                continue;
            }
            let indent = Self::leading_spaces(raw);
            if indent <= base_indent {
                break;
            }
            captured.push((indent, raw[indent..].to_string()));
            self.row += 1;
        }

        let min_indent = captured
            .iter()
            .filter(|(i, _)| *i != usize::MAX)
            .map(|(i, _)| *i)
            .min()
            .unwrap_or(base_indent + 1);
        let extra = min_indent.saturating_sub(base_indent + 1);

        let mut out = String::new();
        let mut prev_was_blank = true;
        let mut first = true;
        for (indent, text) in &captured {
            if *indent == usize::MAX {
                out.push(NEWLINE_PLACEHOLDER);
                prev_was_blank = true;
                continue;
            }
            let rel_indent = indent.saturating_sub(base_indent + 1);
            if folded && rel_indent > extra {
                if !first {
                    out.push(NEWLINE_PLACEHOLDER);
                }
                out.push_str(text);
            } else if folded {
                if !first && !prev_was_blank {
                    out.push(' ');
                } else if !first {
                    out.push(NEWLINE_PLACEHOLDER);
                }
                out.push_str(text);
                prev_was_blank = false;
            } else {
                // literal: keep every line verbatim
                if !first {
                    out.push(NEWLINE_PLACEHOLDER);
                }
                out.push_str(text);
            }
            first = false;
        }

        apply_chomp(&out, chomp)
    }

    fn read_quoted(
        &mut self,
        start_line: usize,
        quote: char,
        double: bool,
    ) -> YamlResult<(String, String)> {
        let first = self.remainder.trim_start().to_string();
        let mut buf = first[1..].to_string();
        let mut out = String::new();
        loop {
            let mut closed_at = None;
            {
                let bytes: Vec<char> = buf.chars().collect();
                let mut i = 0;
                while i < bytes.len() {
                    let c = bytes[i];
                    if double && c == '\\' {
                        i += 2;
                        continue;
                    }
                    if c == quote {
                        if !double && bytes.get(i + 1) == Some(&quote) {
                            i += 2;
                            continue;
                        }
                        closed_at = Some(i);
                        break;
                    }
                    i += 1;
                }
            }
            if let Some(idx) = closed_at {
                let byte_idx = buf.char_indices().nth(idx).map(|(b, _)| b).unwrap();
                let end_quote = buf.char_indices().nth(idx).map(|(b, c)| b + c.len_utf8()).unwrap();
                out.push_str(&unescape_quoted(&buf[..byte_idx], double));
                let rest = buf[end_quote..].to_string();
                return Ok((out, rest));
            }
            out.push_str(&unescape_quoted(&buf, double));
            out.push(NEWLINE_PLACEHOLDER);
            self.row += 1;
            match self.lines.get(self.row) {
                Some(next) => buf = next.to_string(),
                None => {
                    return Err(YamlError::parse(
                        YamlErrorKind::UnclosedLiteral,
                        start_line,
                        "unterminated quoted literal",
                    ))
                }
            }
        }
    }

    fn read_plain_scalar(
        &mut self,
        first_line_text: &str,
        in_inline_array: bool,
    ) -> YamlResult<(String, String)> {
        let limit = if in_inline_array {
            first_line_text.find([',', ']']).unwrap_or(first_line_text.len())
        } else {
            first_line_text.len()
        };
        let first_piece = first_line_text[..limit].trim_end().to_string();
        let rest_of_line = first_line_text[limit..].to_string();

        if in_inline_array {
            // Terminates on the same physical line by `,`/`]`/EOL.
            return Ok((first_piece, rest_of_line));
        }

        let base_indent = self.indent;
        let mut lines = vec![first_piece];
        self.row += 1;
        loop {
            let Some(raw) = self.lines.get(self.row) else {
                break;
            };
            if Self::is_blank_or_comment(raw) {
                lines.push(String::new());
                self.row += 1;
                continue;
            }
            let indent = Self::leading_spaces(raw);
            let content = Self::strip_comment(raw[indent..].trim_end());
            let is_collection_item = content == "-" || content.starts_with("- ");
            if indent <= base_indent || is_collection_item || looks_like_key(content) {
                break;
            }
            lines.push(content.to_string());
            self.row += 1;
        }

        let folded: Vec<&str> = lines.iter().map(String::as_str).collect();
        Ok((fold_plain_lines(&folded), String::new()))
    }
}

/// `true` when `text` looks like `key:` or `key: value` at its top
/// level (not inside quotes).
fn looks_like_key(text: &str) -> bool {
    find_top_level_colon(text).is_some()
}

/// Find the index of a `:` that introduces a value (followed by a space
/// or end of line), ignoring colons inside quoted substrings.
fn find_top_level_colon(text: &str) -> Option<usize> {
    let mut in_single = false;
    let mut in_double = false;
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    for (pos, (i, c)) in chars.iter().enumerate() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            ':' if !in_single && !in_double => {
                let next = chars.get(pos + 1).map(|(_, c)| *c);
                if next.is_none() || next == Some(' ') {
                    return Some(*i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a one-entry inline mapping (`key: value`) read back as a single
/// plain-scalar token inside a flow sequence. `None` if `text` has no
/// top-level `:`, meaning the token is an ordinary scalar item.
pub fn split_flow_entry(text: &str) -> Option<(String, String)> {
    let pos = find_top_level_colon(text)?;
    let key = text[..pos].trim().to_string();
    let value = text[pos + 1..].trim().to_string();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

fn read_identifier(rest: &str) -> Option<(String, String)> {
    if rest.is_empty() || rest.starts_with(' ') {
        return None;
    }
    let end = rest
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let name = &rest[..end];
    if name.chars().next().unwrap().is_ascii_digit() {
        return None;
    }
    Some((name.to_string(), rest[end..].to_string()))
}

fn unescape_quoted(text: &str, double: bool) -> String {
    if !double {
        return text.replace("''", "'");
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push(NEWLINE_PLACEHOLDER),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('u') => {
                let hex: String = (0..4).filter_map(|_| chars.next()).collect();
                if let Ok(code) = u32::from_str_radix(&hex, 16) {
                    if let Some(ch) = char::from_u32(code) {
                        out.push(ch);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn fold_plain_lines(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut prev_blank = true;
    let mut first = true;
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            out.push(NEWLINE_PLACEHOLDER);
            prev_blank = true;
            continue;
        }
        if !first && !prev_blank {
            out.push(' ');
        }
        out.push_str(trimmed);
        prev_blank = false;
        first = false;
    }
    out
}

fn apply_chomp(text: &str, mode: ChompMode) -> YamlResult<String> {
    let trimmed_trailing = text.trim_end_matches(NEWLINE_PLACEHOLDER);
    Ok(match mode {
        ChompMode::Strip => trimmed_trailing.to_string(),
        ChompMode::Clip => format!("{trimmed_trailing}{NEWLINE_PLACEHOLDER}"),
        ChompMode::Keep => {
            if text.ends_with(NEWLINE_PLACEHOLDER) {
                text.to_string()
            } else {
                format!("{text}{NEWLINE_PLACEHOLDER}")
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_simple_key_and_value() {
        let src = LineSource::from_str("name: world");
        let mut sc = Scanner::new(&src);
        let key = sc.next_key().unwrap();
        assert_eq!(key.text, "name");
        let val = sc.next_value(false).unwrap();
        assert_eq!(val.text, "world");
    }

    #[test]
    fn reads_anchor_and_alias() {
        let src = LineSource::from_str("base: &x 42\nother: *x");
        let mut sc = Scanner::new(&src);
        sc.next_key().unwrap();
        let v = sc.next_value(false).unwrap();
        assert_eq!(v.anchor.as_deref(), Some("x"));
        assert_eq!(v.text, "42");
        sc.next_key().unwrap();
        let v2 = sc.next_value(false).unwrap();
        assert_eq!(v2.alias.as_deref(), Some("x"));
    }

    #[test]
    fn folds_literal_block_scalar() {
        let src = LineSource::from_str("a: |\n  one\n  two\n");
        let mut sc = Scanner::new(&src);
        sc.next_key().unwrap();
        let v = sc.next_value(false).unwrap();
        assert_eq!(
            v.text,
            format!("one{NEWLINE_PLACEHOLDER}two{NEWLINE_PLACEHOLDER}")
        );
    }

    #[test]
    fn folds_folded_block_scalar() {
        let src = LineSource::from_str("a: >\n  one\n  two\n");
        let mut sc = Scanner::new(&src);
        sc.next_key().unwrap();
        let v = sc.next_value(false).unwrap();
        assert_eq!(v.text, format!("one two{NEWLINE_PLACEHOLDER}"));
    }

    #[test]
    fn reads_double_quoted_escape() {
        let src = LineSource::from_str(r#"a: "line\ttab""#);
        let mut sc = Scanner::new(&src);
        sc.next_key().unwrap();
        let v = sc.next_value(false).unwrap();
        assert_eq!(v.text, "line\ttab");
        assert!(v.is_literal);
    }
}
