//! The flat element list: the intermediate representation shared by the
//! structural parser, both resolvers, and the emitter (SPEC_FULL.md §3).
//!
//! The source represents every element — bracket marker or key/value
//! record — with one record type carrying optional fields. We use a
//! tagged variant instead (§9 DESIGN NOTES): bracket markers and entries
//! are distinct enum variants, so a resolver or emitter that only knows
//! how to handle one kind cannot accidentally read the wrong field out
//! of the other.

/// Which bracket pair a container opener/closer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Map,
    Seq,
}

/// An explicit `!!...` type tag attached to a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Map,
    Seq,
    Str,
    Null,
    Bool,
    Int,
    Float,
    Binary,
    Timestamp,
}

impl Tag {
    pub fn from_token(token: &str) -> Option<Tag> {
        Some(match token {
            "!!map" => Tag::Map,
            "!!seq" => Tag::Seq,
            "!!str" => Tag::Str,
            "!!null" => Tag::Null,
            "!!bool" => Tag::Bool,
            "!!int" => Tag::Int,
            "!!float" => Tag::Float,
            "!!binary" => Tag::Binary,
            "!!timestamp" => Tag::Timestamp,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Map => "!!map",
            Tag::Seq => "!!seq",
            Tag::Str => "!!str",
            Tag::Null => "!!null",
            Tag::Bool => "!!bool",
            Tag::Int => "!!int",
            Tag::Float => "!!float",
            Tag::Binary => "!!binary",
            Tag::Timestamp => "!!timestamp",
        }
    }
}

/// A single key/value or array-item record (everything that isn't a
/// bracket marker).
#[derive(Debug, Clone)]
pub struct Entry {
    /// Key name; `None` for array items.
    pub key: Option<String>,
    /// Already JSON-escaped scalar text (may still contain the internal
    /// newline placeholder, see `scanner::NEWLINE_PLACEHOLDER`).
    pub value: String,
    pub indent: usize,
    /// True iff this scalar came from a quoted literal (inhibits type
    /// coercion in the value classifier).
    pub literal: bool,
    /// Unresolved alias reference (`*name`), cleared by the resolvers.
    pub alias: Option<String>,
    /// Anchor name this element defines (`&name`), kept for diagnostics.
    pub anchor: Option<String>,
    pub line: usize,
    pub tag: Option<Tag>,
}

impl Entry {
    pub fn new(value: impl Into<String>, indent: usize, line: usize) -> Self {
        Entry {
            key: None,
            value: value.into(),
            indent,
            literal: false,
            alias: None,
            anchor: None,
            line,
            tag: None,
        }
    }
}

/// One record of the flat intermediate representation.
#[derive(Debug, Clone)]
pub enum FlatElement {
    Opener {
        kind: ContainerKind,
        indent: usize,
        line: usize,
        /// The key this container is the value of (`None` for a
        /// sequence item or the document root).
        key: Option<String>,
        /// Anchor name defined on this container, if any.
        anchor: Option<String>,
    },
    Closer {
        kind: ContainerKind,
        indent: usize,
        line: usize,
    },
    Entry(Entry),
}

impl FlatElement {
    pub fn open(kind: ContainerKind, indent: usize, line: usize) -> Self {
        FlatElement::Opener {
            kind,
            indent,
            line,
            key: None,
            anchor: None,
        }
    }

    pub fn open_with(
        kind: ContainerKind,
        indent: usize,
        line: usize,
        key: Option<String>,
        anchor: Option<String>,
    ) -> Self {
        FlatElement::Opener {
            kind,
            indent,
            line,
            key,
            anchor,
        }
    }

    pub fn close(kind: ContainerKind, indent: usize, line: usize) -> Self {
        FlatElement::Closer { kind, indent, line }
    }

    pub fn indent(&self) -> usize {
        match self {
            FlatElement::Opener { indent, .. }
            | FlatElement::Closer { indent, .. } => *indent,
            FlatElement::Entry(e) => e.indent,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            FlatElement::Opener { line, .. } | FlatElement::Closer { line, .. } => *line,
            FlatElement::Entry(e) => e.line,
        }
    }

    pub fn set_indent(&mut self, indent: usize) {
        match self {
            FlatElement::Opener { indent: i, .. } | FlatElement::Closer { indent: i, .. } => {
                *i = indent;
            }
            FlatElement::Entry(e) => e.indent = indent,
        }
    }

    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            FlatElement::Entry(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_entry_mut(&mut self) -> Option<&mut Entry> {
        match self {
            FlatElement::Entry(e) => Some(e),
            _ => None,
        }
    }

    pub fn anchor_name(&self) -> Option<&str> {
        match self {
            FlatElement::Opener { anchor, .. } => anchor.as_deref(),
            FlatElement::Entry(e) => e.anchor.as_deref(),
            FlatElement::Closer { .. } => None,
        }
    }

    pub fn key_name(&self) -> Option<&str> {
        match self {
            FlatElement::Opener { key, .. } => key.as_deref(),
            FlatElement::Entry(e) => e.key.as_deref(),
            FlatElement::Closer { .. } => None,
        }
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.as_entry().and_then(|e| e.alias.as_deref())
    }

    pub fn is_opener(&self) -> bool {
        matches!(self, FlatElement::Opener { .. })
    }

    pub fn is_closer(&self) -> bool {
        matches!(self, FlatElement::Closer { .. })
    }

    pub fn kind(&self) -> Option<ContainerKind> {
        match self {
            FlatElement::Opener { kind, .. } | FlatElement::Closer { kind, .. } => Some(*kind),
            FlatElement::Entry(_) => None,
        }
    }
}
