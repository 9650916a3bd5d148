//! Error types shared by every stage of the conversion pipeline.
//!
//! The source keeps one error type per module (`ScannerError`,
//! `ComposerError`, ...); per the specification's error handling design
//! (§7) we collapse the whole taxonomy into a single fault kind,
//! [`YamlError::Parse`], carrying a message-template variant
//! ([`YamlErrorKind`]) and the 1-based source line on which the problem
//! was detected.

use thiserror::Error;

/// Message-template identifier for a parse failure.
///
/// Every condition the tokenizer, structural parser, and resolvers can
/// raise maps to exactly one of these variants; see SPEC_FULL.md §7 for
/// the taxonomy this mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YamlErrorKind {
    CollectionItemError,
    InvalidArray,
    InvalidIndentation,
    UnclosedArray,
    UnclosedLiteral,
    UnconsumedContent,

    EmptyKey,
    MultiLineKey,
    DoubleKey,
    ExpectedKey,
    DuplicatedKey,
    InvalidInitialChar,

    InvalidAnchorName,
    DuplicateAnchor,
    AnchorNotFound,
    RecursiveAlias,
    AliasWithValue,
    AliasOrAnchorOnKey,

    MergeInArray,
    MergeInCollection,
    MergeOnScalar,
    InvalidMerge,

    UnknownTag,
    ValueIncompatibleWithTag,

    InvalidBlockModifier,
    BlockModifierOnCollectionItem,
}

impl YamlErrorKind {
    /// A short, stable message identifier for this condition.
    pub fn template(self) -> &'static str {
        use YamlErrorKind::*;
        match self {
            CollectionItemError => "collection item error",
            InvalidArray => "invalid array",
            InvalidIndentation => "invalid indentation",
            UnclosedArray => "unclosed array",
            UnclosedLiteral => "unclosed literal",
            UnconsumedContent => "unconsumed content",

            EmptyKey => "empty key",
            MultiLineKey => "multi-line key",
            DoubleKey => "double key",
            ExpectedKey => "expected key",
            DuplicatedKey => "duplicated key",
            InvalidInitialChar => "invalid initial char",

            InvalidAnchorName => "invalid name",
            DuplicateAnchor => "duplicate anchor",
            AnchorNotFound => "anchor not found",
            RecursiveAlias => "recursive alias",
            AliasWithValue => "alias with value",
            AliasOrAnchorOnKey => "alias/anchor on key",

            MergeInArray => "merge in array",
            MergeInCollection => "merge in collection",
            MergeOnScalar => "merge on scalar",
            InvalidMerge => "invalid merge (missing `*`)",

            UnknownTag => "unknown tag",
            ValueIncompatibleWithTag => "value incompatible with tag",

            InvalidBlockModifier => "invalid block modifier",
            BlockModifierOnCollectionItem => "block modifier on collection item",
        }
    }
}

impl std::fmt::Display for YamlErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.template())
    }
}

/// The crate-wide error type.
#[derive(Debug, Error)]
pub enum YamlError {
    /// A YAML parse failure: a taxonomy entry plus the 1-based line
    /// number it occurred on and a human-readable detail message.
    #[error("line {line}: {kind}: {message}")]
    Parse {
        kind: YamlErrorKind,
        line: usize,
        message: String,
    },

    /// The JSON-text convenience entry points re-parse with `serde_json`;
    /// its errors are wrapped rather than re-encoded, since they already
    /// carry their own line/column diagnostics.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl YamlError {
    pub fn parse(kind: YamlErrorKind, line: usize, message: impl Into<String>) -> Self {
        YamlError::Parse {
            kind,
            line,
            message: message.into(),
        }
    }
}

pub type YamlResult<T> = Result<T, YamlError>;
