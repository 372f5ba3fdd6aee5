//! The engine's sole observable output: W315/W325 diagnostics.

use crate::ast::Range;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The two warning classes this engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum WarningCode {
    /// A table field was set but never subsequently read.
    #[serde(rename = "315")]
    UnusedSet,
    /// A table field was read without ever being (definitely) set.
    #[serde(rename = "325")]
    UndefinedRead,
}

impl WarningCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnusedSet => "315",
            Self::UndefinedRead => "325",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::UnusedSet => 0,
            Self::UndefinedRead => 1,
        }
    }
}

/// A table field key as it should be reported: numeric fields are
/// reported as numbers, string fields as their text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldKey {
    Numeric(f64),
    Named(String),
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Named(s) => write!(f, "{s}"),
        }
    }
}

/// A single warning record pushed into the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub code: WarningCode,
    pub name: String,
    pub field: FieldKey,
    /// Only meaningful for `UnusedSet`: true if the evicted set stored a
    /// `nil` value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_is_nil: Option<bool>,
    pub range: Range,
}

impl Warning {
    pub fn unused_set(name: impl Into<String>, field: FieldKey, set_is_nil: bool, range: Range) -> Self {
        Self {
            code: WarningCode::UnusedSet,
            name: name.into(),
            field,
            set_is_nil: Some(set_is_nil),
            range,
        }
    }

    pub fn undefined_read(name: impl Into<String>, field: FieldKey, range: Range) -> Self {
        Self {
            code: WarningCode::UndefinedRead,
            name: name.into(),
            field,
            set_is_nil: None,
            range,
        }
    }

    /// `(source_line, source_column, warning_code)`, the sink's total order
    /// per the concurrency & resource model.
    pub fn sort_key(&self) -> (u32, u32, u8) {
        (self.range.line, self.range.column, self.code.rank())
    }
}

/// Sorts a batch of warnings into the sink's canonical total order.
pub fn sort_warnings(warnings: &mut [Warning]) {
    warnings.sort_by_key(Warning::sort_key);
}
