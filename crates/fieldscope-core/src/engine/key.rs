//! Key Normalizer (spec §4.1).
//!
//! Canonicalizes constant keys so `set_key`/`access_key` can use them as
//! hash-map keys, and classifies everything else as a variable key that
//! the table-state layer represents via its `potentially_all_*` markers
//! instead of a specific entry.

use crate::ast::{Expr, ExprKind};
use crate::warning::FieldKey;

/// A finite `f64` table key with value-based `Eq`/`Hash`, so it can live
/// in a `HashMap` key. Table keys in this domain are never `NaN`.
#[derive(Debug, Clone, Copy)]
pub struct NumKey(f64);

impl NumKey {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for NumKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for NumKey {}

impl std::hash::Hash for NumKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// A canonicalized constant key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Numeric(NumKey),
    Named(String),
}

impl Key {
    pub fn to_field_key(&self) -> FieldKey {
        match self {
            Self::Numeric(n) => FieldKey::Numeric(n.value()),
            Self::Named(s) => FieldKey::Named(s.clone()),
        }
    }
}

/// The result of normalizing a key expression.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedKey {
    Constant(Key),
    /// A key that is not a compile-time constant; operations on it are
    /// tracked only via the table record's `potentially_all_*` markers.
    Variable,
}

/// Normalizes a key node.
///
/// `coerce_numeric_strings` matches the language's runtime coercion used
/// by `table.insert`/`table.remove`'s positional-index arguments: a numeral
/// string there is treated as the number it denotes, whereas the *same*
/// string used as an ordinary table key stays a distinct string key.
pub fn normalize_key(key: &Expr, coerce_numeric_strings: bool) -> NormalizedKey {
    match &key.kind {
        ExprKind::Number(n) => NormalizedKey::Constant(Key::Numeric(NumKey(*n))),
        ExprKind::String(s) => match parse_finite_number(s) {
            Some(n) if coerce_numeric_strings => NormalizedKey::Constant(Key::Numeric(NumKey(n))),
            _ => NormalizedKey::Constant(Key::Named(s.clone())),
        },
        _ => NormalizedKey::Variable,
    }
}

fn parse_finite_number(s: &str) -> Option<f64> {
    let value: f64 = s.trim().parse().ok()?;
    value.is_finite().then_some(value)
}
