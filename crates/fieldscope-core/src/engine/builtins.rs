//! Built-in Models (spec §4.5): closed-form transfer functions for the
//! handful of standard-library calls that touch tracked table state in
//! well-known ways, plus the recognizer for pure stdlib calls that the
//! External Reference Tracker can bypass entirely (spec §4.6).

use super::key::{normalize_key, Key, NormalizedKey, NumKey};
use super::table_state::TableRecord;
use crate::ast::{Expr, ExprKind, Range};
use crate::warning::Warning;
#[cfg(feature = "tracing")]
use tracing::trace;

/// The recognized built-in calls with closed-form table-state models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    TableInsert,
    TableRemove,
    TableSort,
    TableConcat,
    Pairs,
    Ipairs,
    Next,
    Type,
}

/// Matches a call's qualified name (e.g. `["table", "insert"]`, `["pairs"]`)
/// against the recognized built-ins.
pub fn recognize(path: &[String]) -> Option<Builtin> {
    match path {
        [a, b] if a == "table" && b == "insert" => Some(Builtin::TableInsert),
        [a, b] if a == "table" && b == "remove" => Some(Builtin::TableRemove),
        [a, b] if a == "table" && b == "sort" => Some(Builtin::TableSort),
        [a, b] if a == "table" && b == "concat" => Some(Builtin::TableConcat),
        [a] if a == "pairs" => Some(Builtin::Pairs),
        [a] if a == "ipairs" => Some(Builtin::Ipairs),
        [a] if a == "next" => Some(Builtin::Next),
        [a] if a == "type" => Some(Builtin::Type),
        _ => None,
    }
}

const PURE_STDLIB_ROOTS: &[&str] = &["math", "string", "os", "bit32", "utf8"];
const PURE_STDLIB_SINGLES: &[&str] = &[
    "tostring", "tonumber", "assert", "error", "print", "select", "unpack", "rawequal", "rawlen",
];

/// True for standard-library calls known to be incapable of reaching
/// tracked table state, even indirectly through a captured upvalue — the
/// External Reference Tracker's call-site marker propagation skips these
/// (spec §4.6).
pub fn is_pure_stdlib_call(path: &[String]) -> bool {
    match path {
        [root, ..] if PURE_STDLIB_ROOTS.contains(&root.as_str()) => true,
        [root, rest] if root == "io" => rest != "lines",
        [single] if PURE_STDLIB_SINGLES.contains(&single.as_str()) => true,
        _ => false,
    }
}

fn is_nil(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Nil)
}

fn count_non_nil_numeric_set_keys(record: &TableRecord) -> usize {
    record
        .set_keys
        .iter()
        .filter(|(k, e)| matches!(k, Key::Numeric(_)) && !e.value_is_nil)
        .count()
}

fn max_non_nil_integer_key(record: &TableRecord) -> f64 {
    record
        .set_keys
        .iter()
        .filter(|(_, e)| !e.value_is_nil)
        .filter_map(|(k, _)| match k {
            Key::Numeric(n) if n.value() >= 1.0 && n.value().fract() == 0.0 => Some(n.value()),
            _ => None,
        })
        .fold(0.0, f64::max)
}

fn matching_keys(record: &TableRecord, numeric_only: bool, include_maybe: bool) -> Vec<Key> {
    let filter = |k: &Key, e: &crate::engine::table_state::SetEntry| {
        !e.value_is_nil && (!numeric_only || matches!(k, Key::Numeric(_)))
    };
    let mut keys: Vec<Key> = record
        .set_keys
        .iter()
        .filter(|(k, e)| filter(k, e))
        .map(|(k, _)| k.clone())
        .collect();
    if include_maybe {
        keys.extend(
            record
                .maybe_set_keys
                .iter()
                .filter(|(k, e)| filter(k, e))
                .map(|(k, _)| k.clone()),
        );
    }
    keys
}

/// `table.sort(t[, cmp])`: in-place reorder, no key identity change.
pub fn table_sort(_record: &mut TableRecord) {}

/// `table.concat(t[, sep[, i[, j]]])`: reads the non-nil numeric `set_keys`
/// run (spec: the precise, non-hole path); falls back to
/// `potentially_all_accessed` once the record has lost precision.
pub fn table_concat(record: &mut TableRecord, call_range: Range, loop_external: bool) {
    if loop_external || record.potentially_all_set.is_some() {
        record.mark_all_accessed(call_range);
        return;
    }
    for key in matching_keys(record, true, false) {
        record.mark_accessed(key, call_range);
    }
}

/// `ipairs(t)`: like `table.concat`, but also covers numeric keys that are
/// only conditionally set (`maybe_set_keys`).
pub fn ipairs(record: &mut TableRecord, call_range: Range, loop_external: bool) {
    if loop_external || record.potentially_all_set.is_some() {
        record.mark_all_accessed(call_range);
        return;
    }
    for key in matching_keys(record, true, true) {
        record.mark_accessed(key, call_range);
    }
}

/// `pairs(t)`: visits every key, numeric and named, set or maybe-set.
pub fn pairs(record: &mut TableRecord, call_range: Range, loop_external: bool) {
    if loop_external || record.potentially_all_set.is_some() {
        record.mark_all_accessed(call_range);
        return;
    }
    for key in matching_keys(record, false, true) {
        record.mark_accessed(key, call_range);
    }
}

/// `next(t[, k])`: stateless single-step iteration; conservatively treated
/// as a read of everything.
pub fn next_fn(record: &mut TableRecord, call_range: Range) {
    record.mark_all_accessed(call_range);
}

/// `type(t)`: inspects the value's runtime tag only, never its fields.
pub fn type_fn(_record: &mut TableRecord) {}

/// `table.insert(t, v)` / `table.insert(t, i, v)`.
pub fn table_insert(
    record: &mut TableRecord,
    owner: &str,
    index_expr: Option<&Expr>,
    value_expr: &Expr,
    call_range: Range,
    loop_external: bool,
) -> Option<Warning> {
    if loop_external || record.potentially_all_set.is_some() || !record.maybe_set_keys.is_empty()
    {
        #[cfg(feature = "tracing")]
        trace!(owner, loop_external, "table.insert collapsed to imprecise mark_all_set");
        record.mark_all_set(call_range);
        return None;
    }

    let value_is_nil = is_nil(value_expr);
    let normalized = match index_expr {
        Some(idx) => normalize_key(idx, true),
        None => {
            let next = 1.0 + count_non_nil_numeric_set_keys(record) as f64;
            NormalizedKey::Constant(Key::Numeric(NumKey::new(next)))
        }
    };

    record.set_key(owner, normalized, call_range, value_is_nil, false, |_, _| false)
}

/// `table.remove(t)` / `table.remove(t, i)`.
pub fn table_remove(
    record: &mut TableRecord,
    owner: &str,
    index_expr: Option<&Expr>,
    call_range: Range,
    loop_external: bool,
) -> Vec<Warning> {
    if let Some(idx) = index_expr {
        if matches!(normalize_key(idx, true), NormalizedKey::Variable) {
            record.mark_all_set(call_range);
            record.mark_all_accessed(call_range);
            return Vec::new();
        }
    }

    if loop_external || record.potentially_all_set.is_some() || !record.maybe_set_keys.is_empty()
    {
        record.mark_all_set(call_range);
        match index_expr.map(|idx| normalize_key(idx, true)) {
            Some(NormalizedKey::Constant(key)) => record.mark_accessed(key, call_range),
            _ => record.mark_all_accessed(call_range),
        }
        return Vec::new();
    }

    let max_key = max_non_nil_integer_key(record);
    let i = match index_expr {
        Some(idx) => match normalize_key(idx, true) {
            NormalizedKey::Constant(Key::Numeric(n)) => n.value(),
            _ => unreachable!("variable index handled above"),
        },
        None if max_key == 0.0 => 1.0,
        None => max_key,
    };

    record.mark_accessed(Key::Numeric(NumKey::new(i)), call_range);

    if i > max_key || max_key == 0.0 {
        return Vec::new();
    }

    let mut warnings = Vec::new();
    let mut j = i as i64;
    let l = max_key as i64;
    while j < l {
        let moved = record
            .set_keys
            .get(&Key::Numeric(NumKey::new((j + 1) as f64)))
            .cloned();
        let (moved_owner, moved_is_nil) = match moved {
            Some(entry) => (entry.owning_name, entry.value_is_nil),
            None => (owner.to_string(), true),
        };
        if let Some(w) = record.set_key(
            &moved_owner,
            NormalizedKey::Constant(Key::Numeric(NumKey::new(j as f64))),
            call_range,
            moved_is_nil,
            false,
            |_, _| false,
        ) {
            warnings.push(w);
        }
        record.mark_accessed(Key::Numeric(NumKey::new((j + 1) as f64)), call_range);
        j += 1;
    }

    if let Some(w) = record.set_key(
        owner,
        NormalizedKey::Constant(Key::Numeric(NumKey::new(l as f64))),
        call_range,
        true,
        false,
        |_, _| false,
    ) {
        warnings.push(w);
    }

    warnings
}
