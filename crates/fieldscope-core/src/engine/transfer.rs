//! Statement Transfer (spec §4.8): `Local`/`Set`/`Eval` dispatch.
//!
//! Evaluation order always walks right-hand sides before left-hand sides,
//! and — for an `Index` left-hand side — walks the key expression before
//! calling `set_key`, mirroring the source language's own left-to-right,
//! args-before-callee evaluation order.

use super::external_refs::ExternalRefs;
use super::key::normalize_key;
use super::scope::ScopeStack;
use super::table_state::CurrentTables;
use super::walker::Walker;
use crate::ast::{Expr, ExprKind, ItemKind, Range, TableField, VarBinding};
use crate::warning::Warning;

pub fn run_item(
    kind: &ItemKind,
    range: Range,
    tables: &mut CurrentTables,
    scopes: &mut ScopeStack,
    external_refs: &ExternalRefs,
) -> Vec<Warning> {
    match kind {
        ItemKind::Local { lhs, rhs } => run_local(lhs, rhs, tables, scopes, external_refs),
        ItemKind::Set { lhs, rhs } => run_set(lhs, rhs, range, tables, scopes, external_refs),
        ItemKind::Eval { expr } => {
            let mut walker = Walker::new(tables, external_refs, scopes);
            walker.visit_expr(expr);
            walker.into_warnings()
        }
        ItemKind::Noop { .. } | ItemKind::Jump { .. } | ItemKind::Cjump { .. } => Vec::new(),
    }
}

fn run_local(
    lhs: &[VarBinding],
    rhs: &[Expr],
    tables: &mut CurrentTables,
    scopes: &mut ScopeStack,
    external_refs: &ExternalRefs,
) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let multi_value_tail = rhs.last().is_some_and(is_multi_value_producer);

    for (i, binding) in lhs.iter().enumerate() {
        scopes.declare_local(tables, &binding.name);
        match rhs.get(i) {
            Some(value) => {
                warnings.extend(bind_fresh_local(&binding.name, value, tables, external_refs, scopes));
            }
            None if multi_value_tail => {
                // Swallowed by the trailing call/vararg's extra returns —
                // unknowable, so the local is simply never tracked as a
                // table (matches the documented vararg-initializer
                // precision loss).
            }
            None => {
                // Implicit nil: not a table, nothing to track.
            }
        }
    }
    warnings
}

fn run_set(
    lhs: &[Expr],
    rhs: &[Expr],
    item_range: Range,
    tables: &mut CurrentTables,
    scopes: &mut ScopeStack,
    external_refs: &ExternalRefs,
) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let multi_value_tail = rhs.last().is_some_and(is_multi_value_producer);

    for (i, target) in lhs.iter().enumerate() {
        let value = rhs.get(i);
        match &target.kind {
            ExprKind::Id(binding) => {
                if scopes.outer_branch_had_table(&binding.name) {
                    // Whole-variable reassignment inside a branch that
                    // already had this name tracked before branch entry —
                    // defer the eviction decision to the branch merge
                    // rather than flushing now (overwrite-across-branches
                    // policy, extended from fields to whole records).
                    let evicted = tables.end_table_variable_silently(&binding.name);
                    scopes.record_silent_eviction(&binding.name, evicted);
                } else {
                    warnings.extend(tables.end_table_variable(&binding.name));
                }
                if let Some(value) = value {
                    warnings.extend(bind_fresh_local(
                        &binding.name,
                        value,
                        tables,
                        external_refs,
                        scopes,
                    ));
                } else if !multi_value_tail {
                    // Reassigned to nil: name stays untracked.
                }
            }
            ExprKind::Index { base, key } => {
                if let Some(value) = value {
                    let mut walker = Walker::new(tables, external_refs, scopes);
                    walker.visit_expr(value);
                    warnings.extend(walker.into_warnings());
                }
                let mut walker = Walker::new(tables, external_refs, scopes);
                walker.visit_expr(key);
                warnings.extend(walker.into_warnings());

                if let ExprKind::Id(base_binding) = &base.kind {
                    if let Some(record) = tables.get(&base_binding.name) {
                        let normalized = normalize_key(key, false);
                        let value_is_nil = value.is_some_and(|v| matches!(v.kind, ExprKind::Nil));
                        let warning = record.borrow_mut().set_key(
                            &base_binding.name,
                            normalized,
                            item_range,
                            value_is_nil,
                            false,
                            |key, _entry_range| scopes.outer_branch_had_key(&base_binding.name, key),
                        );
                        if let Some(w) = warning {
                            warnings.push(w);
                        }
                        continue;
                    }
                }
                // Base isn't a tracked table: still walk it for nested
                // accesses/escapes of whatever it does reference.
                let mut walker = Walker::new(tables, external_refs, scopes);
                walker.visit_expr(base);
                warnings.extend(walker.into_warnings());
            }
            _ => {
                // Not a legal assignment target in the source language;
                // nothing to do beyond walking the value for side effects.
                if let Some(value) = value {
                    let mut walker = Walker::new(tables, external_refs, scopes);
                    walker.visit_expr(value);
                    warnings.extend(walker.into_warnings());
                }
            }
        }
    }
    warnings
}

fn is_multi_value_producer(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Call { .. } | ExprKind::Invoke { .. } | ExprKind::Dots)
}

/// Binds `name` to the value of `rhs`: aliases an existing tracked table,
/// creates a fresh record for a table literal, or leaves `name` untracked
/// for anything else — while still walking `rhs` for the accesses/escapes
/// it contains.
fn bind_fresh_local(
    name: &str,
    rhs: &Expr,
    tables: &mut CurrentTables,
    external_refs: &ExternalRefs,
    scopes: &ScopeStack,
) -> Vec<Warning> {
    if let ExprKind::Id(binding) = &rhs.kind {
        if let Some(record) = tables.get(&binding.name) {
            tables.alias(name, record);
            return Vec::new();
        }
    }

    if let ExprKind::Table(fields) = &rhs.kind {
        return bind_table_literal(name, fields, tables, external_refs, scopes);
    }

    let mut walker = Walker::new(tables, external_refs, scopes);
    walker.visit_expr(rhs);
    walker.into_warnings()
}

fn bind_table_literal(
    name: &str,
    fields: &[TableField],
    tables: &mut CurrentTables,
    external_refs: &ExternalRefs,
    scopes: &ScopeStack,
) -> Vec<Warning> {
    let record = tables.create(name);
    let mut warnings = Vec::new();
    let mut next_index = 1.0;

    for field in fields {
        match field {
            TableField::Positional(value) => {
                warnings.extend(walk_field_value(value, tables, external_refs, scopes));
                if matches!(value.kind, ExprKind::Dots | ExprKind::Call { .. }) {
                    record.borrow_mut().mark_all_set(value.range);
                    break;
                }
                let key = super::key::NormalizedKey::Constant(super::key::Key::Numeric(
                    super::key::NumKey::new(next_index),
                ));
                next_index += 1.0;
                let value_is_nil = matches!(value.kind, ExprKind::Nil);
                if let Some(w) = record.borrow_mut().set_key(
                    name,
                    key,
                    value.range,
                    value_is_nil,
                    true,
                    |_, _| false,
                ) {
                    warnings.push(w);
                }
            }
            TableField::Pair(key_expr, value) => {
                warnings.extend(walk_field_value(key_expr, tables, external_refs, scopes));
                warnings.extend(walk_field_value(value, tables, external_refs, scopes));
                let key = normalize_key(key_expr, false);
                let value_is_nil = matches!(value.kind, ExprKind::Nil);
                if let Some(w) = record.borrow_mut().set_key(
                    name,
                    key,
                    value.range,
                    value_is_nil,
                    true,
                    |_, _| false,
                ) {
                    warnings.push(w);
                }
            }
        }
    }
    warnings
}

fn walk_field_value(
    value: &Expr,
    tables: &mut CurrentTables,
    external_refs: &ExternalRefs,
    scopes: &ScopeStack,
) -> Vec<Warning> {
    if let ExprKind::Id(binding) = &value.kind {
        if tables.get(&binding.name).is_some() {
            return Vec::new();
        }
    }
    let mut walker = Walker::new(tables, external_refs, scopes);
    walker.visit_expr(value);
    walker.into_warnings()
}
