//! Expression Walker and Aliasing (spec §4.3, §4.4).
//!
//! A single recursive visitor records field accesses against tracked
//! tables and wipes a table the moment its name escapes into a position
//! this engine can no longer follow. Aliasing itself — recognizing that an
//! assignment's entire RHS is a bare reference to an already-tracked table
//! — is a syntactic special case decided by the caller (`engine::transfer`)
//! before the walker ever sees that expression; the walker only needs to
//! know how to treat a bare `Id` it does encounter.

use super::builtins::{self, Builtin};
use super::external_refs::ExternalRefs;
use super::key::normalize_key;
use super::scope::ScopeStack;
use super::table_state::CurrentTables;
use crate::ast::{Expr, ExprKind, Range, TableField};
use crate::warning::Warning;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Ordinary value position: a bare tracked-table `Id` here escapes.
    RecordAccesses,
}

/// Walks expressions against the tables tracked in the current scope,
/// accumulating the warnings that fall out of field accesses and built-in
/// models along the way.
pub struct Walker<'a> {
    tables: &'a mut CurrentTables,
    external_refs: &'a ExternalRefs,
    scopes: &'a ScopeStack,
    warnings: Vec<Warning>,
}

impl<'a> Walker<'a> {
    pub fn new(
        tables: &'a mut CurrentTables,
        external_refs: &'a ExternalRefs,
        scopes: &'a ScopeStack,
    ) -> Self {
        Self {
            tables,
            external_refs,
            scopes,
            warnings: Vec::new(),
        }
    }

    pub fn visit_expr(&mut self, expr: &Expr) {
        self.visit(expr, Mode::RecordAccesses);
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    fn visit(&mut self, expr: &Expr, mode: Mode) {
        match &expr.kind {
            ExprKind::Number(_) | ExprKind::String(_) | ExprKind::Nil | ExprKind::Dots => {}
            ExprKind::Id(binding) => {
                if mode == Mode::RecordAccesses && self.tables.get(&binding.name).is_some() {
                    self.tables.wipe(&binding.name);
                }
            }
            ExprKind::Index { base, key } => self.visit_index(base, key, expr.range),
            ExprKind::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Positional(value) => self.visit_table_field_value(value),
                        TableField::Pair(key, value) => {
                            self.visit(key, Mode::RecordAccesses);
                            self.visit_table_field_value(value);
                        }
                    }
                }
            }
            ExprKind::Call { callee, args } => self.visit_call(callee, args, expr.range),
            ExprKind::Invoke {
                receiver, args, ..
            } => self.visit_invoke(receiver, args, expr.range),
            ExprKind::Function => {
                // Visited only to be registered as a closure elsewhere; the
                // walker never descends into a nested function's own body.
            }
            ExprKind::And(lhs, rhs) | ExprKind::Or(lhs, rhs) => {
                self.visit(lhs, mode);
                self.visit(rhs, mode);
            }
        }
    }

    /// A bare-`Id` value stored directly into a fresh table literal does
    /// not escape: this engine only tracks top-level local aliases, not
    /// references nested inside another table's fields, so there is
    /// nothing further to invalidate.
    fn visit_table_field_value(&mut self, value: &Expr) {
        if let ExprKind::Id(binding) = &value.kind {
            if self.tables.get(&binding.name).is_some() {
                return;
            }
        }
        self.visit(value, Mode::RecordAccesses);
    }

    fn visit_index(&mut self, base: &Expr, key: &Expr, range: Range) {
        self.visit(key, Mode::RecordAccesses);
        if let ExprKind::Id(binding) = &base.kind {
            if let Some(record) = self.tables.get(&binding.name) {
                let normalized = normalize_key(key, false);
                if let Some(w) = record.borrow_mut().access_key(&binding.name, normalized, range) {
                    self.warnings.push(w);
                }
                return;
            }
        }
        self.visit(base, Mode::RecordAccesses);
    }

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], range: Range) {
        let path = qualified_path(callee);
        let builtin = path.as_deref().and_then(builtins::recognize);

        match builtin {
            Some(Builtin::TableInsert) => self.dispatch_insert(args, range),
            Some(Builtin::TableRemove) => self.dispatch_remove(args, range),
            Some(Builtin::TableSort) => self.dispatch_unary(args, |r| builtins::table_sort(r)),
            Some(Builtin::TableConcat) => self.dispatch_unary_range(args, range, builtins::table_concat),
            Some(Builtin::Pairs) => self.dispatch_unary_range(args, range, builtins::pairs),
            Some(Builtin::Ipairs) => self.dispatch_unary_range(args, range, builtins::ipairs),
            Some(Builtin::Next) => self.dispatch_unary_range(args, range, |r, rng, _| {
                builtins::next_fn(r, rng)
            }),
            Some(Builtin::Type) => self.dispatch_unary(args, |r| builtins::type_fn(r)),
            None => {
                self.visit(callee, Mode::RecordAccesses);
                for arg in args {
                    self.visit(arg, Mode::RecordAccesses);
                }
                if !path.as_deref().is_some_and(builtins::is_pure_stdlib_call) {
                    self.external_refs.apply_call_markers(self.tables, range);
                }
            }
        }
    }

    fn dispatch_insert(&mut self, args: &[Expr], range: Range) {
        if args.is_empty() {
            return;
        }
        let (index_expr, value_expr) = match args.len() {
            2 => (None, Some(&args[1])),
            3 => (Some(&args[1]), Some(&args[2])),
            _ => (None, None),
        };
        if let Some(idx) = index_expr {
            self.visit(idx, Mode::RecordAccesses);
        }
        if let Some(value) = value_expr {
            self.visit(value, Mode::RecordAccesses);
        }

        let Some(value_expr) = value_expr else {
            self.visit(&args[0], Mode::RecordAccesses);
            return;
        };

        if let ExprKind::Id(binding) = &args[0].kind {
            if let Some(record) = self.tables.get(&binding.name) {
                let loop_external = self.scopes.originated_outside_current_loop(&binding.name);
                let warning = builtins::table_insert(
                    &mut record.borrow_mut(),
                    &binding.name,
                    index_expr,
                    value_expr,
                    range,
                    loop_external,
                );
                if let Some(w) = warning {
                    self.warnings.push(w);
                }
                return;
            }
        }
        self.visit(&args[0], Mode::RecordAccesses);
    }

    fn dispatch_remove(&mut self, args: &[Expr], range: Range) {
        if args.is_empty() {
            return;
        }
        let index_expr = args.get(1);
        if let Some(idx) = index_expr {
            self.visit(idx, Mode::RecordAccesses);
        }

        if let ExprKind::Id(binding) = &args[0].kind {
            if let Some(record) = self.tables.get(&binding.name) {
                let loop_external = self.scopes.originated_outside_current_loop(&binding.name);
                let warnings = builtins::table_remove(
                    &mut record.borrow_mut(),
                    &binding.name,
                    index_expr,
                    range,
                    loop_external,
                );
                self.warnings.extend(warnings);
                return;
            }
        }
        self.visit(&args[0], Mode::RecordAccesses);
    }

    fn dispatch_unary(
        &mut self,
        args: &[Expr],
        model: impl FnOnce(&mut super::table_state::TableRecord),
    ) {
        let Some(first) = args.first() else { return };
        for arg in &args[1..] {
            self.visit(arg, Mode::RecordAccesses);
        }
        if let ExprKind::Id(binding) = &first.kind {
            if let Some(record) = self.tables.get(&binding.name) {
                model(&mut record.borrow_mut());
                return;
            }
        }
        self.visit(first, Mode::RecordAccesses);
    }

    fn dispatch_unary_range(
        &mut self,
        args: &[Expr],
        range: Range,
        model: impl FnOnce(&mut super::table_state::TableRecord, Range, bool),
    ) {
        let Some(first) = args.first() else { return };
        for arg in &args[1..] {
            self.visit(arg, Mode::RecordAccesses);
        }
        if let ExprKind::Id(binding) = &first.kind {
            if let Some(record) = self.tables.get(&binding.name) {
                let loop_external = self.scopes.originated_outside_current_loop(&binding.name);
                model(&mut record.borrow_mut(), range, loop_external);
                return;
            }
        }
        self.visit(first, Mode::RecordAccesses);
    }

    fn visit_invoke(&mut self, receiver: &Expr, args: &[Expr], range: Range) {
        if let ExprKind::Id(binding) = &receiver.kind {
            if let Some(record) = self.tables.get(&binding.name) {
                let mut rec = record.borrow_mut();
                rec.mark_all_accessed(range);
                rec.mark_all_set(range);
            } else {
                self.visit(receiver, Mode::RecordAccesses);
            }
        } else {
            self.visit(receiver, Mode::RecordAccesses);
        }
        for arg in args {
            self.visit(arg, Mode::RecordAccesses);
        }
        self.external_refs.apply_call_markers(self.tables, range);
    }
}

/// Recovers a call's dotted name (`table.insert`, `pairs`) when the callee
/// is a chain of plain identifiers and string-literal indexes. Anything
/// else (a computed index, a call result) cannot be a recognized built-in.
fn qualified_path(expr: &Expr) -> Option<Vec<String>> {
    match &expr.kind {
        ExprKind::Id(binding) => Some(vec![binding.name.clone()]),
        ExprKind::Index { base, key } => {
            let mut path = qualified_path(base)?;
            match &key.kind {
                ExprKind::String(s) => {
                    path.push(s.clone());
                    Some(path)
                }
                _ => None,
            }
        }
        _ => None,
    }
}
