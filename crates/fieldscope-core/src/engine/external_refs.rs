//! External Reference Tracker (spec §4.6).
//!
//! Nested closures can reach this function's locals as upvalues without
//! ever naming them in a call argument. This tracker accumulates, as
//! closures are encountered in source order, which currently-tracked table
//! names a later opaque call might reach indirectly, and applies the
//! corresponding `potentially_all_*` markers at each such call site. It
//! never wipes — an upvalue-captured table is still the same local, only
//! possibly mutated through a path this engine can't see into.

use super::table_state::CurrentTables;
use crate::ast::{FunctionScope, Item, Range};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct ExternalRefs {
    accessed: HashSet<String>,
    set: HashSet<String>,
    mutated: HashSet<String>,
}

impl ExternalRefs {
    /// Seeds from the function's own parameters and the upvalue sets the
    /// collaborator attached to the `FunctionScope` itself (names this
    /// function's locals are already known to be captured as, before any
    /// per-statement nested closure is folded in). Per §4.6, every
    /// parameter is seeded as both accessed and mutated at function entry —
    /// a parameter later rebound to a table literal still carries the
    /// caller's opaque hold on the name.
    pub fn new(scope: &FunctionScope) -> Self {
        let mut tracker = Self::default();
        tracker.accessed.extend(scope.parameters.iter().cloned());
        tracker.mutated.extend(scope.parameters.iter().cloned());
        tracker.accessed.extend(scope.accessed_upvalues.iter().cloned());
        tracker.set.extend(scope.set_upvalues.iter().cloned());
        tracker.mutated.extend(scope.mutated_upvalues.iter().cloned());
        tracker
    }

    /// Folds in the upvalue sets of any closures this item introduces.
    /// Must run before the item's own statement semantics are applied, so
    /// a call appearing later in the *same* item already sees closures
    /// defined earlier in it.
    pub fn fold_item(&mut self, item: &Item) {
        for nested in &item.nested_functions {
            self.accessed.extend(nested.accessed_upvalues.iter().cloned());
            self.set.extend(nested.set_upvalues.iter().cloned());
            self.mutated.extend(nested.mutated_upvalues.iter().cloned());
        }
    }

    /// Applies call-site markers to every currently tracked table whose
    /// name is in one of the accumulated upvalue sets. Never removes a
    /// table from `tables` — only weakens precision on it.
    pub fn apply_call_markers(&self, tables: &mut CurrentTables, call_range: Range) {
        let names: Vec<String> = tables.names().cloned().collect();
        for name in names {
            let Some(record) = tables.get(&name) else {
                continue;
            };
            let mut rec = record.borrow_mut();
            if self.accessed.contains(&name) || self.mutated.contains(&name) {
                rec.mark_all_accessed(call_range);
            }
            if self.set.contains(&name) || self.mutated.contains(&name) {
                rec.mark_all_set(call_range);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ControlBlockType, ItemKind, NestedFunctionRefs, Range as R};

    fn function_scope() -> FunctionScope {
        FunctionScope::new(Vec::new(), R::dummy())
    }

    #[test]
    fn seeds_from_function_scope_upvalues() {
        let mut scope = function_scope();
        scope.accessed_upvalues.push("t".to_string());
        let tracker = ExternalRefs::new(&scope);
        let mut tables = CurrentTables::new();
        tables.create("t");
        tracker.apply_call_markers(&mut tables, R::at_line(1));
        let record = tables.get("t").unwrap();
        assert!(record.borrow().potentially_all_accessed.is_some());
        assert!(record.borrow().potentially_all_set.is_none());
    }

    #[test]
    fn folds_nested_closure_sets_before_later_calls() {
        let scope = function_scope();
        let mut tracker = ExternalRefs::new(&scope);
        let item = crate::ast::Item::new(
            ItemKind::Noop {
                control_block_type: ControlBlockType::Do,
                scope_end: false,
                is_else: false,
            },
            R::dummy(),
        )
        .with_nested(vec![NestedFunctionRefs {
            accessed_upvalues: vec![],
            set_upvalues: vec!["t".to_string()],
            mutated_upvalues: vec![],
        }]);
        tracker.fold_item(&item);

        let mut tables = CurrentTables::new();
        tables.create("t");
        tracker.apply_call_markers(&mut tables, R::at_line(2));
        let record = tables.get("t").unwrap();
        assert!(record.borrow().potentially_all_set.is_some());
    }

    #[test]
    fn untracked_names_are_ignored() {
        let mut scope = function_scope();
        scope.mutated_upvalues.push("ghost".to_string());
        let tracker = ExternalRefs::new(&scope);
        let mut tables = CurrentTables::new();
        tracker.apply_call_markers(&mut tables, R::at_line(1));
        assert!(tables.get("ghost").is_none());
    }
}
