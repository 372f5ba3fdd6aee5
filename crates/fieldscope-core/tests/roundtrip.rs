//! Property tests for the three round-trip laws (spec-style §8): relations
//! that must hold for *any* table size, not just the handful of concrete
//! scenarios transcribed in `scenarios.rs`.

mod support;

use fieldscope_core::{
    analyze_function, EngineConfig, FieldKey, TableField, WarningCode,
};
use proptest::prelude::*;
use support::*;

fn undefined_reads_for(warnings: &[fieldscope_core::Warning], key: f64) -> usize {
    warnings
        .iter()
        .filter(|w| {
            w.code == WarningCode::UndefinedRead
                && w.name == "t"
                && matches!(w.field, FieldKey::Numeric(n) if n == key)
        })
        .count()
}

fn literal_of_length(len: usize) -> Vec<TableField> {
    (1..=len)
        .map(|i| TableField::Positional(num(i as f64, 1)))
        .collect()
}

proptest! {
    /// `table.insert(t, v)` followed by access at key `#t_before + 1` never
    /// produces W325 if the original `t` was precise.
    #[test]
    fn insert_then_read_appended_key_never_undefined(len in 0usize..6) {
        let next = (len + 1) as f64;
        let stmts = vec![
            local_one("t", table_literal(literal_of_length(len), 1)),
            Stmt::Eval(call(&["table", "insert"], vec![id("t"), num(99.0, 2)], 2)),
            Stmt::Eval(index(id("t"), num(next, 3), 3)),
        ];
        let report = analyze_function(&scope_with(stmts), &EngineConfig::default()).unwrap();
        prop_assert_eq!(undefined_reads_for(&report.warnings, next), 0);
    }

    /// `table.remove(t)` followed by access at key `#t_before` produces
    /// W325 iff `#t_before > 0` — the removed slot is re-nilled, and this
    /// analyzer treats a known-nil field as equivalent to undefined for
    /// read purposes, so a read of it after the shift always warns.
    #[test]
    fn remove_then_read_vacated_key_is_undefined(len in 1usize..6) {
        let last = len as f64;
        let stmts = vec![
            local_one("t", table_literal(literal_of_length(len), 1)),
            Stmt::Eval(call(&["table", "remove"], vec![id("t")], 2)),
            Stmt::Eval(index(id("t"), num(last, 3), 3)),
        ];
        let report = analyze_function(&scope_with(stmts), &EngineConfig::default()).unwrap();
        prop_assert_eq!(undefined_reads_for(&report.warnings, last), 1);
    }

    /// For precise `t`, `table.insert(t, i, v); table.remove(t, i)` leaves
    /// the observable key set unchanged: every pre-existing key still reads
    /// clean, and the round-tripped key reads exactly as undefined as it
    /// would have if the pair had never run.
    #[test]
    fn insert_remove_pair_is_observationally_a_no_op(len in 0usize..6) {
        let target = (len + 1) as f64;
        let mut stmts = vec![
            local_one("t", table_literal(literal_of_length(len), 1)),
            Stmt::Eval(call(
                &["table", "insert"],
                vec![id("t"), num(target, 2), num(99.0, 2)],
                2,
            )),
            Stmt::Eval(call(
                &["table", "remove"],
                vec![id("t"), num(target, 3)],
                3,
            )),
        ];
        for k in 1..=len {
            stmts.push(Stmt::Eval(index(id("t"), num(k as f64, 4), 4)));
        }
        stmts.push(Stmt::Eval(index(id("t"), num(target, 5), 5)));

        let report = analyze_function(&scope_with(stmts), &EngineConfig::default()).unwrap();

        for k in 1..=len {
            prop_assert_eq!(undefined_reads_for(&report.warnings, k as f64), 0);
        }
        prop_assert_eq!(undefined_reads_for(&report.warnings, target), 1);
    }
}
