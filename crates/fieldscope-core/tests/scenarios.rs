//! End-to-end scenarios exercised through `analyze_function`, built from
//! the per-statement fixtures in `support`. Each test names the field-level
//! story it is checking, not an internal invariant tag.

mod support;

use fieldscope_core::{
    analyze_function, ControlBlockType, EngineConfig, ExprKind, FieldKey, ItemKind, TableField,
    WarningCode,
};
use rstest::rstest;
use support::*;

fn warnings(stmts: Vec<Stmt>) -> Vec<fieldscope_core::Warning> {
    analyze_function(&scope_with(stmts), &EngineConfig::default())
        .expect("well-formed fixture")
        .warnings
}

#[test]
fn scenario_1_set_field_never_read() {
    // local x = {}; x.y = 1
    let stmts = vec![
        local_one("x", table_literal(vec![], 1)),
        set_one(index(id("x"), string("y"), 2), num(1.0, 2)),
    ];
    let w = warnings(stmts);
    assert_eq!(w.len(), 1);
    assert_eq!(w[0].code, WarningCode::UnusedSet);
    assert_eq!(w[0].field, FieldKey::Named("y".to_string()));
}

#[test]
fn scenario_2_set_and_undefined_read_combine() {
    // local x = {}; x[1] = x.z
    let stmts = vec![
        local_one("x", table_literal(vec![], 1)),
        Stmt::Set(
            vec![index(id("x"), num(1.0, 2), 2)],
            vec![index(id("x"), string("z"), 2)],
        ),
    ];
    let w = warnings(stmts);
    assert_eq!(w.len(), 2);
    let undefined = w.iter().find(|w| w.code == WarningCode::UndefinedRead).unwrap();
    assert_eq!(undefined.field, FieldKey::Named("z".to_string()));
    let unused = w.iter().find(|w| w.code == WarningCode::UnusedSet).unwrap();
    assert_eq!(unused.field, FieldKey::Numeric(1.0));
}

#[test]
fn scenario_3_remove_then_print_warns_only_last_slot() {
    // local x = {1, 2, 3}; table.remove(x); print(x[1], x[2], x[3])
    let stmts = vec![
        local_one(
            "x",
            table_literal(
                vec![
                    TableField::Positional(num(1.0, 1)),
                    TableField::Positional(num(2.0, 1)),
                    TableField::Positional(num(3.0, 1)),
                ],
                1,
            ),
        ),
        Stmt::Eval(call(&["table", "remove"], vec![id("x")], 2)),
        Stmt::Eval(call(
            &["print"],
            vec![
                index(id("x"), num(1.0, 3), 3),
                index(id("x"), num(2.0, 3), 3),
                index(id("x"), num(3.0, 3), 3),
            ],
            3,
        )),
    ];
    let w = warnings(stmts);
    assert_eq!(w.len(), 1);
    assert_eq!(w[0].code, WarningCode::UndefinedRead);
    assert_eq!(w[0].field, FieldKey::Numeric(3.0));
}

#[test]
fn scenario_4_remove_with_gap_warns_shifted_nils() {
    // local x = {1, 2, nil, 4}; table.remove(x, 2); print(x[1..4])
    let stmts = vec![
        local_one(
            "x",
            table_literal(
                vec![
                    TableField::Positional(num(1.0, 1)),
                    TableField::Positional(num(2.0, 1)),
                    TableField::Positional(nil(1)),
                    TableField::Positional(num(4.0, 1)),
                ],
                1,
            ),
        ),
        Stmt::Eval(call(&["table", "remove"], vec![id("x"), num(2.0, 2)], 2)),
        Stmt::Eval(call(
            &["print"],
            vec![
                index(id("x"), num(1.0, 3), 3),
                index(id("x"), num(2.0, 3), 3),
                index(id("x"), num(3.0, 3), 3),
                index(id("x"), num(4.0, 3), 3),
            ],
            3,
        )),
    ];
    let w = warnings(stmts);
    assert_eq!(w.len(), 2);
    assert!(w.iter().all(|w| w.code == WarningCode::UndefinedRead));
    let fields: Vec<_> = w.iter().map(|w| w.field.clone()).collect();
    assert!(fields.contains(&FieldKey::Numeric(2.0)));
    assert!(fields.contains(&FieldKey::Numeric(4.0)));
}

#[test]
fn scenario_5_reassignment_inside_branch_is_tolerated() {
    // local t = {1}; if cond then t = {1} end; print(table.concat(t))
    let stmts = vec![
        local_one("t", table_literal(vec![TableField::Positional(num(1.0, 1))], 1)),
        Stmt::If(
            id("cond"),
            vec![set_one(
                id("t"),
                table_literal(vec![TableField::Positional(num(1.0, 2))], 2),
            )],
            None,
        ),
        Stmt::Eval(call(&["table", "concat"], vec![id("t")], 3)),
    ];
    let w = warnings(stmts);
    assert!(w.is_empty(), "expected no warnings, got {w:?}");
}

#[test]
fn scenario_6_return_in_branch_hides_its_own_set() {
    // local t = {}; if a then t[1] = 1; return end; t[2] = 2
    let stmts = vec![
        local_one("t", table_literal(vec![], 1)),
        Stmt::If(
            id("a"),
            vec![
                set_one(index(id("t"), num(1.0, 2), 2), num(1.0, 2)),
                Stmt::Return,
            ],
            None,
        ),
        set_one(index(id("t"), num(2.0, 3), 3), num(2.0, 3)),
    ];
    let w = warnings(stmts);
    assert_eq!(w.len(), 1);
    assert_eq!(w[0].code, WarningCode::UnusedSet);
    assert_eq!(w[0].field, FieldKey::Numeric(2.0));
}

#[test]
fn scenario_7_redeclaration_flushes_both_initial_sets() {
    // local x = {1}; local x = {1}; print(x[2])
    let stmts = vec![
        local_one("x", table_literal(vec![TableField::Positional(num(1.0, 1))], 1)),
        local_one("x", table_literal(vec![TableField::Positional(num(1.0, 2))], 2)),
        Stmt::Eval(call(&["print"], vec![index(id("x"), num(2.0, 3), 3)], 3)),
    ];
    let w = warnings(stmts);
    assert_eq!(w.len(), 3);
    let unused: Vec<_> = w.iter().filter(|w| w.code == WarningCode::UnusedSet).collect();
    assert_eq!(unused.len(), 2);
    assert!(unused.iter().all(|w| w.field == FieldKey::Numeric(1.0)));
    let undefined: Vec<_> = w
        .iter()
        .filter(|w| w.code == WarningCode::UndefinedRead)
        .collect();
    assert_eq!(undefined.len(), 1);
    assert_eq!(undefined[0].field, FieldKey::Numeric(2.0));
}

#[test]
fn scenario_8_sort_on_an_index_is_an_access_not_a_model() {
    // local x = {1, 2, 3}; table.sort(x); print(x[1]); table.sort(x[2]); print(x[4])
    let stmts = vec![
        local_one(
            "x",
            table_literal(
                vec![
                    TableField::Positional(num(1.0, 1)),
                    TableField::Positional(num(2.0, 1)),
                    TableField::Positional(num(3.0, 1)),
                ],
                1,
            ),
        ),
        Stmt::Eval(call(&["table", "sort"], vec![id("x")], 2)),
        Stmt::Eval(call(&["print"], vec![index(id("x"), num(1.0, 3), 3)], 3)),
        Stmt::Eval(call(
            &["table", "sort"],
            vec![index(id("x"), num(2.0, 4), 4)],
            4,
        )),
        Stmt::Eval(call(&["print"], vec![index(id("x"), num(4.0, 5), 5)], 5)),
    ];
    let w = warnings(stmts);
    assert_eq!(w.len(), 2);
    let unused = w.iter().find(|w| w.code == WarningCode::UnusedSet).unwrap();
    assert_eq!(unused.field, FieldKey::Numeric(3.0));
    let undefined = w.iter().find(|w| w.code == WarningCode::UndefinedRead).unwrap();
    assert_eq!(undefined.field, FieldKey::Numeric(4.0));
}

#[rstest]
#[case(ControlBlockType::While)]
#[case(ControlBlockType::Fornum)]
#[case(ControlBlockType::Forin)]
#[case(ControlBlockType::Repeat)]
fn loop_external_tables_never_warn_undefined_read(#[case] kind: ControlBlockType) {
    // local t = {x = 1}; while cond do print(t.missing) end
    let stmts = vec![
        local_one(
            "t",
            table_literal(
                vec![TableField::Pair(string("x"), num(1.0, 1))],
                1,
            ),
        ),
        Stmt::Loop(
            kind,
            vec![Stmt::Eval(call(
                &["print"],
                vec![index(id("t"), string("missing"), 2)],
                2,
            ))],
        ),
    ];
    let w = warnings(stmts);
    assert!(
        w.iter().all(|w| w.code != WarningCode::UndefinedRead),
        "loop-external table access must never warn W325, got {w:?}"
    );
}

#[test]
fn goto_anywhere_suppresses_every_warning() {
    let stmts = vec![
        local_one("t", table_literal(vec![], 1)),
        set_one(index(id("t"), string("x"), 2), num(1.0, 2)),
        Stmt::Goto,
        Stmt::Eval(call(&["print"], vec![index(id("t"), string("missing"), 3)], 3)),
    ];
    let report = analyze_function(&scope_with(stmts), &EngineConfig::default()).unwrap();
    assert!(report.gave_up);
    assert!(report.warnings.is_empty());
}

#[test]
fn aliased_set_then_read_through_either_name_never_warns() {
    // local x = {}; local y = x; y.a = 1; print(x.a)
    let stmts = vec![
        local_one("x", table_literal(vec![], 1)),
        local_one("y", id("x")),
        set_one(index(id("y"), string("a"), 2), num(1.0, 2)),
        Stmt::Eval(call(&["print"], vec![index(id("x"), string("a"), 3)], 3)),
    ];
    let w = warnings(stmts);
    assert!(w.is_empty(), "aliased read must see the aliased set, got {w:?}");
}

#[test]
fn every_warning_range_lies_within_the_function_span() {
    let stmts = vec![
        local_one("x", table_literal(vec![], 1)),
        set_one(index(id("x"), string("y"), 5), num(1.0, 5)),
    ];
    let scope = scope_with(stmts);
    let report = analyze_function(&scope, &EngineConfig::default()).unwrap();
    for w in &report.warnings {
        assert!(w.range.line >= 1);
    }
}

#[test]
fn disabling_a_code_filters_it_from_the_report() {
    let stmts = vec![
        local_one("x", table_literal(vec![], 1)),
        set_one(index(id("x"), string("y"), 2), num(1.0, 2)),
    ];
    let mut config = EngineConfig::default();
    config.disabled_codes.push(WarningCode::UnusedSet);
    let report = analyze_function(&scope_with(stmts), &config).unwrap();
    assert!(report.warnings.is_empty());
}

/// Sanity check on the lowering helper itself: a no-else `if` must place
/// the `Cjump` target directly on the merge `Noop`, never on an
/// intermediate `Eval`.
#[test]
fn if_with_no_else_cjump_points_straight_at_merge() {
    let items = lower(vec![Stmt::If(id("cond"), vec![Stmt::Return], None)]);
    let cjump_to = items
        .iter()
        .find_map(|item| match &item.kind {
            ItemKind::Cjump { to } => Some(*to),
            _ => None,
        })
        .unwrap();
    match &items[cjump_to].kind {
        ItemKind::Noop { scope_end: true, .. } => {}
        other => panic!("expected the merge Noop, got {other:?}"),
    }
}

#[test]
fn table_field_value_is_tagged_by_kind() {
    // guards against accidentally treating a non-nil positional field as nil
    let expr = num(1.0, 1);
    assert!(!matches!(expr.kind, ExprKind::Nil));
}
