//! Shared fixture builders for the integration test suite: a tiny
//! statement AST plus a `lower()` pass that emits the `Item`/`Jump`/`Cjump`
//! sequence the engine's driver expects, so individual test files don't
//! have to hand-compute jump targets.

#![allow(dead_code)]

use fieldscope_core::{
    ControlBlockType, Expr, ExprKind, FunctionScope, Item, ItemKind, Range, TableField, VarBinding,
};

pub enum Stmt {
    Local(Vec<&'static str>, Vec<Expr>),
    Set(Vec<Expr>, Vec<Expr>),
    Eval(Expr),
    If(Expr, Vec<Stmt>, Option<Vec<Stmt>>),
    Loop(ControlBlockType, Vec<Stmt>),
    Return,
    Goto,
    Label,
}

pub fn id(name: &str) -> Expr {
    Expr::new(ExprKind::Id(VarBinding::new(name, 0)), Range::dummy())
}

pub fn num(n: f64, line: u32) -> Expr {
    Expr::new(ExprKind::Number(n), Range::at_line(line))
}

pub fn string(s: &str) -> Expr {
    Expr::new(ExprKind::String(s.to_string()), Range::dummy())
}

pub fn nil(line: u32) -> Expr {
    Expr::new(ExprKind::Nil, Range::at_line(line))
}

pub fn index(base: Expr, key: Expr, line: u32) -> Expr {
    Expr::new(
        ExprKind::Index {
            base: Box::new(base),
            key: Box::new(key),
        },
        Range::at_line(line),
    )
}

pub fn table_literal(fields: Vec<TableField>, line: u32) -> Expr {
    Expr::new(ExprKind::Table(fields), Range::at_line(line))
}

/// Builds a dotted-path callee (`table.remove`, `print`, ...) as nested
/// `Index`/`Id` nodes, then wraps it in a `Call`.
pub fn call(path: &[&str], args: Vec<Expr>, line: u32) -> Expr {
    let mut callee = id(path[0]);
    for segment in &path[1..] {
        callee = index(callee, string(segment), line);
    }
    Expr::new(
        ExprKind::Call {
            callee: Box::new(callee),
            args,
        },
        Range::at_line(line),
    )
}

pub fn local_one(name: &'static str, rhs: Expr) -> Stmt {
    Stmt::Local(vec![name], vec![rhs])
}

pub fn set_one(lhs: Expr, rhs: Expr) -> Stmt {
    Stmt::Set(vec![lhs], vec![rhs])
}

pub fn lower(stmts: Vec<Stmt>) -> Vec<Item> {
    let mut items = Vec::new();
    lower_into(stmts, &mut items);
    items
}

pub fn scope_with(stmts: Vec<Stmt>) -> FunctionScope {
    FunctionScope::new(lower(stmts), Range::dummy())
}

fn lower_into(stmts: Vec<Stmt>, items: &mut Vec<Item>) {
    for stmt in stmts {
        lower_stmt(stmt, items);
    }
}

fn lower_stmt(stmt: Stmt, items: &mut Vec<Item>) {
    match stmt {
        Stmt::Local(names, rhs) => {
            let lhs = names.into_iter().map(|n| VarBinding::new(n, 0)).collect();
            items.push(Item::new(ItemKind::Local { lhs, rhs }, Range::dummy()));
        }
        Stmt::Set(lhs, rhs) => {
            items.push(Item::new(ItemKind::Set { lhs, rhs }, Range::dummy()));
        }
        Stmt::Eval(expr) => {
            items.push(Item::new(ItemKind::Eval { expr }, Range::dummy()));
        }
        Stmt::Return => items.push(noop(ControlBlockType::Return, false, false)),
        Stmt::Goto => items.push(noop(ControlBlockType::Goto, false, false)),
        Stmt::Label => items.push(noop(ControlBlockType::Label, false, false)),
        Stmt::Loop(kind, body) => {
            items.push(noop(kind, false, false));
            lower_into(body, items);
            items.push(noop(kind, true, false));
        }
        Stmt::If(cond, then_body, else_body) => lower_if(cond, then_body, else_body, items),
    }
}

fn noop(control_block_type: ControlBlockType, scope_end: bool, is_else: bool) -> Item {
    Item::new(
        ItemKind::Noop {
            control_block_type,
            scope_end,
            is_else,
        },
        Range::dummy(),
    )
}

/// Single `if cond then ... [else ...] end`. `Cjump.to` is patched to point
/// directly at the merge `Noop` when there is no `else`, or at the `is_else`
/// `Noop` otherwise; both branch bodies end with an explicit `Jump` to the
/// merge point, per the convention the driver itself assumes.
fn lower_if(cond: Expr, then_body: Vec<Stmt>, else_body: Option<Vec<Stmt>>, items: &mut Vec<Item>) {
    items.push(Item::new(ItemKind::Eval { expr: cond }, Range::dummy()));
    let cjump_idx = items.len();
    items.push(Item::new(ItemKind::Cjump { to: 0 }, Range::dummy()));

    lower_into(then_body, items);
    let mut jump_positions = vec![items.len()];
    items.push(Item::new(ItemKind::Jump { to: 0 }, Range::dummy()));

    let cjump_target = items.len();
    if let Some(else_body) = else_body {
        items.push(noop(ControlBlockType::If, false, true));
        lower_into(else_body, items);
        jump_positions.push(items.len());
        items.push(Item::new(ItemKind::Jump { to: 0 }, Range::dummy()));
    }

    let merge_idx = items.len();
    items.push(noop(ControlBlockType::If, true, false));

    if let ItemKind::Cjump { to } = &mut items[cjump_idx].kind {
        *to = cjump_target;
    }
    for jp in jump_positions {
        if let ItemKind::Jump { to } = &mut items[jp].kind {
            *to = merge_idx;
        }
    }
}
