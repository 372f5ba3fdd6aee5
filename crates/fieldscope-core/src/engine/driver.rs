//! Driver (spec §2 item 8): runs one `FunctionScope` through the engine.
//!
//! A `FunctionAnalyzer` exists only for the lifetime of a single
//! `analyze_function` call: it owns the table-state map, the scope stack,
//! and the external reference tracker, and walks the item sequence once,
//! dispatching `Local`/`Set`/`Eval` to `engine::transfer` and recursing
//! into `If`/loop/`Do` constructs itself. Control-flow recursion mirrors
//! the source language's own nesting — `Jump`/`Cjump` targets are trusted
//! as authoritative (they are attached by the same collaborator that
//! produced the item sequence), not re-derived by scanning.

use super::external_refs::ExternalRefs;
use super::scope::{merge_branches, MergeParticipant, ScopeStack, ScopeType};
use super::table_state::CurrentTables;
use super::transfer;
use crate::ast::{ControlBlockType, FunctionScope, Item, ItemKind};
use crate::config::EngineConfig;
use crate::error::AnalyzerError;
use crate::warning::{sort_warnings, Warning};

#[derive(Debug, Clone)]
pub struct FunctionReport {
    pub warnings: Vec<Warning>,
    /// True if a `goto`/label pair was encountered and the remainder of
    /// the function was never analyzed.
    pub gave_up: bool,
}

/// Analyzes one function body and returns its W315/W325 diagnostics,
/// already filtered by `config` and sorted into the sink's total order.
pub fn analyze_function(
    scope: &FunctionScope,
    config: &EngineConfig,
) -> Result<FunctionReport, AnalyzerError> {
    if !config.enabled {
        return Ok(FunctionReport {
            warnings: Vec::new(),
            gave_up: false,
        });
    }

    let items = &scope.items;
    let mut tables = CurrentTables::new();
    let mut scopes = ScopeStack::new(&tables);
    let mut external_refs = ExternalRefs::new(scope);
    let mut warnings = Vec::new();

    run_sequence(items, 0, &mut tables, &mut scopes, &mut external_refs, &mut warnings)?;

    if scopes.has_given_up() {
        // A `goto` makes the linear liveness story unsound: an earlier
        // "unused"/"undefined" conclusion might be invalidated by a jump
        // this engine never modeled. Emit nothing rather than risk a
        // false positive.
        return Ok(FunctionReport {
            warnings: Vec::new(),
            gave_up: true,
        });
    }

    let root_scope = scopes.pop();
    warnings.extend(ScopeStack::end_scope_locals(&mut tables, &root_scope));
    warnings.extend(tables.flush_all());
    sort_warnings(&mut warnings);
    warnings.retain(|w| config.is_code_enabled(w.code));
    Ok(FunctionReport {
        warnings,
        gave_up: false,
    })
}

/// Runs items from `start` until it hits a bare `Jump` (returns its
/// target — control belongs to the caller, e.g. an enclosing branch/loop
/// runner) or falls off the end of `items`.
fn run_sequence(
    items: &[Item],
    mut pc: usize,
    tables: &mut CurrentTables,
    scopes: &mut ScopeStack,
    external_refs: &mut ExternalRefs,
    warnings: &mut Vec<Warning>,
) -> Result<usize, AnalyzerError> {
    loop {
        if scopes.has_given_up() {
            return Ok(items.len());
        }
        if pc >= items.len() {
            return Ok(pc);
        }

        let item = &items[pc];
        external_refs.fold_item(item);

        match &item.kind {
            ItemKind::Jump { to } => return Ok(*to),
            ItemKind::Cjump { .. } => {
                pc = run_if_chain(items, pc, tables, scopes, external_refs, warnings)?;
            }
            ItemKind::Noop {
                control_block_type,
                scope_end: true,
                ..
            } => {
                if control_block_type.is_loop() {
                    return Ok(pc);
                }
                pop_and_merge_simple_scope(tables, scopes, warnings);
                pc += 1;
            }
            ItemKind::Noop {
                control_block_type,
                scope_end: false,
                ..
            } => match control_block_type {
                ControlBlockType::Do => {
                    scopes.push(ScopeType::Do, tables);
                    pc += 1;
                }
                ControlBlockType::While
                | ControlBlockType::Fornum
                | ControlBlockType::Forin
                | ControlBlockType::Repeat => {
                    pc = run_loop(items, pc, tables, scopes, external_refs, warnings)?;
                }
                ControlBlockType::Label => {
                    pc += 1;
                }
                ControlBlockType::Goto => {
                    scopes.give_up();
                    pc += 1;
                }
                ControlBlockType::Return => {
                    scopes.mark_return();
                    pc += 1;
                }
                ControlBlockType::If => {
                    // Never produced without a preceding `Cjump`, which
                    // handles `If` entirely; treat as an inert marker.
                    pc += 1;
                }
            },
            ItemKind::Local { .. } | ItemKind::Set { .. } | ItemKind::Eval { .. } => {
                let produced = transfer::run_item(&item.kind, item.range, tables, scopes, external_refs);
                warnings.extend(produced);
                pc += 1;
            }
        }
    }
}

fn pop_and_merge_simple_scope(
    tables: &mut CurrentTables,
    scopes: &mut ScopeStack,
    warnings: &mut Vec<Warning>,
) {
    let scope = scopes.pop();
    warnings.extend(ScopeStack::end_scope_locals(tables, &scope));
    if scope.definitely_returns {
        scopes.mark_return();
    }
    scopes.forward_silent_evictions(scope.silently_evicted);
}

/// Runs one `if`/`elseif`/`else` chain starting at the first `Cjump`,
/// returning the position right after its merge point.
fn run_if_chain(
    items: &[Item],
    cjump_pos: usize,
    tables: &mut CurrentTables,
    scopes: &mut ScopeStack,
    external_refs: &mut ExternalRefs,
    warnings: &mut Vec<Warning>,
) -> Result<usize, AnalyzerError> {
    let mut participants = Vec::new();
    let mut has_else = false;
    let mut next = cjump_pos;

    let merge_pos = loop {
        if next >= items.len() {
            return Err(AnalyzerError::DanglingJumpTarget {
                index: cjump_pos,
                to: next,
                len: items.len(),
            });
        }
        match &items[next].kind {
            ItemKind::Cjump { to } => {
                let to = *to;
                scopes.push(ScopeType::Branch, tables);
                let mut branch_tables = tables.deep_clone();
                run_sequence(items, next + 1, &mut branch_tables, scopes, external_refs, warnings)?;
                let scope = scopes.pop();
                participants.push(MergeParticipant {
                    tables: branch_tables,
                    definitely_returns: scope.definitely_returns,
                    silently_evicted: scope.silently_evicted,
                });
                next = to;
            }
            ItemKind::Noop {
                is_else: true,
                scope_end: false,
                ..
            } => {
                has_else = true;
                scopes.push(ScopeType::Branch, tables);
                let mut branch_tables = tables.deep_clone();
                let after =
                    run_sequence(items, next + 1, &mut branch_tables, scopes, external_refs, warnings)?;
                let scope = scopes.pop();
                participants.push(MergeParticipant {
                    tables: branch_tables,
                    definitely_returns: scope.definitely_returns,
                    silently_evicted: scope.silently_evicted,
                });
                next = after;
            }
            _ => break next,
        }
    };

    let all_return = merge_branches(tables, participants, has_else, warnings);
    if all_return {
        scopes.mark_return();
    }
    Ok(merge_pos + 1)
}

/// Runs a loop body exactly once against a scratch clone of the tables;
/// whatever it concludes is discarded on exit — this engine never
/// fix-point iterates, so nothing a loop body does to table state is
/// assumed to hold after it (or before its first iteration, for that
/// matter). Warnings produced by the single pass are real regardless.
fn run_loop(
    items: &[Item],
    noop_pos: usize,
    tables: &mut CurrentTables,
    scopes: &mut ScopeStack,
    external_refs: &mut ExternalRefs,
    warnings: &mut Vec<Warning>,
) -> Result<usize, AnalyzerError> {
    scopes.push(ScopeType::Loop, tables);
    let mut body_tables = tables.deep_clone();
    body_tables.mark_all_loop_external(items[noop_pos].range);
    let scope_end_pos =
        run_sequence(items, noop_pos + 1, &mut body_tables, scopes, external_refs, warnings)?;
    let scope = scopes.pop();
    warnings.extend(ScopeStack::end_scope_locals(&mut body_tables, &scope));
    Ok(scope_end_pos + 1)
}
