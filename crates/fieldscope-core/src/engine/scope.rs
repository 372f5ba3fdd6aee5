//! Scope & Branch Engine (spec §4.7).
//!
//! Owns the scope stack (`Do`/`Branch`/`Loop` frames, local-shadowing
//! bookkeeping) and the if/elseif/else merge algorithm. The driver pushes
//! and pops frames as it walks the item sequence; this module only
//! supplies the data structures and the pure merge computation — it has no
//! opinion on how the flat `Item` sequence is traversed.

use super::key::Key;
use super::table_state::{AccessEntry, CurrentTables, SetEntry, TableRecord};
use crate::warning::Warning;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
#[cfg(feature = "tracing")]
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeType {
    Root,
    Do,
    Branch,
    Loop,
}

/// A binding shadowed by a `Do`/`Branch`/`Loop` scope's own locals, kept so
/// the outer name can be restored to its prior record on scope exit.
#[derive(Debug, Clone)]
pub struct LocalBinding {
    pub name: String,
    pub shadowed_record: Option<Rc<RefCell<TableRecord>>>,
}

#[derive(Debug)]
pub struct Scope {
    pub scope_type: ScopeType,
    pub locals: Vec<LocalBinding>,
    pub definitely_returns: bool,
    /// The table state as of scope entry; `Loop` frames restore to this on
    /// exit (loop-local mutations never escape past the loop edge), and it
    /// is also the basis for "did this name's table originate outside the
    /// nearest enclosing loop" queries the built-in models consult.
    pub entry_tables: CurrentTables,
    /// Whole-variable reassignments deferred by `end_table_variable_silently`
    /// while this scope was open, carried out to `merge_branches` so it can
    /// decide, once every sibling branch's outcome is known, whether the
    /// prior set was genuinely dead.
    pub silently_evicted: Vec<(String, Key, SetEntry)>,
}

impl Scope {
    fn new(scope_type: ScopeType, entry_tables: CurrentTables) -> Self {
        Self {
            scope_type,
            locals: Vec::new(),
            definitely_returns: false,
            entry_tables,
            silently_evicted: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Scope>,
    /// Set once a `goto`/label pair is seen; per spec, once set the driver
    /// stops analyzing the remaining items in this function and emits
    /// nothing further (forward jumps make reasoning about field liveness
    /// unsound without real control-flow reconstruction).
    gave_up: bool,
}

impl ScopeStack {
    pub fn new(root_tables: &CurrentTables) -> Self {
        Self {
            frames: vec![Scope::new(ScopeType::Root, root_tables.deep_clone())],
            gave_up: false,
        }
    }

    pub fn push(&mut self, scope_type: ScopeType, current_tables: &CurrentTables) {
        self.frames.push(Scope::new(scope_type, current_tables.deep_clone()));
    }

    pub fn pop(&mut self) -> Scope {
        self.frames.pop().expect("scope stack underflow")
    }

    pub fn current(&mut self) -> &mut Scope {
        self.frames.last_mut().expect("scope stack is never empty")
    }

    pub fn mark_return(&mut self) {
        self.current().definitely_returns = true;
    }

    /// Records a whole-variable reassignment deferred by
    /// `end_table_variable_silently` against the current scope, a no-op if
    /// `entries` is empty (the reassigned name had other live aliases).
    pub fn record_silent_eviction(&mut self, name: &str, entries: Vec<(Key, SetEntry)>) {
        if entries.is_empty() {
            return;
        }
        let current = self.current();
        for (key, entry) in entries {
            current.silently_evicted.push((name.to_string(), key, entry));
        }
    }

    /// Forwards a just-popped scope's deferred reassignments to the new
    /// current scope — a `do...end` nested inside a branch closes before
    /// the branch itself does, and its deferred entries still belong to
    /// the enclosing branch's eventual merge.
    pub fn forward_silent_evictions(&mut self, entries: Vec<(String, Key, SetEntry)>) {
        if entries.is_empty() {
            return;
        }
        self.current().silently_evicted.extend(entries);
    }

    pub fn give_up(&mut self) {
        #[cfg(feature = "tracing")]
        debug!("goto/label encountered, abandoning analysis of the remaining function body");
        self.gave_up = true;
    }

    pub fn has_given_up(&self) -> bool {
        self.gave_up
    }

    /// Declares `name` as local to the current scope, shadowing any
    /// existing binding in `tables` for the scope's lifetime.
    pub fn declare_local(&mut self, tables: &mut CurrentTables, name: &str) {
        let shadowed = tables.shadow(name);
        self.current().locals.push(LocalBinding {
            name: name.to_string(),
            shadowed_record: shadowed,
        });
    }

    /// Restores every local this scope shadowed, and flushes any table
    /// whose last alias just went out of scope. Called when a `Do`/`Branch`
    /// scope closes normally (not via loop restore, which discards instead).
    pub fn end_scope_locals(tables: &mut CurrentTables, scope: &Scope) -> Vec<crate::warning::Warning> {
        let mut warnings = Vec::new();
        for local in scope.locals.iter().rev() {
            warnings.extend(tables.end_table_variable(&local.name));
            if let Some(record) = &local.shadowed_record {
                tables.unshadow(&local.name, record.clone());
            }
        }
        warnings
    }

    /// True if the nearest enclosing `Branch` scope (climbing transparently
    /// through `Do` frames) already had `key` set on `name` at branch
    /// entry — the outer-branch-overwrite exemption from the W315 policy:
    /// overwriting a value an enclosing scope already committed is a
    /// legitimate conditional override, not dead code.
    pub fn outer_branch_had_key(&self, name: &str, key: &Key) -> bool {
        for scope in self.frames.iter().rev() {
            match scope.scope_type {
                ScopeType::Branch => {
                    return scope.entry_tables.get(name).is_some_and(|record| {
                        let rec = record.borrow();
                        rec.set_keys.contains_key(key) || rec.maybe_set_keys.contains_key(key)
                    });
                }
                ScopeType::Do => continue,
                ScopeType::Loop | ScopeType::Root => return false,
            }
        }
        false
    }

    /// True if the nearest enclosing `Branch` scope (climbing transparently
    /// through `Do` frames) already had `name` tracked as a table at branch
    /// entry, regardless of which fields — the whole-variable analogue of
    /// `outer_branch_had_key`, consulted when a plain `Id` reassignment
    /// inside a branch overwrites a table that existed before the branch.
    pub fn outer_branch_had_table(&self, name: &str) -> bool {
        for scope in self.frames.iter().rev() {
            match scope.scope_type {
                ScopeType::Branch => return scope.entry_tables.get(name).is_some(),
                ScopeType::Do => continue,
                ScopeType::Loop | ScopeType::Root => return false,
            }
        }
        false
    }

    /// True if `name`'s table was already tracked before the nearest
    /// enclosing `Loop` scope was entered — built-in models fall back to
    /// their imprecise path for such tables, since a loop body may run zero
    /// or many times and this engine does not fix-point iterate loop
    /// bodies.
    pub fn originated_outside_current_loop(&self, name: &str) -> bool {
        for scope in self.frames.iter().rev() {
            if scope.scope_type == ScopeType::Loop {
                return scope.entry_tables.get(name).is_some();
            }
        }
        false
    }
}

/// One branch's outcome, ready for `merge_branches`.
pub struct MergeParticipant {
    pub tables: CurrentTables,
    pub definitely_returns: bool,
    pub silently_evicted: Vec<(String, Key, SetEntry)>,
}

/// spec §4.7's post-merge step: a whole-variable reassignment deferred by
/// `end_table_variable_silently` becomes a real W315 only once every live
/// branch is known to have discarded the same key — a branch that left the
/// table alive may still read or rely on it, so requiring unanimity keeps
/// this within the engine's existing false-negative bias rather than
/// risking a false positive.
fn post_merge_reassignment_warnings(live: &[&MergeParticipant]) -> Vec<Warning> {
    let Some((first, rest)) = live.split_first() else {
        return Vec::new();
    };
    let mut warnings = Vec::new();
    let mut seen: HashSet<(&str, &Key)> = HashSet::new();
    for (name, key, entry) in &first.silently_evicted {
        if !seen.insert((name.as_str(), key)) {
            continue;
        }
        let evicted_everywhere = rest.iter().all(|p| {
            p.silently_evicted
                .iter()
                .any(|(n, k, _)| n == name && k == key)
        });
        if evicted_everywhere {
            warnings.push(Warning::unused_set(
                entry.owning_name.clone(),
                key.to_field_key(),
                entry.value_is_nil,
                entry.range,
            ));
        }
    }
    warnings
}

/// spec §4.7's if/elseif/else merge. Returns whether every participant
/// (including the implicit "no branch taken" path when there is no
/// `else`) definitely returns, so the caller can propagate that into the
/// enclosing scope.
pub fn merge_branches(
    tables: &mut CurrentTables,
    mut participants: Vec<MergeParticipant>,
    has_else: bool,
    warnings: &mut Vec<Warning>,
) -> bool {
    if !has_else {
        participants.push(MergeParticipant {
            tables: tables.deep_clone(),
            definitely_returns: false,
            silently_evicted: Vec::new(),
        });
    }

    let all_return = participants.iter().all(|p| p.definitely_returns);
    let live_participants: Vec<&MergeParticipant> =
        participants.iter().filter(|p| !p.definitely_returns).collect();

    if live_participants.is_empty() {
        return true;
    }

    warnings.extend(post_merge_reassignment_warnings(&live_participants));

    let live: Vec<&CurrentTables> = live_participants.iter().map(|p| &p.tables).collect();

    let all_names: HashSet<String> = live.iter().flat_map(|t| t.names().cloned()).collect();

    let mut groups: HashMap<Vec<usize>, Vec<String>> = HashMap::new();
    for name in &all_names {
        let ptrs: Option<Vec<usize>> = live
            .iter()
            .map(|t| t.get(name).map(|r| Rc::as_ptr(&r) as usize))
            .collect();
        if let Some(ptrs) = ptrs {
            groups.entry(ptrs).or_default().push(name.clone());
        }
        // A name missing from even one live branch can't be reasoned about
        // uniformly at the merge point and is simply dropped (equivalent
        // to a wipe).
    }

    let mut merged = CurrentTables::new();
    for names_in_group in groups.into_values() {
        let records: Vec<Rc<RefCell<TableRecord>>> = live
            .iter()
            .map(|t| t.get(&names_in_group[0]).expect("grouped by presence"))
            .collect();

        let alias_sets: Vec<HashSet<String>> =
            records.iter().map(|r| r.borrow().aliases.clone()).collect();
        if alias_sets.windows(2).any(|w| w[0] != w[1]) {
            continue; // alias identity diverged across branches: drop, don't guess
        }

        let merged_record = merge_records(&records);
        for name in names_in_group {
            merged.adopt(&name, merged_record.clone());
        }
    }

    *tables = merged;
    all_return
}

fn merge_records(records: &[Rc<RefCell<TableRecord>>]) -> Rc<RefCell<TableRecord>> {
    let borrowed: Vec<_> = records.iter().map(|r| r.borrow()).collect();
    let n = borrowed.len();

    let mut all_keys: HashSet<Key> = HashSet::new();
    for b in &borrowed {
        all_keys.extend(b.set_keys.keys().cloned());
        all_keys.extend(b.maybe_set_keys.keys().cloned());
    }

    let mut set_keys = HashMap::new();
    let mut maybe_set_keys = HashMap::new();
    for key in all_keys {
        let mut entries: Vec<&SetEntry> = Vec::new();
        let mut definite_count = 0;
        for b in &borrowed {
            if let Some(e) = b.set_keys.get(&key) {
                entries.push(e);
                definite_count += 1;
            } else if let Some(e) = b.maybe_set_keys.get(&key) {
                entries.push(e);
            }
        }
        let representative = entries
            .iter()
            .max_by_key(|e| e.range.line)
            .expect("key came from at least one participant");
        let entry = SetEntry {
            owning_name: representative.owning_name.clone(),
            range: representative.range,
            value_is_nil: entries.iter().any(|e| e.value_is_nil),
        };
        if definite_count == n {
            set_keys.insert(key, entry);
        } else {
            #[cfg(feature = "tracing")]
            trace!(?key, "key set on only some branches, demoting to maybe_set_keys");
            maybe_set_keys.insert(key, entry);
        }
    }

    let mut accessed_keys: HashMap<Key, AccessEntry> = HashMap::new();
    for b in &borrowed {
        for (key, entry) in &b.accessed_keys {
            accessed_keys
                .entry(key.clone())
                .and_modify(|existing| {
                    if entry.range.line > existing.range.line {
                        *existing = entry.clone();
                    }
                })
                .or_insert_with(|| entry.clone());
        }
    }

    let potentially_all_set = borrowed
        .iter()
        .filter_map(|b| b.potentially_all_set)
        .max_by_key(|r| r.line);
    let potentially_all_accessed = borrowed
        .iter()
        .filter_map(|b| b.potentially_all_accessed)
        .max_by_key(|r| r.line);
    let aliases = borrowed[0].aliases.clone();
    let shadowed_aliases = borrowed
        .iter()
        .flat_map(|b| b.shadowed_aliases.iter().cloned())
        .collect();

    drop(borrowed);
    Rc::new(RefCell::new(TableRecord {
        set_keys,
        maybe_set_keys,
        accessed_keys,
        potentially_all_set,
        potentially_all_accessed,
        aliases,
        shadowed_aliases,
    }))
}
