//! Table State (spec §3, §4.2): the per-tracked-table abstract record and
//! its pure transitions, plus `CurrentTables`, the name → record map that
//! owns the records (spec §9's "record is the owning entity" design note).

use super::key::{Key, NormalizedKey};
use crate::ast::Range;
use crate::warning::Warning;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
#[cfg(feature = "tracing")]
use tracing::trace;

/// A single `set_keys`/`maybe_set_keys` entry.
#[derive(Debug, Clone)]
pub struct SetEntry {
    /// The alias name in use when the set happened.
    pub owning_name: String,
    pub range: Range,
    pub value_is_nil: bool,
}

#[derive(Debug, Clone)]
pub struct AccessEntry {
    pub range: Range,
}

/// The abstract state tracked for one local variable whose value is a
/// table literal created in the current function.
#[derive(Debug, Clone, Default)]
pub struct TableRecord {
    pub set_keys: HashMap<Key, SetEntry>,
    pub maybe_set_keys: HashMap<Key, SetEntry>,
    pub accessed_keys: HashMap<Key, AccessEntry>,
    pub potentially_all_set: Option<Range>,
    pub potentially_all_accessed: Option<Range>,
    pub aliases: HashSet<String>,
    pub shadowed_aliases: HashSet<String>,
}

impl TableRecord {
    fn new(owner: &str) -> Self {
        let mut record = Self::default();
        record.aliases.insert(owner.to_string());
        record
    }

    /// True if an access (specific or `potentially_all_accessed`) for
    /// `key` is recorded at or after `set_line` — the dominating-access
    /// half of the W315 suppression policy.
    fn access_dominates(&self, key: &Key, set_line: u32) -> bool {
        if let Some(access) = self.accessed_keys.get(key) {
            if access.range.line >= set_line {
                return true;
            }
        }
        if let Some(all) = &self.potentially_all_accessed {
            if all.line >= set_line {
                return true;
            }
        }
        false
    }

    fn make_w315(&self, key: &Key, entry: &SetEntry) -> Warning {
        Warning::unused_set(
            entry.owning_name.clone(),
            key.to_field_key(),
            entry.value_is_nil,
            entry.range,
        )
    }

    /// spec §4.2 `set_key`. `suppress_outer_branch_overwrite` lets the
    /// scope engine veto the warning when the entry being evicted came
    /// from an enclosing branching scope (overwrites across branches are
    /// legitimate); table state itself has no notion of the scope stack.
    pub fn set_key(
        &mut self,
        owner: &str,
        normalized: NormalizedKey,
        key_range: Range,
        value_is_nil: bool,
        in_init: bool,
        suppress_outer_branch_overwrite: impl FnOnce(&Key, Range) -> bool,
    ) -> Option<Warning> {
        let key = match normalized {
            NormalizedKey::Variable => {
                if !value_is_nil {
                    self.potentially_all_set = Some(key_range);
                }
                return None;
            }
            NormalizedKey::Constant(key) => key,
        };

        if in_init && value_is_nil {
            return None;
        }

        let prior = self
            .set_keys
            .remove(&key)
            .map(|entry| (entry, !in_init))
            .or_else(|| self.maybe_set_keys.remove(&key).map(|entry| (entry, true)));

        let warning = prior.and_then(|(entry, warn_if_live)| {
            if !warn_if_live {
                return None;
            }
            if self.access_dominates(&key, entry.range.line)
                || suppress_outer_branch_overwrite(&key, entry.range)
            {
                None
            } else {
                Some(self.make_w315(&key, &entry))
            }
        });

        self.accessed_keys.remove(&key);
        self.set_keys.insert(
            key,
            SetEntry {
                owning_name: owner.to_string(),
                range: key_range,
                value_is_nil,
            },
        );
        warning
    }

    /// Records a silent access — bookkeeping for a built-in model's internal
    /// read (e.g. `table.remove`'s implicit read of the removed slot), not a
    /// user-authored access, so it never produces a W325 itself.
    pub fn mark_accessed(&mut self, key: Key, range: Range) {
        self.accessed_keys.insert(key, AccessEntry { range });
    }

    pub fn mark_all_accessed(&mut self, range: Range) {
        self.potentially_all_accessed = Some(range);
    }

    pub fn mark_all_set(&mut self, range: Range) {
        self.potentially_all_set = Some(range);
    }

    fn has_any_non_nil_set(&self) -> bool {
        self.set_keys.values().any(|e| !e.value_is_nil)
            || self.maybe_set_keys.values().any(|e| !e.value_is_nil)
    }

    /// spec §4.2 `access_key`.
    pub fn access_key(
        &mut self,
        accessor: &str,
        normalized: NormalizedKey,
        range: Range,
    ) -> Option<Warning> {
        match normalized {
            NormalizedKey::Variable => {
                let warning = if !self.has_any_non_nil_set() && self.potentially_all_set.is_none()
                {
                    Some(Warning::undefined_read(
                        accessor,
                        crate::warning::FieldKey::Named("?".to_string()),
                        range,
                    ))
                } else {
                    None
                };
                self.potentially_all_accessed = Some(range);
                warning
            }
            NormalizedKey::Constant(key) => {
                let never_set = !self.set_keys.contains_key(&key)
                    && !self.maybe_set_keys.contains_key(&key)
                    && self.potentially_all_set.is_none();

                let nil_without_later_all_set = self
                    .set_keys
                    .get(&key)
                    .filter(|entry| entry.value_is_nil)
                    .map(|entry| {
                        let all_set_follows = self
                            .potentially_all_set
                            .as_ref()
                            .is_some_and(|r| r.line >= entry.range.line);
                        !all_set_follows
                    })
                    .unwrap_or(false);

                let warning = if never_set || nil_without_later_all_set {
                    Some(Warning::undefined_read(
                        accessor,
                        key.to_field_key(),
                        range,
                    ))
                } else {
                    None
                };

                self.accessed_keys.insert(key, AccessEntry { range });
                warning
            }
        }
    }

    /// Flushes remaining `set_keys`/`maybe_set_keys` through the W315
    /// policy (dominating-access suppression only — there is no enclosing
    /// branch to consult at end-of-lifetime).
    pub fn flush(&mut self) -> Vec<Warning> {
        let accessed_keys = std::mem::take(&mut self.accessed_keys);
        let potentially_all_accessed = self.potentially_all_accessed;
        let mut warnings = Vec::new();
        for (key, entry) in self.set_keys.drain().chain(self.maybe_set_keys.drain()) {
            if !dominates(&key, &entry, &accessed_keys, &potentially_all_accessed) {
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
}

fn dominates(
    key: &Key,
    entry: &SetEntry,
    accessed_keys: &HashMap<Key, AccessEntry>,
    potentially_all_accessed: &Option<Range>,
) -> bool {
    if let Some(access) = accessed_keys.get(key) {
        if access.range.line >= entry.range.line {
            return true;
        }
    }
    potentially_all_accessed
        .as_ref()
        .is_some_and(|r| r.line >= entry.range.line)
}

/// The name → record map for one in-progress scope. Records are owned
/// here (spec §9); aliasing is expressed by multiple names pointing at
/// the same `Rc<RefCell<TableRecord>>`.
#[derive(Debug, Clone, Default)]
pub struct CurrentTables {
    by_name: HashMap<String, Rc<RefCell<TableRecord>>>,
}

impl CurrentTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Rc<RefCell<TableRecord>>> {
        self.by_name.get(name).cloned()
    }

    pub fn create(&mut self, name: &str) -> Rc<RefCell<TableRecord>> {
        let record = Rc::new(RefCell::new(TableRecord::new(name)));
        self.by_name.insert(name.to_string(), record.clone());
        record
    }

    /// Adds `new_name` as an alias of an existing record.
    pub fn alias(&mut self, new_name: &str, record: Rc<RefCell<TableRecord>>) {
        record.borrow_mut().aliases.insert(new_name.to_string());
        self.by_name.insert(new_name.to_string(), record);
    }

    /// spec §4.2 `end_table_variable`.
    pub fn end_table_variable(&mut self, name: &str) -> Vec<Warning> {
        let Some(record) = self.by_name.remove(name) else {
            return Vec::new();
        };
        let mut rec = record.borrow_mut();
        rec.aliases.remove(name);
        if rec.aliases.is_empty() && rec.shadowed_aliases.is_empty() {
            rec.flush()
        } else {
            Vec::new()
        }
    }

    /// Like `end_table_variable` but never flushes immediately, even if
    /// this was the last alias — used when a whole-variable reassignment
    /// happens inside a branch whose enclosing scope already tracked the
    /// same name before branch entry: the eviction decision is deferred to
    /// the branch merge (the same overwrite-across-branches policy
    /// `set_key` already applies to individual fields, extended to
    /// whole-record reassignment). Returns the discarded `set_keys`/
    /// `maybe_set_keys` entries so the merge step can decide, once every
    /// branch's outcome is known, whether the prior set was genuinely dead.
    pub fn end_table_variable_silently(&mut self, name: &str) -> Vec<(Key, SetEntry)> {
        let Some(record) = self.by_name.remove(name) else {
            return Vec::new();
        };
        let mut rec = record.borrow_mut();
        rec.aliases.remove(name);
        if rec.aliases.is_empty() && rec.shadowed_aliases.is_empty() {
            rec.set_keys.drain().chain(rec.maybe_set_keys.drain()).collect()
        } else {
            Vec::new()
        }
    }

    /// spec §4.2 `wipe`.
    pub fn wipe(&mut self, name: &str) {
        if let Some(record) = self.by_name.remove(name) {
            #[cfg(feature = "tracing")]
            trace!(table = name, "table escaped tracked scope, wiping all aliases");
            let alias_names: Vec<String> = record.borrow().aliases.iter().cloned().collect();
            for alias in alias_names {
                self.by_name.remove(&alias);
            }
        }
    }

    /// Shadows `name`: removes it from the current map (and the owning
    /// record's `aliases`) while remembering the record so the name can
    /// be restored on scope exit.
    pub fn shadow(&mut self, name: &str) -> Option<Rc<RefCell<TableRecord>>> {
        let record = self.by_name.remove(name)?;
        {
            let mut rec = record.borrow_mut();
            rec.aliases.remove(name);
            rec.shadowed_aliases.insert(name.to_string());
        }
        Some(record)
    }

    /// Restores a previously shadowed binding.
    pub fn unshadow(&mut self, name: &str, record: Rc<RefCell<TableRecord>>) {
        record.borrow_mut().shadowed_aliases.remove(name);
        record.borrow_mut().aliases.insert(name.to_string());
        self.by_name.insert(name.to_string(), record);
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.by_name.keys()
    }

    /// Binds `name` directly to `record`, bypassing alias bookkeeping —
    /// used by the merge algorithm, which builds its own correctly-shared
    /// records up front.
    pub fn adopt(&mut self, name: &str, record: Rc<RefCell<TableRecord>>) {
        self.by_name.insert(name.to_string(), record);
    }

    /// Deep-clones the map: every distinct record is cloned once (shared
    /// aliases stay aliases of each other in the clone), so the two maps
    /// can diverge independently — required for branch/loop scope saves.
    pub fn deep_clone(&self) -> Self {
        let mut seen: HashMap<*const RefCell<TableRecord>, Rc<RefCell<TableRecord>>> =
            HashMap::new();
        let mut by_name = HashMap::new();
        for (name, record) in &self.by_name {
            let ptr = Rc::as_ptr(record);
            let cloned = seen
                .entry(ptr)
                .or_insert_with(|| Rc::new(RefCell::new(record.borrow().clone())))
                .clone();
            by_name.insert(name.clone(), cloned);
        }
        Self { by_name }
    }

    /// Marks every currently tracked record imprecise on both axes — used
    /// on loop entry for the tables a loop body inherits from the
    /// enclosing scope (spec: "loop tables never produce W325"). A single
    /// pass over a loop body can't tell which iteration a plain field read
    /// lines up with relative to a set elsewhere in the body, so every
    /// loop-external table is treated the same way the built-in models
    /// already treat one once `loop_external` is true.
    pub fn mark_all_loop_external(&mut self, range: Range) {
        let mut marked: HashSet<*const RefCell<TableRecord>> = HashSet::new();
        for record in self.by_name.values() {
            let ptr = Rc::as_ptr(record);
            if marked.insert(ptr) {
                let mut rec = record.borrow_mut();
                rec.mark_all_set(range);
                rec.mark_all_accessed(range);
            }
        }
    }

    /// Flushes every remaining record's lifetime without respecting
    /// shared-alias bookkeeping — used at function exit, where nothing
    /// outlives the call.
    pub fn flush_all(&mut self) -> Vec<Warning> {
        let mut warnings = Vec::new();
        let mut flushed: HashSet<*const RefCell<TableRecord>> = HashSet::new();
        for record in self.by_name.values() {
            let ptr = Rc::as_ptr(record);
            if flushed.insert(ptr) {
                warnings.extend(record.borrow_mut().flush());
            }
        }
        self.by_name.clear();
        warnings
    }
}
