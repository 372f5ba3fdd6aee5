//! Error type for malformed input.
//!
//! Warnings ([`crate::warning::Warning`]) are the engine's normal,
//! user-facing output and are always accumulated in a `Vec`, never
//! returned as an `Err`. This type is reserved for the "programmer error
//! in the collaborator" case `spec.md` calls out: missing bindings,
//! unknown tags, mismatched `scope_end` — situations that indicate the
//! pre-built item sequence violates its own contract and must not be
//! silently absorbed.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AnalyzerError {
    #[error("item {index} has a jump target {to} outside the item sequence (len = {len})")]
    DanglingJumpTarget { index: usize, to: usize, len: usize },

    #[error("item {index} is a Noop with scope_end=true but no matching scope is open")]
    MismatchedScopeEnd { index: usize },

    #[error("merge at item {index} found no pending branch scopes to merge")]
    EmptyMergeSlot { index: usize },

    #[error("scope stack underflow while processing item {index}")]
    ScopeStackUnderflow { index: usize },
}
