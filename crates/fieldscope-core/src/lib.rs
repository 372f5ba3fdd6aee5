//! Dataflow engine that detects two table-field bug classes in a single
//! function body: a field set but never subsequently read (W315), and a
//! field read without ever being definitely set (W325).
//!
//! The engine consumes a [`FunctionScope`] — an already lexed, parsed, and
//! control-flow-lowered description of one function — and is otherwise
//! self-contained: it owns no parser and performs no I/O. See
//! [`engine::analyze_function`] for the entry point.

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod warning;

pub use ast::{
    ControlBlockType, Expr, ExprKind, FunctionScope, Item, ItemKind, NestedFunctionRefs, Range,
    TableField, VarBinding,
};
pub use config::EngineConfig;
pub use engine::{analyze_function, FunctionReport};
pub use error::AnalyzerError;
pub use warning::{sort_warnings, FieldKey, Warning, WarningCode};
