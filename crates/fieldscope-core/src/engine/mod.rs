//! The dataflow engine: table-field liveness tracking (spec §3-§4).
//!
//! Submodules map directly onto the spec's own decomposition — key
//! normalization, the abstract table record, expression walking/aliasing,
//! built-in function models, the external reference tracker, the scope &
//! branch engine, per-statement transfer, and finally the driver that ties
//! them together into one function-level pass.

pub mod builtins;
pub mod driver;
pub mod external_refs;
pub mod key;
pub mod scope;
pub mod table_state;
pub mod transfer;
pub mod walker;

pub use driver::{analyze_function, FunctionReport};
