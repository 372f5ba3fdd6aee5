//! Warning output formatting.

mod json;
mod text;

pub use json::format_json;
pub use text::{format_text, FunctionResult};
