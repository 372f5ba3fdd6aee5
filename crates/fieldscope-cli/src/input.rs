//! Input handling for the fixture JSON file, or stdin.

use anyhow::{Context, Result};
use fieldscope_core::FunctionScope;
use serde::Deserialize;
use std::io::{self, Read as _};
use std::path::Path;

/// One named function body in a fixture file.
#[derive(Debug, Deserialize)]
pub struct NamedFunction {
    pub name: String,
    pub scope: FunctionScope,
}

/// A fixture file's top-level shape: either a single anonymous function, or
/// a named batch (so one file can exercise several functions in one run).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Fixture {
    Batch { functions: Vec<NamedFunction> },
    Single(FunctionScope),
}

/// Reads a fixture from `path`, or from stdin when `path` is `None`.
pub fn read_fixture(path: Option<&Path>) -> Result<Vec<NamedFunction>> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read fixture from stdin")?;
            buf
        }
    };

    let fixture: Fixture =
        serde_json::from_str(&content).context("Failed to parse fixture JSON")?;

    Ok(match fixture {
        Fixture::Batch { functions } => functions,
        Fixture::Single(scope) => vec![NamedFunction {
            name: "<anonymous>".to_string(),
            scope,
        }],
    })
}
