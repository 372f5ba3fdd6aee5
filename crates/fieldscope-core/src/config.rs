//! Engine-level configuration.
//!
//! This is distinct from the project/file configuration `spec.md` excludes
//! from scope (a `.luacheckrc`-style file is a CLI/front-end concern); this
//! is the analyzer's own master switch and per-code toggles, analogous to
//! a linter's rule-enable set.

use crate::warning::WarningCode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Controls which warning codes the engine emits. By default both are
/// enabled.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Master toggle for the whole engine (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Warning codes to suppress (e.g. `["325"]`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_codes: Vec<WarningCode>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled_codes: Vec::new(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

impl EngineConfig {
    pub fn is_code_enabled(&self, code: WarningCode) -> bool {
        self.enabled && !self.disabled_codes.contains(&code)
    }
}
