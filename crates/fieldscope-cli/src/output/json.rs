//! JSON output formatting.

use fieldscope_core::Warning;
use serde::Serialize;

#[derive(Serialize)]
struct FunctionReportJson<'a> {
    name: &'a str,
    #[serde(rename = "gaveUp")]
    gave_up: bool,
    warnings: &'a [Warning],
}

/// Formats a batch of per-function results as a JSON array, one object per
/// function analyzed.
pub fn format_json(results: &[super::text::FunctionResult<'_>], compact: bool) -> String {
    let reports: Vec<FunctionReportJson> = results
        .iter()
        .map(|r| FunctionReportJson {
            name: r.name,
            gave_up: r.gave_up,
            warnings: r.warnings,
        })
        .collect();

    if compact {
        serde_json::to_string(&reports).expect("serialization cannot fail")
    } else {
        serde_json::to_string_pretty(&reports).expect("serialization cannot fail")
    }
}
