//! Human-readable text output formatting.

use fieldscope_core::{Warning, WarningCode};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use std::fmt::Write as _;

/// One function's analysis outcome, paired with the name it was run under.
pub struct FunctionResult<'a> {
    pub name: &'a str,
    pub warnings: &'a [Warning],
    pub gave_up: bool,
}

/// Formats a batch of per-function results as colored (if the terminal
/// supports it), human-readable text.
pub fn format_text(results: &[FunctionResult<'_>]) -> String {
    let colored = std::io::stdout().is_terminal();
    let mut out = String::new();

    for result in results {
        if result.gave_up {
            writeln!(
                out,
                "{}: goto/label present, analysis abandoned",
                style_name(result.name, colored)
            )
            .unwrap();
            continue;
        }
        if result.warnings.is_empty() {
            continue;
        }
        for warning in result.warnings {
            writeln!(out, "{}", format_warning(result.name, warning, colored)).unwrap();
        }
    }

    out
}

fn style_name(name: &str, colored: bool) -> String {
    if colored {
        name.bold().to_string()
    } else {
        name.to_string()
    }
}

fn format_warning(function: &str, warning: &Warning, colored: bool) -> String {
    let code = format!("W{}", warning.code.as_str());
    let code = if colored {
        match warning.code {
            WarningCode::UnusedSet => code.yellow().to_string(),
            WarningCode::UndefinedRead => code.red().to_string(),
        }
    } else {
        code
    };

    let message = match warning.code {
        WarningCode::UnusedSet => format!(
            "field `{}` of `{}` is set but never read",
            warning.field, warning.name
        ),
        WarningCode::UndefinedRead => format!(
            "field `{}` of `{}` is read without ever being set",
            warning.field, warning.name
        ),
    };

    format!(
        "{}:{}:{}: {} {}",
        function, warning.range.line, warning.range.column, code, message
    )
}
