//! FieldScope CLI - table-field liveness analyzer harness

mod cli;
mod input;
mod output;

use anyhow::Result;
use clap::Parser;
use fieldscope_core::{analyze_function, EngineConfig, WarningCode};
use output::{format_json, format_text, FunctionResult};
use std::process::ExitCode;

use cli::{Args, OutputFormat};

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(has_warnings) => {
            if args.strict && has_warnings {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("fieldscope: error: {e:#}");
            ExitCode::from(66)
        }
    }
}

fn run(args: &Args) -> Result<bool> {
    let functions = input::read_fixture(args.file.as_deref())?;

    let mut config = EngineConfig::default();
    if args.no_315 {
        config.disabled_codes.push(WarningCode::UnusedSet);
    }
    if args.no_325 {
        config.disabled_codes.push(WarningCode::UndefinedRead);
    }

    let mut reports = Vec::with_capacity(functions.len());
    for function in &functions {
        let report = analyze_function(&function.scope, &config)
            .map_err(|e| anyhow::anyhow!("{}: {e}", function.name))?;
        reports.push((function.name.as_str(), report));
    }

    let results: Vec<FunctionResult> = reports
        .iter()
        .map(|(name, report)| FunctionResult {
            name,
            warnings: &report.warnings,
            gave_up: report.gave_up,
        })
        .collect();

    let has_warnings = results.iter().any(|r| !r.warnings.is_empty());

    let output_str = match args.format {
        OutputFormat::Text => format_text(&results),
        OutputFormat::Json => format_json(&results, false),
    };

    if !output_str.is_empty() {
        print!("{output_str}");
        if !output_str.ends_with('\n') {
            println!();
        }
    }

    Ok(has_warnings)
}
