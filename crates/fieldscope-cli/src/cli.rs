//! CLI argument parsing using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// FieldScope - table-field liveness analyzer
#[derive(Parser, Debug)]
#[command(name = "fieldscope")]
#[command(about = "Run the W315/W325 table-field analyzer over a pre-built item-tree fixture", long_about = None)]
#[command(version)]
pub struct Args {
    /// JSON fixture file to analyze (reads from stdin if omitted)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text", value_enum)]
    pub format: OutputFormat,

    /// Suppress W315 (unused set)
    #[arg(long)]
    pub no_315: bool,

    /// Suppress W325 (undefined read)
    #[arg(long)]
    pub no_325: bool,

    /// Exit with a nonzero status if any warning was emitted
    #[arg(short, long)]
    pub strict: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text, one warning per line
    Text,
    /// JSON array of warnings per function
    Json,
}
