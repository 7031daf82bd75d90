//! Argument definitions for `formctl`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "formctl",
    version,
    about = "Inspect form catalogs and convert answer documents",
    long_about = "Load a form catalog (manifest, page schemas and mapping tables),\n\
                  import YAML answer documents, export answer maps back to YAML\n\
                  and report per-page completion."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Include timestamps in log lines.
    #[arg(long = "log-timestamps", global = true)]
    pub log_timestamps: bool,

    /// Allow answer values in trace logs. They may contain personal data.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import a YAML document and print the resulting answer map as JSON.
    Import(ImportArgs),

    /// Export a JSON answer map as a YAML document.
    Export(ExportArgs),

    /// Report answered / applicable counts per page for a document.
    Progress(ProgressArgs),

    /// Check a catalog's manifest, pins, schemas and mappings.
    Verify(CatalogArgs),
}

#[derive(Parser)]
pub struct CatalogArgs {
    /// Directory containing `manifest.toml`.
    #[arg(value_name = "CATALOG")]
    pub catalog: PathBuf,
}

#[derive(Parser)]
pub struct ImportArgs {
    #[arg(value_name = "CATALOG")]
    pub catalog: PathBuf,

    /// YAML answer document.
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Write the answer map here instead of stdout.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ProgressArgs {
    #[arg(value_name = "CATALOG")]
    pub catalog: PathBuf,

    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Print the report as JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct ExportArgs {
    #[arg(value_name = "CATALOG")]
    pub catalog: PathBuf,

    /// JSON object of field identifier to value.
    #[arg(value_name = "ANSWERS")]
    pub answers: PathBuf,

    /// Write the YAML document here instead of stdout.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
