//! `formctl`: form catalog and answer document tool.

use std::fs;
use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use form_cli::commands::{run_export, run_import, run_progress, run_verify};
use form_cli::logging::{LogConfig, LogFormat, init_logging};
use tracing::level_filters::LevelFilter;

mod cli;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::summary::{print_catalog_summary, print_diagnostics, print_groups, print_progress};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(cli.command) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Import(args) => {
            let report = run_import(&args.catalog, &args.document)?;
            let json =
                serde_json::to_string_pretty(&report.answers).context("serialize answers")?;
            match &args.output {
                Some(path) => {
                    fs::write(path, json)
                        .with_context(|| format!("write answers {}", path.display()))?;
                    println!("Answers: {}", path.display());
                    print_groups(&report.groups);
                }
                None => println!("{json}"),
            }
            print_diagnostics(&report.diagnostics);
        }
        Command::Export(args) => {
            let report = run_export(&args.catalog, &args.answers)?;
            match &args.output {
                Some(path) => {
                    fs::write(path, &report.yaml)
                        .with_context(|| format!("write document {}", path.display()))?;
                    println!("Document: {} ({} pages)", path.display(), report.pages);
                }
                None => print!("{}", report.yaml),
            }
            print_diagnostics(&report.diagnostics);
        }
        Command::Progress(args) => {
            let report = run_progress(&args.catalog, &args.document)?;
            if args.json {
                let json = serde_json::to_string_pretty(&report).context("serialize report")?;
                println!("{json}");
            } else {
                print_progress(&report);
            }
            print_diagnostics(&report.diagnostics);
        }
        Command::Verify(args) => {
            let summary = run_verify(&args.catalog)?;
            print_catalog_summary(&summary);
        }
    }
    Ok(())
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_timestamps = cli.log_timestamps;
    config.log_data = cli.log_data;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
