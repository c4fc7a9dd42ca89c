//! precdiff CLI entry point.
//!
//! Resolves thresholds from CLI flags / `--config` file / built-in
//! defaults, runs the comparison, prints the structured summary, and
//! chooses the process exit code per spec §6.

use anyhow::{Context, Result};
use clap::Parser;
use precdiff::accumulation::AccumulationConfig;
use precdiff::cli::{Cli, OutputFormat};
use precdiff::config::{resolve_accumulation_config, resolve_thresholds, CliThresholds, FileConfig};
use precdiff::error::CompareError;
use precdiff::observability::{init_tracing, install_panic_hook};
use precdiff::orchestrator::compare_files;
use precdiff::report::{render_table, render_text, resolve_color_override};
use std::process::ExitCode;

fn main() -> ExitCode {
    install_panic_hook();
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("precdiff: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => Some(
            FileConfig::load(path)
                .with_context(|| format!("loading config file {}", path.display()))?,
        ),
        None => None,
    };

    let thresholds = resolve_thresholds(
        CliThresholds {
            significant: cli.significant,
            critical: cli.critical,
            print_threshold: cli.print_threshold,
            min_points: cli.min_points,
        },
        file_config.as_ref(),
    )
    .context("resolving comparison thresholds")?;
    let accumulation_config: AccumulationConfig =
        resolve_accumulation_config(cli.min_points, file_config.as_ref());

    let force_all_rows = cli.debug || cli.table;

    let outcome = match compare_files(
        &cli.file_a,
        &cli.file_b,
        thresholds,
        accumulation_config,
        thresholds.print,
        force_all_rows,
    ) {
        Ok(outcome) => outcome,
        Err(err @ CompareError::FileAccess { .. }) => {
            eprintln!("precdiff: {err}");
            return Ok(ExitCode::from(2));
        }
        Err(err) => return Err(err.into()),
    };

    for (line, column) in dedup_parse_errors(&outcome.parse_errors) {
        eprintln!("precdiff: malformed input at line {line}, column {column}");
    }

    match cli.format {
        OutputFormat::Text => {
            resolve_color_override();
            print!("{}", render_text(&outcome.report, cli.verbosity));
            if !outcome.rows.is_empty() {
                println!("{}", render_table(&outcome.rows));
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                outcome
                    .report
                    .to_json()
                    .context("serializing comparison report to JSON")?
            );
        }
    }

    Ok(ExitCode::from(u8::try_from(outcome.report.verdict.exit_code()).unwrap_or(1)))
}

/// Deduplicate (line, column) malformed-input diagnostics so a large table
/// with one bad column doesn't spam STDERR once per row (SPEC_FULL §B).
fn dedup_parse_errors(errors: &[CompareError]) -> Vec<(u64, usize)> {
    let mut seen = std::collections::BTreeSet::new();
    let mut out = Vec::new();
    for err in errors {
        let key = match err {
            CompareError::MalformedNumber { line, column } => Some((*line, *column)),
            CompareError::MalformedComplex { line, column } => Some((*line, *column)),
            _ => None,
        };
        if let Some(key) = key {
            if seen.insert(key) {
                out.push(key);
            }
        }
    }
    out
}
