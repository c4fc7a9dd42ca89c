//! Command-line surface (spec §6).
//!
//! The five positional arguments are the externally observable contract
//! the spec mandates, but `significant`/`critical`/`print_threshold` are
//! optional here: when omitted, [`crate::config::resolve_thresholds`]
//! falls back to the `--config` TOML file (SPEC_FULL §A.3) so repeated
//! batch comparisons can share one tuning file instead of repeating
//! three positional numbers on every invocation. Everything else here
//! (`-v`/`--debug`/`--table`/`--format`/`--config`/`--min-points`) is the
//! ambient CLI stack a shippable build of this tool carries.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable structured summary on STDOUT (default).
    Text,
    /// `serde_json`-serialized `ComparisonReport` for automation.
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "precdiff")]
#[command(about = "Precision-aware numerical table comparator", long_about = None)]
#[command(version)]
pub struct Cli {
    /// First file to compare (the reference side).
    pub file_a: PathBuf,

    /// Second file to compare (the test side).
    pub file_b: PathBuf,

    /// Significance threshold. `0.0` activates SENSITIVE mode; a negative
    /// value activates PERCENT mode (`|value| / 100`). Falls back to the
    /// `--config` file if omitted; fatal at startup if neither supplies it.
    pub significant: Option<f64>,

    /// Hard upper bound; exceeding it flips the global failure flag. Falls
    /// back to the `--config` file if omitted; fatal at startup if neither
    /// supplies it.
    pub critical: Option<f64>,

    /// Minimum raw difference required to emit a table row. Falls back to
    /// the `--config` file, then `0.0`, if omitted.
    pub print_threshold: Option<f64>,

    /// Increase verbosity (repeatable: -v, -vv, -vvv). -v adds the
    /// rounded summary, -vv adds the significant summary and
    /// accumulation pattern, -vvv adds a per-line debug trace.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Force table-row emission regardless of `print_threshold`.
    #[arg(long)]
    pub debug: bool,

    /// Force table-row emission on, independent of verbosity.
    #[arg(long)]
    pub table: bool,

    /// Output format for the structured summary.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Optional TOML file supplying default thresholds and
    /// accumulation-analyzer tuning constants.
    #[arg(long, env = "PRECDIFF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the Accumulation Analyzer's minimum point count.
    #[arg(long)]
    pub min_points: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_required_positionals() {
        let cli = Cli::parse_from(["precdiff", "a.txt", "b.txt", "0.0", "9999.0", "0.0"]);
        assert_eq!(cli.file_a, PathBuf::from("a.txt"));
        assert_eq!(cli.significant, Some(0.0));
        assert_eq!(cli.critical, Some(9999.0));
    }

    #[test]
    fn threshold_positionals_are_optional() {
        let cli = Cli::parse_from(["precdiff", "a.txt", "b.txt"]);
        assert_eq!(cli.significant, None);
        assert_eq!(cli.critical, None);
        assert_eq!(cli.print_threshold, None);
    }

    #[test]
    fn verbosity_count_accumulates() {
        let cli = Cli::parse_from(["precdiff", "a.txt", "b.txt", "0.0", "9999.0", "0.0", "-vvv"]);
        assert_eq!(cli.verbosity, 3);
    }
}
