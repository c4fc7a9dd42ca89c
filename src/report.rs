//! Reporter (C8) — spec §4.8.
//!
//! Builds the three nested summaries (diff-like, rounded, significant) from
//! the Orchestrator's owned state, renders them as a colored STDOUT summary
//! or a `serde_json`-serialized [`ComparisonReport`], and optionally prints
//! a `comfy-table` of per-element rows gated by `print_threshold`/`--debug`/
//! `--table`.

use std::env;
use std::io::IsTerminal;

use chrono::Utc;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::{Deserialize, Serialize};

use crate::accumulation::AccumulationMetrics;
use crate::metrics::TlMetricsSummary;
use crate::types::{CountStats, DiffStats, Flags, RMSEStats, UnitMismatch, Verdict};

/// Exact matches, non-zero count, and the largest raw difference seen.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DiffLikeSummary {
    pub elem_number: u64,
    pub exact_matches: u64,
    pub non_zero: u64,
    pub max_non_zero: f64,
    pub max_non_zero_dp: i32,
}

/// Trivial/non-trivial split after sub-LSB absorption (LEVEL 1-2).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RoundedSummary {
    pub trivial: u64,
    pub non_trivial: u64,
    pub max_non_trivial: f64,
    pub max_non_trivial_dp: i32,
    pub max_percent_error: f64,
    pub max_percent_error_dp: i32,
}

/// Counts for LEVEL 3-6 plus RMSE, curve metrics, and the accumulation
/// pattern when enough range-indexed points were observed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignificantSummary {
    pub insignificant: u64,
    pub significant: u64,
    pub marginal: u64,
    pub critical: u64,
    pub error: u64,
    pub non_error: u64,
    pub printed: u64,
    pub high_ignore: u64,
    pub max_significant: f64,
    pub max_significant_dp: i32,
    pub rmse_all: f64,
    pub rmse_data: f64,
    pub weighted_rmse: f64,
    pub tl_metrics: Option<TlMetricsSummary>,
    pub accumulation: Option<AccumulationMetrics>,
}

/// Structural pre-scan outcome (C3), carried through for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureSummary {
    pub structures_compatible: bool,
    pub column1_is_range_data: bool,
    pub unit_mismatch: Option<UnitMismatch>,
}

/// The three derived overall verdicts the Reporter exposes to callers and
/// tests (spec §2), computed as the walk's evidence pulls each down from
/// its optimistic starting value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedVerdicts {
    /// No element differed at all, byte-for-byte after parsing.
    pub files_are_same: bool,
    /// Every difference rounded away to nothing (no non-trivial diffs).
    pub files_have_same_values: bool,
    /// No element was ever classified significant.
    pub files_are_close_enough: bool,
}

/// The full structured summary this program produces, and the
/// `--format json` wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// RFC3339 timestamp of when this report was built, for CI systems
    /// that archive JSON reports across runs.
    pub generated_at: String,
    pub verdict: Verdict,
    pub diff_like: DiffLikeSummary,
    pub rounded: RoundedSummary,
    pub significant: SignificantSummary,
    pub structure: StructureSummary,
    pub verdicts: DerivedVerdicts,
}

impl ComparisonReport {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        verdict: Verdict,
        counts: &CountStats,
        diffs: &DiffStats,
        flags: &Flags,
        rmse: &RMSEStats,
        tl_metrics: Option<TlMetricsSummary>,
        accumulation: Option<AccumulationMetrics>,
    ) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            verdict,
            diff_like: DiffLikeSummary {
                elem_number: counts.elem_number,
                exact_matches: counts.elem_number.saturating_sub(counts.diff_non_zero),
                non_zero: counts.diff_non_zero,
                max_non_zero: diffs.max_non_zero,
                max_non_zero_dp: diffs.max_non_zero_dp,
            },
            rounded: RoundedSummary {
                trivial: counts.diff_trivial,
                non_trivial: counts.diff_non_trivial,
                max_non_trivial: diffs.max_non_trivial,
                max_non_trivial_dp: diffs.max_non_trivial_dp,
                max_percent_error: diffs.max_percent_error,
                max_percent_error_dp: diffs.max_percent_error_dp,
            },
            significant: SignificantSummary {
                insignificant: counts.diff_insignificant,
                significant: counts.diff_significant,
                marginal: counts.diff_marginal,
                critical: counts.diff_critical,
                error: counts.diff_error,
                non_error: counts.diff_non_error,
                printed: counts.diff_print,
                high_ignore: counts.diff_high_ignore,
                max_significant: diffs.max_significant,
                max_significant_dp: diffs.max_significant_dp,
                rmse_all: rmse.rmse_all(),
                rmse_data: rmse.rmse_data(),
                weighted_rmse: rmse.weighted_rmse(),
                tl_metrics,
                accumulation,
            },
            structure: StructureSummary {
                structures_compatible: flags.structures_compatible,
                column1_is_range_data: flags.column1_is_range_data,
                unit_mismatch: flags.unit_mismatch,
            },
            verdicts: DerivedVerdicts {
                files_are_same: flags.files_are_same,
                files_have_same_values: flags.files_have_same_values,
                files_are_close_enough: flags.files_are_close_enough,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One element-level disagreement, kept only when it clears
/// `print_threshold` (or `--debug`/`--table` forces every element through).
#[derive(Debug, Clone, Copy)]
pub struct TableRow {
    pub line: u64,
    pub column: usize,
    pub v1: f64,
    pub v2: f64,
    pub raw_diff: f64,
    pub rounded_diff: f64,
    pub percent_error: f64,
    pub significant: bool,
    pub critical: bool,
}

/// Whether colored/plain output should be used, resolved once at startup
/// the same way the teacher's `FormattingConfig::from_env` does: `NO_COLOR`
/// wins outright, otherwise fall back to TTY auto-detection.
pub fn resolve_color_override() {
    if env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
        return;
    }
    if let Ok(val) = env::var("CLICOLOR_FORCE") {
        if val == "1" {
            colored::control::set_override(true);
            return;
        }
    }
    colored::control::set_override(std::io::stdout().is_terminal());
}

fn verdict_line(verdict: Verdict) -> String {
    match verdict {
        Verdict::Pass => "[PASS] files are equivalent".green().to_string(),
        Verdict::PassWithWarning => "[WARN] files pass with warnings".yellow().to_string(),
        Verdict::Fail => "[FAIL] files differ beyond tolerance".red().to_string(),
        Verdict::FileAccessError => "[ERROR] a file could not be read".red().bold().to_string(),
    }
}

/// Render the human-readable summary, gated by verbosity per the tiers
/// documented on [`crate::cli::Cli::verbosity`].
pub fn render_text(report: &ComparisonReport, verbosity: u8) -> String {
    let mut out = String::new();
    out.push_str(&verdict_line(report.verdict));
    out.push('\n');

    let d = &report.diff_like;
    out.push_str(&format!(
        "elements: {}  exact: {}  non-zero: {}  max non-zero: {:.*}\n",
        d.elem_number, d.exact_matches, d.non_zero, d.max_non_zero_dp.max(0) as usize, d.max_non_zero
    ));

    if !report.structure.structures_compatible {
        out.push_str("structure: INCOMPATIBLE column layouts between files\n");
    }
    if let Some(u) = &report.structure.unit_mismatch {
        out.push_str(&format!(
            "unit mismatch suspected from line {}: median ratio {:.3}\n",
            u.first_line, u.median_ratio
        ));
    }

    if verbosity >= 1 {
        let r = &report.rounded;
        out.push_str(&format!(
            "trivial: {}  non-trivial: {}  max rounded: {:.*}  max %err: {:.4}\n",
            r.trivial, r.non_trivial, r.max_non_trivial_dp.max(0) as usize, r.max_non_trivial,
            r.max_percent_error
        ));
    }

    if verbosity >= 2 {
        let s = &report.significant;
        out.push_str(&format!(
            "insignificant: {}  significant: {}  marginal: {}  critical: {}  error: {}\n",
            s.insignificant, s.significant, s.marginal, s.critical, s.error
        ));
        out.push_str(&format!(
            "rmse(all): {:.6}  rmse(data): {:.6}  rmse(weighted): {:.6}\n",
            s.rmse_all, s.rmse_data, s.weighted_rmse
        ));
        if let Some(tl) = &s.tl_metrics {
            out.push_str(&format!(
                "M1: {:.4}  M2: {:.4}  M3: {:.4}  M_curve: {:.4}\n",
                tl.m1_weighted_rmse, tl.m2_tail_mean_abs_diff, tl.m3_pearson_correlation, tl.m_curve
            ));
        }
        if let Some(acc) = &s.accumulation {
            out.push_str(&format!("accumulation pattern: {:?}\n", acc.pattern));
        }
        let v = &report.verdicts;
        out.push_str(&format!(
            "same: {}  same-values: {}  close-enough: {}\n",
            v.files_are_same, v.files_have_same_values, v.files_are_close_enough
        ));
    }

    out
}

/// Build a `comfy-table` of the rows collected during the walk. Callers
/// decide whether to print it at all (spec: `--debug`/`--table` force every
/// row through regardless of `print_threshold`, which otherwise already
/// filtered the rows reaching this function).
pub fn render_table(rows: &[TableRow]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "line", "col", "v1", "v2", "raw diff", "rounded", "%err", "flag",
        ]);

    for row in rows {
        let flag = if row.critical {
            "CRIT".red().to_string()
        } else if row.significant {
            "sig".yellow().to_string()
        } else {
            "".to_string()
        };
        table.add_row(vec![
            Cell::new(row.line),
            Cell::new(row.column),
            Cell::new(format!("{:.6}", row.v1)),
            Cell::new(format!("{:.6}", row.v2)),
            Cell::new(format!("{:.6}", row.raw_diff)),
            Cell::new(format!("{:.6}", row.rounded_diff)),
            Cell::new(format!("{:.4}", row.percent_error)),
            Cell::new(flag),
        ]);
    }

    table
}
