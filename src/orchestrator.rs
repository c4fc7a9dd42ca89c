//! Orchestrator (C9) — spec §4.9.
//!
//! Owns every counter, flag, and analyzer-local buffer; walks both files
//! in lockstep through C1-C7 and derives a verdict solely from state it
//! owns. Nothing outside this module mutates `CountStats`/`DiffStats`/
//! `Flags`/`RMSEStats` once the walk starts.

use crate::accumulation::{self, AccumulationConfig, ErrorAccumulationData};
use crate::diff_analyzer::process_element;
use crate::error::CompareError;
use crate::format_tracker::FormatTracker;
use crate::metrics::{accumulate_rmse, TlMetrics};
use crate::observability::{set_line, set_phase, AnalysisPhase};
use crate::parser::parse_line;
use crate::reader::LineReader;
use crate::report::{ComparisonReport, TableRow};
use crate::structure::analyze_structure;
use crate::types::{ColumnValues, CountStats, DiffStats, Flags, RMSEStats, Thresholds, Verdict};
use std::path::Path;
use tracing::{debug, error, info, trace, warn};

/// All state the walk mutates, bundled so every analyzer call takes one
/// scoped, exclusive borrow instead of half a dozen separate ones.
#[derive(Debug, Default)]
struct Accumulators {
    counts: CountStats,
    diffs: DiffStats,
    flags: Flags,
    rmse: RMSEStats,
    tl_metrics: TlMetrics,
    accumulation_data: ErrorAccumulationData,
    format_tracker: FormatTracker,
    /// Whether the one-shot critical-threshold diagnostic has already
    /// fired (spec §4.5/§6: only the first such event reaches STDERR).
    first_critical_reported: bool,
}

impl Accumulators {
    fn new() -> Self {
        Self {
            flags: Flags::new(),
            ..Default::default()
        }
    }
}

/// Tuning knobs resolved once at startup (spec SPEC_FULL §A.3) and held
/// for the duration of one comparison.
#[derive(Debug, Clone, Copy)]
pub struct Orchestrator {
    pub thresholds: Thresholds,
    pub accumulation_config: AccumulationConfig,
    /// Minimum raw difference required to emit a table row.
    pub print_threshold: f64,
    /// `--debug`/`--table`: force every element through regardless of
    /// `print_threshold`.
    pub force_all_rows: bool,
}

/// Everything the CLI shell needs after one comparison: the structured
/// report and the (possibly empty) set of rows for the table renderer,
/// plus any malformed-input diagnostics for the STDERR summary.
pub struct CompareOutcome {
    pub report: ComparisonReport,
    pub rows: Vec<TableRow>,
    pub parse_errors: Vec<CompareError>,
}

impl Orchestrator {
    pub fn new(
        thresholds: Thresholds,
        accumulation_config: AccumulationConfig,
        print_threshold: f64,
        force_all_rows: bool,
    ) -> Self {
        Self {
            thresholds,
            accumulation_config,
            print_threshold,
            force_all_rows,
        }
    }

    pub fn run(&self, file_a: &Path, file_b: &Path) -> Result<CompareOutcome, CompareError> {
        let _phase = set_phase(AnalysisPhase::Startup);
        info!(file_a = %file_a.display(), file_b = %file_b.display(), "starting comparison");
        let reader = LineReader::open(file_a, file_b)?;

        let _phase = set_phase(AnalysisPhase::StructureScan);
        let structure = analyze_structure(reader.lines_a(), reader.lines_b());
        info!(
            structures_compatible = structure.structures_compatible,
            column1_is_range_data = structure.column1_is_range_data,
            "structure scan complete"
        );
        if !structure.structures_compatible {
            warn!("column structures differ between files");
        }
        if let Some(mismatch) = structure.unit_mismatch {
            warn!(
                first_line = mismatch.first_line,
                median_ratio = mismatch.median_ratio,
                "suspected unit mismatch between files"
            );
        }

        let mut acc = Accumulators::new();
        acc.flags.structures_compatible = structure.structures_compatible;
        acc.flags.column1_is_range_data = structure.column1_is_range_data;
        acc.flags.unit_mismatch = structure.unit_mismatch;

        let mut parse_errors = Vec::new();
        let mut rows = Vec::new();

        let _phase = set_phase(AnalysisPhase::ElementWalk);
        debug!("element walk started");
        for paired in reader.iter_paired() {
            set_line(paired.line_no);
            acc.counts.line_number = paired.line_no;

            let line_a = paired.a.unwrap_or_default();
            let line_b = paired.b.unwrap_or_default();
            if line_a.trim().is_empty() && line_b.trim().is_empty() {
                continue;
            }

            let (record_a, errors_a) = parse_line(&line_a, paired.line_no);
            let (record_b, errors_b) = parse_line(&line_b, paired.line_no);
            if !errors_a.is_empty() || !errors_b.is_empty() {
                acc.flags.error_found = true;
                error!(line = paired.line_no, "malformed input encountered");
                parse_errors.extend(errors_a);
                parse_errors.extend(errors_b);
            }

            let columns = record_a.len().min(record_b.len());
            let range = record_a
                .cells
                .first()
                .filter(|c| !c.is_malformed())
                .map(|c| c.value)
                .unwrap_or(0.0);

            let min_dps: Vec<i32> = (0..columns)
                .map(|i| {
                    let a = record_a.cells[i];
                    let b = record_b.cells[i];
                    if a.is_malformed() || b.is_malformed() {
                        i32::MAX
                    } else {
                        a.decimals.min(b.decimals)
                    }
                })
                .collect();
            let update = acc.format_tracker.observe_line(&min_dps, columns);
            if update.new_fmt && !acc.flags.new_fmt {
                warn!(line = paired.line_no, "new decimal-places format detected");
            }
            acc.flags.new_fmt = acc.flags.new_fmt || update.new_fmt;

            for col in 0..columns {
                let a = record_a.cells[col];
                let b = record_b.cells[col];
                if a.is_malformed() || b.is_malformed() {
                    continue;
                }

                let cv = ColumnValues::new(a.value, b.value, range, a.decimals, b.decimals);
                let outcome = process_element(
                    cv,
                    col,
                    &self.thresholds,
                    structure.column1_is_range_data,
                    &mut acc.counts,
                    &mut acc.diffs,
                    &mut acc.flags,
                );
                trace!(
                    line = paired.line_no,
                    col,
                    raw_diff = outcome.raw_diff,
                    significant = outcome.significant,
                    critical = outcome.critical,
                    "element compared"
                );
                if outcome.critical && !acc.first_critical_reported {
                    acc.first_critical_reported = true;
                    error!(
                        line = paired.line_no,
                        col,
                        raw_diff = outcome.raw_diff,
                        "critical threshold exceeded"
                    );
                }

                if col >= 1 {
                    accumulate_rmse(
                        &mut acc.rmse,
                        col,
                        outcome.raw_diff,
                        structure.column1_is_range_data,
                        a.value,
                        b.value,
                    );
                }

                if structure.column1_is_range_data && col == 1 {
                    acc.tl_metrics.observe(range, a.value, b.value);
                    acc.accumulation_data.push(
                        range,
                        a.value - b.value,
                        a.value,
                        b.value,
                        outcome.significant,
                    );
                }

                let clears_print_threshold =
                    self.force_all_rows || outcome.raw_diff >= self.print_threshold;
                if clears_print_threshold {
                    acc.counts.diff_print += 1;
                    acc.flags.has_printed_diff = true;
                    rows.push(TableRow {
                        line: paired.line_no,
                        column: col,
                        v1: a.value,
                        v2: b.value,
                        raw_diff: outcome.raw_diff,
                        rounded_diff: outcome.rounded_diff,
                        percent_error: outcome.percent_error,
                        significant: outcome.significant,
                        critical: outcome.critical,
                    });
                }
            }
        }

        let tail = reader.tail_residual();
        if tail.is_hard_incompatible() {
            acc.flags.structures_compatible = false;
            acc.flags.files_are_same = false;
        }
        acc.flags.file_end_reached = true;
        debug!(elements = acc.counts.elem_number, "element walk complete");

        let _phase = set_phase(AnalysisPhase::AccumulationFinalize);
        let tl_summary = acc.tl_metrics.finalize(&acc.rmse);
        let accumulation_summary = if acc.accumulation_data.is_empty() {
            None
        } else {
            let summary = accumulation::finalize(&acc.accumulation_data, &self.accumulation_config);
            info!(pattern = ?summary.pattern, slope = summary.slope, p_value = summary.p_value, "accumulation analysis complete");
            Some(summary)
        };

        let _phase = set_phase(AnalysisPhase::Reporting);
        let verdict = decide_verdict(&acc.counts, &acc.flags);
        info!(?verdict, "comparison finished");
        let report = ComparisonReport::build(
            verdict,
            &acc.counts,
            &acc.diffs,
            &acc.flags,
            &acc.rmse,
            tl_summary,
            accumulation_summary,
        );

        Ok(CompareOutcome {
            report,
            rows,
            parse_errors,
        })
    }
}

/// Verdict rules, checked in order (spec §4.8). `error_found` is folded in
/// right after the critical check: the spec's error-handling design (§7)
/// states a malformed token "raises `error_found` so the verdict cannot
/// pass", which the five-step summary in §4.8 doesn't spell out as its
/// own numbered rule but is required by §7's text.
fn decide_verdict(counts: &CountStats, flags: &Flags) -> Verdict {
    if flags.file_access_error {
        return Verdict::FileAccessError;
    }
    if !flags.structures_compatible {
        return Verdict::Fail;
    }
    if flags.has_critical_diff {
        return Verdict::Fail;
    }
    if flags.error_found {
        return Verdict::Fail;
    }

    let non_marginal_significant = counts
        .diff_significant
        .saturating_sub(counts.diff_marginal);
    if counts.elem_number > 0 {
        let fraction = non_marginal_significant as f64 / counts.elem_number as f64;
        if fraction > 0.02 {
            return Verdict::Fail;
        }
        if fraction > 0.0 {
            return Verdict::PassWithWarning;
        }
    }
    if flags.has_marginal_diff || flags.new_fmt {
        return Verdict::PassWithWarning;
    }
    Verdict::Pass
}

/// Library entry point: compare two files with the given thresholds and
/// return the full outcome. The CLI shell (`main.rs`) resolves
/// [`Orchestrator`]'s configuration from flags/config file/defaults and
/// handles printing and the process exit code.
pub fn compare_files(
    file_a: &Path,
    file_b: &Path,
    thresholds: Thresholds,
    accumulation_config: AccumulationConfig,
    print_threshold: f64,
    force_all_rows: bool,
) -> Result<CompareOutcome, CompareError> {
    Orchestrator::new(thresholds, accumulation_config, print_threshold, force_all_rows)
        .run(file_a, file_b)
}
