//! Structure Analyzer (C3).
//!
//! Groups consecutive lines by column count, decides structural
//! compatibility, and detects column-1 range semantics and a possible
//! unit mismatch — all from a single pre-scan, before any numeric
//! comparison happens (spec §4.3).

use crate::parser::parse_line;
use crate::types::UnitMismatch;

/// A run of consecutive lines sharing the same column count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnGroup {
    pub column_count: usize,
    pub line_count: u64,
}

/// Result of the one-time structural pre-scan of both files.
#[derive(Debug, Clone, Default)]
pub struct StructureVerdict {
    pub groups_a: Vec<ColumnGroup>,
    pub groups_b: Vec<ColumnGroup>,
    pub structures_compatible: bool,
    pub column1_is_range_data: bool,
    pub unit_mismatch: Option<UnitMismatch>,
}

/// Groups `lines` by consecutive runs of identical column count, ignoring
/// blank lines (they carry no column count and don't start/end a group).
pub fn group_by_column_count(lines: &[String]) -> Vec<ColumnGroup> {
    let mut groups: Vec<ColumnGroup> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (record, _errors) = parse_line(line, (i + 1) as u64);
        let count = record.len();
        match groups.last_mut() {
            Some(g) if g.column_count == count => g.line_count += 1,
            _ => groups.push(ColumnGroup {
                column_count: count,
                line_count: 1,
            }),
        }
    }
    groups
}

/// Two files are structurally compatible iff their group sequences have
/// the same length and matching last-group column counts.
fn groups_compatible(a: &[ColumnGroup], b: &[ColumnGroup]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    match (a.last(), b.last()) {
        (Some(ga), Some(gb)) => ga.column_count == gb.column_count,
        (None, None) => true,
        _ => false,
    }
}

/// Column-0 values across both files, used for range-data and
/// unit-mismatch detection.
struct ColumnZero {
    a: Vec<f64>,
    b: Vec<f64>,
}

fn extract_column_zero(lines_a: &[String], lines_b: &[String]) -> ColumnZero {
    let extract = |lines: &[String]| -> Vec<f64> {
        lines
            .iter()
            .enumerate()
            .filter_map(|(i, l)| {
                if l.trim().is_empty() {
                    return None;
                }
                let (rec, _) = parse_line(l, (i + 1) as u64);
                rec.cells.first().filter(|c| !c.is_malformed()).map(|c| c.value)
            })
            .collect()
    };
    ColumnZero {
        a: extract(lines_a),
        b: extract(lines_b),
    }
}

/// Column 0 is range data if values are monotonically non-decreasing,
/// have an approximately constant positive delta (±1%), and the starting
/// value is below 100.
fn is_range_data(values: &[f64]) -> bool {
    if values.len() < 3 {
        return false;
    }
    if values[0] >= 100.0 {
        return false;
    }
    let mut deltas = Vec::with_capacity(values.len() - 1);
    for w in values.windows(2) {
        let d = w[1] - w[0];
        if d < 0.0 {
            return false;
        }
        deltas.push(d);
    }
    let positive: Vec<f64> = deltas.iter().copied().filter(|d| *d > 0.0).collect();
    if positive.is_empty() {
        return false;
    }
    let mean = positive.iter().sum::<f64>() / positive.len() as f64;
    if mean <= 0.0 {
        return false;
    }
    positive.iter().all(|d| ((d - mean) / mean).abs() <= 0.01)
}

/// Detects column-0 ratios `b/a` clustering near 1852 (meters per
/// nautical mile) within 1% for at least three consecutive lines.
fn detect_unit_mismatch(a: &[f64], b: &[f64]) -> Option<UnitMismatch> {
    const NM_IN_METERS: f64 = 1852.0;
    let n = a.len().min(b.len());
    let mut run_start: Option<usize> = None;
    let mut ratios_in_run: Vec<f64> = Vec::new();

    for i in 0..n {
        if a[i] == 0.0 {
            run_start = None;
            ratios_in_run.clear();
            continue;
        }
        let ratio = b[i] / a[i];
        if ratio.is_finite() && ((ratio - NM_IN_METERS) / NM_IN_METERS).abs() <= 0.01 {
            if run_start.is_none() {
                run_start = Some(i);
            }
            ratios_in_run.push(ratio);
            if ratios_in_run.len() >= 3 {
                let mut sorted = ratios_in_run.clone();
                sorted.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
                let median = sorted[sorted.len() / 2];
                return Some(UnitMismatch {
                    first_line: (run_start.unwrap() + 1) as u64,
                    median_ratio: median,
                });
            }
        } else {
            run_start = None;
            ratios_in_run.clear();
        }
    }
    None
}

/// Run the full structural pre-scan (spec §4.3).
pub fn analyze_structure(lines_a: &[String], lines_b: &[String]) -> StructureVerdict {
    let groups_a = group_by_column_count(lines_a);
    let groups_b = group_by_column_count(lines_b);
    let structures_compatible = groups_compatible(&groups_a, &groups_b);

    let col0 = extract_column_zero(lines_a, lines_b);
    let column1_is_range_data = is_range_data(&col0.a) && is_range_data(&col0.b);
    let unit_mismatch = detect_unit_mismatch(&col0.a, &col0.b);

    StructureVerdict {
        groups_a,
        groups_b,
        structures_compatible,
        column1_is_range_data,
        unit_mismatch,
    }
}
