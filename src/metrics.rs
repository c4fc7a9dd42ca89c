//! RMSE & TL Metrics (C6) — spec §4.6.
//!
//! Accumulates plain RMSE (all elements, data-only excluding column 0,
//! and per column) plus a TL-weighted RMSE, and collects `(range, tl1,
//! tl2, |diff|)` points to finalize the curve-similarity metrics
//! M1/M2/M3/M_curve once the stream is exhausted.

use crate::types::RMSEStats;

/// One observed TL point, kept for the finalization pass.
#[derive(Debug, Clone, Copy)]
struct TlPoint {
    range: f64,
    tl1: f64,
    tl2: f64,
    abs_diff: f64,
}

/// Collects TL points across the walk; finalizes to M1/M2/M3/M_curve.
#[derive(Debug, Clone, Default)]
pub struct TlMetrics {
    points: Vec<TlPoint>,
    max_range: f64,
}

/// Finalized curve-similarity metrics.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct TlMetricsSummary {
    pub m1_weighted_rmse: f64,
    pub m2_tail_mean_abs_diff: f64,
    pub m3_pearson_correlation: f64,
    pub m_curve: f64,
}

impl TlMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, range: f64, tl1: f64, tl2: f64) {
        let abs_diff = (tl1 - tl2).abs();
        self.max_range = self.max_range.max(range);
        self.points.push(TlPoint {
            range,
            tl1,
            tl2,
            abs_diff,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `score(d) = 100 - (d/3)*10` for `d <= 3`, linearly decreasing to 0
    /// across `(3, 20]`, else 0.
    fn score(d: f64) -> f64 {
        if d <= 3.0 {
            100.0 - (d / 3.0) * 10.0
        } else if d <= 20.0 {
            let frac = (d - 3.0) / (20.0 - 3.0);
            (100.0 - (3.0 / 3.0) * 10.0) * (1.0 - frac)
        } else {
            0.0
        }
    }

    pub fn finalize(&self, rmse: &RMSEStats) -> Option<TlMetricsSummary> {
        if self.points.is_empty() {
            return None;
        }

        let m1 = rmse.weighted_rmse();

        let tail_cutoff = 0.96 * self.max_range;
        let tail: Vec<&TlPoint> = self.points.iter().filter(|p| p.range >= tail_cutoff).collect();
        let m2 = if tail.is_empty() {
            0.0
        } else {
            tail.iter().map(|p| p.abs_diff).sum::<f64>() / tail.len() as f64
        };

        let m3 = pearson_correlation(
            &self.points.iter().map(|p| p.tl1).collect::<Vec<_>>(),
            &self.points.iter().map(|p| p.tl2).collect::<Vec<_>>(),
        );

        let m_curve = (Self::score(m1) + Self::score(m2) + m3.max(0.0) * 100.0) / 3.0;

        Some(TlMetricsSummary {
            m1_weighted_rmse: m1,
            m2_tail_mean_abs_diff: m2,
            m3_pearson_correlation: m3,
            m_curve,
        })
    }
}

/// Pearson correlation between two equal-length vectors; zero denominator
/// yields 0 rather than NaN (spec's `NumericEdge` handling, §7).
fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let denom = (var_x * var_y).sqrt();
    if denom <= 0.0 {
        0.0
    } else {
        cov / denom
    }
}

/// Feed one element's raw difference into the RMSE accumulators.
pub fn accumulate_rmse(
    rmse: &mut RMSEStats,
    column: usize,
    raw_diff: f64,
    column1_is_range_data: bool,
    v1: f64,
    v2: f64,
) {
    rmse.sum_sq_all += raw_diff * raw_diff;
    rmse.n_all += 1;

    let is_data_column = !(column == 0 && column1_is_range_data);
    if is_data_column {
        rmse.sum_sq_data += raw_diff * raw_diff;
        rmse.n_data += 1;

        *rmse.per_column_sum_sq.entry(column).or_insert(0.0) += raw_diff * raw_diff;
        *rmse.per_column_n.entry(column).or_insert(0) += 1;

        if column1_is_range_data && column >= 1 {
            let weight = RMSEStats::tl_weight((v1 + v2) / 2.0);
            rmse.weighted_sum_sq += weight * raw_diff * raw_diff;
            rmse.weighted_weight += weight;
        }
    }
}
