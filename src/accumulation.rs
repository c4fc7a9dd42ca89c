//! Accumulation Analyzer (C7) — spec §4.7.
//!
//! Collects `(range, error)` pairs while `column1_is_range_data` holds;
//! once the stream is exhausted, computes linear regression, lag-1
//! autocorrelation, a Wald-Wolfowitz run test, and CUSUM, then assigns a
//! qualitative pattern label.

use crate::types::Pattern;

pub const DEFAULT_MIN_POINTS: usize = 10;
pub const SLOPE_THRESHOLD: f64 = 0.001;
pub const R2_THRESHOLD: f64 = 0.5;
pub const AUTOCORR_THRESHOLD: f64 = 0.5;
pub const BIAS_THRESHOLD: f64 = 3.0 * crate::types::ZERO;

/// Parallel per-element series collected while the column is TL data
/// (spec §3 `ErrorAccumulationData`).
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulationData {
    pub ranges: Vec<f64>,
    pub errors: Vec<f64>,
    pub tl_ref: Vec<f64>,
    pub tl_test: Vec<f64>,
    pub significant: Vec<bool>,
}

impl ErrorAccumulationData {
    pub fn push(&mut self, range: f64, error: f64, tl_ref: f64, tl_test: f64, significant: bool) {
        self.ranges.push(range);
        self.errors.push(error);
        self.tl_ref.push(tl_ref);
        self.tl_test.push(tl_test);
        self.significant.push(significant);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn min_max_range(&self) -> Option<(f64, f64)> {
        if self.ranges.is_empty() {
            return None;
        }
        let mut min = self.ranges[0];
        let mut max = self.ranges[0];
        for &r in &self.ranges[1..] {
            min = min.min(r);
            max = max.max(r);
        }
        Some((min, max))
    }
}

/// Finalized regression + pattern-test statistics (spec §3
/// `AccumulationMetrics`).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct AccumulationMetrics {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub slope_std_err: f64,
    pub p_value: f64,
    pub autocorr_lag1: f64,
    pub n_runs: u64,
    pub expected_runs: f64,
    pub run_test_z: f64,
    pub cusum_max: f64,
    pub cusum_final: f64,
    pub rmse: f64,
    pub mean_error: f64,
    pub max_error: f64,
    pub pattern: Pattern,
}

/// Ordinary least squares slope/intercept/r²/slope-standard-error of `y`
/// on `x` (spec §4.7). Standard error uses the residual variance
/// `ss_res / (n - 2)` divided by `sxx`, undefined below 3 points.
fn linear_regression(x: &[f64], y: &[f64]) -> (f64, f64, f64, f64) {
    let n = x.len() as f64;
    if n == 0.0 {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for i in 0..x.len() {
        sxy += (x[i] - mean_x) * (y[i] - mean_y);
        sxx += (x[i] - mean_x) * (x[i] - mean_x);
    }
    if sxx == 0.0 {
        return (0.0, mean_y, 0.0, 0.0);
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let mut ss_tot = 0.0;
    let mut ss_res = 0.0;
    for i in 0..x.len() {
        let predicted = slope * x[i] + intercept;
        ss_res += (y[i] - predicted).powi(2);
        ss_tot += (y[i] - mean_y).powi(2);
    }
    let r_squared = if ss_tot == 0.0 { 0.0 } else { 1.0 - ss_res / ss_tot };

    let std_err = if n > 2.0 {
        ((ss_res / (n - 2.0)) / sxx).sqrt()
    } else {
        0.0
    };
    (slope, intercept, r_squared, std_err)
}

/// Lanczos approximation of `ln(gamma(x))`, `x > 0`.
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // Reflection formula.
        return (std::f64::consts::PI / (std::f64::consts::PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut a = COEFFS[0];
    let t = x + G + 0.5;
    for (i, c) in COEFFS.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// Continued-fraction expansion used by [`regularized_incomplete_beta`]
/// (Numerical Recipes `betacf`).
fn betacf(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 200;
    const EPS: f64 = 3.0e-12;
    const FP_MIN: f64 = 1.0e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FP_MIN {
        d = FP_MIN;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let mf = m as f64;
        let m2 = 2.0 * mf;

        let aa = mf * (b - mf) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FP_MIN {
            d = FP_MIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FP_MIN {
            c = FP_MIN;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + mf) * (qab + mf) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FP_MIN {
            d = FP_MIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FP_MIN {
            c = FP_MIN;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;

        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Regularized incomplete beta function `I_x(a, b)`, used to turn a
/// Student's-t statistic into a two-tailed p-value without depending on
/// a statistics crate (spec §4.7 explicitly scopes this tool away from
/// being a general-purpose one).
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_bt = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let bt = ln_bt.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        bt * betacf(a, b, x) / a
    } else {
        1.0 - bt * betacf(b, a, 1.0 - x) / b
    }
}

/// Two-tailed p-value for a Student's-t statistic with `df` degrees of
/// freedom (spec §4.7: slope significance test, `n - 2` df).
fn t_test_p_value(t: f64, df: f64) -> f64 {
    if df <= 0.0 {
        return 1.0;
    }
    regularized_incomplete_beta(df / 2.0, 0.5, df / (df + t * t))
}

/// Lag-1 autocorrelation of a sequence.
fn autocorrelation_lag1(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let mut num = 0.0;
    let mut denom = 0.0;
    for i in 0..n {
        denom += (values[i] - mean).powi(2);
    }
    for i in 0..n - 1 {
        num += (values[i] - mean) * (values[i + 1] - mean);
    }
    if denom == 0.0 {
        0.0
    } else {
        num / denom
    }
}

/// Wald-Wolfowitz run test on the sign sequence of centered values.
struct RunTestResult {
    n_runs: u64,
    expected_runs: f64,
    z: f64,
}

fn run_test(centered: &[f64]) -> RunTestResult {
    let signs: Vec<bool> = centered.iter().map(|v| *v >= 0.0).collect();
    let n_pos = signs.iter().filter(|s| **s).count() as f64;
    let n_neg = signs.len() as f64 - n_pos;
    let n = signs.len() as f64;

    let mut n_runs = if signs.is_empty() { 0 } else { 1 };
    for w in signs.windows(2) {
        if w[0] != w[1] {
            n_runs += 1;
        }
    }

    if n_pos == 0.0 || n_neg == 0.0 || n == 0.0 {
        return RunTestResult {
            n_runs: n_runs as u64,
            expected_runs: n_runs as f64,
            z: 0.0,
        };
    }

    let expected_runs = 1.0 + 2.0 * n_pos * n_neg / n;
    let variance = (2.0 * n_pos * n_neg * (2.0 * n_pos * n_neg - n))
        / (n * n * (n - 1.0));
    let z = if variance > 0.0 {
        (n_runs as f64 - expected_runs) / variance.sqrt()
    } else {
        0.0
    };

    RunTestResult {
        n_runs: n_runs as u64,
        expected_runs,
        z,
    }
}

/// Cumulative sum of centered values; returns `(max |cusum|, final cusum)`.
fn cusum(centered: &[f64]) -> (f64, f64) {
    let mut running = 0.0;
    let mut max_abs = 0.0;
    for &v in centered {
        running += v;
        max_abs = max_abs.max(running.abs());
    }
    (max_abs, running)
}

/// Tuning constants for the pattern classifier, resolved once at
/// construction (spec §4.7 defaults, overridable via config/CLI).
#[derive(Debug, Clone, Copy)]
pub struct AccumulationConfig {
    pub min_points: usize,
    pub slope_threshold: f64,
    pub r2_threshold: f64,
    pub autocorr_threshold: f64,
    pub bias_threshold: f64,
}

impl Default for AccumulationConfig {
    fn default() -> Self {
        Self {
            min_points: DEFAULT_MIN_POINTS,
            slope_threshold: SLOPE_THRESHOLD,
            r2_threshold: R2_THRESHOLD,
            autocorr_threshold: AUTOCORR_THRESHOLD,
            bias_threshold: BIAS_THRESHOLD,
        }
    }
}

/// Finalize the collected series into [`AccumulationMetrics`], including
/// the pattern classification (spec §4.7, first matching rule wins).
pub fn finalize(data: &ErrorAccumulationData, config: &AccumulationConfig) -> AccumulationMetrics {
    let n = data.len();
    if n < config.min_points {
        return AccumulationMetrics {
            slope: 0.0,
            intercept: 0.0,
            r_squared: 0.0,
            slope_std_err: 0.0,
            p_value: 1.0,
            autocorr_lag1: 0.0,
            n_runs: 0,
            expected_runs: 0.0,
            run_test_z: 0.0,
            cusum_max: 0.0,
            cusum_final: 0.0,
            rmse: 0.0,
            mean_error: 0.0,
            max_error: 0.0,
            pattern: Pattern::InsufficientData,
        };
    }

    let (slope, intercept, r_squared, slope_std_err) =
        linear_regression(&data.ranges, &data.errors);
    let p_value = if slope_std_err > 0.0 {
        t_test_p_value(slope / slope_std_err, n as f64 - 2.0)
    } else {
        1.0
    };
    let autocorr = autocorrelation_lag1(&data.errors);

    let mean_error = data.errors.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = data.errors.iter().map(|e| e - mean_error).collect();
    let run = run_test(&centered);
    let (cusum_max, cusum_final) = cusum(&centered);

    let rmse = (data.errors.iter().map(|e| e * e).sum::<f64>() / n as f64).sqrt();
    let max_error = data.errors.iter().map(|e| e.abs()).fold(0.0_f64, f64::max);

    let both_above_marginal = data
        .tl_ref
        .iter()
        .zip(&data.tl_test)
        .filter(|(a, b)| **a > crate::types::MARGINAL && **b > crate::types::MARGINAL)
        .count();
    let null_point_dominant = both_above_marginal * 2 >= n;

    let pattern = if slope.abs() > config.slope_threshold
        && r_squared > config.r2_threshold
        && autocorr.abs() > config.autocorr_threshold
    {
        Pattern::SystematicGrowth
    } else if slope.abs() <= config.slope_threshold
        && mean_error.abs() > config.bias_threshold
        && autocorr.abs() > config.autocorr_threshold
    {
        Pattern::SystematicBias
    } else if run.z.abs() > 1.96 && max_error > 10.0 * rmse {
        Pattern::TransientSpikes
    } else if null_point_dominant {
        Pattern::NullPointNoise
    } else {
        Pattern::RandomNoise
    };

    AccumulationMetrics {
        slope,
        intercept,
        r_squared,
        slope_std_err,
        p_value,
        autocorr_lag1: autocorr,
        n_runs: run.n_runs,
        expected_runs: run.expected_runs,
        run_test_z: run.z,
        cusum_max,
        cusum_final,
        rmse,
        mean_error,
        max_error,
        pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AccumulationConfig {
        AccumulationConfig::default()
    }

    #[test]
    fn insufficient_data_below_min_points() {
        let mut data = ErrorAccumulationData::default();
        for i in 0..5 {
            data.push(i as f64, 0.1, 100.0, 100.0, false);
        }
        let metrics = finalize(&data, &config());
        assert_eq!(metrics.pattern, Pattern::InsufficientData);
    }

    #[test]
    fn constant_bias_with_no_trend_is_systematic_bias() {
        let mut data = ErrorAccumulationData::default();
        for i in 0..20 {
            // constant error with tiny noise correlated across steps
            let err = 1.0 + if i % 2 == 0 { 0.001 } else { -0.001 };
            data.push(i as f64, err, 100.0, 100.0, true);
        }
        let metrics = finalize(&data, &config());
        assert!(metrics.slope.abs() <= config().slope_threshold);
        assert!(metrics.mean_error.abs() > config().bias_threshold);
        assert_eq!(metrics.pattern, Pattern::SystematicBias);
    }

    #[test]
    fn growing_error_with_trend_is_systematic_growth() {
        let mut data = ErrorAccumulationData::default();
        for i in 0..20 {
            let range = i as f64;
            let err = 0.01 * range; // linear growth
            data.push(range, err, 100.0, 100.0, true);
        }
        let metrics = finalize(&data, &config());
        assert_eq!(metrics.pattern, Pattern::SystematicGrowth);
    }

    #[test]
    fn pearson_like_regression_matches_manual_slope() {
        // y = 2x + 1 exactly -> slope 2, intercept 1, r2 = 1, std_err 0
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let y = vec![1.0, 3.0, 5.0, 7.0];
        let (slope, intercept, r2, std_err) = linear_regression(&x, &y);
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((intercept - 1.0).abs() < 1e-9);
        assert!((r2 - 1.0).abs() < 1e-9);
        assert!(std_err.abs() < 1e-9);
    }

    #[test]
    fn perfect_fit_has_a_vanishing_p_value_denominator() {
        // No residual variance -> std_err is 0, so finalize() must not
        // divide by it; the fixture still clears min_points via padding.
        let mut data = ErrorAccumulationData::default();
        for i in 0..20 {
            data.push(i as f64, 2.0 * i as f64 + 1.0, 100.0, 100.0, true);
        }
        let metrics = finalize(&data, &config());
        assert_eq!(metrics.slope_std_err, 0.0);
        assert_eq!(metrics.p_value, 1.0);
    }

    #[test]
    fn noisy_flat_slope_has_a_high_p_value() {
        // Errors independent of range -> true slope is 0; the fitted
        // slope should not be statistically distinguishable from 0.
        let mut data = ErrorAccumulationData::default();
        let noise = [
            0.1, -0.2, 0.05, -0.05, 0.15, -0.1, 0.2, -0.15, 0.0, 0.1, -0.05, 0.05, -0.1, 0.15,
            -0.2, 0.1, 0.0, -0.05, 0.1, -0.1,
        ];
        for (i, e) in noise.iter().enumerate() {
            data.push(i as f64, *e, 100.0, 100.0, false);
        }
        let metrics = finalize(&data, &config());
        assert!(metrics.p_value > 0.05);
    }

    #[test]
    fn t_test_p_value_matches_known_two_tailed_reference() {
        // t = 2.228, df = 10 is the classic 0.05 two-tailed critical value.
        let p = t_test_p_value(2.228, 10.0);
        assert!((p - 0.05).abs() < 0.01, "expected ~0.05, got {p}");
    }

    #[test]
    fn t_test_p_value_is_symmetric_in_sign_of_t() {
        assert!((t_test_p_value(2.5, 15.0) - t_test_p_value(-2.5, 15.0)).abs() < 1e-12);
    }

    #[test]
    fn cusum_tracks_running_sum_and_its_peak() {
        let centered = [1.0, 1.0, -3.0, 1.0];
        let (max_abs, final_sum) = cusum(&centered);
        assert!((max_abs - 2.0).abs() < 1e-9); // running: 1, 2, -1, 0 -> peak |2|
        assert!((final_sum - 0.0).abs() < 1e-9);
    }

    #[test]
    fn run_test_all_same_sign_has_one_run() {
        let centered = [1.0, 2.0, 3.0, 4.0];
        let result = run_test(&centered);
        assert_eq!(result.n_runs, 1);
    }

    #[test]
    fn cusum_reporting_never_gates_pattern_classification() {
        // Large CUSUM alone, without run-test or slope/r2/autocorr support,
        // must not force TRANSIENT_SPIKES or any other non-default label.
        let mut data = ErrorAccumulationData::default();
        for i in 0..20 {
            data.push(i as f64, 0.5, 100.0, 100.0, false);
        }
        let metrics = finalize(&data, &config());
        assert_ne!(metrics.pattern, Pattern::TransientSpikes);
    }
}
