//! Shared data model for the comparison pipeline.
//!
//! These types are owned by the [`crate::orchestrator::Orchestrator`] (C9)
//! and mutated only from the main walk; every analyzer receives a scoped,
//! exclusive reference to the parts of [`Accumulators`] it needs for the
//! duration of one `process_element` call.

use serde::{Deserialize, Serialize};

/// One numeric token plus the decimal precision it was printed with.
///
/// `decimals` is the *effective* decimal precision: for fixed notation it
/// is the digit count after `.`; for scientific `m e k` it is
/// `sig_figs(m) - 1 - k`, clamped to `[0, 17]`. A sentinel of `-1` marks a
/// token that failed to parse (see [`crate::error::CompareError`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericCell {
    pub value: f64,
    pub decimals: i32,
}

impl NumericCell {
    pub fn new(value: f64, decimals: i32) -> Self {
        Self { value, decimals }
    }

    pub fn malformed() -> Self {
        Self {
            value: 0.0,
            decimals: -1,
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.decimals < 0
    }
}

/// One parsed row: an ordered sequence of [`NumericCell`]s.
///
/// A complex token `(a, b)` expands to two cells in sequence. Constructed
/// per line, consumed during the element walk, then discarded.
#[derive(Debug, Clone, Default)]
pub struct LineRecord {
    pub cells: Vec<NumericCell>,
}

impl LineRecord {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// One aligned element pair, the unit of work for the Difference Analyzer.
#[derive(Debug, Clone, Copy)]
pub struct ColumnValues {
    pub v1: f64,
    pub v2: f64,
    /// The first numeric cell of the current line; used for table display
    /// and for the range-indexed accumulation series.
    pub range: f64,
    pub dp1: i32,
    pub dp2: i32,
    pub min_dp: i32,
    pub max_dp: i32,
}

impl ColumnValues {
    pub fn new(v1: f64, v2: f64, range: f64, dp1: i32, dp2: i32) -> Self {
        Self {
            v1,
            v2,
            range,
            dp1,
            dp2,
            min_dp: dp1.min(dp2),
            max_dp: dp1.max(dp2),
        }
    }
}

/// Mode a comparison runs in, derived from the user-supplied `significant`
/// threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// `significant > 0`: ordinary absolute-threshold comparison.
    Normal,
    /// `significant == 0`: count every non-trivial, physically meaningful
    /// difference; bypasses the precision floor in LEVEL 3.
    Sensitive,
    /// `significant < 0`: relative-difference tolerance,
    /// `pct = |significant| / 100`.
    Percent,
}

/// Configuration bundle resolved once at construction (spec §3, §9).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    /// User-supplied lower bound for "meaningful" difference, as given on
    /// the command line (sign determines [`Mode`]).
    pub significant: f64,
    /// Relative tolerance in PERCENT mode (`|significant| / 100`); unused
    /// otherwise.
    pub significant_percent: f64,
    /// Hard upper bound; exceeding it flips the global failure flag.
    pub critical: f64,
    /// Minimum raw difference to emit a table row.
    pub print: f64,
    pub mode: Mode,
}

/// Floating-point "raw zero": `2^-23`, the smallest difference treated as
/// representable at all.
pub const ZERO: f64 = 1.192_092_895_507_812_5e-7;

/// Fixed TL threshold (dB) below which a value is in the "marginal"
/// operational band.
pub const MARGINAL: f64 = 110.0;

/// Fixed TL threshold (dB) above which a value is considered numerically
/// unreliable: `-20 * log10(ZERO)`.
pub const IGNORE: f64 = 138.465_989_979_274_84;

/// Tolerance for the sub-LSB boundary comparison in LEVEL 2.
pub const FP_TOLERANCE: f64 = 1e-12;

impl Thresholds {
    pub fn new(significant: f64, critical: f64, print: f64) -> Self {
        let mode = if significant == 0.0 {
            Mode::Sensitive
        } else if significant < 0.0 {
            Mode::Percent
        } else {
            Mode::Normal
        };
        let significant_percent = if mode == Mode::Percent {
            significant.abs() / 100.0
        } else {
            0.0
        };
        Self {
            significant,
            significant_percent,
            critical,
            print,
            mode,
        }
    }

    pub fn is_sensitive(&self) -> bool {
        self.mode == Mode::Sensitive
    }

    pub fn is_percent(&self) -> bool {
        self.mode == Mode::Percent
    }
}

/// Counters for each discrimination level (spec §3 `CountStats`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountStats {
    pub line_number: u64,
    pub elem_number: u64,
    pub diff_non_zero: u64,
    pub diff_trivial: u64,
    pub diff_non_trivial: u64,
    pub diff_insignificant: u64,
    pub diff_significant: u64,
    pub diff_marginal: u64,
    pub diff_critical: u64,
    pub diff_error: u64,
    pub diff_non_error: u64,
    pub diff_print: u64,
    pub diff_high_ignore: u64,
}

/// Maxima and the precision at which each was observed (spec §3 `DiffStats`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DiffStats {
    pub max_non_zero: f64,
    pub max_non_zero_dp: i32,
    pub max_non_trivial: f64,
    pub max_non_trivial_dp: i32,
    pub max_significant: f64,
    pub max_significant_dp: i32,
    pub max_percent_error: f64,
    pub max_percent_error_dp: i32,
}

impl DiffStats {
    fn bump(current: &mut f64, current_dp: &mut i32, candidate: f64, dp: i32) {
        if candidate > *current {
            *current = candidate;
            *current_dp = dp;
        }
    }

    pub fn observe_non_zero(&mut self, diff: f64, dp: i32) {
        Self::bump(&mut self.max_non_zero, &mut self.max_non_zero_dp, diff, dp);
    }

    pub fn observe_non_trivial(&mut self, diff: f64, dp: i32) {
        Self::bump(
            &mut self.max_non_trivial,
            &mut self.max_non_trivial_dp,
            diff,
            dp,
        );
    }

    pub fn observe_significant(&mut self, diff: f64, dp: i32) {
        Self::bump(
            &mut self.max_significant,
            &mut self.max_significant_dp,
            diff,
            dp,
        );
    }

    pub fn observe_percent_error(&mut self, pct: f64, dp: i32) {
        if pct.is_finite() {
            Self::bump(
                &mut self.max_percent_error,
                &mut self.max_percent_error_dp,
                pct,
                dp,
            );
        }
    }
}

/// First offending line and median ratio for a detected unit mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitMismatch {
    pub first_line: u64,
    pub median_ratio: f64,
}

/// Boolean state accumulated across the whole comparison (spec §3 `Flags`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flags {
    pub new_fmt: bool,
    pub file_end_reached: bool,
    pub error_found: bool,
    pub file_access_error: bool,
    pub structures_compatible: bool,
    pub has_non_zero_diff: bool,
    pub has_non_trivial_diff: bool,
    pub has_significant_diff: bool,
    pub has_marginal_diff: bool,
    pub has_critical_diff: bool,
    pub has_error_diff: bool,
    pub has_non_error_diff: bool,
    pub has_printed_diff: bool,
    pub column1_is_range_data: bool,
    pub unit_mismatch: Option<UnitMismatch>,
    pub files_are_same: bool,
    pub files_have_same_values: bool,
    pub files_are_close_enough: bool,
}

impl Flags {
    /// Fresh flag set: everything starts optimistic (`true` for the "same"
    /// verdicts) and is pulled down to `false` by evidence as the walk
    /// proceeds.
    pub fn new() -> Self {
        Self {
            structures_compatible: true,
            files_are_same: true,
            files_have_same_values: true,
            files_are_close_enough: true,
            ..Default::default()
        }
    }
}

/// Unweighted and TL-weighted RMSE accumulation (spec §3 `RMSEStats`, §4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RMSEStats {
    pub sum_sq_all: f64,
    pub n_all: u64,
    pub sum_sq_data: f64,
    pub n_data: u64,
    pub per_column_sum_sq: std::collections::BTreeMap<usize, f64>,
    pub per_column_n: std::collections::BTreeMap<usize, u64>,
    pub weighted_sum_sq: f64,
    pub weighted_weight: f64,
}

impl RMSEStats {
    pub fn rmse_all(&self) -> f64 {
        if self.n_all == 0 {
            0.0
        } else {
            (self.sum_sq_all / self.n_all as f64).sqrt()
        }
    }

    pub fn rmse_data(&self) -> f64 {
        if self.n_data == 0 {
            0.0
        } else {
            (self.sum_sq_data / self.n_data as f64).sqrt()
        }
    }

    pub fn rmse_column(&self, column: usize) -> Option<f64> {
        let n = *self.per_column_n.get(&column)?;
        if n == 0 {
            return Some(0.0);
        }
        let sum_sq = *self.per_column_sum_sq.get(&column)?;
        Some((sum_sq / n as f64).sqrt())
    }

    /// TL weight: `clamp((110 - tl) / 50, 0, 1)`.
    pub fn tl_weight(tl: f64) -> f64 {
        ((MARGINAL - tl) / 50.0).clamp(0.0, 1.0)
    }

    pub fn weighted_rmse(&self) -> f64 {
        if self.weighted_weight <= 0.0 {
            0.0
        } else {
            (self.weighted_sum_sq / self.weighted_weight).sqrt()
        }
    }
}

/// Qualitative classification of the range-indexed error series (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    SystematicGrowth,
    SystematicBias,
    RandomNoise,
    NullPointNoise,
    TransientSpikes,
    InsufficientData,
}

/// Overall pass/fail/warn outcome for the comparison (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    PassWithWarning,
    Fail,
    FileAccessError,
}

impl Verdict {
    /// Process exit code matching spec §6.
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass | Verdict::PassWithWarning => 0,
            Verdict::Fail => 1,
            Verdict::FileAccessError => 2,
        }
    }
}
