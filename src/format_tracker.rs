//! Format Tracker (C4).
//!
//! Maintains a per-column vector of running minimum printed decimal
//! places, detects format changes, and computes the precision-derived
//! significance threshold per column (spec §4.4).

/// Running per-column format state.
#[derive(Debug, Clone, Default)]
pub struct FormatTracker {
    dp_per_col: Vec<i32>,
    initialized: bool,
}

/// Outcome of feeding one line's per-column `min(dp1, dp2)` values through
/// the tracker.
#[derive(Debug, Clone, Default)]
pub struct FormatUpdate {
    /// True if any column's running minimum changed on this line
    /// (diagnostic only — never demotes a difference that was already
    /// classified).
    pub new_fmt: bool,
    /// True if the line's column count changed in a way the Structure
    /// Analyzer did not already sanction as a group boundary; the caller
    /// should clear structural compatibility and the tracker state.
    pub column_count_changed_unexpectedly: bool,
}

impl FormatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line's per-column `min(dp1, dp2)` values. `expected_count`
    /// is whatever the Structure Analyzer considers valid for this
    /// position (the current group's column count); pass the observed
    /// count itself to disable the mismatch check.
    pub fn observe_line(&mut self, min_dps: &[i32], expected_count: usize) -> FormatUpdate {
        if !self.initialized {
            self.dp_per_col = min_dps.to_vec();
            self.initialized = true;
            return FormatUpdate::default();
        }

        if min_dps.len() != expected_count {
            self.dp_per_col.clear();
            self.initialized = false;
            return FormatUpdate {
                new_fmt: false,
                column_count_changed_unexpectedly: true,
            };
        }

        let mut new_fmt = false;
        if self.dp_per_col.len() < min_dps.len() {
            self.dp_per_col.resize(min_dps.len(), i32::MAX);
        }
        for (col, &dp) in min_dps.iter().enumerate() {
            if self.dp_per_col[col] != dp {
                self.dp_per_col[col] = dp;
                new_fmt = true;
            }
        }
        FormatUpdate {
            new_fmt,
            column_count_changed_unexpectedly: false,
        }
    }

    pub fn min_dp_for_column(&self, col: usize) -> Option<i32> {
        self.dp_per_col.get(col).copied()
    }

    pub fn clear(&mut self) {
        self.dp_per_col.clear();
        self.initialized = false;
    }
}

/// `precision_threshold(dp) = 10^(-dp)`.
pub fn precision_threshold(dp: i32) -> f64 {
    10f64.powi(-dp)
}

/// `column_threshold = max(user.significant, precision_threshold(min_dp))`.
///
/// In SENSITIVE mode the precision floor is ignored for the significance
/// decision (it is still used for display elsewhere), so the caller
/// passes `None` for `significant` in that case.
pub fn column_threshold(significant: Option<f64>, min_dp: i32) -> f64 {
    match significant {
        Some(s) => s.max(precision_threshold(min_dp)),
        None => precision_threshold(min_dp),
    }
}
