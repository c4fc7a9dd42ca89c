//! Difference Analyzer (C5) — the six-level discrimination pipeline
//! (spec §4.5).
//!
//! Each level operates strictly on the outcome of the one before it:
//! a difference classified trivial at LEVEL 2 can never be reclassified
//! as significant by any threshold tuning, because LEVEL 3 only ever
//! sees the non-trivial set.

use crate::types::{ColumnValues, CountStats, DiffStats, Flags, Mode, Thresholds, FP_TOLERANCE, IGNORE, MARGINAL, ZERO};

/// Per-element classification outcome, reported back to the caller so the
/// Reporter (C8) and table renderer can decide whether to emit a row.
#[derive(Debug, Clone, Copy)]
pub struct ElementOutcome {
    pub raw_diff: f64,
    pub rounded_diff: f64,
    pub percent_error: f64,
    pub trivial: bool,
    pub significant: bool,
    pub marginal: bool,
    pub critical: bool,
    pub skip_tl: bool,
}

/// Round-half-away-from-zero to `dp` decimal places, consistent across
/// platforms (spec §9 open question, resolved).
pub fn round_half_away_from_zero(value: f64, dp: i32) -> f64 {
    if dp < 0 {
        return value;
    }
    let factor = 10f64.powi(dp);
    let scaled = value * factor;
    let rounded = if scaled >= 0.0 {
        (scaled + 0.5).floor()
    } else {
        (scaled - 0.5).ceil()
    };
    rounded / factor
}

/// Classify one aligned element pair and update the owned counters,
/// maxima, and flags in place.
#[allow(clippy::too_many_arguments)]
pub fn process_element(
    cv: ColumnValues,
    column: usize,
    thresholds: &Thresholds,
    column1_is_range_data: bool,
    counts: &mut CountStats,
    diffs: &mut DiffStats,
    flags: &mut Flags,
) -> ElementOutcome {
    counts.elem_number += 1;

    let raw_diff = (cv.v1 - cv.v2).abs();
    let rv1 = round_half_away_from_zero(cv.v1, cv.min_dp);
    let rv2 = round_half_away_from_zero(cv.v2, cv.min_dp);
    let rounded_diff = (rv1 - rv2).abs();
    let lsb = 10f64.powi(-cv.min_dp);
    let half_lsb = lsb / 2.0;
    let percent_error = if cv.v2.abs() > ZERO {
        100.0 * raw_diff / cv.v2.abs()
    } else {
        f64::INFINITY
    };

    // LEVEL 1 — raw.
    if raw_diff > ZERO {
        counts.diff_non_zero += 1;
        flags.has_non_zero_diff = true;
        diffs.observe_non_zero(raw_diff, cv.max_dp);
    }
    flags.files_are_same = flags.files_are_same && raw_diff <= ZERO;

    // LEVEL 2 — trivial vs. non-trivial (sub-LSB rule).
    let sub_lsb = raw_diff < half_lsb
        || (raw_diff - half_lsb).abs() < FP_TOLERANCE * raw_diff.max(half_lsb);
    let trivial = rounded_diff == 0.0 || sub_lsb;

    if trivial {
        counts.diff_trivial += 1;
    } else {
        counts.diff_non_trivial += 1;
        flags.has_non_trivial_diff = true;
        diffs.observe_non_trivial(raw_diff, cv.max_dp);
    }

    let skip_tl = column == 0 && column1_is_range_data;

    flags.files_have_same_values = flags.files_have_same_values && counts.diff_non_trivial == 0;

    if trivial {
        // Short-circuit guarantee: trivial differences never reach LEVEL 3+.
        return ElementOutcome {
            raw_diff,
            rounded_diff,
            percent_error,
            trivial: true,
            significant: false,
            marginal: false,
            critical: false,
            skip_tl,
        };
    }

    // LEVEL 3 — insignificant vs. significant.
    let both_above_ignore = !skip_tl && cv.v1 > IGNORE && cv.v2 > IGNORE;
    let significant;
    if both_above_ignore {
        counts.diff_high_ignore += 1;
        counts.diff_insignificant += 1;
        significant = false;
    } else {
        let exceeds = match thresholds.mode {
            Mode::Percent => {
                if cv.v2.abs() > ZERO {
                    rounded_diff / cv.v2.abs() > thresholds.significant_percent
                } else {
                    rounded_diff > ZERO
                }
            }
            Mode::Sensitive => true,
            Mode::Normal => {
                rounded_diff > thresholds.significant.max(10f64.powi(-cv.min_dp))
            }
        };
        if exceeds {
            counts.diff_significant += 1;
            flags.has_significant_diff = true;
            flags.files_are_close_enough = false;
            diffs.observe_significant(raw_diff, cv.max_dp);
            significant = true;
        } else {
            counts.diff_insignificant += 1;
            significant = false;
        }
    }
    diffs.observe_percent_error(percent_error, cv.max_dp);

    if !significant {
        return ElementOutcome {
            raw_diff,
            rounded_diff,
            percent_error,
            trivial: false,
            significant: false,
            marginal: false,
            critical: false,
            skip_tl,
        };
    }

    // LEVEL 4 — marginal vs. non-marginal (within significant).
    let marginal = !skip_tl && cv.v1 > MARGINAL && cv.v1 < IGNORE && cv.v2 > MARGINAL && cv.v2 < IGNORE;
    if marginal {
        counts.diff_marginal += 1;
        flags.has_marginal_diff = true;
        return ElementOutcome {
            raw_diff,
            rounded_diff,
            percent_error,
            trivial: false,
            significant: true,
            marginal: true,
            critical: false,
            skip_tl,
        };
    }

    // LEVEL 5 — critical vs. non-critical (within non-marginal significant).
    let critical_threshold = thresholds.critical;
    let critical = !skip_tl
        && rounded_diff > critical_threshold
        && cv.v1 <= IGNORE
        && cv.v2 <= IGNORE;
    if critical {
        counts.diff_critical += 1;
        flags.has_critical_diff = true;
        return ElementOutcome {
            raw_diff,
            rounded_diff,
            percent_error,
            trivial: false,
            significant: true,
            marginal: false,
            critical: true,
            skip_tl,
        };
    }

    // LEVEL 6 — error vs. non-error (within non-critical non-marginal significant).
    let is_error = match thresholds.mode {
        Mode::Percent => {
            cv.v2.abs() > ZERO && rounded_diff / cv.v2.abs() > thresholds.significant_percent
        }
        _ => rounded_diff > critical_threshold,
    };
    if is_error {
        counts.diff_error += 1;
        flags.has_error_diff = true;
    } else {
        counts.diff_non_error += 1;
        flags.has_non_error_diff = true;
    }

    ElementOutcome {
        raw_diff,
        rounded_diff,
        percent_error,
        trivial: false,
        significant: true,
        marginal: false,
        critical: false,
        skip_tl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq as pretty_assert_eq;

    fn fresh() -> (CountStats, DiffStats, Flags) {
        (CountStats::default(), DiffStats::default(), Flags::new())
    }

    #[test]
    fn full_count_stats_struct_matches_expected_after_three_elements() {
        // pretty_assertions gives a readable field-by-field diff when this
        // drifts, instead of a single opaque "not equal" panic message.
        let th = Thresholds::new(0.0, 9999.0, 0.0);
        let (mut counts, mut diffs, mut flags) = fresh();
        for (v1, v2, dp1, dp2) in [
            (30.8, 30.85, 1, 2), // trivial
            (30.8, 30.9, 1, 1),  // non-trivial, significant, below marginal
            (200.0, 201.0, 1, 1), // both above ignore -> high_ignore, insignificant
        ] {
            let cv = ColumnValues::new(v1, v2, v1, dp1, dp2);
            process_element(cv, 1, &th, false, &mut counts, &mut diffs, &mut flags);
        }

        let expected = CountStats {
            line_number: 0,
            elem_number: 3,
            diff_non_zero: 3,
            diff_trivial: 1,
            diff_non_trivial: 2,
            diff_insignificant: 1,
            diff_significant: 1,
            diff_marginal: 0,
            diff_critical: 0,
            diff_error: 0,
            diff_non_error: 1,
            diff_print: 0,
            diff_high_ignore: 1,
        };
        pretty_assert_eq!(counts, expected);
    }

    #[test]
    fn round_half_away_from_zero_ties() {
        assert!((round_half_away_from_zero(30.85, 1) - 30.9).abs() < 1e-9);
        assert!((round_half_away_from_zero(-30.85, 1) - -30.9).abs() < 1e-9);
    }

    // Scenario 1 from spec §8: 30.8 vs 30.85, significant=0 -> trivial, not significant.
    #[test]
    fn scenario_sub_lsb_is_trivial_even_in_sensitive_mode() {
        let th = Thresholds::new(0.0, 9999.0, 0.0);
        let cv = ColumnValues::new(30.8, 30.85, 30.8, 1, 2);
        let (mut counts, mut diffs, mut flags) = fresh();
        let outcome = process_element(cv, 0, &th, false, &mut counts, &mut diffs, &mut flags);
        assert!(outcome.trivial);
        assert!(!outcome.significant);
        assert_eq!(counts.diff_non_zero, 1);
        assert_eq!(counts.diff_trivial, 1);
        assert_eq!(counts.diff_significant, 0);
    }

    // Scenario 2 from spec §8: 30.8 vs 30.9, significant=0 -> non-trivial, significant.
    #[test]
    fn scenario_one_dp_step_is_non_trivial_and_significant_in_sensitive_mode() {
        let th = Thresholds::new(0.0, 9999.0, 0.0);
        let cv = ColumnValues::new(30.8, 30.9, 30.8, 1, 1);
        let (mut counts, mut diffs, mut flags) = fresh();
        let outcome = process_element(cv, 0, &th, false, &mut counts, &mut diffs, &mut flags);
        assert!(!outcome.trivial);
        assert!(outcome.significant);
        assert_eq!(counts.diff_non_trivial, 1);
        assert_eq!(counts.diff_significant, 1);
    }

    #[test]
    fn level_2_immutability_p1() {
        // Same pair, three very different threshold configs: trivial/non-trivial split
        // must not move.
        let cv = ColumnValues::new(30.8, 30.85, 30.8, 1, 2);
        for (sig, crit, print) in [(0.0, 9999.0, 0.0), (5.0, 1.0, 1.0), (-10.0, 50.0, 0.0)] {
            let th = Thresholds::new(sig, crit, print);
            let (mut counts, mut diffs, mut flags) = fresh();
            let outcome = process_element(cv, 0, &th, false, &mut counts, &mut diffs, &mut flags);
            assert!(outcome.trivial, "sig={sig} should stay trivial");
        }
    }

    #[test]
    fn partition_invariant_p3_holds_across_many_elements() {
        let th = Thresholds::new(0.0, 9999.0, 0.0);
        let (mut counts, mut diffs, mut flags) = fresh();
        let pairs = [
            (30.8, 30.85, 1, 2),  // trivial
            (30.8, 30.9, 1, 1),   // non-trivial, significant, below marginal band
            (115.0, 118.0, 1, 1), // non-trivial, significant, marginal band (110-138.47)
            (50.0, 200.0, 1, 1),  // non-trivial, significant, non-marginal (error/non-error split)
        ];
        for (v1, v2, dp1, dp2) in pairs {
            let cv = ColumnValues::new(v1, v2, v1, dp1, dp2);
            process_element(cv, 1, &th, false, &mut counts, &mut diffs, &mut flags);
        }
        assert_eq!(counts.diff_non_zero, counts.diff_trivial + counts.diff_non_trivial);
        assert_eq!(
            counts.diff_non_trivial,
            counts.diff_insignificant + counts.diff_significant
        );
        assert_eq!(
            counts.diff_significant,
            counts.diff_marginal + counts.diff_critical + counts.diff_error + counts.diff_non_error
        );
    }

    #[test]
    fn sensitive_invariant_p2() {
        let th = Thresholds::new(0.0, 9999.0, 0.0);
        let (mut counts, mut diffs, mut flags) = fresh();
        let pairs = [
            (30.8, 30.9, 1, 1),
            (200.0, 201.0, 1, 1), // both above ignore -> high_ignore, insignificant
        ];
        for (v1, v2, dp1, dp2) in pairs {
            let cv = ColumnValues::new(v1, v2, v1, dp1, dp2);
            process_element(cv, 1, &th, false, &mut counts, &mut diffs, &mut flags);
        }
        assert_eq!(
            counts.diff_significant,
            counts.diff_non_trivial - counts.diff_high_ignore
        );
    }

    #[test]
    fn both_above_ignore_is_insignificant_regardless_of_diff_size() {
        let th = Thresholds::new(0.0, 9999.0, 0.0);
        let (mut counts, mut diffs, mut flags) = fresh();
        let cv = ColumnValues::new(200.0, 250.0, 200.0, 1, 1);
        let outcome = process_element(cv, 1, &th, false, &mut counts, &mut diffs, &mut flags);
        assert!(!outcome.significant);
        assert_eq!(counts.diff_high_ignore, 1);
    }

    #[test]
    fn range_column_skips_tl_thresholds() {
        let th = Thresholds::new(0.0, 9999.0, 0.0);
        let (mut counts, mut diffs, mut flags) = fresh();
        // Column 0 values land in the marginal band but column1_is_range_data=true
        // means marginal/critical/ignore logic never applies to it.
        let cv = ColumnValues::new(115.0, 116.0, 115.0, 1, 1);
        let outcome = process_element(cv, 0, &th, true, &mut counts, &mut diffs, &mut flags);
        assert!(outcome.skip_tl);
        assert!(!outcome.marginal);
    }

    #[test]
    fn percent_mode_monotonicity_p6() {
        let cv = ColumnValues::new(100.0, 100.5, 100.0, 1, 1);
        // looser tolerance (10%) should not find this significant, tighter (0.1%) should.
        let loose = Thresholds::new(-10.0, 9999.0, 0.0);
        let tight = Thresholds::new(-0.1, 9999.0, 0.0);
        let (mut c1, mut d1, mut f1) = fresh();
        let (mut c2, mut d2, mut f2) = fresh();
        let loose_outcome = process_element(cv, 1, &loose, false, &mut c1, &mut d1, &mut f1);
        let tight_outcome = process_element(cv, 1, &tight, false, &mut c2, &mut d2, &mut f2);
        assert!(!loose_outcome.significant || tight_outcome.significant);
        assert!(c2.diff_significant >= c1.diff_significant);
    }
}
