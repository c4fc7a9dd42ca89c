//! Literal end-to-end scenarios from spec.md §8, driving `compare_files`
//! directly (no subprocess).

use indoc::indoc;
use precdiff::accumulation::AccumulationConfig;
use precdiff::orchestrator::compare_files;
use precdiff::types::{Thresholds, Verdict};
use std::io::Write;
use tempfile::NamedTempFile;

fn fixture(contents: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("create temp fixture");
    f.write_all(contents.as_bytes())
        .expect("write temp fixture");
    f
}

/// Scenario 1: `30.8` vs `30.85`, significant=0, critical=9999, print=0.
/// Sub-LSB difference: trivial, not significant, verdict pass.
#[test]
fn scenario_1_sub_lsb_difference_is_trivial_and_passes() {
    let a = fixture("30.8\n");
    let b = fixture("30.85\n");
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.0, 9999.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert_eq!(outcome.report.diff_like.elem_number, 1);
    assert_eq!(outcome.report.diff_like.non_zero, 1);
    assert_eq!(outcome.report.rounded.trivial, 1);
    assert_eq!(outcome.report.significant.significant, 0);
    assert_eq!(outcome.report.verdict, Verdict::Pass);
    assert!(outcome.report.verdicts.files_have_same_values);
    assert!(outcome.report.verdicts.files_are_close_enough);
}

/// A sub-LSB difference still moves the bytes, so `files_are_same` must
/// go false even though the verdict passes (spec §2: the three derived
/// verdicts are independent of the pass/fail/warn verdict).
#[test]
fn sub_lsb_difference_is_not_files_are_same() {
    let a = fixture("30.8\n");
    let b = fixture("30.85\n");
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.0, 9999.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert!(!outcome.report.verdicts.files_are_same);
    assert!(outcome.report.verdicts.files_have_same_values);
}

/// Any significant divergence (even far below the critical threshold)
/// clears both `files_have_same_values` and `files_are_close_enough`
/// (spec §4.5: `files_are_close_enough=false` is set the moment a
/// difference is classified significant, not only on a critical one).
#[test]
fn significant_divergence_clears_same_values_and_close_enough() {
    let a = fixture("30.8\n");
    let b = fixture("30.9\n");
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.0, 9999.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert!(!outcome.report.verdicts.files_have_same_values);
    assert!(!outcome.report.verdicts.files_are_close_enough);
}

/// A critical divergence clears all three derived verdicts.
#[test]
fn critical_divergence_clears_all_derived_verdicts() {
    let a = fixture("1.0 30.8\n2.0 31.0\n3.0 32.0\n4.0 33.0\n5.0 34.0\n");
    let b = fixture("1.0 30.8\n2.0 31.0\n3.0 32.0\n4.0 33.0\n5.0 500.0\n");
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.1, 1.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert!(!outcome.report.verdicts.files_are_same);
    assert!(!outcome.report.verdicts.files_have_same_values);
    assert!(!outcome.report.verdicts.files_are_close_enough);
}

/// Scenario 2: `30.8` vs `30.9`, significant=0 -> non-trivial, significant, fails.
#[test]
fn scenario_2_one_dp_step_is_non_trivial_significant_and_fails() {
    let a = fixture("30.8\n");
    let b = fixture("30.9\n");
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.0, 9999.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert_eq!(outcome.report.rounded.non_trivial, 1);
    assert_eq!(outcome.report.significant.significant, 1);
    assert_eq!(outcome.report.verdict, Verdict::Fail);
}

/// Scenario 3: three-line table, significant=0 -> mixed trivial/non-trivial split.
#[test]
fn scenario_3_mixed_table_splits_trivial_and_non_trivial() {
    let a = fixture(indoc! {"
        10.5
        20.8
        30.7
    "});
    let b = fixture(indoc! {"
        10.54
        20.85
        30.9
    "});
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.0, 9999.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert_eq!(outcome.report.diff_like.non_zero, 3);
    assert_eq!(outcome.report.rounded.trivial, 2);
    assert_eq!(outcome.report.rounded.non_trivial, 1);
    assert_eq!(outcome.report.significant.significant, 1);
}

/// Scenario 4: progressively more precise pi digits, significant=0 -> all
/// trivial, pass.
#[test]
fn scenario_4_increasing_precision_pi_digits_all_trivial() {
    let a = fixture("3.1\n3.14\n3.142\n");
    let b = fixture("3.14\n3.142\n3.1416\n");
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.0, 9999.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert_eq!(outcome.report.significant.significant, 0);
    assert_eq!(outcome.report.verdict, Verdict::Pass);
}

/// Scenario 5: column 0 is monotonically increasing range data with a
/// fixed delta; other columns equal. Range column bypasses TL thresholds.
#[test]
fn scenario_5_range_column_is_detected_and_bypassed() {
    let a = fixture("1.0 10.0\n2.0 11.0\n3.0 12.0\n4.0 13.0\n");
    let b = fixture("1.0 10.0\n2.0 11.0\n3.0 12.0\n4.0 13.0\n");
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.0, 9999.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert!(outcome.report.structure.column1_is_range_data);
    assert_eq!(outcome.report.significant.significant, 0);
    assert_eq!(outcome.report.verdict, Verdict::Pass);
}

/// Scenario 6: TL values above the ignore threshold (~138.47 dB) everywhere;
/// any difference in that band is classified insignificant.
#[test]
fn scenario_6_values_above_ignore_threshold_are_insignificant() {
    let a = fixture("1.0 200.0\n2.0 210.0\n3.0 220.0\n4.0 230.0\n");
    let b = fixture("1.0 205.0\n2.0 215.0\n3.0 225.0\n4.0 235.0\n");
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.0, 9999.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert_eq!(outcome.report.significant.significant, 0);
    assert!(outcome.report.significant.high_ignore > 0);
    assert_eq!(outcome.report.verdict, Verdict::Pass);
}

/// P5: reflexivity — a file compared to itself has zero non-zero
/// differences and passes.
#[test]
fn p5_reflexivity_file_compared_to_itself_passes() {
    let contents = "1.0 30.8\n2.0 95.4\n3.0 112.1\n4.0 140.0\n";
    let a = fixture(contents);
    let b = fixture(contents);
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.1, 9999.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert_eq!(outcome.report.diff_like.non_zero, 0);
    assert_eq!(outcome.report.verdict, Verdict::Pass);
}

#[test]
fn structural_incompatibility_forces_fail_regardless_of_values() {
    let a = fixture("1.0 2.0 3.0\n4.0 5.0 6.0\n");
    let b = fixture("1.0 2.0\n4.0 5.0\n");
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.1, 9999.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert!(!outcome.report.structure.structures_compatible);
    assert_eq!(outcome.report.verdict, Verdict::Fail);
}

#[test]
fn unit_mismatch_is_reported_but_does_not_alone_fail_the_verdict() {
    // column 0 ratios cluster near 1852 (m per nautical mile); other
    // columns identical so no TL-level disagreement drives the verdict.
    let a = fixture(indoc! {"
        1.0 50.0
        2.0 51.0
        3.0 52.0
        4.0 53.0
    "});
    let b = fixture(indoc! {"
        1852.0 50.0
        3704.0 51.0
        5556.0 52.0
        7408.0 53.0
    "});
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.1, 9999.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert!(outcome.report.structure.unit_mismatch.is_some());
}

#[test]
fn percent_mode_flags_relative_difference_beyond_tolerance() {
    let a = fixture("100.0\n");
    let b = fixture("101.0\n");
    // significant = -0.5 -> PERCENT mode, 0.5% tolerance; 1% diff exceeds it.
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(-0.5, 9999.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert_eq!(outcome.report.significant.significant, 1);
}

#[test]
fn critical_threshold_breach_fails_even_with_tiny_fraction_of_elements() {
    let mut a_lines = String::new();
    let mut b_lines = String::new();
    for i in 0..200 {
        a_lines.push_str(&format!("{i}.0 50.0\n"));
        b_lines.push_str(&format!("{i}.0 50.0\n"));
    }
    // Inject one huge disagreement well beyond the critical threshold,
    // kept below the `ignore` band (~138.47 dB) on both sides so it isn't
    // dismissed as an unreliable-magnitude difference.
    a_lines.push_str("200.0 50.0\n");
    b_lines.push_str("200.0 130.0\n");

    let a = fixture(&a_lines);
    let b = fixture(&b_lines);
    let outcome = compare_files(
        a.path(),
        b.path(),
        Thresholds::new(0.1, 10.0, 0.0),
        AccumulationConfig::default(),
        0.0,
        false,
    )
    .unwrap();

    assert!(outcome.report.significant.critical >= 1);
    assert_eq!(outcome.report.verdict, Verdict::Fail);
}
