use tracing::debug;

use super::error::{EngineError, ensure_finite};
use super::types::{
    DoublingMode, DoublingTimeSummary, Milestone, MilestoneInProgress, NetWorthPoint,
};

pub const DEFAULT_THRESHOLDS: [f64; 5] = [
    100_000.0,
    200_000.0,
    500_000.0,
    1_000_000.0,
    2_000_000.0,
];

/// Scans a monthly net worth history for milestone crossings.
///
/// Geometric mode tracks 2x, 4x, 8x, ... of the first positive snapshot. Threshold
/// mode tracks fixed levels, ignoring every level already met by the first snapshot.
/// A milestone is recorded at most once, and every milestone crossed by the same
/// snapshot shares the previous milestone's point as its start.
pub fn analyze_doubling_time(
    snapshots: &[NetWorthPoint],
    mode: DoublingMode,
    thresholds: &[f64],
) -> Result<DoublingTimeSummary, EngineError> {
    validate_snapshots(snapshots)?;
    for level in thresholds {
        ensure_finite("thresholds", *level)?;
        if *level <= 0.0 {
            return Err(EngineError::validation(
                "thresholds",
                format!("level {level} must be > 0"),
            ));
        }
    }

    if snapshots.len() < 2 {
        return Ok(DoublingTimeSummary {
            mode,
            ..DoublingTimeSummary::default()
        });
    }

    let (milestones, in_progress) = match mode {
        DoublingMode::Geometric => scan_geometric(snapshots),
        DoublingMode::Threshold => scan_thresholds(snapshots, thresholds),
    };
    Ok(summarize(mode, milestones, in_progress))
}

fn validate_snapshots(snapshots: &[NetWorthPoint]) -> Result<(), EngineError> {
    for point in snapshots {
        ensure_finite("snapshots.netWorth", point.net_worth)?;
        if !(1..=12).contains(&point.month) {
            return Err(EngineError::validation(
                "snapshots.month",
                format!("month {} must be between 1 and 12", point.month),
            ));
        }
    }
    for pair in snapshots.windows(2) {
        if pair[1].month_index() <= pair[0].month_index() {
            return Err(EngineError::validation(
                "snapshots",
                format!(
                    "snapshots must be strictly ascending, {} follows {}",
                    pair[1].label(),
                    pair[0].label()
                ),
            ));
        }
    }
    if let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) {
        if u32::try_from(last.month_index() - first.month_index()).is_err() {
            return Err(EngineError::validation(
                "snapshots",
                format!("{} to {} spans too many months", first.label(), last.label()),
            ));
        }
    }
    Ok(())
}

fn scan_geometric(snapshots: &[NetWorthPoint]) -> (Vec<Milestone>, Option<MilestoneInProgress>) {
    let mut milestones = Vec::new();
    let Some(first_positive) = snapshots.iter().position(|p| p.net_worth > 0.0) else {
        return (milestones, None);
    };

    let baseline = snapshots[first_positive].net_worth;
    let mut anchor = snapshots[first_positive];
    let mut multiplier = 2.0;
    for point in &snapshots[first_positive + 1..] {
        let mut crossed = false;
        while point.net_worth >= baseline * multiplier {
            milestones.push(milestone(multiplier, &anchor, point));
            multiplier *= 2.0;
            crossed = true;
        }
        if crossed {
            anchor = *point;
        }
    }

    let latest = snapshots[snapshots.len() - 1];
    let in_progress = progress_towards(multiplier, baseline * multiplier, &anchor, &latest);
    (milestones, Some(in_progress))
}

fn scan_thresholds(
    snapshots: &[NetWorthPoint],
    thresholds: &[f64],
) -> (Vec<Milestone>, Option<MilestoneInProgress>) {
    let start = snapshots[0];
    let mut levels = thresholds.to_vec();
    levels.sort_by(f64::total_cmp);
    levels.dedup();

    let already_met = levels.iter().filter(|&&l| l <= start.net_worth).count();
    if already_met > 0 {
        debug!(
            already_met,
            start = start.net_worth,
            "skipping thresholds already reached by first snapshot"
        );
    }
    let levels = &levels[already_met..];

    let mut milestones = Vec::new();
    let mut anchor = start;
    let mut next = 0;
    for point in &snapshots[1..] {
        let mut crossed = false;
        while next < levels.len() && point.net_worth >= levels[next] {
            milestones.push(milestone(levels[next], &anchor, point));
            next += 1;
            crossed = true;
        }
        if crossed {
            anchor = *point;
        }
    }

    let ever_positive = snapshots.iter().any(|p| p.net_worth > 0.0);
    let in_progress = match levels.get(next) {
        Some(&target) if ever_positive => {
            let latest = snapshots[snapshots.len() - 1];
            Some(progress_towards(target, target, &anchor, &latest))
        }
        _ => None,
    };
    (milestones, in_progress)
}

fn milestone(
    threshold_or_multiplier: f64,
    start: &NetWorthPoint,
    end: &NetWorthPoint,
) -> Milestone {
    Milestone {
        threshold_or_multiplier,
        start_value: start.net_worth,
        end_value: end.net_worth,
        start: *start,
        end: *end,
        period_label: format!("{} to {}", start.label(), end.label()),
        duration_months: months_between(start, end),
    }
}

fn progress_towards(
    threshold_or_multiplier: f64,
    target: f64,
    anchor: &NetWorthPoint,
    latest: &NetWorthPoint,
) -> MilestoneInProgress {
    let span = target - anchor.net_worth;
    let progress = if span > 0.0 {
        ((latest.net_worth - anchor.net_worth) / span * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    MilestoneInProgress {
        threshold_or_multiplier,
        target,
        start_value: anchor.net_worth,
        current_value: latest.net_worth,
        months_elapsed: months_between(anchor, latest),
        progress_percentage: progress,
    }
}

/// Snapshots are ascending and `validate_snapshots` bounds the whole history to `u32` months.
fn months_between(start: &NetWorthPoint, end: &NetWorthPoint) -> u32 {
    let span = (end.month_index() - start.month_index()).clamp(0, i64::from(u32::MAX));
    span as u32
}

fn summarize(
    mode: DoublingMode,
    milestones: Vec<Milestone>,
    current_doubling_in_progress: Option<MilestoneInProgress>,
) -> DoublingTimeSummary {
    let fastest_doubling = milestones
        .iter()
        .min_by_key(|m| m.duration_months)
        .cloned();
    let average_months = if milestones.is_empty() {
        None
    } else {
        let total: u64 = milestones.iter().map(|m| u64::from(m.duration_months)).sum();
        Some(total as f64 / milestones.len() as f64)
    };

    DoublingTimeSummary {
        mode,
        total_doublings: milestones.len(),
        milestones,
        fastest_doubling,
        average_months,
        current_doubling_in_progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
    use proptest::collection::vec;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    /// Consecutive monthly points starting January 2020.
    fn monthly(values: &[f64]) -> Vec<NetWorthPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &net_worth)| NetWorthPoint {
                year: 2020 + (i / 12) as i32,
                month: (i % 12) as u32 + 1,
                net_worth,
            })
            .collect()
    }

    #[test]
    fn fewer_than_two_snapshots_is_empty() {
        for snapshots in [Vec::new(), monthly(&[50_000.0])] {
            let summary = analyze_doubling_time(&snapshots, DoublingMode::Geometric, &[])
                .expect("valid input");
            assert!(summary.milestones.is_empty());
            assert!(summary.fastest_doubling.is_none());
            assert!(summary.average_months.is_none());
            assert_eq!(summary.total_doublings, 0);
            assert!(summary.current_doubling_in_progress.is_none());
        }
    }

    #[test]
    fn geometric_tracks_multiples_of_the_original_baseline() {
        // 250 overshoots 2x; 400 is 4x of the baseline even though it is < 2 * 250
        let snapshots = monthly(&[100.0, 150.0, 250.0, 300.0, 400.0, 500.0]);
        let summary = analyze_doubling_time(&snapshots, DoublingMode::Geometric, &[])
            .expect("valid input");

        assert_eq!(summary.total_doublings, 2);
        let first = &summary.milestones[0];
        assert_approx(first.threshold_or_multiplier, 2.0);
        assert_approx(first.start_value, 100.0);
        assert_approx(first.end_value, 250.0);
        assert_eq!(first.duration_months, 2);
        assert_eq!(first.period_label, "2020-01 to 2020-03");

        let second = &summary.milestones[1];
        assert_approx(second.threshold_or_multiplier, 4.0);
        assert_approx(second.start_value, 250.0);
        assert_approx(second.end_value, 400.0);
        assert_eq!(second.duration_months, 2);

        let progress = summary
            .current_doubling_in_progress
            .expect("8x in progress");
        assert_approx(progress.target, 800.0);
        assert_approx(progress.start_value, 400.0);
        assert_approx(progress.current_value, 500.0);
        assert_approx(progress.progress_percentage, 25.0);
        assert_eq!(progress.months_elapsed, 1);
    }

    #[test]
    fn geometric_waits_for_a_positive_baseline() {
        let snapshots = monthly(&[-20_000.0, 0.0, 10_000.0, 15_000.0, 20_000.0]);
        let summary = analyze_doubling_time(&snapshots, DoublingMode::Geometric, &[])
            .expect("valid input");

        assert_eq!(summary.total_doublings, 1);
        assert_approx(summary.milestones[0].start_value, 10_000.0);
        assert_eq!(summary.milestones[0].duration_months, 2);
    }

    #[test]
    fn all_negative_history_has_no_milestones_or_progress() {
        let snapshots = monthly(&[-5_000.0, -4_000.0, -3_000.0]);
        for mode in [DoublingMode::Geometric, DoublingMode::Threshold] {
            let summary =
                analyze_doubling_time(&snapshots, mode, &DEFAULT_THRESHOLDS).expect("valid input");
            assert!(summary.milestones.is_empty());
            assert!(summary.current_doubling_in_progress.is_none());
        }
    }

    #[test]
    fn threshold_mode_skips_levels_already_surpassed_at_start() {
        let snapshots = monthly(&[164_000.0, 180_000.0, 195_000.0, 205_000.0, 260_000.0]);
        let summary =
            analyze_doubling_time(&snapshots, DoublingMode::Threshold, &DEFAULT_THRESHOLDS)
                .expect("valid input");

        assert_eq!(summary.total_doublings, 1);
        assert!(
            summary
                .milestones
                .iter()
                .all(|m| m.threshold_or_multiplier != 100_000.0 && m.duration_months > 0)
        );
        let first = &summary.milestones[0];
        assert_approx(first.threshold_or_multiplier, 200_000.0);
        assert_approx(first.start_value, 164_000.0);
        assert_eq!(first.duration_months, 3);

        let progress = summary
            .current_doubling_in_progress
            .expect("500k in progress");
        assert_approx(progress.target, 500_000.0);
        assert_approx(progress.progress_percentage, 55_000.0 / 295_000.0 * 100.0);
    }

    #[test]
    fn threshold_mode_accepts_unsorted_duplicate_levels() {
        let snapshots = monthly(&[50_000.0, 120_000.0, 210_000.0]);
        let summary = analyze_doubling_time(
            &snapshots,
            DoublingMode::Threshold,
            &[200_000.0, 100_000.0, 100_000.0],
        )
        .expect("valid input");

        let levels: Vec<f64> = summary
            .milestones
            .iter()
            .map(|m| m.threshold_or_multiplier)
            .collect();
        assert_eq!(levels, vec![100_000.0, 200_000.0]);
        assert!(summary.current_doubling_in_progress.is_none());
    }

    #[test]
    fn oscillation_around_a_level_records_it_once() {
        let snapshots = monthly(&[
            90_000.0, 101_000.0, 95_000.0, 102_000.0, 99_000.0, 150_000.0,
        ]);
        let summary =
            analyze_doubling_time(&snapshots, DoublingMode::Threshold, &DEFAULT_THRESHOLDS)
                .expect("valid input");

        assert_eq!(summary.total_doublings, 1);
        assert_eq!(summary.milestones[0].duration_months, 1);
        let progress = summary
            .current_doubling_in_progress
            .expect("200k in progress");
        // anchored at the 101k crossing
        assert_approx(progress.start_value, 101_000.0);
        assert_eq!(progress.months_elapsed, 4);
    }

    #[test]
    fn one_jump_over_several_levels_shares_the_start_point() {
        let snapshots = monthly(&[90_000.0, 95_000.0, 600_000.0]);
        let summary =
            analyze_doubling_time(&snapshots, DoublingMode::Threshold, &DEFAULT_THRESHOLDS)
                .expect("valid input");

        assert_eq!(summary.total_doublings, 3);
        for m in &summary.milestones {
            assert_approx(m.start_value, 90_000.0);
            assert_eq!(m.duration_months, 2);
        }
    }

    #[test]
    fn summary_statistics_use_completed_milestones() {
        let mut snapshots = monthly(&[100.0; 13]);
        snapshots[6].net_worth = 200.0;
        snapshots[12].net_worth = 400.0;
        for point in snapshots.iter_mut().skip(7).take(5) {
            point.net_worth = 250.0;
        }
        let summary = analyze_doubling_time(&snapshots, DoublingMode::Geometric, &[])
            .expect("valid input");

        assert_eq!(summary.total_doublings, 2);
        assert_eq!(summary.milestones[0].duration_months, 6);
        assert_eq!(summary.milestones[1].duration_months, 6);
        assert_approx(summary.average_months.expect("average"), 6.0);
        let fastest = summary.fastest_doubling.expect("fastest");
        assert_approx(fastest.threshold_or_multiplier, 2.0);
    }

    #[test]
    fn irregular_spacing_counts_calendar_months() {
        let snapshots = vec![
            NetWorthPoint {
                year: 2019,
                month: 11,
                net_worth: 10_000.0,
            },
            NetWorthPoint {
                year: 2021,
                month: 2,
                net_worth: 21_000.0,
            },
        ];
        let summary = analyze_doubling_time(&snapshots, DoublingMode::Geometric, &[])
            .expect("valid input");
        assert_eq!(summary.milestones[0].duration_months, 15);
    }

    #[test]
    fn rejects_malformed_snapshots() {
        let mut unordered = monthly(&[1.0, 2.0, 3.0]);
        unordered.swap(0, 2);
        let err = analyze_doubling_time(&unordered, DoublingMode::Geometric, &[])
            .expect_err("must reject unordered");
        assert_eq!(err.field(), "snapshots");

        let mut bad_month = monthly(&[1.0, 2.0]);
        bad_month[1].month = 13;
        let err = analyze_doubling_time(&bad_month, DoublingMode::Geometric, &[])
            .expect_err("must reject month 13");
        assert_eq!(err.field(), "snapshots.month");

        let nan = monthly(&[1.0, f64::NAN]);
        let err = analyze_doubling_time(&nan, DoublingMode::Geometric, &[])
            .expect_err("must reject NaN");
        assert_eq!(err.field(), "snapshots.netWorth");
    }

    #[test]
    fn geometric_multiples_do_not_rebase_on_an_overshoot() {
        // rebasing on the 250 crossing would need 500 for the next milestone
        let snapshots = monthly(&[100.0, 250.0, 400.0]);
        let summary = analyze_doubling_time(&snapshots, DoublingMode::Geometric, &[])
            .expect("valid input");

        let multipliers: Vec<f64> = summary
            .milestones
            .iter()
            .map(|m| m.threshold_or_multiplier)
            .collect();
        assert_eq!(multipliers, vec![2.0, 4.0]);
        assert_approx(summary.milestones[1].start_value, 250.0);
        assert_approx(summary.milestones[1].end_value, 400.0);

        // threshold mode on the same path applies the same skip rule to a level met at start
        let summary = analyze_doubling_time(
            &snapshots,
            DoublingMode::Threshold,
            &[100.0, 200.0, 400.0, 500.0],
        )
        .expect("valid input");
        let levels: Vec<f64> = summary
            .milestones
            .iter()
            .map(|m| m.threshold_or_multiplier)
            .collect();
        assert_eq!(levels, vec![200.0, 400.0]);
        let progress = summary
            .current_doubling_in_progress
            .expect("500 in progress");
        assert_approx(progress.target, 500.0);
    }

    #[test]
    fn rejects_non_positive_threshold_levels() {
        let snapshots = monthly(&[-5_000.0, -500.0]);
        for levels in [[-1_000.0], [0.0]] {
            let err = analyze_doubling_time(&snapshots, DoublingMode::Threshold, &levels)
                .expect_err("must reject non-positive level");
            assert_eq!(err.field(), "thresholds");
        }
    }

    #[test]
    fn rejects_histories_spanning_too_many_months() {
        let snapshots = vec![
            NetWorthPoint {
                year: -2_000_000_000,
                month: 1,
                net_worth: 1.0,
            },
            NetWorthPoint {
                year: 2_000_000_000,
                month: 1,
                net_worth: 2.0,
            },
        ];
        let err = analyze_doubling_time(&snapshots, DoublingMode::Geometric, &[])
            .expect_err("must reject span beyond u32 months");
        assert_eq!(err.field(), "snapshots");
    }

    #[test]
    fn long_milestone_durations_average_without_overflow() {
        // one jump over four multiples, each lasting 3.6e9 months
        let snapshots = vec![
            NetWorthPoint {
                year: 0,
                month: 1,
                net_worth: 1.0,
            },
            NetWorthPoint {
                year: 300_000_000,
                month: 1,
                net_worth: 16.0,
            },
        ];
        let summary = analyze_doubling_time(&snapshots, DoublingMode::Geometric, &[])
            .expect("valid input");

        assert_eq!(summary.total_doublings, 4);
        let total: u64 = summary
            .milestones
            .iter()
            .map(|m| u64::from(m.duration_months))
            .sum();
        assert!(total > u64::from(u32::MAX));
        assert_approx(summary.average_months.expect("average"), 3_600_000_000.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_milestones_are_unique_and_increasing(
            values in vec(-50_000i64..3_000_000, 2..60),
            geometric in proptest::bool::ANY,
        ) {
            let snapshots = monthly(&values.iter().map(|&v| v as f64).collect::<Vec<_>>());
            let mode = if geometric { DoublingMode::Geometric } else { DoublingMode::Threshold };
            let summary = analyze_doubling_time(&snapshots, mode, &DEFAULT_THRESHOLDS)
                .expect("valid input");

            prop_assert_eq!(summary.total_doublings, summary.milestones.len());
            for pair in summary.milestones.windows(2) {
                prop_assert!(pair[1].threshold_or_multiplier > pair[0].threshold_or_multiplier);
                prop_assert!(pair[1].end.month_index() >= pair[0].end.month_index());
            }
            if let Some(progress) = &summary.current_doubling_in_progress {
                prop_assert!((0.0..=100.0).contains(&progress.progress_percentage));
            }

            let again = analyze_doubling_time(&snapshots, mode, &DEFAULT_THRESHOLDS)
                .expect("valid input");
            prop_assert_eq!(summary, again);
        }
    }
}
