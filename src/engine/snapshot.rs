use chrono::{Duration, NaiveDate};
use std::collections::{HashMap, HashSet};

use crate::engine::calendar::{self, ResolvedDay};
use crate::engine::schedule::EffectiveSchedule;
use crate::model::missed_check_in::AttendanceSnapshot;

/// How much history is pre-fetched per worker; everything the snapshot
/// math looks at falls inside this window.
pub const HISTORY_DAYS: i64 = 90;

/// Pre-fetched per-worker history. Check-ins and misses are keyed by
/// company-local date keys ("YYYY-MM-DD"), already normalized by the
/// calendar; all math below is string comparison and integer arithmetic.
#[derive(Debug)]
pub struct WorkerHistory {
    pub worker_id: u64,
    pub role_id: u8,
    pub schedule: EffectiveSchedule,
    /// Local calendar date the worker joined their current team
    pub team_assigned_on: Option<NaiveDate>,
    /// date key -> readiness score
    pub check_ins: HashMap<String, f64>,
    /// date keys of prior misses, any order
    pub miss_dates: Vec<String>,
}

/// Round half away from zero, one decimal. f64::round already rounds
/// half away from zero, so scaling is enough.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Compute snapshots for a batch of workers against one reference date.
/// The history has been batch-fetched up front; this is pure computation.
pub fn calculate_batch(
    workers: &[WorkerHistory],
    reference_date: NaiveDate,
    holiday_keys: &HashSet<String>,
) -> HashMap<u64, AttendanceSnapshot> {
    // One shared backward range for the whole batch; the per-worker walk
    // only differs in which days count as required.
    let range = calendar::date_range_back(reference_date - Duration::days(1), HISTORY_DAYS);

    workers
        .iter()
        .map(|worker| {
            (
                worker.worker_id,
                calculate_one(worker, reference_date, &range, holiday_keys),
            )
        })
        .collect()
}

fn calculate_one(
    worker: &WorkerHistory,
    reference_date: NaiveDate,
    range: &[ResolvedDay],
    holiday_keys: &HashSet<String>,
) -> AttendanceSnapshot {
    let reference_key = calendar::date_key(reference_date);

    let streak = streak(worker, range, holiday_keys);

    let days_since_last_check_in = worker
        .check_ins
        .keys()
        .max()
        .map(|latest| calendar::days_between_keys(&reference_key, latest).abs());
    let days_since_last_miss = worker
        .miss_dates
        .iter()
        .max()
        .map(|latest| calendar::days_between_keys(&reference_key, latest).abs());

    let threshold_30 = calendar::date_key(reference_date - Duration::days(30));
    let threshold_60 = calendar::date_key(reference_date - Duration::days(60));
    let threshold_90 = calendar::date_key(reference_date - Duration::days(90));
    let misses_30d = count_since(&worker.miss_dates, &threshold_30);
    let misses_60d = count_since(&worker.miss_dates, &threshold_60);
    let misses_90d = count_since(&worker.miss_dates, &threshold_90);

    let threshold_7 = calendar::date_key(reference_date - Duration::days(7));
    let recent_scores: Vec<f64> = worker
        .check_ins
        .iter()
        .filter(|(key, _)| key.as_str() >= threshold_7.as_str())
        .map(|(_, score)| *score)
        .collect();
    let avg_score_7d = if recent_scores.is_empty() {
        0.0
    } else {
        round1(recent_scores.iter().sum::<f64>() / recent_scores.len() as f64)
    };

    let completion_rate = completion_rate(worker, reference_date, range, holiday_keys);

    // A trend needs both a per-day rate increase and a minimum sample, so
    // one recent miss alone never flags.
    let rate_30 = misses_30d as f64 / 30.0;
    let rate_60 = misses_60d as f64 / 60.0;
    let is_increasing_frequency = rate_30 > rate_60 && misses_30d >= 2;

    AttendanceSnapshot {
        role_id: worker.role_id,
        day_of_week: calendar::day_of_week(reference_date),
        week_of_month: calendar::week_of_month(reference_date),
        days_since_last_check_in,
        days_since_last_miss,
        streak,
        avg_score_7d,
        misses_30d,
        misses_60d,
        misses_90d,
        completion_rate,
        is_first_miss_in_30d: misses_30d == 0,
        is_increasing_frequency,
    }
}

/// Walk backward from the day before the reference date. Holidays and
/// non-work days are transparent: they neither extend nor break the
/// streak. The first required day without a check-in ends it.
fn streak(worker: &WorkerHistory, range: &[ResolvedDay], holiday_keys: &HashSet<String>) -> i64 {
    let mut streak = 0;
    for day in range {
        if holiday_keys.contains(&day.key) || !worker.schedule.is_work_day(day.day_of_week) {
            continue;
        }
        if worker.check_ins.contains_key(&day.key) {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

fn count_since(miss_dates: &[String], threshold_key: &str) -> i64 {
    miss_dates
        .iter()
        .filter(|key| key.as_str() >= threshold_key)
        .count() as i64
}

/// Check-ins since team assignment over required work days since team
/// assignment, excluding holidays and the reference date itself. A
/// brand-new assignment with zero required days scores 100.
///
/// The worker's current effective schedule is applied to past days as
/// well; schedule changes are not versioned, which is a known
/// approximation carried over deliberately.
fn completion_rate(
    worker: &WorkerHistory,
    reference_date: NaiveDate,
    range: &[ResolvedDay],
    holiday_keys: &HashSet<String>,
) -> f64 {
    let Some(assigned_on) = worker.team_assigned_on else {
        return 100.0;
    };
    // History is only fetched HISTORY_DAYS back; older assignments are
    // measured within the fetched window.
    let window_start = reference_date - Duration::days(HISTORY_DAYS);
    let since = assigned_on.max(window_start);
    let since_key = calendar::date_key(since);

    let required = range
        .iter()
        .filter(|day| {
            day.key.as_str() >= since_key.as_str()
                && !holiday_keys.contains(&day.key)
                && worker.schedule.is_work_day(day.day_of_week)
        })
        .count();
    if required == 0 {
        return 100.0;
    }

    let completed = worker
        .check_ins
        .keys()
        .filter(|key| key.as_str() >= since_key.as_str())
        .count();

    round1(completed as f64 / required as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::calendar::key_to_date;
    use chrono::NaiveTime;

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn all_days_schedule() -> EffectiveSchedule {
        EffectiveSchedule {
            work_days: vec![0, 1, 2, 3, 4, 5, 6],
            window_start: t(9),
            window_end: t(11),
        }
    }

    fn worker(check_in_keys: &[&str], miss_keys: &[&str]) -> WorkerHistory {
        WorkerHistory {
            worker_id: 1,
            role_id: 3,
            schedule: all_days_schedule(),
            team_assigned_on: Some(key_to_date("2026-01-01")),
            check_ins: check_in_keys.iter().map(|k| (k.to_string(), 8.0)).collect(),
            miss_dates: miss_keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn snapshot_for(worker: WorkerHistory, reference: &str) -> AttendanceSnapshot {
        snapshot_with_holidays(worker, reference, &[])
    }

    fn snapshot_with_holidays(
        worker: WorkerHistory,
        reference: &str,
        holiday_keys: &[&str],
    ) -> AttendanceSnapshot {
        let holidays: HashSet<String> = holiday_keys.iter().map(|k| k.to_string()).collect();
        let result = calculate_batch(&[worker], key_to_date(reference), &holidays);
        result.into_values().next().unwrap()
    }

    #[test]
    fn round1_is_half_away_from_zero() {
        assert_eq!(round1(2.25), 2.3);
        assert_eq!(round1(-2.25), -2.3);
        assert_eq!(round1(2.24), 2.2);
        assert_eq!(round1(66.666), 66.7);
    }

    #[test]
    fn unbroken_check_ins_give_matching_streak() {
        let w = worker(&["2026-08-27", "2026-08-28", "2026-08-29"], &[]);
        let snap = snapshot_for(w, "2026-08-30");
        assert_eq!(snap.streak, 3);
    }

    #[test]
    fn missing_required_day_cuts_streak_to_recent_run() {
        // check-ins on T-1 and T-2, nothing on T-3, all required
        let w = worker(&["2026-08-28", "2026-08-29"], &[]);
        let snap = snapshot_for(w, "2026-08-30");
        assert_eq!(snap.streak, 2);
    }

    #[test]
    fn holiday_gap_does_not_break_streak() {
        // T-2 is a holiday with no check-in; T-1 and T-3 are covered
        let w = worker(&["2026-08-27", "2026-08-29"], &[]);
        let snap = snapshot_with_holidays(w, "2026-08-30", &["2026-08-28"]);
        assert_eq!(snap.streak, 2);
    }

    #[test]
    fn non_work_day_gap_does_not_break_streak() {
        // weekdays-only schedule; the weekend gap is transparent
        let mut w = worker(&["2026-08-27", "2026-08-28"], &[]);
        w.schedule.work_days = vec![1, 2, 3, 4, 5];
        // reference Monday 2026-08-31: Sun 30 and Sat 29 are skipped,
        // Fri 28 and Thu 27 count
        let snap = snapshot_for(w, "2026-08-31");
        assert_eq!(snap.streak, 2);
    }

    #[test]
    fn streak_zero_when_yesterday_required_and_missing() {
        let w = worker(&["2026-08-28"], &[]);
        let snap = snapshot_for(w, "2026-08-30");
        assert_eq!(snap.streak, 0);
    }

    #[test]
    fn recency_metrics_are_day_differences() {
        let w = worker(&["2026-08-25"], &["2026-08-20"]);
        let snap = snapshot_for(w, "2026-08-30");
        assert_eq!(snap.days_since_last_check_in, Some(5));
        assert_eq!(snap.days_since_last_miss, Some(10));
    }

    #[test]
    fn recency_none_when_no_history() {
        let snap = snapshot_for(worker(&[], &[]), "2026-08-30");
        assert_eq!(snap.days_since_last_check_in, None);
        assert_eq!(snap.days_since_last_miss, None);
    }

    #[test]
    fn windowed_miss_counts_use_thresholds() {
        // reference 2026-08-30: thresholds 07-31 (30d), 07-01 (60d), 06-01 (90d)
        let w = worker(
            &[],
            &["2026-08-20", "2026-08-01", "2026-07-15", "2026-06-10"],
        );
        let snap = snapshot_for(w, "2026-08-30");
        assert_eq!(snap.misses_30d, 2);
        assert_eq!(snap.misses_60d, 3);
        assert_eq!(snap.misses_90d, 4);
    }

    #[test]
    fn first_miss_flag_requires_clean_30_days() {
        let clean = snapshot_for(worker(&[], &["2026-06-10"]), "2026-08-30");
        assert!(clean.is_first_miss_in_30d);

        let recent = snapshot_for(worker(&[], &["2026-08-20"]), "2026-08-30");
        assert!(!recent.is_first_miss_in_30d);
    }

    #[test]
    fn increasing_frequency_needs_rate_increase_and_two_misses() {
        // one recent miss: rate increased but sample too small
        let single = snapshot_for(worker(&[], &["2026-08-20"]), "2026-08-30");
        assert!(!single.is_increasing_frequency);

        // two recent misses, nothing older: 2/30 > 2/60
        let rising = snapshot_for(worker(&[], &["2026-08-20", "2026-08-25"]), "2026-08-30");
        assert!(rising.is_increasing_frequency);

        // two recent but heavy older history: 2/30 < 6/60
        let steady = snapshot_for(
            worker(
                &[],
                &[
                    "2026-08-20", "2026-08-25", "2026-07-05", "2026-07-10", "2026-07-15",
                    "2026-07-20",
                ],
            ),
            "2026-08-30",
        );
        assert!(!steady.is_increasing_frequency);
    }

    #[test]
    fn completion_rate_counts_required_days_only() {
        // assigned 5 days before reference; 4 required days remain after
        // excluding a holiday; the reference date itself is excluded
        let mut w = worker(
            &["2026-08-25", "2026-08-26", "2026-08-28"],
            &["2026-08-29"],
        );
        w.team_assigned_on = Some(key_to_date("2026-08-25"));
        let snap = snapshot_with_holidays(w, "2026-08-30", &["2026-08-27"]);
        // required: 25, 26, 28, 29; completed: 25, 26, 28
        assert_eq!(snap.completion_rate, 75.0);
    }

    #[test]
    fn completion_rate_is_100_for_fresh_assignment() {
        let mut w = worker(&[], &[]);
        w.team_assigned_on = Some(key_to_date("2026-08-30"));
        let snap = snapshot_for(w, "2026-08-30");
        assert_eq!(snap.completion_rate, 100.0);
    }

    #[test]
    fn completion_rate_rounds_to_one_decimal() {
        // 2 of 3 required days = 66.666..%
        let mut w = worker(&["2026-08-27", "2026-08-28"], &[]);
        w.team_assigned_on = Some(key_to_date("2026-08-27"));
        let snap = snapshot_for(w, "2026-08-30");
        assert_eq!(snap.completion_rate, 66.7);
    }

    #[test]
    fn avg_score_covers_trailing_week() {
        let mut w = worker(&[], &[]);
        w.check_ins.insert("2026-08-28".into(), 9.0);
        w.check_ins.insert("2026-08-29".into(), 8.0);
        // outside the 7-day window
        w.check_ins.insert("2026-08-01".into(), 1.0);
        let snap = snapshot_for(w, "2026-08-30");
        assert_eq!(snap.avg_score_7d, 8.5);
    }

    #[test]
    fn calendar_context_fields() {
        let snap = snapshot_for(worker(&[], &[]), "2026-08-30");
        assert_eq!(snap.day_of_week, 0); // Sunday
        assert_eq!(snap.week_of_month, 5);
        assert_eq!(snap.role_id, 3);
    }

    #[test]
    fn batch_keys_by_worker_id() {
        let mut a = worker(&["2026-08-29"], &[]);
        a.worker_id = 7;
        let mut b = worker(&[], &[]);
        b.worker_id = 8;
        let result = calculate_batch(&[a, b], key_to_date("2026-08-30"), &HashSet::new());
        assert_eq!(result.len(), 2);
        assert_eq!(result[&7].streak, 1);
        assert_eq!(result[&8].streak, 0);
    }
}
