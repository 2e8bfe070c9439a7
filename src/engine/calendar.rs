use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;

use crate::model::holiday::Holiday;

/// An unknown IANA identifier means bad seed data, not a recoverable
/// request; fail loudly.
pub fn parse_tz(tz: &str) -> Tz {
    tz.parse()
        .unwrap_or_else(|_| panic!("invalid timezone identifier: {tz}"))
}

/// Company-local calendar date for "now".
pub fn local_today(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

/// Company-local wall-clock time for "now".
pub fn local_time_now(tz: &Tz) -> chrono::NaiveTime {
    Utc::now().with_timezone(tz).time()
}

/// Company-local calendar date of an arbitrary instant.
pub fn local_date(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// String key identifying one calendar day, "YYYY-MM-DD". All history
/// comparisons downstream are string comparisons on these keys.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn today_key(tz: &Tz) -> String {
    date_key(local_today(tz))
}

pub fn key_to_date(key: &str) -> NaiveDate {
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .unwrap_or_else(|_| panic!("malformed date key: {key}"))
}

/// 0=Sunday..6=Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// 1-based week within the month.
pub fn week_of_month(date: NaiveDate) -> u8 {
    ((date.day() - 1) / 7 + 1) as u8
}

/// UTC midnight representing a local calendar date, so calendar identity
/// survives storage round-trips regardless of the company timezone.
pub fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

#[derive(Debug, Clone)]
pub struct ResolvedDay {
    pub date: NaiveDate,
    pub key: String,
    pub day_of_week: u8,
}

/// Contiguous range of `days` days ending at `end` (inclusive), newest
/// first, each pre-resolved so hot loops never re-derive keys or weekdays.
pub fn date_range_back(end: NaiveDate, days: i64) -> Vec<ResolvedDay> {
    (0..days)
        .map(|offset| {
            let date = end - Duration::days(offset);
            ResolvedDay {
                date,
                key: date_key(date),
                day_of_week: day_of_week(date),
            }
        })
        .collect()
}

/// Exact-date holidays match the stored date; recurring holidays match by
/// (month, day) in any year. `date` is already a company-local calendar
/// date, so no further timezone conversion happens here.
pub fn holiday_matches(date: NaiveDate, holiday: &Holiday) -> bool {
    if holiday.is_recurring {
        holiday.date.month() == date.month() && holiday.date.day() == date.day()
    } else {
        holiday.date == date
    }
}

pub fn is_holiday(date: NaiveDate, holidays: &[Holiday]) -> bool {
    holidays.iter().any(|h| holiday_matches(date, h))
}

/// Pre-compute the set of holiday date keys within a resolved range, so
/// the snapshot math can test membership with string lookups.
pub fn holiday_keys_for_range(holidays: &[Holiday], range: &[ResolvedDay]) -> HashSet<String> {
    range
        .iter()
        .filter(|day| is_holiday(day.date, holidays))
        .map(|day| day.key.clone())
        .collect()
}

/// Day-difference between two date keys; pure calendar arithmetic, no
/// timezone involved at this stage.
pub fn days_between_keys(later: &str, earlier: &str) -> i64 {
    key_to_date(later)
        .signed_duration_since(key_to_date(earlier))
        .num_days()
}

/// Whether a local instant falls past the end of the check-in window.
pub fn window_closed(now: chrono::NaiveTime, window_end: chrono::NaiveTime) -> bool {
    now.num_seconds_from_midnight() >= window_end.num_seconds_from_midnight()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holiday(date: &str, recurring: bool) -> Holiday {
        Holiday {
            id: 1,
            company_id: 1,
            date: key_to_date(date),
            is_recurring: recurring,
            name: "test".into(),
        }
    }

    #[test]
    fn day_of_week_is_sunday_based() {
        // 2026-08-30 is a Sunday
        assert_eq!(day_of_week(key_to_date("2026-08-30")), 0);
        assert_eq!(day_of_week(key_to_date("2026-09-05")), 6);
    }

    #[test]
    fn local_date_respects_timezone_near_utc_boundary() {
        // 23:30 UTC on Dec 24 is already Dec 25 in Dhaka (UTC+6)
        let instant = Utc.with_ymd_and_hms(2026, 12, 24, 23, 30, 0).unwrap();
        let dhaka = parse_tz("Asia/Dhaka");
        assert_eq!(local_date(instant, &dhaka), key_to_date("2026-12-25"));
        // ...but still Dec 24 in Los Angeles
        let la = parse_tz("America/Los_Angeles");
        assert_eq!(local_date(instant, &la), key_to_date("2026-12-24"));
    }

    #[test]
    fn recurring_holiday_matches_any_year() {
        let h = holiday("2020-12-25", true);
        assert!(holiday_matches(key_to_date("2026-12-25"), &h));
        assert!(holiday_matches(key_to_date("2030-12-25"), &h));
        assert!(!holiday_matches(key_to_date("2026-12-24"), &h));
        assert!(!holiday_matches(key_to_date("2026-11-25"), &h));
    }

    #[test]
    fn fixed_holiday_matches_exact_date_only() {
        let h = holiday("2026-03-26", false);
        assert!(holiday_matches(key_to_date("2026-03-26"), &h));
        assert!(!holiday_matches(key_to_date("2027-03-26"), &h));
    }

    #[test]
    fn recurring_match_combined_with_tz_day_boundary() {
        // An instant that is Dec 25 only in the company timezone must
        // match a recurring Dec 25 holiday there, and not elsewhere.
        let instant = Utc.with_ymd_and_hms(2026, 12, 24, 20, 0, 0).unwrap();
        let h = holiday("2019-12-25", true);
        let dhaka = parse_tz("Asia/Dhaka");
        let la = parse_tz("America/Los_Angeles");
        assert!(holiday_matches(local_date(instant, &dhaka), &h));
        assert!(!holiday_matches(local_date(instant, &la), &h));
    }

    #[test]
    fn range_is_newest_first_and_contiguous() {
        let range = date_range_back(key_to_date("2026-08-30"), 3);
        let keys: Vec<&str> = range.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["2026-08-30", "2026-08-29", "2026-08-28"]);
        assert_eq!(range[0].day_of_week, 0);
        assert_eq!(range[1].day_of_week, 6);
    }

    #[test]
    fn utc_midnight_preserves_calendar_identity() {
        let dt = utc_midnight(key_to_date("2026-01-01"));
        assert_eq!(dt.date_naive(), key_to_date("2026-01-01"));
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn days_between_keys_is_plain_calendar_math() {
        assert_eq!(days_between_keys("2026-08-30", "2026-08-28"), 2);
        assert_eq!(days_between_keys("2026-03-01", "2026-02-27"), 2);
    }

    #[test]
    fn week_of_month_buckets() {
        assert_eq!(week_of_month(key_to_date("2026-08-01")), 1);
        assert_eq!(week_of_month(key_to_date("2026-08-07")), 1);
        assert_eq!(week_of_month(key_to_date("2026-08-08")), 2);
        assert_eq!(week_of_month(key_to_date("2026-08-30")), 5);
    }
}
