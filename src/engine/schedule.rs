use chrono::NaiveTime;

/// Merged work-days/window for one worker. Derived on demand from the
/// worker override and team default; never cached across calls because
/// either side can change between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSchedule {
    /// Day numbers 0=Sun..6=Sat
    pub work_days: Vec<u8>,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
}

impl EffectiveSchedule {
    pub fn is_work_day(&self, day_of_week: u8) -> bool {
        self.work_days.contains(&day_of_week)
    }

    /// Human-readable window, captured verbatim on miss records.
    pub fn window_text(&self) -> String {
        format!(
            "{}-{}",
            self.window_start.format("%H:%M"),
            self.window_end.format("%H:%M")
        )
    }
}

/// Per-worker partial override; any subset of the three fields.
#[derive(Debug, Clone, Default)]
pub struct ScheduleOverride {
    pub work_days: Option<Vec<u8>>,
    pub window_start: Option<NaiveTime>,
    pub window_end: Option<NaiveTime>,
}

#[derive(Debug, Clone)]
pub struct TeamSchedule {
    pub work_days: Vec<u8>,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
}

/// Parse a "1,2,3" CSV column into day numbers, dropping anything that is
/// not a digit 0..=6.
pub fn parse_work_days(csv: &str) -> Vec<u8> {
    csv.split(',')
        .filter_map(|part| part.trim().parse::<u8>().ok())
        .filter(|d| *d <= 6)
        .collect()
}

/// Merge a worker override onto the team default, field by field. A worker
/// may override only work-days and keep the team's window, or vice versa.
///
/// Override window fields are written independently of each other, so a
/// partial override can produce an inverted (end <= start) window; in that
/// case both override window fields are discarded and the team window is
/// taken whole. The work-days override is still honored.
pub fn resolve(overrides: &ScheduleOverride, team: &TeamSchedule) -> EffectiveSchedule {
    let work_days = overrides
        .work_days
        .clone()
        .filter(|days| !days.is_empty())
        .unwrap_or_else(|| team.work_days.clone());

    let mut window_start = overrides.window_start.unwrap_or(team.window_start);
    let mut window_end = overrides.window_end.unwrap_or(team.window_end);

    if window_end <= window_start {
        window_start = team.window_start;
        window_end = team.window_end;
    }

    EffectiveSchedule {
        work_days,
        window_start,
        window_end,
    }
}

/// Must agree with `resolve(..).is_work_day(day)` for every input; the
/// cheap path used when only the day membership is needed.
pub fn is_work_day(day_of_week: u8, overrides: &ScheduleOverride, team: &TeamSchedule) -> bool {
    match &overrides.work_days {
        Some(days) if !days.is_empty() => days.contains(&day_of_week),
        _ => team.work_days.contains(&day_of_week),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn team() -> TeamSchedule {
        TeamSchedule {
            work_days: vec![1, 2, 3, 4, 5],
            window_start: t(9, 0),
            window_end: t(11, 0),
        }
    }

    #[test]
    fn no_override_takes_team_schedule_whole() {
        let resolved = resolve(&ScheduleOverride::default(), &team());
        assert_eq!(resolved.work_days, vec![1, 2, 3, 4, 5]);
        assert_eq!(resolved.window_start, t(9, 0));
        assert_eq!(resolved.window_end, t(11, 0));
    }

    #[test]
    fn fields_resolve_independently() {
        let overrides = ScheduleOverride {
            work_days: Some(vec![0, 6]),
            window_start: None,
            window_end: None,
        };
        let resolved = resolve(&overrides, &team());
        assert_eq!(resolved.work_days, vec![0, 6]);
        // window inherited from team
        assert_eq!(resolved.window_start, t(9, 0));
        assert_eq!(resolved.window_end, t(11, 0));
    }

    #[test]
    fn partial_window_override_merges_with_team_side() {
        let overrides = ScheduleOverride {
            work_days: None,
            window_start: Some(t(7, 0)),
            window_end: None,
        };
        let resolved = resolve(&overrides, &team());
        assert_eq!(resolved.window_start, t(7, 0));
        assert_eq!(resolved.window_end, t(11, 0));
        assert_eq!(resolved.work_days, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn inverted_window_falls_back_to_team_window_entirely() {
        // start after the team's end: merged window would be 13:00-11:00
        let overrides = ScheduleOverride {
            work_days: Some(vec![2, 4]),
            window_start: Some(t(13, 0)),
            window_end: None,
        };
        let resolved = resolve(&overrides, &team());
        assert_eq!(resolved.window_start, t(9, 0));
        assert_eq!(resolved.window_end, t(11, 0));
        // work-days override survives the window fallback
        assert_eq!(resolved.work_days, vec![2, 4]);
    }

    #[test]
    fn zero_length_window_is_also_rejected() {
        let overrides = ScheduleOverride {
            work_days: None,
            window_start: Some(t(11, 0)),
            window_end: Some(t(11, 0)),
        };
        let resolved = resolve(&overrides, &team());
        assert_eq!(resolved.window_start, t(9, 0));
        assert_eq!(resolved.window_end, t(11, 0));
    }

    #[test]
    fn resolved_window_is_always_forward() {
        let cases = [
            ScheduleOverride::default(),
            ScheduleOverride {
                window_start: Some(t(23, 0)),
                ..Default::default()
            },
            ScheduleOverride {
                window_end: Some(t(1, 0)),
                ..Default::default()
            },
        ];
        for overrides in &cases {
            let resolved = resolve(overrides, &team());
            assert!(resolved.window_end > resolved.window_start);
        }
    }

    #[test]
    fn is_work_day_agrees_with_resolve_for_all_days() {
        let cases = [
            ScheduleOverride::default(),
            ScheduleOverride {
                work_days: Some(vec![0, 3, 6]),
                ..Default::default()
            },
            ScheduleOverride {
                work_days: Some(vec![]),
                ..Default::default()
            },
            ScheduleOverride {
                work_days: Some(vec![5]),
                window_start: Some(t(20, 0)),
                window_end: Some(t(8, 0)),
                ..Default::default()
            },
        ];
        for overrides in &cases {
            let resolved = resolve(overrides, &team());
            for day in 0u8..=6 {
                assert_eq!(
                    is_work_day(day, overrides, &team()),
                    resolved.is_work_day(day),
                    "disagreement for day {day} with {overrides:?}"
                );
            }
        }
    }

    #[test]
    fn resolved_work_days_never_empty() {
        // An empty override set falls back to the team's days.
        let overrides = ScheduleOverride {
            work_days: Some(vec![]),
            ..Default::default()
        };
        let resolved = resolve(&overrides, &team());
        assert!(!resolved.work_days.is_empty());
    }

    #[test]
    fn parse_work_days_drops_garbage() {
        assert_eq!(parse_work_days("1,2,3"), vec![1, 2, 3]);
        assert_eq!(parse_work_days("0, 6"), vec![0, 6]);
        assert_eq!(parse_work_days("7,8,x,3"), vec![3]);
        assert_eq!(parse_work_days(""), Vec::<u8>::new());
    }

    #[test]
    fn window_text_format() {
        let resolved = resolve(&ScheduleOverride::default(), &team());
        assert_eq!(resolved.window_text(), "09:00-11:00");
    }
}
