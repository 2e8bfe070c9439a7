use chrono::{Duration, NaiveDate};
use serde::Serialize;
use sqlx::MySqlPool;
use std::collections::{HashMap, HashSet};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::engine::calendar;
use crate::engine::error::EngineError;
use crate::engine::events::{self, Event, EventKind};
use crate::engine::schedule;
use crate::engine::snapshot::{self, WorkerHistory, HISTORY_DAYS};
use crate::model::company::Company;
use crate::model::holiday::Holiday;
use crate::model::team::Team;
use crate::model::worker::Worker;
use crate::utils::holiday_cache;

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct MissRunReport {
    pub company_id: u64,
    pub workers_checked: u32,
    pub misses_recorded: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Run detection for every active company. A failing tenant is logged and
/// reported; the rest of the batch still runs.
pub async fn run_all(pool: &MySqlPool) -> Vec<MissRunReport> {
    let companies = match sqlx::query_as::<_, Company>(
        "SELECT * FROM companies WHERE is_active = 1",
    )
    .fetch_all(pool)
    .await
    {
        Ok(companies) => companies,
        Err(e) => {
            error!(error = %e, "Failed to load companies for miss detection");
            return Vec::new();
        }
    };

    let run_id = uuid::Uuid::new_v4();
    let mut reports = Vec::with_capacity(companies.len());
    for company in &companies {
        match run_for_company(pool, company).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!(error = %e, company_id = company.id, "Miss detection failed for company");
                reports.push(MissRunReport {
                    company_id: company.id,
                    failed: 1,
                    ..Default::default()
                });
            }
        }
    }
    info!(run_id = %run_id, companies = reports.len(), "Miss-detection sweep finished");
    reports
}

/// Detect today's missed check-ins for one company. Idempotent per
/// (worker, date): already-recorded misses are skipped, so a repeated run
/// creates nothing new.
pub async fn run_for_company(
    pool: &MySqlPool,
    company: &Company,
) -> Result<MissRunReport, EngineError> {
    let tz = calendar::parse_tz(&company.timezone);
    let today = calendar::local_today(&tz);
    let local_now = calendar::local_time_now(&tz);

    let mut report = MissRunReport {
        company_id: company.id,
        ..Default::default()
    };

    // Cached membership answer first; on a holiday nothing else is loaded.
    if holiday_cache::is_holiday(pool, company.id, today).await? {
        info!(company_id = company.id, date = %today, "Holiday; skipping miss detection");
        return Ok(report);
    }

    let holidays = sqlx::query_as::<_, Holiday>(
        "SELECT * FROM holidays WHERE company_id = ?",
    )
    .bind(company.id)
    .fetch_all(pool)
    .await?;

    let teams: HashMap<u64, Team> = sqlx::query_as::<_, Team>(
        "SELECT * FROM teams WHERE company_id = ? AND is_active = 1",
    )
    .bind(company.id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|t| (t.id, t))
    .collect();

    let workers = sqlx::query_as::<_, Worker>(
        "SELECT * FROM workers WHERE company_id = ? AND is_active = 1 AND team_id IS NOT NULL",
    )
    .bind(company.id)
    .fetch_all(pool)
    .await?;

    let dow = calendar::day_of_week(today);
    let mut candidates: Vec<(&Worker, &Team)> = Vec::new();
    for worker in &workers {
        let Some(team) = worker.team_id.and_then(|id| teams.get(&id)) else {
            report.skipped += 1;
            continue;
        };
        let overrides = worker.schedule_override();
        let team_schedule = team.default_schedule();
        if !schedule::is_work_day(dow, &overrides, &team_schedule) {
            report.skipped += 1;
            continue;
        }
        let resolved = schedule::resolve(&overrides, &team_schedule);
        // Window still open locally; nothing to judge yet.
        if !calendar::window_closed(local_now, resolved.window_end) {
            report.skipped += 1;
            continue;
        }
        candidates.push((worker, team));
    }
    report.workers_checked = candidates.len() as u32;
    if candidates.is_empty() {
        return Ok(report);
    }

    let ids: Vec<u64> = candidates.iter().map(|(w, _)| w.id).collect();
    let since = today - Duration::days(HISTORY_DAYS);

    // Check-in and miss history for the whole candidate set, fetched in
    // parallel; everything after this point is in-memory math.
    let (check_in_rows, miss_rows) = futures::try_join!(
        fetch_check_ins(pool, &ids, since),
        fetch_misses(pool, &ids, since)
    )?;

    let today_key = calendar::date_key(today);
    let mut check_ins_by_worker: HashMap<u64, HashMap<String, f64>> = HashMap::new();
    let mut checked_in_today: HashSet<u64> = HashSet::new();
    for (worker_id, date, score) in check_in_rows {
        let key = calendar::date_key(date);
        if key == today_key {
            checked_in_today.insert(worker_id);
        }
        check_ins_by_worker.entry(worker_id).or_default().insert(key, score);
    }

    let mut misses_by_worker: HashMap<u64, Vec<String>> = HashMap::new();
    let mut missed_today: HashSet<u64> = HashSet::new();
    for (worker_id, date) in miss_rows {
        let key = calendar::date_key(date);
        if key == today_key {
            missed_today.insert(worker_id);
        } else {
            misses_by_worker.entry(worker_id).or_default().push(key);
        }
    }

    let leader_names = fetch_leader_names(pool, &teams).await?;

    let missing: Vec<(&Worker, &Team)> = candidates
        .into_iter()
        .filter(|(w, _)| !checked_in_today.contains(&w.id) && !missed_today.contains(&w.id))
        .collect();
    if missing.is_empty() {
        return Ok(report);
    }

    let range = calendar::date_range_back(today, HISTORY_DAYS + 1);
    let holiday_keys = calendar::holiday_keys_for_range(&holidays, &range);

    let histories: Vec<WorkerHistory> = missing
        .iter()
        .map(|(worker, team)| WorkerHistory {
            worker_id: worker.id,
            role_id: worker.role_id,
            schedule: schedule::resolve(&worker.schedule_override(), &team.default_schedule()),
            team_assigned_on: worker
                .team_assigned_at
                .map(|at| calendar::local_date(at, &tz)),
            check_ins: check_ins_by_worker.remove(&worker.id).unwrap_or_default(),
            miss_dates: misses_by_worker.remove(&worker.id).unwrap_or_default(),
        })
        .collect();
    let snapshots = snapshot::calculate_batch(&histories, today, &holiday_keys);

    for (worker, team) in &missing {
        let Some(snap) = snapshots.get(&worker.id) else {
            report.failed += 1;
            continue;
        };
        let window_text = schedule::resolve(&worker.schedule_override(), &team.default_schedule())
            .window_text();
        let leader_name = team.leader_id.and_then(|id| leader_names.get(&id).cloned());

        let insert = sqlx::query(
            r#"
            INSERT INTO missed_check_ins
                (worker_id, team_id, date, window_text, leader_name,
                 role_id, day_of_week, week_of_month,
                 days_since_last_check_in, days_since_last_miss, streak,
                 avg_score_7d, misses_30d, misses_60d, misses_90d,
                 completion_rate, is_first_miss_in_30d, is_increasing_frequency)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(worker.id)
        .bind(team.id)
        .bind(today)
        .bind(&window_text)
        .bind(&leader_name)
        .bind(snap.role_id)
        .bind(snap.day_of_week)
        .bind(snap.week_of_month)
        .bind(snap.days_since_last_check_in)
        .bind(snap.days_since_last_miss)
        .bind(snap.streak)
        .bind(snap.avg_score_7d)
        .bind(snap.misses_30d)
        .bind(snap.misses_60d)
        .bind(snap.misses_90d)
        .bind(snap.completion_rate)
        .bind(snap.is_first_miss_in_30d)
        .bind(snap.is_increasing_frequency)
        .execute(pool)
        .await;

        match insert {
            Ok(_) => {
                report.misses_recorded += 1;
                events::emit(Event {
                    kind: EventKind::MissedCheckInDetected,
                    company_id: company.id,
                    worker_id: worker.id,
                    detail: serde_json::json!({
                        "date": today_key,
                        "team_id": team.id,
                        "window": window_text,
                        "streak_before": snap.streak,
                    }),
                });
            }
            Err(e) => {
                // Duplicate key here means a concurrent run won the
                // insert; anything else is a real failure. Both leave the
                // rest of the batch alone.
                if is_duplicate_key(&e) {
                    report.skipped += 1;
                } else {
                    error!(error = %e, worker_id = worker.id, "Failed to record missed check-in");
                    report.failed += 1;
                }
            }
        }
    }

    info!(
        company_id = company.id,
        checked = report.workers_checked,
        missed = report.misses_recorded,
        skipped = report.skipped,
        failed = report.failed,
        "Miss detection finished"
    );
    Ok(report)
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23000"))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

async fn fetch_check_ins(
    pool: &MySqlPool,
    worker_ids: &[u64],
    since: NaiveDate,
) -> Result<Vec<(u64, NaiveDate, f64)>, sqlx::Error> {
    let sql = format!(
        "SELECT worker_id, date, score FROM check_ins WHERE worker_id IN ({}) AND date >= ?",
        placeholders(worker_ids.len())
    );
    let mut query = sqlx::query_as::<_, (u64, NaiveDate, f64)>(&sql);
    for id in worker_ids {
        query = query.bind(id);
    }
    query.bind(since).fetch_all(pool).await
}

async fn fetch_misses(
    pool: &MySqlPool,
    worker_ids: &[u64],
    since: NaiveDate,
) -> Result<Vec<(u64, NaiveDate)>, sqlx::Error> {
    let sql = format!(
        "SELECT worker_id, date FROM missed_check_ins WHERE worker_id IN ({}) AND date >= ?",
        placeholders(worker_ids.len())
    );
    let mut query = sqlx::query_as::<_, (u64, NaiveDate)>(&sql);
    for id in worker_ids {
        query = query.bind(id);
    }
    query.bind(since).fetch_all(pool).await
}

async fn fetch_leader_names(
    pool: &MySqlPool,
    teams: &HashMap<u64, Team>,
) -> Result<HashMap<u64, String>, sqlx::Error> {
    let leader_ids: Vec<u64> = teams.values().filter_map(|t| t.leader_id).collect();
    if leader_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!(
        "SELECT id, first_name, last_name FROM workers WHERE id IN ({})",
        placeholders(leader_ids.len())
    );
    let mut query = sqlx::query_as::<_, (u64, String, String)>(&sql);
    for id in &leader_ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|(id, first, last)| (id, format!("{first} {last}")))
        .collect())
}
