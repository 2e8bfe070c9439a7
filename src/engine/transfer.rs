use chrono::{Duration, NaiveDate};
use serde::Serialize;
use sqlx::MySqlPool;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::engine::calendar;
use crate::engine::error::EngineError;
use crate::engine::events::{self, CancelReason, Event, EventKind};
use crate::model::company::Company;
use crate::model::role::Role;
use crate::model::team::Team;
use crate::model::worker::Worker;

/// What a team-change request should do, decided before any write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPlan {
    /// Worker has no team yet; assign directly, no pending state.
    Immediate,
    /// Worker is moving between teams; takes effect tomorrow,
    /// company-local. The worker keeps the current team's schedule until
    /// the transfer applies.
    Scheduled { effective_date: NaiveDate },
    /// Target equals the current team; any pending transfer is cancelled.
    SameTeam,
}

/// Decide the transition for a team-change request. Pure; all conflict
/// and validation rules live here.
pub fn plan_team_change(
    worker: &Worker,
    target_team: &Team,
    today: NaiveDate,
) -> Result<TransferPlan, EngineError> {
    if !target_team.is_active {
        return Err(EngineError::Validation(
            "Target team is inactive".to_string(),
        ));
    }
    if worker.company_id != target_team.company_id {
        return Err(EngineError::Validation(
            "Worker and team belong to different companies".to_string(),
        ));
    }
    if worker.team_id == Some(target_team.id) {
        return Ok(TransferPlan::SameTeam);
    }
    if worker.has_pending_transfer() {
        return Err(EngineError::Conflict(
            "A transfer is already pending for this worker; cancel it first".to_string(),
        ));
    }
    if worker.team_id.is_none() {
        return Ok(TransferPlan::Immediate);
    }
    Ok(TransferPlan::Scheduled {
        effective_date: today + Duration::days(1),
    })
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    Assigned { team_id: u64 },
    Scheduled {
        team_id: u64,
        #[schema(value_type = String, format = "date")]
        effective_date: NaiveDate,
    },
    PendingCancelled,
    NoChange,
}

/// Synchronous entry point for the person/team update flows.
pub async fn request_team_change(
    pool: &MySqlPool,
    worker_id: u64,
    target_team_id: u64,
    initiated_by: u64,
) -> Result<TransferOutcome, EngineError> {
    let worker = find_worker(pool, worker_id).await?;
    let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = ?")
        .bind(target_team_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| EngineError::NotFound("Team not found".to_string()))?;
    let company = find_company(pool, worker.company_id).await?;

    let tz = calendar::parse_tz(&company.timezone);
    let today = calendar::local_today(&tz);

    match plan_team_change(&worker, &team, today)? {
        TransferPlan::SameTeam => {
            if cancel_pending(pool, &worker, CancelReason::SameTeam).await? {
                Ok(TransferOutcome::PendingCancelled)
            } else {
                Ok(TransferOutcome::NoChange)
            }
        }
        TransferPlan::Immediate => {
            sqlx::query(
                "UPDATE workers SET team_id = ?, team_assigned_at = NOW() WHERE id = ?",
            )
            .bind(team.id)
            .bind(worker.id)
            .execute(pool)
            .await?;
            events::emit(Event {
                kind: EventKind::TeamTransferCompleted,
                company_id: worker.company_id,
                worker_id: worker.id,
                detail: serde_json::json!({ "team_id": team.id, "immediate": true }),
            });
            info!(worker_id = worker.id, team_id = team.id, "Immediate team assignment");
            Ok(TransferOutcome::Assigned { team_id: team.id })
        }
        TransferPlan::Scheduled { effective_date } => {
            // The pending predicate in the WHERE clause closes the race
            // with a concurrent request; zero rows means someone beat us.
            let result = sqlx::query(
                r#"
                UPDATE workers
                SET effective_team_id = ?,
                    effective_transfer_date = ?,
                    transfer_initiated_by = ?
                WHERE id = ? AND effective_team_id IS NULL
                "#,
            )
            .bind(team.id)
            .bind(effective_date)
            .bind(initiated_by)
            .bind(worker.id)
            .execute(pool)
            .await?;
            if result.rows_affected() == 0 {
                return Err(EngineError::Conflict(
                    "A transfer is already pending for this worker; cancel it first".to_string(),
                ));
            }
            events::emit(Event {
                kind: EventKind::TeamTransferInitiated,
                company_id: worker.company_id,
                worker_id: worker.id,
                detail: serde_json::json!({
                    "team_id": team.id,
                    "effective_date": calendar::date_key(effective_date),
                }),
            });
            info!(
                worker_id = worker.id,
                team_id = team.id,
                effective_date = %effective_date,
                "Team transfer scheduled"
            );
            Ok(TransferOutcome::Scheduled {
                team_id: team.id,
                effective_date,
            })
        }
    }
}

/// Clear the pending triple if one is set. Returns whether anything was
/// cancelled; emits exactly one cancellation event when it was.
pub async fn cancel_pending(
    pool: &MySqlPool,
    worker: &Worker,
    reason: CancelReason,
) -> Result<bool, EngineError> {
    let result = sqlx::query(
        r#"
        UPDATE workers
        SET effective_team_id = NULL,
            effective_transfer_date = NULL,
            transfer_initiated_by = NULL
        WHERE id = ? AND effective_team_id IS NOT NULL
        "#,
    )
    .bind(worker.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }
    events::emit(events::transfer_cancelled(worker.company_id, worker.id, reason));
    info!(worker_id = worker.id, reason = %reason, "Pending transfer cancelled");
    Ok(true)
}

/// Which cascade, if any, a worker update triggers. Deactivation takes
/// precedence when both apply in one request.
pub fn worker_update_cascade(
    new_role_id: Option<u8>,
    new_is_active: Option<bool>,
) -> Option<CancelReason> {
    if new_is_active == Some(false) {
        return Some(CancelReason::Deactivation);
    }
    if let Some(role_id) = new_role_id {
        let needs_team = Role::from_id(role_id).map(|r| r.requires_team()).unwrap_or(false);
        if !needs_team {
            return Some(CancelReason::RoleChanged);
        }
    }
    None
}

/// Cascades run after a worker update: a role that no longer needs a team
/// or a deactivation silently drops the pending transfer.
pub async fn cascade_after_worker_update(
    pool: &MySqlPool,
    worker: &Worker,
    new_role_id: Option<u8>,
    new_is_active: Option<bool>,
) -> Result<(), EngineError> {
    if !worker.has_pending_transfer() {
        return Ok(());
    }
    if let Some(reason) = worker_update_cascade(new_role_id, new_is_active) {
        cancel_pending(pool, worker, reason).await?;
    }
    Ok(())
}

/// Team deactivation fallout: cancel every transfer targeting the team,
/// cancel outgoing transfers of members being unassigned, then unassign
/// the members themselves.
pub async fn cascade_team_deactivation(
    pool: &MySqlPool,
    team_id: u64,
) -> Result<u32, EngineError> {
    let mut cancelled = 0u32;

    let inbound = sqlx::query_as::<_, Worker>(
        "SELECT * FROM workers WHERE effective_team_id = ?",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;
    for worker in &inbound {
        if cancel_pending(pool, worker, CancelReason::TeamDeactivated).await? {
            cancelled += 1;
        }
    }

    // Members leaving the team lose their source; a later due-transfer run
    // would otherwise try to move workers who no longer belong to it.
    let outbound = sqlx::query_as::<_, Worker>(
        "SELECT * FROM workers WHERE team_id = ? AND effective_team_id IS NOT NULL",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;
    for worker in &outbound {
        if cancel_pending(pool, worker, CancelReason::TeamDeactivated).await? {
            cancelled += 1;
        }
    }

    sqlx::query("UPDATE workers SET team_id = NULL, team_assigned_at = NULL WHERE team_id = ?")
        .bind(team_id)
        .execute(pool)
        .await?;

    Ok(cancelled)
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct DueRunReport {
    pub applied: u32,
    pub cancelled: u32,
    pub failed: u32,
    pub already_running: bool,
}

static DUE_JOB_RUNNING: AtomicBool = AtomicBool::new(false);

/// Apply every pending transfer whose effective date has arrived, across
/// active companies. One worker's failure never aborts the batch.
pub async fn process_due_transfers(pool: &MySqlPool) -> DueRunReport {
    // Overlapping scheduled invocations short-circuit instead of
    // double-processing.
    if DUE_JOB_RUNNING
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        warn!("Due-transfer job already running; skipping this invocation");
        return DueRunReport {
            already_running: true,
            ..Default::default()
        };
    }

    let run_id = uuid::Uuid::new_v4();
    let report = run_due_transfers(pool).await;
    DUE_JOB_RUNNING.store(false, Ordering::SeqCst);
    info!(
        run_id = %run_id,
        applied = report.applied,
        cancelled = report.cancelled,
        failed = report.failed,
        "Due-transfer run finished"
    );
    report
}

async fn run_due_transfers(pool: &MySqlPool) -> DueRunReport {
    let mut report = DueRunReport::default();

    let companies = match sqlx::query_as::<_, Company>(
        "SELECT * FROM companies WHERE is_active = 1",
    )
    .fetch_all(pool)
    .await
    {
        Ok(companies) => companies,
        Err(e) => {
            error!(error = %e, "Failed to load companies for due-transfer run");
            report.failed += 1;
            return report;
        }
    };

    for company in &companies {
        let tz = calendar::parse_tz(&company.timezone);
        let today = calendar::local_today(&tz);

        let due = match sqlx::query_as::<_, Worker>(
            r#"
            SELECT * FROM workers
            WHERE company_id = ? AND is_active = 1
              AND effective_transfer_date IS NOT NULL
              AND effective_transfer_date <= ?
            "#,
        )
        .bind(company.id)
        .bind(today)
        .fetch_all(pool)
        .await
        {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, company_id = company.id, "Failed to load due transfers");
                report.failed += 1;
                continue;
            }
        };

        for worker in &due {
            match apply_due_transfer(pool, worker).await {
                Ok(true) => report.applied += 1,
                Ok(false) => report.cancelled += 1,
                Err(e) => {
                    error!(error = %e, worker_id = worker.id, "Failed to apply due transfer");
                    report.failed += 1;
                }
            }
        }
    }

    report
}

/// Apply one due transfer. Returns Ok(true) if applied, Ok(false) if it
/// had to be cancelled because the destination went inactive.
async fn apply_due_transfer(pool: &MySqlPool, worker: &Worker) -> Result<bool, EngineError> {
    let target_id = worker
        .effective_team_id
        .ok_or_else(|| EngineError::Validation("No pending transfer".to_string()))?;

    let target = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = ?")
        .bind(target_id)
        .fetch_optional(pool)
        .await?;

    let target_is_active = target.map(|t| t.is_active).unwrap_or(false);
    if !target_is_active {
        cancel_pending(pool, worker, CancelReason::TargetTeamInactive).await?;
        return Ok(false);
    }

    // Conditional on the pending predicate: a concurrent run that already
    // applied this transfer leaves nothing to do, so re-running is safe.
    let result = sqlx::query(
        r#"
        UPDATE workers
        SET team_id = ?,
            team_assigned_at = NOW(),
            effective_team_id = NULL,
            effective_transfer_date = NULL,
            transfer_initiated_by = NULL
        WHERE id = ? AND effective_team_id = ?
        "#,
    )
    .bind(target_id)
    .bind(worker.id)
    .bind(target_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(true);
    }

    events::emit(Event {
        kind: EventKind::TeamTransferCompleted,
        company_id: worker.company_id,
        worker_id: worker.id,
        detail: serde_json::json!({ "team_id": target_id }),
    });
    info!(worker_id = worker.id, team_id = target_id, "Team transfer applied");
    Ok(true)
}

async fn find_worker(pool: &MySqlPool, worker_id: u64) -> Result<Worker, EngineError> {
    sqlx::query_as::<_, Worker>("SELECT * FROM workers WHERE id = ?")
        .bind(worker_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| EngineError::NotFound("Worker not found".to_string()))
}

async fn find_company(pool: &MySqlPool, company_id: u64) -> Result<Company, EngineError> {
    sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = ?")
        .bind(company_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| EngineError::NotFound("Company not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn worker(team_id: Option<u64>, pending: Option<u64>) -> Worker {
        Worker {
            id: 1,
            company_id: 1,
            first_name: "Test".into(),
            last_name: "Worker".into(),
            email: "w@example.com".into(),
            role_id: 3,
            is_active: true,
            team_id,
            team_assigned_at: None,
            work_days: None,
            window_start: None,
            window_end: None,
            effective_team_id: pending,
            effective_transfer_date: pending.map(|_| date("2026-08-31")),
            transfer_initiated_by: pending.map(|_| 99),
        }
    }

    fn team(id: u64, is_active: bool) -> Team {
        Team {
            id,
            company_id: 1,
            name: "Alpha".into(),
            is_active,
            work_days: "1,2,3,4,5".into(),
            window_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            window_end: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            leader_id: None,
        }
    }

    fn date(key: &str) -> NaiveDate {
        calendar::key_to_date(key)
    }

    #[test]
    fn unassigned_worker_is_assigned_immediately() {
        let plan = plan_team_change(&worker(None, None), &team(5, true), date("2026-08-30"));
        assert_eq!(plan.unwrap(), TransferPlan::Immediate);
    }

    #[test]
    fn team_to_team_move_is_scheduled_for_tomorrow() {
        let plan = plan_team_change(&worker(Some(4), None), &team(5, true), date("2026-08-30"));
        assert_eq!(
            plan.unwrap(),
            TransferPlan::Scheduled {
                effective_date: date("2026-08-31")
            }
        );
    }

    #[test]
    fn second_request_conflicts_regardless_of_target() {
        for target in [5u64, 6, 7] {
            let result = plan_team_change(
                &worker(Some(4), Some(5)),
                &team(target, true),
                date("2026-08-30"),
            );
            assert!(matches!(result, Err(EngineError::Conflict(_))));
        }
    }

    #[test]
    fn same_team_request_is_a_cascade_not_a_conflict() {
        // reassignment back to the current team cancels the pending
        // transfer silently even though one is pending
        let plan = plan_team_change(
            &worker(Some(4), Some(5)),
            &team(4, true),
            date("2026-08-30"),
        );
        assert_eq!(plan.unwrap(), TransferPlan::SameTeam);
    }

    #[test]
    fn inactive_target_is_rejected_up_front() {
        let result = plan_team_change(&worker(None, None), &team(5, false), date("2026-08-30"));
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn deactivation_cascades_with_deactivation_reason() {
        assert_eq!(
            worker_update_cascade(None, Some(false)),
            Some(CancelReason::Deactivation)
        );
        // deactivation wins over a simultaneous role change
        assert_eq!(
            worker_update_cascade(Some(1), Some(false)),
            Some(CancelReason::Deactivation)
        );
    }

    #[test]
    fn role_change_away_from_member_cascades() {
        assert_eq!(
            worker_update_cascade(Some(2), None),
            Some(CancelReason::RoleChanged)
        );
        // staying a member cascades nothing
        assert_eq!(worker_update_cascade(Some(3), None), None);
        assert_eq!(worker_update_cascade(None, Some(true)), None);
        assert_eq!(worker_update_cascade(None, None), None);
    }

    #[test]
    fn cross_company_target_is_rejected() {
        let mut foreign = team(5, true);
        foreign.company_id = 2;
        let result = plan_team_change(&worker(None, None), &foreign, date("2026-08-30"));
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }
}
