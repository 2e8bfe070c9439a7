use crate::api::check_in::{MissedListResponse, SubmitCheckIn};
use crate::api::company::CreateCompany;
use crate::api::holiday::CreateHoliday;
use crate::api::team::CreateTeam;
use crate::api::worker::{AssignTeam, CreateWorker, WorkerListResponse};
use crate::engine::miss_detector::MissRunReport;
use crate::engine::transfer::{DueRunReport, TransferOutcome};
use crate::model::company::Company;
use crate::model::holiday::Holiday;
use crate::model::missed_check_in::{AttendanceSnapshot, MissedCheckIn};
use crate::model::team::Team;
use crate::model::worker::Worker;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rollcall API",
        version = "1.0.0",
        description = r#"
## Daily Check-in Compliance Service

Tracks whether workers complete their scheduled daily check-in within a
timezone-local window, flags misses with a point-in-time statistical
snapshot, and manages next-day-effective team transfers.

### 🔹 Key Features
- **Workers & Teams**
  - Two-level schedule overrides: worker fields fall back to the team default
- **Check-ins**
  - One check-in per worker per company-local calendar date
- **Miss Detection**
  - Idempotent daily sweep with streaks, trailing-window miss counts and
    trend flags captured at detection time
- **Team Transfers**
  - Immediate assignment for unassigned workers, next-day scheduled
    transfers otherwise, with cancellation and cascade rules

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::company::create_company,
        crate::api::company::list_companies,

        crate::api::worker::create_worker,
        crate::api::worker::list_workers,
        crate::api::worker::get_worker,
        crate::api::worker::update_worker,
        crate::api::worker::assign_team,
        crate::api::worker::cancel_transfer,

        crate::api::team::create_team,
        crate::api::team::list_teams,
        crate::api::team::get_team,
        crate::api::team::update_team,

        crate::api::holiday::create_holiday,
        crate::api::holiday::list_holidays,
        crate::api::holiday::update_holiday,
        crate::api::holiday::delete_holiday,

        crate::api::check_in::submit_check_in,
        crate::api::check_in::list_check_ins,
        crate::api::check_in::list_missed,

        crate::api::jobs::run_miss_detection,
        crate::api::jobs::run_due_transfers
    ),
    components(
        schemas(
            Company,
            CreateCompany,
            Worker,
            CreateWorker,
            WorkerListResponse,
            AssignTeam,
            TransferOutcome,
            Team,
            CreateTeam,
            Holiday,
            CreateHoliday,
            SubmitCheckIn,
            MissedCheckIn,
            AttendanceSnapshot,
            MissedListResponse,
            MissRunReport,
            DueRunReport
        )
    ),
    tags(
        (name = "Company", description = "Tenant management APIs"),
        (name = "Worker", description = "Worker and transfer management APIs"),
        (name = "Team", description = "Team management APIs"),
        (name = "Holiday", description = "Holiday calendar APIs"),
        (name = "CheckIn", description = "Check-in and miss history APIs"),
        (name = "Jobs", description = "Batch job trigger APIs"),
    )
)]
pub struct ApiDoc;
