use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::schedule::{self, ScheduleOverride};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "company_id": 1,
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "role_id": 3,
        "is_active": true,
        "team_id": 10,
        "work_days": "1,2,3,4,5",
        "window_start": "09:00:00",
        "window_end": "11:00:00"
    })
)]
pub struct Worker {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    /// 1 = admin, 2 = lead, 3 = member
    #[schema(example = 3)]
    pub role_id: u8,

    pub is_active: bool,

    #[schema(example = 10, nullable = true)]
    pub team_id: Option<u64>,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub team_assigned_at: Option<DateTime<Utc>>,

    /// Per-worker schedule override; CSV of day numbers 0=Sun..6=Sat
    #[schema(example = "1,2,3,4,5", nullable = true)]
    pub work_days: Option<String>,

    #[schema(value_type = String, format = "time", nullable = true)]
    pub window_start: Option<NaiveTime>,

    #[schema(value_type = String, format = "time", nullable = true)]
    pub window_end: Option<NaiveTime>,

    // Pending-transfer triple: either all set or all null.
    #[schema(nullable = true)]
    pub effective_team_id: Option<u64>,

    #[schema(value_type = String, format = "date", nullable = true)]
    pub effective_transfer_date: Option<NaiveDate>,

    #[schema(nullable = true)]
    pub transfer_initiated_by: Option<u64>,
}

impl Worker {
    pub fn has_pending_transfer(&self) -> bool {
        self.effective_team_id.is_some()
    }

    pub fn schedule_override(&self) -> ScheduleOverride {
        ScheduleOverride {
            work_days: self.work_days.as_deref().map(schedule::parse_work_days),
            window_start: self.window_start,
            window_end: self.window_end,
        }
    }
}
