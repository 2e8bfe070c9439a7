use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::schedule::{self, TeamSchedule};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Team {
    #[schema(example = 10)]
    pub id: u64,

    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = "Night Ops")]
    pub name: String,

    pub is_active: bool,

    /// Default schedule: CSV of day numbers 0=Sun..6=Sat
    #[schema(example = "1,2,3,4,5")]
    pub work_days: String,

    #[schema(value_type = String, format = "time", example = "09:00:00")]
    pub window_start: NaiveTime,

    #[schema(value_type = String, format = "time", example = "11:00:00")]
    pub window_end: NaiveTime,

    #[schema(nullable = true)]
    pub leader_id: Option<u64>,
}

impl Team {
    pub fn default_schedule(&self) -> TeamSchedule {
        TeamSchedule {
            work_days: schedule::parse_work_days(&self.work_days),
            window_start: self.window_start,
            window_end: self.window_end,
        }
    }
}
