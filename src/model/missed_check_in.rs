use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Point-in-time attendance statistics captured when a miss is detected.
/// Written once with the miss record and never recomputed; the underlying
/// history keeps changing afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceSnapshot {
    /// Worker role at the time of the miss
    pub role_id: u8,
    /// 0=Sunday..6=Saturday, company-local
    pub day_of_week: u8,
    /// 1-based week within the month
    pub week_of_month: u8,
    #[schema(nullable = true)]
    pub days_since_last_check_in: Option<i64>,
    #[schema(nullable = true)]
    pub days_since_last_miss: Option<i64>,
    /// Consecutive required work days with check-ins, before the miss
    pub streak: i64,
    /// Average readiness score over the trailing 7 days, one decimal
    pub avg_score_7d: f64,
    pub misses_30d: i64,
    pub misses_60d: i64,
    pub misses_90d: i64,
    /// Percentage of required work days covered since team assignment
    pub completion_rate: f64,
    pub is_first_miss_in_30d: bool,
    pub is_increasing_frequency: bool,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct MissedCheckIn {
    pub id: u64,
    pub worker_id: u64,
    pub team_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    /// The check-in window that was missed, e.g. "09:00-11:00"
    #[schema(example = "09:00-11:00")]
    pub window_text: String,
    /// Team leader at the time of the miss; the team record may change later
    #[schema(nullable = true)]
    pub leader_name: Option<String>,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub snapshot: AttendanceSnapshot,
}
