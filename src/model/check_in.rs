use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CheckIn {
    pub id: u64,
    pub worker_id: u64,
    /// Company-local calendar date; unique per worker.
    pub date: NaiveDate,
    /// Self-reported readiness score, 0.0..=10.0
    pub score: f64,
}
