use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Holiday {
    pub id: u64,
    pub company_id: u64,
    #[schema(value_type = String, format = "date", example = "2026-12-25")]
    pub date: NaiveDate,
    /// Recurring holidays match by (month, day) in every year.
    pub is_recurring: bool,
    #[schema(example = "Victory Day")]
    pub name: String,
}
