use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Company {
    pub id: u64,
    pub name: String,
    /// IANA timezone identifier, e.g. "Asia/Dhaka"
    #[schema(example = "Asia/Dhaka")]
    pub timezone: String,
    pub is_active: bool,
}
