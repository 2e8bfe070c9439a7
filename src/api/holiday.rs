use crate::{
    engine::error::EngineError,
    model::holiday::Holiday,
    utils::{
        db_utils::{build_update_sql, execute_update},
        holiday_cache,
    },
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateHoliday {
    #[schema(example = 1)]
    pub company_id: u64,
    #[schema(value_type = String, format = "date", example = "2026-12-25")]
    pub date: NaiveDate,
    /// Recurring holidays match by (month, day) in every year
    pub is_recurring: bool,
    #[schema(example = "Victory Day")]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HolidayQuery {
    pub company_id: Option<u64>,
}

const HOLIDAY_UPDATE_COLUMNS: &[&str] = &["date", "is_recurring", "name"];

/// Create Holiday
#[utoipa::path(
    post,
    path = "/api/v1/holidays",
    request_body = CreateHoliday,
    responses(
        (status = 200, description = "Holiday created successfully"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Holiday"
)]
pub async fn create_holiday(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateHoliday>,
) -> Result<impl Responder, EngineError> {
    sqlx::query(
        "INSERT INTO holidays (company_id, date, is_recurring, name) VALUES (?, ?, ?, ?)",
    )
    .bind(payload.company_id)
    .bind(payload.date)
    .bind(payload.is_recurring)
    .bind(&payload.name)
    .execute(pool.get_ref())
    .await?;

    // Cached membership answers for this company are now stale.
    holiday_cache::invalidate_company(payload.company_id);

    Ok(HttpResponse::Ok().json(json!({ "message": "Holiday created successfully" })))
}

#[utoipa::path(
    get,
    path = "/api/v1/holidays",
    params(
        ("company_id", Query, description = "Filter by company")
    ),
    responses(
        (status = 200, description = "Holiday list", body = Vec<Holiday>)
    ),
    tag = "Holiday"
)]
pub async fn list_holidays(
    pool: web::Data<MySqlPool>,
    query: web::Query<HolidayQuery>,
) -> actix_web::Result<impl Responder> {
    let mut sql = String::from("SELECT * FROM holidays WHERE 1=1");
    if query.company_id.is_some() {
        sql.push_str(" AND company_id = ?");
    }
    sql.push_str(" ORDER BY date");

    let mut q = sqlx::query_as::<_, Holiday>(&sql);
    if let Some(company_id) = query.company_id {
        q = q.bind(company_id);
    }

    let holidays = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch holidays");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(holidays))
}

/// Update Holiday
#[utoipa::path(
    put,
    path = "/api/v1/holidays/{holiday_id}",
    params(
        ("holiday_id", Path, description = "Holiday ID")
    ),
    responses(
        (status = 200, description = "Holiday updated successfully"),
        (status = 404, description = "Holiday not found")
    ),
    tag = "Holiday"
)]
pub async fn update_holiday(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let holiday_id = path.into_inner();

    let holiday = sqlx::query_as::<_, Holiday>("SELECT * FROM holidays WHERE id = ?")
        .bind(holiday_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, holiday_id, "Failed to fetch holiday");
            ErrorInternalServerError("Internal Server Error")
        })?;
    let Some(holiday) = holiday else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Holiday not found" })));
    };

    let update = build_update_sql("holidays", &body, HOLIDAY_UPDATE_COLUMNS, "id", holiday_id)?;
    execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    holiday_cache::invalidate_company(holiday.company_id);

    Ok(HttpResponse::Ok().json(json!({ "message": "Holiday updated successfully" })))
}

/// Delete Holiday
#[utoipa::path(
    delete,
    path = "/api/v1/holidays/{holiday_id}",
    params(
        ("holiday_id", Path, description = "Holiday ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Holiday not found")
    ),
    tag = "Holiday"
)]
pub async fn delete_holiday(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let holiday_id = path.into_inner();

    let holiday = sqlx::query_as::<_, Holiday>("SELECT * FROM holidays WHERE id = ?")
        .bind(holiday_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, holiday_id, "Failed to fetch holiday");
            ErrorInternalServerError("Internal Server Error")
        })?;
    let Some(holiday) = holiday else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Holiday not found" })));
    };

    sqlx::query("DELETE FROM holidays WHERE id = ?")
        .bind(holiday_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, holiday_id, "Failed to delete holiday");
            ErrorInternalServerError("Internal Server Error")
        })?;

    holiday_cache::invalidate_company(holiday.company_id);

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}
