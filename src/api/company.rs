use crate::{engine::error::EngineError, model::company::Company};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateCompany {
    #[schema(example = "Acme Logistics")]
    pub name: String,
    #[schema(example = "Asia/Dhaka")]
    pub timezone: String,
}

/// Create Company
#[utoipa::path(
    post,
    path = "/api/v1/companies",
    request_body = CreateCompany,
    responses(
        (status = 200, description = "Company created successfully"),
        (status = 400, description = "Unknown timezone identifier"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Company"
)]
pub async fn create_company(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCompany>,
) -> Result<impl Responder, EngineError> {
    // Reject here; everywhere downstream an unknown zone is treated as
    // seed-data corruption and panics.
    if payload.timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(EngineError::Validation(format!(
            "Unknown timezone identifier: {}",
            payload.timezone
        )));
    }

    sqlx::query("INSERT INTO companies (name, timezone, is_active) VALUES (?, ?, 1)")
        .bind(&payload.name)
        .bind(&payload.timezone)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Company created successfully" })))
}

#[utoipa::path(
    get,
    path = "/api/v1/companies",
    responses(
        (status = 200, description = "Company list", body = Vec<Company>)
    ),
    tag = "Company"
)]
pub async fn list_companies(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let companies = sqlx::query_as::<_, Company>("SELECT * FROM companies ORDER BY id")
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch companies");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(companies))
}
