use crate::{
    engine::{
        error::EngineError,
        miss_detector::{self, MissRunReport},
        transfer::{self, DueRunReport},
    },
    model::company::Company,
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct MissJobQuery {
    /// Limit the run to one company; omit to sweep all active companies
    pub company_id: Option<u64>,
}

/// Trigger a miss-detection run
///
/// Entry point for the external scheduler; safe to re-run, detection is
/// idempotent per (worker, date).
#[utoipa::path(
    post,
    path = "/api/v1/jobs/miss-detection",
    params(
        ("company_id", Query, description = "Limit to one company")
    ),
    responses(
        (status = 200, description = "Per-company run reports", body = Vec<MissRunReport>),
        (status = 404, description = "Company not found")
    ),
    tag = "Jobs"
)]
pub async fn run_miss_detection(
    pool: web::Data<MySqlPool>,
    query: web::Query<MissJobQuery>,
) -> Result<impl Responder, EngineError> {
    let reports = match query.company_id {
        Some(company_id) => {
            let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = ?")
                .bind(company_id)
                .fetch_optional(pool.get_ref())
                .await?
                .ok_or_else(|| EngineError::NotFound("Company not found".to_string()))?;
            vec![miss_detector::run_for_company(pool.get_ref(), &company).await?]
        }
        None => miss_detector::run_all(pool.get_ref()).await,
    };
    Ok(HttpResponse::Ok().json(reports))
}

/// Trigger a due-transfer processing run
///
/// Applies every pending transfer whose effective date has arrived.
/// Overlapping invocations short-circuit; the report says so.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/transfers",
    responses(
        (status = 200, description = "Run report", body = DueRunReport)
    ),
    tag = "Jobs"
)]
pub async fn run_due_transfers(pool: web::Data<MySqlPool>) -> impl Responder {
    let report = transfer::process_due_transfers(pool.get_ref()).await;
    HttpResponse::Ok().json(report)
}
