use crate::{
    engine::{calendar, error::EngineError},
    model::{check_in::CheckIn, missed_check_in::MissedCheckIn},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct SubmitCheckIn {
    #[schema(example = 1)]
    pub worker_id: u64,
    /// Readiness score, 0.0..=10.0
    #[schema(example = 8.5)]
    pub score: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MissedQuery {
    pub worker_id: Option<u64>,
    pub team_id: Option<u64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct MissedListResponse {
    pub data: Vec<MissedCheckIn>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Submit today's check-in
///
/// "Today" is the worker's company-local calendar date; one check-in per
/// worker per date, enforced by a unique key.
#[utoipa::path(
    post,
    path = "/api/v1/check-ins",
    request_body = SubmitCheckIn,
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully"
        })),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 404, description = "Worker not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "CheckIn"
)]
pub async fn submit_check_in(
    pool: web::Data<MySqlPool>,
    payload: web::Json<SubmitCheckIn>,
) -> Result<impl Responder, EngineError> {
    if !(0.0..=10.0).contains(&payload.score) {
        return Err(EngineError::Validation(
            "score must be between 0 and 10".to_string(),
        ));
    }

    let timezone = sqlx::query_scalar::<_, String>(
        r#"
        SELECT c.timezone FROM companies c
        JOIN workers w ON w.company_id = c.id
        WHERE w.id = ? AND w.is_active = 1
        "#,
    )
    .bind(payload.worker_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| EngineError::NotFound("Worker not found".to_string()))?;

    let tz = calendar::parse_tz(&timezone);
    let today = calendar::local_today(&tz);

    let result = sqlx::query("INSERT INTO check_ins (worker_id, date, score) VALUES (?, ?, ?)")
        .bind(payload.worker_id)
        .bind(today)
        .bind(payload.score)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "message": "Checked in successfully"
        }))),
        Err(e) => {
            // Duplicate check-in for same day
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::BadRequest().json(json!({
                        "message": "Already checked in today"
                    })));
                }
            }
            error!(error = %e, worker_id = payload.worker_id, "Check-in failed");
            Err(EngineError::Database(e))
        }
    }
}

/// List a worker's check-in history, newest first
#[utoipa::path(
    get,
    path = "/api/v1/check-ins",
    params(
        ("worker_id", Query, description = "Worker ID")
    ),
    responses(
        (status = 200, description = "Check-in history")
    ),
    tag = "CheckIn"
)]
pub async fn list_check_ins(
    pool: web::Data<MySqlPool>,
    query: web::Query<CheckInQuery>,
) -> actix_web::Result<impl Responder> {
    let check_ins = sqlx::query_as::<_, CheckIn>(
        "SELECT * FROM check_ins WHERE worker_id = ? ORDER BY date DESC LIMIT 90",
    )
    .bind(query.worker_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, worker_id = query.worker_id, "Failed to fetch check-ins");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(check_ins))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckInQuery {
    pub worker_id: u64,
}

/// List missed check-ins with their snapshots
#[utoipa::path(
    get,
    path = "/api/v1/missed",
    params(
        ("worker_id", Query, description = "Filter by worker"),
        ("team_id", Query, description = "Filter by team"),
        ("page", Query, description = "Page number"),
        ("per_page", Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Paginated missed check-in list", body = MissedListResponse)
    ),
    tag = "CheckIn"
)]
pub async fn list_missed(
    pool: web::Data<MySqlPool>,
    query: web::Query<MissedQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    if query.worker_id.is_some() {
        where_sql.push_str(" AND worker_id = ?");
    }
    if query.team_id.is_some() {
        where_sql.push_str(" AND team_id = ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM missed_check_ins{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(worker_id) = query.worker_id {
        count_q = count_q.bind(worker_id);
    }
    if let Some(team_id) = query.team_id {
        count_q = count_q.bind(team_id);
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count missed check-ins");
        ErrorInternalServerError("Database error")
    })?;

    let data_sql = format!(
        "SELECT * FROM missed_check_ins{} ORDER BY date DESC LIMIT ? OFFSET ?",
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, MissedCheckIn>(&data_sql);
    if let Some(worker_id) = query.worker_id {
        data_q = data_q.bind(worker_id);
    }
    if let Some(team_id) = query.team_id {
        data_q = data_q.bind(team_id);
    }
    let missed = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch missed check-ins");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(MissedListResponse {
        data: missed,
        page,
        per_page,
        total,
    }))
}
