use crate::{
    engine::{
        error::EngineError,
        events::CancelReason,
        transfer::{self, TransferOutcome},
    },
    model::worker::Worker,
    utils::db_utils::{build_update_sql, execute_update},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateWorker {
    #[schema(example = 1)]
    pub company_id: u64,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "john@email.com", format = "email", value_type = String)]
    pub email: String,
    /// 1 = admin, 2 = lead, 3 = member
    #[schema(example = 3)]
    pub role_id: u8,
    #[schema(example = "1,2,3,4,5", nullable = true)]
    pub work_days: Option<String>,
    #[schema(value_type = String, format = "time", nullable = true)]
    pub window_start: Option<NaiveTime>,
    #[schema(value_type = String, format = "time", nullable = true)]
    pub window_end: Option<NaiveTime>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WorkerQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub company_id: Option<u64>,
    pub team_id: Option<u64>,
    pub role_id: Option<u8>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct WorkerListResponse {
    pub data: Vec<Worker>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct AssignTeam {
    #[schema(example = 10)]
    pub team_id: u64,
    /// Admin who requested the change
    #[schema(example = 2)]
    pub initiated_by: u64,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Bool(bool),
    Str(&'a str),
}

/// Columns a worker PATCH may touch. team_id and the pending-transfer
/// triple are owned by the transfer engine and go through /team.
const WORKER_UPDATE_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "role_id",
    "is_active",
    "work_days",
    "window_start",
    "window_end",
];

/// Create Worker
#[utoipa::path(
    post,
    path = "/api/v1/workers",
    request_body = CreateWorker,
    responses(
        (status = 200, description = "Worker created successfully", body = Object, example = json!({
            "message": "Worker created successfully"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Worker"
)]
pub async fn create_worker(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateWorker>,
) -> impl Responder {
    let result = sqlx::query(
        r#"
        INSERT INTO workers
        (company_id, first_name, last_name, email, role_id, is_active,
         work_days, window_start, window_end)
        VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)
        "#,
    )
    .bind(payload.company_id)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(payload.role_id)
    .bind(&payload.work_days)
    .bind(payload.window_start)
    .bind(payload.window_end)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => HttpResponse::Ok().json(json!({
            "message": "Worker created successfully"
        })),
        Err(e) => {
            error!(error = %e, "Failed to create worker");
            HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, Contact with system admin"
            }))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/workers",
    params(
        ("page", Query, description = "Page number"),
        ("per_page", Query, description = "Items per page"),
        ("company_id", Query, description = "Filter by company"),
        ("team_id", Query, description = "Filter by team"),
        ("role_id", Query, description = "Filter by role"),
        ("is_active", Query, description = "Filter by active flag"),
        ("search", Query, description = "Search by name or email")
    ),
    responses(
        (status = 200, description = "Paginated worker list", body = WorkerListResponse)
    ),
    tag = "Worker"
)]
pub async fn list_workers(
    pool: web::Data<MySqlPool>,
    query: web::Query<WorkerQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(company_id) = query.company_id {
        where_sql.push_str(" AND company_id = ?");
        args.push(FilterValue::U64(company_id));
    }
    if let Some(team_id) = query.team_id {
        where_sql.push_str(" AND team_id = ?");
        args.push(FilterValue::U64(team_id));
    }
    if let Some(role_id) = query.role_id {
        where_sql.push_str(" AND role_id = ?");
        args.push(FilterValue::U64(role_id as u64));
    }
    if let Some(is_active) = query.is_active {
        where_sql.push_str(" AND is_active = ?");
        args.push(FilterValue::Bool(is_active));
    }
    if let Some(search) = query.search.as_deref() {
        where_sql.push_str(" AND (first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        args.push(FilterValue::Str(search));
        args.push(FilterValue::Str(search));
        args.push(FilterValue::Str(search));
    }

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM workers{}", where_sql);
    debug!(sql = %count_sql, "Counting workers");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = bind_filter(count_q, arg);
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count workers");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT * FROM workers{} ORDER BY id DESC LIMIT ? OFFSET ?",
        where_sql
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching workers");

    let mut data_q = sqlx::query_as::<_, Worker>(&data_sql);
    for arg in &args {
        data_q = bind_filter_as(data_q, arg);
    }
    let workers = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch workers");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(WorkerListResponse {
        data: workers,
        page,
        per_page,
        total,
    }))
}

// Binds copy or allocate, so the query lifetime stays independent of the
// filter borrow.
fn bind_filter<'q>(
    query: sqlx::query::QueryScalar<'q, sqlx::MySql, i64, sqlx::mysql::MySqlArguments>,
    arg: &FilterValue<'_>,
) -> sqlx::query::QueryScalar<'q, sqlx::MySql, i64, sqlx::mysql::MySqlArguments> {
    match arg {
        FilterValue::U64(v) => query.bind(*v),
        FilterValue::Bool(v) => query.bind(*v),
        FilterValue::Str(s) => query.bind(format!("%{s}%")),
    }
}

fn bind_filter_as<'q>(
    query: sqlx::query::QueryAs<'q, sqlx::MySql, Worker, sqlx::mysql::MySqlArguments>,
    arg: &FilterValue<'_>,
) -> sqlx::query::QueryAs<'q, sqlx::MySql, Worker, sqlx::mysql::MySqlArguments> {
    match arg {
        FilterValue::U64(v) => query.bind(*v),
        FilterValue::Bool(v) => query.bind(*v),
        FilterValue::Str(s) => query.bind(format!("%{s}%")),
    }
}

/// Get Worker by ID
#[utoipa::path(
    get,
    path = "/api/v1/workers/{worker_id}",
    params(
        ("worker_id", Path, description = "Worker ID")
    ),
    responses(
        (status = 200, description = "Worker found", body = Worker),
        (status = 404, description = "Worker not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Worker"
)]
pub async fn get_worker(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let worker_id = path.into_inner();

    let worker = sqlx::query_as::<_, Worker>("SELECT * FROM workers WHERE id = ?")
        .bind(worker_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, worker_id, "Failed to fetch worker");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match worker {
        Some(w) => Ok(HttpResponse::Ok().json(w)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Worker not found"
        }))),
    }
}

/// Update Worker
///
/// Role and active-flag changes cascade into the transfer engine: a role
/// that no longer works a team schedule, or a deactivation, silently
/// cancels a pending transfer.
#[utoipa::path(
    put,
    path = "/api/v1/workers/{worker_id}",
    params(
        ("worker_id", Path, description = "Worker ID")
    ),
    responses(
        (status = 200, description = "Worker updated successfully"),
        (status = 400, description = "Field not updatable"),
        (status = 404, description = "Worker not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Worker"
)]
pub async fn update_worker(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let worker_id = path.into_inner();

    let worker = sqlx::query_as::<_, Worker>("SELECT * FROM workers WHERE id = ?")
        .bind(worker_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, worker_id, "Failed to fetch worker");
            ErrorInternalServerError("Internal Server Error")
        })?;
    let Some(worker) = worker else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Worker not found" })));
    };

    let update = build_update_sql("workers", &body, WORKER_UPDATE_COLUMNS, "id", worker_id)?;
    execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    let new_role_id = body
        .get("role_id")
        .and_then(Value::as_u64)
        .map(|v| v as u8);
    let new_is_active = body.get("is_active").and_then(Value::as_bool);
    transfer::cascade_after_worker_update(pool.get_ref(), &worker, new_role_id, new_is_active)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Worker updated successfully" })))
}

/// Assign or transfer a worker to a team
///
/// A worker with no team gets the team at once; a worker moving between
/// teams gets a transfer scheduled for tomorrow (company-local). A second
/// request while one is pending is a 409.
#[utoipa::path(
    post,
    path = "/api/v1/workers/{worker_id}/team",
    params(
        ("worker_id", Path, description = "Worker ID")
    ),
    request_body = AssignTeam,
    responses(
        (status = 200, description = "Assignment outcome", body = TransferOutcome),
        (status = 400, description = "Target team invalid"),
        (status = 404, description = "Worker or team not found"),
        (status = 409, description = "A transfer is already pending")
    ),
    tag = "Worker"
)]
pub async fn assign_team(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<AssignTeam>,
) -> Result<impl Responder, EngineError> {
    let worker_id = path.into_inner();
    let outcome =
        transfer::request_team_change(pool.get_ref(), worker_id, payload.team_id, payload.initiated_by)
            .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Cancel a pending transfer
#[utoipa::path(
    delete,
    path = "/api/v1/workers/{worker_id}/transfer",
    params(
        ("worker_id", Path, description = "Worker ID")
    ),
    responses(
        (status = 200, description = "Pending transfer cancelled"),
        (status = 404, description = "Worker not found or no pending transfer")
    ),
    tag = "Worker"
)]
pub async fn cancel_transfer(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, EngineError> {
    let worker_id = path.into_inner();

    let worker = sqlx::query_as::<_, Worker>("SELECT * FROM workers WHERE id = ?")
        .bind(worker_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| EngineError::NotFound("Worker not found".to_string()))?;

    if !transfer::cancel_pending(pool.get_ref(), &worker, CancelReason::Explicit).await? {
        return Err(EngineError::NotFound(
            "No pending transfer for this worker".to_string(),
        ));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Pending transfer cancelled" })))
}
