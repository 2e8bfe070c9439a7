use crate::{
    engine::{error::EngineError, transfer},
    model::{team::Team, worker::Worker},
    utils::db_utils::{build_update_sql, execute_update},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateTeam {
    #[schema(example = 1)]
    pub company_id: u64,
    #[schema(example = "Night Ops")]
    pub name: String,
    #[schema(example = "1,2,3,4,5")]
    pub work_days: String,
    #[schema(value_type = String, format = "time", example = "09:00:00")]
    pub window_start: NaiveTime,
    #[schema(value_type = String, format = "time", example = "11:00:00")]
    pub window_end: NaiveTime,
    #[schema(nullable = true)]
    pub leader_id: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamQuery {
    pub company_id: Option<u64>,
    pub is_active: Option<bool>,
}

const TEAM_UPDATE_COLUMNS: &[&str] = &[
    "name",
    "work_days",
    "window_start",
    "window_end",
    "leader_id",
    "is_active",
];

/// Create Team
#[utoipa::path(
    post,
    path = "/api/v1/teams",
    request_body = CreateTeam,
    responses(
        (status = 200, description = "Team created successfully"),
        (status = 400, description = "Invalid schedule window"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Team"
)]
pub async fn create_team(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTeam>,
) -> Result<impl Responder, EngineError> {
    if payload.window_end <= payload.window_start {
        return Err(EngineError::Validation(
            "window_end must be after window_start".to_string(),
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO teams
        (company_id, name, is_active, work_days, window_start, window_end, leader_id)
        VALUES (?, ?, 1, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.company_id)
    .bind(&payload.name)
    .bind(&payload.work_days)
    .bind(payload.window_start)
    .bind(payload.window_end)
    .bind(payload.leader_id)
    .execute(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Team created successfully" })))
}

#[utoipa::path(
    get,
    path = "/api/v1/teams",
    params(
        ("company_id", Query, description = "Filter by company"),
        ("is_active", Query, description = "Filter by active flag")
    ),
    responses(
        (status = 200, description = "Team list", body = Vec<Team>)
    ),
    tag = "Team"
)]
pub async fn list_teams(
    pool: web::Data<MySqlPool>,
    query: web::Query<TeamQuery>,
) -> actix_web::Result<impl Responder> {
    let mut where_sql = String::from(" WHERE 1=1");
    if query.company_id.is_some() {
        where_sql.push_str(" AND company_id = ?");
    }
    if query.is_active.is_some() {
        where_sql.push_str(" AND is_active = ?");
    }

    let sql = format!("SELECT * FROM teams{} ORDER BY id", where_sql);
    let mut q = sqlx::query_as::<_, Team>(&sql);
    if let Some(company_id) = query.company_id {
        q = q.bind(company_id);
    }
    if let Some(is_active) = query.is_active {
        q = q.bind(is_active);
    }

    let teams = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch teams");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(teams))
}

/// Get Team by ID
#[utoipa::path(
    get,
    path = "/api/v1/teams/{team_id}",
    params(
        ("team_id", Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Team found", body = Team),
        (status = 404, description = "Team not found")
    ),
    tag = "Team"
)]
pub async fn get_team(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let team_id = path.into_inner();

    let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = ?")
        .bind(team_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, team_id, "Failed to fetch team");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match team {
        Some(t) => Ok(HttpResponse::Ok().json(t)),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "Team not found" }))),
    }
}

/// Update Team
///
/// Deactivating a team cancels every transfer targeting it, cancels
/// outgoing transfers of its members, and unassigns the members.
#[utoipa::path(
    put,
    path = "/api/v1/teams/{team_id}",
    params(
        ("team_id", Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Team updated successfully"),
        (status = 400, description = "Field not updatable or invalid window"),
        (status = 404, description = "Team not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Team"
)]
pub async fn update_team(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let team_id = path.into_inner();

    let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = ?")
        .bind(team_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, team_id, "Failed to fetch team");
            ErrorInternalServerError("Internal Server Error")
        })?;
    let Some(team) = team else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Team not found" })));
    };

    validate_window_update(&body, &team)?;
    if let Some(leader_id) = body.get("leader_id").and_then(Value::as_u64) {
        validate_leader(pool.get_ref(), &team, leader_id).await?;
    }

    let update = build_update_sql("teams", &body, TEAM_UPDATE_COLUMNS, "id", team_id)?;
    execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if body.get("is_active").and_then(Value::as_bool) == Some(false) {
        let cancelled = transfer::cascade_team_deactivation(pool.get_ref(), team_id).await?;
        info!(team_id, cancelled, "Team deactivated; transfers cancelled, members unassigned");
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Team updated successfully" })))
}

/// The merged window after this update must stay forward; a PATCH setting
/// only one side is checked against the stored other side.
fn validate_window_update(body: &Value, team: &Team) -> Result<(), EngineError> {
    let parse = |field: &str| -> Option<NaiveTime> {
        body.get(field)
            .and_then(Value::as_str)
            .and_then(|s| NaiveTime::parse_from_str(s, "%H:%M:%S").ok())
    };
    let start = parse("window_start").unwrap_or(team.window_start);
    let end = parse("window_end").unwrap_or(team.window_end);
    if end <= start {
        return Err(EngineError::Validation(
            "window_end must be after window_start".to_string(),
        ));
    }
    Ok(())
}

async fn validate_leader(
    pool: &MySqlPool,
    team: &Team,
    leader_id: u64,
) -> Result<(), EngineError> {
    let leader = sqlx::query_as::<_, Worker>("SELECT * FROM workers WHERE id = ?")
        .bind(leader_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| EngineError::NotFound("Leader not found".to_string()))?;
    if leader.company_id != team.company_id {
        return Err(EngineError::Validation(
            "Leader belongs to a different company".to_string(),
        ));
    }
    if !leader.is_active {
        return Err(EngineError::Conflict(
            "Leader is deactivated".to_string(),
        ));
    }
    Ok(())
}
