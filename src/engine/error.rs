use actix_web::{HttpResponse, http::StatusCode};
use derive_more::Display;

/// Engine error taxonomy. Validation and conflict errors are user-facing
/// and map to 4xx; database errors surface as opaque 500s.
#[derive(Debug, Display)]
pub enum EngineError {
    #[display(fmt = "{}", _0)]
    Validation(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        EngineError::Database(e)
    }
}

impl std::error::Error for EngineError {}

impl actix_web::ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            EngineError::Database(e) => {
                tracing::error!(error = %e, "Engine database error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "message": message
        }))
    }
}
