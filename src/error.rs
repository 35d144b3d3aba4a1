use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Capacity rejections from the availability ledger. Messages carry the
/// actual remaining count so callers can surface it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityError {
    #[error("Event is sold out")]
    SoldOut,

    #[error("Only {remaining} spot(s) remaining, {requested} requested")]
    InsufficientCapacity { requested: i64, remaining: i64 },

    #[error("At most {limit} spot(s) per order")]
    OverPerOrderLimit { limit: i64 },
}

impl CapacityError {
    pub fn code(&self) -> &'static str {
        match self {
            CapacityError::SoldOut => "SOLD_OUT",
            CapacityError::InsufficientCapacity { .. } => "INSUFFICIENT_CAPACITY",
            CapacityError::OverPerOrderLimit { .. } => "OVER_PER_ORDER_LIMIT",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Capacity(#[from] CapacityError),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
            ),
            AppError::Capacity(err) => {
                log::info!("Capacity rejection: {err}");
                (
                    actix_web::http::StatusCode::CONFLICT,
                    err.code(),
                    err.to_string(),
                )
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "EXTERNAL_API_ERROR",
                    msg.clone(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            AppError::MigrateError(err) => {
                log::error!("Migration error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "MIGRATION_ERROR",
                    "Migration error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_error_codes_are_stable() {
        assert_eq!(CapacityError::SoldOut.code(), "SOLD_OUT");
        assert_eq!(
            CapacityError::InsufficientCapacity {
                requested: 3,
                remaining: 1
            }
            .code(),
            "INSUFFICIENT_CAPACITY"
        );
        assert_eq!(
            CapacityError::OverPerOrderLimit { limit: 10 }.code(),
            "OVER_PER_ORDER_LIMIT"
        );
    }

    #[test]
    fn insufficient_capacity_message_reports_remaining() {
        let err = CapacityError::InsufficientCapacity {
            requested: 4,
            remaining: 2,
        };
        assert!(err.to_string().contains("2 spot(s) remaining"));
    }
}
