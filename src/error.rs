use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    response::{ApiResponse, Meta},
    status::ParseStatusError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    /// Well-formed request that breaks a business rule.
    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    AccessDenied(String),

    /// Rejected at the boundary before any service ran.
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        AppError::InvalidState(message.into())
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        AppError::AccessDenied(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ParseStatusError> for AppError {
    fn from(err: ParseStatusError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::DbError(err) => tracing::error!(error = %err, "database error"),
            AppError::OrmError(err) => tracing::error!(error = %err, "orm error"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal error"),
            _ => {}
        }

        let message = self.to_string();
        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_client_statuses() {
        assert_eq!(
            AppError::not_found("Order not found").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::invalid_state("Cart is empty").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::access_denied("Order does not belong to user").status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn storage_errors_do_not_leak_details() {
        let err = AppError::OrmError(sea_orm::DbErr::Custom("relation \"orders\" missing".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "ORM error");
    }

    #[test]
    fn status_parse_failures_are_bad_requests() {
        let err: AppError = "teleported".parse::<crate::status::OrderStatus>().unwrap_err().into();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
