use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::models::ScheduleSlot;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Schedule already exists for {slot}")]
    Conflict { slot: ScheduleSlot, id: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Dismissible message shown to the user for a failed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl AppError {
    pub fn notification(&self) -> Notification {
        let (title, message) = match self {
            AppError::Validation(msg) => ("Invalid input", msg.clone()),
            AppError::StoreUnavailable(_) => (
                "Connection problem",
                "Could not load data. Please try again.".to_string(),
            ),
            AppError::WriteFailed(_) => (
                "Save failed",
                "Something went wrong while saving the schedule. Please try again.".to_string(),
            ),
            AppError::Conflict { slot, .. } => (
                "Confirm overwrite",
                format!(
                    "Class {} already has period {} on {}. Do you want to update it?",
                    slot.class_id,
                    slot.period,
                    crate::models::format_date(slot.date)
                ),
            ),
            AppError::Config(_) | AppError::Database(_) => (
                "Error",
                "An unexpected error occurred.".to_string(),
            ),
        };
        Notification {
            title: title.to_string(),
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictBody {
    pub id: String,
    #[serde(flatten)]
    pub slot: ScheduleSlot,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let notification = self.notification();
        let (status, message, conflict) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Conflict { slot, id } => (
                StatusCode::CONFLICT,
                notification.message,
                Some(ConflictBody { id, slot }),
            ),
            AppError::StoreUnavailable(detail) => {
                error!("store unavailable: {}", detail);
                (StatusCode::BAD_GATEWAY, notification.message, None)
            }
            AppError::WriteFailed(detail) => {
                error!("write failed: {}", detail);
                (StatusCode::BAD_GATEWAY, notification.message, None)
            }
            AppError::Config(detail) => {
                error!("configuration error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, notification.message, None)
            }
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message,
            conflict,
        });

        (status, body).into_response()
    }
}
