use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use curico_core::error::CoreError;
use curico_pipeline::error::{ModelError, StorageError};
use curico_pipeline::PipelineError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`PipelineError`] for the
/// generation stages, and adds HTTP-specific variants. Implements
/// [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `curico_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure in story generation or illustration.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type ErrorParts = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Pipeline(err) => classify_pipeline_error(err),
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> ErrorParts {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core_error(core: &CoreError) -> ErrorParts {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

/// Map a pipeline failure to a status, code and client-safe message.
///
/// - A model reply without pages is `GENERATION_FAILED`.
/// - Model and storage failures keep a short description; the provider
///   response body is only logged.
/// - Database errors go through [`classify_sqlx_error`].
fn classify_pipeline_error(err: &PipelineError) -> ErrorParts {
    match err {
        PipelineError::Core(core) => classify_core_error(core),
        PipelineError::Format(format) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "GENERATION_FAILED",
            format.to_string(),
        ),
        PipelineError::Model(model) => {
            tracing::error!(error = %model, "Model request failed");
            let message = match model {
                ModelError::Request(_) => "Model request failed".to_string(),
                ModelError::Api { status, .. } => format!("Model API returned status {status}"),
                ModelError::EmptyResponse(what) => format!("Model returned no {what}"),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, "MODEL_ERROR", message)
        }
        PipelineError::Storage(storage) => {
            tracing::error!(error = %storage, "Object storage failed");
            let message = match storage {
                StorageError::InvalidImage(_) => "Model returned an invalid image",
                StorageError::Io(_) | StorageError::S3(_) => "Failed to store image",
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                message.to_string(),
            )
        }
        PipelineError::Database(db) => classify_sqlx_error(db),
        PipelineError::PageNotFound(id) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Page with id {id} not found"),
        ),
        PipelineError::Task(e) => {
            tracing::error!(error = %e, "Illustration task failed");
            internal()
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorParts {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
