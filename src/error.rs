use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// ApiError
///
/// The closed failure taxonomy for every domain operation. Each variant
/// corresponds to exactly one HTTP status, and the mapping lives in one
/// place (`IntoResponse` below) instead of being repeated per handler.
///
/// `Conflict` maps to 400 rather than 409: the source contract reported
/// duplicate usernames as a plain bad request and clients depend on that.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed input (400).
    #[error("{0}")]
    Validation(String),

    /// Duplicate username at account creation (400).
    #[error("{0}")]
    Conflict(String),

    /// Missing, malformed, or expired token, or a failed credential check (401).
    #[error("{0}")]
    Unauthenticated(String),

    /// Valid identity, insufficient role; also role-mismatched logins and
    /// suspended accounts (403).
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity absent (404).
    #[error("{0}")]
    NotFound(String),

    /// Unexpected store or transport failure (500). The inner detail is
    /// logged at the point of failure and never sent to the client.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// ErrorBody
///
/// The uniform `{error}` JSON shape every failure path produces.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal failures surface a generic message; the detail was already
        // logged where the failure happened.
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!("internal error: {detail}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Store failures funnel into `Internal`. Repository lookups use
/// `fetch_optional` and report missing rows as `NotFound` themselves, so a
/// `RowNotFound` reaching this conversion is itself unexpected.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("database error: {err:?}");
        ApiError::Internal(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
