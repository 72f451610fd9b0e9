use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use utoipa::ToSchema;

use crate::identity::IdentityError;
use crate::repo::RepoError;
use crate::store::StoreError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] Unauthorized(String),
    #[error("{0}")] Forbidden(String),
    #[error("{0}")] BadRequest(String),
    #[error("{0}")] NotFound(String),
    #[error("{0}")] Conflict(String),
    #[error("Too many requests")] TooManyRequests,
    #[error("{0}")] Internal(String),
}

impl ApiError {
    pub fn admin_only() -> Self {
        ApiError::Forbidden("Admin only".into())
    }

    pub fn moderator_only() -> Self {
        ApiError::Forbidden("Moderator only".into())
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound("Not found".into()),
            RepoError::Conflict => ApiError::Conflict("Already exists".into()),
            RepoError::Invalid(msg) => ApiError::BadRequest(msg),
            e @ RepoError::InvalidTransition { .. } => ApiError::BadRequest(e.to_string()),
            e @ RepoError::Malformed { .. } => {
                tracing::error!("{e}");
                ApiError::Internal(e.to_string())
            }
            RepoError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!("document store error: {e}");
        ApiError::Internal(e.to_string())
    }
}

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::InvalidToken(reason) => {
                tracing::debug!("rejected bearer token: {reason}");
                ApiError::Unauthorized("Invalid token".into())
            }
            IdentityError::UserNotFound => ApiError::NotFound("User not found".into()),
            IdentityError::Upstream(msg) => {
                tracing::error!("identity provider error: {msg}");
                ApiError::Internal(msg)
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiErrorBody { error: self.to_string() })
    }
}
