use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use examprep_api_types::{ApiErrorBody, ApiErrorMessage};

use crate::application::admin::{AdminCacheError, AdminQuestionError};
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::cache::CacheError;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const UPSTREAM: &str = "upstream_unavailable";
    pub const ABORTED: &str = "aggregate_aborted";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Admin token required",
            None,
        )
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        // Picked up by `log_responses`.
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidParameter { .. } => {
                ApiError::bad_request("Invalid query parameter", Some(err.to_string()))
            }
            CacheError::UpstreamFetch { .. } => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::UPSTREAM,
                "Question store unavailable",
                Some(err.to_string()),
            ),
            CacheError::Aborted { .. } => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::ABORTED,
                "Aggregate computation failed",
                Some(err.to_string()),
            ),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => ApiError::not_found("Record not found"),
            RepoError::Duplicate { constraint } => ApiError::new(
                StatusCode::CONFLICT,
                codes::DUPLICATE,
                "Duplicate record",
                Some(constraint),
            ),
            RepoError::InvalidInput { message } => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            RepoError::Integrity { message } => ApiError::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
                Some(message),
            ),
            RepoError::Timeout => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            RepoError::Persistence(message) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
                Some(message),
            ),
        }
    }
}

impl From<AdminQuestionError> for ApiError {
    fn from(err: AdminQuestionError) -> Self {
        match err {
            AdminQuestionError::MissingField { .. } | AdminQuestionError::UnknownDifficulty(_) => {
                ApiError::new(
                    StatusCode::BAD_REQUEST,
                    codes::INVALID_INPUT,
                    "Invalid question",
                    Some(err.to_string()),
                )
            }
            AdminQuestionError::Repo(repo) => ApiError::from(repo),
        }
    }
}

impl From<AdminCacheError> for ApiError {
    fn from(err: AdminCacheError) -> Self {
        ApiError::bad_request("Invalid revalidation request", Some(err.to_string()))
    }
}
