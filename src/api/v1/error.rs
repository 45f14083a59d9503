use crate::api::v1::handler::ApiResponse;
use crate::application_port::{AuthError, DomainError};
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid request argument")]
    InvalidArgument,
    #[error("Resource not found")]
    NotFound,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Credential is not valid")]
    InvalidToken,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    /// Authorization failures must surface as 401: that status class is
    /// what the client gateway keys its refresh protocol on.
    fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::InvalidCredentials | ApiErrorCode::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            ApiErrorCode::UsernameTaken => StatusCode::CONFLICT,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::UserExists => ApiErrorCode::UsernameTaken,
            AuthError::TokenInvalid | AuthError::TokenExpired | AuthError::UserNotFound => {
                ApiErrorCode::InvalidToken
            }
            AuthError::Store(e) | AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<DomainError> for ApiErrorCode {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::InvalidArgument(_) => ApiErrorCode::InvalidArgument,
            DomainError::UserNotFound | DomainError::NotFound => ApiErrorCode::NotFound,
            DomainError::Store(e) => ApiErrorCode::internal(e),
        }
    }
}

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(code) = err.find::<ApiErrorCode>() {
        let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
        return Ok(warp::reply::with_status(json, code.status()));
    }

    if err.find::<warp::reject::MissingHeader>().is_some() {
        // no Authorization header at all: same distinguished class as a
        // bad credential
        let code = ApiErrorCode::InvalidToken;
        let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
        return Ok(warp::reply::with_status(json, StatusCode::UNAUTHORIZED));
    }

    let json = warp::reply::json(&ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(ApiError {
            code: ApiErrorCode::InternalError,
            message: format!("Unhandled error: {:?}", err),
        }),
    });
    Ok(warp::reply::with_status(
        json,
        StatusCode::INTERNAL_SERVER_ERROR,
    ))
}
