//! Maps service failures onto HTTP responses.

use crate::core::errors::ServiceError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde::Serialize;

const DEFAULT_INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A failed request. Client errors echo their message; everything else is logged
/// and answered with `message`.
#[derive(Debug)]
pub struct ApiError {
    source: ServiceError,
    message: &'static str,
}

impl ApiError {
    /// Wraps failures of a route with the generic message shown on internal errors.
    pub fn with(message: &'static str) -> impl FnOnce(ServiceError) -> ApiError {
        move |source| ApiError { source, message }
    }
}

impl From<ServiceError> for ApiError {
    fn from(source: ServiceError) -> Self {
        ApiError {
            source,
            message: DEFAULT_INTERNAL_MESSAGE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.source {
            ServiceError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ServiceError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ServiceError::Conflict(message) => (StatusCode::CONFLICT, message),
            internal => {
                error!("{}: {internal}", self.message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    self.message.to_owned(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
