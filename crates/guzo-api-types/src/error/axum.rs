use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::category::{LoginUserFailed, SubmitReviewFailed};
use super::{Error, ErrorCategory};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = match &self.category {
            ErrorCategory::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCategory::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCategory::Outage => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::AccessDenied => StatusCode::UNAUTHORIZED,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::ExpiredToken => StatusCode::FORBIDDEN,
            ErrorCategory::LoginUserFailed(data) => match data {
                LoginUserFailed::InvalidCredentials => StatusCode::FORBIDDEN,
                LoginUserFailed::AccountDisabled => StatusCode::FORBIDDEN,
            },
            ErrorCategory::RegisterUserFailed(..) => StatusCode::BAD_REQUEST,
            // seat contention and double-matching are conflicts, not
            // malformed requests
            ErrorCategory::BookTripFailed(..) => StatusCode::CONFLICT,
            ErrorCategory::MatchRequestFailed(..) => StatusCode::CONFLICT,
            ErrorCategory::SubmitReviewFailed(data) => match data {
                SubmitReviewFailed::AlreadyReviewed => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            },
            ErrorCategory::RegisterVehicleFailed(..) => StatusCode::CONFLICT,
        };
        (status_code, Json(self)).into_response()
    }
}
