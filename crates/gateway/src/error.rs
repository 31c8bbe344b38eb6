//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` that captures server-side failures to
//! Sentry before responding. All route handlers return `Result<T, AppError>`.
//!
//! The taxonomy follows the gate design: authorization failures are
//! fail-closed (401, uniform detail), quota denials are 429 with the
//! decision attached, validation failures are local 400s, and upstream
//! failures are 502s. Usage-store failures never surface here at all;
//! the usage gate fails open instead of erroring.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use thiserror::Error;

use nextstep_core::QuotaDecision;

use crate::models::predict::ValidationError;
use crate::services::auth::AuthError;
use crate::services::predict::PredictError;

/// Application-level error type for the gateway.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authorization failed; the visitor stays unauthorized.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// The daily quota denied the action.
    #[error("Daily limit reached")]
    QuotaExceeded(QuotaDecision),

    /// Malformed gated-action input, rejected locally.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The prediction upstream failed.
    #[error("Upstream error: {0}")]
    Upstream(#[from] PredictError),

    /// Session state could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side failures to Sentry
        if matches!(self, Self::Upstream(_) | Self::Session(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        match self {
            // Quota denials carry the decision itself so the client can show
            // the remaining-uses message and back off until tomorrow.
            Self::QuotaExceeded(decision) => {
                let retry_after = seconds_until_utc_midnight().to_string();
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [("retry-after", retry_after)],
                    Json(decision),
                )
                    .into_response()
            }
            // Fail-closed: every auth failure is plain unauthorized; the
            // variant detail stays in the logs.
            Self::Auth(err) => {
                let message = match err {
                    AuthError::UntrustedReferral => "Invalid referrer or source",
                    AuthError::MissingToken => "No authentication token provided",
                    AuthError::Provider(_) | AuthError::ExchangeTimeout => "Authentication failed",
                    AuthError::Initialization(_) => {
                        "Failed to initialize application. Please try again."
                    }
                };
                error_response(StatusCode::UNAUTHORIZED, message)
            }
            Self::Validation(err) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
            // Don't expose internal error details to clients
            Self::Upstream(_) => error_response(StatusCode::BAD_GATEWAY, "Prediction service error"),
            Self::Session(_) | Self::Internal(_) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_owned(),
        }),
    )
        .into_response()
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Seconds until the day-key rolls over (next UTC midnight), for the
/// `Retry-After` header on quota denials.
fn seconds_until_utc_midnight() -> i64 {
    let now = Utc::now();
    let midnight = (now.date_naive() + ChronoDuration::days(1))
        .and_hms_opt(0, 0, 0)
        .unwrap_or_else(|| now.naive_utc());
    (midnight - now.naive_utc()).num_seconds().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Auth(AuthError::MissingToken)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::UntrustedReferral)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Validation(ValidationError::RankOutOfRange)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::QuotaExceeded(QuotaDecision::denied(5))),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("boom".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_quota_denial_has_retry_after() {
        let response = AppError::QuotaExceeded(QuotaDecision::denied(5)).into_response();
        assert!(response.headers().contains_key("retry-after"));
    }

    #[test]
    fn test_seconds_until_utc_midnight_in_range() {
        let seconds = seconds_until_utc_midnight();
        assert!(seconds >= 1);
        assert!(seconds <= 24 * 60 * 60);
    }
}
