//! API error type and its HTTP mapping.
//!
//! Every failure surfaces to the client as `{"error": "..."}` with a status
//! code following the taxonomy: validation 422, state conflicts 409, actor
//! problems 401/403, storage/upstream failures 5xx. Expired sessions carry
//! an additional `token_expired` flag so clients know to refresh-and-retry.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use prbridge_core::TransitionError;

use crate::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request payload. Retryable inline.
    #[error("{0}")]
    Validation(String),

    /// The lifecycle controller rejected the transition.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("offer not found")]
    NotFound,

    /// No session, unknown session, or expired session.
    #[error("authentication required")]
    Unauthenticated { token_expired: bool },

    /// Authenticated, but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),

    /// Payment endpoints are disabled (no Stripe key configured).
    #[error("payments are not configured")]
    PaymentsDisabled,

    /// The payment provider failed or returned garbage.
    #[error("payment provider error")]
    Upstream(String),

    /// Storage or other internal failure. Details are logged, not leaked.
    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transition(TransitionError::MissingData(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transition(TransitionError::NotAuthorized { .. }) => StatusCode::FORBIDDEN,
            Self::Transition(_) => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::PaymentsDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(detail) => error!("internal error: {}", detail),
            Self::Upstream(detail) => error!("upstream payment error: {}", detail),
            _ => {}
        }

        let status = self.status_code();
        let body = match &self {
            Self::Unauthenticated { token_expired } => json!({
                "error": self.to_string(),
                "token_expired": token_expired,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ApiError::NotFound,
            RepositoryError::Stale { expected, actual } => {
                ApiError::Transition(TransitionError::Stale { expected, actual })
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<prbridge_core::DraftError> for ApiError {
    fn from(err: prbridge_core::DraftError) -> Self {
        ApiError::Validation(err.to_string())
    }
}
