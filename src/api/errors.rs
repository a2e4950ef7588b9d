//! Error taxonomy for the credential broker handlers.
//!
//! Every failure a handler can surface maps to a stable error-code string
//! that the frontend uses for translation lookup. Internal detail (database
//! errors, provider payloads, crypto failures) is logged server-side and
//! never reaches the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// JSON body returned for every error response.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

/// Handler-level failure, tagged with the stable code sent to the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request fields.
    #[error("validation failed: {0}")]
    Validation(&'static str),

    /// Account-flow failures (reset codes, unknown accounts). Deliberately
    /// coarse so wrong and expired codes are indistinguishable.
    #[error("account flow rejected: {0}")]
    Account(&'static str),

    /// Missing, undecryptable, or expired credential.
    #[error("authorization failed: {0}")]
    Auth(&'static str),

    /// Non-2xx from the identity provider or another upstream.
    #[error("upstream returned {0}")]
    Upstream(StatusCode),

    /// Database failures and other unexpected conditions.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub const CODE_MISSING_PAYLOAD: &str = "validation:missingPayload";
pub const CODE_MISSING_FIELDS: &str = "validation:missingFields";
pub const CODE_INVALID_EMAIL: &str = "validation:invalidEmail";
pub const CODE_NO_ACCOUNT: &str = "account:noAccountLinkedToEmail";
pub const CODE_INVALID_CODE: &str = "account:invalidCode";
pub const CODE_MISSING_TOKEN: &str = "auth:missingToken";
pub const CODE_INVALID_TOKEN: &str = "auth:invalidToken";
pub const CODE_PROVIDER_ERROR: &str = "upstream:providerError";
pub const CODE_INTERNAL: &str = "internalServerError";

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &str) {
        match self {
            Self::Validation(code) => (StatusCode::BAD_REQUEST, code),
            Self::Account(code) => (StatusCode::BAD_REQUEST, code),
            Self::Auth(code) => (StatusCode::UNAUTHORIZED, code),
            // Client errors from the provider keep their status; anything
            // else collapses to an opaque 500.
            Self::Upstream(status) if status.is_client_error() => (*status, CODE_PROVIDER_ERROR),
            Self::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, CODE_INTERNAL),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, CODE_INTERNAL),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("internal error: {err:#}");
        }
        let (status, code) = self.status_and_code();
        let body = ErrorBody {
            error: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(anyhow::Error::new(err).context("database failure"))
    }
}

impl From<crate::spotify::ProviderError> for ApiError {
    fn from(err: crate::spotify::ProviderError) -> Self {
        match err {
            crate::spotify::ProviderError::Status(status) => Self::Upstream(status),
            crate::spotify::ProviderError::Transport(err) => {
                Self::Internal(err.context("provider call failed"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn validation_maps_to_400() {
        let response = ApiError::Validation(CODE_MISSING_FIELDS).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn account_maps_to_400() {
        let response = ApiError::Account(CODE_INVALID_CODE).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn auth_maps_to_401() {
        let response = ApiError::Auth(CODE_INVALID_TOKEN).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn upstream_client_error_propagates_status() {
        let response = ApiError::Upstream(StatusCode::TOO_MANY_REQUESTS).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn upstream_server_error_collapses_to_500() {
        let response = ApiError::Upstream(StatusCode::BAD_GATEWAY).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_maps_to_500() {
        let response = ApiError::Internal(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
