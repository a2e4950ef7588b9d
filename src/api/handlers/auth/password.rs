//! Password reset endpoints: code issuance and consumption.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::api::errors::{
    ApiError, CODE_INVALID_CODE, CODE_INVALID_EMAIL, CODE_MISSING_FIELDS, CODE_MISSING_PAYLOAD,
    CODE_NO_ACCOUNT, ErrorBody,
};

use super::state::AuthState;
use super::storage::{consume_otp_and_set_password, issue_otp, user_exists};
use super::types::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest};
use super::utils::{generate_otp, hash_password, normalize_email, valid_email};

/// Issue a reset code for the account and queue its delivery email.
///
/// A fresh code supersedes any earlier one for the same email, so exactly
/// one code is redeemable at a time.
#[utoipa::path(
    post,
    path = "/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset code issued and queued for delivery", body = MessageResponse),
        (status = 400, description = "Invalid email or no matching account", body = ErrorBody),
        (status = 500, description = "Unexpected failure", body = ErrorBody)
    ),
    tag = "account"
)]
pub async fn forgot_password(
    pool: Extension<PgPool>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation(CODE_MISSING_PAYLOAD));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(ApiError::Validation(CODE_INVALID_EMAIL));
    }

    if !user_exists(&pool, &email).await? {
        return Err(ApiError::Account(CODE_NO_ACCOUNT));
    }

    let otp = generate_otp();
    issue_otp(&pool, &email, &otp).await?;

    info!("reset code issued");

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "resetCodeSent".to_string(),
        }),
    ))
}

/// Redeem a reset code and set the new password.
///
/// Wrong, already-used, and expired codes all answer with the same error
/// code; nothing in the response reveals which predicate failed.
#[utoipa::path(
    post,
    path = "/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated and code consumed", body = MessageResponse),
        (status = 400, description = "Missing fields or invalid code", body = ErrorBody),
        (status = 500, description = "Unexpected failure", body = ErrorBody)
    ),
    tag = "account"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation(CODE_MISSING_PAYLOAD));
    };

    let email = normalize_email(&request.email);
    let otp = request.otp.trim();
    if otp.is_empty() || request.new_password.is_empty() {
        return Err(ApiError::Validation(CODE_MISSING_FIELDS));
    }
    if !valid_email(&email) {
        return Err(ApiError::Validation(CODE_INVALID_EMAIL));
    }

    // Hash before opening the transaction to keep the lock window short.
    let password_hash = hash_password(&request.new_password)?;

    let consumed = consume_otp_and_set_password(
        &pool,
        &email,
        otp,
        auth_state.config().otp_ttl_seconds(),
        &password_hash,
    )
    .await?;

    if !consumed {
        return Err(ApiError::Account(CODE_INVALID_CODE));
    }

    info!("password reset completed");

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "passwordUpdated".to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support::auth_state;
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> Option<PgPool> {
        PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/postgres")
            .ok()
    }

    #[tokio::test]
    async fn forgot_password_missing_payload() {
        let Some(pool) = lazy_pool() else {
            panic!("lazy pool construction failed");
        };
        let response = forgot_password(Extension(pool), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn forgot_password_rejects_bad_email() {
        let Some(pool) = lazy_pool() else {
            panic!("lazy pool construction failed");
        };
        let response = forgot_password(
            Extension(pool),
            Some(Json(ForgotPasswordRequest {
                email: "not-an-email".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reset_password_missing_payload() {
        let Some(pool) = lazy_pool() else {
            panic!("lazy pool construction failed");
        };
        let response = reset_password(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reset_password_rejects_empty_fields() {
        let Some(pool) = lazy_pool() else {
            panic!("lazy pool construction failed");
        };
        let response = reset_password(
            Extension(pool),
            Extension(auth_state()),
            Some(Json(ResetPasswordRequest {
                email: "a@b.com".to_string(),
                otp: "  ".to_string(),
                new_password: "hunter2!".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
