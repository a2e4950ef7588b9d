//! Authenticated user profile, backed by the user-scoped access token.

use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::api::errors::ApiError;
use crate::api::handlers::auth::{
    cookies::USER_ACCESS_COOKIE,
    gate::{self, Session},
    AuthState,
};

/// Fetch the signed-in user's provider profile.
///
/// The router guard accepts a refresh cookie alone; a caller that arrives
/// here with only that still gets a 401 and re-enters acquisition, since the
/// gate needs a live access token.
pub async fn profile(
    auth_state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = match gate::check(&headers, USER_ACCESS_COOKIE, auth_state.codec()) {
        Session::Authorized(token) => token,
        Session::Unauthorized(reason) => return Err(ApiError::Auth(reason.error_code())),
    };

    let profile = auth_state.spotify().profile(&token.value).await?;
    Ok(Json(profile).into_response())
}
