//! Token acquisition routes: authorization initiation, provider callback,
//! and the client-credentials exchange.
//!
//! These routes are mounted outside the redirect-router guards; they are the
//! second hop of the redirect chain and must never trigger it again.

use axum::{
    extract::{Extension, Query},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use url::form_urlencoded;
use utoipa::IntoParams;

use crate::api::errors::{ApiError, CODE_MISSING_FIELDS, ErrorBody};
use crate::spotify::ProviderError;

use super::codec::BearerToken;
use super::cookies::{
    token_cookie, SERVICE_ACCESS_COOKIE, USER_ACCESS_COOKIE, USER_REFRESH_COOKIE,
};
use super::state::AuthState;
use super::types::AccessTokenResponse;

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct AuthorizeParams {
    /// Path to land on after the authorization round-trip.
    redirect: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct GenerateTokenParams {
    /// Path to land on once the cookie is set.
    redirect: Option<String>,
    /// Original `query` search parameter, replayed on the final redirect.
    query: Option<String>,
}

/// Start the authorization-code grant by sending the user to the provider.
#[utoipa::path(
    get,
    path = "/authorize",
    params(AuthorizeParams),
    responses(
        (status = 307, description = "Redirect to the provider authorization page"),
        (status = 500, description = "Authorization URL could not be built", body = ErrorBody)
    ),
    tag = "tokens"
)]
pub async fn authorize(
    auth_state: Extension<Arc<AuthState>>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Response, ApiError> {
    let state = safe_redirect_path(params.redirect.as_deref());
    let url = auth_state.spotify().authorize_url(state)?;
    Ok(Redirect::temporary(url.as_str()).into_response())
}

/// Provider redirect target: exchange the one-time code for user tokens.
///
/// On success both user cookies are set and the caller is bounced back to
/// the path carried in `state`, reconstructing the request that originally
/// hit the redirect router.
pub async fn callback(
    auth_state: Extension<Arc<AuthState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    if let Some(denial) = params.error {
        error!("provider denied authorization: {denial}");
        return Err(ApiError::Upstream(StatusCode::BAD_REQUEST));
    }
    let Some(code) = params.code else {
        return Err(ApiError::Validation(CODE_MISSING_FIELDS));
    };

    let grant = auth_state
        .spotify()
        .authorization_code_tokens(&code)
        .await
        .map_err(exchange_failed)?;

    let config = auth_state.config();
    let access_max_age = seconds_until(&grant.access);

    // The provider does not expire refresh tokens; the configured TTL bounds
    // how long the client may hold one.
    let refresh = BearerToken {
        value: grant.refresh_value,
        expires_at: Utc::now() + chrono::Duration::seconds(config.user_refresh_ttl_seconds()),
        scope: grant.access.scope.clone(),
    };

    let mut headers = HeaderMap::new();
    append_cookie(
        &mut headers,
        USER_ACCESS_COOKIE,
        &auth_state.codec().encrypt(&grant.access)?,
        access_max_age,
        config.cookie_secure(),
    )?;
    append_cookie(
        &mut headers,
        USER_REFRESH_COOKIE,
        &auth_state.codec().encrypt(&refresh)?,
        config.user_refresh_ttl_seconds(),
        config.cookie_secure(),
    )?;

    info!("user token acquired");

    let destination = safe_redirect_path(params.state.as_deref()).to_string();
    Ok((headers, Redirect::temporary(&destination)).into_response())
}

/// Acquire the service-level token via the client-credentials grant.
///
/// With a `redirect`, answers 307 back to the original path with the
/// original `query` parameter restored; without one, returns the expiry as
/// JSON. The token itself only ever leaves encrypted inside the cookie.
#[utoipa::path(
    get,
    path = "/generate-access-token",
    params(GenerateTokenParams),
    responses(
        (status = 200, description = "Cookie set; expiry returned", body = AccessTokenResponse),
        (status = 307, description = "Cookie set; redirect back to the original path"),
        (status = 500, description = "Exchange with the provider failed", body = ErrorBody)
    ),
    tag = "tokens"
)]
pub async fn generate_access_token(
    auth_state: Extension<Arc<AuthState>>,
    Query(params): Query<GenerateTokenParams>,
) -> Result<Response, ApiError> {
    let token = auth_state
        .spotify()
        .client_credentials_token()
        .await
        .map_err(exchange_failed)?;

    let max_age = seconds_until(&token);
    let encrypted = auth_state.codec().encrypt(&token)?;

    let mut headers = HeaderMap::new();
    append_cookie(
        &mut headers,
        SERVICE_ACCESS_COOKIE,
        &encrypted,
        max_age,
        auth_state.config().cookie_secure(),
    )?;

    info!("service token acquired");

    match params.redirect {
        Some(redirect) => {
            let destination =
                rebuild_destination(safe_redirect_path(Some(&redirect)), params.query.as_deref());
            Ok((headers, Redirect::temporary(&destination)).into_response())
        }
        None => Ok((
            headers,
            Json(AccessTokenResponse {
                expires_in: max_age,
            }),
        )
            .into_response()),
    }
}

/// Provider exchange failures surface as opaque 500s, never retried and
/// never leaking the provider response to the caller.
fn exchange_failed(err: ProviderError) -> ApiError {
    ApiError::Internal(anyhow::Error::new(err).context("token exchange failed"))
}

fn seconds_until(token: &BearerToken) -> i64 {
    (token.expires_at - Utc::now()).num_seconds().max(0)
}

/// Only site-relative paths are allowed as redirect targets; anything else
/// collapses to `/` so the chain cannot be pointed off-site.
fn safe_redirect_path(candidate: Option<&str>) -> &str {
    match candidate {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

/// Reassemble `<path>?query=<q>` exactly as the guard saw it.
fn rebuild_destination(path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => {
            let encoded: String = form_urlencoded::Serializer::new(String::new())
                .append_pair("query", query)
                .finish();
            format!("{path}?{encoded}")
        }
        _ => path.to_string(),
    }
}

fn append_cookie(
    headers: &mut HeaderMap,
    name: &str,
    encrypted: &str,
    max_age_seconds: i64,
    secure: bool,
) -> Result<(), ApiError> {
    let value = token_cookie(name, encrypted, max_age_seconds, secure)
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("invalid cookie header: {err}")))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support::auth_state;

    #[tokio::test]
    async fn authorize_redirects_to_provider() {
        let response = authorize(
            Extension(auth_state()),
            Query(AuthorizeParams {
                redirect: Some("/search".to_string()),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = response
            .headers()
            .get("location")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(location.starts_with("https://accounts.spotify.com/authorize?"));
        assert!(location.contains("state=%2Fsearch"));
        assert!(location.contains("response_type=code"));
    }

    #[tokio::test]
    async fn callback_without_code_is_rejected() {
        let response = callback(Extension(auth_state()), Query(CallbackParams::default()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn callback_with_provider_denial_is_rejected() {
        let response = callback(
            Extension(auth_state()),
            Query(CallbackParams {
                error: Some("access_denied".to_string()),
                ..CallbackParams::default()
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn safe_redirect_path_rejects_offsite_targets() {
        assert_eq!(safe_redirect_path(Some("/search")), "/search");
        assert_eq!(safe_redirect_path(Some("//evil.example")), "/");
        assert_eq!(safe_redirect_path(Some("https://evil.example")), "/");
        assert_eq!(safe_redirect_path(None), "/");
    }

    #[test]
    fn rebuild_destination_restores_query_exactly() {
        assert_eq!(
            rebuild_destination("/search", Some("radiohead ok")),
            "/search?query=radiohead+ok"
        );
        assert_eq!(rebuild_destination("/search", None), "/search");
        assert_eq!(rebuild_destination("/search", Some("")), "/search");
    }
}
