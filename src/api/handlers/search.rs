//! Catalog search: a protected API route using the service-level token.
//!
//! The redirect router only guarantees the cookie exists; this handler runs
//! the session gate for real validity before spending an upstream call. An
//! expired or broken credential answers 401 — re-acquisition happens through
//! the router on the client's next navigation, never inline here.

use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::errors::{ApiError, CODE_MISSING_FIELDS};
use crate::api::handlers::auth::{
    cookies::SERVICE_ACCESS_COOKIE,
    gate::{self, Session},
    AuthState,
};

#[derive(Deserialize, Debug, Default)]
pub struct SearchParams {
    query: Option<String>,
}

/// Search the provider catalog for tracks matching `query`.
pub async fn search(
    auth_state: Extension<Arc<AuthState>>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let query = params.query.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(ApiError::Validation(CODE_MISSING_FIELDS));
    }

    let token = match gate::check(&headers, SERVICE_ACCESS_COOKIE, auth_state.codec()) {
        Session::Authorized(token) => token,
        Session::Unauthorized(reason) => return Err(ApiError::Auth(reason.error_code())),
    };

    let results = auth_state.spotify().search(&token.value, &query).await?;
    Ok(Json(results).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support::auth_state;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn search_requires_query() {
        let response = search(
            Extension(auth_state()),
            Query(SearchParams::default()),
            HeaderMap::new(),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_without_credential_is_unauthorized() {
        let response = search(
            Extension(auth_state()),
            Query(SearchParams {
                query: Some("radiohead".to_string()),
            }),
            HeaderMap::new(),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn search_with_expired_credential_is_unauthorized() {
        use crate::api::handlers::auth::BearerToken;
        use axum::http::{header::COOKIE, HeaderValue};
        use chrono::{Duration, Utc};
        use std::collections::BTreeSet;

        let state = auth_state();
        let expired = BearerToken {
            value: "stale".to_string(),
            expires_at: Utc::now() - Duration::minutes(1),
            scope: BTreeSet::new(),
        };
        let encoded = state.codec().encrypt(&expired).unwrap_or_default();
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!("spotify_access_token={encoded}")) {
            headers.insert(COOKIE, value);
        }

        let response = search(
            Extension(state),
            Query(SearchParams {
                query: Some("radiohead".to_string()),
            }),
            headers,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
