//! Redirect router: sends token-less callers through acquisition.
//!
//! The guards are pure presence checks over the `Cookie` header — no
//! decryption, no database, no await — so they stay cheap on the hot path.
//! Actual validity is re-checked at the point of use by the session gate.
//! Acquisition routes are mounted outside these guards, so a redirect chain
//! is at most two hops and cannot loop.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;
use url::form_urlencoded;

use super::cookies::{has_cookie, SERVICE_ACCESS_COOKIE, USER_ACCESS_COOKIE, USER_REFRESH_COOKIE};

/// Guard for user-facing routes that need a user-scoped token.
///
/// Redirects to the authorization-initiation route with the original path
/// carried as opaque state.
pub async fn require_user_token(request: Request, next: Next) -> Response {
    let headers = request.headers();
    if has_cookie(headers, USER_REFRESH_COOKIE) || has_cookie(headers, USER_ACCESS_COOKIE) {
        return next.run(request).await;
    }

    let path = request.uri().path();
    debug!("no user credential for {path}, redirecting to /authorize");

    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", path)
        .finish();
    Redirect::temporary(&format!("/authorize?{query}")).into_response()
}

/// Guard for API routes that need the service-scoped token.
///
/// Redirects to the token-acquisition route, preserving the original path
/// and its `query` search parameter so the final hop reconstructs the
/// request exactly.
pub async fn require_service_token(request: Request, next: Next) -> Response {
    if has_cookie(request.headers(), SERVICE_ACCESS_COOKIE) {
        return next.run(request).await;
    }

    let path = request.uri().path();
    let search = request
        .uri()
        .query()
        .and_then(|raw| query_param(raw, "query"));
    debug!("no service credential for {path}, redirecting to /generate-access-token");

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("redirect", path);
    if let Some(search) = &search {
        serializer.append_pair("query", search);
    }
    let query = serializer.finish();
    Redirect::temporary(&format!("/generate-access-token?{query}")).into_response()
}

/// Pull a single query parameter out of a raw query string.
fn query_param(raw_query: &str, name: &str) -> Option<String> {
    form_urlencoded::parse(raw_query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
