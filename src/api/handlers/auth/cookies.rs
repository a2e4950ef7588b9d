//! Cookie layer for encrypted credentials.
//!
//! Cookie names are part of the contract with the frontend; the values are
//! opaque ciphertext produced by the token codec. All cookies are `HttpOnly`
//! and scoped to the whole site, with `Secure` added when the frontend is
//! served over HTTPS.

use axum::http::{header::InvalidHeaderValue, HeaderMap, HeaderValue};

/// Service-scoped access token (client-credentials grant).
pub const SERVICE_ACCESS_COOKIE: &str = "spotify_access_token";
/// User-scoped access token (authorization-code grant).
pub const USER_ACCESS_COOKIE: &str = "spotify_user_access_token";
/// User-scoped refresh token (authorization-code grant).
pub const USER_REFRESH_COOKIE: &str = "spotify_user_refresh_token";

/// Build a `Set-Cookie` value for an encrypted token.
///
/// # Errors
/// Returns an error if the assembled value is not a valid header.
pub fn token_cookie(
    name: &str,
    encrypted: &str,
    max_age_seconds: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{name}={encrypted}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Read a cookie value from the request headers, if present.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

/// Presence check used by the redirect router; deliberately does not decrypt.
#[must_use]
pub fn has_cookie(headers: &HeaderMap, name: &str) -> bool {
    read_cookie(headers, name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn token_cookie_formats_attributes() {
        let cookie = token_cookie(SERVICE_ACCESS_COOKIE, "ciphertext", 3600, false);
        assert_eq!(
            cookie.ok().as_ref().and_then(|v| v.to_str().ok()),
            Some("spotify_access_token=ciphertext; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600")
        );
    }

    #[test]
    fn token_cookie_adds_secure_flag() {
        let cookie = token_cookie(USER_ACCESS_COOKIE, "ciphertext", 60, true);
        let value = cookie.ok();
        let text = value.as_ref().and_then(|v| v.to_str().ok());
        assert!(text.is_some_and(|t| t.ends_with("; Secure")));
    }

    #[test]
    fn read_cookie_finds_named_pair() {
        let headers = headers_with("a=1; spotify_access_token=ciphertext; b=2");
        assert_eq!(
            read_cookie(&headers, SERVICE_ACCESS_COOKIE),
            Some("ciphertext".to_string())
        );
        assert_eq!(read_cookie(&headers, USER_ACCESS_COOKIE), None);
    }

    #[test]
    fn read_cookie_ignores_empty_values() {
        let headers = headers_with("spotify_access_token=");
        assert_eq!(read_cookie(&headers, SERVICE_ACCESS_COOKIE), None);
        assert!(!has_cookie(&headers, SERVICE_ACCESS_COOKIE));
    }

    #[test]
    fn read_cookie_missing_header() {
        let headers = HeaderMap::new();
        assert_eq!(read_cookie(&headers, SERVICE_ACCESS_COOKIE), None);
    }
}
