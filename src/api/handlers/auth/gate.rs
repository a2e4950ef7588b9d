//! Session gate: the single decision function for "may this caller proceed".
//!
//! Handlers that call the provider decrypt through here on every use. The
//! gate never refreshes a token itself; on a stale or broken credential the
//! caller answers 401 and the redirect router owns re-acquisition.

use axum::http::HeaderMap;
use chrono::Utc;
use tracing::debug;

use super::codec::{BearerToken, TokenCodec};
use super::cookies::read_cookie;

/// Gate verdict for a single cookie.
#[derive(Debug)]
pub enum Session {
    Authorized(BearerToken),
    Unauthorized(DenyReason),
}

/// Why the gate refused. All variants fail closed to "no token".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Missing,
    DecryptFailed,
    Expired,
}

impl DenyReason {
    /// Stable error code for the 401 body. Broken and expired credentials
    /// share a code; the distinction stays server-side.
    #[must_use]
    pub(crate) const fn error_code(self) -> &'static str {
        match self {
            Self::Missing => crate::api::errors::CODE_MISSING_TOKEN,
            Self::DecryptFailed | Self::Expired => crate::api::errors::CODE_INVALID_TOKEN,
        }
    }
}

/// Decrypt and validate the named credential cookie.
#[must_use]
pub fn check(headers: &HeaderMap, cookie_name: &str, codec: &TokenCodec) -> Session {
    let Some(encoded) = read_cookie(headers, cookie_name) else {
        return Session::Unauthorized(DenyReason::Missing);
    };

    let token = match codec.decrypt(&encoded) {
        Ok(token) => token,
        Err(err) => {
            // Tampered or stale-key cookies are expected noise, not incidents.
            debug!("cookie {cookie_name} rejected: {err}");
            return Session::Unauthorized(DenyReason::DecryptFailed);
        }
    };

    if token.is_expired(Utc::now()) {
        return Session::Unauthorized(DenyReason::Expired);
    }

    Session::Authorized(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue};
    use chrono::Duration;
    use std::collections::BTreeSet;

    const KEY: [u8; 32] = [7u8; 32];

    fn token(expires_in: Duration) -> BearerToken {
        BearerToken {
            value: "access-token".to_string(),
            expires_at: Utc::now() + expires_in,
            scope: BTreeSet::new(),
        }
    }

    fn headers_with_cookie(name: &str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let header = HeaderValue::from_str(&format!("{name}={value}"));
        if let Ok(header) = header {
            headers.insert(COOKIE, header);
        }
        headers
    }

    #[test]
    fn missing_cookie_is_unauthorized() {
        let codec = TokenCodec::new(KEY);
        let verdict = check(&HeaderMap::new(), "spotify_access_token", &codec);
        assert!(matches!(
            verdict,
            Session::Unauthorized(DenyReason::Missing)
        ));
    }

    #[test]
    fn valid_cookie_is_authorized() {
        let codec = TokenCodec::new(KEY);
        let token = token(Duration::hours(1));
        let encoded = codec.encrypt(&token).unwrap_or_default();
        let headers = headers_with_cookie("spotify_access_token", &encoded);
        let verdict = check(&headers, "spotify_access_token", &codec);
        match verdict {
            Session::Authorized(decrypted) => assert_eq!(decrypted, token),
            Session::Unauthorized(reason) => panic!("expected authorized, got {reason:?}"),
        }
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = TokenCodec::new(KEY);
        let encoded = codec.encrypt(&token(Duration::minutes(-1))).unwrap_or_default();
        let headers = headers_with_cookie("spotify_access_token", &encoded);
        let verdict = check(&headers, "spotify_access_token", &codec);
        assert!(matches!(
            verdict,
            Session::Unauthorized(DenyReason::Expired)
        ));
    }

    #[test]
    fn tampered_cookie_fails_closed() {
        let codec = TokenCodec::new(KEY);
        let headers = headers_with_cookie("spotify_access_token", "bm90LWEtdG9rZW4");
        let verdict = check(&headers, "spotify_access_token", &codec);
        assert!(matches!(
            verdict,
            Session::Unauthorized(DenyReason::DecryptFailed)
        ));
    }

    #[test]
    fn deny_reasons_share_invalid_code() {
        assert_eq!(
            DenyReason::DecryptFailed.error_code(),
            DenyReason::Expired.error_code()
        );
        assert_ne!(
            DenyReason::Missing.error_code(),
            DenyReason::Expired.error_code()
        );
    }

    #[test]
    fn wrong_key_fails_closed() {
        let codec = TokenCodec::new(KEY);
        let other = TokenCodec::new([8u8; 32]);
        let encoded = other.encrypt(&token(Duration::hours(1))).unwrap_or_default();
        let headers = headers_with_cookie("spotify_access_token", &encoded);
        let verdict = check(&headers, "spotify_access_token", &codec);
        assert!(matches!(
            verdict,
            Session::Unauthorized(DenyReason::DecryptFailed)
        ));
    }
}
