//! Auth configuration and shared handler state.

use secrecy::SecretString;

use super::codec::TokenCodec;
use crate::spotify::SpotifyClient;

const DEFAULT_OTP_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_USER_REFRESH_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Static configuration for the credential broker, built once at startup and
/// passed into constructors; no ambient lookup inside handlers.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    spotify_client_id: String,
    spotify_client_secret: SecretString,
    spotify_redirect_uri: String,
    otp_ttl_seconds: i64,
    user_refresh_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            spotify_client_id: String::new(),
            spotify_client_secret: SecretString::default(),
            spotify_redirect_uri: "http://localhost:8080/callback".to_string(),
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            user_refresh_ttl_seconds: DEFAULT_USER_REFRESH_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_spotify_client_id(mut self, client_id: String) -> Self {
        self.spotify_client_id = client_id;
        self
    }

    #[must_use]
    pub fn with_spotify_client_secret(mut self, client_secret: SecretString) -> Self {
        self.spotify_client_secret = client_secret;
        self
    }

    #[must_use]
    pub fn with_spotify_redirect_uri(mut self, redirect_uri: String) -> Self {
        self.spotify_redirect_uri = redirect_uri;
        self
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_user_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.user_refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn spotify_client_id(&self) -> &str {
        &self.spotify_client_id
    }

    #[must_use]
    pub fn spotify_client_secret(&self) -> &SecretString {
        &self.spotify_client_secret
    }

    #[must_use]
    pub fn spotify_redirect_uri(&self) -> &str {
        &self.spotify_redirect_uri
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(crate) fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }

    pub(crate) fn user_refresh_ttl_seconds(&self) -> i64 {
        self.user_refresh_ttl_seconds
    }

    /// Cookies only carry `Secure` when the frontend is served over HTTPS.
    pub(crate) fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Shared state for auth handlers: config, the token codec, and the provider
/// client. Read-only after startup.
pub struct AuthState {
    config: AuthConfig,
    codec: TokenCodec,
    spotify: SpotifyClient,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, cookie_key: [u8; 32], spotify: SpotifyClient) -> Self {
        Self {
            config,
            codec: TokenCodec::new(cookie_key),
            spotify,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    #[must_use]
    pub fn spotify(&self) -> &SpotifyClient {
        &self.spotify
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_overrides() {
        let config = AuthConfig::new("http://localhost:3000".to_string());
        assert_eq!(config.otp_ttl_seconds(), super::DEFAULT_OTP_TTL_SECONDS);
        assert_eq!(
            config.user_refresh_ttl_seconds(),
            super::DEFAULT_USER_REFRESH_TTL_SECONDS
        );
        assert!(!config.cookie_secure());

        let config = config
            .with_spotify_client_id("client-id".to_string())
            .with_otp_ttl_seconds(120)
            .with_user_refresh_ttl_seconds(3600);
        assert_eq!(config.spotify_client_id(), "client-id");
        assert_eq!(config.otp_ttl_seconds(), 120);
        assert_eq!(config.user_refresh_ttl_seconds(), 3600);
    }

    #[test]
    fn secure_cookies_follow_frontend_scheme() {
        let config = AuthConfig::new("https://stagelist.app".to_string());
        assert!(config.cookie_secure());
    }
}
