//! Shared fixtures for handler tests.

use secrecy::SecretString;
use std::sync::Arc;

use super::state::{AuthConfig, AuthState};
use crate::spotify::SpotifyClient;

pub(crate) const TEST_COOKIE_KEY: [u8; 32] = [7u8; 32];

pub(crate) fn auth_state() -> Arc<AuthState> {
    let config = AuthConfig::new("http://localhost:3000".to_string())
        .with_spotify_client_id("client-id".to_string())
        .with_spotify_client_secret(SecretString::from("client-secret".to_string()))
        .with_spotify_redirect_uri("http://localhost:8080/callback".to_string());
    let spotify = match SpotifyClient::new(&config) {
        Ok(spotify) => spotify,
        Err(err) => panic!("test client construction failed: {err}"),
    };
    Arc::new(AuthState::new(config, TEST_COOKIE_KEY, spotify))
}
