use crate::{
    api,
    api::handlers::auth::{AuthConfig, AuthState},
    spotify::SpotifyClient,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;

/// Fully resolved server configuration built by dispatch.
#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    pub cookie_key: [u8; 32],
    pub frontend_base_url: String,
    pub otp_ttl_seconds: i64,
    pub user_refresh_ttl_seconds: i64,
    pub email_outbox_poll_seconds: u64,
    pub email_outbox_batch_size: usize,
    pub email_outbox_max_attempts: u32,
    pub email_outbox_backoff_base_seconds: u64,
    pub email_outbox_backoff_max_seconds: u64,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = AuthConfig::new(args.frontend_base_url)
        .with_spotify_client_id(args.spotify_client_id)
        .with_spotify_client_secret(SecretString::from(args.spotify_client_secret))
        .with_spotify_redirect_uri(args.spotify_redirect_uri)
        .with_otp_ttl_seconds(args.otp_ttl_seconds)
        .with_user_refresh_ttl_seconds(args.user_refresh_ttl_seconds);

    let spotify =
        SpotifyClient::new(&config).context("Failed to build Spotify API client")?;
    let auth_state = Arc::new(AuthState::new(config, args.cookie_key, spotify));

    let email_config = api::email::OutboxConfig::new()
        .with_poll_interval_seconds(args.email_outbox_poll_seconds)
        .with_batch_size(args.email_outbox_batch_size)
        .with_max_attempts(args.email_outbox_max_attempts)
        .with_backoff_base_seconds(args.email_outbox_backoff_base_seconds)
        .with_backoff_max_seconds(args.email_outbox_backoff_max_seconds);

    api::new(args.port, args.dsn, auth_state, email_config).await
}
