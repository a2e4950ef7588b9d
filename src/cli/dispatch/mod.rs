//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, spotify};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let spotify_opts = spotify::Options::parse(matches)?;
    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        spotify_client_id: spotify_opts.client_id,
        spotify_client_secret: spotify_opts.client_secret,
        spotify_redirect_uri: spotify_opts.redirect_uri,
        cookie_key: auth_opts.cookie_key,
        frontend_base_url: auth_opts.frontend_base_url,
        otp_ttl_seconds: auth_opts.otp_ttl_seconds,
        user_refresh_ttl_seconds: auth_opts.user_refresh_ttl_seconds,
        email_outbox_poll_seconds: auth_opts.outbox.poll_seconds,
        email_outbox_batch_size: auth_opts.outbox.batch_size,
        email_outbox_max_attempts: auth_opts.outbox.max_attempts,
        email_outbox_backoff_base_seconds: auth_opts.outbox.backoff_base_seconds,
        email_outbox_backoff_max_seconds: auth_opts.outbox.backoff_max_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn dsn_required() {
        temp_env::with_vars(
            [
                ("STAGELIST_DSN", None::<&str>),
                ("STAGELIST_SPOTIFY_CLIENT_ID", Some("client-id")),
                ("STAGELIST_SPOTIFY_CLIENT_SECRET", Some("client-secret")),
                (
                    "STAGELIST_COOKIE_KEY",
                    Some("MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY="),
                ),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.try_get_matches_from(vec!["stagelist"]);
                // clap enforces --dsn before dispatch runs
                assert!(matches.is_err());
            },
        );
    }

    #[test]
    fn server_action_built_from_matches() {
        temp_env::with_vars(
            [
                (
                    "STAGELIST_DSN",
                    Some("postgres://user@localhost:5432/stagelist"),
                ),
                ("STAGELIST_SPOTIFY_CLIENT_ID", Some("client-id")),
                ("STAGELIST_SPOTIFY_CLIENT_SECRET", Some("client-secret")),
                (
                    "STAGELIST_COOKIE_KEY",
                    Some("MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY="),
                ),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["stagelist"]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 8080);
                    assert_eq!(args.spotify_client_id, "client-id");
                    assert_eq!(args.otp_ttl_seconds, 600);
                    assert_eq!(args.cookie_key, *b"0123456789abcdef0123456789abcdef");
                }
            },
        );
    }
}
