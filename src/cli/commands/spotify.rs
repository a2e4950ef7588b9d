use anyhow::{Context, Result};
use clap::{Arg, Command};

pub const ARG_SPOTIFY_CLIENT_ID: &str = "spotify-client-id";
pub const ARG_SPOTIFY_CLIENT_SECRET: &str = "spotify-client-secret";
pub const ARG_SPOTIFY_REDIRECT_URI: &str = "spotify-redirect-uri";

/// Parsed Spotify application credentials.
#[derive(Debug)]
pub struct Options {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl Options {
    /// Extract Spotify options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let client_id = matches
            .get_one::<String>(ARG_SPOTIFY_CLIENT_ID)
            .cloned()
            .context("missing required argument: --spotify-client-id")?;
        let client_secret = matches
            .get_one::<String>(ARG_SPOTIFY_CLIENT_SECRET)
            .cloned()
            .context("missing required argument: --spotify-client-secret")?;
        let redirect_uri = matches
            .get_one::<String>(ARG_SPOTIFY_REDIRECT_URI)
            .cloned()
            .context("missing required argument: --spotify-redirect-uri")?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SPOTIFY_CLIENT_ID)
                .long(ARG_SPOTIFY_CLIENT_ID)
                .help("Spotify application client id")
                .env("STAGELIST_SPOTIFY_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SPOTIFY_CLIENT_SECRET)
                .long(ARG_SPOTIFY_CLIENT_SECRET)
                .help("Spotify application client secret")
                .env("STAGELIST_SPOTIFY_CLIENT_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SPOTIFY_REDIRECT_URI)
                .long(ARG_SPOTIFY_REDIRECT_URI)
                .help("Redirect URI registered with the Spotify application")
                .env("STAGELIST_SPOTIFY_REDIRECT_URI")
                .default_value("http://localhost:8080/callback"),
        )
}
