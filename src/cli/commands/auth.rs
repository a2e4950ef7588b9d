use anyhow::{Context, Result};
use base64ct::{Base64, Encoding};
use clap::{builder::ValueParser, Arg, Command};

pub const ARG_COOKIE_KEY: &str = "cookie-key";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_OTP_TTL_SECONDS: &str = "otp-ttl-seconds";
pub const ARG_USER_REFRESH_TTL_SECONDS: &str = "user-refresh-ttl-seconds";

/// Parsed auth/cookie options.
#[derive(Debug)]
pub struct Options {
    pub cookie_key: [u8; 32],
    pub frontend_base_url: String,
    pub otp_ttl_seconds: i64,
    pub user_refresh_ttl_seconds: i64,
    pub outbox: OutboxOptions,
}

/// Email outbox worker knobs.
#[derive(Debug)]
pub struct OutboxOptions {
    pub poll_seconds: u64,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_seconds: u64,
    pub backoff_max_seconds: u64,
}

impl Options {
    /// Extract auth options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if the cookie key is missing or not a base64-encoded
    /// 32-byte value.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let encoded = matches
            .get_one::<String>(ARG_COOKIE_KEY)
            .cloned()
            .context("missing required argument: --cookie-key")?;
        let cookie_key = decode_cookie_key(&encoded)?;

        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_BASE_URL)
            .cloned()
            .context("missing required argument: --frontend-base-url")?;
        let otp_ttl_seconds = matches
            .get_one::<i64>(ARG_OTP_TTL_SECONDS)
            .copied()
            .unwrap_or(600);
        let user_refresh_ttl_seconds = matches
            .get_one::<i64>(ARG_USER_REFRESH_TTL_SECONDS)
            .copied()
            .unwrap_or(30 * 24 * 60 * 60);

        Ok(Self {
            cookie_key,
            frontend_base_url,
            otp_ttl_seconds,
            user_refresh_ttl_seconds,
            outbox: OutboxOptions::parse(matches),
        })
    }
}

impl OutboxOptions {
    fn parse(matches: &clap::ArgMatches) -> Self {
        Self {
            poll_seconds: matches
                .get_one::<u64>("email-outbox-poll-seconds")
                .copied()
                .unwrap_or(5),
            batch_size: matches
                .get_one::<usize>("email-outbox-batch-size")
                .copied()
                .unwrap_or(10),
            max_attempts: matches
                .get_one::<u32>("email-outbox-max-attempts")
                .copied()
                .unwrap_or(5),
            backoff_base_seconds: matches
                .get_one::<u64>("email-outbox-backoff-base-seconds")
                .copied()
                .unwrap_or(5),
            backoff_max_seconds: matches
                .get_one::<u64>("email-outbox-backoff-max-seconds")
                .copied()
                .unwrap_or(300),
        }
    }
}

/// Decode and length-check the base64 cookie encryption key.
///
/// # Errors
/// Returns an error on invalid base64 or a key that is not exactly 32 bytes.
pub fn decode_cookie_key(encoded: &str) -> Result<[u8; 32]> {
    let bytes = Base64::decode_vec(encoded.trim())
        .map_err(|_| anyhow::anyhow!("cookie key is not valid base64"))?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("cookie key must decode to exactly 32 bytes"))?;
    Ok(key)
}

#[must_use]
fn validator_cookie_key() -> ValueParser {
    ValueParser::from(
        move |encoded: &str| -> std::result::Result<String, String> {
            decode_cookie_key(encoded)
                .map(|_| encoded.to_string())
                .map_err(|err| err.to_string())
        },
    )
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = command
        .arg(
            Arg::new(ARG_COOKIE_KEY)
                .long(ARG_COOKIE_KEY)
                .help("Base64-encoded 32-byte key for token cookie encryption")
                .env("STAGELIST_COOKIE_KEY")
                .required(true)
                .value_parser(validator_cookie_key()),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL, used for CORS and cookie security")
                .env("STAGELIST_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_OTP_TTL_SECONDS)
                .long(ARG_OTP_TTL_SECONDS)
                .help("Password reset code validity window in seconds")
                .env("STAGELIST_OTP_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_USER_REFRESH_TTL_SECONDS)
                .long(ARG_USER_REFRESH_TTL_SECONDS)
                .help("Max-Age for the user refresh token cookie in seconds")
                .env("STAGELIST_USER_REFRESH_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64)),
        );
    with_outbox_args(command)
}

fn with_outbox_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("email-outbox-poll-seconds")
                .long("email-outbox-poll-seconds")
                .help("Email outbox poll interval in seconds")
                .env("STAGELIST_EMAIL_OUTBOX_POLL_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("email-outbox-batch-size")
                .long("email-outbox-batch-size")
                .help("Email outbox batch size per poll")
                .env("STAGELIST_EMAIL_OUTBOX_BATCH_SIZE")
                .default_value("10")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("email-outbox-max-attempts")
                .long("email-outbox-max-attempts")
                .help("Max attempts before marking an email as failed")
                .env("STAGELIST_EMAIL_OUTBOX_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("email-outbox-backoff-base-seconds")
                .long("email-outbox-backoff-base-seconds")
                .help("Base delay for email outbox retry backoff")
                .env("STAGELIST_EMAIL_OUTBOX_BACKOFF_BASE_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("email-outbox-backoff-max-seconds")
                .long("email-outbox-backoff-max-seconds")
                .help("Max delay for email outbox retry backoff")
                .env("STAGELIST_EMAIL_OUTBOX_BACKOFF_MAX_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
}
