//! Outbound Spotify client: token exchanges and catalog calls.
//!
//! One `reqwest` client with a bounded timeout is built at startup and
//! shared. Every exchange is a single attempt; a non-2xx from the provider
//! is logged with its status and surfaced as a typed error for the handler
//! layer to translate. Retries are a client concern, never done here.

use anyhow::{anyhow, Context, Result};
use base64ct::{Base64, Encoding};
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, instrument};
use url::Url;

use crate::api::handlers::auth::{AuthConfig, BearerToken};

const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
const API_BASE_URL: &str = "https://api.spotify.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Scopes requested for user-level tokens: profile plus playlist write.
pub const USER_SCOPE: &str =
    "user-read-private user-read-email playlist-modify-public playlist-modify-private";

/// Failure talking to the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-2xx status.
    #[error("provider returned {0}")]
    Status(StatusCode),
    /// Transport failure, timeout, or an unreadable response body.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Result of an authorization-code exchange.
#[derive(Debug)]
pub struct UserGrant {
    pub access: BearerToken,
    pub refresh_value: String,
}

/// Wire shape of the provider token endpoint response.
#[derive(Deserialize, Debug)]
struct TokenExchangeResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Spotify API client holding the application credentials.
pub struct SpotifyClient {
    http: Client,
    client_id: String,
    authorization: String,
    redirect_uri: String,
    accounts_base_url: String,
    api_base_url: String,
}

impl SpotifyClient {
    /// Build the client from the broker configuration.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        // Basic credentials are fixed for the process lifetime; precompute.
        let authorization = format!(
            "Basic {}",
            Base64::encode_string(
                format!(
                    "{}:{}",
                    config.spotify_client_id(),
                    config.spotify_client_secret().expose_secret()
                )
                .as_bytes()
            )
        );

        Ok(Self {
            http,
            client_id: config.spotify_client_id().to_string(),
            authorization,
            redirect_uri: config.spotify_redirect_uri().to_string(),
            accounts_base_url: ACCOUNTS_BASE_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        })
    }

    /// Override provider base URLs; used by tests against a local stub.
    #[must_use]
    pub fn with_base_urls(mut self, accounts: String, api: String) -> Self {
        self.accounts_base_url = accounts;
        self.api_base_url = api;
        self
    }

    /// Build the user-authorization URL for the authorization-code grant.
    ///
    /// # Errors
    /// Returns an error if the base URL cannot be parsed.
    pub fn authorize_url(&self, state: &str) -> Result<Url> {
        let mut url = Url::parse(&self.accounts_base_url)
            .and_then(|base| base.join("/authorize"))
            .context("invalid accounts base URL")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", USER_SCOPE)
            .append_pair("state", state);
        Ok(url)
    }

    /// Exchange application credentials for a service-level token.
    ///
    /// # Errors
    /// Returns [`ProviderError::Status`] on a non-2xx provider response and
    /// [`ProviderError::Transport`] on transport or decoding failures.
    #[instrument(skip(self))]
    pub async fn client_credentials_token(&self) -> Result<BearerToken, ProviderError> {
        let response = self
            .token_exchange(&[("grant_type", "client_credentials")])
            .await?;
        Ok(bearer_from_exchange(
            response.access_token,
            response.expires_in,
            response.scope.as_deref(),
        ))
    }

    /// Exchange an authorization code for user-level tokens.
    ///
    /// # Errors
    /// Returns [`ProviderError::Status`] on a non-2xx provider response, and
    /// [`ProviderError::Transport`] on transport failures or a response
    /// missing the refresh token.
    #[instrument(skip(self, code))]
    pub async fn authorization_code_tokens(&self, code: &str) -> Result<UserGrant, ProviderError> {
        let response = self
            .token_exchange(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.redirect_uri),
            ])
            .await?;

        let refresh_value = response
            .refresh_token
            .ok_or_else(|| anyhow!("provider response missing refresh_token"))?;

        Ok(UserGrant {
            access: bearer_from_exchange(
                response.access_token,
                response.expires_in,
                response.scope.as_deref(),
            ),
            refresh_value,
        })
    }

    async fn token_exchange(
        &self,
        form: &[(&str, &str)],
    ) -> Result<TokenExchangeResponse, ProviderError> {
        let url = format!("{}/api/token", self.accounts_base_url);
        let response = self
            .http
            .post(&url)
            .header("Authorization", &self.authorization)
            .form(form)
            .send()
            .await
            .context("token exchange request failed")?;

        let status = response.status();
        if !status.is_success() {
            error!("token exchange rejected by provider: {status}");
            return Err(ProviderError::Status(status));
        }

        let body = response
            .json::<TokenExchangeResponse>()
            .await
            .context("failed to decode token exchange response")?;
        Ok(body)
    }

    /// Catalog search with a service-level token.
    ///
    /// # Errors
    /// Returns [`ProviderError::Status`] on a non-2xx provider response and
    /// [`ProviderError::Transport`] on transport failures.
    #[instrument(skip(self, token))]
    pub async fn search(&self, token: &str, query: &str) -> Result<Value, ProviderError> {
        let url = format!("{}/search", self.api_base_url);
        self.api_get(&url, token, &[("q", query), ("type", "track")])
            .await
    }

    /// Fetch the authenticated user's profile.
    ///
    /// # Errors
    /// Returns [`ProviderError::Status`] on a non-2xx provider response and
    /// [`ProviderError::Transport`] on transport failures.
    #[instrument(skip(self, token))]
    pub async fn profile(&self, token: &str) -> Result<Value, ProviderError> {
        let url = format!("{}/me", self.api_base_url);
        self.api_get(&url, token, &[]).await
    }

    async fn api_get(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ProviderError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .context("provider API request failed")?;

        let status = response.status();
        if !status.is_success() {
            error!("provider API call rejected: {status}");
            return Err(ProviderError::Status(status));
        }

        let body = response
            .json::<Value>()
            .await
            .context("failed to decode provider API response")?;
        Ok(body)
    }
}

impl std::fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

fn bearer_from_exchange(value: String, expires_in: i64, scope: Option<&str>) -> BearerToken {
    BearerToken {
        value,
        expires_at: Utc::now() + ChronoDuration::seconds(expires_in),
        scope: parse_scope(scope),
    }
}

fn parse_scope(scope: Option<&str>) -> BTreeSet<String> {
    scope
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
