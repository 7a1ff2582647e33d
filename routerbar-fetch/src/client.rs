//! `OpenRouter` HTTP client.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use routerbar_core::Usage;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::FetchError;
use crate::fetcher::UsageFetcher;
use crate::parser::parse_usage;

// ============================================================================
// Constants
// ============================================================================

/// `OpenRouter` API base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Key info endpoint.
const KEY_ENDPOINT: &str = "/auth/key";

/// Per-request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// User agent string for `RouterBar`.
const USER_AGENT_VALUE: &str = concat!("RouterBar/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// API Client
// ============================================================================

/// `OpenRouter` API client.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: Client,
    base_url: String,
}

impl OpenRouterClient {
    /// Creates a client for the public API.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be built, which
    /// only happens with a broken TLS setup.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(base_url, http))
    }

    /// Creates a client from an existing `reqwest::Client`.
    pub fn with_client(base_url: &str, http: Client) -> Self {
        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url.trim_end_matches('/')
        };
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    /// Returns the base URL requests go to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build request headers.
    fn build_headers(token: &str) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| FetchError::InvalidToken(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        Ok(headers)
    }

    /// Fetch key usage.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::EmptyToken` before any request for a blank token,
    /// `FetchError::Unauthorized` on 401/403, `FetchError::UnexpectedStatus`
    /// on any other non-2xx, and decode errors from [`parse_usage`].
    #[instrument(skip(self, token), fields(base_url = %self.base_url))]
    pub async fn fetch_key_usage(&self, token: &str) -> Result<Usage, FetchError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(FetchError::EmptyToken);
        }

        let url = format!("{}{}", self.base_url, KEY_ENDPOINT);
        let headers = Self::build_headers(token)?;

        debug!("Fetching key usage");
        let response = self.http.get(&url).headers(headers).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, "Response received");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized);
        }

        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        parse_usage(&body).inspect_err(|e| {
            warn!(error = %e, "Failed to parse usage response");
        })
    }
}

#[async_trait]
impl UsageFetcher for OpenRouterClient {
    async fn fetch_usage(&self, token: &str) -> Result<Usage, FetchError> {
        self.fetch_key_usage(token).await
    }
}

// ============================================================================
// Tests
// ============================================================================
