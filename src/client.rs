//! TokenTally HTTP client implementation.

use std::time::Duration;

use crate::error::{Result, TokenTallyError};
use crate::session::TrackingSession;
use crate::types::{ApiErrorBody, TrackResult, UsageEvent};

/// Default production endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.tokentally.io";

const USAGE_PATH: &str = "/api/usage";
const USER_AGENT: &str = concat!("tokentally-rust/", env!("CARGO_PKG_VERSION"));

/// TokenTally API client.
///
/// Holds the fixed configuration (API key, base URL, timeout) and performs
/// one blocking HTTP call per tracked event. The client is cheap to clone;
/// clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct TokenTallyClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl TokenTallyClient {
    /// Create a client with the default base URL and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TokenTallyError::Validation`] if the API key does not start
    /// with `tt_`, or [`TokenTallyError::Http`] if the HTTP client cannot be
    /// built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_options(api_key, ClientOptions::default())
    }

    /// Create a client with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`TokenTallyError::Validation`] if the API key does not start
    /// with `tt_` or the timeout is zero, or [`TokenTallyError::Http`] if the
    /// HTTP client cannot be built.
    pub fn with_options(api_key: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let api_key = api_key.into();
        if !api_key.starts_with("tt_") {
            return Err(TokenTallyError::Validation(
                "invalid API key: must start with 'tt_'".to_string(),
            ));
        }
        if options.timeout_seconds == 0 {
            return Err(TokenTallyError::Validation(
                "timeout_seconds must be positive".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Record a usage event.
    ///
    /// Performs exactly one HTTP POST. Submission is not idempotent: calling
    /// this twice with the same event produces two billed events.
    ///
    /// # Errors
    ///
    /// Returns [`TokenTallyError::Validation`] if the event fails local
    /// validation (no request is sent) or the service rejects it,
    /// [`TokenTallyError::Authentication`] on 401/403,
    /// [`TokenTallyError::RateLimit`] on 429, [`TokenTallyError::Api`] on
    /// 5xx, and [`TokenTallyError::Http`] on transport failure.
    pub fn track(&self, event: &UsageEvent) -> Result<TrackResult> {
        event.validate()?;

        let url = format!("{}{USAGE_PATH}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(event)
            .send()?;

        Self::handle_response(response)
    }

    /// Open a usage-tracking session for `model`.
    ///
    /// The session measures wall-clock time from this call until
    /// [`TrackingSession::finish`], which submits the recorded usage. No
    /// network call happens here.
    #[must_use]
    pub fn track_usage(&self, model: impl Into<String>) -> TrackingSession<'_> {
        TrackingSession::new(self, model.into())
    }

    /// Run `f` inside a tracking session with guaranteed finalization.
    ///
    /// If `f` returns `Err`, that error propagates unchanged and nothing is
    /// submitted; tracking never masks the caller's own failure. If `f`
    /// returns `Ok`, the session is finished and the value is returned
    /// together with the server's [`TrackResult`].
    ///
    /// # Errors
    ///
    /// Returns the closure's error as-is, or any [`TokenTallyError`] from
    /// finishing the session (converted via `E: From<TokenTallyError>`).
    pub fn track_scope<T, E, F>(
        &self,
        model: impl Into<String>,
        f: F,
    ) -> std::result::Result<(T, TrackResult), E>
    where
        F: FnOnce(&mut TrackingSession<'_>) -> std::result::Result<T, E>,
        E: From<TokenTallyError>,
    {
        let mut session = self.track_usage(model);
        let value = f(&mut session)?;
        let result = session.finish().map_err(E::from)?;
        Ok((value, result))
    }

    /// Map the HTTP response onto the error taxonomy.
    fn handle_response(response: reqwest::blocking::Response) -> Result<TrackResult> {
        let status = response.status();

        if status.is_success() {
            let result: TrackResult = response.json()?;
            tracing::debug!(
                record_id = %result.record_id,
                cost_usd = result.cost_usd,
                "usage event recorded"
            );
            return Ok(result);
        }

        let detail = response
            .text()
            .ok()
            .and_then(|body| error_detail(&body))
            .unwrap_or_else(|| format!("HTTP {status}"));

        match status.as_u16() {
            401 | 403 => Err(TokenTallyError::Authentication(detail)),
            429 => Err(TokenTallyError::RateLimit(detail)),
            400..=499 => Err(TokenTallyError::Validation(detail)),
            code => Err(TokenTallyError::Api {
                status: code,
                message: detail,
            }),
        }
    }
}

/// Extract the error detail from a response body, if it parses.
fn error_detail(body: &str) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
    parsed.error.or(parsed.message)
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the TokenTally service.
    pub base_url: String,
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}
