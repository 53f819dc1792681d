//! Anthropic API client struct and builder.

use std::future::Future;
use std::time::Duration;

use colloquy_turn::{CompletionRequest, CompletionResponse, Provider, ProviderError};

use crate::error::{map_http_status, map_reqwest_error};
use crate::mapping::{from_api_response, to_api_request};

/// Default model used when the request does not name one.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Upper bound on one completion call unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable read by [`Anthropic::from_env`].
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Default Anthropic API base URL.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
///
/// # Example
///
/// ```no_run
/// use colloquy_provider_anthropic::Anthropic;
/// use std::time::Duration;
///
/// let client = Anthropic::new("sk-ant-...")
///     .model("claude-opus-4-20250514")
///     .timeout(Duration::from_secs(30));
/// ```
#[derive(Clone)]
pub struct Anthropic {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
    pub(crate) client: reqwest::Client,
}

impl std::fmt::Debug for Anthropic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anthropic")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Anthropic {
    /// Create a client with the given API key and default settings.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from the `ANTHROPIC_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Authentication`] when the variable is unset or blank.
    pub fn from_env() -> Result<Self, ProviderError> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(ProviderError::Authentication(format!("{API_KEY_ENV} is not set"))),
        }
    }

    /// Override the default model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (local mock server, proxy).
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the per-call timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

impl Provider for Anthropic {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send {
        let url = self.messages_url();
        let api_key = self.api_key.clone();
        let default_model = self.model.clone();
        let timeout = self.timeout;
        let http_client = self.client.clone();

        async move {
            if api_key.trim().is_empty() {
                return Err(ProviderError::Authentication("API key is empty".into()));
            }

            let body = to_api_request(&request, &default_model);

            tracing::debug!(url = %url, model = body.model, "sending completion request");

            let response = http_client
                .post(&url)
                .timeout(timeout)
                .header("x-api-key", &api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, timeout))?;

            let status = response.status();
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let response_text = response
                .text()
                .await
                .map_err(|e| map_reqwest_error(e, timeout))?;

            if !status.is_success() {
                tracing::warn!(status = status.as_u16(), "completion request rejected");
                return Err(map_http_status(status, retry_after.as_deref(), &response_text));
            }

            from_api_response(&response_text)
        }
    }
}
