use crate::error::{self, SlackError};
use relnote_core::transport::TransportResult;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://slack.com/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticated Slack Web API client. Every request is bounded by the
/// client-wide timeout.
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Result<Self, SlackError> {
        Self::with_options(token, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_options(
        token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SlackError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SlackError::MissingToken);
        }
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("relnote/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// Write methods: JSON body.
    pub(crate) async fn post_json<T: DeserializeOwned>(&self, method: &str, body: &Value) -> TransportResult<T> {
        tracing::debug!(method, "slack api call");
        let response = self
            .http
            .post(self.url(method))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await;
        self.decode(method, response).await
    }

    /// Read methods: form-encoded parameters, accepted by every Web API method.
    pub(crate) async fn post_form<T: DeserializeOwned>(&self, method: &str, params: &[(&str, String)]) -> TransportResult<T> {
        tracing::debug!(method, "slack api call");
        let response = self
            .http
            .post(self.url(method))
            .bearer_auth(&self.token)
            .form(params)
            .send()
            .await;
        self.decode(method, response).await
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        method: &str,
        response: reqwest::Result<reqwest::Response>,
    ) -> TransportResult<T> {
        let response = response.map_err(|e| error::from_reqwest(method, &e))?;
        let response = response
            .error_for_status()
            .map_err(|e| error::from_reqwest(method, &e))?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| error::from_reqwest(method, &e))?;

        if payload.get("ok").and_then(Value::as_bool) != Some(true) {
            let err = error::from_payload(method, &payload);
            tracing::debug!(method, code = %err.code, "slack api error");
            return Err(err);
        }
        serde_json::from_value(payload.clone()).map_err(|e| {
            relnote_core::TransportError::new(
                relnote_core::TransportErrorKind::Other,
                "invalid_response",
                format!("{method} returned an unexpected shape: {e}"),
            )
            .with_detail(payload)
        })
    }
}
