//! HTTP client adapter for the broker management API.
//!
//! Tools call [`BrokerTransport`] instead of reqwest directly, which keeps
//! the dispatcher testable with [`mock::MockTransport`].

use std::error::Error as _;
use std::future::Future;
use std::time::Duration;

use reqwest::header::ACCEPT;

use crate::config::BrokerCredentials;
use crate::request::{Method, RestCall};

/// Status and body of a broker response, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// No HTTP response was obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Request to the broker timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Could not reach the broker: {0}")]
    ConnectionFailed(String),
}

/// Issues a single call against the broker. No retries, no caching.
pub trait BrokerTransport: Send + Sync + 'static {
    fn execute(
        &self,
        call: &RestCall,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

// ── HttpTransport: real implementation backed by reqwest ─────────────

/// Authenticated reqwest client bound to one broker.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    credentials: BrokerCredentials,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(credentials: BrokerCredentials, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("emqx-mcp-server/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            credentials,
            timeout,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            return TransportError::Timeout(self.timeout);
        }
        // reqwest's own message is generic; the root cause says what failed.
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message = format!("{}: {}", message, cause);
            source = cause.source();
        }
        TransportError::ConnectionFailed(message)
    }

    /// Base URL with the call's segments appended, each percent-encoded.
    fn url_for(&self, call: &RestCall) -> Result<reqwest::Url, TransportError> {
        let base = &self.credentials.base_url;
        let mut url = reqwest::Url::parse(base)
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                TransportError::ConnectionFailed(format!("{} cannot carry a path", base))
            })?
            .pop_if_empty()
            .extend(&call.segments);
        Ok(url)
    }
}

impl BrokerTransport for HttpTransport {
    async fn execute(&self, call: &RestCall) -> Result<RawResponse, TransportError> {
        let url = self.url_for(call)?;

        let mut request = self
            .client
            .request(call.method.into(), url)
            .basic_auth(&self.credentials.key, Some(&self.credentials.secret))
            .header(ACCEPT, "application/json");
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        log::debug!("{} -> {} ({} bytes)", call, status, body.len());
        Ok(RawResponse { status, body })
    }
}

// ── MockTransport for testing ────────────────────────────────────────
