use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError, TransportError};
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SEARCH_JOBS_PATH: &str = "/services/search/jobs";

/// Maximum number of bytes of a response body carried into error messages.
const MAX_BODY_SNIPPET: usize = 200;

/// A request the scrape engine can issue against the management API.
///
/// Searches are a two step affair: the first request submits the query and
/// yields a search id, every following request polls that id for results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplunkRequest {
    SubmitSearch { query: String },
    SearchResults { job_id: String },
    Api { path: String },
}

impl SplunkRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            SplunkRequest::SubmitSearch { .. } => "submit_search",
            SplunkRequest::SearchResults { .. } => "search_results",
            SplunkRequest::Api { .. } => "api",
        }
    }
}

/// Status code and fully-read body of a response.
///
/// The underlying connection has already been handed back to the pool by the
/// time one of these exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self::new(status, Bytes::new())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body text cut down for logs and error messages.
    pub fn snippet(&self) -> String {
        truncate_body(&self.body, MAX_BODY_SNIPPET)
    }

    pub(crate) fn into_http_error(self) -> ScrapeError {
        ScrapeError::Http {
            status: self.status,
            body: self.snippet(),
        }
    }
}

/// Executes requests against a Splunk instance.
#[async_trait::async_trait]
pub trait SplunkTransport: Send + Sync {
    async fn send(&self, request: SplunkRequest) -> std::result::Result<RawResponse, TransportError>;
}

/// `reqwest` backed transport with basic auth.
pub struct SplunkClient {
    endpoint: String,
    username: String,
    password: String,
    client: Client,
}

impl SplunkClient {
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] if the HTTP client cannot be built.
    pub fn new(config: &ScraperConfig) -> std::result::Result<Self, TransportError> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.trim().trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.endpoint, path)
        } else {
            format!("{}/{}", self.endpoint, path)
        }
    }

    fn build(&self, request: &SplunkRequest) -> reqwest::RequestBuilder {
        let builder = match request {
            SplunkRequest::SubmitSearch { query } => self
                .client
                .post(self.url(SEARCH_JOBS_PATH))
                .form(&[("search", query.as_str())]),
            SplunkRequest::SearchResults { job_id } => self
                .client
                .get(self.url(&format!("{SEARCH_JOBS_PATH}/{job_id}/results"))),
            SplunkRequest::Api { path } => self.client.get(self.url(path)),
        };

        if self.username.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.username, Some(&self.password))
        }
    }
}

#[async_trait::async_trait]
impl SplunkTransport for SplunkClient {
    async fn send(&self, request: SplunkRequest) -> std::result::Result<RawResponse, TransportError> {
        let response = self.build(&request).send().await?;
        let status = response.status().as_u16();
        // Reading to the end consumes the response, which releases the
        // connection whether or not the body turns out to be decodable.
        let body = response.bytes().await?;

        tracing::debug!(
            kind = request.kind(),
            status,
            bytes = body.len(),
            "Splunk API response"
        );

        Ok(RawResponse { status, body })
    }
}

/// Sends `request`, giving up as soon as `cancel` fires.
pub(crate) async fn send_cancellable(
    transport: &dyn SplunkTransport,
    request: SplunkRequest,
    cancel: &CancellationToken,
) -> Result<RawResponse> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
        res = transport.send(request) => res.map_err(ScrapeError::from),
    }
}

/// Sleeps for `delay`, returning early with [`ScrapeError::Cancelled`] if
/// `cancel` fires first.
pub(crate) async fn sleep_cancellable(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Truncate a UTF-8 body to at most `max` bytes, snapping to the nearest
/// char boundary so we never split a multi-byte character.
fn truncate_body(bytes: &[u8], max: usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.len() > max => {
            let mut end = max;
            while end > 0 && !s.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &s[..end])
        }
        Ok(s) => s.to_string(),
        Err(_) => "<non-utf8 body>".to_string(),
    }
}
