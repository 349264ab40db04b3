use crate::client::{send_cancellable, SplunkRequest, SplunkTransport};
use crate::decode::EndpointRecord;
use crate::error::{DecodeError, Result};
use tokio_util::sync::CancellationToken;

/// Decoder for one plain endpoint's body.
pub type EndpointDecoder = fn(&[u8]) -> std::result::Result<Option<EndpointRecord>, DecodeError>;

/// Single request, single decode. No retries and no pagination.
pub struct EndpointFetcher<'a> {
    transport: &'a dyn SplunkTransport,
}

impl<'a> EndpointFetcher<'a> {
    pub fn new(transport: &'a dyn SplunkTransport) -> Self {
        Self { transport }
    }

    /// Fetches `path` and decodes it. An empty body yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, a [`crate::error::ScrapeError::Http`]
    /// for non-2xx statuses, or the decode failure.
    pub async fn fetch(
        &self,
        path: &str,
        decode: EndpointDecoder,
        cancel: &CancellationToken,
    ) -> Result<Option<EndpointRecord>> {
        let request = SplunkRequest::Api {
            path: path.to_string(),
        };
        let response = send_cancellable(self.transport, request, cancel).await?;

        if !response.is_success() {
            return Err(response.into_http_error());
        }

        Ok(decode(&response.body)?)
    }
}
