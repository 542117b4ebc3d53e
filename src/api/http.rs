use super::{RawResponse, SearchRequest, SearchTransport};
use crate::error::QueryError;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::time::Duration;

/// `reqwest`-backed transport posting JSON to the search endpoint
pub struct HttpTransport {
    client: HttpClient,
    url: String,
}

impl HttpTransport {
    /// Creates a transport with a fixed per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Transport` if the TLS backend cannot be initialised.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, QueryError> {
        let client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn post(&self, request: &SearchRequest) -> Result<RawResponse, QueryError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QueryError::Transport(format!("request timed out: {e}"))
                } else {
                    QueryError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| QueryError::Transport(format!("failed to read body: {e}")))?;

        Ok(RawResponse { status, body })
    }
}
