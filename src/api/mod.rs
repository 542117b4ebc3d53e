//! LeakOsint search API client
//!
//! The network call sits behind [`SearchTransport`] so the classification
//! logic in [`SearchClient`] can be exercised without a live endpoint.

mod http;
mod response;

pub use http::HttpTransport;
pub use response::{
    value_text, ApiResponse, DatabaseSection, Record, SearchResults, SearchSummary,
};

use crate::config::Settings;
use crate::error::QueryError;
use crate::utils::truncate_str;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Maximum number of body characters written to the debug log
const LOGGED_BODY_CHARS: usize = 500;

/// JSON body of a search call
#[derive(Clone, Serialize, PartialEq, Eq)]
pub struct SearchRequest {
    /// API credential
    pub token: String,
    /// Query text; only the first line of the user input
    pub request: String,
    /// Maximum number of results
    pub limit: u32,
    /// Result language code
    pub lang: String,
}

// The credential must never reach the logs
impl fmt::Debug for SearchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchRequest")
            .field("token", &"[MASKED]")
            .field("request", &self.request)
            .field("limit", &self.limit)
            .field("lang", &self.lang)
            .finish()
    }
}

/// Status and body of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl RawResponse {
    /// Whether the status is 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Interface for issuing one search call
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Sends the request and returns the raw response.
    ///
    /// Connection failures and timeouts are reported as
    /// `QueryError::Transport`.
    async fn post(&self, request: &SearchRequest) -> Result<RawResponse, QueryError>;
}

/// Builds search requests and classifies their outcome
pub struct SearchClient {
    transport: Arc<dyn SearchTransport>,
    token: String,
    limit: u32,
    lang: String,
}

impl SearchClient {
    /// Create a client on top of an arbitrary transport
    #[must_use]
    pub fn new(
        transport: Arc<dyn SearchTransport>,
        token: impl Into<String>,
        limit: u32,
        lang: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            token: token.into(),
            limit,
            lang: lang.into(),
        }
    }

    /// Create an HTTP-backed client from settings
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Transport` if the HTTP client cannot be built.
    pub fn from_settings(settings: &Settings) -> Result<Self, QueryError> {
        let transport = HttpTransport::new(
            settings.leakosint_api_url.clone(),
            settings.search_timeout(),
        )?;
        Ok(Self::new(
            Arc::new(transport),
            settings.leakosint_api_token.clone(),
            settings.search_limit,
            settings.search_lang.clone(),
        ))
    }

    /// Request body for a raw user query; only its first line is searched,
    /// exactly as typed.
    #[must_use]
    pub fn request_for(&self, query: &str) -> SearchRequest {
        SearchRequest {
            token: self.token.clone(),
            request: query.split('\n').next().unwrap_or_default().to_string(),
            limit: self.limit,
            lang: self.lang.clone(),
        }
    }

    /// Runs one search and classifies the response.
    ///
    /// # Errors
    ///
    /// - `QueryError::Transport` on connection failures, timeouts and
    ///   non-success statuses without an API error body
    /// - `QueryError::Api` when the body carries an error indicator
    /// - `QueryError::Decode` when the body cannot be parsed
    /// - `QueryError::EmptyResult` when the results container is missing or
    ///   holds no sections
    #[instrument(skip(self, query))]
    pub async fn search(&self, query: &str) -> Result<SearchResults, QueryError> {
        let request = self.request_for(query);
        info!("Searching for: {}", request.request);

        let raw = self.transport.post(&request).await?;
        debug!(
            status = raw.status,
            "API response: {}",
            truncate_str(&raw.body, LOGGED_BODY_CHARS)
        );

        match ApiResponse::decode(&raw.body) {
            ApiResponse::ApiError(code) => {
                error!("API error: {code}");
                Err(QueryError::Api(code))
            }
            _ if !raw.is_success() => Err(QueryError::Transport(format!(
                "HTTP status {}",
                raw.status
            ))),
            ApiResponse::Malformed(reason) => {
                error!("Failed to decode response: {reason}");
                Err(QueryError::Decode(reason))
            }
            ApiResponse::MissingResults => {
                error!("No results container in response");
                Err(QueryError::EmptyResult)
            }
            ApiResponse::Success(results) if results.sections.is_empty() => {
                info!("Search returned no sections");
                Err(QueryError::EmptyResult)
            }
            ApiResponse::Success(results) => {
                let summary = &results.summary;
                info!(
                    sections = results.sections.len(),
                    results = ?summary.results,
                    free_requests_left = ?summary.free_requests_left,
                    search_time = ?summary.search_time,
                    "Search completed"
                );
                for section in &results.sections {
                    debug!(
                        section = %section.name,
                        records = section.records.len(),
                        reported = ?section.result_count,
                        "Section received"
                    );
                }
                Ok(results)
            }
        }
    }
}
