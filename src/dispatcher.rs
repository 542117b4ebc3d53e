//! Query dispatching
//!
//! Drives one search from the raw user query to the first displayable page:
//! authorize, search, format, cache, display. Navigation actions re-enter
//! through [`QueryDispatcher::navigate`] and only read the cache.

use crate::api::SearchClient;
use crate::config::Settings;
use crate::error::{NavigationError, QueryError};
use crate::report::{
    format_sections, wrap_index, NavigationControl, QueryId, ReportCache, ReportPage,
};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A page ready to be shown, with its navigation control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPage {
    /// Report the page belongs to
    pub id: QueryId,
    /// Wrapped index of the page
    pub index: usize,
    /// Number of pages in the report
    pub total: usize,
    /// Page content
    pub page: ReportPage,
    /// Previous/next control; `None` for single-page reports
    pub control: Option<NavigationControl>,
}

impl DisplayPage {
    fn from_pages(id: QueryId, pages: &[ReportPage], requested: i64) -> Option<Self> {
        let total = pages.len();
        let index = wrap_index(requested, total);
        let page = pages.get(index)?.clone();
        Some(Self {
            id,
            index,
            total,
            page,
            control: NavigationControl::build(id, requested, total),
        })
    }
}

/// Entry point for search queries and page navigation
pub struct QueryDispatcher {
    client: SearchClient,
    cache: ReportCache,
    allowed_users: HashSet<i64>,
    max_page_length: usize,
}

impl QueryDispatcher {
    /// Creates a dispatcher from its collaborators.
    ///
    /// An empty `allowed_users` set lets everybody search.
    #[must_use]
    pub fn new(
        client: SearchClient,
        cache: ReportCache,
        allowed_users: HashSet<i64>,
        max_page_length: usize,
    ) -> Self {
        Self {
            client,
            cache,
            allowed_users,
            max_page_length,
        }
    }

    /// Wires an HTTP-backed dispatcher from settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_settings(settings: &Settings) -> Result<Self, QueryError> {
        let client = SearchClient::from_settings(settings)?;
        let cache = ReportCache::new(
            Duration::from_secs(settings.report_cache_ttl_secs),
            settings.report_cache_max_size,
        );
        Ok(Self::new(
            client,
            cache,
            settings.allowed_users(),
            settings.max_message_length,
        ))
    }

    /// The report cache shared with navigation
    #[must_use]
    pub const fn cache(&self) -> &ReportCache {
        &self.cache
    }

    /// Whether `user_id` may use the bot
    #[must_use]
    pub fn is_authorized(&self, user_id: i64) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.contains(&user_id)
    }

    /// Checks the allow-list.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Unauthorized` when an allow-list is configured
    /// and `user_id` is not on it.
    pub fn authorize(&self, user_id: i64) -> Result<(), QueryError> {
        if self.is_authorized(user_id) {
            Ok(())
        } else {
            Err(QueryError::Unauthorized(user_id))
        }
    }

    /// Searches `query` on behalf of `user_id` and returns its first page.
    ///
    /// Nothing is cached unless the search produced at least one page.
    ///
    /// # Errors
    ///
    /// Any [`QueryError`]; each one ends the request.
    pub async fn dispatch(&self, user_id: i64, query: &str) -> Result<DisplayPage, QueryError> {
        debug!(user_id, "Authorizing query");
        if let Err(e) = self.authorize(user_id) {
            warn!(user_id, "Rejected unauthorized query");
            return Err(e);
        }

        let id = self.cache.allocate_id();
        debug!(user_id, %id, "Dispatching search");
        let results = self.client.search(query).await.inspect_err(|e| {
            warn!(%id, kind = e.kind(), "Search failed: {e}");
        })?;

        let pages = format_sections(&results.sections, self.max_page_length);
        if pages.is_empty() {
            warn!(%id, "Search produced no pages");
            return Err(QueryError::EmptyResult);
        }

        let pages = self.cache.insert(id, pages).await;
        info!(user_id, %id, pages = pages.len(), "Report cached");

        DisplayPage::from_pages(id, &pages, 0).ok_or(QueryError::EmptyResult)
    }

    /// Returns page `requested` (wrapped) of a cached report.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::Expired` if the report is unknown or evicted.
    pub async fn navigate(
        &self,
        id: QueryId,
        requested: i64,
    ) -> Result<DisplayPage, NavigationError> {
        let pages = self.cache.get(id).await.ok_or(NavigationError::Expired(id))?;
        let page =
            DisplayPage::from_pages(id, &pages, requested).ok_or(NavigationError::Expired(id))?;
        debug!(%id, requested, index = page.index, total = page.total, "Navigated");
        Ok(page)
    }
}
