//! In-memory store of formatted reports keyed by query id.
//!
//! Entries expire after a configurable time-to-live and the cache is bounded
//! in size, so an abandoned search never pins memory for the lifetime of the
//! process. Navigating an evicted report behaves like navigating an unknown
//! one.

use super::page::ReportPage;
use super::QueryId;
use moka::future::Cache;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempts to find an id that is not currently cached before giving up
const MAX_ID_ATTEMPTS: usize = 64;

/// Cache of report pages per dispatched search
#[derive(Clone)]
pub struct ReportCache {
    /// Moka cache storing query id -> pages with TTL and size bound
    cache: Cache<QueryId, Arc<Vec<ReportPage>>>,
    /// Next id candidate; mapped into the eight-digit range on use
    next_id: Arc<AtomicU32>,
}

impl ReportCache {
    /// Creates a new `ReportCache`
    ///
    /// # Arguments
    ///
    /// * `ttl` - How long a report stays navigable after it was stored
    /// * `max_capacity` - Maximum number of reports kept at once
    ///
    /// # Examples
    ///
    /// ```
    /// use osint_lookup_bot::report::ReportCache;
    /// use std::time::Duration;
    ///
    /// let cache = ReportCache::new(Duration::from_secs(3600), 10_000);
    /// assert_eq!(cache.entry_count(), 0);
    /// ```
    #[must_use]
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        // Clock seed: ids from a previous run must not resolve to fresh reports
        let seed = chrono::Utc::now()
            .timestamp_millis()
            .rem_euclid(i64::from(u32::MAX));
        let seed = u32::try_from(seed).unwrap_or_default();

        Self {
            cache,
            next_id: Arc::new(AtomicU32::new(seed)),
        }
    }

    /// Hands out the next query id that is not present in the cache.
    #[must_use]
    pub fn allocate_id(&self) -> QueryId {
        let mut id = QueryId::from_counter(self.next_id.fetch_add(1, Ordering::Relaxed));
        for _ in 1..MAX_ID_ATTEMPTS {
            if !self.cache.contains_key(&id) {
                return id;
            }
            debug!(%id, "Query id still cached, skipping");
            id = QueryId::from_counter(self.next_id.fetch_add(1, Ordering::Relaxed));
        }
        warn!(%id, "No free query id found, reusing a cached one");
        id
    }

    /// Stores the pages of a report, replacing any previous entry for `id`.
    pub async fn insert(&self, id: QueryId, pages: Vec<ReportPage>) -> Arc<Vec<ReportPage>> {
        let pages = Arc::new(pages);
        self.cache.insert(id, Arc::clone(&pages)).await;
        pages
    }

    /// Returns the pages stored for `id`, if they have not expired.
    pub async fn get(&self, id: QueryId) -> Option<Arc<Vec<ReportPage>>> {
        self.cache.get(&id).await
    }

    /// Returns the current number of cached reports
    ///
    /// The count is approximate until pending maintenance has run.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Applies pending evictions and refreshes `entry_count`.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> ReportPage {
        let mut page = ReportPage::new();
        page.plain(text);
        page
    }

    fn cache() -> ReportCache {
        ReportCache::new(Duration::from_secs(60), 100)
    }

    #[tokio::test]
    async fn test_insert_then_get_round_trip() {
        let cache = cache();
        let id = cache.allocate_id();
        let pages = vec![page("one"), page("two")];

        cache.insert(id, pages.clone()).await;

        let stored = cache.get(id).await.expect("report should be cached");
        assert_eq!(*stored, pages);
    }

    #[tokio::test]
    async fn test_second_insert_replaces_first() {
        let cache = cache();
        let id = QueryId::new(12_345_678);

        cache.insert(id, vec![page("a"), page("b"), page("c")]).await;
        cache.insert(id, vec![page("z")]).await;

        let stored = cache.get(id).await.expect("report should be cached");
        assert_eq!(*stored, vec![page("z")]);
    }

    #[tokio::test]
    async fn test_unknown_id_is_none() {
        let cache = cache();
        assert!(cache.get(QueryId::new(11_111_111)).await.is_none());
    }

    #[tokio::test]
    async fn test_allocated_ids_are_distinct_and_in_range() {
        let cache = cache();
        let first = cache.allocate_id();
        let second = cache.allocate_id();
        assert_ne!(first, second);
        for id in [first, second] {
            assert!((QueryId::MIN..=QueryId::MAX).contains(&id.get()));
        }
    }

    #[tokio::test]
    async fn test_allocation_skips_cached_ids() {
        let cache = cache();
        let taken = cache.allocate_id();
        cache.insert(taken, vec![page("x")]).await;

        // Rewind the counter so the next candidate collides with `taken`
        let raw = taken.get() - QueryId::MIN;
        cache.next_id.store(raw, Ordering::Relaxed);

        let next = cache.allocate_id();
        assert_ne!(next, taken);
    }

    #[tokio::test]
    async fn test_entry_count() {
        let cache = cache();
        cache.insert(QueryId::new(10_000_001), vec![page("a")]).await;
        cache.insert(QueryId::new(10_000_002), vec![page("b")]).await;

        cache.run_pending_tasks().await;

        assert_eq!(cache.entry_count(), 2);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = ReportCache::new(Duration::from_millis(50), 100);
        let id = QueryId::new(10_000_003);
        cache.insert(id, vec![page("a")]).await;

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(cache.get(id).await.is_none());
    }
}
