//! Report pages, their cache and page navigation.
//!
//! A search produces one [`ReportPage`] per database section. Pages are kept
//! in the [`ReportCache`] under a [`QueryId`] so that later navigation
//! actions can be served without repeating the remote call.

mod cache;
mod formatter;
mod navigation;
mod page;

pub use cache::ReportCache;
pub use formatter::{format_section, format_sections, TRUNCATION_NOTICE};
pub use navigation::{
    wrap_index, CallbackAction, NavigationControl, PageAction, PAGE_CALLBACK_PREFIX,
    PAGE_INFO_CALLBACK,
};
pub use page::{RenderMode, ReportPage};

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier correlating a dispatched search with its cached pages.
///
/// Allocated ids are always eight decimal digits; parsing accepts any
/// `u32` so that stale or foreign ids simply miss the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(u32);

impl QueryId {
    /// Smallest allocated id.
    pub const MIN: u32 = 10_000_000;
    /// Largest allocated id.
    pub const MAX: u32 = 99_999_999;
    const SPAN: u32 = Self::MAX - Self::MIN + 1;

    /// Wraps a raw value, no range check.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Maps an arbitrary counter value into the eight-digit range.
    #[must_use]
    pub const fn from_counter(counter: u32) -> Self {
        Self(Self::MIN + counter % Self::SPAN)
    }

    /// Raw numeric value
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueryId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_stays_in_range() {
        for counter in [0, 1, 89_999_999, 90_000_000, u32::MAX] {
            let id = QueryId::from_counter(counter);
            assert!((QueryId::MIN..=QueryId::MAX).contains(&id.get()));
        }
        assert_eq!(QueryId::from_counter(0).get(), QueryId::MIN);
        assert_eq!(QueryId::from_counter(90_000_000).get(), QueryId::MIN);
    }

    #[test]
    fn test_parse_and_display() {
        let id: QueryId = "12345678".parse().expect("valid id");
        assert_eq!(id.get(), 12_345_678);
        assert_eq!(id.to_string(), "12345678");
        assert!("abc".parse::<QueryId>().is_err());
        assert!("-1".parse::<QueryId>().is_err());
    }
}
