//! Page wrapping and the previous/indicator/next navigation control.
//!
//! Directional actions carry the neighbouring index *unwrapped*; wrapping is
//! applied only when an action is actually invoked.

use super::QueryId;
use std::fmt;

/// Prefix of a page navigation callback: `/page <id> <index>`
pub const PAGE_CALLBACK_PREFIX: &str = "/page";
/// Callback of the non-actionable page indicator
pub const PAGE_INFO_CALLBACK: &str = "page_info";

/// Maps a requested page index into `[0, total)`.
///
/// Any negative index selects the last page; indices past the end wrap
/// modulo `total`. Returns 0 when there are no pages.
///
/// # Examples
///
/// ```
/// use osint_lookup_bot::report::wrap_index;
///
/// assert_eq!(wrap_index(-1, 3), 2);
/// assert_eq!(wrap_index(3, 3), 0);
/// assert_eq!(wrap_index(1, 3), 1);
/// ```
#[must_use]
pub fn wrap_index(requested: i64, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    if requested < 0 {
        return total - 1;
    }
    let wrapped = requested.unsigned_abs() % total as u64;
    usize::try_from(wrapped).unwrap_or_default()
}

/// A request to show page `index` of report `id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageAction {
    /// Report to navigate
    pub id: QueryId,
    /// Requested page, possibly out of range
    pub index: i64,
}

impl PageAction {
    /// Wire encoding used as inline button callback data
    #[must_use]
    pub fn callback_data(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PAGE_CALLBACK_PREFIX} {} {}", self.id, self.index)
    }
}

/// Decoded inline button callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Show another page of a report
    Page(PageAction),
    /// The page indicator was pressed
    PageInfo,
}

impl CallbackAction {
    /// Parses callback data; returns `None` for anything that is not ours.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        if data == PAGE_INFO_CALLBACK {
            return Some(Self::PageInfo);
        }

        let mut parts = data.split(' ');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(PAGE_CALLBACK_PREFIX), Some(id), Some(index), None) => {
                Some(Self::Page(PageAction {
                    id: id.parse().ok()?,
                    index: index.parse().ok()?,
                }))
            }
            _ => None,
        }
    }
}

/// Previous / indicator / next control for one displayed page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationControl {
    /// Wrapped index of the displayed page
    pub current: usize,
    /// Number of pages in the report
    pub total: usize,
    /// Action of the "previous" button
    pub previous: PageAction,
    /// Action of the "next" button
    pub next: PageAction,
}

impl NavigationControl {
    /// Builds the control for `requested` page of a report with `total` pages.
    ///
    /// Single-page reports have no control.
    #[must_use]
    pub fn build(id: QueryId, requested: i64, total: usize) -> Option<Self> {
        if total <= 1 {
            return None;
        }
        let current = wrap_index(requested, total);
        let current_signed = i64::try_from(current).unwrap_or(i64::MAX);
        Some(Self {
            current,
            total,
            previous: PageAction {
                id,
                index: current_signed - 1,
            },
            next: PageAction {
                id,
                index: current_signed.saturating_add(1),
            },
        })
    }

    /// Label of the non-actionable indicator, e.g. `2/5`
    #[must_use]
    pub fn indicator(&self) -> String {
        format!("{}/{}", self.current + 1, self.total)
    }
}
