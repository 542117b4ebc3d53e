//! Errors that can occur while serving a search query.
//!
//! Every variant is recovered at the dispatcher boundary and turned into a
//! single user-visible notice; none of them is fatal to the process.

use crate::report::QueryId;
use thiserror::Error;

/// Notice for users outside the allow-list
pub const UNAUTHORIZED_NOTICE: &str = "❌ You are not authorized to use this bot.";
/// Notice for every other failed search (HTML)
pub const SEARCH_FAILED_NOTICE: &str = "❌ <b>Search failed</b>\n\nThe API may be unavailable or there was an error processing your request.";

/// Errors that end a search request in the failed state
#[derive(Debug, Error)]
pub enum QueryError {
    /// The requesting user is not on the configured allow-list
    #[error("user {0} is not authorized")]
    Unauthorized(i64),
    /// Connection failure, timeout or a non-success HTTP status
    #[error("Transport error: {0}")]
    Transport(String),
    /// The response body could not be parsed
    #[error("Decode error: {0}")]
    Decode(String),
    /// Well-formed body that signals a remote failure
    #[error("API error: {0}")]
    Api(String),
    /// Well-formed success body without any usable section
    #[error("Response contained no usable sections")]
    EmptyResult,
}

impl QueryError {
    /// Short machine-friendly name of the failure class, used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::Api(_) => "api",
            Self::EmptyResult => "empty_result",
        }
    }

    /// Notice shown to the user when the request fails.
    ///
    /// Every failure other than an authorization rejection shares one
    /// generic notice; the detail only goes to the logs.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => UNAUTHORIZED_NOTICE,
            _ => SEARCH_FAILED_NOTICE,
        }
    }

    /// Whether the request was rejected before any network call.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Errors raised when navigating an already dispatched search
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    /// The query id is unknown or its pages were evicted
    #[error("report {0} has expired")]
    Expired(QueryId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(QueryError::Unauthorized(1).kind(), "unauthorized");
        assert_eq!(QueryError::Transport("x".into()).kind(), "transport");
        assert_eq!(QueryError::Decode("x".into()).kind(), "decode");
        assert_eq!(QueryError::Api("x".into()).kind(), "api");
        assert_eq!(QueryError::EmptyResult.kind(), "empty_result");
    }

    #[test]
    fn test_display_includes_detail() {
        let err = QueryError::Api("502 Bad Gateway".to_string());
        assert_eq!(err.to_string(), "API error: 502 Bad Gateway");
        assert!(!err.is_unauthorized());
        assert!(QueryError::Unauthorized(7).is_unauthorized());
    }

    #[test]
    fn test_user_message() {
        assert_eq!(
            QueryError::Unauthorized(7).user_message(),
            UNAUTHORIZED_NOTICE
        );
        for err in [
            QueryError::Transport("timeout".into()),
            QueryError::Decode("eof".into()),
            QueryError::Api("bad token".into()),
            QueryError::EmptyResult,
        ] {
            assert_eq!(err.user_message(), SEARCH_FAILED_NOTICE);
        }
    }
}
