//! Page-level controllers: what each screen loads and how it reacts to
//! user actions. Rendering is left to the front end.

pub mod community;
pub mod discover;
pub mod posts_feed;
pub mod profile;

pub use community::{CommunityFeed, FeedError, FeedTab, PendingBookmark, PendingReaction};
pub use discover::{load_discover, DiscoverPage, MatchCard};
pub use posts_feed::PostsFeed;
pub use profile::ProfileEditor;

use crate::api::{ApiError, ApiResult, ErrorCategory};

/// Full-page load status
#[derive(Debug, Clone, PartialEq)]
pub enum PageState<T> {
    Loading,
    Ready(T),
    /// No usable session; send the user to sign in
    AuthRequired,
    /// Load failed; holds the message for the error page
    Failed(String),
}

impl<T> PageState<T> {
    pub fn from_result(result: ApiResult<T>) -> Self {
        match result {
            Ok(value) => PageState::Ready(value),
            Err(e) => Self::from_error(&e),
        }
    }

    pub fn from_error(error: &ApiError) -> Self {
        if error.category() == ErrorCategory::AuthMissing {
            PageState::AuthRequired
        } else {
            log::error!("Page load failed: {}", error);
            PageState::Failed(error.user_message())
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            PageState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PageState::Failed(_))
    }
}
