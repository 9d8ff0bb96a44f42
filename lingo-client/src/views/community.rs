use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use lingo_types::{Post, PostCategory, PostQuery, Reaction};
use thiserror::Error;

use super::PageState;
use crate::api::{ApiResult, Backend};
use crate::config::ClientConfig;
use crate::logging::LogConfig;
use crate::notifications::Notifier;
use crate::optimistic::{MutationTicket, OptimisticMap, Reconciled};
use crate::reactions::{resolve_emoji, toggled};
use crate::windowing::{WindowView, WindowedList};
use crate::{log_mutation, log_windowing};

/// Posts fetched up front for client-side windowing
const COMMUNITY_FETCH_LIMIT: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedTab {
    All,
    Category(PostCategory),
    Bookmarks,
    Following,
}

impl FeedTab {
    /// Key stored in the feed preferences
    pub fn key(&self) -> &'static str {
        match self {
            FeedTab::All => "all",
            FeedTab::Category(category) => category.as_str(),
            FeedTab::Bookmarks => "bookmarks",
            FeedTab::Following => "following",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "all" | "" => Some(FeedTab::All),
            "bookmarks" | "saved" => Some(FeedTab::Bookmarks),
            "following" => Some(FeedTab::Following),
            other => PostCategory::parse(other).map(FeedTab::Category),
        }
    }

    fn includes(&self, post: &Post, following: &HashSet<String>) -> bool {
        match self {
            FeedTab::All => true,
            FeedTab::Category(category) => post.category == *category,
            FeedTab::Bookmarks => post.is_bookmarked,
            FeedTab::Following => following.contains(&post.author.id),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Post {0} is not in this feed")]
    UnknownPost(String),
    #[error("{0:?} is not an emoji")]
    InvalidEmoji(String),
    #[error("Sign in to react or save posts")]
    SignedOut,
}

/// A reaction toggle applied locally and waiting for the server
#[derive(Debug)]
#[must_use = "pass to CommunityFeed::finish_reaction"]
pub struct PendingReaction {
    pub post_id: String,
    pub emoji: String,
    ticket: MutationTicket,
}

#[derive(Debug)]
#[must_use = "pass to CommunityFeed::finish_bookmark"]
pub struct PendingBookmark {
    pub post_id: String,
    pub bookmarked: bool,
    ticket: MutationTicket,
}

/// Community page: tabbed, client-windowed post list with optimistic
/// reactions and bookmarks.
pub struct CommunityFeed {
    backend: Arc<dyn Backend>,
    viewer_id: Option<String>,
    tab: FeedTab,
    posts: Vec<Post>,
    following: HashSet<String>,
    list: WindowedList<Post>,
    reactions: OptimisticMap<String, Vec<Reaction>>,
    bookmarks: OptimisticMap<String, bool>,
    notifier: Notifier,
    debounce: Duration,
    state: PageState<()>,
    log_config: LogConfig,
}

impl CommunityFeed {
    pub fn new(backend: Arc<dyn Backend>, viewer_id: Option<String>, config: &ClientConfig) -> Self {
        Self {
            backend,
            viewer_id,
            tab: FeedTab::All,
            posts: Vec::new(),
            following: HashSet::new(),
            list: WindowedList::new(config.page_size),
            reactions: OptimisticMap::new(),
            bookmarks: OptimisticMap::new(),
            notifier: Notifier::new(config.notification_ttl),
            debounce: config.load_more_debounce,
            state: PageState::Loading,
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn tab(&self) -> FeedTab {
        self.tab
    }

    pub fn state(&self) -> &PageState<()> {
        &self.state
    }

    pub fn view(&self) -> WindowView<'_, Post> {
        self.list.view()
    }

    pub fn list(&self) -> &WindowedList<Post> {
        &self.list
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    pub fn post(&self, post_id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    /// Fetches posts, bookmarks and follows in parallel
    pub async fn load(&mut self) -> &PageState<()> {
        self.state = PageState::Loading;
        let query = PostQuery {
            limit: Some(COMMUNITY_FETCH_LIMIT),
            ..Default::default()
        };
        let loaded = tokio::try_join!(
            self.backend.posts(&query),
            self.backend.bookmarks(),
            self.backend.following(),
        );

        match loaded {
            Ok((page, saved, following)) => {
                let saved: HashSet<String> = saved.into_iter().map(|p| p.id).collect();
                self.posts = page
                    .posts
                    .into_iter()
                    .map(|mut post| {
                        post.is_bookmarked = post.is_bookmarked || saved.contains(&post.id);
                        post
                    })
                    .collect();
                self.following = following.into_iter().map(|u| u.id).collect();
                self.reactions.clear();
                self.bookmarks.clear();
                self.refilter();
                self.state = PageState::Ready(());
            }
            Err(e) => self.state = PageState::from_error(&e),
        }
        &self.state
    }

    /// Switches tab; the window shrinks back to one page
    pub fn set_tab(&mut self, tab: FeedTab) {
        if tab == self.tab {
            return;
        }
        log_windowing!(self.log_config, "tab {} -> {}", self.tab.key(), tab.key());
        self.tab = tab;
        self.refilter();
    }

    fn refilter(&mut self) {
        let tab = self.tab;
        let items = self
            .posts
            .iter()
            .filter(|p| tab.includes(p, &self.following))
            .cloned()
            .collect();
        self.list.set_items(items);
    }

    /// Grows the window by one page after the debounce delay
    pub async fn load_more(&mut self) -> bool {
        self.list.load_more(self.debounce).await
    }

    fn update_post(&mut self, post_id: &str, mut edit: impl FnMut(&mut Post)) {
        if let Some(post) = self.posts.iter_mut().find(|p| p.id == post_id) {
            edit(post);
        }
        if let Some(post) = self.list.find_mut(|p| p.id == post_id) {
            edit(post);
        }
    }

    /// Applies a reaction toggle locally. The whole reaction list for the
    /// post is swapped at once.
    pub fn begin_reaction(&mut self, post_id: &str, emoji: &str) -> Result<PendingReaction, FeedError> {
        let viewer = self.viewer_id.clone().ok_or(FeedError::SignedOut)?;
        let emoji = resolve_emoji(emoji).ok_or_else(|| FeedError::InvalidEmoji(emoji.to_string()))?;
        let current = self
            .post(post_id)
            .map(|p| p.reactions.clone())
            .ok_or_else(|| FeedError::UnknownPost(post_id.to_string()))?;

        let optimistic = toggled(&current, &emoji, &viewer);
        let ticket = self
            .reactions
            .apply(post_id.to_string(), current, optimistic.clone());
        log_mutation!(self.log_config, "reaction {} on {} pending", emoji, post_id);
        self.update_post(post_id, |p| p.reactions = optimistic.clone());

        Ok(PendingReaction {
            post_id: post_id.to_string(),
            emoji,
            ticket,
        })
    }

    pub fn finish_reaction(
        &mut self,
        pending: PendingReaction,
        result: ApiResult<Vec<Reaction>>,
    ) -> Reconciled<Vec<Reaction>> {
        let outcome = self
            .reactions
            .settle(&pending.post_id, pending.ticket, result.map(Some));
        match &outcome {
            Reconciled::Committed(reactions) => {
                log_mutation!(self.log_config, "reaction on {} committed", pending.post_id);
                self.update_post(&pending.post_id, |p| p.reactions = reactions.clone());
            }
            Reconciled::RolledBack { restored, error } => {
                self.notifier.error(error);
                self.update_post(&pending.post_id, |p| p.reactions = restored.clone());
            }
            Reconciled::Superseded => {}
        }
        outcome
    }

    /// Toggles `emoji` on a post: local update first, then the API call
    pub async fn toggle_reaction(
        &mut self,
        post_id: &str,
        emoji: &str,
    ) -> Result<Reconciled<Vec<Reaction>>, FeedError> {
        let pending = self.begin_reaction(post_id, emoji)?;
        let result = self
            .backend
            .toggle_reaction(&pending.post_id, &pending.emoji)
            .await;
        Ok(self.finish_reaction(pending, result))
    }

    pub fn begin_bookmark(&mut self, post_id: &str) -> Result<PendingBookmark, FeedError> {
        if self.viewer_id.is_none() {
            return Err(FeedError::SignedOut);
        }
        let current = self
            .post(post_id)
            .map(|p| p.is_bookmarked)
            .ok_or_else(|| FeedError::UnknownPost(post_id.to_string()))?;
        let bookmarked = !current;
        let ticket = self.bookmarks.apply(post_id.to_string(), current, bookmarked);
        self.update_post(post_id, |p| p.is_bookmarked = bookmarked);

        Ok(PendingBookmark {
            post_id: post_id.to_string(),
            bookmarked,
            ticket,
        })
    }

    pub fn finish_bookmark(&mut self, pending: PendingBookmark, result: ApiResult<bool>) -> Reconciled<bool> {
        let outcome = self
            .bookmarks
            .settle(&pending.post_id, pending.ticket, result.map(Some));
        match &outcome {
            Reconciled::Committed(bookmarked) | Reconciled::RolledBack { restored: bookmarked, .. } => {
                let bookmarked = *bookmarked;
                self.update_post(&pending.post_id, |p| p.is_bookmarked = bookmarked);
            }
            Reconciled::Superseded => {}
        }
        if outcome.is_committed() && self.tab == FeedTab::Bookmarks {
            // Unsaved posts leave the tab; the window keeps its size
            self.list.retain(|p| p.is_bookmarked);
        }
        if let Some(error) = outcome.error() {
            self.notifier.error(error);
        }
        outcome
    }

    pub async fn toggle_bookmark(&mut self, post_id: &str) -> Result<Reconciled<bool>, FeedError> {
        let pending = self.begin_bookmark(post_id)?;
        let result = self
            .backend
            .set_bookmark(&pending.post_id, pending.bookmarked)
            .await;
        Ok(self.finish_bookmark(pending, result))
    }
}
