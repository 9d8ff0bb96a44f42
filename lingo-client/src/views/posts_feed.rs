use std::sync::Arc;

use lingo_types::{Post, PostCategory, PostQuery};

use crate::api::Backend;
use crate::log_windowing;
use crate::logging::LogConfig;
use crate::notifications::Notifier;
use crate::reply_tree::{build_tree, ReplyNode};
use crate::windowing::{CursorWindow, WindowView};

/// Server-paged post feed
pub struct PostsFeed {
    backend: Arc<dyn Backend>,
    category: Option<PostCategory>,
    page_size: u32,
    window: CursorWindow<Post>,
    notifier: Notifier,
    log_config: LogConfig,
}

impl PostsFeed {
    pub fn new(backend: Arc<dyn Backend>, page_size: usize, notifier: Notifier) -> Self {
        Self {
            backend,
            category: None,
            page_size: page_size.max(1) as u32,
            window: CursorWindow::new(),
            notifier,
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn category(&self) -> Option<PostCategory> {
        self.category
    }

    pub fn posts(&self) -> &[Post] {
        self.window.items()
    }

    pub fn view(&self) -> WindowView<'_, Post> {
        self.window.view()
    }

    pub fn has_loaded(&self) -> bool {
        self.window.has_loaded()
    }

    pub fn is_loading_more(&self) -> bool {
        self.window.is_loading_more()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Changes the category filter and starts over from the first page
    pub fn set_category(&mut self, category: Option<PostCategory>) {
        if category == self.category {
            return;
        }
        log_windowing!(self.log_config, "posts feed category -> {:?}", category);
        self.category = category;
        self.window.reset();
    }

    /// Fetches the next page. Returns `false` when nothing was appended:
    /// a fetch already running, no more pages, a failure, or a reset
    /// while the request was in flight.
    pub async fn load_next(&mut self) -> bool {
        let Some(ticket) = self.window.begin_fetch() else {
            return false;
        };
        let query = PostQuery {
            category: self.category,
            cursor: ticket.cursor.clone(),
            limit: Some(self.page_size),
        };

        match self.backend.posts(&query).await {
            Ok(page) => self.window.finish_fetch(ticket, page.posts, page.next_cursor),
            Err(e) => {
                log::warn!("Failed to load posts: {}", e);
                self.notifier.error(&e);
                self.window.fail_fetch(ticket);
                false
            }
        }
    }

    /// Reply thread of a loaded post
    pub fn thread(&self, post_id: &str) -> Option<Vec<ReplyNode>> {
        self.posts()
            .iter()
            .find(|p| p.id == post_id)
            .map(|p| build_tree(&p.replies))
    }
}
