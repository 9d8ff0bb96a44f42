//! In-memory [`Backend`] for controller tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use lingo_types::{
    Author, LanguagesUpdate, MatchRequest, MatchStatus, Page, Pagination, Post, PostCategory,
    PostPage, PostQuery, PreferencesUpdate, ProfileUpdate, Reaction, UploadedImage, User,
    UserPatch, UserQuery,
};

use crate::api::{ApiError, ApiResult, Backend, ImageUpload};
use crate::reactions;

pub(crate) fn server_error() -> ApiError {
    ApiError::Api {
        status: 500,
        message: "Internal Server Error".to_string(),
    }
}

pub(crate) fn user(id: &str, name: &str) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

pub(crate) fn post(id: &str, category: PostCategory) -> Post {
    Post {
        id: id.to_string(),
        author: Author {
            id: "author".to_string(),
            name: "Author".to_string(),
            profile_image: None,
        },
        content: format!("post {}", id),
        category,
        created_at: None,
        reactions: Vec::new(),
        replies: Vec::new(),
        is_bookmarked: false,
    }
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub me: User,
    pub users: Vec<User>,
    pub requests: Vec<MatchRequest>,
    pub posts: Vec<Post>,
    pub bookmarks: Vec<String>,
    pub following: Vec<User>,
    pub onboarding_step: Option<u8>,
}

/// Backend over in-memory state. Operations named in `failing` return a
/// 500; every call is recorded by name in `calls`.
#[derive(Default)]
pub(crate) struct FakeBackend {
    pub state: Mutex<FakeState>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeBackend {
    pub fn with_me(me: User) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().me = me;
        fake
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    fn enter(&self, op: &'static str) -> ApiResult<()> {
        self.calls.lock().unwrap().push(op);
        if self.failing.lock().unwrap().contains(op) {
            return Err(server_error());
        }
        Ok(())
    }

    fn patch_me(&self, edit: impl FnOnce(&mut User)) -> UserPatch {
        let mut state = self.state.lock().unwrap();
        edit(&mut state.me);
        UserPatch::from_user(&state.me)
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn current_user(&self) -> ApiResult<User> {
        self.enter("current_user")?;
        Ok(self.state.lock().unwrap().me.clone())
    }

    async fn user(&self, id: &str) -> ApiResult<User> {
        self.enter("user")?;
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("user {}", id)))
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<UserPatch> {
        self.enter("update_profile")?;
        let update = update.clone();
        Ok(self.patch_me(|me| {
            if let Some(name) = update.name {
                me.name = name;
            }
            if let Some(bio) = update.bio {
                me.bio = Some(bio);
            }
            if update.city.is_some() {
                me.city = update.city;
            }
            if update.country.is_some() {
                me.country = update.country;
            }
            if let Some(image) = update.profile_image {
                me.profile_image = Some(image);
            }
            if let Some(interests) = update.interests {
                me.interests = interests;
            }
        }))
    }

    async fn update_languages(&self, update: &LanguagesUpdate) -> ApiResult<UserPatch> {
        self.enter("update_languages")?;
        let update = update.clone();
        Ok(self.patch_me(|me| {
            me.native_languages = update.native_languages;
            me.target_languages = update.target_languages;
        }))
    }

    async fn update_preferences(&self, update: &PreferencesUpdate) -> ApiResult<UserPatch> {
        self.enter("update_preferences")?;
        let interests = update.interests.clone();
        Ok(self.patch_me(|me| me.interests = interests))
    }

    async fn set_onboarding_step(&self, step: u8) -> ApiResult<()> {
        self.enter("set_onboarding_step")?;
        let mut state = self.state.lock().unwrap();
        state.onboarding_step = Some(step);
        state.me.onboarding_step = step;
        Ok(())
    }

    async fn search_users(&self, query: &UserQuery) -> ApiResult<Page<User>> {
        self.enter("search_users")?;
        let state = self.state.lock().unwrap();
        let items: Vec<User> = state
            .users
            .iter()
            .filter(|u| match &query.search {
                Some(term) => u.name.to_lowercase().contains(&term.to_lowercase()),
                None => true,
            })
            .cloned()
            .collect();
        let total = items.len() as u32;
        Ok(Page {
            items,
            pagination: Pagination {
                page: 1,
                limit: total,
                total,
                total_pages: 1,
            },
        })
    }

    async fn outgoing_requests(&self) -> ApiResult<Vec<MatchRequest>> {
        self.enter("outgoing_requests")?;
        Ok(self.state.lock().unwrap().requests.clone())
    }

    async fn upload_image(&self, image: ImageUpload) -> ApiResult<UploadedImage> {
        self.enter("upload_image")?;
        Ok(UploadedImage {
            url: format!("http://cdn.test/uploads/{}", image.filename),
            filename: image.filename,
        })
    }

    async fn posts(&self, query: &PostQuery) -> ApiResult<PostPage> {
        self.enter("posts")?;
        let state = self.state.lock().unwrap();
        let matching: Vec<&Post> = state
            .posts
            .iter()
            .filter(|p| query.category.map_or(true, |c| p.category == c))
            .collect();
        let start = match &query.cursor {
            Some(cursor) => matching
                .iter()
                .position(|p| &p.id == cursor)
                .unwrap_or(matching.len()),
            None => 0,
        };
        let limit = query.limit.unwrap_or(10) as usize;
        let end = (start + limit).min(matching.len());
        let posts: Vec<Post> = matching[start..end].iter().map(|p| (*p).clone()).collect();
        let next_cursor = matching.get(end).map(|p| p.id.clone());
        Ok(PostPage { posts, next_cursor })
    }

    async fn toggle_reaction(&self, post_id: &str, emoji: &str) -> ApiResult<Vec<Reaction>> {
        self.enter("toggle_reaction")?;
        let mut state = self.state.lock().unwrap();
        let me = state.me.id.clone();
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| ApiError::NotFound(format!("post {}", post_id)))?;
        post.reactions = reactions::toggled(&post.reactions, emoji, &me);
        Ok(post.reactions.clone())
    }

    async fn bookmarks(&self) -> ApiResult<Vec<Post>> {
        self.enter("bookmarks")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .posts
            .iter()
            .filter(|p| state.bookmarks.contains(&p.id))
            .cloned()
            .map(|mut p| {
                p.is_bookmarked = true;
                p
            })
            .collect())
    }

    async fn set_bookmark(&self, post_id: &str, bookmarked: bool) -> ApiResult<bool> {
        self.enter("set_bookmark")?;
        let mut state = self.state.lock().unwrap();
        state.bookmarks.retain(|id| id != post_id);
        if bookmarked {
            state.bookmarks.push(post_id.to_string());
        }
        Ok(bookmarked)
    }

    async fn following(&self) -> ApiResult<Vec<User>> {
        self.enter("following")?;
        Ok(self.state.lock().unwrap().following.clone())
    }
}

pub(crate) fn pending_request(id: &str, sender: &str, receiver: &str) -> MatchRequest {
    MatchRequest {
        id: id.to_string(),
        sender_id: sender.to_string(),
        receiver_id: receiver.to_string(),
        status: MatchStatus::Pending,
        created_at: None,
    }
}
