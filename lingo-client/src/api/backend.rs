use async_trait::async_trait;
use lingo_types::{
    LanguagesUpdate, MatchRequest, Page, Post, PostPage, PostQuery, PreferencesUpdate,
    ProfileUpdate, Reaction, UploadedImage, User, UserPatch, UserQuery,
};

use super::ApiResult;

/// Image bytes picked by the user, ready for `POST /upload/image`
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = content_type_for(&filename).to_string();
        Self {
            filename,
            content_type,
            bytes,
        }
    }
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
}

/// Everything the stateful components need from the API.
///
/// [`super::ApiClient`] is the HTTP implementation; tests swap in
/// in-memory fakes.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn current_user(&self) -> ApiResult<User>;

    async fn user(&self, id: &str) -> ApiResult<User>;

    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<UserPatch>;

    async fn update_languages(&self, update: &LanguagesUpdate) -> ApiResult<UserPatch>;

    async fn update_preferences(&self, update: &PreferencesUpdate) -> ApiResult<UserPatch>;

    /// Records the onboarding checkpoint (number of completed steps)
    async fn set_onboarding_step(&self, step: u8) -> ApiResult<()>;

    async fn search_users(&self, query: &UserQuery) -> ApiResult<Page<User>>;

    async fn outgoing_requests(&self) -> ApiResult<Vec<MatchRequest>>;

    async fn upload_image(&self, image: ImageUpload) -> ApiResult<UploadedImage>;

    async fn posts(&self, query: &PostQuery) -> ApiResult<PostPage>;

    /// Toggles the viewer's `emoji` on a post and returns the canonical
    /// reaction list for that post
    async fn toggle_reaction(&self, post_id: &str, emoji: &str) -> ApiResult<Vec<Reaction>>;

    async fn bookmarks(&self) -> ApiResult<Vec<Post>>;

    async fn set_bookmark(&self, post_id: &str, bookmarked: bool) -> ApiResult<bool>;

    async fn following(&self) -> ApiResult<Vec<User>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(ImageUpload::new("me.PNG", vec![]).content_type, "image/png");
        assert_eq!(ImageUpload::new("me.webp", vec![]).content_type, "image/webp");
        assert_eq!(ImageUpload::new("photo", vec![]).content_type, "image/jpeg");
    }
}
