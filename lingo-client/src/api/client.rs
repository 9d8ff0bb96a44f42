use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use lingo_types::normalize::{
    normalize_match_request, normalize_post, normalize_reaction, normalize_user, RawMatchRequest,
    RawPost, RawReaction, RawUser,
};
use lingo_types::*;

use super::{ApiError, ApiResult, Backend, ImageUpload};

/// Name of the cookie (and local credential) carrying the bearer token
pub const AUTH_TOKEN_NAME: &str = "token";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct RawUserPage {
    #[serde(default)]
    data: Vec<RawUser>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Deserialize)]
struct RawPostPage {
    #[serde(default)]
    data: Vec<RawPost>,
    #[serde(default, rename = "nextCursor", alias = "next_cursor")]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawReactionPayload {
    List(Vec<RawReaction>),
    Post { reactions: Vec<RawReaction> },
}

/// API client for the language-exchange backend
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    viewer_id: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            viewer_id: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Id of the signed-in user, used to derive `has_reacted`
    pub fn set_viewer_id(&mut self, viewer_id: Option<String>) {
        self.viewer_id = viewer_id;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn add_auth_header(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            req.bearer_auth(token)
        } else {
            req
        }
    }

    /// Like [`Self::add_auth_header`] but refuses to send without a token
    fn authed(&self, req: reqwest::RequestBuilder) -> ApiResult<reqwest::RequestBuilder> {
        match &self.token {
            Some(token) => Ok(req.bearer_auth(token)),
            None => Err(ApiError::AuthMissing),
        }
    }

    async fn error_from(&self, response: reqwest::Response) -> ApiError {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        // Proxies answer with HTML error pages
        let clean_error = if error_text.contains("<html") || error_text.contains("<!DOCTYPE") {
            format!(
                "Server returned {} error. Please check the API URL.",
                status.as_u16()
            )
        } else if let Ok(body) = serde_json::from_str::<ErrorResponse>(&error_text) {
            body.message
        } else {
            error_text
        };

        log::warn!(target: "api_calls", "request failed: {} {}", status, clean_error);

        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(clean_error),
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(clean_error),
            StatusCode::FORBIDDEN => ApiError::Forbidden(clean_error),
            StatusCode::BAD_REQUEST => ApiError::BadRequest(clean_error),
            other => ApiError::Api {
                status: other.as_u16(),
                message: clean_error,
            },
        }
    }

    /// Helper to handle API responses, unwrapping the `data` envelope
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ApiResult<T> {
        if response.status().is_success() {
            let body = response.text().await?;
            let envelope: Envelope<T> = serde_json::from_str(&body)?;
            Ok(envelope.into_inner())
        } else {
            Err(self.error_from(response).await)
        }
    }

    async fn expect_success(&self, response: reqwest::Response) -> ApiResult<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.error_from(response).await)
        }
    }

    fn user_from(&self, raw: RawUser) -> User {
        normalize_user(raw, &self.base_url)
    }

    fn post_from(&self, raw: RawPost) -> Post {
        normalize_post(raw, &self.base_url, self.viewer_id.as_deref())
    }

    // Users

    pub async fn get_me(&self) -> ApiResult<User> {
        let url = self.url("/users/me");
        log::debug!(target: "api_calls", "GET {}", url);
        let response = self.authed(self.client.get(&url))?.send().await?;
        let raw: RawUser = self.handle_response(response).await?;
        Ok(self.user_from(raw))
    }

    pub async fn get_user(&self, id: &str) -> ApiResult<User> {
        let url = self.url(&format!("/users/{}", urlencoding::encode(id)));
        log::debug!(target: "api_calls", "GET {}", url);
        let response = self.add_auth_header(self.client.get(&url)).send().await?;
        let raw: RawUser = self.handle_response(response).await?;
        Ok(self.user_from(raw))
    }

    async fn put_me<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<UserPatch> {
        let url = self.url(path);
        log::debug!(target: "api_calls", "PUT {}", url);
        let response = self.authed(self.client.put(&url).json(body))?.send().await?;
        let raw: RawUser = self.handle_response(response).await?;
        Ok(UserPatch::new(raw, self.base_url.clone()))
    }

    /// Get users matching the query, one page at a time
    pub async fn get_users(&self, query: &UserQuery) -> ApiResult<Page<User>> {
        let mut url = self.url("/users");
        let mut params = vec![];

        if let Some(s) = &query.search {
            params.push(format!("search={}", urlencoding::encode(s)));
        }
        if let Some(l) = &query.native_language {
            params.push(format!("nativeLanguage={}", urlencoding::encode(l)));
        }
        if let Some(l) = &query.target_language {
            params.push(format!("targetLanguage={}", urlencoding::encode(l)));
        }
        if let Some(c) = &query.city {
            params.push(format!("city={}", urlencoding::encode(c)));
        }
        if let Some(c) = &query.country {
            params.push(format!("country={}", urlencoding::encode(c)));
        }
        if let Some(p) = query.page {
            params.push(format!("page={}", p));
        }
        if let Some(l) = query.limit {
            params.push(format!("limit={}", l));
        }

        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        log::debug!(target: "api_calls", "GET {}", url);
        let response = self.add_auth_header(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(self.error_from(response).await);
        }
        let body = response.text().await?;
        let page: RawUserPage = serde_json::from_str(&body)?;
        Ok(Page {
            items: page.data.into_iter().map(|u| self.user_from(u)).collect(),
            pagination: page.pagination,
        })
    }

    pub async fn get_outgoing_requests(&self) -> ApiResult<Vec<MatchRequest>> {
        let url = self.url("/matches/requests/outgoing");
        log::debug!(target: "api_calls", "GET {}", url);
        let response = self.authed(self.client.get(&url))?.send().await?;
        let raw: Vec<RawMatchRequest> = self.handle_response(response).await?;
        Ok(raw.into_iter().map(normalize_match_request).collect())
    }

    pub async fn get_following(&self) -> ApiResult<Vec<User>> {
        let url = self.url("/connections/following");
        log::debug!(target: "api_calls", "GET {}", url);
        let response = self.authed(self.client.get(&url))?.send().await?;
        let raw: Vec<RawUser> = self.handle_response(response).await?;
        Ok(raw.into_iter().map(|u| self.user_from(u)).collect())
    }

    // Uploads

    pub async fn post_image(&self, image: ImageUpload) -> ApiResult<UploadedImage> {
        let url = self.url("/upload/image");
        log::debug!(
            target: "api_calls",
            "POST {} ({} bytes, {})",
            url,
            image.bytes.len(),
            image.content_type
        );
        let part = multipart::Part::bytes(image.bytes)
            .file_name(image.filename)
            .mime_str(&image.content_type)?;
        let form = multipart::Form::new().part("image", part);
        let response = self
            .authed(self.client.post(&url).multipart(form))?
            .send()
            .await?;
        let uploaded: UploadedImage = self.handle_response(response).await?;
        Ok(UploadedImage {
            url: absolutize_url(&uploaded.url, &self.base_url),
            filename: uploaded.filename,
        })
    }

    // Posts

    pub async fn get_posts(&self, query: &PostQuery) -> ApiResult<PostPage> {
        let mut url = self.url("/posts");
        let mut params = vec![];

        if let Some(c) = query.category {
            params.push(format!("category={}", c.as_str()));
        }
        if let Some(c) = &query.cursor {
            params.push(format!("cursor={}", urlencoding::encode(c)));
        }
        if let Some(l) = query.limit {
            params.push(format!("limit={}", l));
        }

        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        log::debug!(target: "api_calls", "GET {}", url);
        let response = self.add_auth_header(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(self.error_from(response).await);
        }
        let body = response.text().await?;
        let page: RawPostPage = serde_json::from_str(&body)?;
        Ok(PostPage {
            posts: page.data.into_iter().map(|p| self.post_from(p)).collect(),
            next_cursor: page.next_cursor.filter(|c| !c.is_empty()),
        })
    }

    pub async fn post_reaction(&self, post_id: &str, emoji: &str) -> ApiResult<Vec<Reaction>> {
        let url = self.url(&format!("/posts/{}/reactions", urlencoding::encode(post_id)));
        log::debug!(target: "api_calls", "POST {} {}", url, emoji);
        let request = ReactionRequest {
            emoji: emoji.to_string(),
        };
        let response = self
            .authed(self.client.post(&url).json(&request))?
            .send()
            .await?;
        let payload: RawReactionPayload = self.handle_response(response).await?;
        let raw = match payload {
            RawReactionPayload::List(list) => list,
            RawReactionPayload::Post { reactions } => reactions,
        };
        let viewer = self.viewer_id.as_deref();
        Ok(raw
            .into_iter()
            .map(|r| normalize_reaction(r, viewer))
            .filter(|r| r.count > 0)
            .collect())
    }

    pub async fn get_bookmarks(&self) -> ApiResult<Vec<Post>> {
        let url = self.url("/bookmarks");
        log::debug!(target: "api_calls", "GET {}", url);
        let response = self.authed(self.client.get(&url))?.send().await?;
        let raw: Vec<RawPost> = self.handle_response(response).await?;
        Ok(raw
            .into_iter()
            .map(|p| {
                let mut post = self.post_from(p);
                post.is_bookmarked = true;
                post
            })
            .collect())
    }

    pub async fn put_bookmark(&self, post_id: &str, bookmarked: bool) -> ApiResult<bool> {
        let response = if bookmarked {
            let url = self.url("/bookmarks");
            log::debug!(target: "api_calls", "POST {} {}", url, post_id);
            let request = BookmarkRequest {
                post_id: post_id.to_string(),
            };
            self.authed(self.client.post(&url).json(&request))?
                .send()
                .await?
        } else {
            let url = self.url(&format!("/bookmarks/{}", urlencoding::encode(post_id)));
            log::debug!(target: "api_calls", "DELETE {}", url);
            self.authed(self.client.delete(&url))?.send().await?
        };
        self.expect_success(response).await?;
        Ok(bookmarked)
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn current_user(&self) -> ApiResult<User> {
        self.get_me().await
    }

    async fn user(&self, id: &str) -> ApiResult<User> {
        self.get_user(id).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<UserPatch> {
        self.put_me("/users/me/profile", update).await
    }

    async fn update_languages(&self, update: &LanguagesUpdate) -> ApiResult<UserPatch> {
        self.put_me("/users/me/languages", update).await
    }

    async fn update_preferences(&self, update: &PreferencesUpdate) -> ApiResult<UserPatch> {
        self.put_me("/users/me/preferences", update).await
    }

    async fn set_onboarding_step(&self, step: u8) -> ApiResult<()> {
        let url = self.url("/users/me/onboarding-step");
        log::debug!(target: "api_calls", "PUT {} step={}", url, step);
        let request = OnboardingStepUpdate { step };
        let response = self
            .authed(self.client.put(&url).json(&request))?
            .send()
            .await?;
        self.expect_success(response).await
    }

    async fn search_users(&self, query: &UserQuery) -> ApiResult<Page<User>> {
        self.get_users(query).await
    }

    async fn outgoing_requests(&self) -> ApiResult<Vec<MatchRequest>> {
        self.get_outgoing_requests().await
    }

    async fn upload_image(&self, image: ImageUpload) -> ApiResult<UploadedImage> {
        self.post_image(image).await
    }

    async fn posts(&self, query: &PostQuery) -> ApiResult<PostPage> {
        self.get_posts(query).await
    }

    async fn toggle_reaction(&self, post_id: &str, emoji: &str) -> ApiResult<Vec<Reaction>> {
        self.post_reaction(post_id, emoji).await
    }

    async fn bookmarks(&self) -> ApiResult<Vec<Post>> {
        self.get_bookmarks().await
    }

    async fn set_bookmark(&self, post_id: &str, bookmarked: bool) -> ApiResult<bool> {
        self.put_bookmark(post_id, bookmarked).await
    }

    async fn following(&self) -> ApiResult<Vec<User>> {
        self.get_following().await
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_API_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:5000/api/");
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(client.url("/users/me"), "http://localhost:5000/api/users/me");
    }

    #[test]
    fn test_authed_requires_token() {
        let mut client = ApiClient::new("http://localhost:5000/api");
        let req = client.client.get("http://localhost:5000/api/users/me");
        assert!(matches!(client.authed(req), Err(ApiError::AuthMissing)));

        client.set_token(Some("abc".to_string()));
        let req = client.client.get("http://localhost:5000/api/users/me");
        assert!(client.authed(req).is_ok());
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_network() {
        // Port 9 is discard; the call must fail before any connection attempt
        let client = ApiClient::new("http://127.0.0.1:9/api");
        let err = client.get_me().await.unwrap_err();
        assert!(matches!(err, ApiError::AuthMissing));
    }
}
