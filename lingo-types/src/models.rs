use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{MatchStatus, MeetingPreference, PostCategory, Proficiency};

// Lenient timestamp handling: the API emits RFC3339, but older records
// carry empty strings or nulls.
pub(crate) mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        Ok(s.and_then(|s| s.parse::<DateTime<Utc>>().ok()))
    }
}

/// A language the user speaks or is learning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageSkill {
    pub language: String,
    #[serde(default)]
    pub proficiency: Option<Proficiency>,
}

impl LanguageSkill {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            proficiency: None,
        }
    }

    pub fn with_proficiency(language: impl Into<String>, proficiency: Proficiency) -> Self {
        Self {
            language: language.into(),
            proficiency: Some(proficiency),
        }
    }
}

/// Canonical user view model.
///
/// Only ever built through the normalization adapter, so components never
/// see the server's field-name variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Absolute URL of the avatar
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub native_languages: Vec<LanguageSkill>,
    #[serde(default)]
    pub target_languages: Vec<LanguageSkill>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub match_percentage: Option<f64>,
    /// Distance from the viewer in kilometres
    #[serde(default)]
    pub distance: Option<f64>,
    /// Number of onboarding steps the server has marked complete
    #[serde(default)]
    pub onboarding_step: u8,
    #[serde(default)]
    pub is_online: bool,
}

impl User {
    pub fn location_label(&self) -> Option<String> {
        match (&self.city, &self.country) {
            (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
            (Some(city), None) => Some(city.clone()),
            (None, Some(country)) => Some(country.clone()),
            (None, None) => None,
        }
    }
}

/// Post or reply author, reduced to what the feed renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// Aggregated emoji reaction on a post or reply.
///
/// `count` always equals `users.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub emoji: String,
    pub count: u32,
    pub has_reacted: bool,
    pub users: Vec<String>,
}

impl Reaction {
    pub fn is_consistent(&self) -> bool {
        self.count as usize == self.users.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub author: Author,
    pub content: String,
    /// Reply this one answers; `None` for a direct reply to the post
    #[serde(default)]
    pub parent_reply_id: Option<String>,
    #[serde(default, with = "datetime_format")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: Author,
    pub content: String,
    #[serde(default)]
    pub category: PostCategory,
    #[serde(default, with = "datetime_format")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    /// Flat reply list; the thread shape comes from `parent_reply_id`
    #[serde(default)]
    pub replies: Vec<Reply>,
    #[serde(default)]
    pub is_bookmarked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default, with = "datetime_format")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
    #[serde(default)]
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub total_pages: u32,
}

impl Pagination {
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

/// One page of a paginated list
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// One page of the cursor-paginated post feed
#[derive(Debug, Clone, PartialEq)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub next_cursor: Option<String>,
}

/// Accepts both `{ "data": T }` and a bare `T`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

// Request bodies

/// Partial update for `PUT /users/me/profile`; unset fields are left alone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LanguagesUpdate {
    pub native_languages: Vec<LanguageSkill>,
    pub target_languages: Vec<LanguageSkill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub interests: Vec<String>,
    #[serde(default)]
    pub learning_goals: Vec<String>,
    #[serde(default)]
    pub meeting_preference: MeetingPreference,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OnboardingStepUpdate {
    pub step: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionRequest {
    pub emoji: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRequest {
    pub post_id: String,
}

/// Filters for `GET /users`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserQuery {
    pub search: Option<String>,
    pub native_language: Option<String>,
    pub target_language: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Filters for `GET /posts`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostQuery {
    pub category: Option<PostCategory>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(alias = "error")]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
}
