//! API-boundary adapter.
//!
//! The server has shipped several spellings of the same fields over time
//! (`avatar`, `profileImage`, `profile_image`; camelCase and snake_case;
//! languages as bare strings or objects). The `Raw*` types accept all of
//! them and the `normalize_*` functions collapse them into the canonical
//! view models in [`crate::models`]. Nothing downstream reads a raw type.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::enums::{MatchStatus, PostCategory, Proficiency};
use crate::models::{
    datetime_format, Author, LanguageSkill, MatchRequest, Post, Reaction, Reply, User,
};

/// Ids arrive as strings or integers depending on the endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    pub fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawLanguage {
    Code(String),
    Detailed {
        #[serde(alias = "name", alias = "code")]
        language: String,
        #[serde(default, alias = "level")]
        proficiency: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawUser {
    pub id: Option<RawId>,
    #[serde(rename = "_id")]
    pub mongo_id: Option<RawId>,
    #[serde(alias = "displayName")]
    pub name: Option<String>,
    #[serde(rename = "firstName", alias = "first_name")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", alias = "last_name")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    #[serde(rename = "profileImage")]
    pub profile_image_camel: Option<String>,
    #[serde(rename = "profile_image")]
    pub profile_image_snake: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "nativeLanguages", alias = "native_languages")]
    pub native_languages: Option<Vec<RawLanguage>>,
    #[serde(rename = "targetLanguages", alias = "target_languages", alias = "learningLanguages")]
    pub target_languages: Option<Vec<RawLanguage>>,
    pub bio: Option<String>,
    pub interests: Option<Vec<String>>,
    #[serde(rename = "matchPercentage", alias = "match_percentage", alias = "matchScore")]
    pub match_percentage: Option<f64>,
    pub distance: Option<f64>,
    #[serde(rename = "onboardingStep", alias = "onboarding_step")]
    pub onboarding_step: Option<i64>,
    #[serde(rename = "isOnline", alias = "is_online", alias = "online")]
    pub is_online: Option<bool>,
}

fn pick_id(id: Option<RawId>, mongo_id: Option<RawId>) -> String {
    id.or(mongo_id).map(RawId::into_string).unwrap_or_default()
}

/// Reaction user entries are either ids or embedded user objects
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawReactionUser {
    Id(RawId),
    Profile(Box<RawUser>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawReaction {
    #[serde(alias = "type")]
    pub emoji: String,
    pub count: Option<u32>,
    pub users: Vec<RawReactionUser>,
    #[serde(rename = "hasReacted", alias = "has_reacted", alias = "userReacted")]
    pub has_reacted: Option<bool>,
}

/// Authors are embedded profiles on newer endpoints and bare ids on older ones
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAuthor {
    Id(RawId),
    Profile(Box<RawUser>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawReply {
    pub id: Option<RawId>,
    #[serde(rename = "_id")]
    pub mongo_id: Option<RawId>,
    #[serde(alias = "user")]
    pub author: Option<RawAuthor>,
    #[serde(rename = "authorName", alias = "author_name")]
    pub author_name: Option<String>,
    #[serde(alias = "body", alias = "text")]
    pub content: String,
    #[serde(rename = "parentReplyId", alias = "parent_reply_id", alias = "parentId")]
    pub parent_reply_id: Option<RawId>,
    #[serde(rename = "createdAt", alias = "created_at", with = "datetime_format")]
    pub created_at: Option<DateTime<Utc>>,
    pub reactions: Vec<RawReaction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPost {
    pub id: Option<RawId>,
    #[serde(rename = "_id")]
    pub mongo_id: Option<RawId>,
    #[serde(alias = "user")]
    pub author: Option<RawAuthor>,
    #[serde(rename = "authorName", alias = "author_name")]
    pub author_name: Option<String>,
    #[serde(alias = "body", alias = "text")]
    pub content: String,
    pub category: Option<String>,
    #[serde(rename = "createdAt", alias = "created_at", with = "datetime_format")]
    pub created_at: Option<DateTime<Utc>>,
    pub reactions: Vec<RawReaction>,
    #[serde(alias = "comments")]
    pub replies: Vec<RawReply>,
    #[serde(rename = "isBookmarked", alias = "is_bookmarked", alias = "bookmarked")]
    pub is_bookmarked: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMatchRequest {
    pub id: Option<RawId>,
    #[serde(rename = "_id")]
    pub mongo_id: Option<RawId>,
    #[serde(rename = "senderId", alias = "sender_id", alias = "sender")]
    pub sender_id: Option<RawAuthor>,
    #[serde(rename = "receiverId", alias = "receiver_id", alias = "receiver")]
    pub receiver_id: Option<RawAuthor>,
    pub status: Option<String>,
    #[serde(rename = "createdAt", alias = "created_at", with = "datetime_format")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Scheme and host of the API base URL, without any path.
///
/// Uploaded images come back as server-relative paths that live on the
/// origin, not under the `/api` prefix.
pub fn api_origin(base_url: &str) -> &str {
    let Some(scheme_end) = base_url.find("://") else {
        return base_url.trim_end_matches('/');
    };
    let host_start = scheme_end + 3;
    match base_url[host_start..].find('/') {
        Some(slash) => &base_url[..host_start + slash],
        None => base_url.trim_end_matches('/'),
    }
}

/// Turns a server-relative image path into an absolute URL
pub fn absolutize_url(path: &str, base_url: &str) -> String {
    let path = path.trim();
    if path.starts_with("http://")
        || path.starts_with("https://")
        || path.starts_with("data:")
        || path.starts_with("blob:")
    {
        return path.to_string();
    }
    if let Some(rest) = path.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    format!(
        "{}/{}",
        api_origin(base_url),
        path.trim_start_matches('/')
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn normalize_languages(raw: Option<Vec<RawLanguage>>) -> Vec<LanguageSkill> {
    raw.unwrap_or_default()
        .into_iter()
        .filter_map(|lang| match lang {
            RawLanguage::Code(code) => non_empty(Some(code)).map(LanguageSkill::new),
            RawLanguage::Detailed {
                language,
                proficiency,
            } => non_empty(Some(language)).map(|language| LanguageSkill {
                language,
                proficiency: proficiency.as_deref().and_then(Proficiency::parse),
            }),
        })
        .collect()
}

/// Collapses every server spelling of a user into the canonical [`User`]
pub fn normalize_user(raw: RawUser, base_url: &str) -> User {
    let name = non_empty(raw.name).unwrap_or_else(|| {
        let parts: Vec<String> = [raw.first_name, raw.last_name]
            .into_iter()
            .filter_map(non_empty)
            .collect();
        parts.join(" ")
    });

    // avatar wins over profileImage, which wins over profile_image
    let profile_image = non_empty(raw.avatar)
        .or_else(|| non_empty(raw.profile_image_camel))
        .or_else(|| non_empty(raw.profile_image_snake))
        .map(|path| absolutize_url(&path, base_url));

    User {
        id: pick_id(raw.id, raw.mongo_id),
        name,
        email: non_empty(raw.email),
        profile_image,
        city: non_empty(raw.city),
        country: non_empty(raw.country),
        native_languages: normalize_languages(raw.native_languages),
        target_languages: normalize_languages(raw.target_languages),
        bio: raw.bio,
        interests: raw
            .interests
            .unwrap_or_default()
            .into_iter()
            .filter_map(|i| non_empty(Some(i)))
            .collect(),
        match_percentage: raw.match_percentage,
        distance: raw.distance.filter(|d| d.is_finite() && *d >= 0.0),
        onboarding_step: raw.onboarding_step.unwrap_or(0).clamp(0, u8::MAX as i64) as u8,
        is_online: raw.is_online.unwrap_or(false),
    }
}

/// Normalizes one reaction bucket so that `count == users.len()` and
/// `has_reacted` reflects the viewer.
pub fn normalize_reaction(raw: RawReaction, viewer_id: Option<&str>) -> Reaction {
    let mut users: Vec<String> = Vec::with_capacity(raw.users.len());
    for user in raw.users {
        let id = match user {
            RawReactionUser::Id(id) => id.into_string(),
            RawReactionUser::Profile(profile) => match profile.id.or(profile.mongo_id) {
                Some(id) => id.into_string(),
                None => continue,
            },
        };
        if !users.contains(&id) {
            users.push(id);
        }
    }

    let has_reacted = match viewer_id {
        Some(viewer) => {
            let listed = users.iter().any(|u| u == viewer);
            if !listed && raw.has_reacted == Some(true) {
                users.push(viewer.to_string());
                true
            } else {
                listed
            }
        }
        None => raw.has_reacted.unwrap_or(false),
    };

    Reaction {
        emoji: raw.emoji,
        count: users.len() as u32,
        has_reacted,
        users,
    }
}

fn normalize_reactions(raw: Vec<RawReaction>, viewer_id: Option<&str>) -> Vec<Reaction> {
    raw.into_iter()
        .filter(|r| !r.emoji.is_empty())
        .map(|r| normalize_reaction(r, viewer_id))
        .filter(|r| r.count > 0)
        .collect()
}

fn normalize_author(raw: Option<RawAuthor>, author_name: Option<String>, base_url: &str) -> Author {
    match raw {
        Some(RawAuthor::Profile(profile)) => {
            let user = normalize_user(*profile, base_url);
            Author {
                id: user.id,
                name: if user.name.is_empty() {
                    non_empty(author_name).unwrap_or_default()
                } else {
                    user.name
                },
                profile_image: user.profile_image,
            }
        }
        Some(RawAuthor::Id(id)) => Author {
            id: id.into_string(),
            name: non_empty(author_name).unwrap_or_default(),
            profile_image: None,
        },
        None => Author {
            id: String::new(),
            name: non_empty(author_name).unwrap_or_default(),
            profile_image: None,
        },
    }
}

pub fn normalize_reply(raw: RawReply, base_url: &str, viewer_id: Option<&str>) -> Reply {
    Reply {
        id: pick_id(raw.id, raw.mongo_id),
        author: normalize_author(raw.author, raw.author_name, base_url),
        content: raw.content,
        parent_reply_id: raw.parent_reply_id.map(RawId::into_string),
        created_at: raw.created_at,
        reactions: normalize_reactions(raw.reactions, viewer_id),
    }
}

pub fn normalize_post(raw: RawPost, base_url: &str, viewer_id: Option<&str>) -> Post {
    Post {
        id: pick_id(raw.id, raw.mongo_id),
        author: normalize_author(raw.author, raw.author_name, base_url),
        content: raw.content,
        category: raw
            .category
            .as_deref()
            .and_then(PostCategory::parse)
            .unwrap_or_default(),
        created_at: raw.created_at,
        reactions: normalize_reactions(raw.reactions, viewer_id),
        replies: raw
            .replies
            .into_iter()
            .map(|r| normalize_reply(r, base_url, viewer_id))
            .collect(),
        is_bookmarked: raw.is_bookmarked.unwrap_or(false),
    }
}

fn author_id(raw: Option<RawAuthor>) -> String {
    match raw {
        Some(RawAuthor::Id(id)) => id.into_string(),
        Some(RawAuthor::Profile(profile)) => pick_id(profile.id, profile.mongo_id),
        None => String::new(),
    }
}

pub fn normalize_match_request(raw: RawMatchRequest) -> MatchRequest {
    MatchRequest {
        id: pick_id(raw.id, raw.mongo_id),
        sender_id: author_id(raw.sender_id),
        receiver_id: author_id(raw.receiver_id),
        status: raw
            .status
            .as_deref()
            .and_then(MatchStatus::parse)
            .unwrap_or_default(),
        created_at: raw.created_at,
    }
}

/// Partial user returned by the `PUT /users/me/*` endpoints.
///
/// Only fields the server actually sent are applied, so a response that
/// echoes just `{ "bio": ... }` never blanks the rest of the profile.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    raw: RawUser,
    base_url: String,
}

impl UserPatch {
    pub fn new(raw: RawUser, base_url: impl Into<String>) -> Self {
        Self {
            raw,
            base_url: base_url.into(),
        }
    }

    /// A patch carrying every field of `user`
    pub fn from_user(user: &User) -> Self {
        let languages = |skills: &[LanguageSkill]| {
            skills
                .iter()
                .map(|s| RawLanguage::Detailed {
                    language: s.language.clone(),
                    proficiency: s.proficiency.map(|p| p.as_str().to_string()),
                })
                .collect::<Vec<_>>()
        };
        let raw = RawUser {
            id: Some(RawId::Text(user.id.clone())),
            name: Some(user.name.clone()),
            email: user.email.clone(),
            profile_image_camel: user.profile_image.clone(),
            city: user.city.clone(),
            country: user.country.clone(),
            native_languages: Some(languages(user.native_languages.as_slice())),
            target_languages: Some(languages(user.target_languages.as_slice())),
            bio: user.bio.clone(),
            interests: Some(user.interests.clone()),
            match_percentage: user.match_percentage,
            distance: user.distance,
            onboarding_step: Some(user.onboarding_step as i64),
            is_online: Some(user.is_online),
            ..Default::default()
        };
        Self::new(raw, String::new())
    }

    pub fn apply(&self, user: &mut User) {
        let raw = &self.raw;
        let full = normalize_user(raw.clone(), &self.base_url);

        if raw.id.is_some() || raw.mongo_id.is_some() {
            user.id = full.id;
        }
        if !full.name.is_empty() {
            user.name = full.name;
        }
        if raw.email.is_some() {
            user.email = full.email;
        }
        if full.profile_image.is_some() {
            user.profile_image = full.profile_image;
        }
        if raw.city.is_some() {
            user.city = full.city;
        }
        if raw.country.is_some() {
            user.country = full.country;
        }
        if raw.native_languages.is_some() {
            user.native_languages = full.native_languages;
        }
        if raw.target_languages.is_some() {
            user.target_languages = full.target_languages;
        }
        if raw.bio.is_some() {
            user.bio = full.bio;
        }
        if raw.interests.is_some() {
            user.interests = full.interests;
        }
        if raw.match_percentage.is_some() {
            user.match_percentage = full.match_percentage;
        }
        if raw.distance.is_some() {
            user.distance = full.distance;
        }
        if raw.onboarding_step.is_some() {
            user.onboarding_step = full.onboarding_step;
        }
        if raw.is_online.is_some() {
            user.is_online = full.is_online;
        }
    }

    pub fn applied_to(&self, user: &User) -> User {
        let mut next = user.clone();
        self.apply(&mut next);
        next
    }

    pub fn profile_image(&self) -> Option<String> {
        normalize_user(self.raw.clone(), &self.base_url).profile_image
    }

    /// Fills in the image when the server echo left it out
    pub fn with_profile_image(mut self, url: impl Into<String>) -> Self {
        self.raw.avatar = Some(url.into());
        self
    }
}
