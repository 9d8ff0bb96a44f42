use std::sync::Arc;

use lingo_types::{ProfileUpdate, User, UserPatch};

use crate::api::{ApiError, ApiResult, Backend, ImageUpload};
use crate::log_mutation;
use crate::logging::LogConfig;
use crate::notifications::Notifier;
use crate::optimistic::{Optimistic, Reconciled};
use crate::wizard::steps::{MAX_BIO_LEN, MAX_IMAGE_BYTES, MAX_INTERESTS};

/// Edits the signed-in user's profile with optimistic local updates
pub struct ProfileEditor {
    backend: Arc<dyn Backend>,
    user: User,
    image: Optimistic<Option<String>>,
    bio: Optimistic<Option<String>>,
    interests: Optimistic<Vec<String>>,
    notifier: Notifier,
    log_config: LogConfig,
}

impl ProfileEditor {
    pub fn new(backend: Arc<dyn Backend>, user: User, notifier: Notifier) -> Self {
        Self {
            backend,
            image: Optimistic::new(user.profile_image.clone()),
            bio: Optimistic::new(user.bio.clone()),
            interests: Optimistic::new(user.interests.clone()),
            user,
            notifier,
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// The user as currently shown, optimistic edits included
    pub fn user(&self) -> User {
        let mut user = self.user.clone();
        user.profile_image = self.image.get().clone();
        user.bio = self.bio.get().clone();
        user.interests = self.interests.get().clone();
        user
    }

    pub fn profile_image(&self) -> Option<&str> {
        self.image.get().as_deref()
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.get().as_deref()
    }

    pub fn interests(&self) -> &[String] {
        self.interests.get()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn absorb(&mut self, patch: &UserPatch) {
        patch.apply(&mut self.user);
    }

    fn report<T>(&mut self, what: &str, outcome: &Reconciled<T>) {
        match outcome {
            Reconciled::Committed(_) => {
                log_mutation!(self.log_config, "{} committed", what);
            }
            Reconciled::RolledBack { error, .. } => {
                log::warn!("{} rolled back: {}", what, error);
                self.notifier.error(error);
            }
            Reconciled::Superseded => {}
        }
    }

    /// Swaps in `preview` (e.g. a local file URL) right away, then uploads
    /// and stores the server's absolute URL. On failure the previous image
    /// comes back and an error notification is shown.
    pub async fn upload_image(
        &mut self,
        image: ImageUpload,
        preview: Option<String>,
    ) -> Reconciled<Option<String>> {
        if image.bytes.len() > MAX_IMAGE_BYTES {
            let error = ApiError::BadRequest(format!(
                "images must be smaller than {} MB",
                MAX_IMAGE_BYTES / (1024 * 1024)
            ));
            self.notifier.error(&error);
            return Reconciled::RolledBack {
                restored: self.image.get().clone(),
                error,
            };
        }

        let shown = preview.or_else(|| self.image.get().clone());
        let ticket = self.image.apply(shown);
        let result = self.commit_image(image).await;
        let result = result.map(|patch| {
            let url = patch.profile_image();
            self.absorb(&patch);
            Some(url)
        });
        let outcome = self.image.settle(ticket, result);
        self.report("profile image", &outcome);
        outcome
    }

    async fn commit_image(&self, image: ImageUpload) -> ApiResult<UserPatch> {
        let uploaded = self.backend.upload_image(image).await?;
        let update = ProfileUpdate {
            profile_image: Some(uploaded.url.clone()),
            ..Default::default()
        };
        let mut patch = self.backend.update_profile(&update).await?;
        if patch.profile_image().is_none() {
            patch = patch.with_profile_image(uploaded.url);
        }
        Ok(patch)
    }

    pub async fn update_bio(&mut self, bio: &str) -> Reconciled<Option<String>> {
        let bio: String = bio.trim().chars().take(MAX_BIO_LEN).collect();
        let value = (!bio.is_empty()).then_some(bio);

        let ticket = self.bio.apply(value.clone());
        let update = ProfileUpdate {
            bio: Some(value.clone().unwrap_or_default()),
            ..Default::default()
        };
        let result = self.backend.update_profile(&update).await;
        let result = result.map(|patch| {
            self.absorb(&patch);
            None
        });
        let outcome = self.bio.settle(ticket, result);
        self.report("bio", &outcome);
        outcome
    }

    pub async fn update_interests(&mut self, interests: Vec<String>) -> Reconciled<Vec<String>> {
        let mut cleaned: Vec<String> = Vec::new();
        for interest in interests {
            let interest = interest.trim().to_string();
            if !interest.is_empty() && !cleaned.contains(&interest) {
                cleaned.push(interest);
            }
        }
        cleaned.truncate(MAX_INTERESTS);

        let ticket = self.interests.apply(cleaned.clone());
        let update = ProfileUpdate {
            interests: Some(cleaned),
            ..Default::default()
        };
        let result = self.backend.update_profile(&update).await;
        let result = result.map(|patch| {
            self.absorb(&patch);
            None
        });
        let outcome = self.interests.settle(ticket, result);
        self.report("interests", &outcome);
        outcome
    }
}
