use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use lingo_types::{
    LanguageSkill, LanguagesUpdate, MeetingPreference, PreferencesUpdate, ProfileUpdate, User,
    UserPatch,
};
use thiserror::Error;

use crate::api::{ApiResult, Backend, ImageUpload};

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_BIO_LEN: usize = 500;
pub const MAX_INTERESTS: usize = 10;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Field rule broken by the current step's input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter your name")]
    NameRequired,
    #[error("Name must be at most {max} characters")]
    NameTooLong { max: usize },
    #[error("Please enter your city")]
    CityRequired,
    #[error("Please enter your country")]
    CountryRequired,
    #[error("Add at least one language you speak")]
    NativeLanguageRequired,
    #[error("Add at least one language you want to learn")]
    TargetLanguageRequired,
    #[error("{0} can't be both a native and a target language")]
    LanguageOverlap(String),
    #[error("Tell others a little about yourself")]
    BioRequired,
    #[error("Bio must be at most {max} characters")]
    BioTooLong { max: usize },
    #[error("Pick at least one interest")]
    InterestsRequired,
    #[error("Pick at most {max} interests")]
    TooManyInterests { max: usize },
    #[error("Image must be smaller than {max_bytes} bytes")]
    ImageTooLarge { max_bytes: usize },
    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),
}

/// Values entered across the wizard, prefilled from the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnboardingDraft {
    pub name: String,
    pub city: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub native_languages: Vec<LanguageSkill>,
    pub target_languages: Vec<LanguageSkill>,
    pub bio: String,
    pub interests: Vec<String>,
    pub learning_goals: Vec<String>,
    pub meeting_preference: MeetingPreference,
    /// Photo picked on the last step, uploaded on save
    pub photo: Option<ImageUpload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Name,
    Location,
    Languages,
    Profile,
    Preferences,
    Photo,
}

/// One page of the onboarding wizard.
///
/// A step only knows the user and the shared draft; ordering and
/// navigation belong to the wizard.
#[async_trait]
pub trait WizardStep: Send + Sync {
    fn kind(&self) -> StepKind;

    fn title(&self) -> &'static str;

    /// Copies what the server already knows into the draft
    fn prefill(&self, user: &User, draft: &mut OnboardingDraft);

    fn validate(&self, draft: &OnboardingDraft) -> Result<(), ValidationError>;

    /// Persists this step's fields. `None` means nothing needed saving.
    async fn save(
        &self,
        backend: &dyn Backend,
        user: &User,
        draft: &OnboardingDraft,
    ) -> ApiResult<Option<UserPatch>>;

    /// Runs when the step becomes current
    async fn on_enter(&self, _draft: &mut OnboardingDraft) {}
}

fn trimmed(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub struct NameStep;

#[async_trait]
impl WizardStep for NameStep {
    fn kind(&self) -> StepKind {
        StepKind::Name
    }

    fn title(&self) -> &'static str {
        "What should we call you?"
    }

    fn prefill(&self, user: &User, draft: &mut OnboardingDraft) {
        draft.name = user.name.clone();
    }

    fn validate(&self, draft: &OnboardingDraft) -> Result<(), ValidationError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ValidationError::NameRequired);
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong { max: MAX_NAME_LEN });
        }
        Ok(())
    }

    async fn save(
        &self,
        backend: &dyn Backend,
        _user: &User,
        draft: &OnboardingDraft,
    ) -> ApiResult<Option<UserPatch>> {
        let update = ProfileUpdate {
            name: trimmed(&draft.name),
            ..Default::default()
        };
        backend.update_profile(&update).await.map(Some)
    }
}

/// A position reported by the device
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Best-effort location source. Failures leave manual entry in place.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> anyhow::Result<GeoFix>;
}

#[derive(Default)]
pub struct LocationStep {
    geolocator: Option<Arc<dyn Geolocator>>,
}

impl LocationStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_geolocator(geolocator: Arc<dyn Geolocator>) -> Self {
        Self {
            geolocator: Some(geolocator),
        }
    }
}

#[async_trait]
impl WizardStep for LocationStep {
    fn kind(&self) -> StepKind {
        StepKind::Location
    }

    fn title(&self) -> &'static str {
        "Where are you based?"
    }

    fn prefill(&self, user: &User, draft: &mut OnboardingDraft) {
        draft.city = user.city.clone().unwrap_or_default();
        draft.country = user.country.clone().unwrap_or_default();
    }

    fn validate(&self, draft: &OnboardingDraft) -> Result<(), ValidationError> {
        if draft.city.trim().is_empty() {
            return Err(ValidationError::CityRequired);
        }
        if draft.country.trim().is_empty() {
            return Err(ValidationError::CountryRequired);
        }
        Ok(())
    }

    async fn save(
        &self,
        backend: &dyn Backend,
        _user: &User,
        draft: &OnboardingDraft,
    ) -> ApiResult<Option<UserPatch>> {
        let update = ProfileUpdate {
            city: trimmed(&draft.city),
            country: trimmed(&draft.country),
            latitude: draft.latitude,
            longitude: draft.longitude,
            ..Default::default()
        };
        backend.update_profile(&update).await.map(Some)
    }

    async fn on_enter(&self, draft: &mut OnboardingDraft) {
        let Some(geolocator) = &self.geolocator else {
            return;
        };
        if !draft.city.trim().is_empty() && !draft.country.trim().is_empty() {
            return;
        }
        match geolocator.locate().await {
            Ok(fix) => {
                draft.latitude = Some(fix.latitude);
                draft.longitude = Some(fix.longitude);
                if draft.city.trim().is_empty() {
                    draft.city = fix.city.unwrap_or_default();
                }
                if draft.country.trim().is_empty() {
                    draft.country = fix.country.unwrap_or_default();
                }
            }
            Err(e) => log::warn!("Geolocation unavailable, falling back to manual entry: {}", e),
        }
    }
}

pub struct LanguagesStep;

#[async_trait]
impl WizardStep for LanguagesStep {
    fn kind(&self) -> StepKind {
        StepKind::Languages
    }

    fn title(&self) -> &'static str {
        "Which languages do you speak and learn?"
    }

    fn prefill(&self, user: &User, draft: &mut OnboardingDraft) {
        draft.native_languages = user.native_languages.clone();
        draft.target_languages = user.target_languages.clone();
    }

    fn validate(&self, draft: &OnboardingDraft) -> Result<(), ValidationError> {
        if draft.native_languages.is_empty() {
            return Err(ValidationError::NativeLanguageRequired);
        }
        if draft.target_languages.is_empty() {
            return Err(ValidationError::TargetLanguageRequired);
        }
        let native: HashSet<String> = draft
            .native_languages
            .iter()
            .map(|l| l.language.to_lowercase())
            .collect();
        if let Some(overlap) = draft
            .target_languages
            .iter()
            .find(|l| native.contains(&l.language.to_lowercase()))
        {
            return Err(ValidationError::LanguageOverlap(overlap.language.clone()));
        }
        Ok(())
    }

    async fn save(
        &self,
        backend: &dyn Backend,
        _user: &User,
        draft: &OnboardingDraft,
    ) -> ApiResult<Option<UserPatch>> {
        let update = LanguagesUpdate {
            native_languages: draft.native_languages.clone(),
            target_languages: draft.target_languages.clone(),
        };
        backend.update_languages(&update).await.map(Some)
    }
}

pub struct ProfileStep;

#[async_trait]
impl WizardStep for ProfileStep {
    fn kind(&self) -> StepKind {
        StepKind::Profile
    }

    fn title(&self) -> &'static str {
        "Tell us about yourself"
    }

    fn prefill(&self, user: &User, draft: &mut OnboardingDraft) {
        draft.bio = user.bio.clone().unwrap_or_default();
    }

    fn validate(&self, draft: &OnboardingDraft) -> Result<(), ValidationError> {
        let bio = draft.bio.trim();
        if bio.is_empty() {
            return Err(ValidationError::BioRequired);
        }
        if bio.chars().count() > MAX_BIO_LEN {
            return Err(ValidationError::BioTooLong { max: MAX_BIO_LEN });
        }
        Ok(())
    }

    async fn save(
        &self,
        backend: &dyn Backend,
        _user: &User,
        draft: &OnboardingDraft,
    ) -> ApiResult<Option<UserPatch>> {
        let update = ProfileUpdate {
            bio: trimmed(&draft.bio),
            ..Default::default()
        };
        backend.update_profile(&update).await.map(Some)
    }
}

pub struct PreferencesStep;

#[async_trait]
impl WizardStep for PreferencesStep {
    fn kind(&self) -> StepKind {
        StepKind::Preferences
    }

    fn title(&self) -> &'static str {
        "What are you into?"
    }

    fn prefill(&self, user: &User, draft: &mut OnboardingDraft) {
        draft.interests = user.interests.clone();
    }

    fn validate(&self, draft: &OnboardingDraft) -> Result<(), ValidationError> {
        let count = draft.interests.iter().filter(|i| !i.trim().is_empty()).count();
        if count == 0 {
            return Err(ValidationError::InterestsRequired);
        }
        if count > MAX_INTERESTS {
            return Err(ValidationError::TooManyInterests { max: MAX_INTERESTS });
        }
        Ok(())
    }

    async fn save(
        &self,
        backend: &dyn Backend,
        _user: &User,
        draft: &OnboardingDraft,
    ) -> ApiResult<Option<UserPatch>> {
        let update = PreferencesUpdate {
            interests: draft.interests.iter().filter_map(|i| trimmed(i)).collect(),
            learning_goals: draft.learning_goals.clone(),
            meeting_preference: draft.meeting_preference,
        };
        backend.update_preferences(&update).await.map(Some)
    }
}

/// Optional profile photo; skipping it is allowed
pub struct PhotoStep;

#[async_trait]
impl WizardStep for PhotoStep {
    fn kind(&self) -> StepKind {
        StepKind::Photo
    }

    fn title(&self) -> &'static str {
        "Add a profile photo"
    }

    fn prefill(&self, _user: &User, draft: &mut OnboardingDraft) {
        draft.photo = None;
    }

    fn validate(&self, draft: &OnboardingDraft) -> Result<(), ValidationError> {
        match &draft.photo {
            Some(photo) if !photo.content_type.starts_with("image/") => {
                Err(ValidationError::UnsupportedImage(photo.content_type.clone()))
            }
            Some(photo) if photo.bytes.len() > MAX_IMAGE_BYTES => Err(ValidationError::ImageTooLarge {
                max_bytes: MAX_IMAGE_BYTES,
            }),
            _ => Ok(()),
        }
    }

    async fn save(
        &self,
        backend: &dyn Backend,
        _user: &User,
        draft: &OnboardingDraft,
    ) -> ApiResult<Option<UserPatch>> {
        let Some(photo) = draft.photo.clone() else {
            return Ok(None);
        };
        let uploaded = backend.upload_image(photo).await?;
        let update = ProfileUpdate {
            profile_image: Some(uploaded.url),
            ..Default::default()
        };
        backend.update_profile(&update).await.map(Some)
    }
}

/// The six onboarding steps in order
pub fn default_steps(geolocator: Option<Arc<dyn Geolocator>>) -> Vec<Box<dyn WizardStep>> {
    let location = match geolocator {
        Some(geolocator) => LocationStep::with_geolocator(geolocator),
        None => LocationStep::new(),
    };
    vec![
        Box::new(NameStep),
        Box::new(location),
        Box::new(LanguagesStep),
        Box::new(ProfileStep),
        Box::new(PreferencesStep),
        Box::new(PhotoStep),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_rules() {
        let mut draft = OnboardingDraft::default();
        assert_eq!(NameStep.validate(&draft), Err(ValidationError::NameRequired));
        draft.name = "x".repeat(MAX_NAME_LEN + 1);
        assert_eq!(
            NameStep.validate(&draft),
            Err(ValidationError::NameTooLong { max: MAX_NAME_LEN })
        );
        draft.name = "  Ana  ".to_string();
        assert_eq!(NameStep.validate(&draft), Ok(()));
    }

    #[test]
    fn test_language_overlap_is_case_insensitive() {
        let draft = OnboardingDraft {
            native_languages: vec![LanguageSkill::new("Spanish")],
            target_languages: vec![LanguageSkill::new("spanish")],
            ..Default::default()
        };
        assert_eq!(
            LanguagesStep.validate(&draft),
            Err(ValidationError::LanguageOverlap("spanish".to_string()))
        );
    }

    #[test]
    fn test_photo_is_optional_but_checked() {
        let mut draft = OnboardingDraft::default();
        assert_eq!(PhotoStep.validate(&draft), Ok(()));

        draft.photo = Some(ImageUpload {
            filename: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            bytes: vec![1, 2, 3],
        });
        assert!(matches!(
            PhotoStep.validate(&draft),
            Err(ValidationError::UnsupportedImage(_))
        ));

        draft.photo = Some(ImageUpload::new("big.png", vec![0; MAX_IMAGE_BYTES + 1]));
        assert!(matches!(
            PhotoStep.validate(&draft),
            Err(ValidationError::ImageTooLarge { .. })
        ));
    }

    struct FixedLocation;

    #[async_trait]
    impl Geolocator for FixedLocation {
        async fn locate(&self) -> anyhow::Result<GeoFix> {
            Ok(GeoFix {
                latitude: 40.4,
                longitude: -3.7,
                city: Some("Madrid".to_string()),
                country: Some("Spain".to_string()),
            })
        }
    }

    struct DeniedLocation;

    #[async_trait]
    impl Geolocator for DeniedLocation {
        async fn locate(&self) -> anyhow::Result<GeoFix> {
            anyhow::bail!("permission denied")
        }
    }

    #[tokio::test]
    async fn test_geolocation_fills_empty_fields() {
        let step = LocationStep::with_geolocator(Arc::new(FixedLocation));
        let mut draft = OnboardingDraft {
            city: "Toledo".to_string(),
            ..Default::default()
        };
        step.on_enter(&mut draft).await;
        assert_eq!(draft.city, "Toledo");
        assert_eq!(draft.country, "Spain");
        assert_eq!(draft.latitude, Some(40.4));
    }

    #[tokio::test]
    async fn test_geolocation_failure_degrades_silently() {
        let step = LocationStep::with_geolocator(Arc::new(DeniedLocation));
        let mut draft = OnboardingDraft::default();
        step.on_enter(&mut draft).await;
        assert_eq!(draft, OnboardingDraft::default());
        assert_eq!(step.validate(&draft), Err(ValidationError::CityRequired));
    }

    #[test]
    fn test_default_step_order() {
        let kinds: Vec<StepKind> = default_steps(None).iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                StepKind::Name,
                StepKind::Location,
                StepKind::Languages,
                StepKind::Profile,
                StepKind::Preferences,
                StepKind::Photo,
            ]
        );
    }
}
