//! Resumable onboarding wizard.
//!
//! The server's `onboarding_step` counts completed steps, so it is also the
//! index of the step to resume at. Reaching [`TOTAL_STEPS`] ends the wizard.

pub mod steps;

use std::sync::Arc;

use lingo_types::User;
use thiserror::Error;

use crate::api::{ApiError, Backend};
use crate::log_wizard;
use crate::logging::LogConfig;

pub use steps::{
    default_steps, GeoFix, Geolocator, OnboardingDraft, StepKind, ValidationError, WizardStep,
};

pub const TOTAL_STEPS: usize = 6;

#[derive(Error, Debug)]
pub enum WizardError {
    /// Shown inline; the user fixes the field and tries again
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Saving the step failed; the user can retry
    #[error("Could not save your progress: {}", .0.user_message())]
    Save(#[source] ApiError),

    #[error("Could not load your profile: {}", .0.user_message())]
    Load(#[source] ApiError),

    #[error("The wizard has not been started")]
    NotMounted,

    #[error("Onboarding is already complete")]
    Completed,
}

impl WizardError {
    /// Whether re-clicking the same button can succeed without edits
    pub fn is_retryable(&self) -> bool {
        matches!(self, WizardError::Save(_) | WizardError::Load(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    NotMounted,
    Active(usize),
    /// Every step is done; the caller should leave the wizard
    Completed,
}

pub struct OnboardingWizard {
    backend: Arc<dyn Backend>,
    steps: Vec<Box<dyn WizardStep>>,
    phase: WizardPhase,
    user: Option<User>,
    draft: OnboardingDraft,
    error: Option<String>,
    saving: bool,
    log_config: LogConfig,
}

impl OnboardingWizard {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_steps(backend, default_steps(None))
    }

    pub fn with_steps(backend: Arc<dyn Backend>, steps: Vec<Box<dyn WizardStep>>) -> Self {
        Self {
            backend,
            steps,
            phase: WizardPhase::NotMounted,
            user: None,
            draft: OnboardingDraft::default(),
            error: None,
            saving: false,
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            WizardPhase::Active(index) => Some(index),
            _ => None,
        }
    }

    pub fn current_step(&self) -> Option<&dyn WizardStep> {
        self.current_index()
            .and_then(|index| self.steps.get(index))
            .map(|step| step.as_ref())
    }

    /// (1-based step number, total), for the progress bar
    pub fn progress(&self) -> (usize, usize) {
        let total = self.steps.len();
        match self.phase {
            WizardPhase::NotMounted => (0, total),
            WizardPhase::Active(index) => (index + 1, total),
            WizardPhase::Completed => (total, total),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn draft(&self) -> &OnboardingDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut OnboardingDraft {
        &mut self.draft
    }

    /// Message from the last failed `next`, kept for inline display
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Loads the user and resumes at the server's checkpoint
    pub async fn mount(&mut self) -> Result<WizardPhase, WizardError> {
        let user = self.backend.current_user().await.map_err(|e| {
            log::error!("Failed to load user for onboarding: {}", e);
            WizardError::Load(e)
        })?;

        let resume_at = user.onboarding_step as usize;
        let mut draft = OnboardingDraft::default();
        for step in &self.steps {
            step.prefill(&user, &mut draft);
        }
        self.draft = draft;
        self.user = Some(user);
        self.error = None;

        if resume_at >= self.steps.len() {
            log_wizard!(self.log_config, "Onboarding already complete, leaving wizard");
            self.phase = WizardPhase::Completed;
        } else {
            log_wizard!(self.log_config, "Resuming onboarding at step {}", resume_at);
            self.enter(resume_at).await;
        }
        Ok(self.phase)
    }

    async fn enter(&mut self, index: usize) {
        self.phase = WizardPhase::Active(index);
        if let Some(step) = self.steps.get(index) {
            step.on_enter(&mut self.draft).await;
        }
    }

    /// Validates and saves the current step, then advances.
    ///
    /// Validation and save failures keep the user on the step. A failure to
    /// record the checkpoint is logged and does not block.
    pub async fn next(&mut self) -> Result<WizardPhase, WizardError> {
        let index = match self.phase {
            WizardPhase::Active(index) => index,
            WizardPhase::NotMounted => return Err(WizardError::NotMounted),
            WizardPhase::Completed => return Err(WizardError::Completed),
        };
        let step = &self.steps[index];

        if let Err(invalid) = step.validate(&self.draft) {
            log_wizard!(self.log_config, "Step {} invalid: {}", index, invalid);
            self.error = Some(invalid.to_string());
            return Err(WizardError::Validation(invalid));
        }

        let Some(user) = self.user.as_ref() else {
            return Err(WizardError::NotMounted);
        };

        self.saving = true;
        let saved = step.save(self.backend.as_ref(), user, &self.draft).await;
        self.saving = false;

        let patch = match saved {
            Ok(patch) => patch,
            Err(e) => {
                log::error!("Failed to save onboarding step {}: {}", index, e);
                let err = WizardError::Save(e);
                self.error = Some(err.to_string());
                return Err(err);
            }
        };

        let target = index + 1;
        // Revisiting an earlier step must not lower the resume point
        let completed = target.max(user.onboarding_step as usize);
        if let Some(user) = self.user.as_mut() {
            if let Some(patch) = patch {
                patch.apply(user);
            }
            user.onboarding_step = completed as u8;
        }

        if let Err(e) = self.backend.set_onboarding_step(completed as u8).await {
            log::warn!("Failed to record onboarding step {}: {}", completed, e);
        }

        self.error = None;
        if target >= self.steps.len() {
            log_wizard!(self.log_config, "Onboarding complete");
            self.phase = WizardPhase::Completed;
        } else {
            log_wizard!(self.log_config, "Advanced to step {}", target);
            self.enter(target).await;
        }
        Ok(self.phase)
    }

    /// Goes back one step without validating
    pub fn back(&mut self) -> WizardPhase {
        if let WizardPhase::Active(index) = self.phase {
            if index > 0 {
                self.phase = WizardPhase::Active(index - 1);
                self.error = None;
                log_wizard!(self.log_config, "Back to step {}", index - 1);
            }
        }
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{user, FakeBackend};
    use lingo_types::LanguageSkill;

    fn wizard_at(step: u8) -> (Arc<FakeBackend>, OnboardingWizard) {
        let mut me = user("me", "Ana");
        me.onboarding_step = step;
        let fake = Arc::new(FakeBackend::with_me(me));
        let wizard = OnboardingWizard::new(fake.clone());
        (fake, wizard)
    }

    #[tokio::test]
    async fn test_resumes_at_server_checkpoint() {
        let (_fake, mut wizard) = wizard_at(3);
        assert_eq!(wizard.mount().await.unwrap(), WizardPhase::Active(3));
        assert_eq!(wizard.current_step().map(|s| s.kind()), Some(StepKind::Profile));
        assert_eq!(wizard.progress(), (4, TOTAL_STEPS));
    }

    #[tokio::test]
    async fn test_fresh_user_starts_at_name() {
        let (_fake, mut wizard) = wizard_at(0);
        wizard.mount().await.unwrap();
        assert_eq!(wizard.current_step().map(|s| s.kind()), Some(StepKind::Name));
        assert_eq!(wizard.draft().name, "Ana");
    }

    #[tokio::test]
    async fn test_completed_user_is_redirected() {
        let (_fake, mut wizard) = wizard_at(TOTAL_STEPS as u8);
        assert_eq!(wizard.mount().await.unwrap(), WizardPhase::Completed);
        assert!(matches!(wizard.next().await, Err(WizardError::Completed)));
    }

    #[tokio::test]
    async fn test_next_before_mount() {
        let (_fake, mut wizard) = wizard_at(0);
        assert!(matches!(wizard.next().await, Err(WizardError::NotMounted)));
    }

    #[tokio::test]
    async fn test_mount_failure_is_retryable() {
        let (fake, mut wizard) = wizard_at(0);
        fake.fail("current_user");
        let err = wizard.mount().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(wizard.phase(), WizardPhase::NotMounted);
    }

    #[tokio::test]
    async fn test_validation_blocks_without_saving() {
        let (fake, mut wizard) = wizard_at(0);
        wizard.mount().await.unwrap();
        wizard.draft_mut().name = "   ".to_string();

        let err = wizard.next().await.unwrap_err();
        assert!(matches!(err, WizardError::Validation(ValidationError::NameRequired)));
        assert!(!err.is_retryable());
        assert_eq!(wizard.phase(), WizardPhase::Active(0));
        assert!(wizard.error().is_some());
        assert_eq!(fake.call_count("update_profile"), 0);
    }

    #[tokio::test]
    async fn test_save_failure_blocks_and_retry_succeeds() {
        let (fake, mut wizard) = wizard_at(0);
        wizard.mount().await.unwrap();
        fake.fail("update_profile");

        let err = wizard.next().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(wizard.phase(), WizardPhase::Active(0));
        assert_eq!(fake.call_count("set_onboarding_step"), 0);

        fake.recover("update_profile");
        assert_eq!(wizard.next().await.unwrap(), WizardPhase::Active(1));
        assert!(wizard.error().is_none());
        assert_eq!(fake.state.lock().unwrap().onboarding_step, Some(1));
    }

    #[tokio::test]
    async fn test_checkpoint_failure_does_not_block() {
        let (fake, mut wizard) = wizard_at(0);
        wizard.mount().await.unwrap();
        fake.fail("set_onboarding_step");

        assert_eq!(wizard.next().await.unwrap(), WizardPhase::Active(1));
        assert_eq!(fake.call_count("set_onboarding_step"), 1);
        assert_eq!(fake.state.lock().unwrap().onboarding_step, None);
    }

    #[tokio::test]
    async fn test_back_skips_validation() {
        let (_fake, mut wizard) = wizard_at(2);
        wizard.mount().await.unwrap();
        assert!(wizard.draft().native_languages.is_empty());
        assert_eq!(wizard.back(), WizardPhase::Active(1));
        assert_eq!(wizard.back(), WizardPhase::Active(0));
        assert_eq!(wizard.back(), WizardPhase::Active(0));
    }

    #[tokio::test]
    async fn test_revisiting_earlier_step_keeps_checkpoint() {
        let (fake, mut wizard) = wizard_at(5);
        assert_eq!(wizard.mount().await.unwrap(), WizardPhase::Active(5));
        for _ in 0..5 {
            wizard.back();
        }
        assert_eq!(wizard.phase(), WizardPhase::Active(0));

        assert_eq!(wizard.next().await.unwrap(), WizardPhase::Active(1));
        assert_eq!(fake.state.lock().unwrap().onboarding_step, Some(5));
        assert_eq!(wizard.user().map(|u| u.onboarding_step), Some(5));
    }

    #[tokio::test]
    async fn test_full_run_persists_every_step() {
        let (fake, mut wizard) = wizard_at(0);
        wizard.mount().await.unwrap();

        wizard.next().await.unwrap();
        wizard.draft_mut().city = "Lyon".to_string();
        wizard.draft_mut().country = "France".to_string();
        wizard.next().await.unwrap();
        wizard.draft_mut().native_languages = vec![LanguageSkill::new("French")];
        wizard.draft_mut().target_languages = vec![LanguageSkill::new("Japanese")];
        wizard.next().await.unwrap();
        wizard.draft_mut().bio = "Cook, climber, anime fan.".to_string();
        wizard.next().await.unwrap();
        wizard.draft_mut().interests = vec!["cooking".to_string()];
        wizard.next().await.unwrap();
        wizard.draft_mut().photo = Some(crate::api::ImageUpload::new("me.png", vec![1, 2, 3]));
        assert_eq!(wizard.next().await.unwrap(), WizardPhase::Completed);

        let state = fake.state.lock().unwrap();
        assert_eq!(state.onboarding_step, Some(TOTAL_STEPS as u8));
        assert_eq!(state.me.city.as_deref(), Some("Lyon"));
        assert_eq!(state.me.target_languages[0].language, "Japanese");
        assert_eq!(
            state.me.profile_image.as_deref(),
            Some("http://cdn.test/uploads/me.png")
        );
        drop(state);

        let local = wizard.user().unwrap();
        assert_eq!(local.bio.as_deref(), Some("Cook, climber, anime fan."));
        assert_eq!(local.onboarding_step, TOTAL_STEPS as u8);
    }
}
