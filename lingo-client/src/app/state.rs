use lingo_types::{User, UserPatch};

use crate::wizard::TOTAL_STEPS;

/// Whether we know who is signed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Token not checked yet
    Unknown,
    SignedOut,
    SignedIn,
}

/// Which page the front end should be showing for the signed-in user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignIn,
    Onboarding,
    Discover,
}

/// Global application state: who is signed in, and their profile
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub session: SessionState,
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            session: SessionState::Unknown,
            user: None,
            loading: false,
            error: None,
        }
    }
}

/// Everything that can change [`AppState`]
#[derive(Debug, Clone)]
pub enum Action {
    LoadStarted,
    SignedIn(User),
    SignedOut,
    LoadFailed(String),
    /// Fresh copy of the signed-in user from the server
    UserRefreshed(User),
    /// Partial server echo after a profile write
    UserPatched(UserPatch),
    OnboardingAdvanced(u8),
    ProfileImageChanged(Option<String>),
    ClearError,
}

/// Pure state transition
pub fn reduce(state: &AppState, action: Action) -> AppState {
    let mut next = state.clone();
    match action {
        Action::LoadStarted => {
            next.loading = true;
            next.error = None;
        }
        Action::SignedIn(user) => {
            next.session = SessionState::SignedIn;
            next.user = Some(user);
            next.loading = false;
            next.error = None;
        }
        Action::SignedOut => {
            next = AppState {
                session: SessionState::SignedOut,
                ..AppState::default()
            };
        }
        Action::LoadFailed(message) => {
            next.loading = false;
            next.error = Some(message);
        }
        Action::UserRefreshed(user) => {
            // A late response must not resurrect a signed-out session
            if next.session == SessionState::SignedIn {
                next.user = Some(user);
            }
            next.loading = false;
        }
        Action::UserPatched(patch) => {
            if let Some(user) = next.user.as_mut() {
                patch.apply(user);
            }
        }
        Action::OnboardingAdvanced(step) => {
            if let Some(user) = next.user.as_mut() {
                user.onboarding_step = user.onboarding_step.max(step);
            }
        }
        Action::ProfileImageChanged(url) => {
            if let Some(user) = next.user.as_mut() {
                user.profile_image = url;
            }
        }
        Action::ClearError => next.error = None,
    }
    next
}

// Selectors

pub fn current_user(state: &AppState) -> Option<&User> {
    state.user.as_ref()
}

pub fn is_authenticated(state: &AppState) -> bool {
    state.session == SessionState::SignedIn && state.user.is_some()
}

pub fn needs_onboarding(state: &AppState) -> bool {
    current_user(state).is_some_and(|u| (u.onboarding_step as usize) < TOTAL_STEPS)
}

pub fn display_name(state: &AppState) -> Option<&str> {
    current_user(state).map(|u| u.name.as_str()).filter(|n| !n.is_empty())
}

pub fn profile_image(state: &AppState) -> Option<&str> {
    current_user(state).and_then(|u| u.profile_image.as_deref())
}

pub fn route(state: &AppState) -> Route {
    if !is_authenticated(state) {
        Route::SignIn
    } else if needs_onboarding(state) {
        Route::Onboarding
    } else {
        Route::Discover
    }
}
