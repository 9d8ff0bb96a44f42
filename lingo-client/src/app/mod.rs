//! Application state container.
//!
//! State changes only through [`Store::dispatch`], which runs the pure
//! [`reduce`]. Components receive the store explicitly and read it through
//! the selectors.

mod state;

pub use state::{
    current_user, display_name, is_authenticated, needs_onboarding, profile_image, reduce,
    route, Action, AppState, Route, SessionState,
};

use lingo_types::User;

use crate::auth::AuthStatus;
use crate::log_debug;
use crate::logging::LogConfig;

pub struct Store {
    state: AppState,
    version: u64,
    log_config: LogConfig,
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    pub fn with_state(state: AppState) -> Self {
        Self {
            state,
            version: 0,
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bumped on every dispatch that changed the state
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn dispatch(&mut self, action: Action) {
        log_debug!(self.log_config, "dispatch {:?}", action);
        let next = reduce(&self.state, action);
        if next != self.state {
            self.state = next;
            self.version += 1;
        }
    }

    /// Records the outcome of [`crate::auth::AuthGate::resolve`]
    pub fn apply_auth(&mut self, status: AuthStatus) {
        match status {
            AuthStatus::Authenticated(user) => self.dispatch(Action::SignedIn(user)),
            AuthStatus::AuthRequired => self.dispatch(Action::SignedOut),
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        current_user(&self.state)
    }

    pub fn is_authenticated(&self) -> bool {
        is_authenticated(&self.state)
    }

    pub fn route(&self) -> Route {
        route(&self.state)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
