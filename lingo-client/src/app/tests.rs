use super::*;
use lingo_types::UserPatch;

fn ana(step: u8) -> User {
    User {
        id: "u1".to_string(),
        name: "Ana".to_string(),
        onboarding_step: step,
        ..Default::default()
    }
}

#[test]
fn test_initial_state_routes_to_sign_in() {
    let store = Store::new();
    assert_eq!(store.state().session, SessionState::Unknown);
    assert_eq!(store.route(), Route::SignIn);
    assert!(!store.is_authenticated());
}

#[test]
fn test_sign_in_routes_by_onboarding_progress() {
    let mut store = Store::new();
    store.apply_auth(AuthStatus::Authenticated(ana(2)));
    assert!(store.is_authenticated());
    assert_eq!(store.route(), Route::Onboarding);

    store.dispatch(Action::OnboardingAdvanced(6));
    assert_eq!(store.route(), Route::Discover);
    assert_eq!(display_name(store.state()), Some("Ana"));
}

#[test]
fn test_onboarding_progress_never_moves_backwards() {
    let state = reduce(&AppState::default(), Action::SignedIn(ana(4)));
    let state = reduce(&state, Action::OnboardingAdvanced(2));
    assert_eq!(current_user(&state).unwrap().onboarding_step, 4);
}

#[test]
fn test_sign_out_clears_user() {
    let mut store = Store::new();
    store.apply_auth(AuthStatus::Authenticated(ana(6)));
    store.apply_auth(AuthStatus::AuthRequired);
    assert_eq!(store.state().session, SessionState::SignedOut);
    assert!(store.current_user().is_none());

    // Late refresh after sign-out is dropped
    store.dispatch(Action::UserRefreshed(ana(6)));
    assert!(store.current_user().is_none());
}

#[test]
fn test_patch_and_image_change() {
    let mut store = Store::new();
    store.dispatch(Action::SignedIn(ana(6)));

    let mut edited = ana(6);
    edited.bio = Some("Hola".to_string());
    store.dispatch(Action::UserPatched(UserPatch::from_user(&edited)));
    assert_eq!(store.current_user().unwrap().bio.as_deref(), Some("Hola"));

    store.dispatch(Action::ProfileImageChanged(Some("http://cdn/me.png".to_string())));
    assert_eq!(profile_image(store.state()), Some("http://cdn/me.png"));
}

#[test]
fn test_version_only_moves_on_change() {
    let mut store = Store::new();
    store.dispatch(Action::ClearError);
    assert_eq!(store.version(), 0);
    store.dispatch(Action::LoadStarted);
    assert_eq!(store.version(), 1);
    store.dispatch(Action::LoadFailed("offline".to_string()));
    assert_eq!(store.state().error.as_deref(), Some("offline"));
    assert!(!store.state().loading);
    assert_eq!(store.version(), 2);
}
