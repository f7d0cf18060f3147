//! Logout Integration Tests
//!
//! These tests verify the full logout workflow against the mock host:
//! - Local cleanup regardless of the remote provider's outcome
//! - Navigation intent and the fallback redirect
//! - Cleanup failures surfacing as errors
//! - The confirm-then-logout control binding

use std::rc::Rc;

use critiq_core::{
    CleanupStep, CoreConfig, CoreServices, Identity, PublicationRecord, RemoteLogout,
    SessionService,
};
use critiq_host::{NavigationIntent, StoreKind};
use critiq_host_mock::{MockAuth, MockAuthBehavior, MockHost};

fn logged_in(path: &str, behavior: MockAuthBehavior) -> (Rc<MockHost>, Rc<MockAuth>, CoreServices<MockHost>) {
    let host = Rc::new(MockHost::at(path));
    let auth = Rc::new(MockAuth::new(behavior));
    let services = CoreServices::new(Rc::clone(&host), auth.clone(), CoreConfig::default());

    services
        .session
        .record_login(
            &Identity::new("ana"),
            &[("authToken", "tok"), ("refreshToken", "ref")],
        )
        .unwrap();
    services
        .publications
        .record_publication(PublicationRecord::new("ana"))
        .unwrap();
    host.seed(StoreKind::Ephemeral, "draft", "{}");
    (host, auth, services)
}

fn assert_logged_out(host: &MockHost, services: &CoreServices<MockHost>) {
    assert!(!services.session.is_authenticated());
    assert_eq!(services.session.get_current_user(), None);
    for key in ["currentUser", "isAuthenticated", "authToken", "refreshToken", "userSession", "firebaseUid"] {
        assert_eq!(host.peek(StoreKind::Durable, key), None, "{} survived logout", key);
    }
    assert_eq!(host.store_len(StoreKind::Ephemeral), 0);
}

// =============================================================================
// Logout Totality
// =============================================================================

#[tokio::test]
async fn test_logout_clears_everything_on_confirmed_remote() {
    let (host, auth, services) = logged_in("/profile", MockAuthBehavior::Succeed);

    let outcome = services.session.perform_logout().await.unwrap();

    assert_eq!(outcome.remote, RemoteLogout::Confirmed);
    assert_eq!(auth.calls(), 1);
    assert_logged_out(&host, &services);
}

#[tokio::test]
async fn test_logout_when_remote_provider_throws() {
    let (host, _auth, services) = logged_in("/profile", MockAuthBehavior::Fail(String::from("network down")));

    let outcome = services.session.perform_logout().await;

    assert!(outcome.is_ok());
    assert_eq!(
        outcome.unwrap().remote,
        RemoteLogout::Failed(String::from("authentication provider error: network down"))
    );
    assert_logged_out(&host, &services);
    assert_eq!(host.intents(), vec![NavigationIntent::new("/login")]);
    assert!(host.has_log_containing("remote logout failed"));
}

#[tokio::test]
async fn test_logout_when_remote_provider_missing() {
    let (host, _auth, services) = logged_in("/profile", MockAuthBehavior::Unavailable);

    let outcome = services.session.perform_logout().await.unwrap();

    assert_eq!(outcome.remote, RemoteLogout::Unavailable);
    assert_logged_out(&host, &services);
}

#[tokio::test]
async fn test_logout_leaves_unrelated_durable_keys() {
    let (host, _auth, services) = logged_in("/profile", MockAuthBehavior::Succeed);
    host.seed(StoreKind::Durable, "theme", "dark");

    services.session.perform_logout().await.unwrap();

    assert_eq!(host.peek(StoreKind::Durable, "theme").as_deref(), Some("dark"));
}

// =============================================================================
// Navigation
// =============================================================================

#[tokio::test]
async fn test_fallback_redirect_when_router_does_not_act() {
    let (host, _auth, services) = logged_in("/profile", MockAuthBehavior::Succeed);

    services.session.perform_logout().await.unwrap();

    assert_eq!(host.timer_delays(), vec![300]);
    assert!(host.hard_navigations().is_empty());
    host.run_timers();
    assert_eq!(host.hard_navigations(), vec![String::from("/login")]);
    assert_eq!(host.location(), "/login");
}

#[tokio::test]
async fn test_fallback_is_noop_when_router_acted() {
    let (host, _auth, services) = logged_in("/profile", MockAuthBehavior::Succeed);
    host.set_router_follows(true);

    services.session.perform_logout().await.unwrap();
    host.run_timers();

    assert_eq!(host.location(), "/login");
    assert!(host.hard_navigations().is_empty());
}

#[tokio::test]
async fn test_failed_dispatch_still_redirects_and_reports() {
    let (host, _auth, services) = logged_in("/profile", MockAuthBehavior::Succeed);
    host.set_fail_dispatch(true);

    let err = services.session.perform_logout().await.unwrap_err();

    assert_eq!(err.failures.len(), 1);
    assert_eq!(err.failures[0].step, CleanupStep::DispatchNavigation);
    assert_logged_out(&host, &services);
    host.run_timers();
    assert_eq!(host.location(), "/login");
}

// =============================================================================
// Local Cleanup Failures
// =============================================================================

#[tokio::test]
async fn test_failed_key_removal_does_not_stop_other_steps() {
    let (host, _auth, services) = logged_in("/profile", MockAuthBehavior::Succeed);
    host.fail_removal_of(StoreKind::Durable, "authToken");

    let err = services.session.perform_logout().await.unwrap_err();

    assert_eq!(
        err.failures.iter().map(|f| f.step.clone()).collect::<Vec<_>>(),
        vec![CleanupStep::RemoveDurableKey(String::from("authToken"))]
    );
    assert_eq!(host.peek(StoreKind::Durable, "currentUser"), None);
    assert_eq!(host.peek(StoreKind::Durable, "refreshToken"), None);
    assert_eq!(host.store_len(StoreKind::Ephemeral), 0);
    assert_eq!(host.intents().len(), 1);
}

#[tokio::test]
async fn test_failed_ephemeral_clear_is_an_error() {
    let (host, _auth, services) = logged_in("/profile", MockAuthBehavior::Succeed);
    host.reject_clear(StoreKind::Ephemeral);

    let err = services.session.perform_logout().await.unwrap_err();

    assert_eq!(err.failures[0].step, CleanupStep::ClearEphemeralStore);
    assert!(!services.session.is_authenticated());
}

// =============================================================================
// Logout Control
// =============================================================================

#[tokio::test]
async fn test_logout_control_confirmed() {
    let (host, _auth, services) = logged_in("/settings", MockAuthBehavior::Succeed);
    let panel = host.add_element(&["settings-panel"]);
    let button = host.add_component_child(panel, &["#logout-btn"]);

    assert!(SessionService::setup_logout_button(&services.session, "#logout-btn", &panel));
    assert!(host.click(button));

    assert_eq!(host.confirms(), vec![String::from("Are you sure you want to log out?")]);
    assert_eq!(host.pending_tasks(), 1);
    host.run_tasks().await;

    assert_logged_out(&host, &services);
    assert!(host.alerts().is_empty());
}

#[tokio::test]
async fn test_logout_control_declined() {
    let (host, auth, services) = logged_in("/settings", MockAuthBehavior::Succeed);
    host.set_confirm_answer(false);
    let panel = host.add_element(&["settings-panel"]);
    let button = host.add_component_child(panel, &["#logout-btn"]);

    SessionService::setup_logout_button(&services.session, "#logout-btn", &panel);
    host.click(button);
    host.run_tasks().await;

    assert_eq!(auth.calls(), 0);
    assert!(services.session.is_authenticated());
}

#[tokio::test]
async fn test_logout_control_alerts_on_failure() {
    let (host, _auth, services) = logged_in("/settings", MockAuthBehavior::Succeed);
    host.reject_clear(StoreKind::Ephemeral);
    let panel = host.add_element(&["settings-panel"]);
    let button = host.add_component_child(panel, &["#logout-btn"]);

    SessionService::setup_logout_button(&services.session, "#logout-btn", &panel);
    host.click(button);
    host.run_tasks().await;

    assert_eq!(host.alerts(), vec![String::from("Logout failed. Please try again.")]);
}

#[test]
fn test_missing_logout_control_warns() {
    let host = Rc::new(MockHost::new());
    let services = CoreServices::new(Rc::clone(&host), Rc::new(MockAuth::default()), CoreConfig::default());
    let panel = host.add_element(&["settings-panel"]);
    // Outside the component's root, so not visible to the lookup
    let stray = host.add_element(&["#logout-btn"]);

    assert!(!SessionService::setup_logout_button(&services.session, "#logout-btn", &panel));
    assert!(!host.has_click_handler(stray));
    assert!(host.has_log_containing("logout control '#logout-btn' not found"));
}
