//! Session Service
//!
//! Owns the authentication lifecycle of the single-user client:
//!
//! - login-state queries against the durable store
//! - login bookkeeping (sole writer of the durable auth keys)
//! - coordinated logout: remote first, then local cleanup, then navigation
//!
//! # Logout sequence
//!
//! ```text
//! perform_logout
//!   1. AuthProvider::logout_user   (best effort, failure recorded only)
//!   2. remove every durable auth key (each key attempted)
//!   3. clear the ephemeral store
//!   4. NavigationIntent(login route) ──► router
//!      schedule(grace) ──► location != login route ? hard_navigate
//! ```
//!
//! Only steps 2-4 can make the call fail.

use std::rc::Rc;

use critiq_host::{AuthProvider, Host, HostError, LogLevel, NavigationIntent, StoreKind};

use crate::config::CoreConfig;
use crate::constants::AUTH_FLAG_TRUE;
use crate::error::{CleanupFailure, CleanupStep, LogoutError, SessionError};
use crate::storage::{self, StoreRead};
use crate::types::Identity;

/// Outcome of the remote half of a logout
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteLogout {
    /// Provider confirmed the remote session is over
    Confirmed,
    /// Provider answered `success: false`
    Rejected(Option<String>),
    /// Provider failed
    Failed(String),
    /// Provider not loaded
    Unavailable,
}

impl RemoteLogout {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, RemoteLogout::Confirmed)
    }
}

/// Result of a logout whose local cleanup completed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub remote: RemoteLogout,
}

/// Session Service
///
/// One instance per process. Shared through `Rc`; the click handlers bound by
/// [`SessionService::setup_logout_button`] hold a reference for as long as the
/// control lives.
pub struct SessionService<H: Host> {
    host: Rc<H>,
    auth: Rc<dyn AuthProvider>,
    config: Rc<CoreConfig>,
}

impl<H: Host> SessionService<H> {
    pub fn new(host: Rc<H>, auth: Rc<dyn AuthProvider>, config: Rc<CoreConfig>) -> Self {
        Self { host, auth, config }
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    fn log(&self, level: LogLevel, msg: &str) {
        self.host.log(level, msg);
    }

    // =========================================================================
    // Login state
    // =========================================================================

    /// True if the AuthenticationFlag is `"true"` or an Identity is present.
    ///
    /// A stale Identity with a false flag still counts as logged in.
    pub fn is_authenticated(&self) -> bool {
        let flag = match storage::read_raw(&*self.host, StoreKind::Durable, &self.config.auth_flag_key) {
            StoreRead::Found(value) => value == AUTH_FLAG_TRUE,
            StoreRead::Absent => false,
            StoreRead::Recovered(reason) => {
                self.log(LogLevel::Warn, &format!("[session] {}", reason));
                false
            }
        };
        flag || self.identity_present()
    }

    fn identity_present(&self) -> bool {
        match storage::read_raw(&*self.host, StoreKind::Durable, &self.config.identity_key) {
            StoreRead::Found(raw) => !raw.is_empty() && raw != "null",
            StoreRead::Absent => false,
            StoreRead::Recovered(reason) => {
                self.log(LogLevel::Warn, &format!("[session] {}", reason));
                false
            }
        }
    }

    /// The resident Identity, or `None` if absent or malformed
    pub fn get_current_user(&self) -> Option<Identity> {
        match storage::read_json(&*self.host, StoreKind::Durable, &self.config.identity_key) {
            StoreRead::Found(identity) => Some(identity),
            StoreRead::Absent => None,
            StoreRead::Recovered(reason) => {
                self.log(LogLevel::Warn, &format!("[session] {}", reason));
                None
            }
        }
    }

    /// Persist a freshly verified login.
    ///
    /// `tokens` are `(key, value)` pairs; every key must be one of the
    /// configured auxiliary auth keys. Nothing is written if validation fails.
    /// The flag is written last so it is never true without an Identity.
    pub fn record_login(&self, identity: &Identity, tokens: &[(&str, &str)]) -> Result<(), SessionError> {
        if identity.username_handle.is_empty() {
            return Err(SessionError::InvalidIdentity);
        }
        if let Some((key, _)) = tokens.iter().find(|(k, _)| !self.config.is_auxiliary_auth_key(k)) {
            return Err(SessionError::UnknownAuthKey(String::from(*key)));
        }

        storage::write_json(&*self.host, StoreKind::Durable, &self.config.identity_key, identity)?;
        for (key, value) in tokens {
            self.host
                .store_set(StoreKind::Durable, key, value)
                .map_err(|e| SessionError::Storage(e.into()))?;
        }
        self.host
            .store_set(StoreKind::Durable, &self.config.auth_flag_key, AUTH_FLAG_TRUE)
            .map_err(|e| SessionError::Storage(e.into()))?;

        self.log(
            LogLevel::Info,
            &format!("[session] logged in as {}", identity.username_handle),
        );
        Ok(())
    }

    /// Route guard for protected pages.
    ///
    /// Sends the user to the login route and returns false when no session is
    /// live.
    pub fn require_authenticated(&self) -> bool {
        if self.is_authenticated() {
            return true;
        }
        self.log(LogLevel::Info, "[session] not authenticated, redirecting to login");
        if let Err(e) = self
            .host
            .dispatch_navigation(&NavigationIntent::new(&self.config.login_route))
        {
            self.log(LogLevel::Warn, &format!("[session] navigation intent failed: {}", e));
        }
        false
    }

    // =========================================================================
    // Logout
    // =========================================================================

    /// Run the full logout sequence.
    ///
    /// Returns `Err` only when a local cleanup step failed; a failed or
    /// missing remote provider is reported in [`LogoutOutcome::remote`].
    pub async fn perform_logout(&self) -> Result<LogoutOutcome, LogoutError> {
        self.log(LogLevel::Info, "[session] logout started");

        let remote = self.remote_logout().await;

        let mut failures = Vec::new();
        self.clear_durable_keys(&mut failures);
        if let Err(e) = self.host.store_clear(StoreKind::Ephemeral) {
            self.log(LogLevel::Error, &format!("[session] clearing ephemeral store failed: {}", e));
            failures.push(CleanupFailure {
                step: CleanupStep::ClearEphemeralStore,
                error: e,
            });
        }
        if let Err(e) = self.navigate_to_login() {
            self.log(LogLevel::Error, &format!("[session] navigation intent failed: {}", e));
            failures.push(CleanupFailure {
                step: CleanupStep::DispatchNavigation,
                error: e,
            });
        }

        if failures.is_empty() {
            self.log(LogLevel::Info, "[session] logout complete");
            Ok(LogoutOutcome { remote })
        } else {
            let err = LogoutError { failures };
            self.log(LogLevel::Error, &format!("[session] {}", err));
            Err(err)
        }
    }

    async fn remote_logout(&self) -> RemoteLogout {
        match self.auth.logout_user().await {
            Ok(response) if response.success => RemoteLogout::Confirmed,
            Ok(response) => {
                self.log(
                    LogLevel::Warn,
                    &format!(
                        "[session] remote logout rejected: {}",
                        response.message.as_deref().unwrap_or("no reason given")
                    ),
                );
                RemoteLogout::Rejected(response.message)
            }
            Err(HostError::ProviderUnavailable) => {
                self.log(LogLevel::Warn, "[session] auth provider unavailable, skipping remote logout");
                RemoteLogout::Unavailable
            }
            Err(e) => {
                self.log(LogLevel::Warn, &format!("[session] remote logout failed: {}", e));
                RemoteLogout::Failed(e.to_string())
            }
        }
    }

    fn clear_durable_keys(&self, failures: &mut Vec<CleanupFailure>) {
        for key in self.config.durable_auth_keys() {
            if let Err(e) = self.host.store_remove(StoreKind::Durable, key) {
                self.log(
                    LogLevel::Error,
                    &format!("[session] removing durable key '{}' failed: {}", key, e),
                );
                failures.push(CleanupFailure {
                    step: CleanupStep::RemoveDurableKey(String::from(key)),
                    error: e,
                });
            }
        }
    }

    /// Send the intent, then schedule the check-and-correct fallback.
    ///
    /// The fallback is scheduled even if dispatch failed.
    fn navigate_to_login(&self) -> Result<(), HostError> {
        let route = self.config.login_route.clone();
        let dispatched = self.host.dispatch_navigation(&NavigationIntent::new(&route));

        let host = Rc::clone(&self.host);
        self.host.schedule(
            self.config.navigation_grace_ms,
            Box::new(move || {
                if host.location_path() == route {
                    return;
                }
                host.log(
                    LogLevel::Warn,
                    &format!("[session] router did not reach {}, forcing redirect", route),
                );
                if let Err(e) = host.hard_navigate(&route) {
                    host.log(LogLevel::Error, &format!("[session] hard redirect failed: {}", e));
                }
            }),
        );

        dispatched
    }

    /// Bind the logout flow to a control inside `component`.
    ///
    /// Returns false (after logging a warning) if the control is not found.
    /// On click: confirm, then logout; a failed logout raises an alert.
    pub fn setup_logout_button(service: &Rc<Self>, selector: &str, component: &H::Node) -> bool {
        let control = match service.host.query_in_component(component, selector) {
            Ok(Some(control)) => control,
            Ok(None) => {
                service.log(
                    LogLevel::Warn,
                    &format!("[session] logout control '{}' not found", selector),
                );
                return false;
            }
            Err(e) => {
                service.log(
                    LogLevel::Warn,
                    &format!("[session] logout control '{}' lookup failed: {}", selector, e),
                );
                return false;
            }
        };

        let handler_service = Rc::clone(service);
        let handler = Box::new(move || {
            let svc = &handler_service;
            if !svc.host.confirm(&svc.config.logout_confirm_message) {
                svc.log(LogLevel::Debug, "[session] logout cancelled");
                return;
            }
            let task_service = Rc::clone(svc);
            svc.host.spawn_local(Box::pin(async move {
                if task_service.perform_logout().await.is_err() {
                    task_service
                        .host
                        .alert(&task_service.config.logout_failed_message);
                }
            }));
        });

        match service.host.bind_click(&control, handler) {
            Ok(()) => true,
            Err(e) => {
                service.log(
                    LogLevel::Warn,
                    &format!("[session] binding logout control '{}' failed: {}", selector, e),
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use critiq_host_mock::{MockAuth, MockAuthBehavior, MockHost};

    fn service(host: &Rc<MockHost>) -> SessionService<MockHost> {
        SessionService::new(
            Rc::clone(host),
            Rc::new(MockAuth::default()),
            Rc::new(CoreConfig::default()),
        )
    }

    #[test]
    fn test_flag_alone_is_authenticated() {
        let host = Rc::new(MockHost::new());
        host.seed(StoreKind::Durable, "isAuthenticated", "true");
        assert!(service(&host).is_authenticated());
    }

    #[test]
    fn test_stale_identity_counts_as_authenticated() {
        let host = Rc::new(MockHost::new());
        host.seed(StoreKind::Durable, "isAuthenticated", "false");
        host.seed(StoreKind::Durable, "currentUser", r#"{"usernameHandle":"ana"}"#);
        assert!(service(&host).is_authenticated());
    }

    #[test]
    fn test_unreadable_store_is_not_authenticated() {
        let host = Rc::new(MockHost::new());
        host.seed(StoreKind::Durable, "isAuthenticated", "true");
        host.set_store_unavailable(StoreKind::Durable, true);
        assert!(!service(&host).is_authenticated());
        assert!(host.has_log_containing("durable read of 'isAuthenticated' failed"));
    }

    #[test]
    fn test_malformed_identity_is_none() {
        let host = Rc::new(MockHost::new());
        host.seed(StoreKind::Durable, "currentUser", "{broken");
        assert_eq!(service(&host).get_current_user(), None);
        assert!(host.has_log_containing("malformed"));
    }

    #[test]
    fn test_record_login_validates_before_writing() {
        let host = Rc::new(MockHost::new());
        let svc = service(&host);

        assert_eq!(
            svc.record_login(&Identity::new(""), &[]),
            Err(SessionError::InvalidIdentity)
        );
        assert_eq!(
            svc.record_login(&Identity::new("ana"), &[("sessionId", "x")]),
            Err(SessionError::UnknownAuthKey(String::from("sessionId")))
        );
        assert_eq!(host.store_len(StoreKind::Durable), 0);

        svc.record_login(&Identity::new("ana"), &[("authToken", "t-1")]).unwrap();
        assert_eq!(host.peek(StoreKind::Durable, "isAuthenticated").as_deref(), Some("true"));
        assert_eq!(host.peek(StoreKind::Durable, "authToken").as_deref(), Some("t-1"));
        assert_eq!(svc.get_current_user().unwrap().username_handle, "ana");
    }

    #[test]
    fn test_require_authenticated_redirects() {
        let host = Rc::new(MockHost::at("/settings"));
        let svc = service(&host);
        assert!(!svc.require_authenticated());
        assert_eq!(host.intents(), vec![NavigationIntent::new("/login")]);
    }

    #[tokio::test]
    async fn test_rejected_remote_logout_is_reported() {
        let host = Rc::new(MockHost::new());
        let svc = SessionService::new(
            Rc::clone(&host),
            Rc::new(MockAuth::new(MockAuthBehavior::Reject(Some(String::from("expired"))))),
            Rc::new(CoreConfig::default()),
        );
        let outcome = svc.perform_logout().await.unwrap();
        assert_eq!(outcome.remote, RemoteLogout::Rejected(Some(String::from("expired"))));
        assert!(host.has_log_containing("remote logout rejected: expired"));
    }
}
