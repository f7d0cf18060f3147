//! Core configuration

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::ConfigError;

/// Configuration shared by the session and publication services
///
/// Every field has a default, so a JSON override only needs the fields it
/// changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreConfig {
    /// Route shown after logout
    pub login_route: String,
    /// Grace window before the fallback redirect, in milliseconds
    pub navigation_grace_ms: u32,
    /// Durable key holding the Identity
    pub identity_key: String,
    /// Durable key holding the AuthenticationFlag
    pub auth_flag_key: String,
    /// Other durable keys cleared at logout
    pub auxiliary_auth_keys: Vec<String>,
    /// Ephemeral key holding the publication collection
    pub publications_key: String,
    /// PageMountMarker attribute name
    pub page_marker_attribute: String,
    /// Selectors of verification artifacts removed from the page
    pub verification_selectors: Vec<String>,
    /// Substrings stripped from text nodes
    pub verification_text_markers: Vec<String>,
    pub logout_confirm_message: String,
    pub logout_failed_message: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            login_route: String::from(constants::LOGIN_ROUTE),
            navigation_grace_ms: constants::NAVIGATION_GRACE_MS,
            identity_key: String::from(constants::IDENTITY_KEY),
            auth_flag_key: String::from(constants::AUTH_FLAG_KEY),
            auxiliary_auth_keys: to_strings(constants::AUXILIARY_AUTH_KEYS),
            publications_key: String::from(constants::PUBLICATIONS_KEY),
            page_marker_attribute: String::from(constants::PAGE_MARKER_ATTRIBUTE),
            verification_selectors: to_strings(constants::VERIFICATION_SELECTORS),
            verification_text_markers: to_strings(constants::VERIFICATION_TEXT_MARKERS),
            logout_confirm_message: String::from(constants::LOGOUT_CONFIRM_MESSAGE),
            logout_failed_message: String::from(constants::LOGOUT_FAILED_MESSAGE),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| String::from(*s)).collect()
}

impl CoreConfig {
    /// Parse a JSON override on top of the defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the services cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.login_route.starts_with('/') {
            return Err(ConfigError::InvalidRoute(self.login_route.clone()));
        }
        if self.identity_key.is_empty() || self.auth_flag_key.is_empty() {
            return Err(ConfigError::EmptyKey("identity/auth flag"));
        }
        if self.publications_key.is_empty() {
            return Err(ConfigError::EmptyKey("publications"));
        }
        if self.page_marker_attribute.is_empty() {
            return Err(ConfigError::EmptyKey("page marker attribute"));
        }
        Ok(())
    }

    /// Every durable key tied to authentication, without duplicates
    pub fn durable_auth_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = vec![self.identity_key.as_str(), self.auth_flag_key.as_str()];
        for key in &self.auxiliary_auth_keys {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
        keys
    }

    /// Whether a token key may be written at login
    pub fn is_auxiliary_auth_key(&self, key: &str) -> bool {
        self.auxiliary_auth_keys.iter().any(|k| k == key)
    }
}
