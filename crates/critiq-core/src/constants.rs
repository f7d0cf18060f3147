//! Centralized constants for the client core
//!
//! Store keys, routes and DOM contract names are defined here so the
//! defaults of [`CoreConfig`](crate::config::CoreConfig) can be audited in
//! one place.

// =============================================================================
// Durable Store Keys
// =============================================================================

/// Serialized Identity of the logged-in user
pub const IDENTITY_KEY: &str = "currentUser";

/// AuthenticationFlag, stored as `"true"` / `"false"`
pub const AUTH_FLAG_KEY: &str = "isAuthenticated";

/// Auxiliary auth-adjacent keys removed at logout
pub const AUXILIARY_AUTH_KEYS: &[&str] = &["authToken", "refreshToken", "userSession", "firebaseUid"];

/// Value of the AuthenticationFlag for a live session
pub const AUTH_FLAG_TRUE: &str = "true";

// =============================================================================
// Ephemeral Store Keys
// =============================================================================

/// JSON array of PublicationRecord
pub const PUBLICATIONS_KEY: &str = "publications";

// =============================================================================
// Navigation
// =============================================================================

/// Route shown after logout
pub const LOGIN_ROUTE: &str = "/login";

/// Time the router gets to act on a navigation intent before a hard redirect
pub const NAVIGATION_GRACE_MS: u32 = 300;

/// Name of the navigation intent event
pub const NAVIGATE_EVENT: &str = "navigate";

// =============================================================================
// DOM Contract
// =============================================================================

/// PageMountMarker attribute stamped on page-level components
pub const PAGE_MARKER_ATTRIBUTE: &str = "data-page-route";

/// Nodes left behind by the identity verification widgets
pub const VERIFICATION_SELECTORS: &[&str] = &[
    "#firebase-auth-container",
    ".firebaseui-container",
    ".firebase-emulator-warning",
    ".grecaptcha-badge",
];

/// Substrings stripped from text nodes. Longer markers come first.
pub const VERIFICATION_TEXT_MARKERS: &[&str] = &[
    "Firebase Authentication",
    "Running in emulator mode. Do not use with production credentials.",
    "protected by reCAPTCHA",
    "Firebase",
];

// =============================================================================
// User-Facing Messages
// =============================================================================

pub const LOGOUT_CONFIRM_MESSAGE: &str = "Are you sure you want to log out?";

pub const LOGOUT_FAILED_MESSAGE: &str = "Logout failed. Please try again.";
