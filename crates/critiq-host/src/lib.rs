//! Host Abstraction Layer for the Critiq client core
//!
//! This crate defines the `Host` trait that lets the session and publication
//! services run against different platforms by abstracting the browser
//! surfaces they touch.
//!
//! # Platform Implementations
//!
//! - **Browser**: `localStorage` / `sessionStorage`, `document`, `CustomEvent`, `setTimeout` (see `critiq-web`)
//! - **Mock**: in-memory stores and a simulated page tree for tests (see `critiq-host-mock`)
//!
//! The external authentication collaborator is abstracted separately by
//! [`AuthProvider`], since it is loaded on demand and may be missing entirely.

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::future::Future;
use core::pin::Pin;

/// A unit of work spawned on the single UI thread.
pub type LocalTask = Pin<Box<dyn Future<Output = ()> + 'static>>;

/// Work run once after a delay.
pub type Deferred = Box<dyn FnOnce() + 'static>;

/// Handler bound to a control's click event.
///
/// The host prevents the default action before invoking it.
pub type ClickHandler = Box<dyn FnMut() + 'static>;

/// Future returned by [`AuthProvider::logout_user`].
pub type AuthFuture = Pin<Box<dyn Future<Output = Result<RemoteLogoutResponse, HostError>> + 'static>>;

/// Which client-side key-value store an operation targets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    /// Persists across sessions until explicitly cleared (`localStorage`)
    Durable,
    /// Scoped to the current session (`sessionStorage`)
    Ephemeral,
}

impl StoreKind {
    /// Short name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            StoreKind::Durable => "durable",
            StoreKind::Ephemeral => "ephemeral",
        }
    }
}

/// Severity of a log line written through [`Host::log`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Message asking the router to show a route.
///
/// On the browser this becomes a bubbling, composed `navigate` event whose
/// detail carries the route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationIntent {
    /// Target route, e.g. `/login`
    pub route: String,
}

impl NavigationIntent {
    pub fn new(route: &str) -> Self {
        Self {
            route: String::from(route),
        }
    }
}

/// Answer of the external authentication collaborator to a logout request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteLogoutResponse {
    /// Whether the remote session was terminated
    pub success: bool,
    /// Optional reason supplied by the provider
    pub message: Option<String>,
}

/// Host Abstraction Layer trait
///
/// Implementations provide platform-specific functionality for:
/// - Durable and ephemeral key-value storage
/// - Querying and mutating the rendered page tree
/// - Navigation (router intents and hard redirects)
/// - Blocking dialogs
/// - Deferred work and local task spawning
/// - Log output
///
/// Everything runs on one thread. Implementations are not required to be
/// `Send` or `Sync`.
///
/// # Associated Types
///
/// - `Node`: Handle to a node of the rendered tree
///   - On the browser: a `web_sys::Node`
///   - On the mock: a numeric node id
pub trait Host: 'static {
    /// Handle to a node in the rendered tree
    type Node: Clone + 'static;

    // === Key-Value Stores ===

    /// Read a raw value
    ///
    /// # Returns
    /// * `Ok(Some(value))` - Key present
    /// * `Ok(None)` - Key absent
    /// * `Err(HostError::StorageUnavailable)` - Store cannot be reached
    fn store_get(&self, store: StoreKind, key: &str) -> Result<Option<String>, HostError>;

    /// Write a raw value, replacing any previous one
    fn store_set(&self, store: StoreKind, key: &str, value: &str) -> Result<(), HostError>;

    /// Remove a key. Removing an absent key succeeds.
    fn store_remove(&self, store: StoreKind, key: &str) -> Result<(), HostError>;

    /// Remove every key of a store
    fn store_clear(&self, store: StoreKind) -> Result<(), HostError>;

    // === Page Tree ===

    /// All elements matching a CSS selector, in document order.
    ///
    /// Open shadow roots are searched too; a shadow host's tree comes before
    /// its light children.
    fn query_all(&self, selector: &str) -> Result<Vec<Self::Node>, HostError>;

    /// First node matching `selector` inside a component's encapsulated root
    fn query_in_component(
        &self,
        component: &Self::Node,
        selector: &str,
    ) -> Result<Option<Self::Node>, HostError>;

    /// Set an attribute on an element node
    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), HostError>;

    /// Detach a node from the tree
    fn remove_node(&self, node: &Self::Node) -> Result<(), HostError>;

    /// All live text nodes of the document body, open shadow roots included, in document order
    fn text_nodes(&self) -> Result<Vec<Self::Node>, HostError>;

    /// Text carried by a node, if any
    fn text_content(&self, node: &Self::Node) -> Option<String>;

    /// Replace the text carried by a node
    fn set_text_content(&self, node: &Self::Node, text: &str) -> Result<(), HostError>;

    /// Bind a click handler to a control
    fn bind_click(&self, node: &Self::Node, handler: ClickHandler) -> Result<(), HostError>;

    // === Navigation ===

    /// Path component of the current location, e.g. `/settings`
    fn location_path(&self) -> String;

    /// Hand a navigation intent to the router
    fn dispatch_navigation(&self, intent: &NavigationIntent) -> Result<(), HostError>;

    /// Force the location to a route, bypassing the router
    fn hard_navigate(&self, route: &str) -> Result<(), HostError>;

    // === Dialogs ===

    /// Blocking yes/no prompt. Returns `false` if the prompt cannot be shown.
    fn confirm(&self, message: &str) -> bool;

    /// Blocking user-visible notice
    fn alert(&self, message: &str);

    // === Scheduling ===

    /// Run `task` once after `delay_ms` milliseconds. Never cancelled.
    fn schedule(&self, delay_ms: u32, task: Deferred);

    /// Run a future to completion on the UI thread
    fn spawn_local(&self, task: LocalTask);

    // === Debug ===

    /// Write a log line to the platform's console
    fn log(&self, level: LogLevel, msg: &str);
}

/// External authentication collaborator
///
/// The browser implementation resolves the provider lazily; a missing
/// provider answers `Err(HostError::ProviderUnavailable)`.
pub trait AuthProvider: 'static {
    /// Terminate the remote session
    fn logout_user(&self) -> AuthFuture;
}

/// Host errors
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostError {
    /// The requested store cannot be reached (disabled, sandboxed, no window)
    StorageUnavailable,
    /// The store rejected an operation
    StorageError(String),
    /// A selector was rejected by the page tree
    InvalidSelector(String),
    /// The node is not attached or not of the required kind
    NodeNotFound,
    /// Any other page tree failure
    DomError(String),
    /// Navigation could not be performed
    NavigationError(String),
    /// The authentication provider is not loaded
    ProviderUnavailable,
    /// The authentication provider failed
    RemoteError(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::StorageUnavailable => write!(f, "storage unavailable"),
            HostError::StorageError(e) => write!(f, "storage error: {}", e),
            HostError::InvalidSelector(s) => write!(f, "invalid selector: {}", s),
            HostError::NodeNotFound => write!(f, "node not found"),
            HostError::DomError(e) => write!(f, "dom error: {}", e),
            HostError::NavigationError(e) => write!(f, "navigation error: {}", e),
            HostError::ProviderUnavailable => write!(f, "authentication provider unavailable"),
            HostError::RemoteError(e) => write!(f, "authentication provider error: {}", e),
        }
    }
}

impl core::error::Error for HostError {}
