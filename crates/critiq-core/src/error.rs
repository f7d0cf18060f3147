//! Error types for the client core.

use std::fmt;

use critiq_host::HostError;

/// Errors from typed store writes.
#[derive(Clone, Debug, PartialEq)]
pub enum StorageError {
    /// The host store rejected the operation
    Host(HostError),
    /// The value could not be serialized
    Encode(String),
}

/// Errors from session operations other than logout.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionError {
    /// Identity without a username handle
    InvalidIdentity,
    /// Token key outside the configured auth key set
    UnknownAuthKey(String),
    /// Storage error
    Storage(StorageError),
}

/// A consistency pass step failed.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsistencyError {
    /// The publication collection could not be written
    Storage(StorageError),
    /// The page tree rejected a query or mutation
    Page(HostError),
}

/// Errors from configuration overrides.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Override is not valid JSON for the config shape
    Parse(String),
    /// Route does not start with `/`
    InvalidRoute(String),
    /// A required key name is empty
    EmptyKey(&'static str),
    /// Services were already built with another configuration
    AlreadyInitialized,
}

/// Local cleanup step of the logout sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupStep {
    RemoveDurableKey(String),
    ClearEphemeralStore,
    DispatchNavigation,
}

/// One failed local cleanup step.
#[derive(Clone, Debug, PartialEq)]
pub struct CleanupFailure {
    pub step: CleanupStep,
    pub error: HostError,
}

/// Local cleanup failed during logout.
///
/// Every step was still attempted; `failures` lists the ones that did not
/// complete.
#[derive(Clone, Debug, PartialEq)]
pub struct LogoutError {
    pub failures: Vec<CleanupFailure>,
}

impl From<HostError> for StorageError {
    fn from(e: HostError) -> Self {
        StorageError::Host(e)
    }
}

impl From<StorageError> for SessionError {
    fn from(e: StorageError) -> Self {
        SessionError::Storage(e)
    }
}

impl From<StorageError> for ConsistencyError {
    fn from(e: StorageError) -> Self {
        ConsistencyError::Storage(e)
    }
}

impl From<HostError> for ConsistencyError {
    fn from(e: HostError) -> Self {
        ConsistencyError::Page(e)
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Host(e) => write!(f, "{}", e),
            StorageError::Encode(e) => write!(f, "encode failed: {}", e),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidIdentity => write!(f, "identity has no username handle"),
            SessionError::UnknownAuthKey(key) => write!(f, "unknown auth key: {}", key),
            SessionError::Storage(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyError::Storage(e) => write!(f, "publication store: {}", e),
            ConsistencyError::Page(e) => write!(f, "page tree: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "invalid config: {}", e),
            ConfigError::InvalidRoute(r) => write!(f, "route must start with '/': {}", r),
            ConfigError::EmptyKey(which) => write!(f, "empty {} key", which),
            ConfigError::AlreadyInitialized => write!(f, "services already initialized"),
        }
    }
}

impl fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupStep::RemoveDurableKey(key) => write!(f, "remove durable key {}", key),
            CleanupStep::ClearEphemeralStore => write!(f, "clear ephemeral store"),
            CleanupStep::DispatchNavigation => write!(f, "dispatch navigation"),
        }
    }
}

impl fmt::Display for LogoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "logout cleanup failed:")?;
        for failure in &self.failures {
            write!(f, " [{}: {}]", failure.step, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {}
impl std::error::Error for SessionError {}
impl std::error::Error for ConsistencyError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for LogoutError {}
