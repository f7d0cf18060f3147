//! Critiq client core
//!
//! Session and publication-state synchronization for the Critiq review
//! client. The rendered UI (headers, cards, settings panels, login forms)
//! lives outside this crate and calls in at two points: page mount and the
//! logout control.
//!
//! - **SessionService**: login state, login bookkeeping, coordinated logout
//! - **PublicationConsistencyService**: per-identity filtering of cached
//!   publications, duplicate page suppression, verification artifact cleanup
//! - **SyncBootstrap**: inert lifecycle hook
//!
//! # Stores
//!
//! ```text
//! durable   (localStorage)    currentUser, isAuthenticated, auth tokens   writer: SessionService
//! ephemeral (sessionStorage)  publications                                writer: PublicationConsistencyService
//! ```
//!
//! # Invariants
//!
//! - After a consistency pass the publication collection holds only records
//!   of the resident Identity (none if no Identity).
//! - After a consistency pass at most one live root carries a given
//!   PageMountMarker, the first in document order.
//! - A logout that returns `Ok` leaves no auth key in the durable store and
//!   an empty ephemeral store.
//!
//! Everything is generic over [`critiq_host::Host`], so the services run the
//! same against the browser and against the mock host in tests.

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod error;
pub mod publications;
pub mod session;
pub mod storage;
pub mod types;

use std::rc::Rc;

use critiq_host::{AuthProvider, Host};

pub use bootstrap::SyncBootstrap;
pub use config::CoreConfig;
pub use error::{
    CleanupFailure, CleanupStep, ConfigError, ConsistencyError, LogoutError, SessionError,
    StorageError,
};
pub use publications::PublicationConsistencyService;
pub use session::{LogoutOutcome, RemoteLogout, SessionService};
pub use storage::StoreRead;
pub use types::{Identity, PublicationRecord};

/// The process-wide service set
///
/// Built once and shared; the publication service reads identity through the
/// same session service instance.
pub struct CoreServices<H: Host> {
    pub session: Rc<SessionService<H>>,
    pub publications: Rc<PublicationConsistencyService<H>>,
    pub sync: SyncBootstrap<H>,
}

impl<H: Host> CoreServices<H> {
    pub fn new(host: Rc<H>, auth: Rc<dyn AuthProvider>, config: CoreConfig) -> Self {
        let session = Rc::new(SessionService::new(Rc::clone(&host), auth, Rc::new(config)));
        let publications = Rc::new(PublicationConsistencyService::new(Rc::clone(&session)));
        Self {
            session,
            publications,
            sync: SyncBootstrap::new(host),
        }
    }
}
