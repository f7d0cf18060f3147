//! Synchronization bootstrap hook
//!
//! Runs once at load. It does no synchronization work; nothing in the core
//! depends on it having run.

use std::cell::Cell;
use std::rc::Rc;

use critiq_host::{Host, LogLevel};

pub struct SyncBootstrap<H: Host> {
    host: Rc<H>,
    started: Cell<bool>,
}

impl<H: Host> SyncBootstrap<H> {
    pub fn new(host: Rc<H>) -> Self {
        Self {
            host,
            started: Cell::new(false),
        }
    }

    /// Returns true on the first call only
    pub fn start(&self) -> bool {
        if self.started.replace(true) {
            return false;
        }
        self.host.log(LogLevel::Debug, "[sync] bootstrap hook ran");
        true
    }

    pub fn is_started(&self) -> bool {
        self.started.get()
    }
}
