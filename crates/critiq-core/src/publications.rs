//! Publication Consistency Service
//!
//! Keeps what a page shows consistent with the resident Identity:
//!
//! - narrows the ephemeral publication collection to the active user
//! - removes duplicate mounts of the same logical page
//! - strips identity-verification leftovers from the rendered tree
//!
//! Duplicate detection is a query over the live tree, not a registry, so it
//! stays correct when external code mutates the tree between passes.

use std::rc::Rc;

use critiq_host::{Host, LogLevel, StoreKind};
use serde_json::Value;

use crate::config::CoreConfig;
use crate::error::{ConsistencyError, StorageError};
use crate::session::SessionService;
use crate::storage::{self, StoreRead};
use crate::types::PublicationRecord;

/// Publication Consistency Service
///
/// One instance per process; reads the active identity through the shared
/// [`SessionService`] and is the sole writer of the publications key.
pub struct PublicationConsistencyService<H: Host> {
    session: Rc<SessionService<H>>,
}

impl<H: Host> PublicationConsistencyService<H> {
    pub fn new(session: Rc<SessionService<H>>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Rc<SessionService<H>> {
        &self.session
    }

    fn host(&self) -> &H {
        self.session.host()
    }

    fn config(&self) -> &CoreConfig {
        self.session.config()
    }

    fn log(&self, level: LogLevel, msg: &str) {
        self.host().log(level, msg);
    }

    // =========================================================================
    // Publication collection
    // =========================================================================

    /// Raw entries of the collection; empty when absent or not an array
    fn stored_entries(&self) -> Vec<Value> {
        match storage::read_json(self.host(), StoreKind::Ephemeral, &self.config().publications_key) {
            StoreRead::Found(entries) => entries,
            StoreRead::Absent => Vec::new(),
            StoreRead::Recovered(reason) => {
                self.log(LogLevel::Warn, &format!("[publications] {}", reason));
                Vec::new()
            }
        }
    }

    /// Snapshot of the well-formed records in the collection.
    ///
    /// Entries without a string `username` are skipped but stay in the store.
    pub fn stored_publications(&self) -> Vec<PublicationRecord> {
        self.stored_entries().into_iter().filter_map(into_record).collect()
    }

    /// Records authored by `username_override`, or by the active identity.
    ///
    /// Order is preserved. Matching is exact: no case folding, no trimming.
    /// An entry whose `username` is missing or not a string matches no one.
    pub fn filter_user_publications(&self, username_override: Option<&str>) -> Vec<PublicationRecord> {
        match self.resolve_handle(username_override) {
            Some(handle) => self
                .stored_entries()
                .into_iter()
                .filter(|entry| is_authored_by(entry, &handle))
                .filter_map(into_record)
                .collect(),
            None => Vec::new(),
        }
    }

    fn resolve_handle(&self, username_override: Option<&str>) -> Option<String> {
        if let Some(handle) = username_override {
            return Some(String::from(handle));
        }
        match self.session.get_current_user() {
            Some(identity) => Some(identity.username_handle),
            None => {
                self.log(LogLevel::Warn, "[publications] no active identity, nothing to show");
                None
            }
        }
    }

    /// Overwrite the collection with the active identity's records.
    ///
    /// Without an active identity the collection becomes empty. Returns the
    /// number of entries dropped, counting ones with no usable author.
    pub fn clean_other_users_publications(&self) -> Result<usize, ConsistencyError> {
        let stored = self.stored_entries();
        let before = stored.len();
        let kept: Vec<Value> = match self.resolve_handle(None) {
            Some(handle) => stored
                .into_iter()
                .filter(|entry| is_authored_by(entry, &handle))
                .collect(),
            None => Vec::new(),
        };
        let dropped = before - kept.len();

        storage::write_json(self.host(), StoreKind::Ephemeral, &self.config().publications_key, &kept)?;

        if dropped > 0 {
            self.log(
                LogLevel::Info,
                &format!("[publications] dropped {} entries not authored by the active user", dropped),
            );
        }
        Ok(dropped)
    }

    /// Append a record written by a publishing flow.
    ///
    /// Existing entries are kept as stored, including ones that are not
    /// well-formed records.
    pub fn record_publication(&self, record: PublicationRecord) -> Result<(), ConsistencyError> {
        let entry = serde_json::to_value(&record).map_err(|e| StorageError::Encode(e.to_string()))?;
        let mut entries = self.stored_entries();
        entries.push(entry);
        storage::write_json(self.host(), StoreKind::Ephemeral, &self.config().publications_key, &entries)?;
        Ok(())
    }

    // =========================================================================
    // Page mounts
    // =========================================================================

    /// Keep only the first live mount of the current route.
    ///
    /// Every duplicate removal is attempted; the first failure is returned.
    pub fn prevent_page_duplication(&self) -> Result<usize, ConsistencyError> {
        let route = self.host().location_path();
        let selector = marker_selector(&self.config().page_marker_attribute, &route);
        let mounts = self.host().query_all(&selector)?;
        if mounts.len() <= 1 {
            return Ok(0);
        }

        let mut removed = 0;
        let mut first_error = None;
        for duplicate in mounts.iter().skip(1) {
            match self.host().remove_node(duplicate) {
                Ok(()) => removed += 1,
                Err(e) => {
                    self.log(
                        LogLevel::Warn,
                        &format!("[publications] could not remove duplicate of {}: {}", route, e),
                    );
                    first_error.get_or_insert(e);
                }
            }
        }
        self.log(
            LogLevel::Info,
            &format!("[publications] removed {} duplicate mounts of {}", removed, route),
        );

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(removed),
        }
    }

    /// Mount-time consistency pass for a page-level component.
    ///
    /// Marks the component, removes duplicate mounts, then narrows the
    /// collection. A failing step is logged and the next one still runs.
    pub fn initialize_for_component(&self, component: &H::Node) {
        let route = self.host().location_path();

        if let Err(e) = self
            .host()
            .set_attribute(component, &self.config().page_marker_attribute, &route)
        {
            self.log(
                LogLevel::Warn,
                &format!("[publications] could not mark component for {}: {}", route, e),
            );
        }
        if let Err(e) = self.prevent_page_duplication() {
            self.log(LogLevel::Warn, &format!("[publications] duplicate check failed: {}", e));
        }
        if let Err(e) = self.clean_other_users_publications() {
            self.log(LogLevel::Warn, &format!("[publications] cleanup failed: {}", e));
        }
    }

    // =========================================================================
    // Verification artifacts
    // =========================================================================

    /// Remove verification widgets and strip verification text.
    ///
    /// Cosmetic only. Returns the number of nodes removed or rewritten.
    pub fn clean_firebase_visual_elements(&self) -> usize {
        let mut cleaned = 0;

        for selector in &self.config().verification_selectors {
            let nodes = match self.host().query_all(selector) {
                Ok(nodes) => nodes,
                Err(e) => {
                    self.log(LogLevel::Debug, &format!("[publications] skipping '{}': {}", selector, e));
                    continue;
                }
            };
            for node in nodes {
                match self.host().remove_node(&node) {
                    Ok(()) => cleaned += 1,
                    Err(e) => self.log(LogLevel::Debug, &format!("[publications] {}", e)),
                }
            }
        }

        let text_nodes = match self.host().text_nodes() {
            Ok(nodes) => nodes,
            Err(e) => {
                self.log(LogLevel::Warn, &format!("[publications] text scan failed: {}", e));
                return cleaned;
            }
        };
        for node in text_nodes {
            let Some(text) = self.host().text_content(&node) else {
                continue;
            };
            if let Some(stripped) = strip_markers(&text, &self.config().verification_text_markers) {
                match self.host().set_text_content(&node, &stripped) {
                    Ok(()) => cleaned += 1,
                    Err(e) => self.log(LogLevel::Debug, &format!("[publications] {}", e)),
                }
            }
        }

        cleaned
    }
}

fn is_authored_by(entry: &Value, handle: &str) -> bool {
    entry.get("username").and_then(Value::as_str) == Some(handle)
}

fn into_record(entry: Value) -> Option<PublicationRecord> {
    serde_json::from_value(entry).ok()
}

/// Attribute selector for a PageMountMarker value
pub fn marker_selector(attribute: &str, route: &str) -> String {
    let escaped = route.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[{}=\"{}\"]", attribute, escaped)
}

/// Text with every marker removed, or `None` if no marker occurs.
///
/// Only the space a marker leaves behind is collapsed; the rest of the text
/// keeps its whitespace.
fn strip_markers(text: &str, markers: &[String]) -> Option<String> {
    let mut stripped = String::from(text);
    let mut found = false;
    for marker in markers.iter().filter(|m| !m.is_empty()) {
        while let Some(at) = stripped.find(marker.as_str()) {
            found = true;
            let (mut start, mut end) = (at, at + marker.len());
            let space_before = stripped[..start].ends_with(' ');
            let rest = &stripped[end..];
            let space_after = rest.starts_with(' ');
            let closes_phrase = rest.chars().next().map_or(true, |c| c.is_ascii_punctuation());
            if space_before && (space_after || closes_phrase) {
                start -= 1;
            } else if start == 0 && space_after {
                end += 1;
            }
            stripped.replace_range(start..end, "");
        }
    }
    found.then_some(stripped)
}
