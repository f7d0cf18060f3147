//! Typed access to the durable and ephemeral stores
//!
//! Reads never fail: an inaccessible or malformed entry comes back as
//! [`StoreRead::Recovered`] carrying the reason, and callers fold it into
//! "no data" after logging. Writes return [`StorageError`].

use critiq_host::{Host, StoreKind};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// Outcome of a store read
#[derive(Clone, Debug, PartialEq)]
pub enum StoreRead<T> {
    /// Entry present and well formed
    Found(T),
    /// Key not present
    Absent,
    /// Entry unreadable or malformed; treated as absent
    Recovered(String),
}

impl<T> StoreRead<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            StoreRead::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, StoreRead::Found(_))
    }
}

/// Read a raw string entry
pub fn read_raw<H: Host>(host: &H, store: StoreKind, key: &str) -> StoreRead<String> {
    match host.store_get(store, key) {
        Ok(Some(value)) => StoreRead::Found(value),
        Ok(None) => StoreRead::Absent,
        Err(e) => StoreRead::Recovered(format!("{} read of '{}' failed: {}", store.name(), key, e)),
    }
}

/// Read and deserialize a JSON entry
pub fn read_json<H: Host, T: DeserializeOwned>(host: &H, store: StoreKind, key: &str) -> StoreRead<T> {
    match read_raw(host, store, key) {
        StoreRead::Found(raw) => match serde_json::from_str(&raw) {
            Ok(value) => StoreRead::Found(value),
            Err(e) => StoreRead::Recovered(format!(
                "{} entry '{}' is malformed: {}",
                store.name(),
                key,
                e
            )),
        },
        StoreRead::Absent => StoreRead::Absent,
        StoreRead::Recovered(reason) => StoreRead::Recovered(reason),
    }
}

/// Serialize a value as JSON and write it
pub fn write_json<H: Host, T: Serialize + ?Sized>(
    host: &H,
    store: StoreKind,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Encode(e.to_string()))?;
    host.store_set(store, key, &raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use critiq_host::HostError;
    use critiq_host_mock::MockHost;

    #[test]
    fn test_read_absent_and_found() {
        let host = MockHost::new();
        assert_eq!(read_raw(&host, StoreKind::Durable, "k"), StoreRead::Absent);

        host.seed(StoreKind::Durable, "k", "[1,2]");
        let read: StoreRead<Vec<u32>> = read_json(&host, StoreKind::Durable, "k");
        assert_eq!(read, StoreRead::Found(vec![1, 2]));
    }

    #[test]
    fn test_malformed_entry_is_recovered() {
        let host = MockHost::new();
        host.seed(StoreKind::Ephemeral, "publications", "{oops");
        let read: StoreRead<Vec<u32>> = read_json(&host, StoreKind::Ephemeral, "publications");
        match read {
            StoreRead::Recovered(reason) => assert!(reason.contains("malformed")),
            other => panic!("expected Recovered, got {:?}", other),
        }
    }

    #[test]
    fn test_unavailable_store_is_recovered() {
        let host = MockHost::new();
        host.set_store_unavailable(StoreKind::Durable, true);
        let read = read_raw(&host, StoreKind::Durable, "currentUser");
        assert!(!read.is_found());
        assert_eq!(read.into_option(), None);
    }

    #[test]
    fn test_write_json_propagates_host_error() {
        let host = MockHost::new();
        host.reject_writes(StoreKind::Ephemeral);
        assert!(matches!(
            write_json(&host, StoreKind::Ephemeral, "publications", &vec![1u8]),
            Err(StorageError::Host(HostError::StorageError(_)))
        ));
    }
}
