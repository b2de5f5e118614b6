//! Process-scoped diagnostic context.
//!
//! A [`ContextStore`] holds key/value pairs describing the running process or
//! the current unit of work (a request id, the active user, a job name).
//! Faults can copy the whole store into their data with
//! [`Fault::attach_context`](crate::Fault::attach_context).
//!
//! Stores are ordinary values that can be shared explicitly. For code that
//! needs a single store per process there is an explicit lifecycle:
//! [`install`] it once, read it with [`current`], and [`teardown`] it when
//! done. Nothing is installed implicitly.
//!
//! ```
//! use faultchain::{Fault, context::{self, ContextStore}};
//!
//! let store = ContextStore::new();
//! store.set("job", "nightly-import");
//! context::install(store).expect("no store installed yet");
//!
//! let fault = Fault::new("ImportError", "row 17 is malformed")
//!     .attach_context(&context::current().expect("store installed"));
//! assert_eq!(fault.data().get("job").and_then(|v| v.as_text()), Some("nightly-import"));
//!
//! context::teardown();
//! assert!(context::current().is_none());
//! ```

use core::fmt;

use spin::RwLock;
use triomphe::Arc;

use crate::aux_data::{AuxData, AuxValue};

/// A thread-safe, ordered key/value store.
///
/// Unlike [`AuxData`], setting an existing key replaces its value.
#[derive(Default)]
pub struct ContextStore {
    values: RwLock<AuxData>,
}

impl ContextStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn set(&self, key: &str, value: impl Into<AuxValue>) {
        let mut values = self.values.write();
        values.remove(key);
        values.insert_checked(key, value);
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<AuxValue> {
        self.values.read().get(key).cloned()
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&self, key: &str) -> Option<AuxValue> {
        self.values.write().remove(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        *self.values.write() = AuxData::new();
    }

    /// A consistent copy of every entry, in insertion order.
    pub fn snapshot(&self) -> AuxData {
        self.values.read().clone()
    }
}

impl fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextStore")
            .field("values", &*self.values.read())
            .finish()
    }
}

static INSTALLED: RwLock<Option<Arc<ContextStore>>> = RwLock::new(None);

/// Error returned by [`install`] when a store is already installed.
///
/// Contains the store that was attempted to be installed.
pub struct ContextAlreadyInstalledError(pub ContextStore);

impl fmt::Debug for ContextAlreadyInstalledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextAlreadyInstalledError").finish()
    }
}

impl fmt::Display for ContextAlreadyInstalledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a context store is already installed for this process")
    }
}

impl std::error::Error for ContextAlreadyInstalledError {}

/// Installs `store` as the process-wide context store.
pub fn install(store: ContextStore) -> Result<(), ContextAlreadyInstalledError> {
    let mut installed = INSTALLED.write();
    if installed.is_some() {
        return Err(ContextAlreadyInstalledError(store));
    }
    *installed = Some(Arc::new(store));
    tracing::debug!("context store installed");
    Ok(())
}

/// The process-wide context store, if one is installed.
pub fn current() -> Option<Arc<ContextStore>> {
    INSTALLED.read().clone()
}

/// Uninstalls the process-wide context store and returns it.
///
/// Handles obtained through [`current`] before the teardown stay valid.
pub fn teardown() -> Option<Arc<ContextStore>> {
    let removed = INSTALLED.write().take();
    if removed.is_some() {
        tracing::debug!("context store torn down");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_send_sync() {
        static_assertions::assert_impl_all!(ContextStore: Send, Sync);
    }

    #[test]
    fn test_set_replaces() {
        let store = ContextStore::new();
        store.set("a", 1);
        store.set("b", 2);
        store.set("a", 3);
        assert_eq!(store.get("a"), Some(AuxValue::Integer(3)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.snapshot().keys().collect::<Vec<_>>(), ["b", "a"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let store = ContextStore::new();
        store.set("a", 1);
        store.set("b", "two");
        assert_eq!(store.remove("a"), Some(AuxValue::Integer(1)));
        assert_eq!(store.remove("a"), None);
        assert!(!store.contains("a"));
        assert!(store.contains("b"));

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_shared_between_threads() {
        let store = std::sync::Arc::new(ContextStore::new());
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let store = store.clone();
                std::thread::spawn(move || store.set(&format!("worker-{n}"), n))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_attach_context_keeps_existing_keys() {
        let store = ContextStore::new();
        store.set("request", "r-1");
        let fault = crate::Fault::new("Error", "m")
            .attach("request", "local")
            .attach_context(&store);
        assert_eq!(fault.data().keys().collect::<Vec<_>>(), ["request", "request-1"]);
    }
}
