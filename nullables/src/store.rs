//! Nullable store: thread-safe in-memory key-value storage for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use whispr_store::{KeyValueStore, StoreError};

/// An in-memory [`KeyValueStore`].
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullKeyValueStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    failing_key: Mutex<Option<String>>,
}

impl NullKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put`/`delete` fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make writes fail only for keys ending in `suffix`; `None` clears it.
    pub fn fail_writes_to(&self, suffix: Option<&str>) {
        *self.failing_key.lock().unwrap() = suffix.map(str::to_string);
    }

    /// Stored value as UTF-8, for assertions on the persisted layout.
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self, key: &str) -> Result<(), StoreError> {
        let key_fails = self
            .failing_key
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|suffix| key.ends_with(suffix));
        if key_fails || self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Backend("injected write failure".into()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for NullKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaves_like_a_map() {
        let store = NullKeyValueStore::new();
        assert!(store.is_empty());
        store.put("b", b"2").unwrap();
        store.put("a", b"1").unwrap();
        assert_eq!(store.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.keys(), vec!["a", "b"]);
        store.delete("a").unwrap();
        assert_eq!(store.get_text("a"), None);
        assert_eq!(store.get_text("b").as_deref(), Some("2"));
    }

    #[test]
    fn injected_write_failures() {
        let store = NullKeyValueStore::new();
        store.put("k", b"v").unwrap();
        store.fail_writes(true);
        assert!(matches!(store.put("k", b"w"), Err(StoreError::Backend(_))));
        assert!(store.delete("k").is_err());
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
        store.fail_writes(false);
        store.put("k", b"w").unwrap();
    }

    #[test]
    fn failures_can_target_one_key() {
        let store = NullKeyValueStore::new();
        store.fail_writes_to(Some("outbox"));
        assert!(store.put("whispr_outbox", b"[]").is_err());
        assert!(store.put("alice/whispr_outbox", b"[]").is_err());
        store.put("whispr_reports", b"[]").unwrap();
        store.fail_writes_to(None);
        store.put("whispr_outbox", b"[]").unwrap();
    }
}
