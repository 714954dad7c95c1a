//! # Versioned Store
//!
//! Thread-safe in-memory map of versioned records with compare-and-swap
//! writes.
//!
//! Every record carries a version that starts at 1 and increases by one on
//! each successful write. A write names the version it was computed from;
//! if the stored version moved in the meantime the write fails with
//! [`StoreError::VersionMismatch`] and nothing changes.
//!
//! Locks are `parking_lot` and never held across calls, so a panicking
//! writer cannot poison the store.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A record together with its storage version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

impl<T> Versioned<T> {
    pub fn initial(record: T) -> Self {
        Self { version: 1, record }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            version: self.version,
            record: f(self.record),
        }
    }
}

/// Storage-level failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },

    /// The record changed since it was read.
    #[error("{entity} {id} is at version {actual}, write expected {expected}")]
    VersionMismatch {
        entity: &'static str,
        id: String,
        expected: u64,
        actual: u64,
    },
}

/// Cloneable handle to a shared map of versioned records.
#[derive(Debug)]
pub struct VersionedStore<K, T> {
    entity: &'static str,
    data: Arc<RwLock<HashMap<K, Versioned<T>>>>,
}

impl<K, T> Clone for VersionedStore<K, T> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity,
            data: Arc::clone(&self.data),
        }
    }
}

impl<K, T> VersionedStore<K, T>
where
    K: Eq + Hash + Clone + ToString,
    T: Clone,
{
    /// Create an empty store; `entity` names records in errors.
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a new record at version 1.
    pub fn insert(&self, id: K, record: T) -> Result<Versioned<T>, StoreError> {
        let mut guard = self.data.write();
        if guard.contains_key(&id) {
            return Err(StoreError::AlreadyExists {
                entity: self.entity,
                id: id.to_string(),
            });
        }
        let stored = Versioned::initial(record);
        guard.insert(id, stored.clone());
        Ok(stored)
    }

    pub fn get(&self, id: &K) -> Option<Versioned<T>> {
        self.data.read().get(id).cloned()
    }

    /// Replace the record if it is still at `expected`.
    pub fn compare_and_swap(
        &self,
        id: &K,
        expected: u64,
        record: T,
    ) -> Result<Versioned<T>, StoreError> {
        let mut guard = self.data.write();
        let slot = guard.get_mut(id).ok_or_else(|| self.not_found(id))?;
        if slot.version != expected {
            return Err(StoreError::VersionMismatch {
                entity: self.entity,
                id: id.to_string(),
                expected,
                actual: slot.version,
            });
        }
        *slot = Versioned {
            version: expected + 1,
            record,
        };
        Ok(slot.clone())
    }

    /// Remove the record if it is still at `expected`.
    pub fn remove(&self, id: &K, expected: u64) -> Result<T, StoreError> {
        let mut guard = self.data.write();
        let actual = guard.get(id).ok_or_else(|| self.not_found(id))?.version;
        if actual != expected {
            return Err(StoreError::VersionMismatch {
                entity: self.entity,
                id: id.to_string(),
                expected,
                actual,
            });
        }
        guard
            .remove(id)
            .map(|v| v.record)
            .ok_or_else(|| self.not_found(id))
    }

    /// Remove every record matching `pred`, returning how many went.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> usize {
        let mut guard = self.data.write();
        let before = guard.len();
        guard.retain(|_, v| !pred(&v.record));
        before - guard.len()
    }

    pub fn list_where(&self, pred: impl Fn(&T) -> bool) -> Vec<Versioned<T>> {
        self.data
            .read()
            .values()
            .filter(|v| pred(&v.record))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn not_found(&self, id: &K) -> StoreError {
        StoreError::NotFound {
            entity: self.entity,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> VersionedStore<u32, String> {
        VersionedStore::new("note")
    }

    #[test]
    fn test_insert_starts_at_version_one() {
        let s = store();
        let v = s.insert(1, "a".into()).unwrap();
        assert_eq!(v.version, 1);
        assert!(matches!(
            s.insert(1, "b".into()),
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_compare_and_swap_bumps_version() {
        let s = store();
        s.insert(1, "a".into()).unwrap();
        let v2 = s.compare_and_swap(&1, 1, "b".into()).unwrap();
        assert_eq!(v2, Versioned { version: 2, record: "b".to_string() });
    }

    #[test]
    fn test_stale_write_is_rejected_and_changes_nothing() {
        let s = store();
        s.insert(1, "a".into()).unwrap();
        s.compare_and_swap(&1, 1, "b".into()).unwrap();
        let err = s.compare_and_swap(&1, 1, "c".into()).unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionMismatch {
                entity: "note",
                id: "1".into(),
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(s.get(&1).unwrap().record, "b");
    }

    #[test]
    fn test_remove_checks_version() {
        let s = store();
        s.insert(1, "a".into()).unwrap();
        assert!(s.remove(&1, 7).is_err());
        assert_eq!(s.remove(&1, 1).unwrap(), "a");
        assert!(matches!(s.remove(&1, 1), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_clones_share_data() {
        let s = store();
        let t = s.clone();
        s.insert(5, "x".into()).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.remove_where(|r| r == "x"), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn test_concurrent_writers_single_winner() {
        let s = store();
        s.insert(1, "start".into()).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let s = s.clone();
                std::thread::spawn(move || s.compare_and_swap(&1, 1, format!("w{i}")).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(s.get(&1).unwrap().version, 2);
    }
}
