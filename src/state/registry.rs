//! Keyed registries built on [`SharedState`].

use super::SharedState;
use crate::error::{CorralError, Result};
use crate::fs::WriteOptions;
use crate::locks::LockOptions;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// An entry stored in a [`Registry`].
pub trait Record: Clone + Serialize + DeserializeOwned {
    /// Unique key of the entry within its registry.
    fn key(&self) -> &str;
}

/// On-disk layout of a registry file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "R: DeserializeOwned"))]
pub struct RegistryFile<R> {
    #[serde(default)]
    pub entries: BTreeMap<String, R>,
}

impl<R> Default for RegistryFile<R> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

/// A keyed collection of records persisted as one JSON file.
///
/// `get`/`list` read the snapshot; every mutation is a reload-modify-save
/// transaction under the exclusive file lock.
#[derive(Debug)]
pub struct Registry<R> {
    state: SharedState<RegistryFile<R>>,
}

impl<R: Record> Registry<R> {
    pub fn open<P: AsRef<Path>>(
        path: P,
        lock_options: LockOptions,
        write_options: WriteOptions,
    ) -> Result<Self> {
        Ok(Self {
            state: SharedState::open(path, lock_options, write_options)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.state.path()
    }

    pub fn reload(&self) -> Result<()> {
        self.state.reload()
    }

    pub fn get(&self, key: &str) -> Option<R> {
        self.state.read(|file| file.entries.get(key).cloned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.read(|file| file.entries.contains_key(key))
    }

    /// All records, ordered by key.
    pub fn list(&self) -> Vec<R> {
        self.state
            .read(|file| file.entries.values().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.state.read(|file| file.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a new record; fails if its key is already present on disk.
    pub fn add(&self, record: R) -> Result<()> {
        self.state.transact(|file| {
            let key = record.key().to_string();
            if file.entries.contains_key(&key) {
                return Err(CorralError::AlreadyExists(key));
            }
            file.entries.insert(key, record);
            Ok(())
        })
    }

    /// Insert or replace a record. Returns the replaced record, if any.
    pub fn upsert(&self, record: R) -> Result<Option<R>> {
        self.state
            .transact(|file| Ok(file.entries.insert(record.key().to_string(), record)))
    }

    /// Modify the record stored under `key` and return its new value.
    ///
    /// The closure must not change the record's key.
    pub fn update(&self, key: &str, f: impl FnOnce(&mut R) -> Result<()>) -> Result<R> {
        self.state.transact(|file| {
            let record = file
                .entries
                .get_mut(key)
                .ok_or_else(|| CorralError::NotFound(key.to_string()))?;
            f(record)?;
            if record.key() != key {
                return Err(CorralError::UserError(format!(
                    "update of '{}' changed its key to '{}'",
                    key,
                    record.key()
                )));
            }
            Ok(record.clone())
        })
    }

    /// Remove and return the record stored under `key`.
    pub fn remove(&self, key: &str) -> Result<R> {
        self.state.transact(|file| {
            file.entries
                .remove(key)
                .ok_or_else(|| CorralError::NotFound(key.to_string()))
        })
    }
}
