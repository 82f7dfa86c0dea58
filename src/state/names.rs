//! Name pool: hands out themed names to agent sessions.
//!
//! Names come from an ordered base list; when it is exhausted the pool issues
//! overflow names `<theme>-<n>`. Allocation state is shared by every process
//! through `names.json`.

use super::SharedState;
use crate::error::{CorralError, Result};
use crate::fs::WriteOptions;
use crate::locks::LockOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Persisted allocation state of a [`NamePool`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolState {
    /// Allocated name to holder.
    pub in_use: BTreeMap<String, String>,

    /// Next overflow number to try.
    pub overflow_next: u32,
}

/// A pool of names shared across processes.
#[derive(Debug)]
pub struct NamePool {
    theme: String,
    names: Vec<String>,
    state: SharedState<PoolState>,
}

impl NamePool {
    pub fn open<P: AsRef<Path>>(
        path: P,
        theme: impl Into<String>,
        names: Vec<String>,
        lock_options: LockOptions,
        write_options: WriteOptions,
    ) -> Result<Self> {
        let theme = theme.into();
        if theme.is_empty() {
            return Err(CorralError::UserError(
                "name pool theme must not be empty".to_string(),
            ));
        }
        Ok(Self {
            theme,
            names,
            state: SharedState::open(path, lock_options, write_options)?,
        })
    }

    /// Allocate a free name to `holder`.
    ///
    /// Returns the first unallocated base name, or an overflow name.
    pub fn allocate(&self, holder: &str) -> Result<String> {
        self.state.transact(|state| {
            let name = match self.names.iter().find(|n| !state.in_use.contains_key(*n)) {
                Some(name) => name.clone(),
                None => loop {
                    state.overflow_next += 1;
                    let candidate = format!("{}-{}", self.theme, state.overflow_next);
                    if !state.in_use.contains_key(&candidate) {
                        break candidate;
                    }
                },
            };
            state.in_use.insert(name.clone(), holder.to_string());
            tracing::debug!(name = %name, holder, "allocated name");
            Ok(name)
        })
    }

    /// Return `name` to the pool. Returns its former holder.
    pub fn release(&self, name: &str) -> Result<String> {
        self.state.transact(|state| {
            let holder = state
                .in_use
                .remove(name)
                .ok_or_else(|| CorralError::NotFound(format!("name '{}'", name)))?;
            if state.in_use.is_empty() {
                state.overflow_next = 0;
            }
            Ok(holder)
        })
    }

    pub fn holder_of(&self, name: &str) -> Option<String> {
        self.state.read(|state| state.in_use.get(name).cloned())
    }

    /// Allocated names and their holders, ordered by name.
    pub fn in_use(&self) -> Vec<(String, String)> {
        self.state.read(|state| {
            state
                .in_use
                .iter()
                .map(|(n, h)| (n.clone(), h.clone()))
                .collect()
        })
    }

    pub fn reload(&self) -> Result<()> {
        self.state.reload()
    }
}
