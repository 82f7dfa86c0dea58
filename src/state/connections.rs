//! Connection registry: the machines agents can run on.
//!
//! Stored as `connections.json` in the state directory.

use super::registry::{Record, Registry};
use crate::error::{CorralError, Result};
use crate::fs::WriteOptions;
use crate::locks::LockOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a connection is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    /// This machine.
    #[default]
    Local,
    /// A remote machine reached over SSH.
    Ssh,
}

impl std::fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionKind::Local => write!(f, "local"),
            ConnectionKind::Ssh => write!(f, "ssh"),
        }
    }
}

/// A registered connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub name: String,

    pub kind: ConnectionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Working root on the target machine.
    pub root: PathBuf,

    pub added_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl Connection {
    pub fn local(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind: ConnectionKind::Local,
            host: None,
            user: None,
            root: root.into(),
            added_at: Utc::now(),
            last_seen: None,
        }
    }

    pub fn ssh(
        name: impl Into<String>,
        host: impl Into<String>,
        user: Option<String>,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind: ConnectionKind::Ssh,
            host: Some(host.into()),
            user,
            ..Self::local(name, root)
        }
    }

    /// Check the fields that depend on the connection kind.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CorralError::UserError(
                "connection name must not be empty".to_string(),
            ));
        }
        if self.kind == ConnectionKind::Ssh && self.host.as_deref().unwrap_or("").is_empty() {
            return Err(CorralError::UserError(format!(
                "ssh connection '{}' requires a host",
                self.name
            )));
        }
        Ok(())
    }
}

impl Record for Connection {
    fn key(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}", self.name, self.kind)?;
        if let Some(host) = &self.host {
            match &self.user {
                Some(user) => write!(f, " {}@{}", user, host)?,
                None => write!(f, " {}", host)?,
            }
        }
        write!(f, ") {}", self.root.display())
    }
}

/// Registry of connections.
#[derive(Debug)]
pub struct ConnectionRegistry {
    inner: Registry<Connection>,
}

impl ConnectionRegistry {
    pub fn open<P: AsRef<Path>>(
        path: P,
        lock_options: LockOptions,
        write_options: WriteOptions,
    ) -> Result<Self> {
        Ok(Self {
            inner: Registry::open(path, lock_options, write_options)?,
        })
    }

    pub fn add(&self, connection: Connection) -> Result<()> {
        connection.validate()?;
        self.inner.add(connection)
    }

    pub fn remove(&self, name: &str) -> Result<Connection> {
        self.inner.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Connection> {
        self.inner.get(name)
    }

    pub fn list(&self) -> Vec<Connection> {
        self.inner.list()
    }

    /// Record that `name` was reached just now.
    pub fn touch(&self, name: &str) -> Result<Connection> {
        self.inner.update(name, |conn| {
            conn.last_seen = Some(Utc::now());
            Ok(())
        })
    }

    pub fn reload(&self) -> Result<()> {
        self.inner.reload()
    }
}
