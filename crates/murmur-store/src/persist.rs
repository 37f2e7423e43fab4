//! Persistence collaborator.
//!
//! The store does not own durable storage. It exports the state that must
//! survive a restart (resume cursor, per-channel read markers) as a
//! [`PersistedState`], and an external [`Persistence`] implementation decides
//! where that goes.
//!
//! The trait is synchronous: the state is small and saved rarely.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use murmur_proto::{ChannelId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::PersistError;

/// State carried across sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Resume cursor of the event stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Timestamp>,
    /// Newest message time the user has seen, per channel.
    #[serde(default)]
    pub last_seen: BTreeMap<ChannelId, Timestamp>,
}

/// Durable home for [`PersistedState`].
///
/// Must be Send + Sync so a session can save from any task. Implementations
/// typically share internal state via Arc, so clones access the same storage.
pub trait Persistence: Send + Sync + 'static {
    /// Load the saved state. A store that was never written yields the
    /// default state, not an error.
    fn load(&self) -> Result<PersistedState, PersistError>;

    /// Replace the saved state.
    fn save(&self, state: &PersistedState) -> Result<(), PersistError>;
}

/// In-memory persistence for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    inner: Arc<Mutex<PersistedState>>,
}

impl MemoryPersistence {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of what was last saved.
    pub fn snapshot(&self) -> PersistedState {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> Result<PersistedState, PersistError> {
        Ok(self.snapshot())
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = state.clone();
        Ok(())
    }
}

/// JSON file persistence.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    /// Persist to `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for FilePersistence {
    fn load(&self) -> Result<PersistedState, PersistError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(PersistedState::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), "persisted sync state");
        Ok(())
    }
}
