//! Persisted session slots. A tab owns one directory holding the raw token and
//! the serialized identity; separate tabs use separate directories and never
//! see each other's session.

use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Token,
    Identity,
}

impl Slot {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Token => "auth_token",
            Self::Identity => "user_data",
        }
    }
}

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("session slot {slot} I/O error: {source}")]
    Io {
        slot: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Storage backend for the two session slots. Only the session store talks to it.
pub trait SlotStorage: Send + Sync {
    /// Reads a slot, `None` when it was never written or has been removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn read(&self, slot: Slot) -> Result<Option<String>, SlotError>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn write(&self, slot: Slot, value: &str) -> Result<(), SlotError>;

    /// Removes a slot; removing an absent slot succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the removal.
    fn remove(&self, slot: Slot) -> Result<(), SlotError>;
}

/// Slots kept as files under `<session_dir>/<tab>/`.
#[derive(Clone, Debug)]
pub struct FileSlots {
    dir: PathBuf,
}

impl FileSlots {
    #[must_use]
    pub fn new(session_dir: &Path, tab: &str) -> Self {
        Self {
            dir: session_dir.join(sanitize_tab(tab)),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, slot: Slot) -> PathBuf {
        self.dir.join(slot.key())
    }
}

impl SlotStorage for FileSlots {
    fn read(&self, slot: Slot) -> Result<Option<String>, SlotError> {
        match fs::read_to_string(self.path(slot)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SlotError::Io {
                slot: slot.key(),
                source,
            }),
        }
    }

    fn write(&self, slot: Slot, value: &str) -> Result<(), SlotError> {
        let io_err = |source| SlotError::Io {
            slot: slot.key(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;

        // write then rename so a reader never sees half a token
        let tmp = self.dir.join(format!(".{}.tmp", slot.key()));
        fs::write(&tmp, value).map_err(io_err)?;
        restrict_permissions(&tmp).map_err(io_err)?;
        fs::rename(&tmp, self.path(slot)).map_err(io_err)?;

        debug!("wrote session slot {}", slot.key());
        Ok(())
    }

    fn remove(&self, slot: Slot) -> Result<(), SlotError> {
        match fs::remove_file(self.path(slot)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SlotError::Io {
                slot: slot.key(),
                source,
            }),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Keeps tab names to a single safe path component.
fn sanitize_tab(tab: &str) -> String {
    let cleaned: String = tab
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

/// In-memory slots, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySlots {
    values: Mutex<HashMap<Slot, String>>,
}

impl MemorySlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStorage for MemorySlots {
    fn read(&self, slot: Slot) -> Result<Option<String>, SlotError> {
        Ok(self.values.lock().get(&slot).cloned())
    }

    fn write(&self, slot: Slot, value: &str) -> Result<(), SlotError> {
        self.values.lock().insert(slot, value.to_string());
        Ok(())
    }

    fn remove(&self, slot: Slot) -> Result<(), SlotError> {
        self.values.lock().remove(&slot);
        Ok(())
    }
}
