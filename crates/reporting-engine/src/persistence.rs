//! Reporting table persistence
//!
//! The engine saves and restores the table through an opaque blob store so
//! the on-disk/NV format stays owned by the storage collaborator. The blob
//! content is a JSON snapshot of the occupied entries.

use crate::error::ReportingError;
use crate::table::{ReportEntry, ReportingTable};
use std::path::{Path, PathBuf};

/// Opaque save/restore of the reporting table
pub trait TableStore: Send {
    fn save(&self, blob: &[u8]) -> std::io::Result<()>;
    /// `Ok(None)` means no snapshot exists yet
    fn restore(&self) -> std::io::Result<Option<Vec<u8>>>;
}

/// Serialize the occupied entries into a snapshot blob
pub fn encode_table(table: &ReportingTable) -> Result<Vec<u8>, ReportingError> {
    let entries: Vec<&ReportEntry> = table.slots().iter().filter(|e| e.used).collect();
    Ok(serde_json::to_vec(&entries)?)
}

/// Save the table through the store
pub fn save_table(store: &dyn TableStore, table: &ReportingTable) -> Result<(), ReportingError> {
    let blob = encode_table(table)?;
    store.save(&blob)?;
    tracing::debug!(entries = table.occupied(), "saved reporting table");
    Ok(())
}

/// Restore the table from the store; any failure yields a zeroed table.
#[must_use]
pub fn load_table(store: &dyn TableStore, capacity: usize) -> ReportingTable {
    match store.restore() {
        Ok(Some(blob)) => match serde_json::from_slice::<Vec<ReportEntry>>(&blob) {
            Ok(entries) => {
                tracing::info!(entries = entries.len(), "restored reporting table");
                ReportingTable::from_entries(entries, capacity)
            }
            Err(e) => {
                tracing::warn!("failed to parse reporting table snapshot: {e}");
                ReportingTable::with_capacity(capacity)
            }
        },
        Ok(None) => {
            tracing::debug!("no reporting table snapshot, starting fresh");
            ReportingTable::with_capacity(capacity)
        }
        Err(e) => {
            tracing::warn!("failed to read reporting table snapshot: {e}");
            ReportingTable::with_capacity(capacity)
        }
    }
}

/// File-backed store writing atomically via tmp-file + rename
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableStore for FileStore {
    fn save(&self, blob: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, blob)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn restore(&self) -> std::io::Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Volatile store, for tests and devices without persistent storage
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: std::sync::Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemoryStore {
    fn save(&self, blob: &[u8]) -> std::io::Result<()> {
        match self.blob.lock() {
            Ok(mut slot) => {
                *slot = Some(blob.to_vec());
                Ok(())
            }
            Err(_) => Err(std::io::Error::other("store poisoned")),
        }
    }

    fn restore(&self) -> std::io::Result<Option<Vec<u8>>> {
        match self.blob.lock() {
            Ok(slot) => Ok(slot.clone()),
            Err(_) => Err(std::io::Error::other("store poisoned")),
        }
    }
}
