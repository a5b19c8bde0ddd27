//! Durable storage behind the ledger.
//!
//! A backend only loads and persists committed entries; hashing, sequencing
//! and verification all live in [`crate::store::LedgerStore`].

use crate::entry::LedgerEntry;
use crate::error::{LedgerError, LedgerResult};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

pub trait LedgerBackend: Send + Sync {
    /// Every committed entry, in storage order.
    fn load(&self) -> LedgerResult<Vec<LedgerEntry>>;

    /// Make one entry durable. Must not return until the write is stable.
    /// On error the store halts, since part of the entry may have landed.
    fn persist(&mut self, entry: &LedgerEntry) -> LedgerResult<()>;

    fn is_read_only(&self) -> bool;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Volatile backend for tests, drills and embedding.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Vec<LedgerEntry>,
    read_only: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing entries, e.g. a replica loaded elsewhere.
    pub fn with_entries(entries: Vec<LedgerEntry>) -> Self {
        Self {
            entries,
            read_only: false,
        }
    }

    pub fn read_only(entries: Vec<LedgerEntry>) -> Self {
        Self {
            entries,
            read_only: true,
        }
    }
}

impl LedgerBackend for MemoryBackend {
    fn load(&self) -> LedgerResult<Vec<LedgerEntry>> {
        Ok(self.entries.clone())
    }

    fn persist(&mut self, entry: &LedgerEntry) -> LedgerResult<()> {
        if self.read_only {
            return Err(LedgerError::ReadOnly);
        }
        self.entries.push(entry.clone());
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn describe(&self) -> String {
        format!("memory ({} entries)", self.entries.len())
    }
}

/// One JSON object per line, appended and fsynced per entry.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: Option<File>,
}

impl FileBackend {
    /// Open for appending, creating the file (and parent dirs) if needed.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Open an existing ledger for reading only. A missing file is an
    /// empty ledger.
    pub fn open_read_only(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerBackend for FileBackend {
    fn load(&self) -> LedgerResult<Vec<LedgerEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|e| LedgerError::Corrupt {
                line: index + 1,
                reason: e.to_string(),
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn persist(&mut self, entry: &LedgerEntry) -> LedgerResult<()> {
        let file = self.file.as_mut().ok_or(LedgerError::ReadOnly)?;
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        let start = file.metadata()?.len();
        let written = file
            .write_all(&line)
            .and_then(|()| file.flush())
            .and_then(|()| file.sync_data());
        if let Err(err) = written {
            // Cut off whatever part of the line landed.
            if let Err(trunc) = file.set_len(start) {
                warn!(path = %self.path.display(), error = %trunc, "could not truncate torn ledger line");
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.file.is_none()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
