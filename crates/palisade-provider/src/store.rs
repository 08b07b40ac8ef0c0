//! Policy storage backends.
//!
//! A store answers two questions: what is the current revision (cheap), and
//! what are the current bytes (full read). The provider only performs the
//! full read when the revision moves.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Modification marker for a stored policy document.
///
/// Two probes returning equal revisions mean the document is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    modified: SystemTime,
    len: u64,
}

impl Revision {
    pub fn new(modified: SystemTime, len: u64) -> Self {
        Self { modified, len }
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Storage location of one policy document.
pub trait PolicyStore: Send + Sync + fmt::Debug {
    /// Human-readable location, used in logs and error messages.
    fn locator(&self) -> String;

    /// Returns the current revision without reading the document.
    fn probe(&self) -> io::Result<Revision>;

    /// Reads the full document.
    fn read(&self) -> io::Result<Vec<u8>>;
}

/// A policy document on the local filesystem.
///
/// The revision is the file's modification time plus its length, so a
/// rewrite that lands within the filesystem's timestamp granularity is
/// still detected when the size changes.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl PolicyStore for FileStore {
    fn locator(&self) -> String {
        self.path.display().to_string()
    }

    fn probe(&self) -> io::Result<Revision> {
        let metadata = std::fs::metadata(&self.path)?;
        Ok(Revision::new(metadata.modified()?, metadata.len()))
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}
