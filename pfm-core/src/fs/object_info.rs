//! src/fs/object_info.rs
//! ============================================================================
//! Directory entries as shown in a listing.
//!
//! An `Entry` is derived from the filesystem every time the current location
//! changes and is never persisted. Identity is the full path.

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

use compact_str::CompactString;

// ------------------------------------------------------------
// EntryKind: file or directory.
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    /// Classify by following symlinks. Anything that is neither a regular
    /// file nor a directory (sockets, broken links, failed stats) is `None`.
    #[must_use]
    pub fn probe(path: &Path) -> Option<Self> {
        let meta: Metadata = fs::metadata(path).ok()?;

        if meta.is_dir() {
            Some(Self::Directory)
        } else if meta.is_file() {
            Some(Self::File)
        } else {
            None
        }
    }
}

// Provide human-readable display strings.
impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "File"),
            Self::Directory => write!(f, "Dir"),
        }
    }
}

// ------------------------------------------------------------
// Entry: one row of a listing.
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    pub name: CompactString,
    pub full_path: PathBuf,
    pub kind: EntryKind,
}

impl Entry {
    pub fn new(name: impl Into<CompactString>, full_path: PathBuf, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            full_path,
            kind,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_probe_classifies_files_and_dirs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        assert_eq!(EntryKind::probe(&dir.path().join("a.txt")), Some(EntryKind::File));
        assert_eq!(EntryKind::probe(&dir.path().join("sub")), Some(EntryKind::Directory));
        assert_eq!(EntryKind::probe(&dir.path().join("missing")), None);
        assert_eq!(EntryKind::Directory.to_string(), "Dir");
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_is_unclassified() {
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("dangling"))
            .unwrap();

        assert!(EntryKind::probe(&dir.path().join("dangling")).is_none());
    }
}
