//! src/fs/dir_scanner.rs
//! ============================================================================
//! # `DirectoryLister`: Filesystem Listing
//!
//! Lists a directory, or the volumes at the root marker, in the order the OS
//! returns them. The order is load-bearing: click offsets map to indices of
//! this list, so entries are never sorted here.

use std::{
    collections::HashMap,
    ffi::OsString,
    fs::{self, ReadDir},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use compact_str::CompactString;
use tracing::{debug, info};

use crate::error::AppError;
use crate::fs::object_info::{Entry, EntryKind};
use crate::fs::path_resolver::{Location, PathResolver};

#[derive(Debug, Clone)]
pub struct DirectoryLister {
    resolver: PathResolver,
}

impl DirectoryLister {
    #[must_use]
    pub const fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    #[must_use]
    pub const fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Lists `location`.
    ///
    /// # Errors
    /// [`AppError::DirectoryUnreadable`] if the directory cannot be enumerated.
    pub fn list(&self, location: &Location) -> Result<Vec<Entry>, AppError> {
        match location {
            Location::Root => Ok(self.list_mount_roots()),
            Location::Dir(path) => self.list_dir(path),
        }
    }

    /// One directory entry per volume. The entry path is the device label,
    /// which `PathResolver::resolve` maps back to the mount point. When two
    /// volumes share a label the mount point is used instead so both stay
    /// reachable.
    fn list_mount_roots(&self) -> Vec<Entry> {
        let roots = self.resolver.list_mount_roots();

        let mut label_counts: HashMap<&str, usize> = HashMap::new();
        for root in &roots {
            *label_counts.entry(root.device_label.as_str()).or_default() += 1;
        }

        roots
            .iter()
            .map(|root| {
                let full_path: PathBuf = if label_counts[root.device_label.as_str()] > 1 {
                    root.mount_point.clone()
                } else {
                    PathBuf::from(root.device_label.as_str())
                };

                Entry::new(root.device_label.clone(), full_path, EntryKind::Directory)
            })
            .collect()
    }

    /// Direct children of `path`. Children that are neither a file nor a
    /// directory are dropped.
    pub fn list_dir(&self, path: &Path) -> Result<Vec<Entry>, AppError> {
        let start_time: Instant = Instant::now();

        let read_dir: ReadDir =
            fs::read_dir(path).map_err(|e| AppError::directory_unreadable(path, e))?;

        let mut entries: Vec<Entry> = Vec::new();
        let mut dropped: usize = 0;

        for dir_entry in read_dir {
            // An iteration error means the handle itself went bad.
            let dir_entry = dir_entry.map_err(|e| AppError::directory_unreadable(path, e))?;

            let file_name: OsString = dir_entry.file_name();
            let name: CompactString = CompactString::new(file_name.to_string_lossy());
            let full_path: PathBuf = path.join(&file_name);

            match EntryKind::probe(&full_path) {
                Some(kind) => entries.push(Entry::new(name, full_path, kind)),

                None => {
                    dropped += 1;
                    debug!("Dropping unclassifiable entry {:?}", full_path);
                }
            }
        }

        let duration: Duration = start_time.elapsed();
        info!(
            marker = "DIRECTORY_LIST",
            path = %path.display(),
            entries = entries.len(),
            dropped,
            "Directory listed in {:?}",
            duration
        );

        Ok(entries)
    }
}
