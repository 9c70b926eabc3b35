//! src/operators/copy_traversal.rs
//! ============================================================================
//! # Copy Traversal: flatten a copy source into a work list of files
//!
//! Directories are expanded with an explicit queue of pending directories,
//! so stack depth does not grow with tree depth. A directory whose canonical
//! path is already among its own ancestors is a link cycle and aborts the
//! traversal. A directory reached twice through sibling links is walked
//! twice. An unreadable directory also aborts, and the partial list is
//! dropped so no partial copy can start from it.

use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::AppError;
use crate::fs::dir_scanner::DirectoryLister;
use crate::fs::object_info::{Entry, EntryKind};

/// Files a single copy operation has to transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkList {
    source: PathBuf,
    base: PathBuf,
    files: Vec<PathBuf>,
}

impl WorkList {
    /// The path the user copied.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Directory that destination paths are relative to: the source itself
    /// for a directory, its parent for a single file.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Absolute file paths, in discovery order.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Path of `file` below [`Self::base`].
    #[must_use]
    pub fn relative<'a>(&self, file: &'a Path) -> Option<&'a Path> {
        file.strip_prefix(&self.base).ok()
    }
}

#[derive(Debug, Clone)]
pub struct CopyTraversal {
    lister: DirectoryLister,
}

impl CopyTraversal {
    #[must_use]
    pub const fn new(lister: DirectoryLister) -> Self {
        Self { lister }
    }

    /// Build the work list for `source`.
    ///
    /// # Errors
    /// [`AppError::TraversalFailed`] when the source cannot be classified, a
    /// directory cannot be read, or a directory cycle is found.
    /// [`AppError::Cancelled`] if `cancel` fires between directories.
    pub fn collect(&self, source: &Path, cancel: &CancellationToken) -> Result<WorkList, AppError> {
        match EntryKind::probe(source) {
            Some(EntryKind::File) => Ok(WorkList {
                source: source.to_path_buf(),
                base: source.parent().map(Path::to_path_buf).unwrap_or_default(),
                files: vec![source.to_path_buf()],
            }),

            Some(EntryKind::Directory) => {
                let files = self.expand_directory(source, cancel)?;
                info!(
                    marker = "COPY_TRAVERSAL",
                    source = %source.display(),
                    files = files.len(),
                    "Work list built"
                );

                Ok(WorkList {
                    source: source.to_path_buf(),
                    base: source.to_path_buf(),
                    files,
                })
            }

            None => Err(AppError::traversal_failed(
                source,
                "source is neither a file nor a directory",
            )),
        }
    }

    fn expand_directory(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>, AppError> {
        let mut files: Vec<PathBuf> = Vec::new();
        // Each pending directory carries the canonical paths of itself and
        // its ancestors; a child already on that chain closes a cycle.
        let mut pending: VecDeque<(PathBuf, Vec<PathBuf>)> =
            VecDeque::from([(root.to_path_buf(), vec![canonical(root)?])]);

        while let Some((dir, chain)) = pending.pop_front() {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            let children: Vec<Entry> = self
                .lister
                .list_dir(&dir)
                .map_err(|e| AppError::traversal_failed(&dir, e.to_string()))?;

            for child in children {
                match child.kind {
                    EntryKind::File => files.push(child.full_path),

                    EntryKind::Directory => {
                        let resolved = canonical(&child.full_path)?;
                        if chain.contains(&resolved) {
                            return Err(AppError::traversal_failed(
                                &child.full_path,
                                "directory cycle detected",
                            ));
                        }

                        let mut child_chain = chain.clone();
                        child_chain.push(resolved);

                        debug!("Queueing directory {:?}", child.full_path);
                        pending.push_back((child.full_path, child_chain));
                    }
                }
            }
        }

        Ok(files)
    }
}

fn canonical(path: &Path) -> Result<PathBuf, AppError> {
    fs::canonicalize(path).map_err(|e| AppError::traversal_failed(path, e.to_string()))
}
