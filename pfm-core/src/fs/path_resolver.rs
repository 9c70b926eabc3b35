//! src/fs/path_resolver.rs
//! ============================================================================
//! # `PathResolver`: locations relative to the mounted volumes
//!
//! The browser has one location that is not a directory: the root marker,
//! which shows every mounted volume. Going up from a mount point lands there,
//! and the volume entries listed there resolve back to their mount points.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::fs::mounts::{MountRoot, MountSource};

/// Display text for the root marker.
pub const ROOT_LABEL: &str = "Computer";

/// What the browser is showing: the volume list or a real directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Root,
    Dir(PathBuf),
}

impl Location {
    #[inline]
    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Root => None,
            Self::Dir(path) => Some(path),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "{ROOT_LABEL}"),
            Self::Dir(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Clone)]
pub struct PathResolver {
    mounts: Arc<dyn MountSource>,
}

impl fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathResolver").finish_non_exhaustive()
    }
}

impl PathResolver {
    pub fn new(mounts: Arc<dyn MountSource>) -> Self {
        Self { mounts }
    }

    #[inline]
    #[must_use]
    pub const fn is_root(&self, location: &Location) -> bool {
        location.is_root()
    }

    /// Volumes in the order the OS reports them.
    #[must_use]
    pub fn list_mount_roots(&self) -> Vec<MountRoot> {
        self.mounts.mount_roots()
    }

    /// Mount points compare by path components, so `/mnt/usb/` matches `/mnt/usb`.
    #[must_use]
    pub fn is_mount_root(&self, path: &Path) -> bool {
        self.list_mount_roots()
            .iter()
            .any(|root| root.mount_point.as_path() == path)
    }

    /// Parent of `location`. Mount points and paths without a parent
    /// segment go to the root marker; the root marker stays where it is.
    #[must_use]
    pub fn parent_of(&self, location: &Location) -> Location {
        let Location::Dir(path) = location else {
            return Location::Root;
        };

        if self.is_mount_root(path) {
            return Location::Root;
        }

        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Location::Dir(parent.to_path_buf()),
            _ => Location::Root,
        }
    }

    /// Turns an entry path into a directory path. Device labels listed at
    /// the root marker map to their mount point; anything else is returned
    /// unchanged.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let roots = self.list_mount_roots();

        if roots.iter().any(|root| root.mount_point.as_path() == path) {
            return path.to_path_buf();
        }

        roots
            .into_iter()
            .find(|root| Path::new(root.device_label.as_str()) == path)
            .map_or_else(|| path.to_path_buf(), |root| root.mount_point)
    }
}
