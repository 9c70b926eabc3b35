//! src/fs/mounts.rs
//! ============================================================================
//! Mount enumeration collaborator. The system implementation asks `sysinfo`
//! for the storage volumes currently attached.

use std::path::PathBuf;

use compact_str::CompactString;
use sysinfo::Disks;
use tracing::debug;

/// One storage volume as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountRoot {
    pub device_label: CompactString,
    pub mount_point: PathBuf,
}

/// Source of the volume list shown at the root marker.
pub trait MountSource: Send + Sync {
    fn mount_roots(&self) -> Vec<MountRoot>;
}

/// Mounts from the host OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMounts;

impl MountSource for SystemMounts {
    fn mount_roots(&self) -> Vec<MountRoot> {
        let disks: Disks = Disks::new_with_refreshed_list();

        let roots: Vec<MountRoot> = disks
            .list()
            .iter()
            .map(|disk| {
                let name = disk.name().to_string_lossy();
                let mount_point: PathBuf = disk.mount_point().to_path_buf();

                // Some platforms report volumes without a name.
                let device_label = if name.is_empty() {
                    CompactString::new(mount_point.to_string_lossy())
                } else {
                    CompactString::new(name)
                };

                MountRoot {
                    device_label,
                    mount_point,
                }
            })
            .collect();

        debug!(count = roots.len(), "enumerated mount roots");
        roots
    }
}

/// Fixed volume list, used where the host mounts must not leak in.
#[derive(Debug, Default, Clone)]
pub struct StaticMounts {
    roots: Vec<MountRoot>,
}

impl StaticMounts {
    #[must_use]
    pub fn new(roots: Vec<MountRoot>) -> Self {
        Self { roots }
    }

    /// Convenience constructor from `(label, mount point)` pairs.
    pub fn from_pairs<I, L, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, P)>,
        L: Into<CompactString>,
        P: Into<PathBuf>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(label, mount)| MountRoot {
                    device_label: label.into(),
                    mount_point: mount.into(),
                })
                .collect(),
        )
    }
}

impl MountSource for StaticMounts {
    fn mount_roots(&self) -> Vec<MountRoot> {
        self.roots.clone()
    }
}
