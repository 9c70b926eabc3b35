//! src/platform/opener.rs
//! ============================================================================
//! Hands files to the host's "open with default application" mechanism.
//! [`system_opener`] picks the implementation for the running OS once, at
//! startup.

use std::{path::Path, sync::Arc};

use tracing::{info, warn};

use crate::error::AppError;

pub trait DefaultAppOpener: Send + Sync {
    /// Open `path` with the default application.
    ///
    /// # Errors
    /// [`AppError::UnsupportedPlatform`] when the OS has no such mechanism.
    fn open(&self, path: &Path) -> Result<(), AppError>;
}

/// Desktop platforms: Windows shell, macOS `open`, freedesktop `xdg-open`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl DefaultAppOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<(), AppError> {
        info!("Opening {} with default application", path.display());

        open::that_detached(path).map_err(|e| {
            warn!("Default application launch failed for {}: {}", path.display(), e);
            AppError::Io(e).with_context(format!("cannot open {}", path.display()))
        })
    }
}

/// Every other OS.
#[derive(Debug, Clone)]
pub struct UnsupportedOpener {
    os: String,
}

impl UnsupportedOpener {
    pub fn new(os: impl Into<String>) -> Self {
        Self { os: os.into() }
    }
}

impl DefaultAppOpener for UnsupportedOpener {
    fn open(&self, path: &Path) -> Result<(), AppError> {
        warn!("Cannot open {}: unsupported platform {}", path.display(), self.os);
        Err(AppError::UnsupportedPlatform(self.os.clone()))
    }
}

/// Opener for the OS this binary runs on.
#[must_use]
pub fn system_opener() -> Arc<dyn DefaultAppOpener> {
    opener_for(std::env::consts::OS)
}

/// Opener for an OS name as reported by `std::env::consts::OS`.
#[must_use]
pub fn opener_for(os: &str) -> Arc<dyn DefaultAppOpener> {
    match os {
        "windows" | "macos" | "linux" | "freebsd" | "netbsd" | "openbsd" | "dragonfly" => {
            Arc::new(SystemOpener)
        }
        other => Arc::new(UnsupportedOpener::new(other)),
    }
}
