//! src/config.rs
//! ============================================================================
//! # Config: Selection Highlight Settings Loader and Saver
//!
//! Loads and saves the user-editable settings as TOML from the proper
//! cross-platform config path using the [`directories`](https://docs.rs/directories)
//! crate.
//!
//! ## Behaviour
//! - Missing file: defaults are used and written back
//! - Malformed file: `load_or_reset` replaces it with defaults and posts a notice
//! - Saves are atomic (temporary file + rename)
//!
//! ## Example
//! ```rust,ignore
//! let path = Config::config_path()?;
//! let config = Config::load_or_reset(&path, &sink).await;
//! config.save_to(&path).await?;
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use tokio::fs as TokioFs;

use crate::error::AppError;
use crate::model::notification::NotificationSink;

/// 8-bit RGBA color, stored as a four element array.
pub type Rgba = [u8; 4];

const DEFAULT_HIGHLIGHT: Rgba = [99, 118, 255, 255];

/// Main configuration struct for the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fill color of the selection rectangle.
    pub selection_highlight_color: Rgba,

    /// Outline color of the selection rectangle.
    pub selection_outline_color: Rgba,

    /// Outline width in pixels.
    pub selection_highlight_stroke_width: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            selection_highlight_color: DEFAULT_HIGHLIGHT,
            selection_outline_color: DEFAULT_HIGHLIGHT,
            selection_highlight_stroke_width: 2,
        }
    }
}

impl Config {
    /// Loads config from `path`, writing defaults there if no file exists.
    ///
    /// A file that exists but does not parse is reported as [`AppError::Config`].
    pub async fn load_from(path: &Path) -> Result<Self, AppError> {
        match TokioFs::read_to_string(path).await {
            Ok(text) => {
                info!("Loading config from {}", path.display());
                let cfg: Self = toml::from_str(&text)?;
                debug!(?cfg, "config loaded");

                Ok(cfg)
            }

            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No config file found at {}, using default configuration. Creating it now.",
                    path.display()
                );

                let default_config = Self::default();
                default_config.save_to(path).await?;

                Ok(default_config)
            }

            Err(e) => Err(AppError::config_io(path, e)),
        }
    }

    /// Loads config, recovering from a malformed or unreadable file by
    /// resetting it to defaults. The problem is reported to `sink`.
    pub async fn load_or_reset(path: &Path, sink: &dyn NotificationSink) -> Self {
        match Self::load_from(path).await {
            Ok(cfg) => cfg,

            Err(e) => {
                warn!("Config at {} unusable, resetting: {}", path.display(), e);
                sink.warning(&format!("Settings could not be read and were reset ({e})"));

                let default_config = Self::default();
                if let Err(save_err) = default_config.save_to(path).await {
                    warn!("Failed to persist default config: {}", save_err);
                }

                default_config
            }
        }
    }

    /// Saves config as TOML. The document is written to a sibling temporary
    /// file first and renamed over the target.
    pub async fn save_to(&self, path: &Path) -> Result<(), AppError> {
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            TokioFs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::config_io(parent, e))?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        let temp_path = path.with_extension("toml.tmp");

        TokioFs::write(&temp_path, toml_str)
            .await
            .map_err(|e| AppError::config_io(&temp_path, e))?;
        TokioFs::rename(&temp_path, path)
            .await
            .map_err(|e| AppError::config_io(path, e))?;

        Ok(())
    }

    /// Restores defaults and persists them.
    pub async fn reset_to(&mut self, path: &Path) -> Result<(), AppError> {
        *self = Self::default();
        self.save_to(path).await
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the config directory (without filename).
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "positive", "PositiveFileManager")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory."))?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::notification::NotificationQueue;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_yields_defaults_and_creates_it() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let cfg = Config::load_from(&path).await.unwrap();

        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_save_then_load_keeps_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config {
            selection_highlight_color: [1, 2, 3, 4],
            selection_outline_color: [5, 6, 7, 8],
            selection_highlight_stroke_width: 5,
        };
        cfg.save_to(&path).await.unwrap();

        assert!(!path.with_extension("toml.tmp").exists());
        assert_eq!(Config::load_from(&path).await.unwrap(), cfg);
    }

    #[tokio::test]
    async fn test_missing_keys_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "selection_highlight_stroke_width = 7\n")
            .await
            .unwrap();

        let cfg = Config::load_from(&path).await.unwrap();

        assert_eq!(cfg.selection_highlight_stroke_width, 7);
        assert_eq!(cfg.selection_highlight_color, DEFAULT_HIGHLIGHT);
    }

    #[tokio::test]
    async fn test_malformed_file_is_reset_with_notice() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "selection_highlight_color = \"purple\"")
            .await
            .unwrap();
        let sink = NotificationQueue::default();

        assert!(matches!(
            Config::load_from(&path).await,
            Err(AppError::Config(_))
        ));

        let cfg = Config::load_or_reset(&path, &sink).await;

        assert_eq!(cfg, Config::default());
        assert_eq!(sink.len(), 1);
        assert_eq!(Config::load_from(&path).await.unwrap(), Config::default());
    }

    #[tokio::test]
    async fn test_reset_overwrites_saved_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config {
            selection_highlight_stroke_width: 9,
            ..Config::default()
        };
        cfg.save_to(&path).await.unwrap();

        cfg.reset_to(&path).await.unwrap();

        assert_eq!(cfg, Config::default());
        assert_eq!(Config::load_from(&path).await.unwrap(), Config::default());
    }
}
