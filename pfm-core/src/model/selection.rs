//! src/model/selection.rs
//! ============================================================================
//! # `SelectionState`: single-click arm, second-click activate
//!
//! The first click on a row arms it. Clicking the armed row again activates
//! it, with no timing window. Clicking a different row re-arms.

use std::path::{Path, PathBuf};

use crate::fs::object_info::Entry;

/// Row height of the listing, in pixels.
pub const DEFAULT_ROW_HEIGHT: f32 = 30.0;

/// Outcome of a click on the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// Entry at `index` is now armed; the shell highlights that row.
    Select { index: usize, entry: Entry },

    /// The armed entry was clicked again.
    Activate { index: usize, entry: Entry },

    /// Click outside the rows.
    NoOp,
}

/// Row under a vertical offset measured from the top of the listing:
/// `floor(offset / row_height)`, or `None` above the first row, past the last
/// one, or for a non-positive row height.
#[must_use]
pub fn row_at(offset_y: f32, row_height: f32, row_count: usize) -> Option<usize> {
    if !(row_height > 0.0) || !(offset_y >= 0.0) {
        return None;
    }

    let row = (offset_y / row_height).floor();

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "row is finite and non-negative here"
    )]
    let index = row as usize;

    (row.is_finite() && index < row_count).then_some(index)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    armed: Option<PathBuf>,
}

impl SelectionState {
    #[must_use]
    pub const fn new() -> Self {
        Self { armed: None }
    }

    /// Full path of the armed entry.
    #[must_use]
    pub fn armed(&self) -> Option<&Path> {
        self.armed.as_deref()
    }

    /// Apply a click on `index` of `entries`.
    pub fn click(&mut self, index: usize, entries: &[Entry]) -> ClickAction {
        let Some(entry) = entries.get(index) else {
            return ClickAction::NoOp;
        };

        if self.armed.as_deref() == Some(entry.full_path.as_path()) {
            ClickAction::Activate {
                index,
                entry: entry.clone(),
            }
        } else {
            self.armed = Some(entry.full_path.clone());
            ClickAction::Select {
                index,
                entry: entry.clone(),
            }
        }
    }

    /// Apply a click at a vertical pixel offset.
    pub fn click_at(&mut self, offset_y: f32, row_height: f32, entries: &[Entry]) -> ClickAction {
        row_at(offset_y, row_height, entries.len())
            .map_or(ClickAction::NoOp, |index| self.click(index, entries))
    }

    pub fn clear(&mut self) {
        self.armed = None;
    }
}
