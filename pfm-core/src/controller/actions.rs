//! src/controller/actions.rs
//! ============================================================================
//! # Actions: user commands the event loop understands
//!
//! The shell turns input into an [`Action`]; the event loop turns an
//! [`Action`] into controller calls and background tasks.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Pointer click at a vertical offset from the top of the listing.
    Click { offset_y: f32 },

    /// Navigate to a path or a device label.
    EnterDirectory(PathBuf),

    GoToParent,

    Refresh,

    /// Put the armed entry on the clipboard.
    CopySelected,

    /// Copy the clipboard into the current directory.
    Paste,

    CancelCopy { operation_id: String },

    CancelAllCopies,

    Quit,

    NoOp,
}

/// What the event loop did with an [`Action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Redraw the selection highlight on this row.
    Highlight { index: usize },

    /// A listing is in flight under this request id.
    ListingRequested(u64),

    /// A file went to the default application.
    Opened(PathBuf),

    CopyStarted { operation_id: String },

    Copied(PathBuf),

    Cancelled(usize),

    /// The control for this action is disabled in the current state.
    Disabled,

    Quit,

    Ignored,
}
