//! src/controller/navigation.rs
//! ============================================================================
//! # `NavigationController`: the browsing state machine
//!
//! Owns the current location, its listing, the armed selection and the copy
//! clipboard. Every navigation is a two step affair: a tagged
//! [`ListingRequest`] is issued, the listing is produced (inline or on a
//! worker), and [`NavigationController::apply_listing`] commits it. Only the
//! most recently issued request may change state; anything older is stale.
//!
//! Invariants:
//! - `current` is the root marker or a directory that listed successfully
//!   when it was set.
//! - The selection is cleared whenever `current` changes.
//! - A location that stops being readable is abandoned for its nearest
//!   readable ancestor, ending at the root marker.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::fs::dir_scanner::DirectoryLister;
use crate::fs::object_info::{Entry, EntryKind};
use crate::fs::path_resolver::{Location, PathResolver};
use crate::model::notification::NotificationSink;
use crate::model::selection::{ClickAction, DEFAULT_ROW_HEIGHT, SelectionState};
use crate::platform::opener::DefaultAppOpener;

/// Why a listing was requested; decides recovery when it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavIntent {
    Enter,
    Parent,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    pub id: u64,
    pub target: Location,
    pub intent: NavIntent,
}

/// Result of applying a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigated {
    /// `current` is now this location.
    Entered(Location),

    /// Go-to-parent at the root marker; the control is disabled.
    Disabled,

    /// Superseded by a newer request and ignored.
    Stale,

    /// The listing failed; this ancestor must be listed next.
    Recovering(ListingRequest),
}

/// What activating an entry asks of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Navigate(ListingRequest),
    Opened(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Draw the selection highlight on this row.
    Highlight { index: usize },
    Activated(Activation),
    NoOp,
}

/// A paste the caller should run as a copy operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
}

pub struct NavigationController {
    lister: DirectoryLister,
    opener: Arc<dyn DefaultAppOpener>,
    notifier: Arc<dyn NotificationSink>,
    current: Location,
    entries: Vec<Entry>,
    selection: SelectionState,
    clipboard: Option<PathBuf>,
    latest_request: u64,
    row_height: f32,
}

impl std::fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationController")
            .field("current", &self.current)
            .field("entries", &self.entries.len())
            .field("selection", &self.selection)
            .field("clipboard", &self.clipboard)
            .field("latest_request", &self.latest_request)
            .finish_non_exhaustive()
    }
}

impl NavigationController {
    /// Starts at the root marker, showing the mounted volumes.
    pub fn new(
        lister: DirectoryLister,
        opener: Arc<dyn DefaultAppOpener>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let entries = lister.list(&Location::Root).unwrap_or_default();

        Self {
            lister,
            opener,
            notifier,
            current: Location::Root,
            entries,
            selection: SelectionState::new(),
            clipboard: None,
            latest_request: 0,
            row_height: DEFAULT_ROW_HEIGHT,
        }
    }

    #[must_use]
    pub fn with_row_height(mut self, row_height: f32) -> Self {
        self.row_height = row_height;
        self
    }

    // ------------------------------------------------------------
    // Read access for the shell.
    // ------------------------------------------------------------

    #[must_use]
    pub const fn current(&self) -> &Location {
        &self.current
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub const fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Row of the armed entry in the current listing.
    #[must_use]
    pub fn armed_index(&self) -> Option<usize> {
        let armed = self.selection.armed()?;
        self.entries.iter().position(|e| e.full_path == armed)
    }

    #[must_use]
    pub fn clipboard(&self) -> Option<&Path> {
        self.clipboard.as_deref()
    }

    #[must_use]
    pub const fn lister(&self) -> &DirectoryLister {
        &self.lister
    }

    #[must_use]
    pub const fn resolver(&self) -> &PathResolver {
        self.lister.resolver()
    }

    #[must_use]
    pub fn notifier(&self) -> Arc<dyn NotificationSink> {
        Arc::clone(&self.notifier)
    }

    /// State of the "up" control.
    #[must_use]
    pub const fn can_go_to_parent(&self) -> bool {
        !self.current.is_root()
    }

    /// State of the "paste" control.
    #[must_use]
    pub const fn can_paste(&self) -> bool {
        self.clipboard.is_some() && !self.current.is_root()
    }

    // ------------------------------------------------------------
    // Request side.
    // ------------------------------------------------------------

    fn issue(&mut self, target: Location, intent: NavIntent) -> ListingRequest {
        self.latest_request += 1;
        debug!(id = self.latest_request, %target, ?intent, "listing requested");

        ListingRequest {
            id: self.latest_request,
            target,
            intent,
        }
    }

    /// Request entering `target`, which may be a device label from the root
    /// listing.
    ///
    /// # Errors
    /// [`AppError::NotADirectory`] if the resolved path is not a directory.
    pub fn request_enter(&mut self, target: &Path) -> Result<ListingRequest, AppError> {
        let resolved: PathBuf = self.resolver().resolve(target);

        if !resolved.is_dir() {
            let err = AppError::NotADirectory(resolved);
            self.notifier.warning(&err.to_string());
            return Err(err);
        }

        Ok(self.issue(Location::Dir(resolved), NavIntent::Enter))
    }

    /// `None` at the root marker.
    pub fn request_parent(&mut self) -> Option<ListingRequest> {
        if self.current.is_root() {
            return None;
        }

        let parent = self.resolver().parent_of(&self.current);
        Some(self.issue(parent, NavIntent::Parent))
    }

    pub fn request_refresh(&mut self) -> ListingRequest {
        let current = self.current.clone();
        self.issue(current, NavIntent::Refresh)
    }

    // ------------------------------------------------------------
    // Apply side.
    // ------------------------------------------------------------

    /// Commit the listing produced for `request`.
    ///
    /// # Errors
    /// A failed [`NavIntent::Enter`] listing is returned as-is and the current
    /// location is kept, as is any error that is not
    /// [`AppError::is_recoverable_navigation`]. Parent or refresh listings
    /// that fail recoverably do not error; they yield
    /// [`Navigated::Recovering`] towards the nearest ancestor.
    pub fn apply_listing(
        &mut self,
        request: ListingRequest,
        result: Result<Vec<Entry>, AppError>,
    ) -> Result<Navigated, AppError> {
        if request.id != self.latest_request {
            debug!(
                id = request.id,
                latest = self.latest_request,
                "discarding stale listing for {}",
                request.target
            );
            return Ok(Navigated::Stale);
        }

        match result {
            Ok(entries) => {
                info!(
                    marker = "NAVIGATE",
                    from = %self.current,
                    to = %request.target,
                    entries = entries.len(),
                    "location changed"
                );

                self.current = request.target;
                self.entries = entries;
                self.selection.clear();

                Ok(Navigated::Entered(self.current.clone()))
            }

            Err(err)
                if request.intent == NavIntent::Enter
                    || request.target.is_root()
                    || !err.is_recoverable_navigation() =>
            {
                warn!("Cannot enter {}: {}", request.target, err);
                self.notifier
                    .error(&format!("Cannot open {}: {err}", request.target));
                Err(err)
            }

            Err(err) => {
                warn!("{} became unreadable, moving up: {}", request.target, err);
                self.notifier.warning(&format!(
                    "{} is no longer readable; moved to the parent folder",
                    request.target
                ));

                let parent = self.resolver().parent_of(&request.target);
                Ok(Navigated::Recovering(self.issue(parent, NavIntent::Parent)))
            }
        }
    }

    /// List `request` inline and apply it, following recovery to the end.
    pub fn run(&mut self, mut request: ListingRequest) -> Result<Navigated, AppError> {
        loop {
            let result = self.lister.list(&request.target);

            match self.apply_listing(request, result)? {
                Navigated::Recovering(next) => request = next,
                other => return Ok(other),
            }
        }
    }

    // ------------------------------------------------------------
    // Blocking transitions.
    // ------------------------------------------------------------

    pub fn enter_directory(&mut self, target: &Path) -> Result<Navigated, AppError> {
        let request = self.request_enter(target)?;
        self.run(request)
    }

    pub fn go_to_parent(&mut self) -> Result<Navigated, AppError> {
        match self.request_parent() {
            Some(request) => self.run(request),
            None => Ok(Navigated::Disabled),
        }
    }

    pub fn refresh(&mut self) -> Result<Navigated, AppError> {
        let request = self.request_refresh();
        self.run(request)
    }

    // ------------------------------------------------------------
    // Clicks and activation.
    // ------------------------------------------------------------

    /// Click at a vertical pixel offset from the top of the listing.
    pub fn click_at(&mut self, offset_y: f32) -> Result<ClickOutcome, AppError> {
        match self
            .selection
            .click_at(offset_y, self.row_height, &self.entries)
        {
            ClickAction::Select { index, entry } => {
                info!("Selected {}", entry.full_path.display());
                Ok(ClickOutcome::Highlight { index })
            }

            ClickAction::Activate { entry, .. } => {
                self.activate_entry(&entry).map(ClickOutcome::Activated)
            }

            ClickAction::NoOp => Ok(ClickOutcome::NoOp),
        }
    }

    /// Directories become a navigation request; files go to the default
    /// application.
    ///
    /// # Errors
    /// Navigation validation errors, or the opener's error (including
    /// [`AppError::UnsupportedPlatform`]), each already posted as a notice.
    pub fn activate_entry(&mut self, entry: &Entry) -> Result<Activation, AppError> {
        match entry.kind {
            EntryKind::Directory => self.request_enter(&entry.full_path).map(Activation::Navigate),

            EntryKind::File => match self.opener.open(&entry.full_path) {
                Ok(()) => Ok(Activation::Opened(entry.full_path.clone())),

                Err(err @ AppError::UnsupportedPlatform(_)) => {
                    self.notifier.warning(&err.to_string());
                    Err(err)
                }

                Err(err) => {
                    self.notifier
                        .error(&format!("Cannot open {}: {err}", entry.name));
                    Err(err)
                }
            },
        }
    }

    // ------------------------------------------------------------
    // Copy clipboard.
    // ------------------------------------------------------------

    /// Put the armed entry on the clipboard, replacing what was there.
    pub fn copy_selected(&mut self) -> Option<&Path> {
        let armed = self.selection.armed()?;
        let resolved = self.resolver().resolve(armed);

        info!("Copied {} to clipboard", resolved.display());
        self.notifier
            .info(&format!("Copied {}", resolved.display()));
        self.clipboard = Some(resolved);

        self.clipboard.as_deref()
    }

    /// Take the clipboard for a paste into the current directory.
    pub fn take_paste_request(&mut self) -> Option<PasteRequest> {
        let destination = self.current.as_path()?.to_path_buf();
        let source = self.clipboard.take()?;

        Some(PasteRequest {
            source,
            destination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mounts::StaticMounts;
    use crate::model::notification::NotificationQueue;
    use parking_lot::Mutex;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingOpener {
        opened: Mutex<Vec<PathBuf>>,
    }

    impl DefaultAppOpener for RecordingOpener {
        fn open(&self, path: &Path) -> Result<(), AppError> {
            self.opened.lock().push(path.to_path_buf());
            Ok(())
        }
    }

    struct Fixture {
        _dir: TempDir,
        mount: PathBuf,
        opener: Arc<RecordingOpener>,
        notes: Arc<NotificationQueue>,
        ctrl: NavigationController,
    }

    /// A temp dir registered as the single volume `testdisk`, holding
    /// `docs/{readme.txt, nested/}` and `top.txt`.
    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let mount = dir.path().canonicalize().unwrap();
        fs::create_dir_all(mount.join("docs").join("nested")).unwrap();
        fs::write(mount.join("docs").join("readme.txt"), b"hi").unwrap();
        fs::write(mount.join("top.txt"), b"top").unwrap();

        let mounts = StaticMounts::from_pairs([("testdisk", mount.clone())]);
        let lister = DirectoryLister::new(PathResolver::new(Arc::new(mounts)));
        let opener = Arc::new(RecordingOpener::default());
        let notes = Arc::new(NotificationQueue::default());
        let ctrl = NavigationController::new(lister, opener.clone(), notes.clone());

        Fixture {
            _dir: dir,
            mount,
            opener,
            notes,
            ctrl,
        }
    }

    fn index_of(ctrl: &NavigationController, name: &str) -> usize {
        ctrl.entries().iter().position(|e| e.name == name).unwrap()
    }

    fn y_of(index: usize) -> f32 {
        index as f32 * DEFAULT_ROW_HEIGHT + 1.0
    }

    #[test]
    fn test_starts_at_root_with_volumes() {
        let f = fixture();

        assert_eq!(f.ctrl.current(), &Location::Root);
        assert_eq!(f.ctrl.entries().len(), 1);
        assert_eq!(f.ctrl.entries()[0].name, "testdisk");
        assert!(!f.ctrl.can_go_to_parent());
    }

    #[test]
    fn test_parent_disabled_at_root() {
        let mut f = fixture();

        assert_eq!(f.ctrl.go_to_parent().unwrap(), Navigated::Disabled);
        assert_eq!(f.ctrl.current(), &Location::Root);
    }

    #[test]
    fn test_double_click_volume_enters_mount_point() {
        let mut f = fixture();

        assert_eq!(f.ctrl.click_at(5.0).unwrap(), ClickOutcome::Highlight { index: 0 });

        let ClickOutcome::Activated(Activation::Navigate(request)) = f.ctrl.click_at(5.0).unwrap()
        else {
            panic!("Expected navigation");
        };
        assert_eq!(request.target, Location::Dir(f.mount.clone()));

        f.ctrl.run(request).unwrap();
        assert_eq!(f.ctrl.current(), &Location::Dir(f.mount.clone()));
        assert!(f.ctrl.can_go_to_parent());
    }

    #[test]
    fn test_parent_of_mount_point_is_root() {
        let mut f = fixture();
        f.ctrl.enter_directory(&f.mount.clone()).unwrap();

        assert_eq!(
            f.ctrl.go_to_parent().unwrap(),
            Navigated::Entered(Location::Root)
        );
    }

    #[test]
    fn test_navigation_clears_selection() {
        let mut f = fixture();
        let mount = f.mount.clone();
        f.ctrl.enter_directory(&mount).unwrap();
        let docs = index_of(&f.ctrl, "docs");
        f.ctrl.click_at(y_of(docs)).unwrap();
        assert!(f.ctrl.selection().armed().is_some());

        f.ctrl.enter_directory(&mount.join("docs")).unwrap();
        assert_eq!(f.ctrl.selection().armed(), None);

        let nested = index_of(&f.ctrl, "nested");
        f.ctrl.click_at(y_of(nested)).unwrap();
        f.ctrl.go_to_parent().unwrap();
        assert_eq!(f.ctrl.selection().armed(), None);
        assert_eq!(f.ctrl.current(), &Location::Dir(mount));
    }

    #[test]
    fn test_activating_file_uses_opener() {
        let mut f = fixture();
        let mount = f.mount.clone();
        f.ctrl.enter_directory(&mount).unwrap();
        let top = index_of(&f.ctrl, "top.txt");

        f.ctrl.click_at(y_of(top)).unwrap();
        let outcome = f.ctrl.click_at(y_of(top)).unwrap();

        assert_eq!(
            outcome,
            ClickOutcome::Activated(Activation::Opened(mount.join("top.txt")))
        );
        assert_eq!(*f.opener.opened.lock(), vec![mount.join("top.txt")]);
        assert_eq!(f.ctrl.current(), &Location::Dir(mount));
    }

    #[test]
    fn test_unsupported_platform_is_a_notice() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f.txt"), b"f").unwrap();
        let lister = DirectoryLister::new(PathResolver::new(Arc::new(StaticMounts::default())));
        let notes = Arc::new(NotificationQueue::default());
        let mut ctrl = NavigationController::new(
            lister,
            crate::platform::opener::opener_for("plan9"),
            notes.clone(),
        );
        ctrl.enter_directory(dir.path()).unwrap();

        ctrl.click_at(1.0).unwrap();
        let err = ctrl.click_at(1.0).unwrap_err();

        assert!(matches!(err, AppError::UnsupportedPlatform(_)));
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn test_enter_rejects_files() {
        let mut f = fixture();
        let file = f.mount.join("top.txt");

        let err = f.ctrl.enter_directory(&file).unwrap_err();

        assert!(matches!(err, AppError::NotADirectory(_)));
        assert_eq!(f.ctrl.current(), &Location::Root);
        assert!(!f.notes.is_empty());
    }

    #[test]
    fn test_stale_listing_is_discarded() {
        let mut f = fixture();
        let mount = f.mount.clone();
        let first = f.ctrl.request_enter(&mount).unwrap();
        let second = f.ctrl.request_enter(&mount.join("docs")).unwrap();

        let second_listing = f.ctrl.lister().list(&second.target);
        let first_listing = f.ctrl.lister().list(&first.target);

        assert!(matches!(
            f.ctrl.apply_listing(second, second_listing).unwrap(),
            Navigated::Entered(_)
        ));
        assert_eq!(
            f.ctrl.apply_listing(first, first_listing).unwrap(),
            Navigated::Stale
        );
        assert_eq!(f.ctrl.current(), &Location::Dir(mount.join("docs")));
    }

    #[test]
    fn test_failed_enter_keeps_last_good_location() {
        let mut f = fixture();
        let mount = f.mount.clone();
        f.ctrl.enter_directory(&mount).unwrap();
        let request = f.ctrl.request_enter(&mount.join("docs")).unwrap();
        fs::remove_dir_all(mount.join("docs")).unwrap();

        let listing = f.ctrl.lister().list(&request.target);
        let err = f.ctrl.apply_listing(request, listing).unwrap_err();

        assert!(matches!(err, AppError::DirectoryUnreadable { .. }));
        assert_eq!(f.ctrl.current(), &Location::Dir(mount));
    }

    #[test]
    fn test_refresh_of_removed_directory_recovers_upwards() {
        let mut f = fixture();
        let mount = f.mount.clone();
        let nested = mount.join("docs").join("nested");
        f.ctrl.enter_directory(&nested).unwrap();

        fs::remove_dir_all(mount.join("docs")).unwrap();
        let outcome = f.ctrl.refresh().unwrap();

        assert_eq!(outcome, Navigated::Entered(Location::Dir(mount.clone())));
        assert_eq!(f.ctrl.current(), &Location::Dir(mount));
        assert!(!f.notes.is_empty());
    }

    #[test]
    fn test_copy_and_paste_request() {
        let mut f = fixture();
        let mount = f.mount.clone();
        f.ctrl.enter_directory(&mount).unwrap();
        assert!(!f.ctrl.can_paste());
        assert!(f.ctrl.copy_selected().is_none());

        let top = index_of(&f.ctrl, "top.txt");
        f.ctrl.click_at(y_of(top)).unwrap();
        f.ctrl.copy_selected();
        f.ctrl.enter_directory(&mount.join("docs")).unwrap();

        // Clipboard survives navigation.
        assert_eq!(f.ctrl.clipboard(), Some(mount.join("top.txt").as_path()));
        assert!(f.ctrl.can_paste());

        let paste = f.ctrl.take_paste_request().unwrap();
        assert_eq!(paste.source, mount.join("top.txt"));
        assert_eq!(paste.destination, mount.join("docs"));
        assert!(f.ctrl.clipboard().is_none());
    }

    #[test]
    fn test_paste_disabled_at_root() {
        let mut f = fixture();
        f.ctrl.click_at(1.0).unwrap();
        f.ctrl.copy_selected();

        assert_eq!(f.ctrl.clipboard(), Some(f.mount.as_path()));
        assert!(!f.ctrl.can_paste());
        assert!(f.ctrl.take_paste_request().is_none());
        assert!(f.ctrl.clipboard().is_some());
    }

    #[test]
    fn test_only_recoverable_refresh_errors_move_up() {
        let mut f = fixture();
        let docs = f.mount.join("docs");
        f.ctrl.enter_directory(&docs).unwrap();

        let request = f.ctrl.request_refresh();
        let err = f
            .ctrl
            .apply_listing(request, Err(AppError::Other("worker died".into())))
            .unwrap_err();
        assert!(matches!(err, AppError::Other(_)));
        assert_eq!(f.ctrl.current(), &Location::Dir(docs.clone()));

        let request = f.ctrl.request_refresh();
        let outcome = f
            .ctrl
            .apply_listing(request, Err(AppError::NotADirectory(docs.clone())))
            .unwrap();
        assert!(matches!(
            outcome,
            Navigated::Recovering(ListingRequest { ref target, .. }) if target == &Location::Dir(f.mount.clone())
        ));
    }
}
