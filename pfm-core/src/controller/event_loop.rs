//! src/controller/event_loop.rs
//! ============================================================================
//! # Event Loop: actions in, background results out
//!
//! Owns the [`NavigationController`] and the task channel. Listings and copies
//! run on background tasks; their results come back as [`TaskResult`]s and are
//! applied here, on one task, so controller state is never shared.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller::actions::{Action, Dispatched};
use crate::controller::navigation::{
    Activation, ClickOutcome, ListingRequest, NavigationController, Navigated,
};
use crate::error::AppError;
use crate::fs::object_info::Entry;
use crate::fs::path_resolver::Location;
use crate::operators::copy_executor::CopyReport;
use crate::tasks::file_ops_task::{CopyTask, DestinationLocks};
use crate::tasks::listing_task::spawn_listing;

/// Completion messages posted by background tasks.
#[derive(Debug, Clone)]
pub enum TaskResult {
    Listing {
        request: ListingRequest,
        result: Result<Vec<Entry>, AppError>,
    },

    CopyComplete {
        operation_id: String,
        destination: PathBuf,
        result: Result<CopyReport, AppError>,
    },
}

pub struct EventLoop {
    controller: NavigationController,
    task_tx: mpsc::UnboundedSender<TaskResult>,
    task_rx: mpsc::UnboundedReceiver<TaskResult>,
    locks: Arc<DestinationLocks>,
    active_copies: HashMap<String, CancellationToken>,
    pending_listing: Option<u64>,
    /// Destinations of finished pastes whose refresh waits for the listing
    /// in flight.
    deferred_refresh: Option<PathBuf>,
}

impl EventLoop {
    pub fn new(controller: NavigationController) -> Self {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        info!("Initializing event loop at {}", controller.current());

        Self {
            controller,
            task_tx,
            task_rx,
            locks: Arc::new(DestinationLocks::new()),
            active_copies: HashMap::new(),
            pending_listing: None,
            deferred_refresh: None,
        }
    }

    #[must_use]
    pub const fn controller(&self) -> &NavigationController {
        &self.controller
    }

    /// Ids of copies that have not reported back yet.
    pub fn active_copies(&self) -> impl Iterator<Item = &str> {
        self.active_copies.keys().map(String::as_str)
    }

    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.pending_listing.is_some() || !self.active_copies.is_empty()
    }

    pub async fn next_task_result(&mut self) -> Option<TaskResult> {
        self.task_rx.recv().await
    }

    /// Apply background results until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.has_pending_work() {
            match self.task_rx.recv().await {
                Some(result) => self.handle_task_result(result),
                None => break,
            }
        }
    }

    fn start_listing(&mut self, request: ListingRequest) -> Dispatched {
        let id = request.id;
        self.pending_listing = Some(id);
        spawn_listing(self.controller.lister().clone(), request, self.task_tx.clone());

        Dispatched::ListingRequested(id)
    }

    /// Run one action.
    ///
    /// # Errors
    /// Errors the controller rejected the action with. They have already been
    /// posted to the notification sink.
    pub fn dispatch(&mut self, action: Action) -> Result<Dispatched, AppError> {
        debug!("Dispatching {:?}", action);

        match action {
            Action::Click { offset_y } => match self.controller.click_at(offset_y)? {
                ClickOutcome::Highlight { index } => Ok(Dispatched::Highlight { index }),
                ClickOutcome::Activated(Activation::Navigate(request)) => {
                    Ok(self.start_listing(request))
                }
                ClickOutcome::Activated(Activation::Opened(path)) => Ok(Dispatched::Opened(path)),
                ClickOutcome::NoOp => Ok(Dispatched::Ignored),
            },

            Action::EnterDirectory(target) => {
                let request = self.controller.request_enter(&target)?;
                Ok(self.start_listing(request))
            }

            Action::GoToParent => Ok(self
                .controller
                .request_parent()
                .map_or(Dispatched::Disabled, |request| self.start_listing(request))),

            Action::Refresh => {
                let request = self.controller.request_refresh();
                Ok(self.start_listing(request))
            }

            Action::CopySelected => Ok(self
                .controller
                .copy_selected()
                .map_or(Dispatched::Ignored, |path| Dispatched::Copied(path.to_path_buf()))),

            Action::Paste => Ok(self.start_paste()),

            Action::CancelCopy { operation_id } => {
                let cancelled = self.active_copies.get(&operation_id).map_or(0, |token| {
                    token.cancel();
                    1
                });
                Ok(Dispatched::Cancelled(cancelled))
            }

            Action::CancelAllCopies => {
                for token in self.active_copies.values() {
                    token.cancel();
                }
                Ok(Dispatched::Cancelled(self.active_copies.len()))
            }

            Action::Quit => {
                self.shutdown();
                Ok(Dispatched::Quit)
            }

            Action::NoOp => Ok(Dispatched::Ignored),
        }
    }

    fn start_paste(&mut self) -> Dispatched {
        if !self.controller.can_paste() {
            return Dispatched::Disabled;
        }

        let Some(request) = self.controller.take_paste_request() else {
            return Dispatched::Disabled;
        };

        let cancel_token = CancellationToken::new();
        let task = CopyTask::new(
            request,
            self.controller.lister().clone(),
            Arc::clone(&self.locks),
            self.task_tx.clone(),
            cancel_token.clone(),
        );
        let operation_id = task.operation_id.clone();

        info!(
            marker = "COPY_START",
            operation_id = %operation_id,
            source = %task.request.source.display(),
            destination = %task.request.destination.display(),
            "Paste started"
        );

        self.active_copies.insert(operation_id.clone(), cancel_token);
        self.controller
            .notifier()
            .info(&format!("Copying {}", task.request.source.display()));
        drop(task.spawn());

        Dispatched::CopyStarted { operation_id }
    }

    /// Apply one background result.
    pub fn handle_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Listing { request, result } => {
                let id = request.id;

                match self.controller.apply_listing(request, result) {
                    Ok(Navigated::Recovering(next)) => {
                        self.start_listing(next);
                    }
                    Ok(Navigated::Stale) => {}
                    Ok(_) | Err(_) => {
                        if self.pending_listing == Some(id) {
                            self.pending_listing = None;
                            self.run_deferred_refresh();
                        }
                    }
                }
            }

            TaskResult::CopyComplete {
                operation_id,
                destination,
                result,
            } => {
                self.active_copies.remove(&operation_id);
                let notifier = self.controller.notifier();

                match result {
                    Ok(report) if report.is_complete_success() => notifier.success(&report.summary()),
                    Ok(report) => {
                        for failure in &report.failed {
                            warn!("Copy of {} failed: {}", failure.path.display(), failure.reason);
                        }
                        notifier.warning(&report.summary());
                    }
                    Err(AppError::Cancelled) => notifier.info("Copy cancelled"),
                    Err(err) => notifier.error(&format!("Copy failed: {err}")),
                }

                if self.pending_listing.is_some() {
                    // A newer navigation owns the latest request id.
                    self.deferred_refresh = Some(destination);
                } else if self.controller.current() == &Location::Dir(destination) {
                    let request = self.controller.request_refresh();
                    self.start_listing(request);
                }
            }
        }
    }

    fn run_deferred_refresh(&mut self) {
        let Some(destination) = self.deferred_refresh.take() else {
            return;
        };

        if self.controller.current() == &Location::Dir(destination) {
            let request = self.controller.request_refresh();
            self.start_listing(request);
        }
    }

    /// Cancel every copy still running.
    pub fn shutdown(&mut self) {
        for (id, token) in &self.active_copies {
            debug!("Cancelling copy {} on shutdown", id);
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::dir_scanner::DirectoryLister;
    use crate::fs::mounts::StaticMounts;
    use crate::fs::path_resolver::PathResolver;
    use crate::model::notification::{NotificationLevel, NotificationQueue};
    use crate::model::selection::DEFAULT_ROW_HEIGHT;
    use crate::platform::opener::opener_for;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn event_loop(mount: &Path) -> (EventLoop, Arc<NotificationQueue>) {
        let mounts = StaticMounts::from_pairs([("disk", mount.to_path_buf())]);
        let lister = DirectoryLister::new(PathResolver::new(Arc::new(mounts)));
        let notes = Arc::new(NotificationQueue::default());
        let controller = NavigationController::new(lister, opener_for("plan9"), notes.clone());

        (EventLoop::new(controller), notes)
    }

    fn row(ev: &EventLoop, name: &str) -> f32 {
        let index = ev
            .controller()
            .entries()
            .iter()
            .position(|e| e.name == name)
            .unwrap();
        index as f32 * DEFAULT_ROW_HEIGHT + 2.0
    }

    #[tokio::test]
    async fn test_enter_then_parent_in_background() {
        let dir = TempDir::new().unwrap();
        let mount = dir.path().canonicalize().unwrap();
        fs::create_dir(mount.join("music")).unwrap();
        let (mut ev, _notes) = event_loop(&mount);

        ev.dispatch(Action::EnterDirectory(PathBuf::from("disk"))).unwrap();
        ev.settle().await;
        assert_eq!(ev.controller().current(), &Location::Dir(mount.clone()));

        ev.dispatch(Action::Click { offset_y: row(&ev, "music") }).unwrap();
        let outcome = ev.dispatch(Action::Click { offset_y: row(&ev, "music") }).unwrap();
        assert!(matches!(outcome, Dispatched::ListingRequested(_)));
        ev.settle().await;
        assert_eq!(ev.controller().current(), &Location::Dir(mount.join("music")));

        ev.dispatch(Action::GoToParent).unwrap();
        ev.settle().await;
        ev.dispatch(Action::GoToParent).unwrap();
        ev.settle().await;
        assert_eq!(ev.controller().current(), &Location::Root);
        assert_eq!(ev.dispatch(Action::GoToParent).unwrap(), Dispatched::Disabled);
    }

    #[tokio::test]
    async fn test_only_latest_listing_wins() {
        let dir = TempDir::new().unwrap();
        let mount = dir.path().canonicalize().unwrap();
        fs::create_dir(mount.join("a")).unwrap();
        fs::create_dir(mount.join("b")).unwrap();
        let (mut ev, _notes) = event_loop(&mount);

        ev.dispatch(Action::EnterDirectory(mount.join("a"))).unwrap();
        ev.dispatch(Action::EnterDirectory(mount.join("b"))).unwrap();
        ev.settle().await;

        assert_eq!(ev.controller().current(), &Location::Dir(mount.join("b")));
    }

    #[tokio::test]
    async fn test_paste_copies_and_refreshes_listing() {
        let dir = TempDir::new().unwrap();
        let mount = dir.path().canonicalize().unwrap();
        fs::create_dir_all(mount.join("src").join("sub")).unwrap();
        fs::create_dir(mount.join("dst")).unwrap();
        fs::write(mount.join("src").join("a.txt"), b"a").unwrap();
        fs::write(mount.join("src").join("sub").join("b.txt"), b"b").unwrap();
        let (mut ev, notes) = event_loop(&mount);

        ev.dispatch(Action::EnterDirectory(mount.clone())).unwrap();
        ev.settle().await;
        assert_eq!(ev.dispatch(Action::Paste).unwrap(), Dispatched::Disabled);

        ev.dispatch(Action::Click { offset_y: row(&ev, "src") }).unwrap();
        ev.dispatch(Action::CopySelected).unwrap();
        ev.dispatch(Action::EnterDirectory(mount.join("dst"))).unwrap();
        ev.settle().await;
        assert!(ev.controller().entries().is_empty());

        let started = ev.dispatch(Action::Paste).unwrap();
        assert!(matches!(started, Dispatched::CopyStarted { .. }));
        ev.settle().await;

        assert_eq!(fs::read(mount.join("dst").join("a.txt")).unwrap(), b"a");
        assert_eq!(fs::read(mount.join("dst").join("sub").join("b.txt")).unwrap(), b"b");
        assert_eq!(ev.controller().entries().len(), 2);
        assert!(
            notes
                .drain()
                .iter()
                .any(|n| n.level == NotificationLevel::Success)
        );
    }

    #[tokio::test]
    async fn test_cancel_unknown_copy_is_harmless() {
        let dir = TempDir::new().unwrap();
        let (mut ev, _notes) = event_loop(dir.path());

        let outcome = ev
            .dispatch(Action::CancelCopy {
                operation_id: "nope".into(),
            })
            .unwrap();

        assert_eq!(outcome, Dispatched::Cancelled(0));
        assert!(!ev.has_pending_work());
    }

    #[tokio::test]
    async fn test_removed_directory_recovers_on_refresh() {
        let dir = TempDir::new().unwrap();
        let mount = dir.path().canonicalize().unwrap();
        fs::create_dir_all(mount.join("gone").join("deeper")).unwrap();
        let (mut ev, notes) = event_loop(&mount);

        ev.dispatch(Action::EnterDirectory(mount.join("gone").join("deeper"))).unwrap();
        ev.settle().await;
        fs::remove_dir_all(mount.join("gone")).unwrap();

        ev.dispatch(Action::Refresh).unwrap();
        ev.settle().await;

        assert_eq!(ev.controller().current(), &Location::Dir(mount));
        assert!(!notes.is_empty());
    }

    fn copy_finished(destination: PathBuf) -> TaskResult {
        TaskResult::CopyComplete {
            operation_id: "done".into(),
            destination,
            result: Ok(CopyReport::default()),
        }
    }

    #[tokio::test]
    async fn test_finished_paste_does_not_override_newer_navigation() {
        let dir = TempDir::new().unwrap();
        let mount = dir.path().canonicalize().unwrap();
        fs::create_dir(mount.join("a")).unwrap();
        fs::create_dir(mount.join("b")).unwrap();
        let (mut ev, _notes) = event_loop(&mount);
        ev.dispatch(Action::EnterDirectory(mount.join("a"))).unwrap();
        ev.settle().await;

        ev.dispatch(Action::EnterDirectory(mount.join("b"))).unwrap();
        ev.handle_task_result(copy_finished(mount.join("a")));
        ev.settle().await;

        assert_eq!(ev.controller().current(), &Location::Dir(mount.join("b")));
    }

    #[tokio::test]
    async fn test_finished_paste_refreshes_after_listing_in_flight() {
        let dir = TempDir::new().unwrap();
        let mount = dir.path().canonicalize().unwrap();
        fs::create_dir(mount.join("a")).unwrap();
        let (mut ev, _notes) = event_loop(&mount);
        ev.dispatch(Action::EnterDirectory(mount.join("a"))).unwrap();
        ev.settle().await;

        ev.dispatch(Action::Refresh).unwrap();
        ev.handle_task_result(copy_finished(mount.join("a")));
        fs::write(mount.join("a").join("pasted.txt"), b"p").unwrap();
        ev.settle().await;

        assert_eq!(ev.controller().current(), &Location::Dir(mount.join("a")));
        assert!(
            ev.controller()
                .entries()
                .iter()
                .any(|e| e.name == "pasted.txt")
        );
    }
}
