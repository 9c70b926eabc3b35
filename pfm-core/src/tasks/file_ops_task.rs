//! src/tasks/file_ops_task.rs
//! ============================================================================
//! # Copy Task: background copy of one paste
//!
//! A paste runs traversal and execution on the blocking pool, then reports a
//! [`TaskResult::CopyComplete`]. Copies into the same destination directory
//! are serialized through [`DestinationLocks`]; copies into different
//! directories run concurrently.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller::event_loop::TaskResult;
use crate::controller::navigation::PasteRequest;
use crate::error::AppError;
use crate::fs::dir_scanner::DirectoryLister;
use crate::operators::copy_executor::{CopyExecutor, CopyReport};
use crate::operators::copy_traversal::CopyTraversal;

/// One async mutex per destination directory.
#[derive(Debug, Default)]
pub struct DestinationLocks {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl DestinationLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(destination: &Path) -> PathBuf {
        destination
            .canonicalize()
            .unwrap_or_else(|_| destination.to_path_buf())
    }

    /// Lock shared by every copy into `destination`.
    pub fn lock_for(&self, destination: &Path) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(Self::key(destination)).or_default().value())
    }

    /// Drop the entry for `destination` once no copy holds its lock.
    pub fn release(&self, destination: &Path) {
        self.locks
            .remove_if(&Self::key(destination), |_, lock| Arc::strong_count(lock) == 1);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Check, traverse and execute one copy on the calling thread.
///
/// # Errors
/// Precondition and traversal failures abort before anything is written.
pub fn run_copy(
    lister: DirectoryLister,
    source: &Path,
    destination: &Path,
    cancel: &CancellationToken,
) -> Result<CopyReport, AppError> {
    CopyExecutor::check_preconditions(source, destination)?;

    let work_list = CopyTraversal::new(lister).collect(source, cancel)?;

    CopyExecutor.execute_with_progress(&work_list, destination, cancel, |done, total| {
        debug!(done, total, "copy progress");
    })
}

#[derive(Debug)]
pub struct CopyTask {
    pub operation_id: String,
    pub request: PasteRequest,
    pub cancel_token: CancellationToken,
    task_tx: mpsc::UnboundedSender<TaskResult>,
    lister: DirectoryLister,
    locks: Arc<DestinationLocks>,
}

impl CopyTask {
    /// Create a copy task with a unique operation id.
    pub fn new(
        request: PasteRequest,
        lister: DirectoryLister,
        locks: Arc<DestinationLocks>,
        task_tx: mpsc::UnboundedSender<TaskResult>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            operation_id: nanoid::nanoid!(),
            request,
            cancel_token,
            task_tx,
            lister,
            locks,
        }
    }

    /// Run the copy and post its completion.
    pub async fn execute(self) -> Result<CopyReport, AppError> {
        let start_time = Instant::now();
        let lock = self.locks.lock_for(&self.request.destination);
        let guard = lock.lock().await;

        let result: Result<CopyReport, AppError> = if self.cancel_token.is_cancelled() {
            Err(AppError::Cancelled)
        } else {
            let lister = self.lister.clone();
            let source = self.request.source.clone();
            let destination = self.request.destination.clone();
            let cancel = self.cancel_token.clone();

            tokio::task::spawn_blocking(move || run_copy(lister, &source, &destination, &cancel))
                .await
                .unwrap_or_else(|e| Err(AppError::Other(format!("copy worker failed: {e}"))))
        };

        drop(guard);
        drop(lock);
        self.locks.release(&self.request.destination);

        info!(
            marker = "COPY_COMPLETE",
            operation_id = %self.operation_id,
            source = %self.request.source.display(),
            destination = %self.request.destination.display(),
            ok = result.is_ok(),
            elapsed_ms = start_time.elapsed().as_millis(),
            "Copy task finished"
        );

        let completion = TaskResult::CopyComplete {
            operation_id: self.operation_id.clone(),
            destination: self.request.destination.clone(),
            result: result.clone(),
        };

        if self.task_tx.send(completion).is_err() {
            warn!("Copy {} finished after the event loop shut down", self.operation_id);
        }

        result
    }

    pub fn spawn(self) -> JoinHandle<Result<CopyReport, AppError>> {
        tokio::spawn(self.execute())
    }
}
