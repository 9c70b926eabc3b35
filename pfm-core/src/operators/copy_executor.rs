//! src/operators/copy_executor.rs
//! ============================================================================
//! # Copy Executor: best-effort batch copy of a work list
//!
//! Preconditions are checked before the first write. After that every file
//! is attempted; a failure is recorded against that file and the batch moves
//! on. Existing destination files are never overwritten.

use std::{
    fs::{self, File, FileTimes, Metadata, OpenOptions},
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::operators::copy_traversal::WorkList;

/// One file that could not be copied.
#[derive(Debug, Clone)]
pub struct CopyFailure {
    pub path: PathBuf,
    pub reason: AppError,
}

/// Aggregate outcome of one execution.
#[derive(Debug, Clone, Default)]
pub struct CopyReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<CopyFailure>,
    /// Files never attempted because the run was cancelled.
    pub skipped: Vec<PathBuf>,
    pub cancelled: bool,
}

impl CopyReport {
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    /// One line for the notification sink.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "Copied {} file(s), {} failed",
            self.succeeded.len(),
            self.failed.len()
        );

        if self.cancelled {
            line.push_str(&format!(", cancelled with {} left", self.skipped.len()));
        }

        line
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CopyExecutor;

impl CopyExecutor {
    /// Destination must be an existing directory; source must exist.
    ///
    /// # Errors
    /// [`AppError::InvalidDestination`] or [`AppError::SourceOrDestinationMissing`].
    pub fn check_preconditions(source: &Path, destination: &Path) -> Result<(), AppError> {
        if !destination.is_dir() {
            return Err(AppError::InvalidDestination(destination.to_path_buf()));
        }

        if !source.exists() || !destination.exists() {
            return Err(AppError::source_or_destination_missing(source, destination));
        }

        Ok(())
    }

    /// Copy every file of `work_list` into `destination`, keeping each
    /// file's path relative to [`WorkList::base`].
    ///
    /// # Errors
    /// Only precondition failures; per-file errors land in the report.
    pub fn execute(
        &self,
        work_list: &WorkList,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<CopyReport, AppError> {
        self.execute_with_progress(work_list, destination, cancel, |_, _| {})
    }

    /// [`Self::execute`], calling `progress(done, total)` after each entry.
    /// Cancellation is checked before every entry, so a token cancelled from
    /// `progress` stops the run before the next file.
    pub fn execute_with_progress<F>(
        &self,
        work_list: &WorkList,
        destination: &Path,
        cancel: &CancellationToken,
        mut progress: F,
    ) -> Result<CopyReport, AppError>
    where
        F: FnMut(usize, usize),
    {
        Self::check_preconditions(work_list.source(), destination)?;

        let start_time: Instant = Instant::now();
        let mut report = CopyReport::default();

        for (idx, file) in work_list.files().iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                report.skipped.extend_from_slice(&work_list.files()[idx..]);
                break;
            }

            let outcome = work_list
                .relative(file)
                .ok_or_else(|| {
                    AppError::Other(format!(
                        "{} is outside {}",
                        file.display(),
                        work_list.base().display()
                    ))
                })
                .and_then(|relative| self.copy_file(file, &destination.join(relative)));

            match outcome {
                Ok(()) => report.succeeded.push(file.clone()),

                Err(reason) => {
                    warn!("Copy of {} failed: {}", file.display(), reason);
                    report.failed.push(CopyFailure {
                        path: file.clone(),
                        reason,
                    });
                }
            }

            progress(idx + 1, work_list.len());
        }

        let duration: Duration = start_time.elapsed();
        info!(
            marker = "COPY_EXECUTE",
            destination = %destination.display(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "Copy finished in {:?}",
            duration
        );

        Ok(report)
    }

    fn copy_file(&self, source: &Path, target: &Path) -> Result<(), AppError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let meta: Metadata = fs::metadata(source)?;
        let mut src_file: File = File::open(source)?;

        // `create_new` refuses to follow or replace anything already there.
        let mut dst_file: File = match OpenOptions::new().write(true).create_new(true).open(target)
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(AppError::DestinationConflict(target.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = io::copy(&mut src_file, &mut dst_file) {
            drop(dst_file);
            let _ = fs::remove_file(target);
            return Err(e.into());
        }

        Self::apply_metadata(&dst_file, target, &meta);

        debug!("Copied {} -> {}", source.display(), target.display());
        Ok(())
    }

    /// Timestamps, then permissions. Platforms that refuse either keep the
    /// copy with default metadata.
    fn apply_metadata(dst_file: &File, target: &Path, meta: &Metadata) {
        let mut times = FileTimes::new();
        if let Ok(modified) = meta.modified() {
            times = times.set_modified(modified);
        }
        if let Ok(accessed) = meta.accessed() {
            times = times.set_accessed(accessed);
        }

        if let Err(e) = dst_file.set_times(times) {
            debug!("Timestamps not preserved for {}: {}", target.display(), e);
        }

        if let Err(e) = fs::set_permissions(target, meta.permissions()) {
            debug!("Permissions not preserved for {}: {}", target.display(), e);
        }
    }
}
