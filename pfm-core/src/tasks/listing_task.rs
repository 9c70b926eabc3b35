//! src/tasks/listing_task.rs
//! ============================================================================
//! # Background directory listing
//!
//! Runs a [`ListingRequest`] on the blocking pool and posts the result back to
//! the event loop, tagged with the request so stale results can be dropped.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::controller::event_loop::TaskResult;
use crate::controller::navigation::ListingRequest;
use crate::fs::dir_scanner::DirectoryLister;

/// Spawn a listing for `request`.
pub fn spawn_listing(
    lister: DirectoryLister,
    request: ListingRequest,
    task_tx: mpsc::UnboundedSender<TaskResult>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        debug!(id = request.id, target = %request.target, "listing started");

        let result = lister.list(&request.target);

        if task_tx.send(TaskResult::Listing { request, result }).is_err() {
            debug!("Listing finished after the event loop shut down");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::navigation::NavIntent;
    use crate::fs::mounts::StaticMounts;
    use crate::fs::path_resolver::{Location, PathResolver};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn lister() -> DirectoryLister {
        DirectoryLister::new(PathResolver::new(Arc::new(StaticMounts::from_pairs([(
            "disk",
            "/mnt/disk",
        )]))))
    }

    #[tokio::test]
    async fn test_listing_result_carries_request() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = ListingRequest {
            id: 7,
            target: Location::Dir(dir.path().to_path_buf()),
            intent: NavIntent::Enter,
        };

        spawn_listing(lister(), request.clone(), tx).await.unwrap();

        match rx.recv().await {
            Some(TaskResult::Listing {
                request: got,
                result,
            }) => {
                assert_eq!(got, request);
                assert_eq!(result.unwrap().len(), 1);
            }
            other => panic!("Expected a listing result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_root_listing_in_background() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = ListingRequest {
            id: 1,
            target: Location::Root,
            intent: NavIntent::Parent,
        };

        spawn_listing(lister(), request, tx).await.unwrap();

        let Some(TaskResult::Listing { result, .. }) = rx.recv().await else {
            panic!("Expected a listing result");
        };
        let entries = result.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "disk");
    }
}
