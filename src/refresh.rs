//! Coalesced refresh of changed paths.
//!
//! Changes pile up in a pending set; a throttled task drains the set into a
//! single [`Explorer::refresh_paths`] pass. The trailing call guarantees that
//! changes arriving inside a window are picked up once it closes.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::concurrency::throttle::Throttled;
use crate::concurrency::{BoxFuture, CallOutcome, Task};
use crate::error::Result;
use crate::explorer::Explorer;

pub struct RefreshQueue {
    pending: Arc<Mutex<HashSet<PathBuf>>>,
    throttled: Throttled<(), Result<usize>>,
}

impl RefreshQueue {
    pub fn new(explorer: Arc<Explorer>, interval: Duration) -> Self {
        let pending: Arc<Mutex<HashSet<PathBuf>>> = Arc::default();
        let drain = pending.clone();
        let task: Task<(), Result<usize>> = Arc::new(move |()| -> BoxFuture<Result<usize>> {
            let explorer = explorer.clone();
            let drain = drain.clone();
            Box::pin(async move {
                let paths: Vec<PathBuf> = {
                    let mut set = drain.lock().unwrap_or_else(|e| e.into_inner());
                    set.drain().collect()
                };
                if paths.is_empty() {
                    return Ok(0);
                }
                tracing::debug!("refreshing {} changed paths", paths.len());
                explorer.refresh_paths(&paths).await?;
                Ok(paths.len())
            })
        });
        Self {
            pending,
            throttled: Throttled::new(interval, true, task),
        }
    }

    /// Queue `paths` and trigger a refresh. Resolves once a pass has covered them.
    pub async fn push(&self, paths: Vec<PathBuf>) -> CallOutcome<Result<usize>> {
        {
            let mut set = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            set.extend(paths);
        }
        self.throttled.call(()).await
    }

    /// Paths not yet refreshed.
    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::Resolution;
    use crate::explorer::ExplorerOptions;
    use crate::testing::{harness, Harness, ScriptedResolver};
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[tokio::test]
    async fn bursts_collapse_into_trailing_pass() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();
        File::create(root.join("a.txt")).unwrap();
        let Harness {
            explorer, surface, ..
        } = harness(&dir, ExplorerOptions::default(), ScriptedResolver::always(Resolution::Skip)).await;
        assert_eq!(surface.lines().len(), 2);

        let queue = RefreshQueue::new(Arc::new(explorer), Duration::from_millis(500));
        File::create(root.join("b.txt")).unwrap();
        let first = queue.push(vec![root.join("b.txt")]).await;
        assert_eq!(first.into_ran().unwrap().unwrap(), 1);
        assert_eq!(surface.lines().len(), 3);

        File::create(root.join("c.txt")).unwrap();
        File::create(root.join("d.txt")).unwrap();
        let (second, third) = tokio::join!(
            queue.push(vec![root.join("c.txt")]),
            queue.push(vec![root.join("d.txt")]),
        );
        // the window is closed for both; the later one carries the batch
        assert!(matches!(second, CallOutcome::Superseded));
        assert_eq!(third.into_ran().unwrap().unwrap(), 2);
        assert_eq!(queue.pending(), 0);
        assert_eq!(surface.lines().len(), 5);
    }
}
