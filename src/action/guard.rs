//! Pre-mutation conflict checks.
//!
//! Create operations reject the whole batch on the first existing target.
//! Transfers (rename, copy, move) are planned in full through the
//! [`ConflictResolver`] before anything touches the disk, so an abort never
//! leaves a half-applied batch behind.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::collab::{ConflictResolver, NoticeLevel, PathPair, Prompter, Resolution};
use crate::error::{ExplorerError, Result};
use crate::fs::operations::{collision_candidates, is_within};
use crate::fs::provider::FileSystem;

/// Fail with [`ExplorerError::Conflict`] if any target exists.
pub async fn check_create(fs: &dyn FileSystem, targets: &[PathBuf]) -> Result<()> {
    let mut seen = HashSet::new();
    for target in targets {
        if !seen.insert(target) || fs.exists(target).await {
            return Err(ExplorerError::Conflict(target.clone()));
        }
    }
    Ok(())
}

/// Copy keeps the source, move removes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Copy,
    Move,
}

impl TransferKind {
    pub fn verb(self) -> &'static str {
        match self {
            TransferKind::Copy => "copy",
            TransferKind::Move => "move",
        }
    }
}

/// One requested `source → target` transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub kind: TransferKind,
    pub source: PathBuf,
    pub target: PathBuf,
}

impl Transfer {
    pub fn new(kind: TransferKind, source: PathBuf, target: PathBuf) -> Self {
        Self {
            kind,
            source,
            target,
        }
    }
}

/// Planned fate of one transfer.
#[derive(Debug)]
pub enum Step {
    /// Carry out `transfer`, deleting an existing target first if `overwrite`.
    Apply { transfer: Transfer, overwrite: bool },
    Skip(Transfer),
    /// Refused before mutation, reported with the rest of the batch.
    Reject(Transfer, ExplorerError),
}

/// First name for `target` that is neither on disk nor already planned.
pub async fn unique_target(fs: &dyn FileSystem, target: &Path, taken: &HashSet<PathBuf>) -> PathBuf {
    if !taken.contains(target) && !fs.exists(target).await {
        return target.to_path_buf();
    }
    for candidate in collision_candidates(target) {
        if !taken.contains(&candidate) && !fs.exists(&candidate).await {
            return candidate;
        }
    }
    target.to_path_buf()
}

/// Decide every transfer of a batch before any of them runs.
///
/// An existing target goes through `resolver`; [`Resolution::AbortAll`]
/// cancels the batch with [`ExplorerError::Cancelled`].
pub async fn plan(
    fs: &dyn FileSystem,
    resolver: &dyn ConflictResolver,
    operation: &str,
    transfers: Vec<Transfer>,
) -> Result<Vec<Step>> {
    let mut steps = Vec::with_capacity(transfers.len());
    let mut taken: HashSet<PathBuf> = HashSet::new();

    for mut transfer in transfers {
        if transfer.source == transfer.target {
            match transfer.kind {
                TransferKind::Move => steps.push(Step::Skip(transfer)),
                TransferKind::Copy => {
                    transfer.target = unique_target(fs, &transfer.target, &taken).await;
                    taken.insert(transfer.target.clone());
                    steps.push(Step::Apply {
                        transfer,
                        overwrite: false,
                    });
                }
            }
            continue;
        }
        if is_within(&transfer.target, &transfer.source) {
            let reason = format!("cannot {} {} into itself", transfer.kind.verb(), transfer.source.display());
            steps.push(Step::Reject(transfer, ExplorerError::InvalidPath(reason)));
            continue;
        }

        let planned_twice = taken.contains(&transfer.target);
        if !planned_twice && !fs.exists(&transfer.target).await {
            taken.insert(transfer.target.clone());
            steps.push(Step::Apply {
                transfer,
                overwrite: false,
            });
            continue;
        }

        let pair = PathPair::new(Some(transfer.source.clone()), transfer.target.clone());
        match resolver.resolve(operation, &pair).await? {
            Resolution::AbortAll => {
                tracing::debug!("{} batch aborted at {}", operation, transfer.target.display());
                return Err(ExplorerError::Cancelled);
            }
            Resolution::Skip => steps.push(Step::Skip(transfer)),
            Resolution::Rename => {
                transfer.target = unique_target(fs, &transfer.target, &taken).await;
                taken.insert(transfer.target.clone());
                steps.push(Step::Apply {
                    transfer,
                    overwrite: false,
                });
            }
            Resolution::Overwrite if planned_twice => {
                let reason = format!("{} is already a target in this batch", transfer.target.display());
                steps.push(Step::Reject(transfer, ExplorerError::InvalidPath(reason)));
            }
            Resolution::Overwrite if is_within(&transfer.source, &transfer.target) => {
                let reason = format!("cannot overwrite {} with its own content", transfer.target.display());
                steps.push(Step::Reject(transfer, ExplorerError::InvalidPath(reason)));
            }
            Resolution::Overwrite => {
                taken.insert(transfer.target.clone());
                steps.push(Step::Apply {
                    transfer,
                    overwrite: true,
                });
            }
        }
    }
    Ok(steps)
}

/// Outcome of an applied batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub done: Vec<Transfer>,
    pub skipped: Vec<Transfer>,
    pub failed: Vec<(PathBuf, ExplorerError)>,
}

impl BatchReport {
    /// Show a summary; failures name every offending path.
    pub async fn notify(&self, prompter: &dyn Prompter, operation: &str) {
        if !self.failed.is_empty() {
            let detail: Vec<String> = self
                .failed
                .iter()
                .map(|(path, e)| format!("{}: {}", path.display(), e))
                .collect();
            prompter
                .notify(NoticeLevel::Error, &format!("{} failed for {}", operation, detail.join("; ")))
                .await;
        }
        if !self.done.is_empty() || !self.skipped.is_empty() {
            let mut message = format!("{}: {} done", operation, self.done.len());
            if !self.skipped.is_empty() {
                message.push_str(&format!(", {} skipped", self.skipped.len()));
            }
            prompter.notify(NoticeLevel::Info, &message).await;
        }
    }
}

/// Run the planned steps. A failing item is recorded and the batch goes on.
pub async fn apply(fs: &dyn FileSystem, steps: Vec<Step>) -> BatchReport {
    let mut report = BatchReport::default();
    for step in steps {
        match step {
            Step::Skip(transfer) => report.skipped.push(transfer),
            Step::Reject(transfer, e) => {
                tracing::warn!("rejected {}: {}", transfer.source.display(), e);
                report.failed.push((transfer.source, e));
            }
            Step::Apply {
                transfer,
                overwrite,
            } => match run_transfer(fs, &transfer, overwrite).await {
                Ok(()) => report.done.push(transfer),
                Err(e) => {
                    tracing::warn!("{} {} failed: {}", transfer.kind.verb(), transfer.source.display(), e);
                    report.failed.push((transfer.source, e));
                }
            },
        }
    }
    report
}

async fn run_transfer(fs: &dyn FileSystem, transfer: &Transfer, overwrite: bool) -> Result<()> {
    if overwrite {
        fs.delete_permanently(&transfer.target).await?;
    }
    match transfer.kind {
        TransferKind::Copy => fs.copy(&transfer.source, &transfer.target).await,
        TransferKind::Move => fs.move_to(&transfer.source, &transfer.target).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::provider::LocalFs;
    use crate::testing::{FlakyFs, ScriptedPrompter, ScriptedResolver};
    use std::fs;
    use tempfile::TempDir;

    fn local(dir: &TempDir) -> LocalFs {
        LocalFs::new(dir.path().join(".trash"))
    }

    #[tokio::test]
    async fn create_check_fails_fast_on_existing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.txt"), "").unwrap();
        let fs = local(&dir);
        let targets = vec![dir.path().join("new.txt"), dir.path().join("x.txt")];
        let err = check_create(&fs, &targets).await.unwrap_err();
        assert!(matches!(err, ExplorerError::Conflict(p) if p == dir.path().join("x.txt")));
        assert!(check_create(&fs, &[dir.path().join("new.txt")]).await.is_ok());
    }

    #[tokio::test]
    async fn create_check_rejects_duplicates_in_batch() {
        let dir = TempDir::new().unwrap();
        let fs = local(&dir);
        let target = dir.path().join("twice");
        assert!(check_create(&fs, &[target.clone(), target]).await.is_err());
    }

    #[tokio::test]
    async fn abort_all_cancels_before_any_mutation() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::create_dir(dir.path().join("dest")).unwrap();
        fs::write(dir.path().join("dest").join("b.txt"), "old").unwrap();
        let fs = local(&dir);
        let resolver = ScriptedResolver::always(Resolution::AbortAll);

        let transfers = vec![
            Transfer::new(TransferKind::Copy, dir.path().join("a.txt"), dir.path().join("dest/a.txt")),
            Transfer::new(TransferKind::Copy, dir.path().join("b.txt"), dir.path().join("dest/b.txt")),
        ];
        let result = plan(&fs, &resolver, "paste", transfers).await;
        assert!(matches!(result, Err(ExplorerError::Cancelled)));
        assert!(!dir.path().join("dest/a.txt").exists());
        assert_eq!(std::fs::read_to_string(dir.path().join("dest/b.txt")).unwrap(), "old");
    }

    #[tokio::test]
    async fn resolutions_shape_the_plan() {
        let dir = TempDir::new().unwrap();
        for name in ["one", "two", "three"] {
            fs::write(dir.path().join(name), name).unwrap();
            fs::create_dir_all(dir.path().join("dest")).unwrap();
            fs::write(dir.path().join("dest").join(name), "old").unwrap();
        }
        let fs = local(&dir);
        let resolver = ScriptedResolver::always(Resolution::Skip)
            .then(Resolution::Overwrite)
            .then(Resolution::Rename);
        let transfers = ["one", "two", "three"]
            .iter()
            .map(|n| Transfer::new(TransferKind::Copy, dir.path().join(n), dir.path().join("dest").join(n)))
            .collect();
        let steps = plan(&fs, &resolver, "paste", transfers).await.unwrap();
        assert_eq!(resolver.asked().len(), 3);

        let report = apply(&fs, steps).await;
        assert_eq!(report.done.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(std::fs::read_to_string(dir.path().join("dest/one")).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(dir.path().join("dest/two")).unwrap(), "old");
        assert_eq!(std::fs::read_to_string(dir.path().join("dest/two_copy")).unwrap(), "two");
        assert_eq!(std::fs::read_to_string(dir.path().join("dest/three")).unwrap(), "old");
    }

    #[tokio::test]
    async fn copy_onto_itself_keeps_both() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f.txt"), "f").unwrap();
        let fs = local(&dir);
        let resolver = ScriptedResolver::always(Resolution::AbortAll);
        let same = dir.path().join("f.txt");
        let steps = plan(
            &fs,
            &resolver,
            "paste",
            vec![Transfer::new(TransferKind::Copy, same.clone(), same)],
        )
        .await
        .unwrap();
        assert!(resolver.asked().is_empty());
        let report = apply(&fs, steps).await;
        assert_eq!(report.done[0].target, dir.path().join("f_copy.txt"));
    }

    #[tokio::test]
    async fn directory_into_itself_is_rejected_per_item() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("d")).unwrap();
        fs::write(dir.path().join("ok.txt"), "").unwrap();
        fs::create_dir(dir.path().join("d").join("inner")).unwrap();
        let fs = local(&dir);
        let resolver = ScriptedResolver::always(Resolution::AbortAll);
        let steps = plan(
            &fs,
            &resolver,
            "paste",
            vec![
                Transfer::new(TransferKind::Move, dir.path().join("d"), dir.path().join("d/inner/d")),
                Transfer::new(TransferKind::Move, dir.path().join("ok.txt"), dir.path().join("d/inner/ok.txt")),
            ],
        )
        .await
        .unwrap();
        let report = apply(&fs, steps).await;
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, dir.path().join("d"));
        assert!(dir.path().join("d/inner/ok.txt").exists());
    }

    #[tokio::test]
    async fn io_failure_does_not_stop_the_batch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.txt"), "").unwrap();
        fs::write(dir.path().join("fine.txt"), "").unwrap();
        fs::create_dir(dir.path().join("dest")).unwrap();
        let fs = FlakyFs::new(local(&dir), "broken");
        let resolver = ScriptedResolver::always(Resolution::Skip);
        let transfers = ["broken.txt", "fine.txt"]
            .iter()
            .map(|n| Transfer::new(TransferKind::Copy, dir.path().join(n), dir.path().join("dest").join(n)))
            .collect();
        let steps = plan(&fs, &resolver, "paste", transfers).await.unwrap();
        let report = apply(&fs, steps).await;
        assert_eq!(report.failed.len(), 1);
        assert!(dir.path().join("dest/fine.txt").exists());

        let prompter = ScriptedPrompter::new();
        report.notify(&prompter, "paste").await;
        let notices = prompter.notices();
        assert_eq!(notices[0].0, NoticeLevel::Error);
        assert!(notices[0].1.contains("broken.txt"));
        assert_eq!(notices[1].1, "paste: 1 done");
    }
}
