use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::Watcher;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};
use tokio::sync::mpsc;

/// Recursive watcher over the source roots, forwarding batches of changed
/// paths. The watched set follows the roots through [`FsWatcher::watch_roots`].
pub struct FsWatcher {
    debouncer: Debouncer<notify::RecommendedWatcher>,
    /// Roots currently watched; shared with the event callback.
    roots: Arc<Mutex<Vec<PathBuf>>>,
}

fn lock_roots(roots: &Mutex<Vec<PathBuf>>) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
    roots.lock().unwrap_or_else(|e| e.into_inner())
}

impl FsWatcher {
    /// Create a watcher with nothing watched yet.
    ///
    /// Events are debounced by `debounce` and sent through `tx`. Paths with a
    /// component below their root in `ignore_patterns` are dropped. A window
    /// with more than `flood_threshold` changes is collapsed into the roots.
    pub fn new(
        debounce: Duration,
        ignore_patterns: Vec<String>,
        flood_threshold: usize,
        tx: mpsc::UnboundedSender<Vec<PathBuf>>,
    ) -> notify::Result<Self> {
        let roots: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
        let watched = roots.clone();

        let debouncer = new_debouncer(
            debounce,
            move |result: Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                match result {
                    Ok(events) => {
                        let paths = events
                            .into_iter()
                            .filter(|e| e.kind == DebouncedEventKind::Any)
                            .map(|e| e.path);
                        let roots = lock_roots(&watched).clone();
                        let batch = collapse(paths, &roots, &ignore_patterns, flood_threshold);
                        if !batch.is_empty() && tx.send(batch).is_err() {
                            tracing::debug!("watcher receiver gone");
                        }
                    }
                    Err(e) => tracing::warn!("watcher error: {}", e),
                }
            },
        )?;

        Ok(Self { debouncer, roots })
    }

    /// Watch exactly `roots`: dropped roots are unwatched, new ones watched
    /// recursively.
    pub fn watch_roots(&mut self, roots: &[PathBuf]) -> notify::Result<()> {
        let previous = lock_roots(&self.roots).clone();
        for old in previous.iter().filter(|p| !roots.contains(p)) {
            if let Err(e) = self.debouncer.watcher().unwatch(old) {
                tracing::debug!("unwatch {} failed: {}", old.display(), e);
            }
        }
        let mut watched: Vec<PathBuf> = previous.into_iter().filter(|p| roots.contains(p)).collect();
        for root in roots {
            if watched.contains(root) {
                continue;
            }
            if let Err(e) = self
                .debouncer
                .watcher()
                .watch(root, notify::RecursiveMode::Recursive)
            {
                *lock_roots(&self.roots) = watched;
                return Err(e);
            }
            tracing::debug!("watching {}", root.display());
            watched.push(root.clone());
        }
        *lock_roots(&self.roots) = watched;
        Ok(())
    }

    /// Roots currently watched.
    pub fn roots(&self) -> Vec<PathBuf> {
        lock_roots(&self.roots).clone()
    }
}

/// Filter one debounce window of changes.
///
/// Ignored paths are dropped; more than `flood_threshold` survivors become
/// the watched roots.
pub fn collapse<I>(paths: I, roots: &[PathBuf], ignore_patterns: &[String], flood_threshold: usize) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut kept: Vec<PathBuf> = Vec::new();
    for path in paths {
        if should_ignore(&path, roots, ignore_patterns) || kept.contains(&path) {
            continue;
        }
        kept.push(path);
    }
    if kept.len() > flood_threshold {
        tracing::debug!("{} changes in one window, refreshing roots", kept.len());
        return roots.to_vec();
    }
    kept
}

/// Whether a component of `path` below its watched root equals one of
/// `patterns`. The root's own ancestors never count.
pub fn should_ignore(path: &Path, roots: &[PathBuf], patterns: &[String]) -> bool {
    let relative = roots
        .iter()
        .filter_map(|root| path.strip_prefix(root).ok())
        .min_by_key(|rest| rest.components().count())
        .unwrap_or(path);
    relative.components().any(|component| match component {
        std::path::Component::Normal(name) => {
            let name = name.to_string_lossy();
            patterns.iter().any(|p| name == p.as_str())
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn patterns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ignore_matches_whole_components() {
        let patterns = patterns(&[".git", "target"]);
        let roots = [PathBuf::from("/p")];
        assert!(should_ignore(Path::new("/p/.git/HEAD"), &roots, &patterns));
        assert!(should_ignore(Path::new("/p/target/debug/bin"), &roots, &patterns));
        assert!(!should_ignore(Path::new("/p/target2/file.txt"), &roots, &patterns));
        assert!(!should_ignore(Path::new("/p/src/lib.rs"), &roots, &patterns));
        assert!(!should_ignore(Path::new("/p/.git/HEAD"), &roots, &[]));
    }

    #[test]
    fn ignore_looks_only_below_the_root() {
        let patterns = patterns(&["target", ".git"]);
        let roots = [PathBuf::from("/work/target/checkout")];
        assert!(!should_ignore(Path::new("/work/target/checkout/src/main.rs"), &roots, &patterns));
        assert!(should_ignore(Path::new("/work/target/checkout/.git/index"), &roots, &patterns));
    }

    #[test]
    fn collapse_filters_and_dedups() {
        let paths = vec![
            PathBuf::from("/p/a.txt"),
            PathBuf::from("/p/.git/index"),
            PathBuf::from("/p/a.txt"),
            PathBuf::from("/p/b.txt"),
        ];
        let batch = collapse(paths, &[PathBuf::from("/p")], &patterns(&[".git"]), 10);
        assert_eq!(batch, vec![PathBuf::from("/p/a.txt"), PathBuf::from("/p/b.txt")]);
    }

    #[test]
    fn flood_collapses_to_roots() {
        let roots = vec![PathBuf::from("/p"), PathBuf::from("/q")];
        let paths = (0..200).map(|i| PathBuf::from(format!("/p/file_{i}")));
        assert_eq!(collapse(paths, &roots, &[], 100), roots);

        let paths = (0..50).map(|i| PathBuf::from(format!("/p/file_{i}")));
        assert_eq!(collapse(paths, &roots, &[], 100).len(), 50);
    }

    #[tokio::test]
    async fn watch_roots_follows_root_changes() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = FsWatcher::new(Duration::from_millis(50), Vec::new(), 100, tx).unwrap();
        assert!(watcher.roots().is_empty());

        watcher.watch_roots(&[first.path().to_path_buf()]).unwrap();
        watcher.watch_roots(&[second.path().to_path_buf()]).unwrap();
        assert_eq!(watcher.roots(), vec![second.path().to_path_buf()]);

        std::fs::write(second.path().join("new.txt"), "x").unwrap();
        let batch = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(batch.iter().any(|p| p.starts_with(second.path())));
    }
}
