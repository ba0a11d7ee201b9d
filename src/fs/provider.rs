//! Filesystem collaborator consumed by the tree model and the actions.
//!
//! [`FileSystem`] is the narrow boundary the engine talks through. Listing
//! reports failures per entry so one unreadable entry never aborts the
//! listing of its siblings; mutations fail with [`ExplorerError::Io`].

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::{ExplorerError, Result};
use crate::fs::operations;

/// Kind of filesystem entry. Links are classified by their target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// A link whose target cannot be reached.
    Symlink,
}

/// Owner permission flags of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            readable: true,
            writable: true,
            executable: false,
        }
    }
}

/// Snapshot of filesystem metadata used by display columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMeta {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
    pub created: Option<SystemTime>,
}

/// One classified directory entry.
#[derive(Debug, Clone)]
pub struct EntryStat {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    /// The entry itself is a symbolic link.
    pub symlink: bool,
    pub permissions: Permissions,
    pub meta: FileMeta,
}

impl EntryStat {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Filesystem operations the engine depends on.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Stat a single path.
    async fn stat(&self, path: &Path) -> Result<EntryStat>;

    /// List a directory. The outer `Result` fails only when the directory
    /// itself cannot be opened; each entry carries its own result.
    async fn list(&self, path: &Path) -> Result<Vec<Result<EntryStat>>>;

    async fn exists(&self, path: &Path) -> bool;

    async fn copy(&self, src: &Path, dst: &Path) -> Result<()>;

    async fn move_to(&self, src: &Path, dst: &Path) -> Result<()>;

    async fn trash(&self, paths: &[PathBuf]) -> Result<()>;

    async fn delete_permanently(&self, path: &Path) -> Result<()>;

    async fn create_file(&self, path: &Path) -> Result<()>;

    async fn create_dir(&self, path: &Path) -> Result<()>;
}

/// Local disk implementation backed by tokio.
///
/// Trashed entries are moved into `trash_dir` with collision-free names.
#[derive(Debug, Clone)]
pub struct LocalFs {
    trash_dir: PathBuf,
}

impl Default for LocalFs {
    fn default() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("ftv").join("trash"))
    }
}

impl LocalFs {
    pub fn new(trash_dir: PathBuf) -> Self {
        Self { trash_dir }
    }

    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }
}

/// Run a blocking filesystem primitive off the async executor.
async fn blocking<F>(f: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExplorerError::Io(std::io::Error::other(e)))?
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(unix)]
fn permissions_of(meta: &std::fs::Metadata) -> Permissions {
    use std::os::unix::fs::PermissionsExt;
    let mode = meta.permissions().mode();
    Permissions {
        readable: mode & 0o400 != 0,
        writable: mode & 0o200 != 0,
        executable: !meta.is_dir() && mode & 0o100 != 0,
    }
}

#[cfg(not(unix))]
fn permissions_of(meta: &std::fs::Metadata) -> Permissions {
    Permissions {
        readable: true,
        writable: !meta.permissions().readonly(),
        executable: false,
    }
}

fn stat_from_metadata(path: &Path, meta: &std::fs::Metadata, symlink: bool) -> EntryStat {
    let kind = if meta.file_type().is_symlink() {
        EntryKind::Symlink
    } else if meta.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    EntryStat {
        name: entry_name(path),
        path: path.to_path_buf(),
        kind,
        symlink,
        permissions: permissions_of(meta),
        meta: FileMeta {
            size: meta.len(),
            modified: meta.modified().ok(),
            accessed: meta.accessed().ok(),
            created: meta.created().ok(),
        },
    }
}

/// Classify `path`, following a symlink to its target. A dangling link
/// keeps its own metadata.
async fn classify(path: &Path) -> std::io::Result<EntryStat> {
    let meta = tokio::fs::symlink_metadata(path).await?;
    if !meta.file_type().is_symlink() {
        return Ok(stat_from_metadata(path, &meta, false));
    }
    match tokio::fs::metadata(path).await {
        Ok(target) => Ok(stat_from_metadata(path, &target, true)),
        Err(e) => {
            tracing::debug!("dangling link {}: {}", path.display(), e);
            Ok(stat_from_metadata(path, &meta, true))
        }
    }
}

#[async_trait]
impl FileSystem for LocalFs {
    async fn stat(&self, path: &Path) -> Result<EntryStat> {
        Ok(classify(path).await?)
    }

    async fn list(&self, path: &Path) -> Result<Vec<Result<EntryStat>>> {
        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(path).await?;
        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    entries.push(Err(ExplorerError::ListEntry {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }));
                    break;
                }
            };
            let entry_path = entry.path();
            let stat = match classify(&entry_path).await {
                Ok(stat) => Ok(stat),
                Err(e) => Err(ExplorerError::ListEntry {
                    path: entry_path,
                    reason: e.to_string(),
                }),
            };
            entries.push(stat);
        }
        Ok(entries)
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::symlink_metadata(path).await.is_ok()
    }

    async fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        let (src, dst) = (src.to_path_buf(), dst.to_path_buf());
        blocking(move || operations::copy_to(&src, &dst)).await
    }

    async fn move_to(&self, src: &Path, dst: &Path) -> Result<()> {
        let (src, dst) = (src.to_path_buf(), dst.to_path_buf());
        blocking(move || operations::move_to(&src, &dst)).await
    }

    async fn trash(&self, paths: &[PathBuf]) -> Result<()> {
        let paths = paths.to_vec();
        let trash_dir = self.trash_dir.clone();
        blocking(move || {
            std::fs::create_dir_all(&trash_dir)?;
            for path in &paths {
                let dest = operations::resolve_collision(&trash_dir.join(entry_name(path)));
                operations::move_to(path, &dest)?;
            }
            Ok(())
        })
        .await
    }

    async fn delete_permanently(&self, path: &Path) -> Result<()> {
        let path = path.to_path_buf();
        blocking(move || operations::delete(&path)).await
    }

    async fn create_file(&self, path: &Path) -> Result<()> {
        let path = path.to_path_buf();
        blocking(move || operations::create_file(&path)).await
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        let path = path.to_path_buf();
        blocking(move || operations::create_dir(&path)).await
    }
}
