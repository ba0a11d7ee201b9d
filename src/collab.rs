//! Narrow interfaces to the collaborators the engine drives but does not own:
//! the line-addressed text surface, user prompts, overwrite resolution and
//! the system opener.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::Result;

/// A scrollable, line-addressed text surface shared by every source.
#[async_trait]
pub trait TextSurface: Send + Sync {
    /// Current cursor row, 1-indexed.
    async fn cursor(&self) -> Result<usize>;

    /// Move the cursor to a 1-indexed row and 0-indexed column.
    async fn set_cursor(&self, line: usize, col: usize) -> Result<()>;

    /// Replace the 0-indexed, half-open `range` of lines with `lines`.
    async fn write_lines(&self, range: Range<usize>, lines: Vec<String>) -> Result<()>;

    async fn redraw(&self) -> Result<()>;
}

/// Severity of a user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User input and confirmation.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask a yes/no question. Only an explicit yes returns `true`.
    async fn confirm(&self, message: &str) -> Result<bool>;

    /// Ask for a line of text. `None` means the user cancelled.
    async fn prompt_text(&self, label: &str, default: &str) -> Result<Option<String>>;

    /// Show a short message.
    async fn notify(&self, level: NoticeLevel, message: &str);
}

/// One planned `(source?, target)` mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPair {
    pub source: Option<PathBuf>,
    pub target: PathBuf,
}

impl PathPair {
    pub fn new(source: Option<PathBuf>, target: PathBuf) -> Self {
        Self { source, target }
    }
}

/// Answer to an existing-target conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Replace the existing target.
    Overwrite,
    /// Leave this pair alone, continue with the rest.
    Skip,
    /// Keep both by choosing a collision-free target name.
    Rename,
    /// Cancel the whole batch before anything is mutated.
    AbortAll,
}

/// Decides what to do when a rename/copy/paste target already exists.
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    async fn resolve(&self, operation: &str, pair: &PathPair) -> Result<Resolution>;
}

/// Opens a file with the system application.
#[async_trait]
pub trait Opener: Send + Sync {
    async fn open(&self, path: &Path) -> Result<()>;
}

/// In-memory [`TextSurface`].
#[derive(Debug)]
pub struct MemorySurface {
    lines: Mutex<Vec<String>>,
    cursor: Mutex<(usize, usize)>,
    redraws: AtomicUsize,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
            cursor: Mutex::new((1, 0)),
            redraws: AtomicUsize::new(0),
        }
    }
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn lines_lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cursor_lock(&self) -> MutexGuard<'_, (usize, usize)> {
        self.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines_lock().clone()
    }

    /// Cursor row without going through the async trait.
    pub fn cursor_row(&self) -> usize {
        self.cursor_lock().0
    }

    pub fn redraw_count(&self) -> usize {
        self.redraws.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TextSurface for MemorySurface {
    async fn cursor(&self) -> Result<usize> {
        Ok(self.cursor_row())
    }

    async fn set_cursor(&self, line: usize, col: usize) -> Result<()> {
        *self.cursor_lock() = (line.max(1), col);
        Ok(())
    }

    async fn write_lines(&self, range: Range<usize>, lines: Vec<String>) -> Result<()> {
        let mut buffer = self.lines_lock();
        let start = range.start.min(buffer.len());
        let end = range.end.clamp(start, buffer.len());
        buffer.splice(start..end, lines);
        Ok(())
    }

    async fn redraw(&self) -> Result<()> {
        self.redraws.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
