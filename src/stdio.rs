//! Line-oriented collaborators: the surface prints to stdout, prompts read
//! answers from the shared stdin reader.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use file_tree_view::collab::{
    ConflictResolver, MemorySurface, NoticeLevel, Opener, PathPair, Prompter, Resolution,
    TextSurface,
};
use file_tree_view::{ExplorerError, Result};

use crate::event::LineReader;

async fn print(text: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

/// Keeps the lines in memory and prints them on every redraw, marking the
/// cursor row.
#[derive(Default)]
pub struct StdoutSurface {
    buffer: MemorySurface,
}

#[async_trait]
impl TextSurface for StdoutSurface {
    async fn cursor(&self) -> Result<usize> {
        self.buffer.cursor().await
    }

    async fn set_cursor(&self, line: usize, col: usize) -> Result<()> {
        self.buffer.set_cursor(line, col).await
    }

    async fn write_lines(&self, range: Range<usize>, lines: Vec<String>) -> Result<()> {
        self.buffer.write_lines(range, lines).await
    }

    async fn redraw(&self) -> Result<()> {
        let cursor = self.buffer.cursor_row();
        let mut out = String::new();
        for (idx, line) in self.buffer.lines().iter().enumerate() {
            let marker = if idx + 1 == cursor { '>' } else { ' ' };
            out.push_str(&format!("{marker}{:>4} {line}\n", idx + 1));
        }
        print(&out)
            .await
            .map_err(|e| ExplorerError::Surface(e.to_string()))
    }
}

pub struct StdioPrompter {
    input: Arc<LineReader>,
}

impl StdioPrompter {
    pub fn new(input: Arc<LineReader>) -> Self {
        Self { input }
    }
}

#[async_trait]
impl Prompter for StdioPrompter {
    async fn confirm(&self, message: &str) -> Result<bool> {
        print(&format!("{message} [y/N] ")).await?;
        let answer = self.input.next_line().await.unwrap_or_default();
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    async fn prompt_text(&self, label: &str, default: &str) -> Result<Option<String>> {
        if default.is_empty() {
            print(&format!("{label}: ")).await?;
        } else {
            print(&format!("{label} [{default}]: ")).await?;
        }
        let Some(answer) = self.input.next_line().await else {
            return Ok(None);
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok((!default.is_empty()).then(|| default.to_string()));
        }
        Ok(Some(answer.to_string()))
    }

    async fn notify(&self, level: NoticeLevel, message: &str) {
        let tag = match level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warn",
            NoticeLevel::Error => "error",
        };
        if let Err(e) = print(&format!("[{tag}] {message}\n")).await {
            tracing::warn!("notice lost: {}", e);
        }
    }
}

pub struct StdioResolver {
    input: Arc<LineReader>,
}

impl StdioResolver {
    pub fn new(input: Arc<LineReader>) -> Self {
        Self { input }
    }
}

#[async_trait]
impl ConflictResolver for StdioResolver {
    async fn resolve(&self, operation: &str, pair: &PathPair) -> Result<Resolution> {
        print(&format!(
            "{operation}: {} exists. [o]verwrite, [s]kip, [r]ename, [a]bort? ",
            pair.target.display()
        ))
        .await?;
        loop {
            let Some(answer) = self.input.next_line().await else {
                return Ok(Resolution::AbortAll);
            };
            match answer.trim() {
                "o" => return Ok(Resolution::Overwrite),
                "s" => return Ok(Resolution::Skip),
                "r" => return Ok(Resolution::Rename),
                "a" | "" => return Ok(Resolution::AbortAll),
                _ => print("o, s, r or a? ").await?,
            }
        }
    }
}

/// Opens files with the desktop's default application.
pub struct SystemOpener;

#[async_trait]
impl Opener for SystemOpener {
    async fn open(&self, path: &Path) -> Result<()> {
        let program = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
        tokio::process::Command::new(program)
            .arg(path)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;
        tracing::debug!("opened {} with {}", path.display(), program);
        Ok(())
    }
}
