use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};

/// One parsed input line: an action name and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    /// Split a line on whitespace; blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let mut words = line.split_whitespace().map(str::to_string);
        let name = words.next()?;
        Some(Self {
            name,
            args: words.collect(),
        })
    }
}

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// A command typed by the user.
    Command(Command),
    /// Filesystem change detected by the watcher.
    FsChange(Vec<PathBuf>),
    /// Input closed.
    Eof,
}

/// Lines from stdin, shared by the command loop and the prompts.
pub struct LineReader {
    rx: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl LineReader {
    /// Spawn the stdin reader task.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("stdin read failed: {}", e);
                        break;
                    }
                }
            }
        });
        Self { rx: Mutex::new(rx) }
    }

    /// Next line, or `None` once stdin is closed.
    pub async fn next_line(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }
}

/// Merges user commands with watcher notifications.
pub struct EventHandler {
    fs_rx: mpsc::UnboundedReceiver<Vec<PathBuf>>,
    fs_tx: mpsc::UnboundedSender<Vec<PathBuf>>,
}

impl Default for EventHandler {
    fn default() -> Self {
        let (fs_tx, fs_rx) = mpsc::unbounded_channel();
        Self { fs_rx, fs_tx }
    }
}

impl EventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sender the watcher reports changes through.
    pub fn fs_sender(&self) -> mpsc::UnboundedSender<Vec<PathBuf>> {
        self.fs_tx.clone()
    }

    /// Wait for the next command or change batch.
    pub async fn next(&mut self, input: &LineReader) -> Event {
        loop {
            tokio::select! {
                line = input.next_line() => match line {
                    Some(line) => {
                        if let Some(command) = Command::parse(&line) {
                            return Event::Command(command);
                        }
                    }
                    None => return Event::Eof,
                },
                Some(paths) = self.fs_rx.recv() => return Event::FsChange(paths),
            }
        }
    }
}
