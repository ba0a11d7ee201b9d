//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use crate::collab::{
    ConflictResolver, MemorySurface, NoticeLevel, Opener, PathPair, Prompter, Resolution,
};
use crate::error::{ExplorerError, Result};
use crate::explorer::{Collaborators, Explorer, ExplorerOptions};
use crate::fs::provider::{EntryStat, FileSystem, LocalFs};
use crate::tree::expand_store::ExpandStore;

/// Local filesystem whose listings fail for entries containing `poison`.
pub struct FlakyFs {
    inner: LocalFs,
    poison: String,
}

impl FlakyFs {
    pub fn new(inner: LocalFs, poison: &str) -> Self {
        Self {
            inner,
            poison: poison.to_string(),
        }
    }
}

#[async_trait]
impl FileSystem for FlakyFs {
    async fn stat(&self, path: &Path) -> Result<EntryStat> {
        self.inner.stat(path).await
    }

    async fn list(&self, path: &Path) -> Result<Vec<Result<EntryStat>>> {
        let entries = self.inner.list(path).await?;
        Ok(entries
            .into_iter()
            .map(|entry| match entry {
                Ok(stat) if stat.name.contains(&self.poison) => Err(ExplorerError::ListEntry {
                    path: stat.path,
                    reason: "injected failure".into(),
                }),
                other => other,
            })
            .collect())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path).await
    }

    async fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        if src.to_string_lossy().contains(&self.poison) {
            return Err(ExplorerError::Io(std::io::Error::other("injected copy failure")));
        }
        self.inner.copy(src, dst).await
    }

    async fn move_to(&self, src: &Path, dst: &Path) -> Result<()> {
        self.inner.move_to(src, dst).await
    }

    async fn trash(&self, paths: &[PathBuf]) -> Result<()> {
        self.inner.trash(paths).await
    }

    async fn delete_permanently(&self, path: &Path) -> Result<()> {
        self.inner.delete_permanently(path).await
    }

    async fn create_file(&self, path: &Path) -> Result<()> {
        self.inner.create_file(path).await
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        self.inner.create_dir(path).await
    }
}

/// Prompter answering from queues and recording notices.
#[derive(Default)]
pub struct ScriptedPrompter {
    confirms: Mutex<VecDeque<bool>>,
    texts: Mutex<VecDeque<Option<String>>>,
    pub notices: Mutex<Vec<(NoticeLevel, String)>>,
    pub questions: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_confirm(&self, yes: bool) {
        self.confirms.lock().unwrap().push_back(yes);
    }

    pub fn answer_text(&self, text: Option<&str>) {
        self.texts.lock().unwrap().push_back(text.map(str::to_string));
    }

    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, message: &str) -> Result<bool> {
        self.questions.lock().unwrap().push(message.to_string());
        Ok(self.confirms.lock().unwrap().pop_front().unwrap_or(false))
    }

    async fn prompt_text(&self, label: &str, _default: &str) -> Result<Option<String>> {
        self.questions.lock().unwrap().push(label.to_string());
        Ok(self.texts.lock().unwrap().pop_front().flatten())
    }

    async fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().unwrap().push((level, message.to_string()));
    }
}

/// Resolver answering from a queue, then a fallback.
pub struct ScriptedResolver {
    answers: Mutex<VecDeque<Resolution>>,
    fallback: Resolution,
    pub asked: Mutex<Vec<PathPair>>,
}

impl ScriptedResolver {
    pub fn always(fallback: Resolution) -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            fallback,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, answer: Resolution) -> Self {
        self.answers.lock().unwrap().push_back(answer);
        self
    }

    pub fn asked(&self) -> Vec<PathPair> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConflictResolver for ScriptedResolver {
    async fn resolve(&self, _operation: &str, pair: &PathPair) -> Result<Resolution> {
        self.asked.lock().unwrap().push(pair.clone());
        Ok(self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback))
    }
}

/// Opener recording every opened path.
#[derive(Default)]
pub struct RecordingOpener {
    pub opened: Mutex<Vec<PathBuf>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl Opener for RecordingOpener {
    async fn open(&self, path: &Path) -> Result<()> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// An explorer over `dir/root` with in-memory collaborators.
pub struct Harness {
    pub explorer: Explorer,
    pub surface: Arc<MemorySurface>,
    pub prompter: Arc<ScriptedPrompter>,
    pub opener: Arc<RecordingOpener>,
    pub resolver: Arc<ScriptedResolver>,
}

pub async fn harness(dir: &TempDir, options: ExplorerOptions, resolver: ScriptedResolver) -> Harness {
    let surface = Arc::new(MemorySurface::new());
    let prompter = Arc::new(ScriptedPrompter::new());
    let opener = Arc::new(RecordingOpener::default());
    let resolver = Arc::new(resolver);
    let collab = Collaborators {
        fs: Arc::new(LocalFs::new(dir.path().join(".trash"))),
        surface: surface.clone(),
        prompter: prompter.clone(),
        resolver: resolver.clone(),
        opener: opener.clone(),
    };
    let mut explorer = Explorer::new(collab, options, ExpandStore::new()).unwrap();
    explorer.add_source("file", &dir.path().join("root")).await.unwrap();
    explorer.render().await.unwrap();
    Harness {
        explorer,
        surface,
        prompter,
        opener,
        resolver,
    }
}
