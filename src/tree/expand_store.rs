//! Path-keyed expand/collapse memory shared by every tree of a session.
//!
//! Entries are added on expand and flipped on collapse, never removed, so a
//! directory visited once keeps its state across reloads and root changes.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ExplorerError, Result};

/// Cloneable handle to one session's expand state.
#[derive(Debug, Clone, Default)]
pub struct ExpandStore {
    inner: Arc<Mutex<HashMap<PathBuf, bool>>>,
}

impl ExpandStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, bool>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Absent paths are collapsed.
    pub fn is_expanded(&self, path: &Path) -> bool {
        self.lock().get(path).copied().unwrap_or(false)
    }

    pub fn set(&self, path: &Path, expanded: bool) {
        self.lock().insert(path.to_path_buf(), expanded);
    }

    pub fn expand(&self, path: &Path) {
        self.set(path, true);
    }

    pub fn shrink(&self, path: &Path) {
        self.set(path, false);
    }

    /// Collapse `path` and every remembered path below it, loaded or not.
    pub fn shrink_below(&self, path: &Path) {
        let mut map = self.lock();
        for (key, value) in map.iter_mut() {
            if key.starts_with(path) {
                *value = false;
            }
        }
        map.insert(path.to_path_buf(), false);
    }

    /// Carry the state of `from` and its descendants over to `to`.
    ///
    /// The old entries are flipped to collapsed rather than dropped.
    pub fn rename_prefix(&self, from: &Path, to: &Path) {
        let mut map = self.lock();
        let moved: Vec<(PathBuf, bool)> = map
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(from)
                    .ok()
                    .map(|rest| (to.join(rest), *value))
            })
            .collect();
        for (key, value) in map.iter_mut() {
            if key.starts_with(from) {
                *value = false;
            }
        }
        map.extend(moved);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sorted copy of every entry.
    pub fn entries(&self) -> Vec<(PathBuf, bool)> {
        let map = self.lock();
        let sorted: BTreeMap<&PathBuf, &bool> = map.iter().collect();
        sorted.into_iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// Write the store to a JSON file.
    pub fn save(&self, file: &Path) -> Result<()> {
        let snapshot: BTreeMap<PathBuf, bool> = self.entries().into_iter().collect();
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| ExplorerError::State(e.to_string()))?;
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(file, json)?;
        Ok(())
    }

    /// Read a store previously written by [`save`](Self::save).
    ///
    /// A missing file yields an empty store.
    pub fn load(file: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(file) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        let map: HashMap<PathBuf, bool> =
            serde_json::from_str(&content).map_err(|e| ExplorerError::State(e.to_string()))?;
        tracing::debug!("loaded {} expand entries from {}", map.len(), file.display());
        Ok(Self {
            inner: Arc::new(Mutex::new(map)),
        })
    }
}
