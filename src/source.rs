//! One file source: a tree model plus the view state that belongs to it.
//!
//! Everything here is mutated only while the source's sync scope is held.
//! Renders read the published snapshot instead.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::Result;
use crate::fs::provider::FileSystem;
use crate::tree::expand_store::ExpandStore;
use crate::tree::model::TreeModel;
use crate::tree::node::NodeId;
use crate::view::projector::{flatten, FlatItem, FlattenOptions};

pub struct FileSource {
    name: String,
    model: TreeModel,
    flatten: FlattenOptions,
    selection: HashSet<PathBuf>,
    view: watch::Sender<Arc<[FlatItem]>>,
}

impl FileSource {
    /// Open `root` as source `name` and publish its first view.
    pub async fn open(
        name: &str,
        root: &Path,
        fs: &dyn FileSystem,
        expand_store: ExpandStore,
        flatten: FlattenOptions,
    ) -> Result<Self> {
        let model = TreeModel::open(name, root, fs, expand_store).await?;
        let (view, _) = watch::channel(Arc::from(Vec::new()));
        let mut source = Self {
            name: name.to_string(),
            model,
            flatten,
            selection: HashSet::new(),
            view,
        };
        source.publish();
        Ok(source)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &TreeModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut TreeModel {
        &mut self.model
    }

    pub fn root_path(&self) -> &Path {
        self.model.root_path()
    }

    /// Receiver of every published view.
    pub fn subscribe(&self) -> watch::Receiver<Arc<[FlatItem]>> {
        self.view.subscribe()
    }

    /// Last published view.
    pub fn view(&self) -> Arc<[FlatItem]> {
        self.view.borrow().clone()
    }

    pub fn show_hidden(&self) -> bool {
        self.flatten.show_hidden
    }

    pub fn set_show_hidden(&mut self, show: bool) {
        self.flatten.show_hidden = show;
    }

    pub fn selection(&self) -> &HashSet<PathBuf> {
        &self.selection
    }

    /// Flip the selection mark of `path`; returns whether it is now selected.
    pub fn toggle_selected(&mut self, path: &Path) -> bool {
        if self.selection.remove(path) {
            false
        } else {
            self.selection.insert(path.to_path_buf());
            true
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected nodes that are visible, in display order.
    pub fn selected_nodes(&self) -> Vec<NodeId> {
        if self.selection.is_empty() {
            return Vec::new();
        }
        self.view
            .borrow()
            .iter()
            .filter(|item| self.selection.contains(&item.path))
            .map(|item| item.id)
            .collect()
    }

    /// Rewrite selected paths after a rename.
    pub fn rename_selected(&mut self, from: &Path, to: &Path) {
        let moved: Vec<PathBuf> = self
            .selection
            .iter()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for path in moved {
            self.selection.remove(&path);
            if let Ok(rest) = path.strip_prefix(from) {
                self.selection.insert(to.join(rest));
            }
        }
    }

    /// Re-list the expanded part of the tree.
    pub async fn reload(&mut self, fs: &dyn FileSystem) -> Result<()> {
        let root = self.model.root();
        self.model.refresh(fs, root).await
    }

    /// Refresh the nearest loaded node of each changed path.
    pub async fn refresh_paths(&mut self, fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<()> {
        let root = self.model.root_path().to_path_buf();
        let mut targets: Vec<NodeId> = Vec::new();
        for path in paths {
            if !path.starts_with(&root) {
                continue;
            }
            let nearest = path.ancestors().find_map(|p| self.model.find(p));
            if let Some(id) = nearest {
                // a changed path refreshes its directory, not itself
                let dir = match self.model.node(id) {
                    Some(node) if node.is_dir() => id,
                    _ => self.model.parent(id).unwrap_or(id),
                };
                if !targets.contains(&dir) {
                    targets.push(dir);
                }
            }
        }
        for id in targets {
            if self.model.node(id).is_some() {
                self.model.refresh(fs, id).await?;
            }
        }
        Ok(())
    }

    /// Make `path` the new root, keeping sort settings and expand memory.
    pub async fn change_root(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<()> {
        let (sort_by, dirs_first) = (self.model.sort_by(), self.model.dirs_first());
        let store = self.model.expand_store().clone();
        let mut model = TreeModel::open(&self.name, path, fs, store).await?;
        model.set_sort(sort_by, dirs_first);
        tracing::debug!("source {} now rooted at {}", self.name, path.display());
        self.model = model;
        self.selection.clear();
        Ok(())
    }

    /// Flatten and publish. Selection entries whose node is gone are dropped.
    pub fn publish(&mut self) -> Arc<[FlatItem]> {
        let model = &self.model;
        self.selection.retain(|p| model.find(p).is_some());
        let items: Arc<[FlatItem]> = flatten(&self.model, self.flatten).into();
        self.view.send_replace(Arc::clone(&items));
        items
    }
}
