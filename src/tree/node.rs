use std::path::{Path, PathBuf};

use crate::fs::provider::{EntryKind, EntryStat, FileMeta, Permissions};

/// Stable handle of a node inside one [`TreeModel`](super::model::TreeModel) arena.
///
/// Ids are never reused while the node is alive; a stale id simply fails to
/// resolve once its node has been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Load state of a node's children. Unloaded is distinct from loaded-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Children {
    #[default]
    Unloaded,
    Loaded(Vec<NodeId>),
}

impl Children {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Children::Loaded(_))
    }

    /// Loaded child ids, empty when unloaded.
    pub fn ids(&self) -> &[NodeId] {
        match self {
            Children::Loaded(ids) => ids,
            Children::Unloaded => &[],
        }
    }
}

/// A node in the filesystem tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// `source:fullpath`, fixed at creation.
    pub uid: String,
    pub path: PathBuf,
    pub name: String,
    /// Depth below the root; the root is level 0.
    pub level: usize,
    pub kind: EntryKind,
    pub symlink: bool,
    pub hidden: bool,
    pub permissions: Permissions,
    pub meta: FileMeta,
    pub parent: Option<NodeId>,
    pub children: Children,
}

impl Node {
    /// Build a node from a classified entry.
    pub fn from_stat(source: &str, stat: EntryStat, level: usize, parent: Option<NodeId>) -> Self {
        let hidden = is_hidden_name(&stat.name);
        Self {
            uid: node_uid(source, &stat.path),
            path: stat.path,
            name: stat.name,
            level,
            kind: stat.kind,
            symlink: stat.symlink,
            hidden,
            permissions: stat.permissions,
            meta: stat.meta,
            parent,
            children: Children::Unloaded,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Readable but not writable.
    pub fn readonly(&self) -> bool {
        self.permissions.readable && !self.permissions.writable
    }

    /// Refresh the attributes that may change between listings.
    pub(crate) fn update_from(&mut self, stat: &EntryStat) {
        self.kind = stat.kind;
        self.symlink = stat.symlink;
        self.permissions = stat.permissions;
        self.meta = stat.meta.clone();
    }
}

/// Unique id of a path within a named source.
pub fn node_uid(source: &str, path: &Path) -> String {
    format!("{}:{}", source, path.display())
}

/// Dotfiles are hidden.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}
