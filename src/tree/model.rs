use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::error::{ExplorerError, Result};
use crate::fs::provider::{EntryStat, FileSystem};
use crate::tree::expand_store::ExpandStore;
use crate::tree::node::{Children, Node, NodeId};

/// Sort criteria for sibling lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// Case-aware alphabetical, default.
    #[default]
    Name,
    /// By file size (largest first).
    Size,
    /// By modification time (newest first).
    Modified,
}

impl SortBy {
    /// Parse sort_by from a config or action argument string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(SortBy::Name),
            "size" => Some(SortBy::Size),
            "modified" => Some(SortBy::Modified),
            _ => None,
        }
    }

    /// Get the display label for the current sort.
    pub fn label(&self) -> &'static str {
        match self {
            SortBy::Name => "Name",
            SortBy::Size => "Size",
            SortBy::Modified => "Modified",
        }
    }

    /// Cycle to the next sort option.
    pub fn next(&self) -> Self {
        match self {
            SortBy::Name => SortBy::Size,
            SortBy::Size => SortBy::Modified,
            SortBy::Modified => SortBy::Name,
        }
    }
}

/// Lowercase first so case only breaks ties.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare_nodes(a: &Node, b: &Node, sort_by: SortBy, dirs_first: bool) -> Ordering {
    let mut cmp = Ordering::Equal;
    if dirs_first {
        cmp = b.is_dir().cmp(&a.is_dir());
    }
    cmp.then_with(|| match sort_by {
        SortBy::Name => Ordering::Equal,
        SortBy::Size => b.meta.size.cmp(&a.meta.size),
        SortBy::Modified => b.meta.modified.cmp(&a.meta.modified),
    })
    .then_with(|| compare_names(&a.name, &b.name))
}

/// Node hierarchy for one root, stored as a flat arena.
///
/// Parents and children refer to each other by [`NodeId`]; slots of removed
/// nodes are never reused.
pub struct TreeModel {
    source: String,
    nodes: Vec<Option<Node>>,
    by_path: HashMap<PathBuf, NodeId>,
    root: NodeId,
    sort_by: SortBy,
    dirs_first: bool,
    expand_store: ExpandStore,
}

impl TreeModel {
    /// Stat `root_path`, mark it expanded and load its remembered subtree.
    pub async fn open(
        source: &str,
        root_path: &Path,
        fs: &dyn FileSystem,
        expand_store: ExpandStore,
    ) -> Result<Self> {
        let stat = fs.stat(root_path).await?;
        if !stat.is_dir() {
            return Err(ExplorerError::InvalidPath(format!(
                "{} is not a directory",
                root_path.display()
            )));
        }
        let root_node = Node::from_stat(source, stat, 0, None);
        let mut model = Self {
            source: source.to_string(),
            nodes: Vec::new(),
            by_path: HashMap::new(),
            root: NodeId(0),
            sort_by: SortBy::Name,
            dirs_first: true,
            expand_store,
        };
        model.root = model.insert(root_node);
        model.expand_store.expand(root_path);
        model.load_expanded(fs, model.root).await?;
        Ok(model)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_path(&self) -> &Path {
        self.node(self.root)
            .map(|n| n.path.as_path())
            .unwrap_or(Path::new(""))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(|slot| slot.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    /// Find a loaded node by path.
    pub fn find(&self, path: &Path) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.ids()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn expand_store(&self) -> &ExpandStore {
        &self.expand_store
    }

    /// Whether `id` is a directory marked expanded. The root always is.
    pub fn is_expanded(&self, id: NodeId) -> bool {
        match self.node(id) {
            Some(node) if node.is_dir() => {
                id == self.root || self.expand_store.is_expanded(&node.path)
            }
            _ => false,
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    pub fn dirs_first(&self) -> bool {
        self.dirs_first
    }

    /// Change sort criteria and re-sort every loaded sibling list.
    pub fn set_sort(&mut self, sort_by: SortBy, dirs_first: bool) {
        self.sort_by = sort_by;
        self.dirs_first = dirs_first;
        let loaded: Vec<NodeId> = self
            .by_path
            .values()
            .copied()
            .filter(|id| self.node(*id).is_some_and(|n| n.children.is_loaded()))
            .collect();
        for id in loaded {
            self.sort_children_of(id);
        }
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.by_path.insert(node.path.clone(), id);
        self.nodes.push(Some(node));
        id
    }

    /// Free `id` and everything below it.
    fn remove_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(|slot| slot.take()) {
                if self.by_path.get(&node.path) == Some(&current) {
                    self.by_path.remove(&node.path);
                }
                stack.extend(node.children.ids().iter().copied());
            }
        }
    }

    /// Forget the loaded children of `id`; its expand state is untouched.
    fn unload(&mut self, id: NodeId) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let Children::Loaded(ids) = std::mem::take(&mut node.children) else {
            return;
        };
        for child in ids {
            self.remove_subtree(child);
        }
    }

    fn sort_children_of(&mut self, id: NodeId) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let Children::Loaded(mut ids) = std::mem::take(&mut node.children) else {
            return;
        };
        let (sort_by, dirs_first) = (self.sort_by, self.dirs_first);
        ids.sort_by(|a, b| match (self.node(*a), self.node(*b)) {
            (Some(a), Some(b)) => compare_nodes(a, b, sort_by, dirs_first),
            _ => Ordering::Equal,
        });
        if let Some(node) = self.node_mut(id) {
            node.children = Children::Loaded(ids);
        }
    }

    /// Load the children of `id`, or of the root when `id` is `None`.
    ///
    /// A directory collapsed in the expand store yields nothing unless
    /// `force` is set. Unreadable entries are dropped with a warning.
    pub async fn load(
        &mut self,
        fs: &dyn FileSystem,
        id: Option<NodeId>,
        force: bool,
    ) -> Result<Vec<NodeId>> {
        let id = match id {
            Some(id) => id,
            None => {
                let root_path = self.root_path().to_path_buf();
                let stat = fs.stat(&root_path).await?;
                if let Some(root) = self.node_mut(self.root) {
                    root.update_from(&stat);
                }
                self.root
            }
        };
        let (path, level, is_dir) = match self.node(id) {
            Some(node) => (node.path.clone(), node.level, node.is_dir()),
            None => return Ok(Vec::new()),
        };
        if !is_dir {
            return Ok(Vec::new());
        }
        if !force && id != self.root && !self.expand_store.is_expanded(&path) {
            return Ok(Vec::new());
        }

        let listing = fs.list(&path).await?;
        let stats: Vec<EntryStat> = listing
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(stat) => Some(stat),
                Err(e) => {
                    tracing::warn!("dropping entry while listing {}: {}", path.display(), e);
                    None
                }
            })
            .collect();
        Ok(self.replace_children(id, level, stats))
    }

    /// Reconcile a fresh listing with the existing children of `id`.
    ///
    /// Surviving paths keep their node (and memoized subtree); vanished
    /// ones are removed from the arena.
    fn replace_children(&mut self, id: NodeId, level: usize, stats: Vec<EntryStat>) -> Vec<NodeId> {
        let previous: Vec<NodeId> = self.children(id).to_vec();
        let mut kept = HashSet::new();
        let mut fresh = Vec::with_capacity(stats.len());
        for stat in stats {
            match self.find(&stat.path) {
                Some(existing) if self.parent(existing) == Some(id) => {
                    if let Some(node) = self.node_mut(existing) {
                        node.update_from(&stat);
                    }
                    kept.insert(existing);
                    fresh.push(existing);
                }
                _ => {
                    let node = Node::from_stat(&self.source, stat, level + 1, Some(id));
                    fresh.push(self.insert(node));
                }
            }
        }
        for old in previous {
            if !kept.contains(&old) {
                self.remove_subtree(old);
            }
        }
        if let Some(node) = self.node_mut(id) {
            node.children = Children::Loaded(fresh);
        }
        self.sort_children_of(id);
        self.children(id).to_vec()
    }

    /// Load `id` and every remembered-expanded, not yet loaded directory below it.
    pub async fn load_expanded(&mut self, fs: &dyn FileSystem, id: NodeId) -> Result<()> {
        if !self.node(id).is_some_and(|n| n.children.is_loaded()) {
            self.load(fs, Some(id), true).await?;
        }
        let mut queue: VecDeque<NodeId> = self.children(id).iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            if !self.is_expanded(current) {
                continue;
            }
            let loaded = self.node(current).is_some_and(|n| n.children.is_loaded());
            if !loaded {
                if let Err(e) = self.load(fs, Some(current), false).await {
                    tracing::warn!("cannot restore expanded directory: {}", e);
                    continue;
                }
            }
            queue.extend(self.children(current).iter().copied());
        }
        Ok(())
    }

    /// Re-list `id` and every loaded, expanded directory beneath it.
    ///
    /// Collapsed directories below `id` drop their memoized children so the
    /// next expand lists them afresh. When `id` itself has vanished the
    /// refresh moves up to the nearest listable ancestor.
    pub async fn refresh(&mut self, fs: &dyn FileSystem, id: NodeId) -> Result<()> {
        let mut target = Some(id);
        while let Some(current) = target {
            match self.load(fs, Some(current), true).await {
                Ok(_) => break,
                Err(e) if current != self.root => {
                    tracing::debug!("refresh moving above unreadable directory: {}", e);
                    target = self.parent(current);
                }
                Err(e) => return Err(e),
            }
        }
        let Some(start) = target else {
            return Ok(());
        };

        let mut queue: VecDeque<NodeId> = self.children(start).iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            if !self.is_expanded(current) {
                self.unload(current);
                continue;
            }
            if let Err(e) = self.load(fs, Some(current), true).await {
                tracing::warn!("refresh skipped a directory: {}", e);
                continue;
            }
            queue.extend(self.children(current).iter().copied());
        }
        Ok(())
    }

    /// Mark `id` expanded, loading it unconditionally when needed, then
    /// restore remembered expansion below it.
    pub async fn expand(&mut self, fs: &dyn FileSystem, id: NodeId) -> Result<()> {
        let Some(node) = self.node(id) else {
            return Ok(());
        };
        if !node.is_dir() {
            return Ok(());
        }
        let path = node.path.clone();
        self.expand_store.expand(&path);
        self.load_expanded(fs, id).await
    }

    /// Mark `id` collapsed; its loaded children are kept.
    pub fn shrink(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        if let Some(node) = self.node(id) {
            if node.is_dir() {
                self.expand_store.shrink(&node.path);
            }
        }
    }

    /// Expand every directory below `id`, loading on demand.
    ///
    /// Hidden directories are skipped unless `show_hidden`, linked ones
    /// always; recursion stops `max_depth` levels below `id`.
    pub async fn expand_recursive(
        &mut self,
        fs: &dyn FileSystem,
        id: NodeId,
        show_hidden: bool,
        max_depth: usize,
    ) -> Result<()> {
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::from([(id, 0)]);
        while let Some((current, depth)) = queue.pop_front() {
            let Some(node) = self.node(current) else {
                continue;
            };
            if !node.is_dir() {
                continue;
            }
            let path = node.path.clone();
            let loaded = node.children.is_loaded();
            self.expand_store.expand(&path);
            if !loaded {
                if let Err(e) = self.load(fs, Some(current), true).await {
                    if current == id {
                        return Err(e);
                    }
                    tracing::warn!("expand skipped {}: {}", path.display(), e);
                    continue;
                }
            }
            if depth >= max_depth {
                continue;
            }
            for child in self.children(current) {
                let visible = self
                    .node(*child)
                    .is_some_and(|n| n.is_dir() && !n.symlink && (show_hidden || !n.hidden));
                if visible {
                    queue.push_back((*child, depth + 1));
                }
            }
        }
        Ok(())
    }

    /// Collapse `id` and every directory below it, loaded or not.
    pub fn shrink_recursive(&mut self, id: NodeId) {
        let Some(node) = self.node(id) else {
            return;
        };
        let path = node.path.clone();
        self.expand_store.shrink_below(&path);
        if id == self.root {
            self.expand_store.expand(&path);
        }
    }

    /// Expand the ancestors of `path` and return its node.
    ///
    /// Returns `None` when the path is outside the root or does not exist.
    pub async fn reveal(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<Option<NodeId>> {
        let root_path = self.root_path().to_path_buf();
        let Ok(relative) = path.strip_prefix(&root_path) else {
            return Ok(None);
        };
        let mut current = self.root;
        let mut current_path = root_path;
        for component in relative.components() {
            if !self.node(current).is_some_and(|n| n.children.is_loaded()) {
                self.load(fs, Some(current), true).await?;
            }
            self.expand_store.expand(&current_path);
            current_path.push(component);
            match self.find(&current_path) {
                Some(child) if self.parent(child) == Some(current) => current = child,
                _ => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Ids of `id` and its ancestors up to the root, innermost first.
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            chain.push(c);
            current = self.parent(c);
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::provider::LocalFs;
    use crate::testing::FlakyFs;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        fs::create_dir(dir.path().join("Beta")).unwrap();
        File::create(dir.path().join("file_a.txt")).unwrap();
        File::create(dir.path().join("File_b.rs")).unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        fs::create_dir(dir.path().join("alpha").join("nested")).unwrap();
        File::create(dir.path().join("alpha").join("inner.txt")).unwrap();
        File::create(dir.path().join("alpha").join("nested").join("deep.txt")).unwrap();
        dir
    }

    fn local(dir: &TempDir) -> LocalFs {
        LocalFs::new(dir.path().join(".trash-unused"))
    }

    fn names(model: &TreeModel, id: NodeId) -> Vec<String> {
        model
            .children(id)
            .iter()
            .map(|c| model.node(*c).unwrap().name.clone())
            .collect()
    }

    #[tokio::test]
    async fn open_loads_root_children_sorted() {
        let dir = setup_test_dir();
        let fs = local(&dir);
        let model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        assert_eq!(
            names(&model, model.root()),
            vec!["alpha", "Beta", ".hidden", "file_a.txt", "File_b.rs"]
        );
        let root = model.node(model.root()).unwrap();
        assert_eq!(root.level, 0);
        assert!(model.is_expanded(model.root()));
    }

    #[tokio::test]
    async fn open_rejects_a_file_root() {
        let dir = setup_test_dir();
        let fs = local(&dir);
        let result = TreeModel::open("file", &dir.path().join("file_a.txt"), &fs, ExpandStore::new()).await;
        assert!(matches!(result, Err(ExplorerError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn collapsed_directory_is_not_fetched() {
        let dir = setup_test_dir();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let alpha = model.find(&dir.path().join("alpha")).unwrap();
        let loaded = model.load(&fs, Some(alpha), false).await.unwrap();
        assert!(loaded.is_empty());
        assert!(!model.node(alpha).unwrap().children.is_loaded());

        let forced = model.load(&fs, Some(alpha), true).await.unwrap();
        assert_eq!(forced.len(), 2);
        assert_eq!(model.node(forced[0]).unwrap().level, 2);
    }

    #[tokio::test]
    async fn expand_then_shrink_keeps_children() {
        let dir = setup_test_dir();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let alpha = model.find(&dir.path().join("alpha")).unwrap();
        model.expand(&fs, alpha).await.unwrap();
        assert!(model.is_expanded(alpha));
        assert_eq!(names(&model, alpha), vec!["nested", "inner.txt"]);

        model.shrink(alpha);
        assert!(!model.is_expanded(alpha));
        assert!(model.node(alpha).unwrap().children.is_loaded());
    }

    #[tokio::test]
    async fn expand_state_survives_reopen() {
        let dir = setup_test_dir();
        let fs = local(&dir);
        let store = ExpandStore::new();
        {
            let mut model = TreeModel::open("file", dir.path(), &fs, store.clone())
                .await
                .unwrap();
            let alpha = model.find(&dir.path().join("alpha")).unwrap();
            model.expand(&fs, alpha).await.unwrap();
            let nested = model.find(&dir.path().join("alpha").join("nested")).unwrap();
            model.expand(&fs, nested).await.unwrap();
        }
        let model = TreeModel::open("file", dir.path(), &fs, store).await.unwrap();
        assert!(model
            .find(&dir.path().join("alpha").join("nested").join("deep.txt"))
            .is_some());
    }

    #[tokio::test]
    async fn bad_entries_are_dropped_not_fatal() {
        let dir = setup_test_dir();
        File::create(dir.path().join("broken_link")).unwrap();
        let fs = FlakyFs::new(local(&dir), "broken");
        let model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let listed = names(&model, model.root());
        assert!(!listed.contains(&"broken_link".to_string()));
        assert!(listed.contains(&"file_a.txt".to_string()));
    }

    #[tokio::test]
    async fn refresh_picks_up_new_and_removed_entries() {
        let dir = setup_test_dir();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let alpha = model.find(&dir.path().join("alpha")).unwrap();
        model.expand(&fs, alpha).await.unwrap();
        let removed = model.find(&dir.path().join("file_a.txt")).unwrap();

        fs::remove_file(dir.path().join("file_a.txt")).unwrap();
        File::create(dir.path().join("alpha").join("added.txt")).unwrap();
        model.refresh(&fs, model.root()).await.unwrap();

        assert!(model.find(&dir.path().join("file_a.txt")).is_none());
        assert!(model.node(removed).is_none());
        assert!(model.find(&dir.path().join("alpha").join("added.txt")).is_some());
        // alpha keeps its id across the refresh
        assert_eq!(model.find(&dir.path().join("alpha")), Some(alpha));
    }

    #[tokio::test]
    async fn refresh_forgets_children_of_collapsed_directories() {
        let dir = setup_test_dir();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let alpha = model.find(&dir.path().join("alpha")).unwrap();
        model.expand(&fs, alpha).await.unwrap();
        model.shrink(alpha);
        let inner = dir.path().join("alpha").join("inner.txt");
        assert!(model.find(&inner).is_some());

        fs::remove_file(&inner).unwrap();
        model.refresh(&fs, model.root()).await.unwrap();
        assert!(!model.node(alpha).unwrap().children.is_loaded());
        assert!(model.find(&inner).is_none());

        model.expand(&fs, alpha).await.unwrap();
        assert_eq!(names(&model, alpha), vec!["nested"]);
    }

    #[tokio::test]
    async fn refresh_of_vanished_directory_moves_to_parent() {
        let dir = setup_test_dir();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let beta = model.find(&dir.path().join("Beta")).unwrap();
        fs::remove_dir(dir.path().join("Beta")).unwrap();
        model.refresh(&fs, beta).await.unwrap();
        assert!(model.find(&dir.path().join("Beta")).is_none());
    }

    #[tokio::test]
    async fn expand_recursive_skips_hidden_and_respects_depth() {
        let dir = setup_test_dir();
        fs::create_dir(dir.path().join(".git")).unwrap();
        File::create(dir.path().join(".git").join("HEAD")).unwrap();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let root = model.root();
        model.expand_recursive(&fs, root, false, 16).await.unwrap();

        assert!(model.is_expanded(model.find(&dir.path().join("alpha").join("nested")).unwrap()));
        let git = model.find(&dir.path().join(".git")).unwrap();
        assert!(!model.is_expanded(git));

        let mut shallow = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let root = shallow.root();
        shallow.expand_recursive(&fs, root, false, 1).await.unwrap();
        let alpha = shallow.find(&dir.path().join("alpha")).unwrap();
        assert!(shallow.is_expanded(alpha));
        let nested = shallow.find(&dir.path().join("alpha").join("nested")).unwrap();
        assert!(!shallow.is_expanded(nested));
    }

    #[tokio::test]
    async fn shrink_recursive_collapses_everything_below() {
        let dir = setup_test_dir();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let root = model.root();
        model.expand_recursive(&fs, root, true, 16).await.unwrap();
        model.shrink_recursive(root);
        assert!(model.is_expanded(root));
        let alpha = model.find(&dir.path().join("alpha")).unwrap();
        assert!(!model.is_expanded(alpha));
        let nested = model.find(&dir.path().join("alpha").join("nested")).unwrap();
        assert!(!model.is_expanded(nested));
    }

    #[tokio::test]
    async fn reveal_expands_ancestors() {
        let dir = setup_test_dir();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let target = dir.path().join("alpha").join("nested").join("deep.txt");
        let found = model.reveal(&fs, &target).await.unwrap().unwrap();
        assert_eq!(model.node(found).unwrap().path, target);
        let nested = model.find(&dir.path().join("alpha").join("nested")).unwrap();
        assert!(model.is_expanded(nested));
        assert_eq!(model.ancestry(found).len(), 4);
    }

    #[tokio::test]
    async fn reveal_missing_path_is_none() {
        let dir = setup_test_dir();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let missing = dir.path().join("alpha").join("ghost.txt");
        assert!(model.reveal(&fs, &missing).await.unwrap().is_none());
        assert!(model.reveal(&fs, Path::new("/definitely/elsewhere")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sort_by_size_keeps_dirs_first() {
        let dir = setup_test_dir();
        fs::write(dir.path().join("file_a.txt"), "small").unwrap();
        fs::write(dir.path().join("File_b.rs"), "this is a much larger file content").unwrap();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        model.set_sort(SortBy::Size, true);
        let listed = names(&model, model.root());
        let mut dirs = listed[..2].to_vec();
        dirs.sort();
        assert_eq!(dirs, vec!["Beta", "alpha"]);
        let b = listed.iter().position(|n| n == "File_b.rs").unwrap();
        let a = listed.iter().position(|n| n == "file_a.txt").unwrap();
        assert!(b < a);
    }

    #[test]
    fn sort_cycle() {
        assert_eq!(SortBy::Name.next(), SortBy::Size);
        assert_eq!(SortBy::Size.next(), SortBy::Modified);
        assert_eq!(SortBy::Modified.next(), SortBy::Name);
        assert_eq!(SortBy::parse("size"), Some(SortBy::Size));
        assert_eq!(SortBy::parse("color"), None);
    }

    #[test]
    fn names_compare_case_aware() {
        assert_eq!(compare_names("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_names("B", "b"), Ordering::Less);
        assert_eq!(compare_names("same", "same"), Ordering::Equal);
    }
}
