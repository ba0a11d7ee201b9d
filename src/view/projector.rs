//! Flatten the expanded part of a tree into an ordered line sequence and lay
//! several sources out on one surface.

use std::path::PathBuf;

use crate::fs::provider::EntryKind;
use crate::tree::model::TreeModel;
use crate::tree::node::NodeId;

/// A flattened tree item for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatItem {
    pub id: NodeId,
    pub uid: String,
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub symlink: bool,
    pub level: usize,
    pub expanded: bool,
    pub hidden: bool,
    pub readonly: bool,
    /// First of its visible siblings.
    pub is_first_in_level: bool,
    /// Last of its visible siblings; drives the connector glyph.
    pub is_last_in_level: bool,
}

impl FlatItem {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Visibility switches applied while flattening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenOptions {
    pub show_hidden: bool,
    /// Emit the root itself as the first item.
    pub show_root: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            show_hidden: false,
            show_root: true,
        }
    }
}

/// Depth-first, pre-order sequence of the visible nodes of `model`.
///
/// A directory's children follow it only when it is expanded; hidden entries
/// are removed before the first/last flags are assigned.
pub fn flatten(model: &TreeModel, options: FlattenOptions) -> Vec<FlatItem> {
    let mut items = Vec::with_capacity(model.len());
    let mut stack: Vec<(NodeId, bool, bool)> = Vec::new();
    if options.show_root {
        stack.push((model.root(), true, true));
    } else {
        push_visible_children(model, model.root(), options.show_hidden, &mut stack);
    }

    while let Some((id, first, last)) = stack.pop() {
        let Some(node) = model.node(id) else {
            continue;
        };
        let expanded = model.is_expanded(id);
        items.push(FlatItem {
            id,
            uid: node.uid.clone(),
            name: node.name.clone(),
            path: node.path.clone(),
            kind: node.kind,
            symlink: node.symlink,
            level: node.level,
            expanded,
            hidden: node.hidden,
            readonly: node.readonly(),
            is_first_in_level: first,
            is_last_in_level: last,
        });
        if expanded {
            push_visible_children(model, id, options.show_hidden, &mut stack);
        }
    }
    items
}

/// Push the visible children of `id` so they pop in sibling order.
fn push_visible_children(
    model: &TreeModel,
    id: NodeId,
    show_hidden: bool,
    stack: &mut Vec<(NodeId, bool, bool)>,
) {
    let visible: Vec<NodeId> = model
        .children(id)
        .iter()
        .copied()
        .filter(|child| {
            model
                .node(*child)
                .is_some_and(|n| show_hidden || !n.hidden)
        })
        .collect();
    let count = visible.len();
    for (i, child) in visible.into_iter().enumerate().rev() {
        stack.push((child, i == 0, i + 1 == count));
    }
}

/// Half-open line interval `[start, end)` owned by one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRange {
    pub source: String,
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether the 0-indexed `line` falls inside the range.
    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line < self.end
    }
}

/// Assign contiguous ranges to `(source, line count)` pairs in order,
/// starting at `offset`.
pub fn layout<'a, I>(offset: usize, sources: I) -> Vec<SourceRange>
where
    I: IntoIterator<Item = (&'a str, usize)>,
{
    let mut start = offset;
    sources
        .into_iter()
        .map(|(source, len)| {
            let range = SourceRange {
                source: source.to_string(),
                start,
                end: start + len,
            };
            start = range.end;
            range
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::provider::LocalFs;
    use crate::tree::expand_store::ExpandStore;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn local(dir: &TempDir) -> LocalFs {
        LocalFs::new(dir.path().join(".trash-unused"))
    }

    fn names(items: &[FlatItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    fn children_only() -> FlattenOptions {
        FlattenOptions {
            show_hidden: false,
            show_root: false,
        }
    }

    #[tokio::test]
    async fn expanding_a_directory_inserts_its_children() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        File::create(dir.path().join("a").join("c.txt")).unwrap();
        File::create(dir.path().join("b.txt")).unwrap();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();

        let items = flatten(&model, children_only());
        assert_eq!(names(&items), vec!["a", "b.txt"]);

        let a = model.find(&dir.path().join("a")).unwrap();
        model.expand(&fs, a).await.unwrap();
        let items = flatten(&model, children_only());
        assert_eq!(names(&items), vec!["a", "c.txt", "b.txt"]);
        assert!(!items[0].is_last_in_level);
        assert!(items[2].is_last_in_level);
        assert!(items[1].is_first_in_level && items[1].is_last_in_level);
        assert_eq!(items[1].level, 2);
    }

    #[tokio::test]
    async fn root_is_line_zero_when_shown() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("only.txt")).unwrap();
        let fs = local(&dir);
        let model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let items = flatten(&model, FlattenOptions::default());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, model.root());
        assert_eq!(items[0].level, 0);
        assert!(items[0].expanded);
        assert_eq!(items[1].name, "only.txt");
    }

    #[tokio::test]
    async fn flatten_is_deterministic() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("x").join("y")).unwrap();
        File::create(dir.path().join("x").join("y").join("z.rs")).unwrap();
        File::create(dir.path().join("top.md")).unwrap();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let root = model.root();
        model.expand_recursive(&fs, root, false, 8).await.unwrap();
        let first = flatten(&model, FlattenOptions::default());
        let second = flatten(&model, FlattenOptions::default());
        assert_eq!(first, second);
        assert_eq!(names(&first)[1..], ["x", "y", "z.rs", "top.md"]);
    }

    #[tokio::test]
    async fn hidden_siblings_never_get_edge_flags() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join(".aaa")).unwrap();
        File::create(dir.path().join("middle")).unwrap();
        File::create(dir.path().join("zzz")).unwrap();
        File::create(dir.path().join(".zzz")).unwrap();
        let fs = local(&dir);
        let model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();

        let shown = flatten(
            &model,
            FlattenOptions {
                show_hidden: true,
                show_root: false,
            },
        );
        assert_eq!(shown.len(), 4);
        assert!(shown[0].hidden && shown[0].is_first_in_level);

        let filtered = flatten(&model, children_only());
        assert_eq!(names(&filtered), vec!["middle", "zzz"]);
        assert!(filtered[0].is_first_in_level);
        assert!(filtered[1].is_last_in_level);
        let removed: Vec<&str> = shown
            .iter()
            .filter(|i| !filtered.iter().any(|f| f.id == i.id))
            .map(|i| i.name.as_str())
            .collect();
        assert!(shown
            .iter()
            .filter(|i| i.hidden)
            .all(|i| removed.contains(&i.name.as_str())));
    }

    #[tokio::test]
    async fn collapsed_directory_keeps_children_out() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("d")).unwrap();
        File::create(dir.path().join("d").join("inner")).unwrap();
        let fs = local(&dir);
        let mut model = TreeModel::open("file", dir.path(), &fs, ExpandStore::new())
            .await
            .unwrap();
        let d = model.find(&dir.path().join("d")).unwrap();
        model.expand(&fs, d).await.unwrap();
        model.shrink(d);
        let items = flatten(&model, children_only());
        assert_eq!(names(&items), vec!["d"]);
        assert!(!items[0].expanded);
    }

    #[test]
    fn layout_is_contiguous_from_offset() {
        let ranges = layout(2, [("file", 3), ("empty", 0), ("buffers", 4)]);
        assert_eq!(ranges[0], SourceRange { source: "file".into(), start: 2, end: 5 });
        assert!(ranges[1].is_empty());
        assert_eq!(ranges[1].start, 5);
        assert_eq!(ranges[2].start, 5);
        assert_eq!(ranges[2].end, 9);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert!(ranges[2].contains(8));
        assert!(!ranges[2].contains(9));
    }
}
