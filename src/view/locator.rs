//! Maps surface rows to nodes and back.

use std::path::Path;
use std::sync::Arc;

use crate::view::projector::{layout, FlatItem, SourceRange};

/// A node found under a surface row.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    /// Registration index of the owning source.
    pub source_index: usize,
    pub source: &'a str,
    pub item: &'a FlatItem,
}

/// Index of one rendered surface: every source's range plus its items.
#[derive(Debug, Clone, Default)]
pub struct Locator {
    ranges: Vec<SourceRange>,
    items: Vec<Arc<[FlatItem]>>,
    offset: usize,
}

impl Locator {
    /// Lay out `sources` in registration order starting at `offset`.
    pub fn new(offset: usize, sources: Vec<(String, Arc<[FlatItem]>)>) -> Self {
        let ranges = layout(
            offset,
            sources.iter().map(|(name, items)| (name.as_str(), items.len())),
        );
        let items = sources.into_iter().map(|(_, items)| items).collect();
        Self {
            ranges,
            items,
            offset,
        }
    }

    pub fn ranges(&self) -> &[SourceRange] {
        &self.ranges
    }

    /// Items of the source at `index`.
    pub fn items(&self, index: usize) -> &[FlatItem] {
        self.items.get(index).map(|i| &i[..]).unwrap_or(&[])
    }

    /// First line after the last source.
    pub fn end(&self) -> usize {
        self.ranges.last().map(|r| r.end).unwrap_or(self.offset)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Node under the 1-indexed cursor `row`, if any.
    pub fn node_at(&self, row: usize) -> Option<Located<'_>> {
        let line = row.checked_sub(1)?;
        let idx = self.ranges.partition_point(|r| r.end <= line);
        let range = self.ranges.get(idx)?;
        if !range.contains(line) {
            return None;
        }
        let item = self.items.get(idx)?.get(line - range.start)?;
        Some(Located {
            source_index: idx,
            source: &range.source,
            item,
        })
    }

    /// 1-indexed row of the node with `uid` in `source`.
    ///
    /// Collapsed ancestors make a node invisible; this never expands them.
    pub fn line_of(&self, source: &str, uid: &str) -> Option<usize> {
        let idx = self.ranges.iter().position(|r| r.source == source)?;
        let pos = self.items[idx].iter().position(|i| i.uid == uid)?;
        Some(self.ranges[idx].start + pos + 1)
    }

    /// 1-indexed row of `path` inside the source at `index`.
    pub fn line_of_path(&self, index: usize, path: &Path) -> Option<usize> {
        let range = self.ranges.get(index)?;
        let pos = self.items.get(index)?.iter().position(|i| i.path == path)?;
        Some(range.start + pos + 1)
    }

    /// Row of `path`, or of its nearest visible ancestor.
    pub fn nearest_line(&self, index: usize, path: &Path) -> Option<usize> {
        path.ancestors()
            .find_map(|candidate| self.line_of_path(index, candidate))
    }
}
