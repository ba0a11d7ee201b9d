//! Turn flattened items into surface lines with box-drawing connectors.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::fs::clipboard::{ClipboardOp, ClipboardState};
use crate::fs::provider::EntryKind;
use crate::view::projector::FlatItem;

/// Display switches for rendered lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub use_icons: bool,
}

/// Per-line state that is not part of the tree.
pub struct LineMarks<'a> {
    pub selection: &'a HashSet<PathBuf>,
    pub clipboard: &'a ClipboardState,
}

/// Render every item of one source.
pub fn render_lines(items: &[FlatItem], options: RenderOptions, marks: &LineMarks<'_>) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| render_line(items, idx, options, marks))
        .collect()
}

fn render_line(items: &[FlatItem], idx: usize, options: RenderOptions, marks: &LineMarks<'_>) -> String {
    let item = &items[idx];
    let prefix = build_prefix(items, idx);
    let selected = if marks.selection.contains(&item.path) { "● " } else { "" };
    let clip = match marks.clipboard.status(&item.path) {
        Some(ClipboardOp::Copy) => " (copy)",
        Some(ClipboardOp::Cut) => " (cut)",
        None => "",
    };
    let lock = if item.readonly { " [ro]" } else { "" };
    let slash = if item.is_dir() { "/" } else { "" };
    let link = if item.symlink && item.kind != EntryKind::Symlink { " @" } else { "" };
    format!(
        "{}{}{}{}{}{}{}{}",
        prefix,
        selected,
        indicator(item, options.use_icons),
        item.name,
        slash,
        link,
        lock,
        clip
    )
}

/// Indentation for `items[idx]`, drawn from its ancestors' last-sibling flags.
///
/// The top level of a source gets no connector; deeper levels walk back to
/// each ancestor to decide between a continuation bar and blank space.
fn build_prefix(items: &[FlatItem], idx: usize) -> String {
    let base = items.first().map(|i| i.level).unwrap_or(0);
    let item = &items[idx];
    let depth = item.level.saturating_sub(base);
    if depth == 0 {
        return String::new();
    }

    let mut parts: Vec<&str> = Vec::with_capacity(depth);
    for d in 1..depth {
        let mut ancestor_is_last = false;
        for prev in items[..idx].iter().rev() {
            let prev_depth = prev.level.saturating_sub(base);
            if prev_depth == d {
                ancestor_is_last = prev.is_last_in_level;
                break;
            }
            if prev_depth < d {
                break;
            }
        }
        parts.push(if ancestor_is_last { "   " } else { "│  " });
    }
    parts.push(if item.is_last_in_level { "└──" } else { "├──" });
    parts.join("")
}

fn indicator(item: &FlatItem, use_icons: bool) -> &'static str {
    if use_icons {
        match item.kind {
            EntryKind::Directory if item.expanded => "▾ ",
            EntryKind::Directory => "▸ ",
            EntryKind::Symlink => "↪ ",
            EntryKind::File => "· ",
        }
    } else {
        match item.kind {
            EntryKind::Directory if item.expanded => "[-] ",
            EntryKind::Directory => "[+] ",
            EntryKind::Symlink => "[L] ",
            EntryKind::File => "[F] ",
        }
    }
}
