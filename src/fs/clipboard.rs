use std::path::{Path, PathBuf};

/// The type of clipboard operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOp {
    Copy,
    Cut,
}

/// How a selection is merged into the copy or cut set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkMode {
    /// Add unmarked paths, remove already-marked ones.
    #[default]
    Toggle,
    /// Union only.
    Append,
    /// Clear both sets, then mark exactly the given paths.
    Replace,
}

impl MarkMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "toggle" => Some(MarkMode::Toggle),
            "append" => Some(MarkMode::Append),
            "replace" => Some(MarkMode::Replace),
            _ => None,
        }
    }
}

/// What happens to the copy set once a paste completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasteMode {
    /// Clear the copy set after pasting.
    #[default]
    Clear,
    /// Leave the copy set intact for repeated pasting.
    KeepCopy,
}

impl PasteMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clear" => Some(PasteMode::Clear),
            "keep_copy" | "keepCopy" => Some(PasteMode::KeepCopy),
            _ => None,
        }
    }
}

/// Copy-set and cut-set of marked paths, in marking order.
#[derive(Debug, Clone, Default)]
pub struct ClipboardState {
    copied: Vec<PathBuf>,
    cutted: Vec<PathBuf>,
}

impl ClipboardState {
    /// Create a new empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `paths` for copying.
    pub fn copy_files(&mut self, paths: &[PathBuf], mode: MarkMode) {
        self.mark(ClipboardOp::Copy, paths, mode);
    }

    /// Mark `paths` for moving.
    pub fn cut_files(&mut self, paths: &[PathBuf], mode: MarkMode) {
        self.mark(ClipboardOp::Cut, paths, mode);
    }

    fn mark(&mut self, op: ClipboardOp, paths: &[PathBuf], mode: MarkMode) {
        if mode == MarkMode::Replace {
            self.copied.clear();
            self.cutted.clear();
        }
        let set = match op {
            ClipboardOp::Copy => &mut self.copied,
            ClipboardOp::Cut => &mut self.cutted,
        };
        let mut seen: Vec<&PathBuf> = Vec::with_capacity(paths.len());
        for path in paths {
            if seen.contains(&path) {
                continue;
            }
            seen.push(path);
            match set.iter().position(|p| p == path) {
                Some(idx) if mode == MarkMode::Toggle => {
                    set.remove(idx);
                }
                Some(_) => {}
                None => set.push(path.clone()),
            }
        }
    }

    pub fn copied(&self) -> &[PathBuf] {
        &self.copied
    }

    pub fn cutted(&self) -> &[PathBuf] {
        &self.cutted
    }

    /// Whether both sets are empty.
    pub fn is_empty(&self) -> bool {
        self.copied.is_empty() && self.cutted.is_empty()
    }

    /// Number of marked paths across both sets.
    pub fn len(&self) -> usize {
        self.copied.len() + self.cutted.len()
    }

    /// Clear the clipboard.
    pub fn clear(&mut self) {
        self.copied.clear();
        self.cutted.clear();
    }

    /// Mark state of a path, for display. Cut takes precedence.
    pub fn status(&self, path: &Path) -> Option<ClipboardOp> {
        if self.cutted.iter().any(|p| p == path) {
            Some(ClipboardOp::Cut)
        } else if self.copied.iter().any(|p| p == path) {
            Some(ClipboardOp::Copy)
        } else {
            None
        }
    }

    /// Apply the post-paste clearing rules.
    pub fn finish_paste(&mut self, mode: PasteMode) {
        self.cutted.clear();
        if mode == PasteMode::Clear {
            self.copied.clear();
        }
    }

    /// Drop marked paths at or below any of `removed`.
    pub fn forget(&mut self, removed: &[PathBuf]) {
        let gone = |p: &PathBuf| removed.iter().any(|r| p.starts_with(r));
        self.copied.retain(|p| !gone(p));
        self.cutted.retain(|p| !gone(p));
    }

    /// Rewrite marked paths after `from` was renamed to `to`.
    pub fn rename(&mut self, from: &Path, to: &Path) {
        for path in self.copied.iter_mut().chain(self.cutted.iter_mut()) {
            if let Ok(rest) = path.strip_prefix(from) {
                *path = to.join(rest);
            }
        }
    }
}
