//! The built-in action set.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::guard::{self, Transfer, TransferKind};
use super::{
    ActionContext, ActionDescriptor, ActionHandler, ActionOptions, ActionRegistry, MultiHandler,
    NoTargetHandler, NodeHandler,
};
use crate::collab::NoticeLevel;
use crate::config::OpenDirectory;
use crate::error::{ExplorerError, Result};
use crate::fs::clipboard::{ClipboardOp, MarkMode};
use crate::tree::model::{SortBy, TreeModel};
use crate::tree::node::NodeId;

impl ActionRegistry {
    /// A registry holding every built-in action.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        register_builtins(&mut registry)?;
        Ok(registry)
    }
}

pub fn register_builtins(registry: &mut ActionRegistry) -> Result<()> {
    let render = ActionOptions::RENDER;
    let reload = ActionOptions::RELOAD;

    // view
    registry.register(
        ActionDescriptor::new("refresh", "Reload every source from disk").options(reload),
        ActionHandler::NoTarget(Arc::new(Refresh)),
    )?;
    registry.register(
        ActionDescriptor::new("toggleHidden", "Show or hide dotfiles").options(render),
        ActionHandler::NoTarget(Arc::new(ToggleHidden)),
    )?;
    registry.register(
        ActionDescriptor::new("collapseAll", "Collapse every directory").options(render),
        ActionHandler::NoTarget(Arc::new(CollapseAll)),
    )?;
    registry.register(
        ActionDescriptor::new("sortBy", "Change the sort order")
            .options(render)
            .arg("key", "name, size or modified; cycles when omitted")
            .menu("n", "name")
            .menu("s", "size")
            .menu("m", "modified"),
        ActionHandler::NoTarget(Arc::new(Sort)),
    )?;
    registry.register(
        ActionDescriptor::new("clearSelection", "Unselect every node").options(render),
        ActionHandler::NoTarget(Arc::new(ClearSelection)),
    )?;
    registry.register(
        ActionDescriptor::new("reveal", "Expand down to a path and focus it")
            .options(render)
            .arg("path", "absolute, or relative to the root"),
        ActionHandler::NoTarget(Arc::new(Reveal)),
    )?;

    // navigation
    registry.register(
        ActionDescriptor::new("gotoParent", "Make the parent of the root the new root").options(render),
        ActionHandler::Root(Arc::new(GotoParent)),
    )?;
    registry.register(
        ActionDescriptor::new("cd", "Make the directory the new root").options(render),
        ActionHandler::Single(Arc::new(Cd)),
    )?;
    registry.register(
        ActionDescriptor::new("open", "Open a file, or enter a directory").options(render),
        ActionHandler::Single(Arc::new(Open)),
    )?;
    registry.register(
        ActionDescriptor::new("expand", "Expand a directory").options(render),
        ActionHandler::Single(Arc::new(Expand)),
    )?;
    registry.register(
        ActionDescriptor::new("collapse", "Collapse a directory, or the parent of a file").options(render),
        ActionHandler::Single(Arc::new(Collapse)),
    )?;
    registry.register(
        ActionDescriptor::new("expandRecursive", "Expand a directory and everything below").options(render),
        ActionHandler::Single(Arc::new(ExpandRecursive)),
    )?;
    registry.register(
        ActionDescriptor::new("collapseRecursive", "Collapse a directory and everything below")
            .options(render),
        ActionHandler::Single(Arc::new(CollapseRecursive)),
    )?;
    registry.register(
        ActionDescriptor::new("toggleSelection", "Select or unselect a node").options(render),
        ActionHandler::Single(Arc::new(ToggleSelection)),
    )?;

    // mutation
    registry.register(
        ActionDescriptor::new("addFile", "Create files")
            .options(reload)
            .arg("names", "one or more names; prompts when omitted"),
        ActionHandler::Single(Arc::new(AddEntry { directory: false })),
    )?;
    registry.register(
        ActionDescriptor::new("addDirectory", "Create directories")
            .options(reload)
            .arg("names", "one or more names; prompts when omitted"),
        ActionHandler::Single(Arc::new(AddEntry { directory: true })),
    )?;
    registry.register(
        ActionDescriptor::new("rename", "Rename a file or directory")
            .options(reload)
            .arg("name", "new name; prompts when omitted"),
        ActionHandler::Single(Arc::new(Rename)),
    )?;
    registry.register(
        ActionDescriptor::new("pasteFile", "Paste copied and cut files").options(reload),
        ActionHandler::Single(Arc::new(Paste)),
    )?;
    registry.register(
        ActionDescriptor::new("copyFile", "Mark files for copying")
            .options(render.with_multi_select())
            .arg("mode", "toggle, append or replace")
            .menu("t", "toggle")
            .menu("a", "append")
            .menu("r", "replace"),
        ActionHandler::Multi(Arc::new(Mark(ClipboardOp::Copy))),
    )?;
    registry.register(
        ActionDescriptor::new("cutFile", "Mark files for moving")
            .options(render.with_multi_select())
            .arg("mode", "toggle, append or replace")
            .menu("t", "toggle")
            .menu("a", "append")
            .menu("r", "replace"),
        ActionHandler::Multi(Arc::new(Mark(ClipboardOp::Cut))),
    )?;
    registry.register(
        ActionDescriptor::new("delete", "Move files to the trash").options(reload.with_multi_select()),
        ActionHandler::Multi(Arc::new(Delete { permanent: false })),
    )?;
    registry.register(
        ActionDescriptor::new("deleteForever", "Delete files permanently")
            .options(reload.with_multi_select()),
        ActionHandler::Multi(Arc::new(Delete { permanent: true })),
    )?;
    Ok(())
}

fn node_path(cx: &ActionContext<'_>, node: NodeId) -> Result<PathBuf> {
    cx.source
        .model()
        .node(node)
        .map(|n| n.path.clone())
        .ok_or_else(|| ExplorerError::InvalidPath("node is no longer in the tree".into()))
}

fn node_paths(cx: &ActionContext<'_>, nodes: &[NodeId]) -> Vec<PathBuf> {
    let model = cx.source.model();
    nodes
        .iter()
        .filter_map(|id| model.node(*id).map(|n| n.path.clone()))
        .collect()
}

/// Directory that receives new entries: an expanded directory itself,
/// otherwise the parent of the node, otherwise the root.
fn target_dir(model: &TreeModel, node: NodeId) -> NodeId {
    match model.node(node) {
        Some(n) if n.is_dir() && model.is_expanded(node) => node,
        _ => model.parent(node).unwrap_or_else(|| model.root()),
    }
}

/// A relative name made of plain components only.
fn checked_name(name: &str) -> Result<&Path> {
    let name = name.trim();
    let path = Path::new(name);
    let plain = path.components().all(|c| matches!(c, Component::Normal(_)));
    if name.is_empty() || !plain {
        return Err(ExplorerError::InvalidName(name.to_string()));
    }
    Ok(path)
}

fn bad_argument(action: &str, value: &str) -> ExplorerError {
    ExplorerError::InvalidArgument {
        action: action.to_string(),
        value: value.to_string(),
    }
}

fn describe(paths: &[PathBuf]) -> String {
    match paths {
        [one] => one
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| one.display().to_string()),
        many => format!("{} items", many.len()),
    }
}

struct Refresh;

#[async_trait]
impl NoTargetHandler for Refresh {
    async fn run(&self, cx: &mut ActionContext<'_>) -> Result<()> {
        cx.touch_other_sources();
        Ok(())
    }
}

struct ToggleHidden;

#[async_trait]
impl NoTargetHandler for ToggleHidden {
    async fn run(&self, cx: &mut ActionContext<'_>) -> Result<()> {
        let show = !cx.source.show_hidden();
        cx.source.set_show_hidden(show);
        Ok(())
    }
}

struct CollapseAll;

#[async_trait]
impl NoTargetHandler for CollapseAll {
    async fn run(&self, cx: &mut ActionContext<'_>) -> Result<()> {
        let root = cx.source.model().root();
        cx.source.model_mut().shrink_recursive(root);
        Ok(())
    }
}

struct Sort;

#[async_trait]
impl NoTargetHandler for Sort {
    async fn run(&self, cx: &mut ActionContext<'_>) -> Result<()> {
        let model = cx.source.model();
        let sort_by = match cx.arg(0) {
            None => model.sort_by().next(),
            Some(key) => SortBy::parse(key).ok_or_else(|| bad_argument("sortBy", key))?,
        };
        let dirs_first = model.dirs_first();
        cx.source.model_mut().set_sort(sort_by, dirs_first);
        cx.notify(NoticeLevel::Info, &format!("sorted by {}", sort_by.label()))
            .await;
        Ok(())
    }
}

struct ClearSelection;

#[async_trait]
impl NoTargetHandler for ClearSelection {
    async fn run(&self, cx: &mut ActionContext<'_>) -> Result<()> {
        cx.source.clear_selection();
        Ok(())
    }
}

struct Reveal;

#[async_trait]
impl NoTargetHandler for Reveal {
    async fn run(&self, cx: &mut ActionContext<'_>) -> Result<()> {
        let session = cx.session;
        let raw = match cx.arg(0) {
            Some(path) => path.to_string(),
            None => session
                .prompter()
                .prompt_text("Reveal path", "")
                .await?
                .ok_or(ExplorerError::Cancelled)?,
        };
        let mut path = PathBuf::from(raw.trim());
        if path.is_relative() {
            path = cx.source.root_path().join(path);
        }
        let found = cx.source.model_mut().reveal(session.fs(), &path).await?;
        if found.is_some() {
            cx.focus_on(path);
        } else {
            cx.notify(NoticeLevel::Info, &format!("nothing at {}", path.display()))
                .await;
        }
        Ok(())
    }
}

struct GotoParent;

#[async_trait]
impl NodeHandler for GotoParent {
    async fn run(&self, cx: &mut ActionContext<'_>, _root: NodeId) -> Result<()> {
        let current = cx.source.root_path().to_path_buf();
        let Some(parent) = current.parent() else {
            return Ok(());
        };
        cx.source.change_root(cx.session.fs(), parent).await?;
        cx.focus_on(current);
        Ok(())
    }
}

struct Cd;

#[async_trait]
impl NodeHandler for Cd {
    async fn run(&self, cx: &mut ActionContext<'_>, node: NodeId) -> Result<()> {
        let model = cx.source.model();
        if node == model.root() {
            return Ok(());
        }
        let path = node_path(cx, node)?;
        if !model.node(node).is_some_and(|n| n.is_dir()) {
            return Err(ExplorerError::InvalidPath(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        cx.source.change_root(cx.session.fs(), &path).await?;
        cx.focus_on(path);
        Ok(())
    }
}

struct Open;

#[async_trait]
impl NodeHandler for Open {
    async fn run(&self, cx: &mut ActionContext<'_>, node: NodeId) -> Result<()> {
        let session = cx.session;
        let Some((is_dir, path)) = cx.source.model().node(node).map(|n| (n.is_dir(), n.path.clone())) else {
            return Ok(());
        };
        if !is_dir {
            return session.opener().open(&path).await;
        }
        match session.options().open_directory {
            OpenDirectory::Cd => Cd.run(cx, node).await,
            OpenDirectory::Expand => {
                if cx.source.model().is_expanded(node) {
                    cx.source.model_mut().shrink(node);
                    Ok(())
                } else {
                    cx.source.model_mut().expand(session.fs(), node).await
                }
            }
        }
    }
}

struct Expand;

#[async_trait]
impl NodeHandler for Expand {
    async fn run(&self, cx: &mut ActionContext<'_>, node: NodeId) -> Result<()> {
        cx.source.model_mut().expand(cx.session.fs(), node).await
    }
}

struct Collapse;

#[async_trait]
impl NodeHandler for Collapse {
    async fn run(&self, cx: &mut ActionContext<'_>, node: NodeId) -> Result<()> {
        let model = cx.source.model();
        let open_dir = model.node(node).is_some_and(|n| n.is_dir()) && model.is_expanded(node);
        let target = if open_dir {
            node
        } else {
            match model.parent(node) {
                Some(parent) => parent,
                None => return Ok(()),
            }
        };
        let path = node_path(cx, target)?;
        cx.source.model_mut().shrink(target);
        cx.focus_on(path);
        Ok(())
    }
}

struct ExpandRecursive;

#[async_trait]
impl NodeHandler for ExpandRecursive {
    async fn run(&self, cx: &mut ActionContext<'_>, node: NodeId) -> Result<()> {
        let session = cx.session;
        let show_hidden = cx.source.show_hidden();
        let depth = session.options().expand_max_depth;
        cx.source
            .model_mut()
            .expand_recursive(session.fs(), node, show_hidden, depth)
            .await
    }
}

struct CollapseRecursive;

#[async_trait]
impl NodeHandler for CollapseRecursive {
    async fn run(&self, cx: &mut ActionContext<'_>, node: NodeId) -> Result<()> {
        cx.source.model_mut().shrink_recursive(node);
        Ok(())
    }
}

struct ToggleSelection;

#[async_trait]
impl NodeHandler for ToggleSelection {
    async fn run(&self, cx: &mut ActionContext<'_>, node: NodeId) -> Result<()> {
        let path = node_path(cx, node)?;
        cx.source.toggle_selected(&path);
        Ok(())
    }
}

struct AddEntry {
    directory: bool,
}

#[async_trait]
impl NodeHandler for AddEntry {
    async fn run(&self, cx: &mut ActionContext<'_>, node: NodeId) -> Result<()> {
        let session = cx.session;
        let fs = session.fs();
        let dir = target_dir(cx.source.model(), node);
        let dir_path = node_path(cx, dir)?;

        let names: Vec<String> = if cx.args.is_empty() {
            let label = if self.directory { "New directory name" } else { "New file name" };
            let answer = session.prompter().prompt_text(label, "").await?;
            vec![answer.ok_or(ExplorerError::Cancelled)?]
        } else {
            cx.args.to_vec()
        };
        let mut targets = Vec::with_capacity(names.len());
        for name in &names {
            targets.push(dir_path.join(checked_name(name)?));
        }
        guard::check_create(fs, &targets).await?;

        let mut created = None;
        let mut failed = Vec::new();
        for target in &targets {
            let result = if self.directory {
                fs.create_dir(target).await
            } else {
                fs.create_file(target).await
            };
            match result {
                Ok(()) => created = Some(target.clone()),
                Err(e) => {
                    tracing::warn!("create {} failed: {}", target.display(), e);
                    failed.push(format!("{}: {}", target.display(), e));
                }
            }
        }
        if !failed.is_empty() {
            cx.notify(NoticeLevel::Error, &format!("create failed for {}", failed.join("; ")))
                .await;
        }
        cx.source.model_mut().expand(fs, dir).await?;
        cx.touch_other_sources();
        if let Some(path) = created {
            cx.focus_on(path);
        }
        Ok(())
    }
}

struct Rename;

#[async_trait]
impl NodeHandler for Rename {
    async fn run(&self, cx: &mut ActionContext<'_>, node: NodeId) -> Result<()> {
        let session = cx.session;
        if node == cx.source.model().root() {
            return Err(ExplorerError::InvalidPath("cannot rename the root of a source".into()));
        }
        let path = node_path(cx, node)?;
        let current = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = match cx.arg(0) {
            Some(name) => name.to_string(),
            None => session
                .prompter()
                .prompt_text("Rename to", &current)
                .await?
                .ok_or(ExplorerError::Cancelled)?,
        };
        let parent = path.parent().unwrap_or(Path::new("/"));
        let target = parent.join(checked_name(&name)?);
        if target == path {
            return Ok(());
        }

        let transfer = Transfer::new(TransferKind::Move, path, target);
        let steps = guard::plan(session.fs(), session.resolver(), "rename", vec![transfer]).await?;
        let report = guard::apply(session.fs(), steps).await;
        report.notify(session.prompter(), "rename").await;
        for done in &report.done {
            session.expand_store().rename_prefix(&done.source, &done.target);
            session.clipboard().rename(&done.source, &done.target);
            cx.source.rename_selected(&done.source, &done.target);
            cx.focus_on(done.target.clone());
        }
        cx.touch_other_sources();
        Ok(())
    }
}

struct Paste;

#[async_trait]
impl NodeHandler for Paste {
    async fn run(&self, cx: &mut ActionContext<'_>, node: NodeId) -> Result<()> {
        let session = cx.session;
        let fs = session.fs();
        let dir = target_dir(cx.source.model(), node);
        let dir_path = node_path(cx, dir)?;

        let (copied, cutted) = {
            let clipboard = session.clipboard();
            (clipboard.copied().to_vec(), clipboard.cutted().to_vec())
        };
        if copied.is_empty() && cutted.is_empty() {
            cx.notify(NoticeLevel::Warning, "nothing to paste").await;
            return Ok(());
        }
        let transfers: Vec<Transfer> = copied
            .into_iter()
            .map(|p| (TransferKind::Copy, p))
            .chain(cutted.into_iter().map(|p| (TransferKind::Move, p)))
            .filter_map(|(kind, source)| {
                let target = dir_path.join(source.file_name()?);
                Some(Transfer::new(kind, source, target))
            })
            .collect();

        let steps = guard::plan(fs, session.resolver(), "paste", transfers).await?;
        let report = guard::apply(fs, steps).await;
        report.notify(session.prompter(), "paste").await;
        {
            let mut clipboard = session.clipboard();
            clipboard.finish_paste(session.options().paste_mode);
        }
        for done in report.done.iter().filter(|t| t.kind == TransferKind::Move) {
            session.expand_store().rename_prefix(&done.source, &done.target);
            cx.source.rename_selected(&done.source, &done.target);
        }

        cx.source.model_mut().expand(fs, dir).await?;
        if let Some(first) = report.done.first() {
            cx.focus_on(first.target.clone());
        }
        cx.touch_other_sources();
        Ok(())
    }
}

struct Mark(ClipboardOp);

#[async_trait]
impl MultiHandler for Mark {
    async fn run(&self, cx: &mut ActionContext<'_>, nodes: Vec<NodeId>) -> Result<()> {
        let action = match self.0 {
            ClipboardOp::Copy => "copyFile",
            ClipboardOp::Cut => "cutFile",
        };
        let mode = match cx.arg(0) {
            None => MarkMode::default(),
            Some(value) => MarkMode::parse(value).ok_or_else(|| bad_argument(action, value))?,
        };
        let paths = node_paths(cx, &nodes);
        let mut clipboard = cx.session.clipboard();
        match self.0 {
            ClipboardOp::Copy => clipboard.copy_files(&paths, mode),
            ClipboardOp::Cut => clipboard.cut_files(&paths, mode),
        }
        tracing::debug!("{} {:?}: {} marked", action, mode, clipboard.len());
        Ok(())
    }
}

struct Delete {
    permanent: bool,
}

#[async_trait]
impl MultiHandler for Delete {
    async fn run(&self, cx: &mut ActionContext<'_>, nodes: Vec<NodeId>) -> Result<()> {
        let session = cx.session;
        if nodes.contains(&cx.source.model().root()) {
            return Err(ExplorerError::InvalidPath("cannot delete the root of a source".into()));
        }
        let paths = node_paths(cx, &nodes);
        if paths.is_empty() {
            return Ok(());
        }
        let question = if self.permanent {
            format!("Permanently delete {}?", describe(&paths))
        } else {
            format!("Move {} to the trash?", describe(&paths))
        };
        if !session.prompter().confirm(&question).await? {
            return Err(ExplorerError::Cancelled);
        }

        let mut removed = Vec::with_capacity(paths.len());
        let mut failed = Vec::new();
        for path in &paths {
            let result = if self.permanent {
                session.fs().delete_permanently(path).await
            } else {
                session.fs().trash(std::slice::from_ref(path)).await
            };
            match result {
                Ok(()) => removed.push(path.clone()),
                Err(e) => {
                    tracing::warn!("delete {} failed: {}", path.display(), e);
                    failed.push(format!("{}: {}", path.display(), e));
                }
            }
        }
        session.clipboard().forget(&removed);
        if !failed.is_empty() {
            cx.notify(NoticeLevel::Error, &format!("delete failed for {}", failed.join("; ")))
                .await;
        }
        if let Some(parent) = removed.first().and_then(|p| p.parent()) {
            cx.focus_on(parent.to_path_buf());
        }
        cx.touch_other_sources();
        Ok(())
    }
}
