//! The explorer session: sources laid out on one text surface, the stores
//! they share, the action registry and the collaborators.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::action::{ActionContext, ActionRegistry};
use crate::collab::{ConflictResolver, NoticeLevel, Opener, Prompter, TextSurface};
use crate::concurrency::scope::SyncScope;
use crate::config::{AppConfig, OpenDirectory};
use crate::error::{ExplorerError, Result};
use crate::fs::clipboard::{ClipboardState, PasteMode};
use crate::fs::provider::FileSystem;
use crate::source::FileSource;
use crate::tree::expand_store::ExpandStore;
use crate::tree::model::SortBy;
use crate::view::locator::Locator;
use crate::view::projector::{FlatItem, FlattenOptions};
use crate::view::render::{render_lines, LineMarks, RenderOptions};

/// Behavior switches resolved from configuration.
#[derive(Debug, Clone)]
pub struct ExplorerOptions {
    pub show_hidden: bool,
    pub show_root: bool,
    pub sort_by: SortBy,
    pub dirs_first: bool,
    pub use_icons: bool,
    pub open_directory: OpenDirectory,
    pub paste_mode: PasteMode,
    pub expand_max_depth: usize,
    /// Surface lines above the first source.
    pub header_lines: usize,
}

impl ExplorerOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            show_hidden: config.show_hidden(),
            show_root: config.show_root(),
            sort_by: config.sort_by(),
            dirs_first: config.dirs_first(),
            use_icons: config.use_icons(),
            open_directory: config.open_directory(),
            paste_mode: config.paste_mode(),
            expand_max_depth: config.expand_max_depth(),
            header_lines: 0,
        }
    }

    fn flatten(&self) -> FlattenOptions {
        FlattenOptions {
            show_hidden: self.show_hidden,
            show_root: self.show_root,
        }
    }
}

impl Default for ExplorerOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// External collaborators of one session.
#[derive(Clone)]
pub struct Collaborators {
    pub fs: Arc<dyn FileSystem>,
    pub surface: Arc<dyn TextSurface>,
    pub prompter: Arc<dyn Prompter>,
    pub resolver: Arc<dyn ConflictResolver>,
    pub opener: Arc<dyn Opener>,
}

/// State shared by every source and handed to action handlers.
pub struct Session {
    fs: Arc<dyn FileSystem>,
    prompter: Arc<dyn Prompter>,
    resolver: Arc<dyn ConflictResolver>,
    opener: Arc<dyn Opener>,
    clipboard: Mutex<ClipboardState>,
    expand_store: ExpandStore,
    options: ExplorerOptions,
}

impl Session {
    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }

    pub fn resolver(&self) -> &dyn ConflictResolver {
        self.resolver.as_ref()
    }

    pub fn opener(&self) -> &dyn Opener {
        self.opener.as_ref()
    }

    /// Lock the clipboard. Never hold the guard across an await.
    pub fn clipboard(&self) -> MutexGuard<'_, ClipboardState> {
        self.clipboard.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn expand_store(&self) -> &ExpandStore {
        &self.expand_store
    }

    pub fn options(&self) -> &ExplorerOptions {
        &self.options
    }
}

struct SourceSlot {
    name: String,
    scope: SyncScope<FileSource>,
    view: watch::Receiver<Arc<[FlatItem]>>,
}

/// A multi-source tree view bound to one text surface.
pub struct Explorer {
    session: Session,
    surface: Arc<dyn TextSurface>,
    sources: Vec<SourceSlot>,
    registry: ActionRegistry,
    /// Index of what is currently on the surface.
    rendered: tokio::sync::Mutex<Locator>,
}

impl Explorer {
    /// Session with the built-in actions registered and no sources yet.
    pub fn new(collab: Collaborators, options: ExplorerOptions, expand_store: ExpandStore) -> Result<Self> {
        let Collaborators {
            fs,
            surface,
            prompter,
            resolver,
            opener,
        } = collab;
        let offset = options.header_lines;
        Ok(Self {
            session: Session {
                fs,
                prompter,
                resolver,
                opener,
                clipboard: Mutex::new(ClipboardState::new()),
                expand_store,
                options,
            },
            surface,
            sources: Vec::new(),
            registry: ActionRegistry::with_builtins()?,
            rendered: tokio::sync::Mutex::new(Locator::new(offset, Vec::new())),
        })
    }

    /// Register a source rooted at `root`. Sources are laid out in
    /// registration order.
    pub async fn add_source(&mut self, name: &str, root: &Path) -> Result<usize> {
        if self.sources.iter().any(|s| s.name == name) {
            return Err(ExplorerError::InvalidName(format!("source {name} already exists")));
        }
        let mut source = FileSource::open(
            name,
            root,
            self.session.fs(),
            self.session.expand_store.clone(),
            self.session.options.flatten(),
        )
        .await?;
        let options = &self.session.options;
        source.model_mut().set_sort(options.sort_by, options.dirs_first);
        source.publish();
        let view = source.subscribe();
        self.sources.push(SourceSlot {
            name: name.to_string(),
            scope: SyncScope::new(name, source),
            view,
        });
        tracing::info!("added source {} at {}", name, root.display());
        Ok(self.sources.len() - 1)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Register extra actions before the session is shared.
    pub fn registry_mut(&mut self) -> &mut ActionRegistry {
        &mut self.registry
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }

    /// Latest published view of every source.
    fn snapshots(&self) -> Vec<(String, Arc<[FlatItem]>)> {
        self.sources
            .iter()
            .map(|slot| (slot.name.clone(), slot.view.borrow().clone()))
            .collect()
    }

    /// The item under the 1-indexed `row` of the rendered surface.
    pub async fn node_at(&self, row: usize) -> Option<(String, FlatItem)> {
        let rendered = self.rendered.lock().await;
        rendered
            .node_at(row)
            .map(|hit| (hit.source.to_string(), hit.item.clone()))
    }

    /// 1-indexed row of `uid` in `source` on the rendered surface.
    pub async fn line_of(&self, source: &str, uid: &str) -> Option<usize> {
        self.rendered.lock().await.line_of(source, uid)
    }

    /// Run action `name` against the cursor target.
    pub async fn dispatch(&self, name: &str, args: &[String]) -> Result<()> {
        let action = self
            .registry
            .get(name)
            .ok_or_else(|| ExplorerError::UnknownAction(name.to_string()))?;
        let args: Vec<String> = args
            .iter()
            .map(|arg| action.descriptor.expand_arg(arg).to_string())
            .collect();
        let row = self.surface.cursor().await?;
        let (index, cursor_path) = {
            let rendered = self.rendered.lock().await;
            match rendered.node_at(row) {
                Some(hit) => (hit.source_index, Some(hit.item.path.clone())),
                None => (0, None),
            }
        };
        let slot = self
            .sources
            .get(index)
            .ok_or_else(|| ExplorerError::InvalidPath("no source to act on".into()))?;
        tracing::debug!("dispatch {} {:?} on {}", name, args, slot.name);

        let mut source = slot.scope.enter().await;
        // the view may have changed since the row was rendered
        let cursor = cursor_path.as_deref().and_then(|p| source.model().find(p));
        let selection = source.selected_nodes();

        let mut cx = ActionContext::new(&self.session, &mut source, &args);
        let result = action.invoke(&mut cx, cursor, selection).await;
        let effects = cx.into_effects();

        if action.descriptor.options.reload || effects.reload {
            if let Err(e) = source.reload(self.session.fs()).await {
                tracing::warn!("reload after {} failed: {}", name, e);
            }
        }
        source.publish();
        drop(source);

        if effects.others_touched {
            self.refresh_others(index).await;
        }
        let options = action.descriptor.options;
        if options.render || options.reload || effects.reload || effects.focus.is_some() {
            self.render_focus(effects.focus.map(|path| (index, path))).await?;
        }

        match result {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.session
                    .prompter()
                    .notify(NoticeLevel::Warning, &format!("{name}: no node under the cursor"))
                    .await;
                Ok(())
            }
            Err(e) if e.is_cancelled() => {
                tracing::debug!("{} cancelled", name);
                Ok(())
            }
            Err(e) => {
                self.session
                    .prompter()
                    .notify(NoticeLevel::Error, &format!("{name}: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    async fn refresh_others(&self, except: usize) {
        for (idx, slot) in self.sources.iter().enumerate() {
            if idx == except {
                continue;
            }
            let mut source = slot.scope.enter().await;
            if let Err(e) = source.reload(self.session.fs()).await {
                tracing::warn!("refresh of source {} failed: {}", slot.name, e);
            }
            source.publish();
        }
    }

    /// Redraw, keeping the cursor on the node it was on.
    pub async fn render(&self) -> Result<()> {
        self.render_focus(None).await
    }

    /// Redraw and place the cursor on `focus` (source index, path), or else
    /// on the node that was under the cursor. A vanished node hands the
    /// cursor to its nearest visible ancestor.
    pub async fn render_focus(&self, focus: Option<(usize, PathBuf)>) -> Result<()> {
        let mut rendered = self.rendered.lock().await;
        let row = self.surface.cursor().await?;
        let anchor = match focus {
            Some(focus) => Some(focus),
            None => rendered
                .node_at(row)
                .map(|hit| (hit.source_index, hit.item.path.clone())),
        };

        let next = Locator::new(self.session.options.header_lines, self.snapshots());
        let lines = {
            let clipboard = self.session.clipboard();
            let mut lines = Vec::with_capacity(next.end() - next.offset());
            for (idx, slot) in self.sources.iter().enumerate() {
                let selection = match slot.scope.try_enter() {
                    Some(source) => source.selection().clone(),
                    None => Default::default(),
                };
                let marks = LineMarks {
                    selection: &selection,
                    clipboard: &clipboard,
                };
                let options = RenderOptions {
                    use_icons: self.session.options.use_icons,
                };
                lines.extend(render_lines(next.items(idx), options, &marks));
            }
            lines
        };
        self.surface
            .write_lines(next.offset()..rendered.end(), lines)
            .await?;

        let target = anchor
            .and_then(|(idx, path)| next.nearest_line(idx, &path))
            .unwrap_or_else(|| row.clamp(next.offset() + 1, next.end().max(next.offset() + 1)));
        self.surface.set_cursor(target, 0).await?;
        self.surface.redraw().await?;
        *rendered = next;
        Ok(())
    }

    /// Expand the ancestors of `path` in the first source containing it and
    /// put the cursor there. Returns the row, or `None` when no node matches.
    pub async fn reveal(&self, path: &Path) -> Result<Option<usize>> {
        for (idx, slot) in self.sources.iter().enumerate() {
            let mut source = slot.scope.enter().await;
            if !path.starts_with(source.root_path()) {
                continue;
            }
            let found = source.model_mut().reveal(self.session.fs(), path).await?;
            if found.is_none() {
                return Ok(None);
            }
            source.publish();
            drop(source);
            self.render_focus(Some((idx, path.to_path_buf()))).await?;
            return Ok(self.rendered.lock().await.line_of_path(idx, path));
        }
        Ok(None)
    }

    /// Reload every source and redraw.
    pub async fn refresh_all(&self) -> Result<()> {
        for slot in &self.sources {
            let mut source = slot.scope.enter().await;
            source.reload(self.session.fs()).await?;
            source.publish();
        }
        self.render().await
    }

    /// Refresh only the directories holding `paths`, then redraw.
    pub async fn refresh_paths(&self, paths: &[PathBuf]) -> Result<()> {
        for slot in &self.sources {
            let mut source = slot.scope.enter().await;
            if let Err(e) = source.refresh_paths(self.session.fs(), paths).await {
                tracing::warn!("refresh of source {} failed: {}", slot.name, e);
            }
            source.publish();
        }
        self.render().await
    }

    /// Root of every source, in registration order.
    pub async fn roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::with_capacity(self.sources.len());
        for slot in &self.sources {
            roots.push(slot.scope.enter().await.root_path().to_path_buf());
        }
        roots
    }

    /// Write the expand state to `file`.
    pub fn save_expand_state(&self, file: &Path) -> Result<()> {
        self.session.expand_store.save(file)
    }
}
