//! Named operations over the tree: the typed handler seams, the context a
//! handler runs in, the registry, the conflict guard and the built-in set.

pub mod builtin;
pub mod guard;
pub mod registry;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::collab::NoticeLevel;
use crate::error::Result;
use crate::explorer::Session;
use crate::fs::provider::FileSystem;
use crate::source::FileSource;
use crate::tree::node::NodeId;

pub use registry::{
    ActionCategory, ActionDescriptor, ActionHandler, ActionOptions, ActionRegistry, ArgSpec,
    MenuEntry,
};

/// What a handler sees while it runs: the shared session, the source it
/// holds exclusively, and the dispatch arguments.
pub struct ActionContext<'a> {
    pub session: &'a Session,
    pub source: &'a mut FileSource,
    pub args: &'a [String],
    focus: Option<PathBuf>,
    reload: bool,
    others_touched: bool,
}

impl<'a> ActionContext<'a> {
    pub fn new(session: &'a Session, source: &'a mut FileSource, args: &'a [String]) -> Self {
        Self {
            session,
            source,
            args,
            focus: None,
            reload: false,
            others_touched: false,
        }
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.session.fs()
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Place the cursor on `path` after the next render.
    pub fn focus_on(&mut self, path: impl Into<PathBuf>) {
        self.focus = Some(path.into());
    }

    pub fn focus(&self) -> Option<&Path> {
        self.focus.as_deref()
    }

    /// Reload this source after the handler, whatever the action declares.
    pub fn request_reload(&mut self) {
        self.reload = true;
    }

    pub fn reload_requested(&self) -> bool {
        self.reload
    }

    /// The filesystem changed in a way other sources may show.
    pub fn touch_other_sources(&mut self) {
        self.others_touched = true;
    }

    pub fn others_touched(&self) -> bool {
        self.others_touched
    }

    pub async fn notify(&self, level: NoticeLevel, message: &str) {
        self.session.prompter().notify(level, message).await;
    }

    pub(crate) fn into_effects(self) -> Effects {
        Effects {
            focus: self.focus,
            reload: self.reload,
            others_touched: self.others_touched,
        }
    }
}

/// Side requests a handler left behind for the dispatcher.
#[derive(Debug, Default)]
pub(crate) struct Effects {
    pub focus: Option<PathBuf>,
    pub reload: bool,
    pub others_touched: bool,
}

/// Handler of an action that needs no node.
#[async_trait]
pub trait NoTargetHandler: Send + Sync {
    async fn run(&self, cx: &mut ActionContext<'_>) -> Result<()>;
}

/// Handler of an action on exactly one node (the root or the cursor node).
#[async_trait]
pub trait NodeHandler: Send + Sync {
    async fn run(&self, cx: &mut ActionContext<'_>, node: NodeId) -> Result<()>;
}

/// Handler of an action on one or many nodes.
#[async_trait]
pub trait MultiHandler: Send + Sync {
    async fn run(&self, cx: &mut ActionContext<'_>, nodes: Vec<NodeId>) -> Result<()>;
}
