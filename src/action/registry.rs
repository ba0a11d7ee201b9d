use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use super::{ActionContext, MultiHandler, NoTargetHandler, NodeHandler};
use crate::error::{ExplorerError, Result};
use crate::tree::node::NodeId;

/// Which target an action runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCategory {
    NoTarget,
    Root,
    Single,
    Multi,
}

impl ActionCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::NoTarget => "View",
            Self::Root => "Root",
            Self::Single => "Node",
            Self::Multi => "Selection",
        }
    }
}

/// Post-run behavior declared by an action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionOptions {
    /// Run on the whole selection instead of only the cursor node.
    pub multi_select: bool,
    /// Content may be stale afterwards; reload before rendering.
    pub reload: bool,
    /// Redraw even without a reload.
    pub render: bool,
}

impl ActionOptions {
    pub const RENDER: Self = Self {
        multi_select: false,
        reload: false,
        render: true,
    };

    pub const RELOAD: Self = Self {
        multi_select: false,
        reload: true,
        render: true,
    };

    pub fn with_multi_select(mut self) -> Self {
        self.multi_select = true;
        self
    }
}

/// One declared argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: String,
    pub description: String,
}

/// Quick-pick entry: a short key standing for an argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub key: String,
    pub value: String,
}

/// Descriptive metadata of an action, exposed to command layers.
#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    pub name: String,
    pub description: String,
    /// Filled in from the handler at registration.
    pub category: ActionCategory,
    pub options: ActionOptions,
    pub args: Vec<ArgSpec>,
    pub menu: Vec<MenuEntry>,
}

impl ActionDescriptor {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            category: ActionCategory::NoTarget,
            options: ActionOptions::default(),
            args: Vec::new(),
            menu: Vec::new(),
        }
    }

    pub fn options(mut self, options: ActionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn arg(mut self, name: &str, description: &str) -> Self {
        self.args.push(ArgSpec {
            name: name.to_string(),
            description: description.to_string(),
        });
        self
    }

    pub fn menu(mut self, key: &str, value: &str) -> Self {
        self.menu.push(MenuEntry {
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// The value a menu key stands for; any other argument passes through.
    pub fn expand_arg<'a>(&'a self, arg: &'a str) -> &'a str {
        self.menu
            .iter()
            .find(|entry| entry.key == arg)
            .map_or(arg, |entry| entry.value.as_str())
    }
}

/// A typed handler, tagged by the target it needs.
#[derive(Clone)]
pub enum ActionHandler {
    NoTarget(Arc<dyn NoTargetHandler>),
    Root(Arc<dyn NodeHandler>),
    Single(Arc<dyn NodeHandler>),
    Multi(Arc<dyn MultiHandler>),
}

impl ActionHandler {
    pub fn category(&self) -> ActionCategory {
        match self {
            Self::NoTarget(_) => ActionCategory::NoTarget,
            Self::Root(_) => ActionCategory::Root,
            Self::Single(_) => ActionCategory::Single,
            Self::Multi(_) => ActionCategory::Multi,
        }
    }
}

/// A registered action.
#[derive(Clone)]
pub struct Action {
    pub descriptor: ActionDescriptor,
    pub handler: ActionHandler,
}

impl Action {
    /// Resolve the target and run the handler.
    ///
    /// `cursor` is the node under the cursor, `selection` the source's
    /// selected nodes in display order. Returns `Ok(false)` when the action
    /// needs a node and none is available.
    pub async fn invoke(
        &self,
        cx: &mut ActionContext<'_>,
        cursor: Option<NodeId>,
        selection: Vec<NodeId>,
    ) -> Result<bool> {
        match &self.handler {
            ActionHandler::NoTarget(handler) => handler.run(cx).await?,
            ActionHandler::Root(handler) => {
                let root = cx.source.model().root();
                handler.run(cx, root).await?
            }
            ActionHandler::Single(handler) => {
                let Some(node) = cursor else {
                    return Ok(false);
                };
                handler.run(cx, node).await?
            }
            ActionHandler::Multi(handler) => {
                let nodes = if self.descriptor.options.multi_select && !selection.is_empty() {
                    selection
                } else {
                    match cursor {
                        Some(node) => vec![node],
                        None => return Ok(false),
                    }
                };
                handler.run(cx, nodes).await?
            }
        }
        Ok(true)
    }
}

/// Name → action map, validated at registration.
pub struct ActionRegistry {
    actions: Vec<Action>,
    by_name: HashMap<String, usize>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn register(&mut self, mut descriptor: ActionDescriptor, handler: ActionHandler) -> Result<()> {
        let invalid = |reason: &str| ExplorerError::InvalidAction {
            name: descriptor.name.clone(),
            reason: reason.to_string(),
        };
        if descriptor.name.is_empty() || descriptor.name.contains(char::is_whitespace) {
            return Err(invalid("name must be a single word"));
        }
        if self.by_name.contains_key(&descriptor.name) {
            return Err(invalid("already registered"));
        }
        if descriptor.options.multi_select && handler.category() != ActionCategory::Multi {
            return Err(invalid("multi_select needs a multi-node handler"));
        }
        if !descriptor.menu.is_empty() && descriptor.args.is_empty() {
            return Err(invalid("menu entries need a declared argument"));
        }
        let mut keys = HashSet::new();
        if !descriptor.menu.iter().all(|entry| keys.insert(entry.key.as_str())) {
            return Err(invalid("duplicate menu key"));
        }

        descriptor.category = handler.category();
        tracing::debug!("registered action {} ({})", descriptor.name, descriptor.category.label());
        self.by_name.insert(descriptor.name.clone(), self.actions.len());
        self.actions.push(Action {
            descriptor,
            handler,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Action> {
        self.by_name.get(name).map(|idx| &self.actions[*idx])
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ActionDescriptor> {
        self.actions.iter().map(|a| &a.descriptor)
    }

    /// Fuzzy-search names and descriptions, best match first.
    pub fn fuzzy_search(&self, query: &str) -> Vec<&ActionDescriptor> {
        if query.is_empty() {
            return self.descriptors().collect();
        }
        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<(i64, &ActionDescriptor)> = self
            .descriptors()
            .filter_map(|d| {
                let name_score = matcher.fuzzy_match(&d.name, query).unwrap_or(0);
                let desc_score = matcher.fuzzy_match(&d.description, query).unwrap_or(0);
                let best = name_score.max(desc_score);
                (best > 0).then_some((best, d))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, d)| d).collect()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
