mod event;
mod stdio;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use file_tree_view::collab::{NoticeLevel, TextSurface};
use file_tree_view::concurrency::debounce::Debounced;
use file_tree_view::concurrency::{BoxFuture, Task};
use file_tree_view::config::{AppConfig, GeneralConfig, TreeConfig, WatcherConfig};
use file_tree_view::fs::provider::LocalFs;
use file_tree_view::fs::watcher::FsWatcher;
use file_tree_view::refresh::RefreshQueue;
use file_tree_view::tree::expand_store::ExpandStore;
use file_tree_view::{Collaborators, Explorer, ExplorerError, ExplorerOptions, Result};

use crate::event::{Command, Event, EventHandler, LineReader};
use crate::stdio::{StdioPrompter, StdioResolver, StdoutSurface, SystemOpener};

/// A line-driven filesystem tree explorer.
#[derive(Parser, Debug)]
#[command(name = "ftv", version, about)]
struct Cli {
    /// Sources to show, as PATH or NAME=PATH (defaults to the current directory)
    sources: Vec<String>,

    /// Path to a config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable filesystem watcher (auto-refresh)
    #[arg(long)]
    no_watcher: bool,

    /// Show dotfiles
    #[arg(long)]
    show_hidden: bool,

    /// Use glyph indicators
    #[arg(long)]
    icons: bool,
}

impl Cli {
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                show_hidden: self.show_hidden.then_some(true),
                ..Default::default()
            },
            tree: TreeConfig {
                use_icons: self.icons.then_some(true),
                ..Default::default()
            },
            watcher: WatcherConfig {
                enabled: self.no_watcher.then_some(false),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Split `NAME=PATH`; a bare path is named after its position.
fn parse_source(spec: &str, index: usize) -> (String, PathBuf) {
    match spec.split_once('=') {
        Some((name, path)) if !name.is_empty() && !name.contains('/') => {
            (name.to_string(), PathBuf::from(path))
        }
        _ if index == 0 => ("file".to_string(), PathBuf::from(spec)),
        _ => (format!("file{}", index + 1), PathBuf::from(spec)),
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let file = config.log_file();
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let writer = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&file)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level()))
        .map_err(|e| ExplorerError::Config(e.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(writer))
        .with_ansi(false)
        .init();
    Ok(())
}

fn expand_saver(explorer: Arc<Explorer>, file: PathBuf) -> Debounced<(), Result<()>> {
    let task: Task<(), Result<()>> = Arc::new(move |()| -> BoxFuture<Result<()>> {
        let explorer = explorer.clone();
        let file = file.clone();
        Box::pin(async move { explorer.save_expand_state(&file) })
    });
    Debounced::new(Duration::from_secs(1), task)
}

async fn print_help(explorer: &Explorer, query: Option<&str>) {
    let registry = explorer.registry();
    let mut out = String::new();
    for d in registry.fuzzy_search(query.unwrap_or("")) {
        out.push_str(&format!("  {:<18} {:<9} {}\n", d.name, d.category.label(), d.description));
    }
    out.push_str("  j / k / goto N     move the cursor\n  quit\n");
    explorer
        .session()
        .prompter()
        .notify(NoticeLevel::Info, &out)
        .await;
}

async fn move_cursor(surface: &dyn TextSurface, command: &Command) -> Result<bool> {
    let row = surface.cursor().await?;
    let target = match command.name.as_str() {
        "j" => row + 1,
        "k" => row.saturating_sub(1),
        "goto" => match command.args.first().and_then(|a| a.parse().ok()) {
            Some(row) => row,
            None => return Ok(false),
        },
        _ => return Ok(false),
    };
    surface.set_cursor(target.max(1), 0).await?;
    surface.redraw().await?;
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));
    init_logging(&config)?;

    let expand_file = config.expand_file();
    let expand_store = match &expand_file {
        Some(file) => ExpandStore::load(file)?,
        None => ExpandStore::new(),
    };

    let input = Arc::new(LineReader::spawn());
    let surface = Arc::new(StdoutSurface::default());
    let collab = Collaborators {
        fs: Arc::new(LocalFs::default()),
        surface: surface.clone(),
        prompter: Arc::new(StdioPrompter::new(input.clone())),
        resolver: Arc::new(StdioResolver::new(input.clone())),
        opener: Arc::new(SystemOpener),
    };
    let mut explorer = Explorer::new(collab, ExplorerOptions::from_config(&config), expand_store)?;

    let specs = if cli.sources.is_empty() {
        vec![config.default_path().unwrap_or(".").to_string()]
    } else {
        cli.sources.clone()
    };
    for (index, spec) in specs.iter().enumerate() {
        let (name, path) = parse_source(spec, index);
        let root = tokio::fs::canonicalize(&path).await.map_err(|_| {
            ExplorerError::InvalidPath(format!("{} does not exist", path.display()))
        })?;
        explorer.add_source(&name, &root).await?;
    }
    let explorer = Arc::new(explorer);
    explorer.render().await?;

    let mut events = EventHandler::new();
    let refresh = Arc::new(RefreshQueue::new(
        explorer.clone(),
        Duration::from_millis(config.debounce_ms()),
    ));
    let mut watcher = if config.watcher_enabled() {
        match FsWatcher::new(
            Duration::from_millis(config.debounce_ms()),
            config.ignore_patterns(),
            config.flood_threshold(),
            events.fs_sender(),
        ) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!("watcher unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };
    follow_roots(watcher.as_mut(), &explorer).await;
    let saver = expand_file
        .clone()
        .map(|file| expand_saver(explorer.clone(), file));

    loop {
        match events.next(&input).await {
            Event::Command(command) => {
                match command.name.as_str() {
                    "quit" | "q" => break,
                    "help" => {
                        print_help(&explorer, command.args.first().map(String::as_str)).await;
                        continue;
                    }
                    _ => {}
                }
                if move_cursor(surface.as_ref(), &command).await? {
                    continue;
                }
                match explorer.dispatch(&command.name, &command.args).await {
                    Ok(()) => {}
                    Err(ExplorerError::UnknownAction(name)) => {
                        let message = format!("unknown command {name}, try help");
                        explorer
                            .session()
                            .prompter()
                            .notify(NoticeLevel::Warning, &message)
                            .await;
                        continue;
                    }
                    Err(e) => tracing::debug!("{} failed: {}", command.name, e),
                }
                follow_roots(watcher.as_mut(), &explorer).await;
                if let Some(saver) = saver.clone() {
                    tokio::spawn(async move {
                        if let Some(Err(e)) = saver.call(()).await.into_ran() {
                            tracing::warn!("saving expand state failed: {}", e);
                        }
                    });
                }
            }
            Event::FsChange(paths) => {
                let refresh = refresh.clone();
                tokio::spawn(async move {
                    if let Some(Err(e)) = refresh.push(paths).await.into_ran() {
                        tracing::warn!("refresh failed: {}", e);
                    }
                });
            }
            Event::Eof => break,
        }
    }

    if let Some(file) = expand_file {
        save_on_exit(&explorer, &file);
    }
    Ok(())
}

/// Point the watcher at the current roots after `cd` or `gotoParent`.
async fn follow_roots(watcher: Option<&mut FsWatcher>, explorer: &Explorer) {
    let Some(watcher) = watcher else {
        return;
    };
    let roots = explorer.roots().await;
    if watcher.roots() == roots {
        return;
    }
    if let Err(e) = watcher.watch_roots(&roots) {
        tracing::warn!("cannot watch new roots: {}", e);
    }
}

fn save_on_exit(explorer: &Explorer, file: &Path) {
    if let Err(e) = explorer.save_expand_state(file) {
        tracing::warn!("saving expand state failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_specs() {
        assert_eq!(parse_source(".", 0), ("file".into(), PathBuf::from(".")));
        assert_eq!(parse_source("/tmp", 1), ("file2".into(), PathBuf::from("/tmp")));
        assert_eq!(parse_source("docs=/srv/docs", 1), ("docs".into(), PathBuf::from("/srv/docs")));
        assert_eq!(parse_source("./a=b", 0), ("file".into(), PathBuf::from("./a=b")));
    }

    #[test]
    fn cli_flags_become_overrides() {
        let cli = Cli::parse_from(["ftv", "--no-watcher", "--icons", "src"]);
        let config = AppConfig::default().merge(&cli.overrides());
        assert!(!config.watcher_enabled());
        assert!(config.use_icons());
        assert!(!config.show_hidden());
        assert_eq!(cli.sources, vec!["src"]);
    }
}
