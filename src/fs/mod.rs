pub mod clipboard;
pub mod operations;
pub mod provider;
pub mod watcher;
