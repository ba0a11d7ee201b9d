//! Tree-view synchronization engine: keeps file trees, their flattened
//! projections and a shared line-addressed text surface in agreement while
//! actions mutate the filesystem underneath.

pub mod action;
pub mod collab;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod explorer;
pub mod fs;
pub mod refresh;
pub mod source;
pub mod tree;
pub mod view;

#[cfg(test)]
mod testing;

pub use error::{ExplorerError, Result};
pub use explorer::{Collaborators, Explorer, ExplorerOptions, Session};
