//! The in-memory tree: node arena, expand memory and the model that loads
//! directories through a [`FileSystem`](crate::fs::provider::FileSystem).

pub mod expand_store;
pub mod model;
pub mod node;
