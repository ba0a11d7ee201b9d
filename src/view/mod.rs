pub mod locator;
pub mod projector;
pub mod render;
