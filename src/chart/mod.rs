//! Declarative chart options handed to the renderer.

pub mod overview;
pub mod treemap;
pub mod trend;
