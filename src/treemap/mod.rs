pub mod color;
pub mod colorize;
pub mod node;
