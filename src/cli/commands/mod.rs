//! CLI command implementations

pub mod prepare;
pub mod render;
