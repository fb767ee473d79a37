//! CLI command implementations.

pub mod check;
pub mod common;
pub mod info;
pub mod quantize;
pub mod render;
