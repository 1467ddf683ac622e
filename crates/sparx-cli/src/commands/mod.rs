//! CLI command implementations.

pub mod check;
pub mod common;
pub mod eval;
pub mod models;
pub mod version;
