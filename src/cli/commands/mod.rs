//! Command implementations.

pub mod completions;
pub mod history;
pub mod start;
pub mod status;
pub mod version;
