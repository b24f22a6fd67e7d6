//! Shared helpers

pub mod file_ops;
pub mod format;
