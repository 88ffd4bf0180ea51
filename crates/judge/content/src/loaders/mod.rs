//! Content loaders for reading rule data from files.
//!
//! Loaders convert TOML files into [`RuleTables`](judge_core::RuleTables)
//! implementations. A reference table is bundled with the crate.

pub mod tables;

pub use tables::{TablesFile, TablesLoader};

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
