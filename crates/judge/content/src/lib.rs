//! Data-driven rule tables and their loaders.
//!
//! Competition constants (stage limits, per-variant level profiles, prices,
//! zone layout) live in data files, never in the engine. This crate holds:
//! - [`StaticTables`], a plain-data [`RuleTables`](judge_core::RuleTables)
//! - [`TablesLoader`], which reads TOML tables (behind the `loaders` feature)
//! - a bundled reference table, `data/reference_tables.toml`

pub mod tables;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use tables::{HeatPerShot, KillExperience, StaticTables};

#[cfg(feature = "loaders")]
pub use loaders::{LoadResult, TablesFile, TablesLoader};
