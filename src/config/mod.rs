// src/config/mod.rs

//! Configuration loading and validation for shrinkwrap.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Merge it with CLI arguments (`merge.rs`).
//! - Enforce required fields and defaults (`validate.rs`).

pub mod loader;
pub mod merge;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{CommandSpec, Config, DEFAULT_NOTIFY_MSG, RawConfigFile, VarMap};
