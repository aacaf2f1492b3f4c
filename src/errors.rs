// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShrinkwrapError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("The following configuration values must be defined: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("No file matching '*{name}*' found under {basedir:?}")]
    BinaryNotFound { name: String, basedir: PathBuf },

    #[error("Failed to spawn '{program}': {source}")]
    SpawnError {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command is empty after template expansion")]
    EmptyCommand,

    #[error("No worker could be started ({failures} spawn failure(s))")]
    NoWorkersStarted { failures: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ShrinkwrapError>;
