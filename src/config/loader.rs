// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::model::{Config, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; required fields are checked when
/// converting into [`Config`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Build the final [`Config`] from the CLI and the (optional) config file.
///
/// - `--config PATH` must exist.
/// - Without `--config`, [`default_config_path`] is used if present and
///   skipped otherwise.
/// - File values win; CLI values fill the blanks (see `merge.rs`).
pub fn load_and_validate(cli: &CliArgs) -> Result<Config> {
    let raw = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => {
            let path = default_config_path();
            if path.is_file() {
                load_from_path(&path)?
            } else {
                debug!(path = ?path, "no config file found; using CLI arguments only");
                RawConfigFile::default()
            }
        }
    };

    let merged = raw.merge_cli(cli)?;
    Config::try_from(merged)
}

/// Helper to resolve a default config path.
///
/// Currently this just returns `shrinkwrap.toml` in the current working
/// directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("shrinkwrap.toml")
}
