// src/template.rs

//! Command template expansion.
//!
//! The template tokens are joined with single spaces, every `extravars` key
//! is replaced literally (in insertion order), then `@binary` is replaced by
//! the resolved path, and the result is split on whitespace into argv.
//!
//! Known limitations, kept on purpose:
//! - an argument containing whitespace (in the template or in a substituted
//!   value) is split into several arguments;
//! - substitution is plain string replacement, so a value containing a later
//!   key's text is substituted again.
//!
//! Environment variables never enter argv: they are carried in
//! [`Command::env`] and applied to the child's environment block at spawn
//! time, overlaid on the inherited parent environment.

use std::fmt;

use crate::config::VarMap;
use crate::resolve::ResolvedBinary;

/// Placeholder replaced by the resolved binary path.
pub const BINARY_PLACEHOLDER: &str = "@binary";

/// A fully substituted command, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub argv: Vec<String>,
    /// Overlay applied on top of the inherited parent environment.
    pub env: VarMap,
}

impl Command {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            env: VarMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key, value);
        self
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}

/// Join template tokens into the single string that substitution works on.
pub fn flatten(template: &[String]) -> String {
    template.join(" ")
}

/// Expand `template` into a concrete [`Command`].
pub fn expand(
    binary: &ResolvedBinary,
    template: &[String],
    extra_vars: &VarMap,
    env_vars: &VarMap,
) -> Command {
    let mut line = flatten(template);

    for (key, value) in extra_vars.iter() {
        if !key.is_empty() && line.contains(key) {
            line = line.replace(key, value);
        }
    }

    let binary_path = binary.path().to_string_lossy();
    line = line.replace(BINARY_PLACEHOLDER, &binary_path);

    Command {
        argv: line.split_whitespace().map(str::to_string).collect(),
        env: env_vars.clone(),
    }
}
