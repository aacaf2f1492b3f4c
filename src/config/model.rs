// src/config/model.rs

use std::fmt;
use std::path::PathBuf;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::errors::{Result, ShrinkwrapError};

/// Readiness substring used when neither the CLI nor the config file sets one.
pub const DEFAULT_NOTIFY_MSG: &str = "READY";

/// Raw configuration as read from a TOML file (or assembled from the CLI).
///
/// Every field is optional at this stage; required values are enforced when
/// converting into [`Config`].
///
/// ```toml
/// binary = "httpd"
/// systemd = "httpd"
/// basedir = "/opt/app"
/// tempdir = "/app/temp"
/// command = ["@binary", "--port", "@port"]
/// notifymsg = "is running!"
///
/// [extravars]
/// "@port" = "80"
///
/// [environment]
/// HTTPD_USER = "www"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub binary: Option<String>,

    /// The systemd unit name; falls back to `binary`.
    #[serde(default, alias = "service_name")]
    pub systemd: Option<String>,

    #[serde(default)]
    pub basedir: Option<String>,

    /// `@name` placeholders and their replacement text, in document order.
    #[serde(default)]
    pub extravars: Option<VarMap>,

    /// Environment variables overlaid on the parent's environment.
    #[serde(default)]
    pub environment: Option<VarMap>,

    #[serde(default)]
    pub tempdir: Option<String>,

    #[serde(default)]
    pub command: Option<CommandSpec>,

    /// Further commands, each supervised by its own worker.
    #[serde(default)]
    pub extra_commands: Vec<CommandSpec>,

    #[serde(default)]
    pub notifymsg: Option<String>,

    #[serde(default)]
    pub debug: Option<bool>,

    #[serde(default)]
    pub exit_with_child: Option<bool>,
}

/// Fully resolved, immutable configuration handed to the supervisor.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so required fields are always present.
#[derive(Debug, Clone)]
pub struct Config {
    binary: String,
    service_name: String,
    basedir: PathBuf,
    commands: Vec<Vec<String>>,
    extra_vars: VarMap,
    environment: VarMap,
    tempdir: Option<PathBuf>,
    ready_marker: String,
    debug: bool,
    exit_with_child: bool,
}

impl Config {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_unchecked(
        binary: String,
        service_name: String,
        basedir: PathBuf,
        commands: Vec<Vec<String>>,
        extra_vars: VarMap,
        environment: VarMap,
        tempdir: Option<PathBuf>,
        ready_marker: String,
        debug: bool,
        exit_with_child: bool,
    ) -> Self {
        Self {
            binary,
            service_name,
            basedir,
            commands,
            extra_vars,
            environment,
            tempdir,
            ready_marker,
            debug,
            exit_with_child,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn basedir(&self) -> &PathBuf {
        &self.basedir
    }

    /// Command templates, one per worker. Never empty.
    pub fn commands(&self) -> &[Vec<String>] {
        &self.commands
    }

    pub fn extra_vars(&self) -> &VarMap {
        &self.extra_vars
    }

    pub fn environment(&self) -> &VarMap {
        &self.environment
    }

    pub fn tempdir(&self) -> Option<&PathBuf> {
        self.tempdir.as_ref()
    }

    pub fn ready_marker(&self) -> &str {
        &self.ready_marker
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn exit_with_child(&self) -> bool {
        self.exit_with_child
    }
}

/// A command given either as one string or as a list of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Line(String),
    Tokens(Vec<String>),
}

impl CommandSpec {
    pub fn into_tokens(self) -> Vec<String> {
        match self {
            CommandSpec::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            CommandSpec::Tokens(tokens) => tokens,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CommandSpec::Line(line) => line.trim().is_empty(),
            CommandSpec::Tokens(tokens) => tokens.iter().all(|t| t.trim().is_empty()),
        }
    }
}

/// Insertion-ordered `name -> value` map.
///
/// Order matters for template expansion, where earlier substitutions are
/// visible to later ones.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct VarMap(Vec<(String, String)>);

impl VarMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `key=value;key=value` form used on the command line.
    ///
    /// Empty segments are skipped; the value is everything after the first
    /// `=`, so values may themselves contain `=`.
    pub fn parse_pairs(input: &str) -> Result<Self> {
        let mut map = VarMap::new();
        for segment in input.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                ShrinkwrapError::ConfigError(format!(
                    "expected key=value pair, got '{segment}'"
                ))
            })?;
            if key.is_empty() {
                return Err(ShrinkwrapError::ConfigError(format!(
                    "empty key in pair '{segment}'"
                )));
            }
            map.insert(key, value);
        }
        Ok(map)
    }

    /// Insert or replace; a replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for VarMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VarMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = VarMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<'de> Deserialize<'de> for VarMap {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(VarMapVisitor)
    }
}

struct VarMapVisitor;

impl<'de> Visitor<'de> for VarMapVisitor {
    type Value = VarMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a table of strings or a \"key=value;key=value\" string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<VarMap, E> {
        VarMap::parse_pairs(v).map_err(E::custom)
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<VarMap, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = VarMap::new();
        while let Some((key, value)) = access.next_entry::<String, String>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pairs_keeps_order_and_splits_on_first_equals() {
        let map = VarMap::parse_pairs("@port=80;@opts=a=b;;@user=www").unwrap();
        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(
            pairs,
            vec![("@port", "80"), ("@opts", "a=b"), ("@user", "www")]
        );
    }

    #[test]
    fn parse_pairs_rejects_segment_without_equals() {
        let err = VarMap::parse_pairs("@port=80;oops").unwrap_err();
        assert!(matches!(err, ShrinkwrapError::ConfigError(msg) if msg.contains("oops")));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut map: VarMap = [("a", "1"), ("b", "2")].into_iter().collect();
        map.insert("a", "3");
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("a", "3"), ("b", "2")]);
        assert_eq!(map.get("a"), Some("3"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn command_line_form_splits_on_whitespace() {
        let spec = CommandSpec::Line("@binary  --port @port".to_string());
        assert_eq!(spec.into_tokens(), vec!["@binary", "--port", "@port"]);
        assert!(CommandSpec::Tokens(vec![" ".to_string()]).is_blank());
    }
}
