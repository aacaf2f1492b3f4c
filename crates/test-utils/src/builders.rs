#![allow(dead_code)]

use shrinkwrap::config::{CommandSpec, Config, RawConfigFile, VarMap};

/// Builder for `Config` to simplify test setup.
///
/// Starts from a binary name and base directory; the command defaults to
/// just `@binary`.
pub struct ConfigBuilder {
    raw: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new(binary: &str, basedir: impl AsRef<std::path::Path>) -> Self {
        Self {
            raw: RawConfigFile {
                binary: Some(binary.to_string()),
                basedir: Some(basedir.as_ref().display().to_string()),
                command: Some(CommandSpec::Tokens(vec!["@binary".to_string()])),
                ..RawConfigFile::default()
            },
        }
    }

    pub fn command(mut self, tokens: &[&str]) -> Self {
        self.raw.command = Some(CommandSpec::Tokens(to_strings(tokens)));
        self
    }

    pub fn extra_command(mut self, tokens: &[&str]) -> Self {
        self.raw.extra_commands.push(CommandSpec::Tokens(to_strings(tokens)));
        self
    }

    pub fn extra_var(mut self, key: &str, value: &str) -> Self {
        self.raw
            .extravars
            .get_or_insert_with(VarMap::new)
            .insert(key, value);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.raw
            .environment
            .get_or_insert_with(VarMap::new)
            .insert(key, value);
        self
    }

    pub fn service_name(mut self, name: &str) -> Self {
        self.raw.systemd = Some(name.to_string());
        self
    }

    pub fn tempdir(mut self, dir: impl AsRef<std::path::Path>) -> Self {
        self.raw.tempdir = Some(dir.as_ref().display().to_string());
        self
    }

    pub fn ready_marker(mut self, marker: &str) -> Self {
        self.raw.notifymsg = Some(marker.to_string());
        self
    }

    pub fn exit_with_child(mut self, val: bool) -> Self {
        self.raw.exit_with_child = Some(val);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.raw
    }

    pub fn build(self) -> Config {
        Config::try_from(self.raw).expect("Failed to build valid config from builder")
    }
}

fn to_strings(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|s| s.to_string()).collect()
}
