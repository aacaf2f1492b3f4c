// src/config/merge.rs

//! Combine the config file with command-line arguments.
//!
//! A value that is set (and non-empty) in the config file wins; the CLI only
//! fills the blanks. Boolean flags are OR-ed.

use crate::cli::CliArgs;
use crate::config::model::{CommandSpec, RawConfigFile, VarMap};
use crate::errors::Result;

impl RawConfigFile {
    /// Fill every blank field of `self` from `cli`.
    pub fn merge_cli(mut self, cli: &CliArgs) -> Result<RawConfigFile> {
        fill(&mut self.binary, &cli.binary);
        fill(&mut self.systemd, &cli.service_name);
        fill(&mut self.basedir, &cli.basedir);
        fill(&mut self.tempdir, &cli.tempdir);
        fill(&mut self.notifymsg, &cli.notifymsg);

        if self.extravars.as_ref().is_none_or(VarMap::is_empty) {
            if let Some(pairs) = &cli.extravars {
                self.extravars = Some(VarMap::parse_pairs(pairs)?);
            }
        }
        if self.environment.as_ref().is_none_or(VarMap::is_empty) {
            if let Some(pairs) = &cli.environment {
                self.environment = Some(VarMap::parse_pairs(pairs)?);
            }
        }

        if self.command.as_ref().is_none_or(CommandSpec::is_blank) && !cli.command.is_empty() {
            self.command = Some(CommandSpec::Tokens(cli.command.clone()));
        }

        self.debug = Some(self.debug.unwrap_or(false) || cli.debug);
        self.exit_with_child = Some(self.exit_with_child.unwrap_or(false) || cli.exit_with_child);

        Ok(self)
    }
}

fn fill(slot: &mut Option<String>, cli_value: &Option<String>) {
    let blank = slot.as_deref().is_none_or(|s| s.trim().is_empty());
    if blank {
        if let Some(value) = cli_value {
            *slot = Some(value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_value_wins_over_cli() {
        let file = RawConfigFile {
            binary: Some("from-file".to_string()),
            basedir: Some(String::new()),
            ..RawConfigFile::default()
        };
        let cli = CliArgs {
            binary: Some("from-cli".to_string()),
            basedir: Some("/srv".to_string()),
            debug: true,
            ..CliArgs::default()
        };

        let merged = file.merge_cli(&cli).unwrap();
        assert_eq!(merged.binary.as_deref(), Some("from-file"));
        assert_eq!(merged.basedir.as_deref(), Some("/srv"));
        assert_eq!(merged.debug, Some(true));
    }

    #[test]
    fn cli_pairs_are_parsed_when_file_has_none() {
        let cli = CliArgs {
            extravars: Some("@port=80".to_string()),
            environment: Some("LANG=C".to_string()),
            command: vec!["@binary".to_string(), "@port".to_string()],
            ..CliArgs::default()
        };

        let merged = RawConfigFile::default().merge_cli(&cli).unwrap();
        assert_eq!(merged.extravars.unwrap().get("@port"), Some("80"));
        assert_eq!(merged.environment.unwrap().get("LANG"), Some("C"));
        assert_eq!(
            merged.command,
            Some(CommandSpec::Tokens(vec![
                "@binary".to_string(),
                "@port".to_string()
            ]))
        );
    }
}
