// src/config/validate.rs

use std::path::PathBuf;

use crate::config::model::{CommandSpec, Config, DEFAULT_NOTIFY_MSG, RawConfigFile};
use crate::errors::{Result, ShrinkwrapError};

impl TryFrom<RawConfigFile> for Config {
    type Error = ShrinkwrapError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_required_fields(&raw)?;
        validate_notify_msg(&raw)?;

        // Presence checked above.
        let binary = raw.binary.unwrap_or_default().trim().to_string();
        let basedir = PathBuf::from(raw.basedir.unwrap_or_default().trim());

        let service_name = match raw.systemd {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => binary.clone(),
        };

        let mut commands = Vec::with_capacity(1 + raw.extra_commands.len());
        commands.extend(raw.command.map(CommandSpec::into_tokens));
        for (idx, extra) in raw.extra_commands.into_iter().enumerate() {
            if extra.is_blank() {
                return Err(ShrinkwrapError::ConfigError(format!(
                    "extra_commands[{idx}] is empty"
                )));
            }
            commands.push(extra.into_tokens());
        }

        let tempdir = raw
            .tempdir
            .filter(|t| !t.trim().is_empty())
            .map(PathBuf::from);

        Ok(Config::new_unchecked(
            binary,
            service_name,
            basedir,
            commands,
            raw.extravars.unwrap_or_default(),
            raw.environment.unwrap_or_default(),
            tempdir,
            raw.notifymsg
                .unwrap_or_else(|| DEFAULT_NOTIFY_MSG.to_string()),
            raw.debug.unwrap_or(false),
            raw.exit_with_child.unwrap_or(false),
        ))
    }
}

/// `binary`, `basedir` and `command` must all be present and non-blank.
///
/// Every missing field is reported at once.
fn ensure_required_fields(raw: &RawConfigFile) -> Result<()> {
    let mut missing = Vec::new();

    if is_blank(raw.binary.as_deref()) {
        missing.push("binary".to_string());
    }
    if is_blank(raw.basedir.as_deref()) {
        missing.push("basedir".to_string());
    }
    if raw.command.as_ref().is_none_or(CommandSpec::is_blank) {
        missing.push("command".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ShrinkwrapError::MissingFields(missing))
    }
}

fn validate_notify_msg(raw: &RawConfigFile) -> Result<()> {
    if let Some(msg) = &raw.notifymsg {
        if msg.is_empty() {
            return Err(ShrinkwrapError::ConfigError(
                "notifymsg must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> RawConfigFile {
        RawConfigFile {
            binary: Some("httpd".to_string()),
            basedir: Some("/opt/app".to_string()),
            command: Some(CommandSpec::Line("@binary --port @port".to_string())),
            ..RawConfigFile::default()
        }
    }

    #[test]
    fn service_name_and_marker_have_defaults() {
        let cfg = Config::try_from(minimal()).unwrap();
        assert_eq!(cfg.service_name(), "httpd");
        assert_eq!(cfg.ready_marker(), DEFAULT_NOTIFY_MSG);
        assert_eq!(cfg.commands(), &[vec!["@binary", "--port", "@port"]]);
        assert!(cfg.tempdir().is_none());
        assert!(!cfg.debug());
    }

    #[test]
    fn all_missing_fields_are_listed() {
        let err = Config::try_from(RawConfigFile {
            binary: Some("  ".to_string()),
            ..RawConfigFile::default()
        })
        .unwrap_err();

        match err {
            ShrinkwrapError::MissingFields(fields) => {
                assert_eq!(fields, vec!["binary", "basedir", "command"]);
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn empty_notify_msg_is_rejected() {
        let raw = RawConfigFile {
            notifymsg: Some(String::new()),
            ..minimal()
        };
        assert!(matches!(
            Config::try_from(raw),
            Err(ShrinkwrapError::ConfigError(_))
        ));
    }

    #[test]
    fn extra_commands_become_additional_templates() {
        let raw = RawConfigFile {
            extra_commands: vec![CommandSpec::Tokens(vec![
                "@binary".to_string(),
                "--worker".to_string(),
            ])],
            ..minimal()
        };
        let cfg = Config::try_from(raw).unwrap();
        assert_eq!(cfg.commands().len(), 2);
        assert_eq!(cfg.commands()[1], vec!["@binary", "--worker"]);
    }
}
