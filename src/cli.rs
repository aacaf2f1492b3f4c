// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every value here may also come from the TOML config file; see
//! [`crate::config::merge`] for how the two are combined.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `shrinkwrap`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "shrinkwrap",
    version,
    about = "Configurable intermediary process host for systemd.",
    long_about = None,
    after_help = "Example: shrinkwrap --binary httpd --basedir /usr/bin --extravars @port=80 --command @binary --port @port"
)]
pub struct CliArgs {
    /// The target binary name, matched as `*NAME*` against file names under `--basedir`.
    #[arg(short = 'b', long, value_name = "NAME")]
    pub binary: Option<String>,

    /// The systemd unit name, if different from the binary.
    #[arg(short = 's', long = "systemd", value_name = "UNIT")]
    pub service_name: Option<String>,

    /// Base directory searched (recursively) for the target binary.
    #[arg(short = 'd', long, value_name = "DIR")]
    pub basedir: Option<String>,

    /// `@key=value;@key=value` variables substituted into the command.
    #[arg(short = 'e', long, value_name = "PAIRS")]
    pub extravars: Option<String>,

    /// `KEY=value;KEY=value` environment variables set for the child.
    #[arg(short = 'v', long, value_name = "PAIRS")]
    pub environment: Option<String>,

    /// Directory cleaned of entries containing the binary name before launch.
    #[arg(short = 't', long, value_name = "DIR")]
    pub tempdir: Option<String>,

    /// Substring in the child's output that triggers systemd `READY=1`.
    ///
    /// Defaults to `READY` when neither the CLI nor the config file sets it.
    #[arg(short = 'n', long, value_name = "TEXT")]
    pub notifymsg: Option<String>,

    /// Verbose logging (same as `--log-level debug`).
    #[arg(long)]
    pub debug: bool,

    /// Path to the config file (TOML).
    ///
    /// Default: `shrinkwrap.toml` in the current working directory, ignored if absent.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `--debug`, then `SHRINKWRAP_LOG`, then `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve the binary and expand the command, print them, run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Stop (and notify STOPPING) once every child has exited on its own.
    #[arg(long)]
    pub exit_with_child: bool,

    /// The command to run; `@binary` and any `--extravars` keys are templated.
    ///
    /// Must be the last option: it captures everything after it.
    #[arg(
        short = 'c',
        long,
        value_name = "ARGS",
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_captures_remaining_arguments() {
        let args = CliArgs::try_parse_from([
            "shrinkwrap",
            "-b",
            "httpd",
            "--basedir",
            "/opt/app",
            "--command",
            "@binary",
            "--port",
            "@port",
        ])
        .unwrap();

        assert_eq!(args.binary.as_deref(), Some("httpd"));
        assert_eq!(args.basedir.as_deref(), Some("/opt/app"));
        assert_eq!(args.command, vec!["@binary", "--port", "@port"]);
        assert!(!args.debug);
    }

    #[test]
    fn systemd_flag_maps_to_service_name() {
        let args =
            CliArgs::try_parse_from(["shrinkwrap", "--systemd", "web", "--debug"]).unwrap();
        assert_eq!(args.service_name.as_deref(), Some("web"));
        assert!(args.debug);
        assert!(args.command.is_empty());
    }
}
