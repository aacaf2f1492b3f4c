// src/lib.rs

pub mod cleanup;
pub mod cli;
pub mod config;
pub mod console;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod notify;
pub mod resolve;
pub mod template;

use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::console::ConsoleSink;
use crate::engine::{Controller, SignalListener, StopReason, Supervisor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::notify::SystemdNotifier;
use crate::resolve::resolve_binary;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the shared supervisor (console, notifier, worker registry)
/// - signal handlers, installed before any child is started
/// - the controller's start / wait / shutdown sequence
pub async fn run(config: Config, console: ConsoleSink, dry_run: bool) -> Result<()> {
    let fs = RealFileSystem;

    if dry_run {
        print_dry_run(&fs, &config, &console)?;
        return Ok(());
    }

    let notifier = SystemdNotifier::from_env();
    debug!(socket = ?notifier.socket(), "notify socket");
    let supervisor = Supervisor::new(console, Arc::new(notifier), config.service_name());

    let mut signals = SignalListener::install()?;
    let mut controller = Controller::new(supervisor, config);

    if let Err(err) = controller.start(&fs) {
        error!(error = %err, "startup failed");
        tokio::task::spawn_blocking(move || controller.shutdown(StopReason::StartupFailed))
            .await?;
        return Err(err.into());
    }

    let reason = controller.wait_for_stop(&mut signals).await;

    // Joining workers blocks; keep it off the async workers.
    let report = tokio::task::spawn_blocking(move || controller.shutdown(reason)).await?;
    info!(
        workers = report.exits.len(),
        notified = report.notified,
        "shrinkwrap stopped"
    );

    if !report.is_success() {
        bail!(
            "{} worker(s) failed to start, {} worker thread(s) panicked",
            report.spawn_failures,
            report.panicked
        );
    }
    Ok(())
}

/// Print the resolved binary and every expanded command; start nothing.
fn print_dry_run(fs: &dyn FileSystem, config: &Config, console: &ConsoleSink) -> Result<()> {
    let binary = resolve_binary(fs, config.binary(), config.basedir())?;

    console.write_line("shrinkwrap dry-run");
    console.write_line(&format!("  service: {}", config.service_name()));
    console.write_line(&format!("  binary: {binary}"));
    console.write_line(&format!("  ready marker: {}", config.ready_marker()));
    if let Some(tempdir) = config.tempdir() {
        console.write_line(&format!("  tempdir: {}", tempdir.display()));
    }

    console.write_line(&format!("commands ({}):", config.commands().len()));
    for tpl in config.commands() {
        let command = template::expand(&binary, tpl, config.extra_vars(), config.environment());
        console.write_line(&format!("  - {command}"));
        for (key, value) in command.env.iter() {
            console.write_line(&format!("      env {key}={value}"));
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
