//! Configuration management CLI commands.
//!
//! Provides `config init`, `config show` and `config path` for creating and
//! inspecting the configuration file.

use std::path::Path;

use clap::Subcommand;
use walktrack::config::ConfigFile;

use crate::error::CliError;
use crate::runner::resolve_config_path;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a commented configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration (file values over defaults)
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);
    match command {
        ConfigCommands::Init { force } => run_init(&path, force),
        ConfigCommands::Show => run_show(&path),
        ConfigCommands::Path => run_path(&path),
    }
}

/// Create the configuration file.
fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        println!("Configuration already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Print the effective configuration.
fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;

    println!("Configuration Settings");
    println!("======================");
    if path.exists() {
        println!("Source: {}", path.display());
    } else {
        println!("Source: defaults ({} not found)", path.display());
    }
    println!();

    println!("[filter]");
    println!("  reject_threshold_m = {}", config.filter.reject_threshold_m);
    println!("  excellent_accuracy_m = {}", config.filter.excellent_accuracy_m);
    println!("  good_accuracy_m = {}", config.filter.good_accuracy_m);
    println!("  smoothing_distance_m = {}", config.filter.smoothing_distance_m);
    println!("  window_size = {}", config.filter.window_size);
    println!();

    println!("[tracking]");
    println!("  time_interval_ms = {}", config.tracking.time_interval_ms);
    println!("  distance_interval_m = {}", config.tracking.distance_interval_m);
    println!("  platform = {}", config.tracking.platform);
    println!();

    println!("[warmup]");
    println!("  interval_ms = {}", config.warmup.interval_ms);
    println!("  good_points = {}", config.warmup.good_points);
    println!("  max_duration_secs = {}", config.warmup.max_duration_secs);
    println!("  max_attempts = {}", config.warmup.max_attempts);
    println!();

    println!("[permissions]");
    println!("  settle_delay_secs = {}", config.permissions.settle_delay_secs);
    println!("  poll_interval_secs = {}", config.permissions.poll_interval_secs);
    println!();

    println!("[watchdog]");
    println!("  signal_timeout_secs = {}", config.watchdog.signal_timeout_secs);
    println!(
        "  max_recovery_attempts = {}",
        config.watchdog.max_recovery_attempts
    );
    println!("  retry_interval_secs = {}", config.watchdog.retry_interval_secs);
    println!("  probe_timeout_secs = {}", config.watchdog.probe_timeout_secs);
    println!();

    println!("[storage]");
    match &config.storage.buffer_file {
        Some(file) => println!("  buffer_file = {}", file.display()),
        None => println!("  buffer_file = (memory only)"),
    }
    println!("  max_entries = {}", config.storage.max_entries);
    println!();

    println!("[logging]");
    println!("  file = {}", config.logging.file.display());

    Ok(())
}

/// Show the configuration file path.
fn run_path(path: &Path) -> Result<(), CliError> {
    println!("{}", path.display());
    Ok(())
}
