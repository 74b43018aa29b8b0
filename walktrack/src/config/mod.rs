//! User configuration for walktrack.
//!
//! Settings are read from `~/.walktrack/config.ini`, one `[section]` per
//! tracking component. Missing keys fall back to the defaults the tracking
//! modules use, so an empty or absent file yields `ConfigFile::default()`.
//!
//! # Example
//!
//! ```ignore
//! use walktrack::config::ConfigFile;
//! use walktrack::tracking::EngineConfig;
//!
//! let file = ConfigFile::load()?;
//! let engine_config = EngineConfig::from(&file);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{
    default_buffer_file, default_log_file, DEFAULT_DISTANCE_INTERVAL_M, DEFAULT_TIME_INTERVAL_MS,
    MIN_TIME_INTERVAL_MS,
};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, FilterSettings, LoggingSettings, PermissionSettings, StorageSettings,
    TrackingSettings, WarmupSettings, WatchdogSettings,
};
