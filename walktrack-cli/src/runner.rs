//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and collaborator
//! construction so command handlers stay small.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use walktrack::config::{config_file_path, ConfigFile};
use walktrack::logging::{init_logging_full, LoggingGuard};
use walktrack::storage::{FileSampleStore, MemorySampleStore, SampleStore};
use walktrack::tracking::EngineConfig;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Config file override; defaults to ~/.walktrack/config.ini
    /// * `debug_mode` - When true, enables debug-level logging regardless of RUST_LOG
    /// * `console` - Mirror log lines to stderr
    pub fn new(
        config_path: Option<&Path>,
        debug_mode: bool,
        console: bool,
    ) -> Result<Self, CliError> {
        let path = resolve_config_path(config_path);
        let config = ConfigFile::load_from(&path)?;

        let logging_guard = init_logging_full(&config.logging.file, console, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("walktrack v{}", walktrack::VERSION);
        info!("walktrack CLI: {} command", command);
    }

    /// Engine configuration derived from the config file.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::from(&self.config)
    }

    /// Side buffer selected by `[storage]`.
    pub fn sample_store(&self) -> Arc<dyn SampleStore> {
        let settings = &self.config.storage;
        match &settings.buffer_file {
            Some(path) => {
                info!(path = %path.display(), "Buffering unsaved samples to file");
                Arc::new(FileSampleStore::with_capacity(path, settings.max_entries))
            }
            None => Arc::new(MemorySampleStore::with_capacity(settings.max_entries)),
        }
    }
}

/// Config path from `--config`, or the default location.
pub fn resolve_config_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}
