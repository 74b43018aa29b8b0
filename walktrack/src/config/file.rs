//! Reading and writing `~/.walktrack/config.ini`.
//!
//! An absent file is not an error: it loads as [`ConfigFile::default`].
//! Saves go through a sibling temp file and a rename, so a crash mid-save
//! never leaves a truncated config behind.
//!
//! [`ConfigFile::default`]: super::ConfigFile

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

/// Name of the per-user directory under `$HOME`.
const CONFIG_DIR_NAME: &str = ".walktrack";

/// Name of the config file inside [`config_directory`].
const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors loading, validating or saving the config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A key holds a value the tracking engine cannot use.
    #[error("[{section}] {key} = '{value}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFileError {
    /// File the error refers to, if it is an I/O error.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Write { path, .. } => Some(path),
            Self::InvalidValue { .. } => None,
        }
    }

    fn write(path: &Path, source: io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl super::ConfigFile {
    /// Load from [`config_file_path`].
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        super::parser::parse_ini(&ini)
    }

    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Write to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigFileError::write(parent, e))?;
        }

        let tmp_path = path.with_extension("ini.tmp");
        fs::write(&tmp_path, super::writer::to_config_string(self))
            .map_err(|e| ConfigFileError::write(&tmp_path, e))?;
        fs::rename(&tmp_path, path).map_err(|e| ConfigFileError::write(path, e))
    }

    /// Write defaults to `path` unless a file is already there.
    pub fn ensure_exists_at(path: &Path) -> Result<PathBuf, ConfigFileError> {
        if !path.exists() {
            Self::default().save_to(path)?;
        }
        Ok(path.to_path_buf())
    }
}

/// `~/.walktrack`, or `./.walktrack` when the home directory is unknown.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::super::ConfigFile;
    use super::*;

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_ensure_exists_writes_once() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        ConfigFile::ensure_exists_at(&config_path).unwrap();
        assert!(config_path.exists());

        std::fs::write(&config_path, "[watchdog]\nmax_recovery_attempts = 2\n").unwrap();
        ConfigFile::ensure_exists_at(&config_path).unwrap();

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config.watchdog.max_recovery_attempts, 2);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        ConfigFile::default().save_to(&config_path).unwrap();
        ConfigFile::default().save_to(&config_path).unwrap();

        let names: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("config.ini")]);
    }

    #[test]
    fn test_unreadable_path_reports_path() {
        let temp_dir = tempfile::TempDir::new().unwrap();

        // A directory exists but cannot be read as a file
        let err = ConfigFile::load_from(temp_dir.path()).unwrap_err();
        assert!(matches!(err, ConfigFileError::Read { .. }));
        assert_eq!(err.path(), Some(temp_dir.path()));
    }

    #[test]
    fn test_invalid_value_has_no_path() {
        let err = ConfigFileError::InvalidValue {
            section: "watchdog".into(),
            key: "max_recovery_attempts".into(),
            value: "0".into(),
            reason: "must be at least 1".into(),
        };
        assert!(err.path().is_none());
        assert_eq!(
            err.to_string(),
            "[watchdog] max_recovery_attempts = '0': must be at least 1"
        );
    }

    #[test]
    fn test_config_paths() {
        assert!(config_file_path().ends_with(".walktrack/config.ini"));
    }
}
