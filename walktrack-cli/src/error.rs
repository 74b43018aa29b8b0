//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use walktrack::config::ConfigFileError;
use walktrack::sim::TraceError;
use walktrack::storage::StorageError;
use walktrack::tracking::{PermissionScope, TrackingError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Trace file could not be read or parsed
    Trace(TraceError),
    /// The tracking engine refused a command
    Tracking(TrackingError),
    /// Side buffer failure
    Storage(StorageError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Failed to serialize output
    Output(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Trace(_) => 2,
            CliError::Tracking(_) => 3,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Trace(TraceError::Parse { .. }) => {
                eprintln!();
                eprintln!("Trace rows look like:");
                eprintln!("  offset_ms,latitude,longitude,accuracy[,altitude,speed,heading]");
                eprintln!("  offset_ms,active|inactive|background");
            }
            CliError::Tracking(TrackingError::PermissionDenied { scope }) => {
                eprintln!();
                match scope {
                    PermissionScope::Foreground => {
                        eprintln!("Location access was denied for the replay session.")
                    }
                    PermissionScope::Background => {
                        eprintln!("Background location access was denied for the replay session.")
                    }
                }
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Check the file with: walktrack config show");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Trace(e) => write!(f, "Invalid trace: {}", e),
            CliError::Tracking(e) => write!(f, "Tracking failed: {}", e),
            CliError::Storage(e) => write!(f, "Sample buffer error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Trace(e) => Some(e),
            CliError::Tracking(e) => Some(e),
            CliError::Storage(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<TraceError> for CliError {
    fn from(e: TraceError) -> Self {
        CliError::Trace(e)
    }
}

impl From<TrackingError> for CliError {
    fn from(e: TrackingError) -> Self {
        CliError::Tracking(e)
    }
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        CliError::Storage(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("bad".to_string()).exit_code(), 2);
        assert_eq!(CliError::Tracking(TrackingError::AlreadyActive).exit_code(), 3);
        assert_eq!(CliError::Output("x".to_string()).exit_code(), 1);
    }

    #[test]
    fn test_trace_error_display() {
        let err = CliError::from(TraceError::Parse {
            line: 4,
            reason: "invalid latitude 'x'".to_string(),
        });
        assert_eq!(err.to_string(), "Invalid trace: line 4: invalid latitude 'x'");
    }
}
