//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (init, show, path)
//! - [`replay`] - Feed a recorded trace through the tracking engine

pub mod config;
pub mod replay;
