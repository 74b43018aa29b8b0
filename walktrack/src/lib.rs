//! walktrack - Location tracking & recovery engine for walking journeys
//!
//! This library turns a noisy, interruptible platform location stream into a
//! clean recorded walk. It filters and smooths fixes, keeps tracking alive
//! through permission loss, GPS signal loss and app backgrounding, and tells
//! the user what happened through platform alerts.
//!
//! # High-Level API
//!
//! The [`tracking`] module provides the engine facade:
//!
//! ```ignore
//! use std::sync::Arc;
//! use walktrack::tracking::{Collaborators, EngineConfig, TrackingEngine, TrackingEvent};
//!
//! let collaborators = Collaborators::new(provider, lifecycle);
//! let engine = TrackingEngine::spawn(collaborators, EngineConfig::default());
//!
//! let mut events = engine.subscribe();
//! engine.start("walk-2024-06-01").await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let TrackingEvent::LocationUpdate { sample, .. } = event {
//!         println!("{:.5}, {:.5}", sample.latitude, sample.longitude);
//!     }
//! }
//! ```
//!
//! Platform access goes through the traits in [`tracking::provider`]; the
//! [`sim`] module implements them in-process for tests and trace replay.

pub mod config;
pub mod logging;
pub mod sim;
pub mod storage;
pub mod time;
pub mod tracking;

/// Version of the walktrack library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
