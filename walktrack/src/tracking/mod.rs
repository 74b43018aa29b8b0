//! Location tracking & recovery engine.
//!
//! This module turns a noisy, interruptible platform GPS stream into a clean
//! recorded walk, and keeps tracking alive through permission loss, signal
//! loss and app backgrounding.
//!
//! # Data flow
//!
//! ```text
//! LocationProvider ──raw fix──► AccuracyFilter ──sample──► TrackingSession
//!                                                              │
//!                  consumers ◄── TrackingEvent::LocationUpdate ─┘
//! ```
//!
//! Control is driven by timers and provider pushes, never by caller polling:
//!
//! - **Warm-up** - short high-frequency burst after start, resume and every
//!   foreground return
//! - **Permission monitor** - re-validates permission every 120s (after a 60s settle)
//! - **Signal watchdog** - 30s of silence starts up to 5 recovery probes, 10s apart
//! - **Lifecycle bridge** - timestamps background/foreground transitions
//!
//! # Components
//!
//! - [`sample`] - `RawLocation`, `LocationSample`, coordinate validity
//! - [`geo`] - haversine distance
//! - [`filter`] - `AccuracyFilter` and `RecentWindow`
//! - [`session`] - `TrackingSession` and its annotations
//! - [`coordinates`] - `CoordinateLog`, chunked sample storage shared between snapshots
//! - [`warmup`] - `WarmupController`
//! - [`permission`] - `PermissionMonitor`
//! - [`watchdog`] - `SignalWatchdog` and recovery probes
//! - [`lifecycle`] - `LifecycleBridge`
//! - [`alerts`] - alert catalogue
//! - [`provider`] - collaborator traits
//! - [`engine`] - `TrackingEngine` and its actor

pub mod alerts;
pub mod coordinates;
pub mod engine;
pub mod error;
pub mod events;
pub mod filter;
pub mod geo;
pub mod lifecycle;
mod logger;
pub mod permission;
pub mod provider;
pub mod sample;
pub mod session;
pub mod warmup;
pub mod watchdog;

pub use alerts::{Alert, AlertAction, AlertActionKind, AlertCatalog, AlertKind, Platform};
pub use coordinates::CoordinateLog;
pub use engine::{Collaborators, EngineConfig, EngineStatus, TrackingEngine, TrackingState};
pub use error::{ProviderError, RejectReason, TrackingError, TrackingIssue};
pub use events::TrackingEvent;
pub use filter::{AccuracyFilter, FilterConfig, FilterOutcome, RecentWindow};
pub use geo::{haversine_distance_m, path_length_m, EARTH_RADIUS_M};
pub use lifecycle::{AppState, LifecycleBridge, LifecycleChange};
pub use permission::{
    PermissionMonitor, PermissionMonitorConfig, PermissionScope, PermissionState, PermissionStatus,
};
pub use provider::{
    AlertSurface, AppLifecycleSource, LocationAccuracy, LocationProvider, LocationSubscription,
    PositionOptions, SettingsNavigator, SubscriptionId, TracingAlertSurface,
    TracingSettingsNavigator, WatchOptions,
};
pub use sample::{is_valid_coordinate, AccuracyBand, LocationSample, RawLocation};
pub use session::{
    BackgroundSegment, PauseReason, RecoveryEvent, RecoveryKind, TrackingSession, TransitionKind,
};
pub use warmup::{
    WarmupConfig, WarmupController, WarmupOutcome, WarmupPhase, WarmupReport, WarmupStatus,
};
pub use watchdog::{RecoveryState, SignalWatchdog, WatchdogConfig};

// Session logger for walk analysis (DEBUG level only)
pub use logger::{spawn_session_logger, DEFAULT_LOG_INTERVAL};
