//! Integration tests for configuration-driven engine setup.
//!
//! Verifies that a config.ini on disk flows through `EngineConfig` into a
//! running engine, and that the file-backed side buffer holds exactly the
//! samples a crash would otherwise lose.
//!
//! Run with: `cargo test --test config_integration`

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use walktrack::config::ConfigFile;
use walktrack::sim::{SimulatedLifecycle, SimulatedProvider};
use walktrack::storage::{FileSampleStore, SampleStore};
use walktrack::tracking::{
    Collaborators, EngineConfig, Platform, RawLocation, TrackingEngine, TrackingState,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn write_config(dir: &TempDir, contents: &str) -> ConfigFile {
    let path = dir.path().join("config.ini");
    std::fs::write(&path, contents).unwrap();
    ConfigFile::load_from(&path).unwrap()
}

fn fix(i: u32) -> RawLocation {
    RawLocation::new(48.8584 + f64::from(i) * 0.0001, 2.2945, 4.0)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_config_file_maps_to_engine_config() {
    let dir = TempDir::new().unwrap();
    let file = write_config(
        &dir,
        r#"
[filter]
reject_threshold_m = 60
good_accuracy_m = 10

[tracking]
platform = android
time_interval_ms = 2000

[warmup]
good_points = 5

[watchdog]
signal_timeout_secs = 20
max_recovery_attempts = 3
"#,
    );

    let config = EngineConfig::from(&file);
    assert_eq!(config.filter.reject_threshold_m, 60.0);
    assert_eq!(config.warmup.good_accuracy_m, 10.0);
    assert_eq!(config.warmup.required_good_points, 5);
    assert_eq!(config.tracking.time_interval, Duration::from_secs(2));
    assert_eq!(config.platform, Platform::Android);
    assert_eq!(config.watchdog.signal_timeout, Duration::from_secs(20));
    assert_eq!(config.watchdog.max_recovery_attempts, 3);
    // Untouched
    assert_eq!(config.permissions, EngineConfig::default().permissions);
}

#[tokio::test]
async fn test_file_buffer_survives_until_stop() {
    let dir = TempDir::new().unwrap();
    let buffer_path = dir.path().join("data").join("unsaved.json");
    let file = write_config(
        &dir,
        &format!(
            "[storage]\nbuffer_file = {}\nmax_entries = 2\n",
            buffer_path.display()
        ),
    );
    assert_eq!(file.storage.buffer_file.as_deref(), Some(buffer_path.as_path()));

    let provider = Arc::new(SimulatedProvider::new());
    let lifecycle = Arc::new(SimulatedLifecycle::new());
    let store = Arc::new(FileSampleStore::with_capacity(
        &buffer_path,
        file.storage.max_entries,
    ));
    let engine = TrackingEngine::spawn(
        Collaborators::new(Arc::clone(&provider), lifecycle).with_store(store),
        EngineConfig::from(&file),
    );

    engine.start("walk-file").await.unwrap();
    for i in 0..3 {
        provider.emit(fix(i));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Capped at two; the oldest was evicted
    let unsaved = engine.unsaved_samples().await.unwrap();
    assert_eq!(unsaved.len(), 2);

    // A fresh reader (the next app launch) sees the same samples
    let reopened = FileSampleStore::new(&buffer_path).read_all().unwrap();
    assert_eq!(reopened, unsaved);
    assert_eq!(reopened[1].latitude, fix(2).latitude);

    let session = engine.stop().await.unwrap().unwrap();
    assert_eq!(session.coordinate_count(), 3);
    assert!(engine.unsaved_samples().await.unwrap().is_empty());
    assert!(!buffer_path.exists());

    assert_eq!(engine.status().await.unwrap().state, TrackingState::Idle);
    engine.shutdown().await;
}
