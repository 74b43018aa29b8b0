//! Replay command - feed a recorded trace through the tracking engine.
//!
//! The trace drives a simulated provider and lifecycle; everything between
//! (filtering, warm-up, watchdog, permission checks) is the real engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use walktrack::sim::{
    load_trace, play_trace, RecordingAlertSurface, SimulatedLifecycle, SimulatedProvider,
    TraceEntry,
};
use walktrack::tracking::{
    spawn_session_logger, Collaborators, TrackingEngine, TrackingEvent, TrackingSession,
    DEFAULT_LOG_INTERVAL,
};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Time allowed for the engine to drain queued fixes after the trace ends.
const DRAIN_DELAY: Duration = Duration::from_millis(100);

/// Arguments for the replay command.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// CSV trace: offset_ms,latitude,longitude,accuracy[,altitude,speed,heading]
    pub trace: PathBuf,

    /// Session identifier
    #[arg(long, default_value = "replay")]
    pub session_id: String,

    /// Playback speed multiplier (2.0 plays twice as fast)
    #[arg(long, default_value = "1.0")]
    pub speed: f64,

    /// Print the final session as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Counters collected from the event stream.
#[derive(Debug, Default)]
struct ReplayStats {
    updates: usize,
    warmups: usize,
}

/// Run the replay command.
pub fn run(args: ReplayArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("replay");

    if !args.speed.is_finite() || args.speed <= 0.0 {
        return Err(CliError::Config(format!(
            "--speed must be a positive number, got {}",
            args.speed
        )));
    }

    let entries = load_trace(&args.trace)?;
    info!(
        trace = %args.trace.display(),
        entries = entries.len(),
        speed = args.speed,
        "Loaded trace"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(replay(args, runner, entries))
}

async fn replay(
    args: ReplayArgs,
    runner: &CliRunner,
    entries: Vec<TraceEntry>,
) -> Result<(), CliError> {
    let provider = Arc::new(SimulatedProvider::new());
    let lifecycle = Arc::new(SimulatedLifecycle::new());
    let alerts = Arc::new(RecordingAlertSurface::new());

    let collaborators = Collaborators::new(Arc::clone(&provider), lifecycle.clone())
        .with_alerts(alerts.clone())
        .with_store(runner.sample_store());
    let engine = Arc::new(TrackingEngine::spawn(collaborators, runner.engine_config()));

    let cancellation = CancellationToken::new();
    if tracing::enabled!(tracing::Level::DEBUG) {
        spawn_session_logger(engine.clone(), cancellation.clone(), DEFAULT_LOG_INTERVAL);
    }

    let printer = spawn_event_printer(engine.subscribe(), !args.json);

    if let Err(e) = engine.start(args.session_id.clone()).await {
        cancellation.cancel();
        printer.abort();
        engine.shutdown().await;
        return Err(e.into());
    }

    tokio::select! {
        last = play_trace(&entries, &provider, &lifecycle, args.speed) => {
            info!(offset_ms = last.as_millis() as u64, "Trace finished");
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping session early");
        }
    }
    tokio::time::sleep(DRAIN_DELAY).await;

    let session = engine.stop().await?;
    cancellation.cancel();
    let stats = printer.await.unwrap_or_default();
    engine.shutdown().await;

    let Some(session) = session else {
        println!("No session was recorded.");
        return Ok(());
    };

    if args.json {
        let output = serde_json::json!({
            "session": session,
            "alerts": alerts.kinds(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&session, &stats, &alerts);
    }

    Ok(())
}

/// Print accepted updates as they arrive; stops at journey completion.
fn spawn_event_printer(
    mut events: broadcast::Receiver<TrackingEvent>,
    verbose: bool,
) -> JoinHandle<ReplayStats> {
    tokio::spawn(async move {
        let mut stats = ReplayStats::default();
        loop {
            match events.recv().await {
                Ok(TrackingEvent::LocationUpdate { sample, .. }) => {
                    stats.updates += 1;
                    if verbose {
                        println!(
                            "{} {:>10.6} {:>11.6}  ±{:<5.1}{}{}",
                            sample.timestamp.format("%H:%M:%S%.3f"),
                            sample.latitude,
                            sample.longitude,
                            sample.accuracy,
                            if sample.smoothed { " smoothed" } else { "" },
                            if sample.background_update { " bg" } else { "" },
                        );
                    }
                }
                Ok(TrackingEvent::SessionUpdate { error, session }) => {
                    if verbose {
                        match error {
                            Some(issue) => println!("-- {}", issue),
                            None if session.is_paused => println!("-- paused"),
                            None => println!("-- tracking"),
                        }
                    }
                }
                Ok(TrackingEvent::WarmupCompleted(report)) => {
                    stats.warmups += 1;
                    if verbose {
                        println!(
                            "-- warm-up {:?} after {} fixes ({} good)",
                            report.outcome, report.attempts, report.good_points
                        );
                    }
                }
                Ok(TrackingEvent::JourneyComplete(_)) => break,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        stats
    })
}

fn print_summary(session: &TrackingSession, stats: &ReplayStats, alerts: &RecordingAlertSurface) {
    println!();
    println!("Session {}", session.id);
    println!("  Samples:    {}", session.coordinate_count());
    println!("  Distance:   {:.0} m", session.distance_m());
    if let Some(duration) = session.duration_secs {
        println!("  Duration:   {:.1} s", duration);
    }
    println!("  Updates:    {}", stats.updates);
    println!("  Warm-ups:   {}", stats.warmups);
    println!("  Background: {} transitions", session.background_segments.len());
    println!("  Recoveries: {}", session.recovery_events.len());

    let shown = alerts.alerts();
    if !shown.is_empty() {
        println!("  Alerts:");
        for alert in shown {
            println!("    - {}", alert.title);
        }
    }
}
