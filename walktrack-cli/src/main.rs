//! walktrack CLI - Command-line interface
//!
//! Replays recorded walk traces through the tracking engine and manages the
//! configuration file.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::replay::ReplayArgs;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "walktrack")]
#[command(version = walktrack::VERSION)]
#[command(about = "Location tracking and recovery engine for walking journeys", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.walktrack/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (includes periodic session status)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a recorded CSV trace through the tracking engine
    Replay(ReplayArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay(args) => {
            // JSON output is meant for piping; keep the console quiet
            let console = !args.json;
            CliRunner::new(cli.config.as_deref(), cli.debug, console)
                .and_then(|runner| commands::replay::run(args, &runner))
        }
        Commands::Config { command } => commands::config::run(command, cli.config.as_deref()),
    };

    if let Err(e) = result {
        e.exit();
    }
}
