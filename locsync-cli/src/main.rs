//! locsync: keep translated string files in step with a source file.
//!
//! # Usage
//!
//! ```text
//! locsync init [--path <dir>] [--force]
//! locsync [--config <path>] [--verbose] sync [--dry-run] [--keep-going] [--fallback chunk|run]
//! locsync [--config <path>] status [--json]
//! locsync [--config <path>] watch
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, status::StatusArgs, sync::SyncArgs, watch::WatchArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "locsync",
    version,
    about = "Synchronize localized string files with an LLM translation backend",
    long_about = None,
)]
struct Cli {
    /// Config file (default: locsync.yaml in the current directory).
    #[arg(long, short = 'c', global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG still wins).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter locsync.yaml.
    Init(InitArgs),

    /// Translate new and changed strings and rewrite target files.
    Sync(SyncArgs),

    /// Show which targets are out of date, without translating anything.
    Status(StatusArgs),

    /// Sync once, then again whenever the source, config or instructions change.
    Watch(WatchArgs),
}

/// Options shared by every command that loads a config.
#[derive(Debug, Clone)]
pub struct GlobalOpts {
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let global = GlobalOpts {
        config: cli.config,
        verbose: cli.verbose,
    };
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(&global),
        Commands::Status(args) => args.run(&global),
        Commands::Watch(args) => args.run(&global),
    }
}
