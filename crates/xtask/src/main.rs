//! Development tasks for the combat engine
//!
//! This binary provides development utilities using the cargo-xtask pattern.
//! Run with: `cargo xtask <command>`

mod commands;
mod dirs;

use anyhow::Result;
use clap::Parser;
use commands::{Clean, ListSessions, ReadSession, TailLogs};

/// Development tasks for the combat engine
#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tools for the combat engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Monitor runtime logs in real-time
    TailLogs(TailLogs),

    /// Clean session records and logs
    Clean(Clean),

    /// List active and archived sessions per campaign
    ListSessions(ListSessions),

    /// Read and inspect a stored session
    ReadSession(ReadSession),
}

fn main() -> Result<()> {
    // Load .env file if it exists (for COMBAT_DATA_DIR and other env vars)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Command::TailLogs(cmd) => cmd.execute(),
        Command::Clean(cmd) => cmd.execute(),
        Command::ListSessions(cmd) => cmd.execute(),
        Command::ReadSession(cmd) => cmd.execute(),
    }
}
