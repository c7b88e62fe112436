//! Read and inspect a stored combat session
//!
//! Looks in the active tier first, then in history.

use anyhow::{Context, Result};
use clap::Parser;
use combat_core::{CombatConfig, CombatSession, MechanicsReconciler};
use combat_runtime::{FileSessionRepository, SessionRepository};
use console::style;
use std::path::PathBuf;

use crate::dirs;

/// Read and inspect a stored session
#[derive(Parser)]
pub struct ReadSession {
    /// Campaign owning the session
    #[arg(value_name = "CAMPAIGN")]
    campaign: String,

    /// Session ID to read; defaults to the campaign's active session
    #[arg(value_name = "SESSION")]
    session: Option<String>,

    /// Custom data directory (defaults to platform-specific location)
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    format: OutputFormat,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    /// Summary view (turn order, combatant resources, statuses)
    Summary,
    /// Full JSON output
    Json,
    /// Pretty-printed debug format
    Debug,
}

impl ReadSession {
    pub fn execute(self) -> Result<()> {
        let data_dir = self.data_dir.unwrap_or_else(dirs::data_dir);
        let repo = FileSessionRepository::new(&data_dir)
            .with_context(|| format!("Failed to open session store: {}", data_dir.display()))?;

        let (session, tier) = match self.session {
            Some(id) => {
                if let Some(session) = repo.load_by_id(&self.campaign, &id)? {
                    (session, "active")
                } else if let Some(record) = repo.load_history(&self.campaign, &id)? {
                    (record.session, "history")
                } else {
                    anyhow::bail!("Session {} not found in campaign {}", id, self.campaign);
                }
            }
            None => match repo.load_active(&self.campaign)? {
                Some(session) => (session, "active"),
                None => anyhow::bail!("Campaign {} has no active session", self.campaign),
            },
        };

        println!("{} {}", style("Campaign:").bold().cyan(), self.campaign);
        println!(
            "{} {} ({})",
            style("Session:").bold().cyan(),
            session.session_id,
            tier
        );
        println!();

        match self.format {
            OutputFormat::Summary => print_summary(&session),
            OutputFormat::Json => print_json(&session)?,
            OutputFormat::Debug => println!("{:#?}", session),
        }

        Ok(())
    }
}

fn print_summary(session: &CombatSession) {
    let config = CombatConfig::default();
    let reconciler = MechanicsReconciler::new(&config);
    let info = reconciler.turn_info(session);
    let statuses = reconciler.status_map(session, &());

    println!("{}", style("=== Combat Summary ===").bold().green());
    println!();

    println!("{}", style("Encounter:").bold().yellow());
    println!("  Scene: {}", session.scene_id);
    println!("  Status: {}", session.status);
    if let Some(outcome) = session.outcome {
        println!("  Outcome: {}", outcome);
    }
    println!("  Round: {}", info.round_number);
    println!("  Turn: {}", info.turn_number);
    println!("  Log Entries: {}", session.combat_log.len());
    println!();

    println!("{}", style("Initiative Order:").bold().yellow());
    for (slot, name) in info.initiative_order.iter().enumerate() {
        let marker = if slot + 1 == info.turn_number && session.is_active() {
            style("→").cyan().bold().to_string()
        } else {
            " ".to_string()
        };
        let Some(status) = statuses.get(name) else {
            println!("  {} {}", marker, name);
            continue;
        };
        let side = if status.hostile {
            style("hostile").red()
        } else {
            style("friendly").green()
        };
        let down = if status.conscious {
            String::new()
        } else {
            format!(" {}", style("(down)").dim())
        };
        println!(
            "  {} {} [{}] HP {} AP {}{}",
            marker, name, side, status.hp, status.ap, down
        );
        if !status.status.is_empty() {
            println!("      {}", style(status.status.join(", ")).dim());
        }
    }
    println!();
}

fn print_json(session: &CombatSession) -> Result<()> {
    let json =
        serde_json::to_string_pretty(session).context("Failed to serialize session to JSON")?;
    println!("{}", json);
    Ok(())
}
