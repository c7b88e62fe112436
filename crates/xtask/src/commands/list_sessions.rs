//! List stored sessions per campaign
//!
//! Shows the active tier (sessions a restart would resume) and, with
//! `--history`, the archived encounters.

use anyhow::{Context, Result};
use clap::Parser;
use combat_runtime::{FileSessionRepository, SessionRepository};
use console::style;
use std::path::PathBuf;

use crate::dirs;

/// List active and archived sessions
#[derive(Parser, Debug)]
pub struct ListSessions {
    /// Only this campaign (defaults to every campaign)
    #[arg(short, long, value_name = "CAMPAIGN")]
    campaign: Option<String>,

    /// Include archived encounters
    #[arg(long)]
    history: bool,

    /// Custom data directory (defaults to platform-specific location)
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

impl ListSessions {
    pub fn execute(self) -> Result<()> {
        let data_dir = self.data_dir.unwrap_or_else(dirs::data_dir);
        if !data_dir.exists() {
            anyhow::bail!(
                "Data directory does not exist: {}\n\
                 No sessions found. Start a combat first.",
                data_dir.display()
            );
        }

        let repo = FileSessionRepository::new(&data_dir)
            .with_context(|| format!("Failed to open session store: {}", data_dir.display()))?;

        let campaigns = match self.campaign {
            Some(campaign) => vec![campaign],
            None => repo.list_campaigns()?,
        };

        if campaigns.is_empty() {
            println!("{}", style("No campaigns found").dim());
            return Ok(());
        }

        for campaign in campaigns {
            println!("{} {}", style("Campaign:").bold().cyan(), campaign);

            let active = repo.list_active(&campaign)?;
            if active.is_empty() {
                println!("  {}", style("no active sessions").dim());
            }
            for session_id in active {
                match repo.load_by_id(&campaign, &session_id) {
                    Ok(Some(session)) => println!(
                        "  {} {} - {} round {}, {} combatants, scene {}",
                        style("●").green(),
                        style(&session.session_id).bold(),
                        session.status,
                        session.round_number,
                        session.combatants.len(),
                        session.scene_id
                    ),
                    Ok(None) => {}
                    Err(err) => println!(
                        "  {} {} - {}",
                        style("✗").red(),
                        session_id,
                        style(err).red()
                    ),
                }
            }

            if self.history {
                for summary in repo.list_history(&campaign)? {
                    println!(
                        "  {} {} - {}{} after {} rounds, archived {} ({}s)",
                        style("○").dim(),
                        summary.session_id,
                        summary.status,
                        summary
                            .outcome
                            .map(|o| format!(" ({o})"))
                            .unwrap_or_default(),
                        summary.round_number,
                        summary.archived_at.format("%Y-%m-%d %H:%M:%S"),
                        summary.duration_seconds
                    );
                }
            }
            println!();
        }

        Ok(())
    }
}
