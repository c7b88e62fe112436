//! Clean session records and logs command
//!
//! Provides utilities to clean up the combat engine's persistent data:
//! - Logs (cache directory)
//! - Session records (data directory), whole or per campaign
//!
//! Safety: Always prompts for confirmation before deletion.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::io::{self, Write};

use crate::dirs;

/// Clean session records and logs
#[derive(Parser, Debug)]
pub struct Clean {
    /// Clean only logs (cache directory)
    #[arg(long)]
    pub logs: bool,

    /// Clean only session records (data directory)
    #[arg(long)]
    pub data: bool,

    /// Skip confirmation prompt (dangerous!)
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Specific campaign to clean (only works with --data)
    #[arg(long)]
    pub campaign: Option<String>,
}

impl Clean {
    pub fn execute(self) -> Result<()> {
        // If no flags specified, clean both
        let clean_logs = self.logs || !self.data;
        let clean_data = self.data || !self.logs;

        if self.campaign.is_some() && !self.data {
            anyhow::bail!("--campaign can only be used with --data");
        }

        let mut targets = Vec::new();

        if clean_logs {
            let log_dir = dirs::log_dir();
            if log_dir.exists() {
                targets.push(("All logs".to_string(), log_dir));
            }
        }

        if clean_data {
            let data_dir = dirs::data_dir();
            if let Some(ref campaign) = self.campaign {
                let campaign_dir = data_dir.join(campaign);
                if !campaign_dir.is_dir() {
                    eprintln!(
                        "{} Campaign not found: {}",
                        style("✗").red().bold(),
                        style(campaign).cyan()
                    );
                    anyhow::bail!("Campaign directory does not exist");
                }
                targets.push((format!("Session records ({})", campaign), campaign_dir));
            } else if data_dir.exists() {
                targets.push(("All session records".to_string(), data_dir));
            }
        }

        if targets.is_empty() {
            println!(
                "{}",
                style("Nothing to clean - directories don't exist yet").dim()
            );
            return Ok(());
        }

        println!("{}", style("🧹 Clean Combat Data").yellow().bold());
        println!();
        println!("The following will be deleted:");
        for (label, path) in &targets {
            println!("  {} {}", style("→").cyan(), style(label).bold());
            println!("    {}", style(path.display()).dim());
        }
        println!();

        if !self.yes && !confirm()? {
            println!("{}", style("Cancelled").dim());
            return Ok(());
        }

        for (label, path) in targets {
            print!("Deleting {}... ", label);
            io::stdout().flush()?;

            std::fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to delete: {}", path.display()))?;

            println!("{}", style("✓").green());
        }

        println!();
        println!("{}", style("✓ Cleanup complete!").green().bold());

        Ok(())
    }
}

/// Prompt user for confirmation
fn confirm() -> Result<bool> {
    print!("{} ", style("Proceed? [y/N]").yellow().bold());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
