//! Tail runtime logs command
//!
//! Follows the runtime's log file, similar to `tail -f`.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dirs;

/// Monitor runtime logs in real-time
#[derive(Parser, Debug)]
pub struct TailLogs {
    /// Log file to follow (defaults to the runtime's log file)
    pub file: Option<PathBuf>,

    /// Number of lines to show from history before tailing
    #[arg(short = 'n', long, default_value = "10")]
    pub lines: usize,

    /// Only show lines containing this text (e.g. a campaign or session id)
    #[arg(short, long)]
    pub grep: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, default_value = "100")]
    pub poll_interval: u64,
}

impl TailLogs {
    pub fn execute(self) -> Result<()> {
        let log_path = match &self.file {
            Some(path) => path.clone(),
            None => dirs::log_dir().join(dirs::LOG_FILE),
        };

        if !log_path.exists() {
            eprintln!("{}", style("✗ Log file not found").red().bold());
            eprintln!("  Path: {}", style(log_path.display()).dim());
            eprintln!();
            eprintln!("  Set COMBAT_LOG_DIR for the runtime to write a log file.");
            anyhow::bail!("Log file does not exist");
        }

        println!("{}", style("📝 Monitoring Combat Logs").green().bold());
        println!("  Log file: {}", style(log_path.display()).dim());
        if let Some(ref pattern) = self.grep {
            println!("  Filter:   {}", style(pattern).cyan());
        }
        println!();

        self.tail_file(&log_path)
    }

    fn matches(&self, line: &str) -> bool {
        self.grep.as_deref().is_none_or(|pattern| line.contains(pattern))
    }

    /// Print the last N lines, then follow new content.
    fn tail_file(&self, path: &Path) -> Result<()> {
        let mut file = File::open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;

        for line in self.read_last_n_lines(&mut file)? {
            println!("{}", line);
        }

        let mut reader = BufReader::new(file);
        let poll_interval = Duration::from_millis(self.poll_interval);

        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => std::thread::sleep(poll_interval),
                Ok(_) => {
                    if self.matches(&line) {
                        print!("{}", line);
                    }
                }
                Err(e) => {
                    eprintln!("{}", style(format!("Error reading log file: {}", e)).red());
                    anyhow::bail!("Failed to read log file");
                }
            }
        }
    }

    /// Last N matching lines. Leaves the cursor at the end of the file.
    fn read_last_n_lines(&self, file: &mut File) -> Result<Vec<String>> {
        file.seek(SeekFrom::Start(0))?;

        let lines: Vec<String> = BufReader::new(&mut *file)
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .context("Failed to read lines from log file")?
            .into_iter()
            .filter(|line| self.matches(line))
            .collect();

        file.seek(SeekFrom::End(0))?;
        let start = lines.len().saturating_sub(self.lines);
        Ok(lines[start..].to_vec())
    }
}
