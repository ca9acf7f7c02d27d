// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! tessmon CLI
//!
//! Runs simulated recognitions through a Monitor to exercise progress
//! reporting, cooperative cancellation and deadlines from the command line.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tessmon::native::simulated::{Outcome, SimulatedEngine, WordBox};
use tessmon::{Monitor, MonitorConfig};

#[derive(Parser)]
#[command(name = "tessmon")]
#[command(author, version, about = "Progress and cancellation monitor harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated recognition under a monitor
    Recognize {
        /// Number of words on the simulated page
        #[arg(short, long, default_value = "20")]
        words: usize,

        /// Simulated time spent per word, in milliseconds
        #[arg(long, default_value = "10")]
        word_delay_ms: u64,

        /// Deadline in milliseconds (overrides the config file)
        #[arg(long)]
        deadline_ms: Option<i32>,

        /// Cancel once this many words have been processed
        #[arg(long)]
        cancel_after: Option<i32>,

        /// Directory containing tessmon.yaml
        #[arg(long, value_name = "DIR")]
        config: Option<PathBuf>,

        /// Simulate a failure to create the native monitor
        #[arg(long)]
        fail_create: bool,

        /// Do not subscribe a progress observer
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tessmon::logging::init();

    match cli.command {
        Commands::Recognize {
            words,
            word_delay_ms,
            deadline_ms,
            cancel_after,
            config,
            fail_create,
            quiet,
        } => {
            let mut monitor_config = match config {
                Some(dir) => MonitorConfig::load(&dir)
                    .with_context(|| format!("Failed to load config from {}", dir.display()))?,
                None => MonitorConfig::load_or_default(&std::env::current_dir()?),
            };
            if let Some(deadline_ms) = deadline_ms {
                monitor_config.deadline_ms = Some(deadline_ms);
            }

            let engine = if fail_create {
                SimulatedEngine::failing()
            } else {
                SimulatedEngine::new()
            }
            .with_word_delay(Duration::from_millis(word_delay_ms));

            run_recognition(&engine, monitor_config, words, cancel_after, quiet)
        }
    }
}

fn run_recognition(
    engine: &SimulatedEngine,
    config: MonitorConfig,
    words: usize,
    cancel_after: Option<i32>,
    quiet: bool,
) -> Result<()> {
    let page = build_page(words)?;
    let monitor = Monitor::with_config(engine.clone(), config);

    if !quiet {
        monitor.on_progress(|event| {
            tracing::info!(
                progress = event.progress,
                left = event.left,
                right = event.right,
                top = event.top,
                bottom = event.bottom,
                "progress"
            );
        })?;
    }

    if let Some(limit) = cancel_after {
        monitor.on_cancel_check(move |check| {
            if check.words() >= limit {
                tracing::info!(words = check.words(), "cancelling recognition");
                check.cancel = true;
            }
        })?;
    }

    let result = engine.recognize_with(&monitor, &page)?;
    let label = match result.outcome {
        Outcome::Completed => "completed",
        Outcome::Cancelled => "cancelled",
        Outcome::DeadlineExceeded => "deadline exceeded",
    };

    println!(
        "{} after {}/{} words (progress {}%)",
        label,
        result.words_processed,
        words,
        monitor.progress()
    );

    monitor.dispose();
    Ok(())
}

/// Lay out `words` boxes ten to a line.
fn build_page(words: usize) -> Result<Vec<WordBox>> {
    let count = i32::try_from(words)
        .with_context(|| format!("--words {} exceeds the native word limit of {}", words, i32::MAX))?;

    Ok((0..count)
        .map(|i| {
            let column = i % 10;
            let line = i / 10;
            WordBox::new(column * 60, column * 60 + 50, line * 20, line * 20 + 16)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_page_wraps_lines() {
        let page = build_page(12).unwrap();
        assert_eq!(page.len(), 12);
        assert_eq!(page[9], WordBox::new(540, 590, 0, 16));
        assert_eq!(page[10], WordBox::new(0, 50, 20, 36));
    }

    #[test]
    fn test_build_page_rejects_oversized_count() {
        let err = build_page(3_000_000_000).unwrap_err();
        assert!(err.to_string().contains("3000000000"));
    }

    #[test]
    fn test_cli_parses_recognize() {
        let cli = Cli::try_parse_from(["tessmon", "recognize", "--words", "5", "--cancel-after", "2"])
            .unwrap();
        let Commands::Recognize {
            words, cancel_after, ..
        } = cli.command;
        assert_eq!(words, 5);
        assert_eq!(cancel_after, Some(2));
    }
}
