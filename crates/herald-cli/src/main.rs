//! # Herald
//!
//! Drives a Herald dispatcher from a command script.
//!
//! ## Usage
//!
//! ```bash
//! # Read commands from stdin
//! herald < commands.txt
//!
//! # Read commands from a file
//! herald commands.txt
//!
//! # Use a different hierarchy separator
//! HERALD_SEPARATOR=:: herald commands.txt
//! ```

mod config;
mod script;

use anyhow::{Context, Result};
use herald_core::Dispatcher;
use std::fs::File;
use std::io::{self, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::load()?;

    // Initialize tracing; stdout is reserved for script output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let dispatcher = Dispatcher::with_config(config.dispatcher.clone())
        .context("Invalid dispatcher configuration")?;

    tracing::info!(
        separator = %config.dispatcher.separator,
        "Starting Herald script runner"
    );

    let mut runner = script::Runner::new(dispatcher);
    let stdout = io::stdout();

    match std::env::args().nth(1) {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open script: {}", path))?;
            runner.run(BufReader::new(file), stdout.lock())?;
        }
        None => runner.run(io::stdin().lock(), stdout.lock())?,
    }

    let stats = runner.dispatcher().stats();
    tracing::info!(
        channels = stats.channel_count,
        subscriptions = stats.subscription_count,
        "Script finished"
    );

    Ok(())
}
