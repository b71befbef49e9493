//! GeoQuake - Interactive earthquake map for your terminal.
//!
//! Fetches the USGS summary feeds and plots every event as a colored marker
//! over a world map, with layer, time range and magnitude filters.

use std::fs::File;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod app;
mod catalog;
mod cli;
mod client;
mod config;
mod controls;
mod errors;
mod map;
mod marker;
mod models;
mod output;
mod tui;
mod ui;

use cli::{Cli, Command};
use client::FeedClient;
use config::{FeedConfig, LoadingHold, MapConfig, ShellConfig};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // The map owns the terminal, so it only logs to a file
    let to_terminal = matches!(cli.command, Command::List(_));
    init_tracing(cli.verbose, cli.quiet, cli.log_file.as_deref(), to_terminal)?;

    let feed = FeedConfig {
        base_url: cli.base_url,
        timeout: (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs)),
    };

    match cli.command {
        Command::Map(args) => cmd_map(&feed, args),
        Command::List(args) => cmd_list(&feed, args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool, log_file: Option<&Path>, to_terminal: bool) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None if to_terminal => builder.with_writer(io::stderr).init(),
        None => builder.with_writer(io::sink).init(),
    }
    Ok(())
}

/// Execute the `map` command - interactive map until the user quits.
fn cmd_map(feed: &FeedConfig, args: cli::MapArgs) -> Result<()> {
    let defaults = MapConfig::default();
    let map = MapConfig {
        zoom: args.zoom,
        min_zoom: args.min_zoom,
        max_zoom: args.max_zoom,
        ..defaults
    };

    let shell = ShellConfig {
        layer: args.layer.unwrap_or_else(catalog::default_layer),
        time_range: args.filter.time_range,
        magnitude: args.filter.magnitude,
        hold: LoadingHold {
            threshold: args.hold_threshold,
            min_duration: Duration::from_millis(args.hold_ms),
        },
    };

    tui::launch(feed, &shell, &map)
}

/// Execute the `list` command - one-shot fetch of the selected feed.
fn cmd_list(feed: &FeedConfig, args: cli::ListArgs) -> Result<()> {
    let client = FeedClient::new(feed).context("failed to create feed client")?;

    let mut events = tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(client.fetch_points(args.filter.magnitude, args.filter.time_range))
        .context("failed to fetch earthquake feed")?;

    // Sort by time descending (most recent first)
    events.sort_by(|a, b| b.time.cmp(&a.time));
    events.truncate(args.limit);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_events(&mut handle, &events, args.format)?;

    Ok(())
}
