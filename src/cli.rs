//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::catalog::{self, MapLayer};
use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::output::Format;

/// Interactive earthquake map for your terminal.
#[derive(Parser, Debug)]
#[command(name = "geoquake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Write logs to this file (the map owns the terminal, so it logs nowhere otherwise)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Base URL of the summary GeoJSON feed
    #[arg(long, global = true, default_value = crate::config::USGS_FEED_BASE_URL)]
    pub base_url: String,

    /// Request timeout in seconds (0 disables it)
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the interactive earthquake map
    Map(MapArgs),

    /// Print earthquakes once and exit
    List(ListArgs),
}

/// Filter arguments shared by all commands.
#[derive(Args, Debug, Clone, Copy)]
pub struct FilterArgs {
    /// Time range: hour, day, week, month
    #[arg(long, default_value = catalog::DEFAULT_TIME_RANGE, value_parser = parse_time_range)]
    pub time_range: &'static str,

    /// Magnitude threshold: all, 1.0, 2.5, 4.5
    #[arg(long, default_value = catalog::DEFAULT_MAGNITUDE, value_parser = parse_magnitude)]
    pub magnitude: &'static str,
}

/// Arguments for the `map` command.
#[derive(Parser, Debug)]
pub struct MapArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Initial map layer: openstreetmap, satellite, terrain, dark
    #[arg(long, value_parser = parse_layer)]
    pub layer: Option<&'static MapLayer>,

    /// Initial zoom level
    #[arg(long, default_value = "2.7", value_parser = parse_zoom)]
    pub zoom: f64,

    /// Minimum zoom level (whole world visible)
    #[arg(long, default_value = "2.7", value_parser = parse_zoom)]
    pub min_zoom: f64,

    /// Maximum zoom level
    #[arg(long, default_value = "18", value_parser = parse_zoom)]
    pub max_zoom: f64,

    /// Result sets larger than this keep the loading indicator up
    #[arg(long, default_value = "5000")]
    pub hold_threshold: usize,

    /// Minimum loading indicator time for large result sets, in milliseconds
    #[arg(long, default_value = "2000")]
    pub hold_ms: u64,
}

/// Arguments for the `list` command.
#[derive(Parser, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Maximum number of events to show
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Parse a time range id from the catalog.
fn parse_time_range(s: &str) -> Result<&'static str, String> {
    catalog::find_time_range(s)
        .map(|o| o.id)
        .ok_or_else(|| format!("unknown time range: {s} (expected: hour, day, week, month)"))
}

/// Parse a magnitude id from the catalog.
fn parse_magnitude(s: &str) -> Result<&'static str, String> {
    catalog::find_magnitude(s)
        .map(|o| o.id)
        .ok_or_else(|| format!("unknown magnitude: {s} (expected: all, 1.0, 2.5, 4.5)"))
}

/// Parse a map layer id.
fn parse_layer(s: &str) -> Result<&'static MapLayer, String> {
    catalog::find_layer(s).ok_or_else(|| {
        format!("unknown layer: {s} (expected: openstreetmap, satellite, terrain, dark)")
    })
}

/// Parse a zoom level; must be a finite number.
fn parse_zoom(s: &str) -> Result<f64, String> {
    let zoom: f64 = s.parse().map_err(|e| format!("invalid zoom: {s} ({e})"))?;
    if zoom.is_finite() {
        Ok(zoom)
    } else {
        Err(format!("invalid zoom: {s} (must be a finite number)"))
    }
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_map_defaults() {
        let cli = Cli::try_parse_from(["geoquake", "map"]).unwrap();
        let Command::Map(args) = cli.command else {
            panic!("expected map command");
        };
        assert_eq!(args.filter.time_range, "day");
        assert_eq!(args.filter.magnitude, "all");
        assert!(args.layer.is_none());
        assert_eq!(cli.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_list_arguments() {
        let cli = Cli::try_parse_from([
            "geoquake", "list", "--time-range", "week", "--magnitude", "4.5", "-n", "5", "-f", "ndjson",
        ])
        .unwrap();
        let Command::List(args) = cli.command else {
            panic!("expected list command");
        };
        assert_eq!(args.filter.time_range, "week");
        assert_eq!(args.filter.magnitude, "4.5");
        assert_eq!(args.limit, 5);
        assert_eq!(args.format, Format::Ndjson);
    }

    #[test]
    fn test_unknown_values_rejected() {
        assert!(Cli::try_parse_from(["geoquake", "list", "--time-range", "year"]).is_err());
        assert!(Cli::try_parse_from(["geoquake", "map", "--layer", "watercolor"]).is_err());
    }

    #[test]
    fn test_non_finite_zoom_rejected() {
        assert!(Cli::try_parse_from(["geoquake", "map", "--zoom", "nan"]).is_err());
        assert!(Cli::try_parse_from(["geoquake", "map", "--min-zoom", "inf"]).is_err());
        assert!(Cli::try_parse_from(["geoquake", "map", "--max-zoom", "-inf"]).is_err());

        let cli = Cli::try_parse_from(["geoquake", "map", "--zoom", "4.5"]).unwrap();
        let Command::Map(args) = cli.command else {
            panic!("expected map command");
        };
        assert!((args.zoom - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_layer_argument() {
        let cli = Cli::try_parse_from(["geoquake", "map", "--layer", "dark"]).unwrap();
        let Command::Map(args) = cli.command else {
            panic!("expected map command");
        };
        assert_eq!(args.layer.map(|l| l.id), Some("dark"));
    }
}
