//! Output formatters for the `list` command.
//!
//! Supports human-readable (with marker colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use serde::Serialize;

use crate::marker::{MagnitudeBucket, format_depth, format_magnitude};
use crate::models::Earthquake;

// ANSI codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Flattened record emitted in JSON/NDJSON output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEvent<'a> {
    pub id: &'a str,
    pub time: String,
    pub magnitude: Option<f64>,
    pub color: &'static str,
    pub depth_km: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
    pub place: Option<&'a str>,
}

impl<'a> From<&'a Earthquake> for OutputEvent<'a> {
    fn from(q: &'a Earthquake) -> Self {
        Self {
            id: &q.id,
            time: q
                .time_utc()
                .map_or_else(|| "unknown".into(), |t| t.to_rfc3339()),
            magnitude: q.magnitude,
            color: MagnitudeBucket::from_magnitude(q.magnitude).hex(),
            depth_km: Some(q.depth_km()).filter(|d| d.is_finite()),
            latitude: q.latitude(),
            longitude: q.longitude(),
            place: q.place.as_deref(),
        }
    }
}

/// Write events in human-readable format, colored like the map markers.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, events: &[Earthquake]) -> io::Result<()> {
    for event in events {
        let time = event
            .time_utc()
            .map_or_else(|| "unknown".into(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());

        let color = MagnitudeBucket::from_magnitude(event.magnitude).ansi();
        let mag = format_magnitude(event.magnitude);
        let depth = format_depth(event.depth_km());
        let place = event.place.as_deref().unwrap_or("Unknown location");

        writeln!(
            writer,
            "{color}{BOLD}M{mag:>4}{RESET} │ \
             {DIM}{depth:>6} km{RESET} │ \
             {time} UTC │ \
             {lat:>7.2}, {lon:>8.2} │ \
             {place}",
            lat = event.latitude(),
            lon = event.longitude(),
        )?;
    }
    Ok(())
}

/// Write events as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, events: &[Earthquake]) -> io::Result<()> {
    let output: Vec<OutputEvent<'_>> = events.iter().map(OutputEvent::from).collect();
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write events as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, events: &[Earthquake]) -> io::Result<()> {
    for event in events {
        let json = serde_json::to_string(&OutputEvent::from(event))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write events in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_events<W: Write>(writer: &mut W, events: &[Earthquake], format: Format) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, events),
        Format::Json => write_json(writer, events),
        Format::Ndjson => write_ndjson(writer, events),
    }
}
