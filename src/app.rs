//! Application shell state.
//!
//! `AppState` owns the active filters and the fetched earthquakes. It is
//! driven by [`Msg`] values through [`AppState::update`], which returns the
//! fetch to start, if any. The terminal driver performs the fetch and feeds
//! the outcome back in as [`Msg::Loaded`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::catalog::MapLayer;
use crate::config::{LoadingHold, ShellConfig};
use crate::errors::GeoquakeError;
use crate::models::Earthquake;

/// Lifecycle of the current fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Input to the shell reducer.
#[derive(Debug)]
pub enum Msg {
    /// Initial load.
    Start,
    SelectLayer(&'static MapLayer),
    SelectTimeRange(&'static str),
    SelectMagnitude(&'static str),
    /// Outcome of the fetch started for `generation`.
    Loaded {
        generation: u64,
        result: Result<Vec<Earthquake>, GeoquakeError>,
    },
    /// Clock tick, releases an expired loading hold.
    Tick,
}

/// A fetch the driver should start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub magnitude: &'static str,
    pub time_range: &'static str,
}

/// Authoritative filter and result state.
#[derive(Debug)]
pub struct AppState {
    pub active_layer: &'static MapLayer,
    pub active_time_range: &'static str,
    pub active_magnitude: &'static str,
    /// Replaced wholesale on every accepted fetch
    pub earthquakes: Arc<Vec<Earthquake>>,
    pub phase: Phase,
    pub error: Option<String>,
    generation: u64,
    started_at: Option<Instant>,
    hold_until: Option<Instant>,
    hold: LoadingHold,
}

impl AppState {
    #[must_use]
    pub fn new(config: &ShellConfig) -> Self {
        Self {
            active_layer: config.layer,
            active_time_range: config.time_range,
            active_magnitude: config.magnitude,
            earthquakes: Arc::new(Vec::new()),
            phase: Phase::Idle,
            error: None,
            generation: 0,
            started_at: None,
            hold_until: None,
            hold: config.hold,
        }
    }

    /// Generation of the most recent fetch request.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the loading indicator should be visible.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading || self.hold_until.is_some()
    }

    /// Error to display; hidden while loading.
    #[must_use]
    pub fn visible_error(&self) -> Option<&str> {
        if self.is_loading() {
            None
        } else {
            self.error.as_deref()
        }
    }

    /// Apply one message. Returns the fetch to start, if any.
    pub fn update(&mut self, msg: Msg, now: Instant) -> Option<FetchRequest> {
        match msg {
            Msg::Start => Some(self.begin_fetch(now)),
            Msg::SelectLayer(layer) => {
                if layer.id != self.active_layer.id {
                    info!(layer = layer.id, "map layer changed");
                    self.active_layer = layer;
                }
                None
            }
            Msg::SelectTimeRange(id) => {
                if id == self.active_time_range {
                    return None;
                }
                info!(time_range = id, "time range changed");
                self.active_time_range = id;
                Some(self.begin_fetch(now))
            }
            Msg::SelectMagnitude(id) => {
                if id == self.active_magnitude {
                    return None;
                }
                info!(magnitude = id, "magnitude changed");
                self.active_magnitude = id;
                Some(self.begin_fetch(now))
            }
            Msg::Loaded { generation, result } => {
                if generation != self.generation {
                    debug!(
                        generation,
                        current = self.generation,
                        "ignoring stale fetch result"
                    );
                    return None;
                }
                self.finish_fetch(result, now);
                None
            }
            Msg::Tick => {
                if self.hold_until.is_some_and(|until| now >= until) {
                    self.hold_until = None;
                }
                None
            }
        }
    }

    fn begin_fetch(&mut self, now: Instant) -> FetchRequest {
        self.generation += 1;
        self.phase = Phase::Loading;
        self.error = None;
        self.started_at = Some(now);
        self.hold_until = None;

        FetchRequest {
            generation: self.generation,
            magnitude: self.active_magnitude,
            time_range: self.active_time_range,
        }
    }

    fn finish_fetch(&mut self, result: Result<Vec<Earthquake>, GeoquakeError>, now: Instant) {
        let elapsed = self
            .started_at
            .take()
            .map_or(Duration::ZERO, |start| now.saturating_duration_since(start));

        match result {
            Ok(points) => {
                info!(
                    count = points.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "earthquakes loaded"
                );
                if points.len() > self.hold.threshold && elapsed < self.hold.min_duration {
                    self.hold_until = Some(now + (self.hold.min_duration - elapsed));
                }
                self.earthquakes = Arc::new(points);
                self.phase = Phase::Ready;
            }
            Err(e) => {
                warn!(status = ?e.status(), "earthquake fetch failed: {e}");
                self.error = Some(e.to_string());
                self.phase = Phase::Error;
                self.hold_until = None;
            }
        }
    }
}
