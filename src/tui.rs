//! Terminal driver for the interactive map.
//!
//! Owns the [`App`] composite and the event loop. Fetches run on the tokio
//! runtime and report back over a channel; starting a new fetch aborts the
//! one in flight.

use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use ratatui::layout::{Position, Rect};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app::{AppState, FetchRequest, Msg};
use crate::client::FeedClient;
use crate::config::{FeedConfig, MapConfig, ShellConfig};
use crate::controls::{ControlOutcome, FilterControls, Selection};
use crate::map::MapSurface;
use crate::ui;

/// Event poll interval; also paces the spinner.
const FRAME_POLL: Duration = Duration::from_millis(50);

/// Cells moved per arrow key press.
const PAN_STEP_COLS: i32 = 10;
const PAN_STEP_ROWS: i32 = 5;

/// Everything the UI renders.
pub struct App {
    pub state: AppState,
    pub map: MapSurface,
    pub controls: FilterControls,
    /// Full screen, as of the last draw
    pub screen: Rect,
    /// Map area, as of the last draw
    pub map_area: Rect,
    /// Frames drawn
    pub ticks: u64,
    pub should_quit: bool,
    /// Last mouse position during drag
    last_mouse: Option<(u16, u16)>,
}

impl App {
    #[must_use]
    pub fn new(shell: &ShellConfig, map: &MapConfig) -> Self {
        let state = AppState::new(shell);
        let map = MapSurface::new(map, state.active_layer);
        Self {
            state,
            map,
            controls: FilterControls::default(),
            screen: Rect::default(),
            map_area: Rect::default(),
            ticks: 0,
            should_quit: false,
            last_mouse: None,
        }
    }

    /// Feed a message to the shell state and bring the map in line with it.
    pub fn dispatch(&mut self, msg: Msg) -> Option<FetchRequest> {
        let request = self.state.update(msg, Instant::now());
        self.map.set_layer(self.state.active_layer);
        self.map.sync_markers(&self.state.earthquakes);
        request
    }

    fn apply(&mut self, outcome: ControlOutcome) -> Option<FetchRequest> {
        match outcome {
            ControlOutcome::Selected(Selection::Layer(layer)) => self.dispatch(Msg::SelectLayer(layer)),
            ControlOutcome::Selected(Selection::TimeRange(id)) => {
                self.dispatch(Msg::SelectTimeRange(id))
            }
            ControlOutcome::Selected(Selection::Magnitude(id)) => {
                self.dispatch(Msg::SelectMagnitude(id))
            }
            ControlOutcome::Consumed | ControlOutcome::Ignored => None,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Handle a key press.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<FetchRequest> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return None;
        }

        match self.controls.handle_key(key.code) {
            ControlOutcome::Ignored => {}
            outcome => return self.apply(outcome),
        }

        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Esc => self.map.close_popups(),

            KeyCode::Left => self.map.viewport.pan(-PAN_STEP_COLS, 0),
            KeyCode::Right => self.map.viewport.pan(PAN_STEP_COLS, 0),
            KeyCode::Up => self.map.viewport.pan(0, -PAN_STEP_ROWS),
            KeyCode::Down => self.map.viewport.pan(0, PAN_STEP_ROWS),

            KeyCode::Char('+' | '=') => self.map.viewport.zoom_in(),
            KeyCode::Char('-' | '_') => self.map.viewport.zoom_out(),

            _ => {}
        }
        None
    }

    /// Cell relative to the map area, if the point is on the map.
    fn map_cell(&self, col: u16, row: u16) -> Option<(u16, u16)> {
        self.map_area
            .contains(Position::new(col, row))
            .then(|| (col - self.map_area.x, row - self.map_area.y))
    }

    /// Handle a mouse event: controls first, then markers, then pan and zoom.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> Option<FetchRequest> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                match self.controls.handle_click(mouse.column, mouse.row, self.screen) {
                    ControlOutcome::Ignored => {}
                    outcome => return self.apply(outcome),
                }
                if let Some((col, row)) = self.map_cell(mouse.column, mouse.row) {
                    if !self.map.toggle_popup_at(col, row) {
                        self.last_mouse = Some((mouse.column, mouse.row));
                    }
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((last_col, last_row)) = self.last_mouse {
                    let d_cols = i32::from(last_col) - i32::from(mouse.column);
                    let d_rows = i32::from(last_row) - i32::from(mouse.row);
                    self.map.viewport.pan(d_cols, d_rows);
                    self.last_mouse = Some((mouse.column, mouse.row));
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.last_mouse = None,
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown if !self.controls.any_open() => {
                if let Some((col, row)) = self.map_cell(mouse.column, mouse.row) {
                    let delta = if mouse.kind == MouseEventKind::ScrollUp { 1.0 } else { -1.0 };
                    self.map.viewport.zoom_at(col, row, delta);
                }
            }
            _ => {}
        }
        None
    }
}

/// Runs feed requests on the runtime; at most one is in flight.
pub struct FetchDispatcher {
    client: FeedClient,
    runtime: Handle,
    tx: UnboundedSender<Msg>,
    in_flight: Option<JoinHandle<()>>,
}

impl FetchDispatcher {
    #[must_use]
    pub fn new(client: FeedClient, runtime: Handle, tx: UnboundedSender<Msg>) -> Self {
        Self {
            client,
            runtime,
            tx,
            in_flight: None,
        }
    }

    /// Start `request`, aborting the previous fetch if it has not finished.
    pub fn dispatch(&mut self, request: FetchRequest) {
        if let Some(previous) = self.in_flight.take() {
            if !previous.is_finished() {
                debug!("aborting superseded fetch");
                previous.abort();
            }
        }

        let client = self.client.clone();
        let tx = self.tx.clone();
        self.in_flight = Some(self.runtime.spawn(async move {
            let result = client
                .fetch_points(request.magnitude, request.time_range)
                .await;
            // Receiver is gone once the UI has exited
            let _ = tx.send(Msg::Loaded {
                generation: request.generation,
                result,
            });
        }));
    }

    /// Abort whatever is still running.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}

/// Set up the terminal, run the map until the user quits, restore the terminal.
///
/// # Errors
///
/// Returns an error if the feed client cannot be built or terminal I/O fails.
pub fn launch(feed: &FeedConfig, shell: &ShellConfig, map: &MapConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    let client = FeedClient::new(feed).context("failed to create feed client")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut dispatcher = FetchDispatcher::new(client, runtime.handle().clone(), tx);
    let mut app = App::new(shell, map);

    info!(
        time_range = shell.time_range,
        magnitude = shell.magnitude,
        layer = shell.layer.id,
        "starting map"
    );

    let mut terminal = ratatui::init();
    if let Err(e) = execute!(io::stdout(), EnableMouseCapture) {
        ratatui::restore();
        return Err(e).context("failed to enable mouse capture");
    }

    let result = run(&mut terminal, &mut app, &mut dispatcher, &mut rx);

    let _ = execute!(io::stdout(), DisableMouseCapture);
    ratatui::restore();
    dispatcher.shutdown();

    info!(
        fetches = app.state.generation(),
        marker_rebuilds = app.map.rebuilds(),
        "map closed"
    );
    result
}

fn run(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    dispatcher: &mut FetchDispatcher,
    rx: &mut UnboundedReceiver<Msg>,
) -> Result<()> {
    if let Some(request) = app.dispatch(Msg::Start) {
        dispatcher.dispatch(request);
    }

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        app.ticks = app.ticks.wrapping_add(1);

        if event::poll(FRAME_POLL)? {
            // Resize is picked up by the next draw
            let request = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => None,
            };
            if let Some(request) = request {
                dispatcher.dispatch(request);
            }
        }

        while let Ok(msg) = rx.try_recv() {
            if let Some(request) = app.dispatch(msg) {
                dispatcher.dispatch(request);
            }
        }
        app.dispatch(Msg::Tick);

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::http::{StatusCode, Uri};
    use axum::response::IntoResponse;
    use tokio::net::TcpListener;

    use super::*;
    use crate::app::Phase;
    use crate::catalog::MAP_LAYERS;
    use crate::controls::{ControlsLayout, Dropdown};
    use crate::models::Earthquake;

    const SCREEN: Rect = Rect {
        x: 0,
        y: 0,
        width: 120,
        height: 40,
    };

    fn app() -> App {
        let mut app = App::new(&ShellConfig::default(), &MapConfig::default());
        app.screen = SCREEN;
        app.map_area = Rect::new(0, 0, 120, 39);
        app.map.viewport.resize(120, 39);
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn quake(id: &str, lat: f64, lon: f64) -> Earthquake {
        Earthquake {
            id: id.into(),
            magnitude: Some(5.1),
            place: Some(format!("near {id}")),
            time: 1_756_500_000_000,
            position: [lat, lon, 12.0],
        }
    }

    fn load(app: &mut App, quakes: Vec<Earthquake>) {
        let generation = app.state.generation();
        app.dispatch(Msg::Loaded {
            generation,
            result: Ok(quakes),
        });
    }

    #[test]
    fn test_magnitude_hotkeys_request_fetch() {
        let mut app = app();
        let start = app.dispatch(Msg::Start).unwrap();

        assert!(app.handle_key(key(KeyCode::Char('m'))).is_none());
        let request = app.handle_key(key(KeyCode::Char('3'))).unwrap();
        assert_eq!(request.magnitude, "2.5");
        assert_eq!(request.time_range, "day");
        assert!(request.generation > start.generation);
        assert!(!app.controls.any_open());
    }

    #[test]
    fn test_layer_click_switches_without_fetch() {
        let mut app = app();
        app.dispatch(Msg::Start);
        load(&mut app, vec![quake("a", 0.0, 0.0)]);
        let generation = app.state.generation();

        let layout = ControlsLayout::compute(SCREEN, None);
        let (_, layer_button) = layout.activators[0];
        assert!(app.handle_mouse(click(layer_button.x + 1, layer_button.y + 1)).is_none());
        assert!(app.controls.is_open(Dropdown::Layer));

        let layout = ControlsLayout::compute(SCREEN, app.controls.open());
        let (_, panel) = layout.panel.unwrap();
        // Fourth row: "Dark Map"
        assert!(app.handle_mouse(click(panel.x + 2, panel.y + 4)).is_none());

        assert_eq!(app.map.layer().id, MAP_LAYERS[3].id);
        assert_eq!(app.state.generation(), generation);
        assert_eq!(app.map.markers().len(), 1);
    }

    #[test]
    fn test_overlay_click_does_not_reach_markers() {
        let mut app = app();
        app.dispatch(Msg::Start);
        load(&mut app, vec![quake("a", -10.0, -60.0)]);
        let (col, row) = app.map.viewport.project(-60.0, -10.0).unwrap();

        app.controls.toggle(Dropdown::TimeRange);
        app.handle_mouse(click(col, row));
        assert!(!app.controls.any_open());
        assert!(app.map.markers().iter().all(|m| !m.is_popup_open()));

        app.handle_mouse(click(col, row));
        assert!(app.map.markers()[0].is_popup_open());
    }

    #[test]
    fn test_escape_closes_dropdown_before_popups() {
        let mut app = app();
        app.dispatch(Msg::Start);
        load(&mut app, vec![quake("a", -10.0, -60.0)]);
        let (col, row) = app.map.viewport.project(-60.0, -10.0).unwrap();
        app.map.toggle_popup_at(col, row);
        app.controls.toggle(Dropdown::Legend);

        app.handle_key(key(KeyCode::Esc));
        assert!(!app.controls.any_open());
        assert!(app.map.markers()[0].is_popup_open());

        app.handle_key(key(KeyCode::Esc));
        assert!(!app.map.markers()[0].is_popup_open());
    }

    #[test]
    fn test_markers_follow_loaded_list() {
        let mut app = app();
        app.dispatch(Msg::Start);
        assert_eq!(app.map.markers().len(), 0);

        load(&mut app, vec![quake("a", 0.0, 0.0), quake("b", 10.0, 10.0)]);
        assert_eq!(app.map.markers().len(), 2);
        let rebuilds = app.map.rebuilds();

        // Ticks and layer switches leave the marker set alone
        app.dispatch(Msg::Tick);
        app.dispatch(Msg::SelectLayer(&MAP_LAYERS[1]));
        assert_eq!(app.map.rebuilds(), rebuilds);
    }

    #[test]
    fn test_keys_pan_zoom_and_quit() {
        let mut app = app();
        let zoom = app.map.viewport.zoom;
        app.handle_key(key(KeyCode::Char('+')));
        assert!(app.map.viewport.zoom > zoom);

        let lon = app.map.viewport.center_lon;
        app.handle_key(key(KeyCode::Right));
        assert!(app.map.viewport.center_lon > lon);

        app.handle_key(key(KeyCode::Char('-')));
        assert!((app.map.viewport.zoom - zoom).abs() < 1e-9);

        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_scroll_zooms_at_cursor() {
        let mut app = app();
        let zoom = app.map.viewport.zoom;
        app.handle_mouse(MouseEvent {
            kind: MouseEventKind::ScrollUp,
            column: 30,
            row: 10,
            modifiers: KeyModifiers::NONE,
        });
        assert!((app.map.viewport.zoom - zoom - 1.0).abs() < 1e-9);
    }

    async fn serve(hits: Arc<AtomicUsize>) -> String {
        let app = Router::new().fallback(move |uri: Uri| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                if uri.path().starts_with("/slow/") {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                (
                    StatusCode::OK,
                    include_str!("../tools/sample_all_day.geojson"),
                )
                    .into_response()
            }
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_dispatcher_delivers_tagged_result() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base_url = serve(Arc::clone(&hits)).await;
        let client = FeedClient::new(&FeedConfig {
            base_url,
            timeout: Some(Duration::from_secs(5)),
        })
        .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dispatcher = FetchDispatcher::new(client, Handle::current(), tx);
        dispatcher.dispatch(FetchRequest {
            generation: 7,
            magnitude: "all",
            time_range: "day",
        });

        let Some(Msg::Loaded { generation, result }) = rx.recv().await else {
            panic!("expected a loaded message");
        };
        assert_eq!(generation, 7);
        assert_eq!(result.unwrap().len(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatcher_aborts_superseded_fetch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base_url = serve(Arc::clone(&hits)).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let slow = FeedClient::new(&FeedConfig {
            base_url: format!("{base_url}/slow"),
            timeout: None,
        })
        .unwrap();
        let mut dispatcher = FetchDispatcher::new(slow, Handle::current(), tx.clone());
        dispatcher.dispatch(FetchRequest {
            generation: 1,
            magnitude: "all",
            time_range: "day",
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let fast = FeedClient::new(&FeedConfig {
            base_url,
            timeout: None,
        })
        .unwrap();
        dispatcher.client = fast;
        dispatcher.dispatch(FetchRequest {
            generation: 2,
            magnitude: "4.5",
            time_range: "week",
        });

        let Some(Msg::Loaded { generation, .. }) = rx.recv().await else {
            panic!("expected a loaded message");
        };
        assert_eq!(generation, 2);

        // The aborted task never reports
        dispatcher.shutdown();
        drop(dispatcher);
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_shell_ignores_result_after_refilter() {
        let mut app = app();
        let first = app.dispatch(Msg::Start).unwrap();
        app.handle_key(key(KeyCode::Char('t')));
        let second = app.handle_key(key(KeyCode::Char('4'))).unwrap();
        assert_eq!(second.time_range, "month");

        app.dispatch(Msg::Loaded {
            generation: first.generation,
            result: Ok(vec![quake("old", 0.0, 0.0)]),
        });
        assert_eq!(app.state.phase, Phase::Loading);
        assert!(app.map.markers().is_empty());
    }
}
