use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::AppState;
use crate::catalog::{self, MAGNITUDE_LEGEND, MAGNITUDE_OPTIONS, MAP_LAYERS, TIME_RANGE_OPTIONS};
use crate::controls::{ControlsLayout, Dropdown, FilterControls};
use crate::map::{MapSurface, MapView};
use crate::marker::{MARKER_GLYPH, Marker};
use crate::tui::App;

/// Accent used for open activators and the selected option.
const ACCENT: Color = Color::Rgb(79, 70, 229);

/// Panel background.
const PANEL_BG: Color = Color::Rgb(248, 250, 252);

/// Panel text.
const PANEL_FG: Color = Color::Rgb(55, 65, 81);

const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Widest popup, borders included.
const POPUP_MAX_WIDTH: u16 = 44;

/// Render the UI
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Split into map area and status bar
    let [map_area, status_area] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);

    app.screen = area;
    app.map_area = map_area;
    app.map.viewport.resize(map_area.width, map_area.height);

    frame.render_widget(MapView::new(&app.map), map_area);
    render_title(frame, &app.map, map_area);
    render_popups(frame, &app.map, map_area);

    if app.state.is_loading() {
        render_loading(frame, app.ticks, map_area);
    }
    if let Some(message) = app.state.visible_error() {
        render_error(frame, message, map_area);
    }

    render_controls(frame, &app.controls, &app.state, area);
    render_status_bar(frame, &app.state, &app.map, status_area);
}

fn render_title(frame: &mut Frame, map: &MapSurface, area: Rect) {
    let theme = map.layer().theme;
    let title = Span::styled(
        " GeoQuake ",
        Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
    );
    let rect = Rect::new(area.x + 1, area.y + 1, 10, 1).intersection(area);
    frame.render_widget(Paragraph::new(title).style(Style::default().bg(theme.background)), rect);
}

/// Place a popup box above its marker, or below when there is no room.
fn popup_rect(marker_col: u16, marker_row: u16, width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = (area.x + marker_col)
        .saturating_sub(width / 2)
        .clamp(area.x, area.right().saturating_sub(width));
    let y = if marker_row >= height {
        area.y + marker_row - height
    } else {
        (area.y + marker_row + 1).min(area.bottom().saturating_sub(height))
    };
    Rect::new(x, y, width, height)
}

fn render_popups(frame: &mut Frame, map: &MapSurface, area: Rect) {
    for marker in map.markers().iter().filter(|m| m.is_popup_open()) {
        let Some((col, row)) = map.viewport.project(marker.lon, marker.lat) else {
            continue;
        };
        render_popup(frame, marker, col, row, area);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn render_popup(frame: &mut Frame, marker: &Marker, col: u16, row: u16, area: Rect) {
    let details = &marker.details;
    let body = details.lines();

    let widest = body
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(details.place.chars().count()))
        .max()
        .unwrap_or(0);
    let width = (widest as u16 + 2).min(POPUP_MAX_WIDTH);
    let rect = popup_rect(col, row, width, body.len() as u16 + 3, area);

    let text_style = Style::default().fg(PANEL_FG);
    let mut lines = vec![Line::from(Span::styled(
        details.place.clone(),
        text_style.add_modifier(Modifier::BOLD),
    ))];
    lines.extend(body.into_iter().map(|l| Line::from(Span::styled(l, text_style))));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(marker.color()))
        .style(Style::default().bg(PANEL_BG));

    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}

fn render_loading(frame: &mut Frame, ticks: u64, area: Rect) {
    #[allow(clippy::cast_possible_truncation)]
    let spinner = SPINNER[(ticks % SPINNER.len() as u64) as usize];
    let text = Line::from(vec![
        Span::styled(format!("{spinner} "), Style::default().fg(ACCENT)),
        Span::styled(
            "Loading Earthquakes...",
            Style::default().fg(PANEL_FG).add_modifier(Modifier::BOLD),
        ),
    ]);

    let width = 28.min(area.width);
    let height = 3.min(area.height);
    let rect = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL_BG));

    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(text).centered().block(block), rect);
}

#[allow(clippy::cast_possible_truncation)]
fn render_error(frame: &mut Frame, message: &str, area: Rect) {
    let width = (message.chars().count() as u16 + 4).min(area.width.saturating_sub(2));
    let height = 3.min(area.height);
    let rect = Rect::new(
        area.x + 1,
        area.bottom().saturating_sub(height + 1).max(area.y),
        width,
        height,
    )
    .intersection(area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray))
        .style(Style::default().bg(PANEL_BG));

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(Span::styled(message.to_string(), Style::default().fg(Color::Red)))
            .block(block),
        rect,
    );
}

fn render_controls(frame: &mut Frame, controls: &FilterControls, state: &AppState, area: Rect) {
    let layout = ControlsLayout::compute(area, controls.open());

    for (dropdown, rect) in layout.activators {
        let open = controls.is_open(dropdown);
        let accent = if open { ACCENT } else { PANEL_FG };
        let caption = Line::from(vec![
            Span::styled(
                format!("[{}] ", dropdown.hotkey().to_ascii_uppercase()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                dropdown.label(),
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent))
            .style(Style::default().bg(PANEL_BG));
        frame.render_widget(Clear, rect);
        frame.render_widget(Paragraph::new(caption).block(block), rect);
    }

    if let Some((dropdown, rect)) = layout.panel {
        render_panel(frame, dropdown, state, rect);
    }
}

fn render_panel(frame: &mut Frame, dropdown: Dropdown, state: &AppState, rect: Rect) {
    let normal = Style::default().fg(PANEL_FG);
    let selected = Style::default().fg(ACCENT).add_modifier(Modifier::BOLD);
    let numbered = |idx: usize, name: &'static str, active: bool| {
        Line::from(vec![
            Span::styled(format!("{} ", idx + 1), Style::default().fg(Color::DarkGray)),
            Span::styled(name, if active { selected } else { normal }),
        ])
    };

    let lines: Vec<Line<'static>> = match dropdown {
        Dropdown::Layer => MAP_LAYERS
            .iter()
            .enumerate()
            .map(|(i, l)| numbered(i, l.name, l.id == state.active_layer.id))
            .collect(),
        Dropdown::TimeRange => TIME_RANGE_OPTIONS
            .iter()
            .enumerate()
            .map(|(i, o)| numbered(i, o.name, o.id == state.active_time_range))
            .collect(),
        Dropdown::Magnitude => MAGNITUDE_OPTIONS
            .iter()
            .enumerate()
            .map(|(i, o)| numbered(i, o.name, o.id == state.active_magnitude))
            .collect(),
        Dropdown::Legend => MAGNITUDE_LEGEND
            .iter()
            .map(|entry| {
                Line::from(vec![
                    Span::styled(format!("{MARKER_GLYPH} "), Style::default().fg(entry.color())),
                    Span::styled(entry.name, normal),
                ])
            })
            .collect(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray))
        .title(Span::styled(dropdown.title(), normal.add_modifier(Modifier::BOLD)))
        .style(Style::default().bg(PANEL_BG));

    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}

fn render_status_bar(frame: &mut Frame, state: &AppState, map: &MapSurface, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let viewport = &map.viewport;

    let status = Line::from(vec![
        Span::styled(
            format!(" {} earthquakes ", state.earthquakes.len()),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled("| ", dim),
        Span::styled(
            catalog::time_range_name(state.active_time_range),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(" | ", dim),
        Span::styled(
            catalog::magnitude_name(state.active_magnitude),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(" | Zoom: ", dim),
        Span::styled(format!("{:.1}", viewport.zoom), Style::default().fg(Color::Yellow)),
        Span::styled(
            format!(
                " | {:.1}°{}, {:.1}°{} ",
                viewport.center_lat.abs(),
                if viewport.center_lat >= 0.0 { "N" } else { "S" },
                viewport.center_lon.abs(),
                if viewport.center_lon >= 0.0 { "E" } else { "W" }
            ),
            dim,
        ),
        Span::styled("| ", dim),
        Span::styled(map.layer().attribution, Style::default().fg(Color::Gray)),
        Span::styled(
            " | arrows:pan +/-:zoom click:details l/t/m/i:menus q:quit | ",
            dim,
        ),
        Span::styled(map.center_tile_url(), dim),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}
