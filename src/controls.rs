//! Filter controls: layer, time range, magnitude and legend dropdowns.
//!
//! At most one dropdown is open. While one is open, the whole screen acts as
//! an overlay: a click that lands outside the open panel and the activator
//! buttons closes every dropdown and goes nowhere else.

use crossterm::event::KeyCode;
use ratatui::layout::{Position, Rect};

use crate::catalog::{MAGNITUDE_LEGEND, MAGNITUDE_OPTIONS, MAP_LAYERS, MapLayer, TIME_RANGE_OPTIONS};

/// Width of an activator button in cells.
pub const ACTIVATOR_WIDTH: u16 = 17;

/// Height of an activator button in cells (bordered, one line of text).
pub const ACTIVATOR_HEIGHT: u16 = 3;

/// Minimum width of a dropdown panel.
const PANEL_MIN_WIDTH: u16 = 22;

/// One filter dimension with its own activator and dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dropdown {
    Layer,
    TimeRange,
    Magnitude,
    Legend,
}

impl Dropdown {
    /// Activators in top-to-bottom order.
    pub const ALL: [Self; 4] = [Self::Layer, Self::TimeRange, Self::Magnitude, Self::Legend];

    /// Panel heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Layer => "Map Layers",
            Self::TimeRange => "Time Range",
            Self::Magnitude => "Magnitude",
            Self::Legend => "Marker Info",
        }
    }

    /// Activator caption.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Layer => "Layers",
            Self::TimeRange => "Time",
            Self::Magnitude => "Magnitude",
            Self::Legend => "Legend",
        }
    }

    #[must_use]
    pub const fn hotkey(self) -> char {
        match self {
            Self::Layer => 'l',
            Self::TimeRange => 't',
            Self::Magnitude => 'm',
            Self::Legend => 'i',
        }
    }

    fn from_hotkey(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.hotkey() == c.to_ascii_lowercase())
    }

    /// Row captions shown in the panel.
    #[must_use]
    pub fn option_names(self) -> Vec<&'static str> {
        match self {
            Self::Layer => MAP_LAYERS.iter().map(|l| l.name).collect(),
            Self::TimeRange => TIME_RANGE_OPTIONS.iter().map(|o| o.name).collect(),
            Self::Magnitude => MAGNITUDE_OPTIONS.iter().map(|o| o.name).collect(),
            Self::Legend => MAGNITUDE_LEGEND.iter().map(|e| e.name).collect(),
        }
    }
}

/// A filter value chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Layer(&'static MapLayer),
    TimeRange(&'static str),
    Magnitude(&'static str),
}

/// Result of routing one input event through the controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Not for the controls; pass it on.
    Ignored,
    /// Handled, nothing to report.
    Consumed,
    Selected(Selection),
}

/// Screen geometry of the activators and the open panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlsLayout {
    pub activators: [(Dropdown, Rect); 4],
    pub panel: Option<(Dropdown, Rect)>,
}

impl ControlsLayout {
    /// Activators stack down the top-right corner of `area`; an open panel
    /// sits to the left of its activator.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn compute(area: Rect, open: Option<Dropdown>) -> Self {
        let x = area.right().saturating_sub(ACTIVATOR_WIDTH + 1).max(area.x);
        let activators: [(Dropdown, Rect); 4] = std::array::from_fn(|idx| {
            let y = area.y + 1 + idx as u16 * ACTIVATOR_HEIGHT;
            let rect = Rect::new(x, y, ACTIVATOR_WIDTH, ACTIVATOR_HEIGHT);
            (Dropdown::ALL[idx], rect.intersection(area))
        });

        let panel = open.map(|d| {
            let anchor = activators
                .iter()
                .find(|(o, _)| *o == d)
                .map_or(area, |(_, r)| *r);
            let names = d.option_names();
            let longest = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
            let width = (longest as u16 + 6).max(PANEL_MIN_WIDTH);
            let height = names.len() as u16 + 2;
            let rect = Rect::new(
                anchor.x.saturating_sub(width + 1).max(area.x),
                anchor.y,
                width,
                height,
            );
            (d, rect.intersection(area))
        });

        Self { activators, panel }
    }

    fn activator_at(&self, col: u16, row: u16) -> Option<Dropdown> {
        self.activators
            .iter()
            .find(|(_, r)| r.contains(Position::new(col, row)))
            .map(|(d, _)| *d)
    }

    fn panel_contains(&self, col: u16, row: u16) -> bool {
        self.panel
            .is_some_and(|(_, r)| r.contains(Position::new(col, row)))
    }

    /// Option index under a cell of the open panel (borders excluded).
    #[must_use]
    pub fn option_at(&self, col: u16, row: u16) -> Option<usize> {
        let (_, rect) = self.panel?;
        let inner_x = rect.x + 1..rect.right().saturating_sub(1);
        let inner_y = rect.y + 1..rect.bottom().saturating_sub(1);
        if inner_x.contains(&col) && inner_y.contains(&row) {
            Some(usize::from(row - rect.y - 1))
        } else {
            None
        }
    }
}

/// Open/closed state of the dropdowns.
#[derive(Debug, Default, Clone)]
pub struct FilterControls {
    open: Option<Dropdown>,
}

impl FilterControls {
    #[must_use]
    pub fn open(&self) -> Option<Dropdown> {
        self.open
    }

    #[must_use]
    pub fn is_open(&self, dropdown: Dropdown) -> bool {
        self.open == Some(dropdown)
    }

    #[must_use]
    pub fn any_open(&self) -> bool {
        self.open.is_some()
    }

    /// Open `dropdown` (closing any other) or close it if it is open.
    pub fn toggle(&mut self, dropdown: Dropdown) {
        self.open = if self.is_open(dropdown) {
            None
        } else {
            Some(dropdown)
        };
    }

    pub fn close_all(&mut self) {
        self.open = None;
    }

    /// Pick option `index` of `dropdown`; closes it on success.
    pub fn select(&mut self, dropdown: Dropdown, index: usize) -> ControlOutcome {
        let selection = match dropdown {
            Dropdown::Layer => MAP_LAYERS.get(index).map(Selection::Layer),
            Dropdown::TimeRange => TIME_RANGE_OPTIONS.get(index).map(|o| Selection::TimeRange(o.id)),
            Dropdown::Magnitude => MAGNITUDE_OPTIONS.get(index).map(|o| Selection::Magnitude(o.id)),
            Dropdown::Legend => None,
        };

        match selection {
            Some(selection) => {
                if self.is_open(dropdown) {
                    self.open = None;
                }
                ControlOutcome::Selected(selection)
            }
            None => ControlOutcome::Consumed,
        }
    }

    /// Hotkeys toggle dropdowns, digits pick an option, `Esc` closes.
    pub fn handle_key(&mut self, code: KeyCode) -> ControlOutcome {
        match code {
            KeyCode::Esc if self.any_open() => {
                self.close_all();
                ControlOutcome::Consumed
            }
            KeyCode::Char(c) if c.is_ascii_digit() => match (self.open, c.to_digit(10)) {
                (Some(dropdown), Some(n)) if n > 0 => self.select(dropdown, n as usize - 1),
                (Some(_), _) => ControlOutcome::Consumed,
                (None, _) => ControlOutcome::Ignored,
            },
            KeyCode::Char(c) => match Dropdown::from_hotkey(c) {
                Some(dropdown) => {
                    self.toggle(dropdown);
                    ControlOutcome::Consumed
                }
                None => ControlOutcome::Ignored,
            },
            _ => ControlOutcome::Ignored,
        }
    }

    /// Route a left click at an absolute cell; `area` is the full screen.
    pub fn handle_click(&mut self, col: u16, row: u16, area: Rect) -> ControlOutcome {
        let layout = ControlsLayout::compute(area, self.open);

        if let Some(dropdown) = layout.activator_at(col, row) {
            self.toggle(dropdown);
            return ControlOutcome::Consumed;
        }

        if let Some(open) = self.open {
            if layout.panel_contains(col, row) {
                return match layout.option_at(col, row) {
                    Some(index) => self.select(open, index),
                    None => ControlOutcome::Consumed,
                };
            }
            // Overlay click
            self.close_all();
            return ControlOutcome::Consumed;
        }

        ControlOutcome::Ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect {
        x: 0,
        y: 0,
        width: 120,
        height: 40,
    };

    fn activator(d: Dropdown) -> Rect {
        ControlsLayout::compute(SCREEN, None)
            .activators
            .iter()
            .find(|(o, _)| *o == d)
            .map(|(_, r)| *r)
            .unwrap()
    }

    #[test]
    fn test_opening_one_closes_others() {
        let mut controls = FilterControls::default();
        controls.toggle(Dropdown::Magnitude);
        assert!(controls.is_open(Dropdown::Magnitude));

        controls.toggle(Dropdown::Layer);
        assert!(controls.is_open(Dropdown::Layer));
        assert!(!controls.is_open(Dropdown::Magnitude));
        assert_eq!(controls.open(), Some(Dropdown::Layer));
    }

    #[test]
    fn test_activator_toggles() {
        let mut controls = FilterControls::default();
        controls.toggle(Dropdown::Legend);
        controls.toggle(Dropdown::Legend);
        assert!(!controls.any_open());
    }

    #[test]
    fn test_selection_closes_dropdown() {
        let mut controls = FilterControls::default();
        controls.toggle(Dropdown::TimeRange);
        let outcome = controls.select(Dropdown::TimeRange, 2);
        assert_eq!(outcome, ControlOutcome::Selected(Selection::TimeRange("week")));
        assert!(!controls.any_open());
    }

    #[test]
    fn test_legend_has_no_selection() {
        let mut controls = FilterControls::default();
        controls.toggle(Dropdown::Legend);
        assert_eq!(controls.select(Dropdown::Legend, 0), ControlOutcome::Consumed);
        assert!(controls.is_open(Dropdown::Legend));
    }

    #[test]
    fn test_keys() {
        let mut controls = FilterControls::default();
        assert_eq!(controls.handle_key(KeyCode::Char('1')), ControlOutcome::Ignored);
        assert_eq!(controls.handle_key(KeyCode::Esc), ControlOutcome::Ignored);

        assert_eq!(controls.handle_key(KeyCode::Char('m')), ControlOutcome::Consumed);
        assert!(controls.is_open(Dropdown::Magnitude));
        assert_eq!(controls.handle_key(KeyCode::Char('9')), ControlOutcome::Consumed);
        assert!(controls.is_open(Dropdown::Magnitude));

        assert_eq!(
            controls.handle_key(KeyCode::Char('4')),
            ControlOutcome::Selected(Selection::Magnitude("4.5"))
        );
        assert!(!controls.any_open());

        controls.handle_key(KeyCode::Char('L'));
        assert!(controls.is_open(Dropdown::Layer));
        assert_eq!(controls.handle_key(KeyCode::Esc), ControlOutcome::Consumed);
        assert!(!controls.any_open());
    }

    #[test]
    fn test_click_magnitude_then_layer() {
        let mut controls = FilterControls::default();
        let mag = activator(Dropdown::Magnitude);
        let layer = activator(Dropdown::Layer);

        controls.handle_click(mag.x + 1, mag.y + 1, SCREEN);
        assert!(controls.is_open(Dropdown::Magnitude));

        controls.handle_click(layer.x + 1, layer.y + 1, SCREEN);
        assert!(controls.is_open(Dropdown::Layer));
        assert!(!controls.is_open(Dropdown::Magnitude));
    }

    #[test]
    fn test_click_option_selects() {
        let mut controls = FilterControls::default();
        controls.toggle(Dropdown::Layer);
        let layout = ControlsLayout::compute(SCREEN, controls.open());
        let (_, panel) = layout.panel.unwrap();

        // Second option row: "Satellite Map"
        let outcome = controls.handle_click(panel.x + 2, panel.y + 2, SCREEN);
        assert_eq!(outcome, ControlOutcome::Selected(Selection::Layer(&MAP_LAYERS[1])));
        assert!(!controls.any_open());
    }

    #[test]
    fn test_overlay_click_closes_everything() {
        let mut controls = FilterControls::default();
        controls.toggle(Dropdown::TimeRange);
        assert_eq!(controls.handle_click(2, 30, SCREEN), ControlOutcome::Consumed);
        assert!(!controls.any_open());

        // Without an open dropdown the click belongs to the map
        assert_eq!(controls.handle_click(2, 30, SCREEN), ControlOutcome::Ignored);
    }

    #[test]
    fn test_panel_border_click_is_consumed() {
        let mut controls = FilterControls::default();
        controls.toggle(Dropdown::Magnitude);
        let layout = ControlsLayout::compute(SCREEN, controls.open());
        let (_, panel) = layout.panel.unwrap();
        assert_eq!(controls.handle_click(panel.x + 2, panel.y, SCREEN), ControlOutcome::Consumed);
        assert!(controls.is_open(Dropdown::Magnitude));
    }

    #[test]
    fn test_layout_fits_screen() {
        for d in Dropdown::ALL {
            let layout = ControlsLayout::compute(SCREEN, Some(d));
            let (_, panel) = layout.panel.unwrap();
            assert!(panel.right() <= SCREEN.right());
            assert!(panel.bottom() <= SCREEN.bottom());
            for (_, r) in layout.activators {
                assert!(!r.intersects(panel));
            }
        }
    }
}
