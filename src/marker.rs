//! Marker rendering policy: magnitude buckets, colors and popup contents.

use chrono::{Local, TimeZone};
use ratatui::style::{Color, Modifier, Style};

use crate::models::Earthquake;

/// Glyph drawn at a marker's cell.
pub const MARKER_GLYPH: char = '●';

/// Cell background behind a marker whose popup is open.
pub const OPEN_MARKER_BG: Color = Color::Rgb(0x3d, 0x3d, 0x3d);

/// Severity range used for marker coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagnitudeBucket {
    /// mag < 3.0
    Minor,
    /// 3.0 <= mag < 5.0
    Light,
    /// 5.0 <= mag < 7.0
    Moderate,
    /// mag >= 7.0
    Major,
    /// No magnitude reported
    Unknown,
}

impl MagnitudeBucket {
    /// Classify a magnitude; lower bounds are inclusive.
    #[must_use]
    pub fn from_magnitude(mag: Option<f64>) -> Self {
        match mag {
            None => Self::Unknown,
            Some(m) if m.is_nan() => Self::Unknown,
            Some(m) if m < 3.0 => Self::Minor,
            Some(m) if m < 5.0 => Self::Light,
            Some(m) if m < 7.0 => Self::Moderate,
            Some(_) => Self::Major,
        }
    }

    /// CSS-style hex color.
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Minor => "#00bf00",
            Self::Light => "#FFEA00",
            Self::Moderate => "#FFA100",
            Self::Major => "#FF0000",
            Self::Unknown => "#808080",
        }
    }

    #[must_use]
    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Minor => (0x00, 0xbf, 0x00),
            Self::Light => (0xff, 0xea, 0x00),
            Self::Moderate => (0xff, 0xa1, 0x00),
            Self::Major => (0xff, 0x00, 0x00),
            Self::Unknown => (0x80, 0x80, 0x80),
        }
    }

    /// Terminal color for this bucket.
    #[must_use]
    pub const fn color(self) -> Color {
        let (r, g, b) = self.rgb();
        Color::Rgb(r, g, b)
    }

    /// ANSI truecolor foreground escape.
    #[must_use]
    pub fn ansi(self) -> String {
        let (r, g, b) = self.rgb();
        format!("\x1b[38;2;{r};{g};{b}m")
    }
}

/// One decimal, exact ties rounded away from zero.
///
/// Only quarter values are exact ties at the second decimal; every other
/// value already rounds to its nearest neighbour.
#[allow(clippy::float_cmp)]
fn one_decimal(v: f64) -> String {
    let v = if (v * 4.0).fract() == 0.0 {
        (v * 10.0).round() / 10.0
    } else {
        v
    };
    format!("{v:.1}")
}

/// Format a magnitude with one decimal, or `N/A`.
#[must_use]
pub fn format_magnitude(mag: Option<f64>) -> String {
    mag.map_or_else(|| "N/A".to_string(), one_decimal)
}

/// Format a depth in km with one decimal, or `N/A` when not a number.
#[must_use]
pub fn format_depth(depth_km: f64) -> String {
    if depth_km.is_finite() {
        one_decimal(depth_km)
    } else {
        "N/A".to_string()
    }
}

/// Render epoch milliseconds in the local time zone.
#[must_use]
pub fn format_local_time(time_ms: i64) -> String {
    Local
        .timestamp_millis_opt(time_ms)
        .single()
        .map_or_else(
            || "Unknown time".to_string(),
            |t| t.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        )
}

/// Text shown in a marker's detail popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupDetails {
    pub place: String,
    pub magnitude: String,
    pub depth: String,
    pub time: String,
}

impl PopupDetails {
    #[must_use]
    pub fn for_quake(quake: &Earthquake) -> Self {
        Self {
            place: quake
                .place
                .clone()
                .unwrap_or_else(|| "Unknown location".to_string()),
            magnitude: format_magnitude(quake.magnitude),
            depth: format_depth(quake.depth_km()),
            time: format_local_time(quake.time),
        }
    }

    /// Popup body, one entry per line.
    #[must_use]
    pub fn lines(&self) -> [String; 3] {
        [
            format!("Magnitude: {}", self.magnitude),
            format!("Depth: {} km", self.depth),
            self.time.clone(),
        ]
    }
}

/// One visual point on the map.
#[derive(Debug, Clone)]
pub struct Marker {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub bucket: MagnitudeBucket,
    pub details: PopupDetails,
    popup_open: bool,
}

impl Marker {
    #[must_use]
    pub fn from_quake(quake: &Earthquake) -> Self {
        Self {
            id: quake.id.clone(),
            lat: quake.latitude(),
            lon: quake.longitude(),
            bucket: MagnitudeBucket::from_magnitude(quake.magnitude),
            details: PopupDetails::for_quake(quake),
            popup_open: false,
        }
    }

    #[must_use]
    pub fn color(&self) -> Color {
        self.bucket.color()
    }

    /// Glyph style; an open popup darkens the cell behind the marker.
    #[must_use]
    pub fn style(&self) -> Style {
        let style = Style::default().fg(self.color());
        if self.popup_open {
            style.bg(OPEN_MARKER_BG).add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    #[must_use]
    pub fn is_popup_open(&self) -> bool {
        self.popup_open
    }

    pub fn set_popup_open(&mut self, open: bool) {
        self.popup_open = open;
    }

    pub fn toggle_popup(&mut self) {
        self.popup_open = !self.popup_open;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quake(magnitude: Option<f64>, depth: f64) -> Earthquake {
        Earthquake {
            id: "ak025abcdef".into(),
            magnitude,
            place: Some("Southern Alaska".into()),
            time: 1_756_559_000_000,
            position: [61.2, -150.1, depth],
        }
    }

    #[test]
    fn test_bucket_ranges() {
        assert_eq!(MagnitudeBucket::from_magnitude(Some(-0.5)), MagnitudeBucket::Minor);
        assert_eq!(MagnitudeBucket::from_magnitude(Some(2.99)), MagnitudeBucket::Minor);
        assert_eq!(MagnitudeBucket::from_magnitude(Some(4.9)), MagnitudeBucket::Light);
        assert_eq!(MagnitudeBucket::from_magnitude(Some(6.99)), MagnitudeBucket::Moderate);
        assert_eq!(MagnitudeBucket::from_magnitude(Some(9.1)), MagnitudeBucket::Major);
        assert_eq!(MagnitudeBucket::from_magnitude(None), MagnitudeBucket::Unknown);
        assert_eq!(MagnitudeBucket::from_magnitude(Some(f64::NAN)), MagnitudeBucket::Unknown);
    }

    #[test]
    fn test_bucket_lower_bounds_inclusive() {
        assert_eq!(MagnitudeBucket::from_magnitude(Some(3.0)).hex(), "#FFEA00");
        assert_eq!(MagnitudeBucket::from_magnitude(Some(5.0)).hex(), "#FFA100");
        assert_eq!(MagnitudeBucket::from_magnitude(Some(7.0)).hex(), "#FF0000");
    }

    #[test]
    fn test_zero_is_not_unknown() {
        assert_eq!(MagnitudeBucket::from_magnitude(Some(0.0)), MagnitudeBucket::Minor);
        assert_eq!(MagnitudeBucket::from_magnitude(Some(0.0)).hex(), "#00bf00");
    }

    #[test]
    fn test_colors_match_hex() {
        assert_eq!(MagnitudeBucket::Light.color(), Color::Rgb(255, 234, 0));
        assert_eq!(MagnitudeBucket::Unknown.ansi(), "\x1b[38;2;128;128;128m");
    }

    #[test]
    fn test_popup_for_missing_magnitude() {
        let marker = Marker::from_quake(&quake(None, 35.44));
        assert_eq!(marker.bucket, MagnitudeBucket::Unknown);
        assert_eq!(marker.color(), Color::Rgb(128, 128, 128));
        assert_eq!(marker.details.magnitude, "N/A");
        assert_eq!(marker.details.depth, "35.4");
        assert_eq!(marker.details.lines()[0], "Magnitude: N/A");
        assert_eq!(marker.details.lines()[1], "Depth: 35.4 km");
    }

    #[test]
    fn test_popup_formats_one_decimal() {
        let details = PopupDetails::for_quake(&quake(Some(4.66), 10.0));
        assert_eq!(details.magnitude, "4.7");
        assert_eq!(details.depth, "10.0");
        assert_eq!(details.place, "Southern Alaska");

        assert_eq!(format_magnitude(Some(2.25)), "2.3");
        assert_eq!(format_magnitude(Some(10.25)), "10.3");
        assert_eq!(format_magnitude(Some(0.75)), "0.8");
        assert_eq!(format_magnitude(Some(-0.25)), "-0.3");
        assert_eq!(format_magnitude(Some(2.5)), "2.5");
        assert_eq!(format_magnitude(Some(1.14)), "1.1");
        assert_eq!(format_depth(12.25), "12.3");
    }

    #[test]
    fn test_open_popup_styles_marker() {
        let mut marker = Marker::from_quake(&quake(Some(5.5), 10.0));
        assert_eq!(marker.style(), Style::default().fg(Color::Rgb(255, 161, 0)));

        marker.toggle_popup();
        let style = marker.style();
        assert_eq!(style.fg, Some(Color::Rgb(255, 161, 0)));
        assert_eq!(style.bg, Some(OPEN_MARKER_BG));
        assert!(style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_depth_not_a_number() {
        assert_eq!(format_depth(f64::NAN), "N/A");
    }

    #[test]
    fn test_local_time_is_formatted() {
        let text = format_local_time(1_756_559_000_000);
        assert!(text.contains("2025"));
        assert!(text.ends_with("AM") || text.ends_with("PM"));
    }

    #[test]
    fn test_popups_toggle_independently() {
        let mut a = Marker::from_quake(&quake(Some(1.0), 1.0));
        let mut b = Marker::from_quake(&quake(Some(2.0), 1.0));
        a.toggle_popup();
        assert!(a.is_popup_open());
        assert!(!b.is_popup_open());
        b.toggle_popup();
        a.toggle_popup();
        assert!(!a.is_popup_open());
        assert!(b.is_popup_open());
    }
}
