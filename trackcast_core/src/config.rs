//! View engine configuration.

use chrono::{FixedOffset, Offset, Utc};
use trackcast_env::{PolylineStyle, PopupOptions};

use crate::model::DisplayMode;

/// Policy and styling knobs for a `ViewController`.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Treat a weather payload without eligible points as an error (default: false)
    pub require_weather_points: bool,

    /// Open the first weather marker's popup after each weather update (default: false)
    pub auto_open_first_popup: bool,

    /// Approximate number of direction arrows along a route (default: 10)
    pub direction_marker_target: usize,

    /// Chart container id on the page (default: "chart-canvas")
    pub chart_container: String,

    /// Route polyline style
    pub route_style: PolylineStyle,

    /// Start/end marker color (default: "blue")
    pub endpoint_color: String,

    /// Start/end marker radius in pixels (default: 10)
    pub endpoint_radius: f32,

    /// Popup behaviour for weather markers
    pub popup_options: PopupOptions,

    /// Offset from UTC used for chart and popup times, in minutes (default: 0)
    pub display_offset_minutes: i32,

    /// Chart mode until a payload or the mode picker selects another
    pub initial_mode: DisplayMode,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            require_weather_points: false,
            auto_open_first_popup: false,
            direction_marker_target: 10,
            chart_container: "chart-canvas".to_string(),
            route_style: PolylineStyle::default(),
            endpoint_color: "blue".to_string(),
            endpoint_radius: 10.0,
            popup_options: PopupOptions::default(),
            display_offset_minutes: 0,
            initial_mode: DisplayMode::Temperature,
        }
    }
}

impl ViewConfig {
    /// The display offset as a chrono timezone. Out-of-range offsets fall back to UTC.
    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.display_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewConfig::default();
        assert!(!config.require_weather_points);
        assert!(!config.auto_open_first_popup);
        assert_eq!(config.direction_marker_target, 10);
        assert_eq!(config.chart_container, "chart-canvas");
        assert_eq!(config.initial_mode, DisplayMode::Temperature);
        assert_eq!(config.display_offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_display_offset() {
        let config = ViewConfig {
            display_offset_minutes: 120,
            ..Default::default()
        };
        assert_eq!(config.display_offset().local_minus_utc(), 7200);

        let broken = ViewConfig {
            display_offset_minutes: 48 * 60,
            ..Default::default()
        };
        assert_eq!(broken.display_offset().local_minus_utc(), 0);
    }
}
