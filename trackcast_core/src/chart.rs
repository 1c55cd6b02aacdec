//! Chart Renderer - weather time series for the eligible points.
//!
//! Categories are built from the same filtered sequence as the weather
//! markers, so category `i` and `weatherMarkers[i]` always describe the same
//! point. Activating a chart point only publishes its index on the bus.

use chrono::FixedOffset;
use std::sync::Arc;
use tracing::debug;
use trackcast_env::{AxisSpec, ChartId, ChartOptions, ChartSurface, ResponsiveRule, SeriesKind, SeriesSpec};

use crate::bus::{BusEvent, EmitReport, EventBus};
use crate::config::ViewConfig;
use crate::error::ViewError;
use crate::model::{eligible_weather_points, DisplayMode, WeatherSample, WeatherTrackPoint};

/// A chart drawn by `render_chart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartHandle {
    pub id: ChartId,
    pub mode: DisplayMode,

    /// Number of categories (= eligible weather points)
    pub points: usize,
}

/// Builds the chart for `mode` and hands it to the surface.
pub fn render_chart<C: ChartSurface + ?Sized>(
    chart: &mut C,
    points: &[WeatherTrackPoint],
    mode: DisplayMode,
    bus: &EventBus,
    config: &ViewConfig,
) -> Result<ChartHandle, ViewError> {
    let options = chart_options(points, mode, bus, config.display_offset());
    let count = options.categories.len();
    let id = chart.create_chart(&config.chart_container, options)?;
    debug!("rendered {} chart {} with {} points", mode, id, count);
    Ok(ChartHandle { id, mode, points: count })
}

/// Chart options for the eligible points of `points`.
pub fn chart_options(
    points: &[WeatherTrackPoint],
    mode: DisplayMode,
    bus: &EventBus,
    offset: FixedOffset,
) -> ChartOptions {
    let eligible = eligible_weather_points(points);
    let categories: Vec<String> = eligible
        .iter()
        .map(|p| p.date.with_timezone(&offset).format("%H:%M").to_string())
        .collect();
    let title = match categories.first() {
        Some(start) => format!("{} (start {})", mode.label(), start),
        None => mode.label().to_string(),
    };

    let empty = WeatherSample::default();
    let samples: Vec<&WeatherSample> = eligible.iter().map(|p| p.sample().unwrap_or(&empty)).collect();
    let column = |f: fn(&WeatherSample) -> Option<f64>| -> Vec<Option<f64>> {
        samples.iter().map(|s| f(s).filter(|v| v.is_finite())).collect()
    };

    let (y_axes, series) = match mode {
        DisplayMode::Temperature => (
            vec![AxisSpec::new("Temperature (°C)")],
            vec![series("Temperature (°C)", SeriesKind::Spline, "#ff5733", 0, column(|s| s.temperature))],
        ),
        DisplayMode::Precipitation => (
            vec![
                AxisSpec::new("Precipitation (mm)").with_range(Some(0.0), Some(5.0)),
                AxisSpec::new("Probability (%)")
                    .with_range(Some(0.0), Some(100.0))
                    .on_opposite_side(),
            ],
            vec![
                series("Amount (mm)", SeriesKind::Column, "rgba(0, 123, 255, 0.7)", 0, column(|s| s.precipitation)),
                series(
                    "Probability (%)",
                    SeriesKind::Spline,
                    "#0056b3",
                    1,
                    column(|s| s.precipitation_probability),
                ),
            ],
        ),
        DisplayMode::Wind => (
            vec![
                AxisSpec::new("Speed (m/s)").with_range(Some(0.0), None),
                AxisSpec::new("Direction (°)")
                    .with_range(Some(0.0), Some(360.0))
                    .on_opposite_side(),
            ],
            vec![
                series("Speed (m/s)", SeriesKind::Spline, "#28a745", 0, column(|s| s.wind_speed)),
                series(
                    "Direction (°)",
                    SeriesKind::Line,
                    "#6c757d",
                    1,
                    column(|s| s.checked_wind_direction().ok().flatten()),
                ),
            ],
        ),
    };

    let bus = bus.clone();
    ChartOptions {
        title,
        categories,
        y_axes,
        series,
        responsive: vec![ResponsiveRule::default()],
        on_point_click: Some(Arc::new(move |index| {
            bus.emit(BusEvent::ChartPointActivated { index });
        })),
    }
}

/// Publishes a mode picked in the chart's mode selector.
pub fn select_mode(bus: &EventBus, mode: DisplayMode) -> EmitReport {
    bus.emit(BusEvent::ChartModeSelected { mode })
}

fn series(name: &str, kind: SeriesKind, color: &str, y_axis: usize, data: Vec<Option<f64>>) -> SeriesSpec {
    SeriesSpec {
        name: name.to_string(),
        kind,
        color: color.to_string(),
        y_axis,
        data,
    }
}
